pub mod csv_utils;
pub mod time_utils;
