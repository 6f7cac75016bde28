//! Broker holdings CSV import.
//!
//! Known broker layouts are recognised by their header line; anything else
//! goes through the keyword based [`generic`] parser.

mod broker_import_model;
mod depot;
mod generic;

pub use broker_import_model::*;
pub use depot::{detect_depot_layout, parse_depot_csv, DepotLayout, COMDIRECT, POSTBANK};
pub use generic::{
    apply_mapping, detect_column_mapping, parse_generic_csv, reparse_with_mapping,
    NAME_COLUMN_MISSING, NOT_ENOUGH_DATA, QUANTITY_COLUMN_MISSING,
};

use log::info;

use crate::utils::csv_utils::{non_empty_lines, normalize_text, parse_csv_line, parse_german_number};

pub const NO_POSITIONS_FOUND: &str = "Keine gültigen Positionen gefunden.";

/// Rows with fewer cells are skipped by the fixed-layout parsers.
pub(crate) const MIN_BROKER_COLUMNS: usize = 6;

/// Fixed-layout broker exports are always semicolon separated.
pub(crate) fn position_columns(line: &str) -> Vec<String> {
    parse_csv_line(line, b';')
}

/// Non-critical numeric cell: absent or blank is `None`, garbage is 0.
pub(crate) fn optional_number(columns: &[String], index: usize) -> Option<f64> {
    columns
        .get(index)
        .filter(|v| !v.trim().is_empty())
        .map(|v| parse_german_number(v))
}

/// Detects the export layout and parses its positions.
pub fn parse_broker_csv(content: &str) -> CsvParseResult {
    let text = normalize_text(content);
    let lines = non_empty_lines(&text);
    let Some(header) = lines.first() else {
        return CsvParseResult::failed(NOT_ENOUGH_DATA);
    };

    let Some(layout) = detect_depot_layout(header) else {
        let result = parse_generic_csv(&text);
        info!(
            "Parsed {} positions from generic broker CSV",
            result.positions.len()
        );
        return result;
    };

    let format = layout.format;
    let positions = parse_depot_csv(&text, layout);
    info!("Parsed {} positions from {:?} export", positions.len(), format);
    let errors = if positions.is_empty() {
        vec![NO_POSITIONS_FOUND.to_string()]
    } else {
        Vec::new()
    };

    CsvParseResult {
        format,
        positions,
        errors,
        column_mapping: None,
        raw_headers: position_columns(header),
        raw_rows: lines[1..].iter().map(|l| position_columns(l)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_comdirect() {
        let csv = "\"Bezeichnung\";\"WKN\";\"ISIN\";\"Stück\";\"Währung\";\"Kurs\";\"Wert\";\"Kaufkurs\"\r\n\
\"BASF\";\"BASF11\";\"DE000BASF111\";\"4\";\"EUR\";\"45,00\";\"180,00\";\"40,00\"\r\n";
        let result = parse_broker_csv(csv);
        assert_eq!(result.format, BrokerFormat::Comdirect);
        assert_eq!(result.positions.len(), 1);
        assert!(result.column_mapping.is_none());
        assert_eq!(result.raw_headers[0], "Bezeichnung");
    }

    #[test]
    fn test_detects_postbank_without_positions() {
        let csv = "Wertpapierbezeichnung;WKN;ISIN;Stück;Währung;Kaufkurs\nFoo;1;;0;EUR;1\n";
        let result = parse_broker_csv(csv);
        assert_eq!(result.format, BrokerFormat::Postbank);
        assert!(result.positions.is_empty());
        assert_eq!(result.errors, vec![NO_POSITIONS_FOUND.to_string()]);
    }

    #[test]
    fn test_falls_back_to_generic() {
        let csv = "Name,Shares,Price\nApple,2,150.5\n";
        let result = parse_broker_csv(csv);
        assert_eq!(result.format, BrokerFormat::Generic);
        assert!(result.column_mapping.is_some());
        assert_eq!(result.positions.len(), 1);
    }

    #[test]
    fn test_empty_input() {
        let result = parse_broker_csv("   \n");
        assert_eq!(result.format, BrokerFormat::Unknown);
        assert_eq!(result.errors.len(), 1);
    }
}
