//! Fixed-layout depot exports (Comdirect, Postbank).
//!
//! Both are semicolon separated and share the leading columns
//! name, WKN, ISIN, quantity, currency. They differ in how the header is
//! recognised and in the order of the four price columns that follow.

use log::warn;

use super::broker_import_model::{BrokerFormat, ParsedPosition};
use super::{optional_number, position_columns, MIN_BROKER_COLUMNS};
use crate::utils::csv_utils::{non_empty_lines, try_parse_german_number};

const NAME: usize = 0;
const WKN: usize = 1;
const ISIN: usize = 2;
const QUANTITY: usize = 3;
const CURRENCY: usize = 4;
const PROFIT_LOSS: usize = 9;
const PROFIT_LOSS_PERCENT: usize = 10;

/// Header signature and price column positions of one broker.
pub struct DepotLayout {
    pub format: BrokerFormat,
    pub matches_header: fn(&str) -> bool,
    pub current_price: usize,
    pub current_value: usize,
    pub buy_price: usize,
    pub buy_value: usize,
}

/// Every cell quoted; the quotes are part of the signature.
fn comdirect_header(header: &str) -> bool {
    header.contains("\"Bezeichnung\"") && header.contains("\"ISIN\"") && header.contains("\"Kaufkurs\"")
}

fn postbank_header(header: &str) -> bool {
    header.contains("Wertpapierbezeichnung")
        && header.contains("ISIN")
        && !header.contains("\"Bezeichnung\"")
}

pub const COMDIRECT: DepotLayout = DepotLayout {
    format: BrokerFormat::Comdirect,
    matches_header: comdirect_header,
    current_price: 5,
    current_value: 6,
    buy_price: 7,
    buy_value: 8,
};

pub const POSTBANK: DepotLayout = DepotLayout {
    format: BrokerFormat::Postbank,
    matches_header: postbank_header,
    buy_price: 5,
    buy_value: 6,
    current_price: 7,
    current_value: 8,
};

const LAYOUTS: [&DepotLayout; 2] = [&COMDIRECT, &POSTBANK];

/// First layout whose signature matches, Comdirect before Postbank.
pub fn detect_depot_layout(header: &str) -> Option<&'static DepotLayout> {
    LAYOUTS.into_iter().find(|layout| (layout.matches_header)(header))
}

/// Rows need an ISIN and a positive quantity; malformed lines are logged
/// and skipped.
pub fn parse_depot_csv(content: &str, layout: &DepotLayout) -> Vec<ParsedPosition> {
    let lines = non_empty_lines(content);
    let mut positions = Vec::new();

    for (i, line) in lines.iter().enumerate().skip(1) {
        let columns = position_columns(line);
        if columns.len() < MIN_BROKER_COLUMNS {
            warn!(
                "{:?} line {}: only {} columns, skipping",
                layout.format,
                i,
                columns.len()
            );
            continue;
        }

        let Some(quantity) = try_parse_german_number(&columns[QUANTITY]) else {
            warn!(
                "{:?} line {}: invalid quantity '{}'",
                layout.format, i, columns[QUANTITY]
            );
            continue;
        };

        let position = ParsedPosition {
            name: columns[NAME].clone(),
            wkn: Some(columns[WKN].clone()).filter(|w| !w.is_empty()),
            isin: columns[ISIN].clone(),
            quantity,
            currency: Some(columns[CURRENCY].clone())
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| "EUR".to_string()),
            current_price: optional_number(&columns, layout.current_price),
            current_value: optional_number(&columns, layout.current_value),
            buy_price: optional_number(&columns, layout.buy_price),
            buy_value: optional_number(&columns, layout.buy_value),
            profit_loss: optional_number(&columns, PROFIT_LOSS),
            profit_loss_percent: optional_number(&columns, PROFIT_LOSS_PERCENT),
        };

        if !position.isin.is_empty() && position.quantity > 0.0 {
            positions.push(position);
        }
    }

    positions
}
