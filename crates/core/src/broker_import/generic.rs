//! Header driven parser for exports of unknown brokers.
//!
//! Columns are matched against keyword lists; the resulting
//! [`ColumnMapping`] can be edited and re-applied to the tokenized rows
//! with [`reparse_with_mapping`] without touching the source text again.

use std::collections::{BTreeMap, HashSet};

use log::debug;

use super::broker_import_model::{
    BrokerFormat, ColumnAssignment, ColumnMapping, CsvParseResult, MappableField,
    MappingConfidence, ParsedPosition,
};
use crate::utils::csv_utils::{
    detect_delimiter, non_empty_lines, normalize_text, parse_csv_line, parse_german_number,
    strip_quotes,
};

pub const NOT_ENOUGH_DATA: &str =
    "Die CSV-Datei enthält nicht genügend Daten (mindestens Header + 1 Zeile benötigt).";
pub const NAME_COLUMN_MISSING: &str = "Spalte für \"Bezeichnung/Name\" konnte nicht erkannt werden.";
pub const QUANTITY_COLUMN_MISSING: &str = "Spalte für \"Anzahl/Stück\" konnte nicht erkannt werden.";

/// Lower-case header keywords per field.
fn keywords(field: MappableField) -> &'static [&'static str] {
    match field {
        MappableField::Name => &[
            "bezeichnung",
            "name",
            "wertpapier",
            "wertpapierbezeichnung",
            "titel",
            "security",
            "instrument",
            "description",
        ],
        MappableField::Wkn => &["wkn"],
        MappableField::Isin => &["isin"],
        MappableField::Quantity => &[
            "stück", "stk", "stk.", "anzahl", "menge", "bestand", "nominal", "quantity", "shares",
            "units",
        ],
        MappableField::Currency => &["währung", "whg", "currency", "ccy"],
        MappableField::CurrentPrice => &[
            "kurs",
            "aktueller kurs",
            "akt. kurs",
            "kurs aktuell",
            "price",
            "current price",
            "last price",
            "schlusskurs",
        ],
        MappableField::CurrentValue => &[
            "wert",
            "aktueller wert",
            "kurswert",
            "marktwert",
            "market value",
            "current value",
            "value",
        ],
        MappableField::BuyPrice => &[
            "kaufkurs",
            "einstandskurs",
            "einstiegskurs",
            "buy price",
            "purchase price",
            "avg price",
            "durchschnittskurs",
        ],
        MappableField::BuyValue => &[
            "kaufwert",
            "einstandswert",
            "einstand",
            "cost basis",
            "buy value",
            "purchase value",
        ],
        MappableField::ProfitLoss => &[
            "gewinn/verlust",
            "g/v",
            "gv",
            "profit/loss",
            "p/l",
            "pnl",
            "performance",
        ],
        MappableField::ProfitLossPercent => &[
            "gewinn/verlust %",
            "g/v %",
            "gv %",
            "p/l %",
            "performance %",
            "%",
        ],
        MappableField::Ignore => &[],
    }
}

/// Builds a mapping from header cells.
///
/// Exact keyword matches win with high confidence and stop the search for
/// that column. Substring matches give medium confidence and only the first
/// one counts. A field is claimed by at most one column, left to right.
pub fn detect_column_mapping(headers: &[String]) -> ColumnMapping {
    let mut mapping = BTreeMap::new();
    let mut used: HashSet<MappableField> = HashSet::new();

    for (index, header) in headers.iter().enumerate() {
        let normalized = header.trim().to_lowercase();
        let mut best = MappableField::Ignore;
        let mut confidence = MappingConfidence::Low;

        'fields: for field in MappableField::DETECTABLE {
            if used.contains(&field) {
                continue;
            }
            for keyword in keywords(field) {
                if normalized == *keyword {
                    best = field;
                    confidence = MappingConfidence::High;
                    break 'fields;
                }
                if confidence == MappingConfidence::Low && normalized.contains(keyword) {
                    best = field;
                    confidence = MappingConfidence::Medium;
                }
            }
        }

        if best != MappableField::Ignore {
            used.insert(best);
        }
        mapping.insert(
            index,
            ColumnAssignment {
                header: header.clone(),
                mapped_to: best,
                confidence,
            },
        );
    }

    ColumnMapping(mapping)
}

fn clean_text(value: &str) -> String {
    strip_quotes(value).replace('\'', "").trim().to_string()
}

/// Applies a mapping to one tokenized row.
///
/// Returns `None` unless the row has a name and a positive quantity.
pub fn apply_mapping(row: &[String], mapping: &ColumnMapping) -> Option<ParsedPosition> {
    let mut position = ParsedPosition {
        currency: "EUR".to_string(),
        ..Default::default()
    };
    let mut quantity = None;

    for (&index, assignment) in mapping.iter() {
        let Some(value) = row.get(index).filter(|v| !v.trim().is_empty()) else {
            continue;
        };

        match assignment.mapped_to {
            MappableField::Name => position.name = clean_text(value),
            MappableField::Wkn => position.wkn = Some(clean_text(value)),
            MappableField::Isin => position.isin = clean_text(value),
            MappableField::Quantity => quantity = Some(parse_german_number(value)),
            MappableField::Currency => position.currency = clean_text(value).to_uppercase(),
            MappableField::CurrentPrice => position.current_price = Some(parse_german_number(value)),
            MappableField::CurrentValue => position.current_value = Some(parse_german_number(value)),
            MappableField::BuyPrice => position.buy_price = Some(parse_german_number(value)),
            MappableField::BuyValue => position.buy_value = Some(parse_german_number(value)),
            MappableField::ProfitLoss => position.profit_loss = Some(parse_german_number(value)),
            MappableField::ProfitLossPercent => {
                position.profit_loss_percent = Some(parse_german_number(value))
            }
            MappableField::Ignore => {}
        }
    }

    let quantity = quantity.filter(|q| *q > 0.0)?;
    if position.name.is_empty() {
        return None;
    }
    position.quantity = quantity;

    let nonzero = |v: Option<f64>| v.filter(|x| *x != 0.0);
    if nonzero(position.current_value).is_none() {
        if let Some(price) = nonzero(position.current_price) {
            position.current_value = Some(price * quantity);
        }
    }
    if nonzero(position.buy_value).is_none() {
        if let Some(price) = nonzero(position.buy_price) {
            position.buy_value = Some(price * quantity);
        }
    }

    Some(position)
}

/// Re-applies an edited mapping to rows that were already tokenized.
pub fn reparse_with_mapping(raw_rows: &[Vec<String>], mapping: &ColumnMapping) -> Vec<ParsedPosition> {
    raw_rows
        .iter()
        .filter_map(|row| apply_mapping(row, mapping))
        .collect()
}

pub fn parse_generic_csv(content: &str) -> CsvParseResult {
    let text = normalize_text(content);
    let text = text.trim();
    let delimiter = detect_delimiter(text);
    let lines = non_empty_lines(text);

    if lines.len() < 2 {
        return CsvParseResult::failed(NOT_ENOUGH_DATA);
    }

    let raw_headers = parse_csv_line(lines[0], delimiter);
    let mapping = detect_column_mapping(&raw_headers);
    debug!("Detected column mapping: {:?}", mapping);

    let mut errors = Vec::new();
    let has_name = mapping.has(MappableField::Name);
    let has_quantity = mapping.has(MappableField::Quantity);
    if !has_name {
        errors.push(NAME_COLUMN_MISSING.to_string());
    }
    if !has_quantity {
        errors.push(QUANTITY_COLUMN_MISSING.to_string());
    }

    let raw_rows: Vec<Vec<String>> = lines[1..]
        .iter()
        .map(|line| parse_csv_line(line, delimiter))
        .collect();

    let positions = if has_name && has_quantity {
        reparse_with_mapping(&raw_rows, &mapping)
    } else {
        Vec::new()
    };

    CsvParseResult {
        format: BrokerFormat::Generic,
        positions,
        errors,
        column_mapping: Some(mapping),
        raw_headers,
        raw_rows,
    }
}
