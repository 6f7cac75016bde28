use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Detected layout of a holdings export.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrokerFormat {
    Comdirect,
    Postbank,
    Generic,
    Unknown,
}

/// One holding read from a broker export.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedPosition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wkn: Option<String>,
    /// Empty when the export has no ISIN column
    pub isin: String,
    pub quantity: f64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buy_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buy_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_loss: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_loss_percent: Option<f64>,
}

/// Target field a column can be mapped to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MappableField {
    Name,
    Wkn,
    Isin,
    Quantity,
    Currency,
    CurrentPrice,
    CurrentValue,
    BuyPrice,
    BuyValue,
    ProfitLoss,
    ProfitLossPercent,
    Ignore,
}

impl MappableField {
    /// Every field a column can be claimed by, in detection priority order.
    pub const DETECTABLE: [MappableField; 11] = [
        MappableField::Name,
        MappableField::Wkn,
        MappableField::Isin,
        MappableField::Quantity,
        MappableField::Currency,
        MappableField::CurrentPrice,
        MappableField::CurrentValue,
        MappableField::BuyPrice,
        MappableField::BuyValue,
        MappableField::ProfitLoss,
        MappableField::ProfitLossPercent,
    ];
}

/// German display label for a field, shown in the mapping editor.
pub fn field_label(field: MappableField) -> &'static str {
    match field {
        MappableField::Name => "Bezeichnung",
        MappableField::Wkn => "WKN",
        MappableField::Isin => "ISIN",
        MappableField::Quantity => "Anzahl",
        MappableField::Currency => "Währung",
        MappableField::CurrentPrice => "Aktueller Kurs",
        MappableField::CurrentValue => "Aktueller Wert",
        MappableField::BuyPrice => "Kaufkurs",
        MappableField::BuyValue => "Kaufwert",
        MappableField::ProfitLoss => "Gewinn/Verlust",
        MappableField::ProfitLossPercent => "Gewinn/Verlust %",
        MappableField::Ignore => "Ignorieren",
    }
}

/// How sure the header heuristics are about a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingConfidence {
    High,
    Medium,
    Low,
}

/// Mapping decision for a single column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnAssignment {
    pub header: String,
    pub mapped_to: MappableField,
    pub confidence: MappingConfidence,
}

/// Column index to assignment. Editable before re-parsing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMapping(pub BTreeMap<usize, ColumnAssignment>);

impl ColumnMapping {
    pub fn get(&self, index: usize) -> Option<&ColumnAssignment> {
        self.0.get(&index)
    }

    /// True if some column is mapped to `field`.
    pub fn has(&self, field: MappableField) -> bool {
        self.0.values().any(|a| a.mapped_to == field)
    }

    /// Override a column's field, as a user would in the mapping editor.
    pub fn assign(&mut self, index: usize, field: MappableField) {
        if let Some(assignment) = self.0.get_mut(&index) {
            assignment.mapped_to = field;
            assignment.confidence = MappingConfidence::High;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&usize, &ColumnAssignment)> {
        self.0.iter()
    }
}

/// Outcome of parsing a holdings export.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvParseResult {
    pub format: BrokerFormat,
    pub positions: Vec<ParsedPosition>,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_mapping: Option<ColumnMapping>,
    pub raw_headers: Vec<String>,
    pub raw_rows: Vec<Vec<String>>,
}

impl CsvParseResult {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            format: BrokerFormat::Unknown,
            positions: Vec::new(),
            errors: vec![error.into()],
            column_mapping: None,
            raw_headers: Vec::new(),
            raw_rows: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_serializes_by_index() {
        let mut inner = BTreeMap::new();
        inner.insert(
            0,
            ColumnAssignment {
                header: "Stück".to_string(),
                mapped_to: MappableField::Quantity,
                confidence: MappingConfidence::High,
            },
        );
        let json = serde_json::to_value(ColumnMapping(inner)).unwrap();
        assert_eq!(json["0"]["mappedTo"], "quantity");
        assert_eq!(json["0"]["confidence"], "high");
    }

    #[test]
    fn test_field_labels() {
        assert_eq!(field_label(MappableField::ProfitLossPercent), "Gewinn/Verlust %");
        assert_eq!(field_label(MappableField::Ignore), "Ignorieren");
    }
}
