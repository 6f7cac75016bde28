//! CSV primitives shared by the broker and market-data importers.
//!
//! Provides content decoding, delimiter detection, a quote-aware line
//! tokenizer and German locale number parsing.

use csv::{ReaderBuilder, Trim};
use log::warn;

/// Number of leading lines inspected by [`detect_delimiter`].
const DELIMITER_SAMPLE_LINES: usize = 5;

/// Decodes raw upload bytes to a string.
///
/// UTF-8 (with or without BOM) is taken as is. Anything else is decoded with
/// the encoding guessed by `chardetng`, which covers the Windows-1252 exports
/// some German brokers still produce.
pub fn decode_content(content: &[u8]) -> String {
    let without_bom = content.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(content);

    match std::str::from_utf8(without_bom) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let mut detector = chardetng::EncodingDetector::new();
            detector.feed(without_bom, true);
            let encoding = detector.guess(None, true);
            warn!("CSV content is not UTF-8, decoding as {}", encoding.name());
            let (decoded, _, _) = encoding.decode(without_bom);
            decoded.into_owned()
        }
    }
}

/// Strips a leading BOM and converts CRLF / CR line endings to LF.
pub fn normalize_text(content: &str) -> String {
    content
        .trim_start_matches('\u{feff}')
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}

/// Non-empty lines of already normalized text.
pub fn non_empty_lines(content: &str) -> Vec<&str> {
    content.lines().filter(|l| !l.trim().is_empty()).collect()
}

/// Picks `;`, `\t` or `,` by counting occurrences in the first lines.
///
/// `;` or `\t` only win when strictly more frequent than both others, so
/// ties resolve to comma.
pub fn detect_delimiter(content: &str) -> u8 {
    let (mut semicolons, mut commas, mut tabs) = (0usize, 0usize, 0usize);
    for line in content.lines().take(DELIMITER_SAMPLE_LINES) {
        semicolons += line.matches(';').count();
        commas += line.matches(',').count();
        tabs += line.matches('\t').count();
    }

    if semicolons > commas && semicolons > tabs {
        b';'
    } else if tabs > commas && tabs > semicolons {
        b'\t'
    } else {
        b','
    }
}

/// Splits one line into trimmed fields.
///
/// Honors double-quoted fields containing the delimiter and `""` escapes
/// inside quotes.
pub fn parse_csv_line(line: &str, delimiter: u8) -> Vec<String> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(line.as_bytes());

    match reader.records().next() {
        Some(Ok(record)) => record.iter().map(|s| s.to_string()).collect(),
        Some(Err(e)) => {
            warn!("Falling back to plain split for malformed line: {}", e);
            line.split(delimiter as char)
                .map(|s| s.trim().trim_matches('"').to_string())
                .collect()
        }
        None => Vec::new(),
    }
}

/// Removes one pair of surrounding double quotes, if present.
pub fn strip_quotes(value: &str) -> &str {
    let trimmed = value.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(trimmed)
}

/// Parses a German-formatted number, returning `None` for empty,
/// placeholder (`-`, `--`) or unparseable input.
///
/// `.` is the thousands separator and `,` the decimal separator; a leading
/// `+` and a trailing `%` are accepted. A value with more than one `,` is
/// ambiguous and rejected rather than cut at the second comma.
pub fn try_parse_german_number(value: &str) -> Option<f64> {
    let cleaned = strip_quotes(value).trim();
    if cleaned.is_empty() || cleaned == "-" || cleaned == "--" {
        return None;
    }

    let normalized = cleaned
        .replace('.', "")
        .replace(',', ".")
        .replace('%', "");
    let normalized = normalized.trim();
    let normalized = normalized.strip_prefix('+').unwrap_or(normalized);

    normalized
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Lenient variant for non-critical fields: anything unparseable is 0.
pub fn parse_german_number(value: &str) -> f64 {
    try_parse_german_number(value).unwrap_or(0.0)
}
