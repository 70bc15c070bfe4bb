//! CSV decoding for bulk import and encoding for export.

use crate::error::{StoreError, StoreResult};
use crate::store::Lexicon;

/// Decode bytes as UTF-8, falling back to Latin-1, without a leading BOM.
pub fn decode_text(bytes: &[u8]) -> String {
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        // Every byte is a valid Latin-1 code point.
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    };
    match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

/// Split text into logical CSV lines. A line break inside a quoted field
/// does not end the line; the terminator is dropped from each line.
fn logical_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut quotes = 0usize;
    let mut end = 0;
    for chunk in text.split_inclusive('\n') {
        end += chunk.len();
        quotes += chunk.matches('"').count();
        if quotes % 2 == 0 {
            lines.push(text[start..end].trim_end_matches(|c: char| c == '\r' || c == '\n'));
            start = end;
            quotes = 0;
        }
    }
    if start < text.len() {
        lines.push(text[start..].trim_end_matches(|c: char| c == '\r' || c == '\n'));
    }
    lines
}

/// Parse headerless CSV of any row width into rows of cells.
///
/// A blank line is kept as an empty row so it counts toward the import's
/// total and invalid rows.
pub fn parse_rows(bytes: &[u8]) -> StoreResult<Vec<Vec<String>>> {
    let text = decode_text(bytes);
    logical_lines(&text)
        .into_iter()
        .map(|line| {
            if line.is_empty() {
                return Ok(Vec::new());
            }
            let mut reader = csv::ReaderBuilder::new()
                .has_headers(false)
                .flexible(true)
                .from_reader(line.as_bytes());
            match reader.records().next() {
                Some(record) => record
                    .map(|r| r.iter().map(str::to_string).collect())
                    .map_err(|e| StoreError::Validation(format!("invalid CSV: {e}"))),
                None => Ok(Vec::new()),
            }
        })
        .collect()
}

/// Render the lexicon as `spanish,kichwa` rows in key order.
pub fn write_rows(lexicon: &Lexicon) -> StoreResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for (spanish, kichwa) in lexicon {
        writer
            .write_record([spanish, kichwa])
            .map_err(|e| StoreError::storage("export.csv", std::io::Error::other(e)))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| StoreError::storage("export.csv", e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| StoreError::storage("export.csv", std::io::Error::other(e)))
}
