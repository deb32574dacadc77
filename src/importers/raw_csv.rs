//! Raw CSV text handling shared by every import format.
//!
//! Broker exports disagree on delimiters (Trading 212 uses commas, manual
//! spreadsheet exports often semicolons or tabs), so the delimiter is picked
//! by counting candidates outside quoted regions over the first few lines
//! before the text is handed to the csv reader.

use crate::error::ImportError;
use std::collections::HashMap;
use tracing::debug;

const DELIMITER_CANDIDATES: [u8; 3] = [b',', b';', b'\t'];
const DETECTION_LINES: usize = 5;

/// A parsed CSV file: lowercased, trimmed headers plus one map per data row.
#[derive(Debug)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<HashMap<String, String>>,
}

impl RawTable {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[HashMap<String, String>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Required columns not present in the header set (case-insensitive).
    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|col| !self.headers.iter().any(|h| h == *col))
            .map(|col| col.to_string())
            .collect()
    }
}

fn count_outside_quotes(line: &str, delimiter: u8) -> usize {
    let bytes = line.as_bytes();
    let mut in_quotes = false;
    let mut count = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                if in_quotes && bytes.get(i + 1) == Some(&b'"') {
                    i += 1; // escaped quote
                } else {
                    in_quotes = !in_quotes;
                }
            }
            b if !in_quotes && b == delimiter => count += 1,
            _ => {}
        }
        i += 1;
    }

    count
}

/// Pick the delimiter occurring most often outside quotes in the first few
/// non-empty lines. Falls back to a comma.
pub fn detect_delimiter(text: &str) -> u8 {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(DETECTION_LINES)
        .collect();

    let mut best = b',';
    let mut best_score = 0;

    for delimiter in DELIMITER_CANDIDATES {
        let score: usize = lines
            .iter()
            .map(|line| count_outside_quotes(line, delimiter))
            .sum();
        if score > best_score {
            best_score = score;
            best = delimiter;
        }
    }

    best
}

/// Parse CSV text into a header-keyed table.
///
/// Strips a UTF-8 BOM, lowercases headers, trims all fields, and skips rows
/// whose every cell is blank.
pub fn parse_table(text: &str) -> Result<RawTable, ImportError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let delimiter = detect_delimiter(text);
    debug!("detected CSV delimiter: {:?}", delimiter as char);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let mut row = HashMap::with_capacity(headers.len());
        for (i, header) in headers.iter().enumerate() {
            row.insert(header.clone(), record.get(i).unwrap_or("").trim().to_string());
        }
        rows.push(row);
    }

    Ok(RawTable { headers, rows })
}
