//! Upload parsing.
//!
//! Turns raw spreadsheet bytes into a header row plus normalized data rows.
//! Delimiter is auto-detected; the first non-empty row is always the header,
//! since the import contract requires one.

use csv::{ReaderBuilder, Terminator};

use super::imports_errors::ImportError;
use crate::Result;

/// A parsed upload before it becomes a retained dataset.
#[derive(Debug, Clone)]
pub struct ParsedSheet {
    /// Header cells, trimmed, in file order.
    pub columns: Vec<String>,
    /// Data rows, padded or truncated to the header arity.
    pub rows: Vec<Vec<String>>,
}

/// Parses spreadsheet bytes into header and data rows.
///
/// Fails when the content cannot be decoded, carries no header row, or
/// contains no data rows at all.
pub fn parse_sheet(content: &[u8]) -> Result<ParsedSheet> {
    let text = decode_content(content)?;
    let delimiter = detect_delimiter(&text);

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false) // headers handled manually
        .flexible(true)
        .terminator(Terminator::Any(b'\n'))
        .from_reader(text.as_bytes());

    let mut records: Vec<Vec<String>> = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            ImportError::InvalidData(format!("Failed to parse row {}: {}", index + 1, e))
        })?;
        let row: Vec<String> = record.iter().map(|cell| cell.to_string()).collect();
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        records.push(row);
    }

    if records.is_empty() {
        return Err(ImportError::EmptyFile.into());
    }

    let mut rows = records.into_iter();
    let columns: Vec<String> = rows
        .next()
        .unwrap_or_default()
        .iter()
        .map(|cell| cell.trim().to_string())
        .collect();

    // Pad short rows and truncate long ones so every row matches the header.
    let width = columns.len();
    let rows: Vec<Vec<String>> = rows
        .map(|mut row| {
            if row.len() < width {
                row.resize(width, String::new());
            } else {
                row.truncate(width);
            }
            row
        })
        .collect();

    Ok(ParsedSheet { columns, rows })
}

/// Decodes content bytes to UTF-8, stripping a BOM if present. Content that
/// is not valid UTF-8 is rejected rather than silently replaced.
fn decode_content(content: &[u8]) -> Result<String> {
    let stripped = content.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(content);
    match std::str::from_utf8(stripped) {
        Ok(text) => Ok(text.to_string()),
        Err(e) => Err(ImportError::InvalidData(format!(
            "File is not valid UTF-8 (error at byte {})",
            e.valid_up_to()
        ))
        .into()),
    }
}

/// Picks the delimiter whose per-line counts are most numerous and most
/// consistent over the first lines of the file.
fn detect_delimiter(content: &str) -> u8 {
    let mut best = b',';
    let mut best_score = 0usize;

    for candidate in [b',', b';', b'\t'] {
        let score = score_delimiter(content, candidate as char);
        if score > best_score {
            best_score = score;
            best = candidate;
        }
    }

    best
}

fn score_delimiter(content: &str, delimiter: char) -> usize {
    let counts: Vec<usize> = content
        .lines()
        .take(10)
        .map(|line| line.matches(delimiter).count())
        .collect();

    let Some(&first) = counts.first() else {
        return 0;
    };
    if first == 0 {
        return 0;
    }

    let consistent = counts.iter().filter(|&&c| c == first).count();
    first * consistent
}
