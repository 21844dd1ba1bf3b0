//! tabular
//!
//! Minimal delimited-text reading and writing for the layer files and the
//! canonical output.
//!
//! # Format
//!
//! Comma-separated with a header row, UTF-8, RFC 4180 quoting: values
//! containing `,`, `"`, or newlines are wrapped in double-quotes and
//! internal `"` doubled. Rows shorter than the header leave the trailing
//! columns absent; absent and empty cells are equivalent.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use thiserror::Error;

/// An untyped field-to-string mapping for one input row. Ephemeral.
pub type RawRow = BTreeMap<String, String>;

/// Errors from tabular parsing and writing.
#[derive(Debug, Error)]
pub enum TabularError {
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is missing a header row")]
    MissingHeader { path: String },

    #[error("{path}: unterminated quoted cell starting near record {record}")]
    UnterminatedQuote { path: String, record: usize },
}

/// Read a delimited file into raw rows keyed by header name.
///
/// Empty cells are omitted from the row map, so "absent" and "empty" are
/// indistinguishable downstream - the override rule requires exactly that.
pub fn read_rows(path: &Path) -> Result<Vec<RawRow>, TabularError> {
    let content = fs::read_to_string(path).map_err(|source| TabularError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let records = parse_records(&content, path)?;
    let mut iter = records.into_iter();
    let header = match iter.next() {
        Some(header) if !header.is_empty() => header,
        _ => {
            return Err(TabularError::MissingHeader {
                path: path.display().to_string(),
            })
        }
    };

    let mut rows = Vec::new();
    for record in iter {
        // A lone empty cell is an artifact of a trailing blank line.
        if record.len() == 1 && record[0].is_empty() {
            continue;
        }
        let mut row = RawRow::new();
        for (column, value) in header.iter().zip(record) {
            if !value.is_empty() {
                row.insert(column.clone(), value);
            }
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Write a header and rows to a delimited file.
pub fn write_rows<I>(path: &Path, header: &[&str], rows: I) -> Result<(), TabularError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut out = Vec::new();
    write_record(&mut out, header.iter().copied());
    for row in rows {
        write_record(&mut out, row.iter().map(String::as_str));
    }
    fs::write(path, out).map_err(|source| TabularError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Format rows to an in-memory buffer. Used for fingerprinting the
/// canonical set without touching the filesystem.
pub fn format_rows<I>(header: &[&str], rows: I) -> Vec<u8>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut out = Vec::new();
    write_record(&mut out, header.iter().copied());
    for row in rows {
        write_record(&mut out, row.iter().map(String::as_str));
    }
    out
}

fn write_record<'a, I>(out: &mut Vec<u8>, cells: I)
where
    I: IntoIterator<Item = &'a str>,
{
    for (i, cell) in cells.into_iter().enumerate() {
        if i > 0 {
            out.push(b',');
        }
        flush_cell(out, cell.as_bytes());
    }
    out.push(b'\n');
}

/// RFC 4180 quoting: wrap in double-quotes when the cell contains `,`, `"`,
/// or a newline; double any internal `"`.
fn flush_cell(out: &mut Vec<u8>, cell: &[u8]) {
    let needs_quoting = cell
        .iter()
        .any(|&b| b == b',' || b == b'"' || b == b'\n' || b == b'\r');

    if !needs_quoting {
        out.extend_from_slice(cell);
        return;
    }

    out.push(b'"');
    for &b in cell {
        if b == b'"' {
            out.push(b'"');
        }
        out.push(b);
    }
    out.push(b'"');
}

/// Parse the full file content into records of cells.
fn parse_records(content: &str, path: &Path) -> Result<Vec<Vec<String>>, TabularError> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        cell.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ => cell.push(c),
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => {
                record.push(std::mem::take(&mut cell));
            }
            '\n' => {
                record.push(std::mem::take(&mut cell));
                records.push(std::mem::take(&mut record));
            }
            '\r' => {
                // Swallow the \n of a \r\n pair; bare \r also ends the record.
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                record.push(std::mem::take(&mut cell));
                records.push(std::mem::take(&mut record));
            }
            _ => cell.push(c),
        }
    }

    if in_quotes {
        return Err(TabularError::UnterminatedQuote {
            path: path.display().to_string(),
            record: records.len() + 1,
        });
    }
    if !cell.is_empty() || !record.is_empty() {
        record.push(cell);
        records.push(record);
    }
    Ok(records)
}
