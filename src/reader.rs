//! Robust tabular ingestion: unknown encoding, unknown delimiter, malformed
//! rows, or a spreadsheet container.
//!
//! Delimited text is read by trying each entry of
//! [`io_utils::ENCODING_CANDIDATES`] in order: decode a leading sample,
//! sniff the delimiter on it, then decode and parse the full stream. The
//! first combination that works wins, so detection is deterministic for
//! identical bytes. Records whose field count disagrees with the header are
//! skipped and counted, never fatal.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use log::{debug, warn};

use crate::{
    error::ReadError,
    io_utils::{self, ENCODING_CANDIDATES, SNIFF_SAMPLE_LEN},
    table::Table,
};

/// Reads a file from disk and parses it according to its extension.
pub fn read_path(path: &Path) -> Result<Table> {
    let bytes = fs::read(path).with_context(|| format!("Reading input file {path:?}"))?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unnamed>");
    Ok(read_bytes(name, &bytes)?)
}

/// Parses an uploaded byte stream according to its declared file name.
pub fn read_bytes(name: &str, bytes: &[u8]) -> Result<Table, ReadError> {
    match io_utils::extension_of(name).as_deref() {
        Some("csv") | Some("txt") => read_delimited(name, bytes),
        Some("xlsx") | Some("xls") => read_spreadsheet(name, bytes),
        _ => Err(ReadError::UnsupportedFormat(name.to_string())),
    }
}

fn read_delimited(name: &str, bytes: &[u8]) -> Result<Table, ReadError> {
    let sample_len = bytes.len().min(SNIFF_SAMPLE_LEN);
    let truncated = bytes.len() > sample_len;

    for encoding in ENCODING_CANDIDATES {
        // The sample may cut a multibyte character at the window edge, so it
        // is decoded leniently; the full-stream decode below is the gate
        // that rejects an encoding.
        let sample = io_utils::decode_lossy(&bytes[..sample_len], encoding);
        let Some(delimiter) = io_utils::sniff_delimiter(&sample, truncated) else {
            continue;
        };
        let Some(text) = io_utils::decode_strict(bytes, encoding) else {
            continue;
        };
        debug!(
            "{name}: decoded as {} with delimiter '{}'",
            encoding.name(),
            printable_delimiter(delimiter)
        );
        return parse_delimited(name, &text, delimiter);
    }
    Err(ReadError::UnreadableFile(name.to_string()))
}

/// Parses decoded text with a permissive CSV reader. The first record is the
/// header; records of a different width are dropped (pandas
/// `on_bad_lines='skip'` tolerance), as are records the parser rejects.
fn parse_delimited(name: &str, text: &str, delimiter: u8) -> Result<Table, ReadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = reader.records();
    let headers: Vec<String> = match records.next() {
        Some(Ok(record)) => record.iter().map(|f| f.trim().to_string()).collect(),
        _ => return Err(ReadError::UnreadableFile(name.to_string())),
    };

    let mut table = Table::new(headers);
    let mut skipped = 0usize;
    for record in records {
        let record = match record {
            Ok(record) => record,
            Err(_) => {
                skipped += 1;
                continue;
            }
        };
        if record.len() != table.width() {
            skipped += 1;
            continue;
        }
        let row = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    None
                } else {
                    Some(field.to_string())
                }
            })
            .collect();
        table.push_row(row);
    }
    if skipped > 0 {
        warn!("{name}: skipped {skipped} malformed record(s)");
    }
    Ok(table)
}

#[cfg(feature = "spreadsheet")]
fn read_spreadsheet(name: &str, bytes: &[u8]) -> Result<Table, ReadError> {
    use calamine::{Data, Reader};
    use std::io::Cursor;

    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook = calamine::open_workbook_auto_from_rs(cursor)
        .map_err(|_| ReadError::UnreadableFile(name.to_string()))?;
    let first_sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ReadError::UnreadableFile(name.to_string()))?;
    let range = workbook
        .worksheet_range(&first_sheet)
        .map_err(|_| ReadError::UnreadableFile(name.to_string()))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(row) => row.iter().map(render_cell_text).collect(),
        None => return Err(ReadError::UnreadableFile(name.to_string())),
    };

    let mut table = Table::new(headers);
    for row in rows {
        let cells = row
            .iter()
            .map(|cell| match cell {
                Data::Empty => None,
                other => Some(render_cell_text(other)),
            })
            .collect();
        table.push_row(cells);
    }
    Ok(table)
}

#[cfg(feature = "spreadsheet")]
fn render_cell_text(cell: &calamine::Data) -> String {
    use calamine::Data;
    match cell {
        Data::Float(value) if value.fract() == 0.0 => format!("{value:.0}"),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

#[cfg(not(feature = "spreadsheet"))]
fn read_spreadsheet(name: &str, _bytes: &[u8]) -> Result<Table, ReadError> {
    Err(ReadError::MissingDependency(name.to_string()))
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
