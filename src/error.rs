//! Typed error taxonomy for ingestion and pipeline stages.
//!
//! [`ReadError`] variants are recoverable per file: lot ingestion logs them
//! and drops the offending file while the rest of the batch proceeds.
//! [`PipelineError`] variants are fatal to the current run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReadError {
    /// No supported encoding/delimiter combination parsed the stream.
    #[error("{0}: encoding or delimiter not recognized")]
    UnreadableFile(String),
    /// Spreadsheet support was not compiled into this binary.
    #[error("{0}: spreadsheet support unavailable (build with the 'spreadsheet' feature)")]
    MissingDependency(String),
    /// File extension is not one of csv/txt/xlsx/xls.
    #[error("{0}: unsupported file format")]
    UnsupportedFormat(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A user-chosen 1-based column index exceeds the table width (or is 0).
    #[error("column index {index} out of range for '{origin}' ({width} column(s))")]
    ColumnIndexOutOfRange {
        origin: String,
        index: usize,
        width: usize,
    },
    /// A required input (a source lot, the entity label, a key column) is
    /// absent when an action is invoked.
    #[error("{0}")]
    MissingPrecondition(String),
    /// An input table lacks the canonical key column.
    #[error("'{0}' has no '{1}' column")]
    MissingKeyColumn(String, String),
}
