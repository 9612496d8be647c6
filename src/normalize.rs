//! Schema normalization: positional column selection into role-specific
//! record sets.
//!
//! Sources arrive with varying header text, so the key and value columns are
//! chosen by 1-based *position*, validated before any access. Descriptor
//! columns ride along by exact name when the source happens to carry them.

use crate::{
    columns::{CLIENT_CODE, CURRENT_M2, HISTORY_DESCRIPTORS, PREVIOUS_M2, REFERENCE},
    error::PipelineError,
    table::Table,
};

/// Produces a normalized record set from `table`.
///
/// `key_index` and `value_index` are 1-based positions. The key column is
/// renamed to the canonical reference name and the value column to
/// `value_name`; any of `extra` present in the source under exactly those
/// names are retained after the value column, absent ones silently omitted.
/// Rows are neither filtered nor deduplicated.
pub fn normalize(
    table: &Table,
    source: &str,
    key_index: usize,
    value_index: usize,
    value_name: &str,
    extra: &[&str],
) -> Result<Table, PipelineError> {
    let key_pos = check_index(table, source, key_index)?;
    let value_pos = check_index(table, source, value_index)?;

    let mut columns = vec![REFERENCE.to_string(), value_name.to_string()];
    let mut positions = vec![key_pos, value_pos];
    for name in extra {
        if let Some(pos) = table.column_index(name)
            && pos != key_pos
            && pos != value_pos
        {
            columns.push(name.to_string());
            positions.push(pos);
        }
    }

    let mut out = Table::new(columns);
    for row in &table.rows {
        let projected = positions
            .iter()
            .map(|&pos| row.get(pos).cloned().flatten())
            .collect();
        out.push_row(projected);
    }
    Ok(out)
}

/// Catalogue role: key + current-period code.
pub fn normalize_catalogue(
    table: &Table,
    key_index: usize,
    value_index: usize,
) -> Result<Table, PipelineError> {
    normalize(table, "catalogue", key_index, value_index, CURRENT_M2, &[])
}

/// History role: key + prior-period code + descriptor pass-through.
pub fn normalize_history(
    table: &Table,
    key_index: usize,
    value_index: usize,
) -> Result<Table, PipelineError> {
    normalize(
        table,
        "history",
        key_index,
        value_index,
        PREVIOUS_M2,
        &HISTORY_DESCRIPTORS,
    )
}

/// Client role: key + client-assigned family code.
pub fn normalize_client(
    table: &Table,
    key_index: usize,
    value_index: usize,
) -> Result<Table, PipelineError> {
    normalize(table, "client", key_index, value_index, CLIENT_CODE, &[])
}

/// Validates a 1-based index against the table width and converts it to a
/// 0-based position.
fn check_index(table: &Table, source: &str, index: usize) -> Result<usize, PipelineError> {
    if index == 0 || index > table.width() {
        return Err(PipelineError::ColumnIndexOutOfRange {
            origin: source.to_string(),
            index,
            width: table.width(),
        });
    }
    Ok(index - 1)
}
