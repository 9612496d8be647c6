//! Three-way outer join of the normalized record sets.
//!
//! The join is applied pairwise left-to-right on the canonical reference
//! column; order affects column layout only, not row membership. Duplicate
//! keys match cross-product, mirroring the behavior of the historical
//! merge. A constant entity column is appended to every row, and the rows
//! whose client code is null are split out as the missing-value worklist.

use std::collections::HashMap;

use log::{info, warn};

use crate::{
    columns::{CLIENT_CODE, ENTITY, REFERENCE},
    error::PipelineError,
    table::{Row, Table},
};

#[derive(Debug, Clone, Copy)]
pub struct MergeOptions {
    /// Retain rows whose reference is null (merged under the empty-string
    /// key) instead of dropping them before the join.
    pub keep_null_refs: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            keep_null_refs: false,
        }
    }
}

#[derive(Debug)]
pub struct MergeOutcome {
    pub merged: Table,
    pub missing: Table,
}

/// Outer-joins catalogue, history, and client sets and partitions the result.
pub fn merge(
    current: &Table,
    previous: &Table,
    client: &Table,
    entity: &str,
    options: MergeOptions,
) -> Result<MergeOutcome, PipelineError> {
    let current = prepare(current, "catalogue", options)?;
    let previous = prepare(previous, "history", options)?;
    let client = prepare(client, "client", options)?;

    let step = outer_join(&current, &previous)?;
    let mut merged = outer_join(&step, &client)?;

    merged.columns.push(ENTITY.to_string());
    for row in &mut merged.rows {
        row.push(Some(entity.to_string()));
    }

    let missing = missing_subset(&merged)?;
    info!(
        "Merged {} row(s); {} missing a client code",
        merged.row_count(),
        missing.row_count()
    );
    Ok(MergeOutcome { merged, missing })
}

/// Recomputes the missing-value subset of a merged or finalized table.
pub fn missing_subset(merged: &Table) -> Result<Table, PipelineError> {
    let code_pos = merged
        .column_index(CLIENT_CODE)
        .ok_or_else(|| PipelineError::MissingKeyColumn("merged".to_string(), CLIENT_CODE.into()))?;
    let mut missing = Table::new(merged.columns.clone());
    for row in &merged.rows {
        if row.get(code_pos).map(|c| c.is_none()).unwrap_or(true) {
            missing.push_row(row.clone());
        }
    }
    Ok(missing)
}

fn prepare(table: &Table, source: &str, options: MergeOptions) -> Result<Table, PipelineError> {
    let key_pos = table
        .column_index(REFERENCE)
        .ok_or_else(|| PipelineError::MissingKeyColumn(source.to_string(), REFERENCE.into()))?;
    if options.keep_null_refs {
        return Ok(table.clone());
    }
    let mut kept = Table::new(table.columns.clone());
    for row in &table.rows {
        if row.get(key_pos).map(|c| c.is_some()).unwrap_or(false) {
            kept.push_row(row.clone());
        }
    }
    let dropped = table.row_count() - kept.row_count();
    if dropped > 0 {
        warn!("{source}: dropped {dropped} row(s) with a null reference before merging");
    }
    Ok(kept)
}

/// Full outer join of two tables on the canonical reference column.
///
/// Output columns are the left columns followed by the right columns minus
/// the right key. Left rows come first (each matched against every right row
/// sharing its key, or null-padded), then unmatched right rows in input
/// order with their key moved into the key column.
pub fn outer_join(left: &Table, right: &Table) -> Result<Table, PipelineError> {
    let left_key = left
        .column_index(REFERENCE)
        .ok_or_else(|| PipelineError::MissingKeyColumn("left".to_string(), REFERENCE.into()))?;
    let right_key = right
        .column_index(REFERENCE)
        .ok_or_else(|| PipelineError::MissingKeyColumn("right".to_string(), REFERENCE.into()))?;

    let right_columns: Vec<usize> = (0..right.width()).filter(|&i| i != right_key).collect();
    let mut columns = left.columns.clone();
    columns.extend(right_columns.iter().map(|&i| right.columns[i].clone()));

    let mut lookup: HashMap<String, Vec<(usize, bool)>> = HashMap::new();
    let mut right_order: Vec<String> = Vec::new();
    for (idx, row) in right.rows.iter().enumerate() {
        let key = key_of(row, right_key);
        let bucket = lookup.entry(key.clone()).or_insert_with(|| {
            right_order.push(key);
            Vec::new()
        });
        bucket.push((idx, false));
    }

    let mut out = Table::new(columns);
    for row in &left.rows {
        let key = key_of(row, left_key);
        match lookup.get_mut(&key) {
            Some(bucket) => {
                for (right_idx, matched) in bucket.iter_mut() {
                    *matched = true;
                    let mut combined: Row = row.clone();
                    let right_row = &right.rows[*right_idx];
                    combined.extend(
                        right_columns
                            .iter()
                            .map(|&i| right_row.get(i).cloned().flatten()),
                    );
                    out.push_row(combined);
                }
            }
            None => {
                let mut combined: Row = row.clone();
                combined.extend(right_columns.iter().map(|_| None));
                out.push_row(combined);
            }
        }
    }

    for key in &right_order {
        for (right_idx, matched) in &lookup[key] {
            if *matched {
                continue;
            }
            let right_row = &right.rows[*right_idx];
            let mut combined: Row = vec![None; left.width()];
            combined[left_key] = right_row.get(right_key).cloned().flatten();
            combined.extend(
                right_columns
                    .iter()
                    .map(|&i| right_row.get(i).cloned().flatten()),
            );
            out.push_row(combined);
        }
    }

    Ok(out)
}

fn key_of(row: &Row, key_pos: usize) -> String {
    row.get(key_pos)
        .and_then(|c| c.clone())
        .unwrap_or_default()
}
