//! Gap filling from a completed worklist, with optional majority-vote
//! inference.
//!
//! Filling is left-biased: an existing client code is never overwritten,
//! even when the supplementary mapping disagrees, so applying the same
//! mapping twice is a no-op the second time. Inference is best-effort and
//! reported separately from directly-sourced codes.

use std::collections::HashMap;

use log::info;
use serde::Serialize;

use crate::{
    columns::{CLIENT_CODE, CURRENT_M2, REFERENCE},
    error::PipelineError,
    table::Table,
};

/// Key→code association built from a completed worklist. When a key appears
/// more than once, the first non-null code wins.
#[derive(Debug, Default)]
pub struct Mapping {
    codes: HashMap<String, String>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a worklist table into the mapping given 0-based key and code
    /// column positions.
    pub fn absorb(&mut self, table: &Table, key_pos: usize, code_pos: usize) {
        for row in &table.rows {
            let Some(key) = row.get(key_pos).cloned().flatten() else {
                continue;
            };
            let Some(code) = row.get(code_pos).cloned().flatten() else {
                continue;
            };
            self.codes.entry(key).or_insert(code);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.codes.get(key).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// A code assigned by majority vote rather than sourced directly.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InferredCode {
    pub reference: String,
    pub code: String,
}

/// Audit summary of a fill run, serializable for the `--report` output.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FillReport {
    pub total_rows: usize,
    pub coded_before: usize,
    pub coded_after_fill: usize,
    pub coded_after_inference: usize,
    pub inferred: Vec<InferredCode>,
}

/// Applies the supplementary mapping to `merged`, filling only rows whose
/// client code is null. Returns the filled table and the audit counts.
pub fn apply_updates(
    merged: &Table,
    mapping: &Mapping,
) -> Result<(Table, FillReport), PipelineError> {
    let key_pos = merged
        .column_index(REFERENCE)
        .ok_or_else(|| PipelineError::MissingKeyColumn("merged".to_string(), REFERENCE.into()))?;
    let code_pos = merged
        .column_index(CLIENT_CODE)
        .ok_or_else(|| PipelineError::MissingKeyColumn("merged".to_string(), CLIENT_CODE.into()))?;

    let mut filled = merged.clone();
    let mut report = FillReport {
        total_rows: filled.row_count(),
        ..FillReport::default()
    };

    for row in &mut filled.rows {
        if row[code_pos].is_some() {
            report.coded_before += 1;
            continue;
        }
        if let Some(key) = row[key_pos].as_deref()
            && let Some(code) = mapping.get(key)
        {
            row[code_pos] = Some(code.to_string());
        }
    }
    report.coded_after_fill = count_coded(&filled, code_pos);
    report.coded_after_inference = report.coded_after_fill;
    info!(
        "Applied {} update(s): {} of {} row(s) coded before, {} after fill",
        mapping.len(),
        report.coded_before,
        report.total_rows,
        report.coded_after_fill
    );
    Ok((filled, report))
}

/// Majority-vote inference over a secondary grouping column (default: the
/// current-period code).
///
/// Rows that already carry a code vote within their group; the most frequent
/// code wins, ties broken by the lexicographically smallest code. The winner
/// is applied to every still-codeless row of the same group. Rows whose
/// group key is null never vote and are never filled.
pub fn infer_codes(
    table: &mut Table,
    group_column: &str,
    report: &mut FillReport,
) -> Result<(), PipelineError> {
    let key_pos = table
        .column_index(REFERENCE)
        .ok_or_else(|| PipelineError::MissingKeyColumn("final".to_string(), REFERENCE.into()))?;
    let code_pos = table
        .column_index(CLIENT_CODE)
        .ok_or_else(|| PipelineError::MissingKeyColumn("final".to_string(), CLIENT_CODE.into()))?;
    let group_pos = table.column_index(group_column).ok_or_else(|| {
        PipelineError::MissingKeyColumn("final".to_string(), group_column.to_string())
    })?;

    let mut votes: HashMap<String, HashMap<String, usize>> = HashMap::new();
    for row in &table.rows {
        if let Some(group) = row[group_pos].as_deref()
            && let Some(code) = row[code_pos].as_deref()
        {
            *votes
                .entry(group.to_string())
                .or_default()
                .entry(code.to_string())
                .or_insert(0) += 1;
        }
    }

    let winners: HashMap<String, String> = votes
        .into_iter()
        .map(|(group, counts)| {
            let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
            ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            (group, ranked[0].0.clone())
        })
        .collect();

    for row in &mut table.rows {
        if row[code_pos].is_some() {
            continue;
        }
        if let Some(group) = row[group_pos].as_deref()
            && let Some(code) = winners.get(group)
        {
            row[code_pos] = Some(code.clone());
            report.inferred.push(InferredCode {
                reference: row[key_pos].clone().unwrap_or_default(),
                code: code.clone(),
            });
        }
    }
    report.coded_after_inference = count_coded(table, code_pos);
    info!(
        "Inferred {} code(s) by majority vote on '{group_column}'",
        report.inferred.len()
    );
    Ok(())
}

/// Default grouping column for inference.
pub fn default_inference_key() -> &'static str {
    CURRENT_M2
}

fn count_coded(table: &Table, code_pos: usize) -> usize {
    table
        .rows
        .iter()
        .filter(|row| row.get(code_pos).map(|c| c.is_some()).unwrap_or(false))
        .count()
}
