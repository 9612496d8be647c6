//! Caller-owned session context holding uploaded tables between actions.
//!
//! Each source role accumulates into a [`Lot`]; re-uploading a file name
//! already in the lot is suppressed. Ingestion is batch-tolerant: a file
//! that cannot be read is logged and dropped while the rest proceed.

use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::{reader, table::Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LotKind {
    Catalogue,
    History,
    Client,
}

impl LotKind {
    pub fn label(self) -> &'static str {
        match self {
            LotKind::Catalogue => "catalogue",
            LotKind::History => "history",
            LotKind::Client => "client",
        }
    }
}

#[derive(Debug, Default)]
pub struct Lot {
    tables: Vec<Table>,
    names: Vec<String>,
}

impl Lot {
    /// Adds a parsed table under its file name; duplicate names are ignored.
    pub fn add(&mut self, name: &str, table: Table) -> bool {
        if self.names.iter().any(|n| n == name) {
            return false;
        }
        self.names.push(name.to_string());
        self.tables.push(table);
        true
    }

    pub fn file_count(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Concatenates the lot's tables by column-name union, strips stray
    /// repeated header rows (a row whose first cell equals the first column
    /// name), and deduplicates whole rows in first-seen order.
    pub fn combined(&self) -> Option<Table> {
        let mut combined = Table::concat(&self.tables)?;
        if let Some(first_header) = combined.columns.first().cloned() {
            combined
                .rows
                .retain(|row| row.first().and_then(|c| c.as_deref()) != Some(first_header.as_str()));
        }
        combined.dedup_rows();
        Some(combined)
    }
}

/// Intermediate pipeline artifacts owned by one user's run. No process-wide
/// state: callers create, append into, and clear their own session.
#[derive(Debug, Default)]
pub struct Session {
    pub catalogue: Lot,
    pub history: Lot,
    pub client: Lot,
    pub entity: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lot_mut(&mut self, kind: LotKind) -> &mut Lot {
        match kind {
            LotKind::Catalogue => &mut self.catalogue,
            LotKind::History => &mut self.history,
            LotKind::Client => &mut self.client,
        }
    }

    /// Reads each path into the given lot. Unreadable files are reported and
    /// skipped; the return value is the number of files actually added.
    pub fn ingest(&mut self, kind: LotKind, paths: &[impl AsRef<Path>]) -> Result<usize> {
        let mut added = 0usize;
        for path in paths {
            let path = path.as_ref();
            let bytes = std::fs::read(path).with_context(|| format!("Reading {path:?}"))?;
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("<unnamed>");
            match reader::read_bytes(name, &bytes) {
                Ok(table) => {
                    if self.lot_mut(kind).add(name, table) {
                        added += 1;
                    } else {
                        info!("{name}: already present in the {} lot", kind.label());
                    }
                }
                Err(err) => warn!("{} lot: skipping file: {err}", kind.label()),
            }
        }
        info!(
            "{} lot now holds {} file(s)",
            kind.label(),
            self.lot_mut(kind).file_count()
        );
        Ok(added)
    }

    /// Trims and uppercases the batch label before storing it.
    pub fn set_entity(&mut self, entity: &str) {
        let normalized = entity.trim().to_uppercase();
        self.entity = if normalized.is_empty() {
            None
        } else {
            Some(normalized)
        };
    }

    /// Drops every uploaded table and the entity label.
    pub fn clear(&mut self) {
        *self = Session::new();
    }
}
