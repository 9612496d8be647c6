//! In-memory table model shared by every pipeline stage.
//!
//! Cells are `Option<String>`: the reader maps empty fields to `None`, and
//! the missing-subset and gap-filling logic are defined over that null
//! representation. Stages never mutate their inputs; each returns a fresh
//! [`Table`].

use itertools::Itertools;

pub type Row = Vec<Option<String>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// First column with the given name, if any. Duplicate header names are
    /// tolerated; lookups resolve to the leftmost occurrence.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Pushes a row, padding or truncating to the table width.
    pub fn push_row(&mut self, mut row: Row) {
        row.resize(self.width(), None);
        self.rows.push(row);
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .and_then(|c| c.as_deref())
    }

    /// Projects the named columns into a new table, in the given order.
    /// Callers must have validated that every name exists.
    pub fn project(&self, names: &[&str]) -> Table {
        let indices: Vec<Option<usize>> = names.iter().map(|n| self.column_index(n)).collect();
        let mut out = Table::new(names.iter().map(|n| n.to_string()).collect());
        for row in &self.rows {
            let projected = indices
                .iter()
                .map(|idx| idx.and_then(|i| row.get(i).cloned().flatten()))
                .collect();
            out.push_row(projected);
        }
        out
    }

    /// Removes duplicate rows, keeping the first occurrence of each.
    pub fn dedup_rows(&mut self) {
        self.rows = std::mem::take(&mut self.rows).into_iter().unique().collect();
    }

    /// Concatenates tables by column-name union, in order of first
    /// appearance. Cells absent from a source table become null.
    pub fn concat(tables: &[Table]) -> Option<Table> {
        if tables.is_empty() {
            return None;
        }
        let mut columns: Vec<String> = Vec::new();
        for table in tables {
            for name in &table.columns {
                if !columns.contains(name) {
                    columns.push(name.clone());
                }
            }
        }
        let mut out = Table::new(columns);
        for table in tables {
            let mapping: Vec<Option<usize>> = out
                .columns
                .iter()
                .map(|name| table.column_index(name))
                .collect();
            for row in &table.rows {
                let aligned = mapping
                    .iter()
                    .map(|idx| idx.and_then(|i| row.get(i).cloned().flatten()))
                    .collect();
                out.push_row(aligned);
            }
        }
        Some(out)
    }
}
