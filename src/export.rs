//! Export formatting: the merged/final CSV, the worklist workbook, the
//! fixed-column downstream export, and the acknowledgement artifact.
//!
//! Layouts and file names are protocol contracts of the downstream system
//! and are reproduced byte-for-byte; none of them is configurable.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::QuoteStyle;
use itertools::Itertools;
use log::info;

use crate::{
    columns::{CLIENT_CODE, REFERENCE},
    error::PipelineError,
    io_utils,
    table::Table,
};

/// `YYMMDD` stamp used by every dated file name and the acknowledgement.
pub fn date_stamp(date: NaiveDate) -> String {
    date.format("%y%m%d").to_string()
}

pub fn dff_file_name(entity: &str, stamp: &str) -> String {
    format!("DFF_{entity}_{stamp}.csv")
}

pub fn worklist_file_name(entity: &str, stamp: &str) -> String {
    format!("CODES_CLIENT_{entity}_{stamp}.xlsx")
}

pub fn missing_file_name(stamp: &str) -> String {
    format!("CODES_MANQUANTS_{stamp}.csv")
}

pub fn dfrx_file_name(stamp: &str) -> String {
    format!("DFRXHYBRCMR{stamp}0000")
}

pub fn ack_file_name(stamp: &str) -> String {
    format!("AFRXHYBRCMR{stamp}0000.txt")
}

/// Writes a record set as the internal `;`-delimited CSV: UTF-8, header row,
/// minimal quoting, null cells as empty fields.
pub fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let mut writer = io_utils::open_export_writer(path, b';', QuoteStyle::Necessary)?;
    writer
        .write_record(&table.columns)
        .context("Writing CSV header")?;
    for row in &table.rows {
        writer
            .write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))
            .context("Writing CSV row")?;
    }
    writer.flush().context("Flushing CSV output")?;
    info!("Wrote {} row(s) to {path:?}", table.row_count());
    Ok(())
}

/// Writes the client worklist workbook: reference, the chosen descriptor
/// columns, then an empty client-code column to be filled externally.
/// Descriptors absent from `source` are skipped.
#[cfg(feature = "spreadsheet")]
pub fn write_worklist(source: &Table, descriptors: &[String], path: &Path) -> Result<()> {
    use rust_xlsxwriter::Workbook;

    let mut names: Vec<&str> = vec![REFERENCE];
    names.extend(
        descriptors
            .iter()
            .map(|d| d.as_str())
            .filter(|d| source.column_index(d).is_some() && *d != REFERENCE && *d != CLIENT_CODE),
    );
    let sheet_rows = source.project(&names);

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    for (col, name) in sheet_rows.columns.iter().enumerate() {
        worksheet.write_string(0, col as u16, name.as_str())?;
    }
    worksheet.write_string(0, sheet_rows.width() as u16, CLIENT_CODE)?;
    for (row_idx, row) in sheet_rows.rows.iter().enumerate() {
        for (col, cell) in row.iter().enumerate() {
            if let Some(value) = cell {
                worksheet.write_string(row_idx as u32 + 1, col as u16, value.as_str())?;
            }
        }
    }
    workbook
        .save(path)
        .with_context(|| format!("Writing worklist workbook {path:?}"))?;
    info!("Wrote worklist of {} row(s) to {path:?}", sheet_rows.row_count());
    Ok(())
}

#[cfg(not(feature = "spreadsheet"))]
pub fn write_worklist(_source: &Table, _descriptors: &[String], path: &Path) -> Result<()> {
    Err(crate::error::ReadError::MissingDependency(path.display().to_string()).into())
}

/// Writes the downstream fixed-column export: tab-delimited, no header, four
/// columns (code, empty placeholder, entity, `M2_`-prefixed reference),
/// duplicate rows collapsed in first-seen order.
pub fn write_dfrx(table: &Table, entity: &str, path: &Path) -> Result<()> {
    let key_pos = table
        .column_index(REFERENCE)
        .ok_or_else(|| PipelineError::MissingKeyColumn("final".to_string(), REFERENCE.into()))?;
    let code_pos = table
        .column_index(CLIENT_CODE)
        .ok_or_else(|| PipelineError::MissingKeyColumn("final".to_string(), CLIENT_CODE.into()))?;

    let rows: Vec<[String; 4]> = table
        .rows
        .iter()
        .map(|row| {
            let code = row[code_pos].clone().unwrap_or_default();
            let reference = row[key_pos].clone().unwrap_or_default();
            [
                code,
                String::new(),
                entity.to_string(),
                format!("M2_{reference}"),
            ]
        })
        .unique()
        .collect();

    let mut writer = io_utils::open_export_writer(path, b'\t', QuoteStyle::Never)?;
    for row in &rows {
        writer.write_record(row).context("Writing DFRX row")?;
    }
    writer.flush().context("Flushing DFRX output")?;
    info!("Wrote {} row(s) to {path:?}", rows.len());
    Ok(())
}

/// Renders the single-line acknowledgement for the given `YYMMDD` stamp:
/// a constant template with the date substituted twice, 20 spaces of
/// padding, and the literal `OK000000` status.
pub fn acknowledgement(stamp: &str) -> String {
    format!(
        "DFRXHYBRCMR{stamp}000068230116ITDFRXHYBRCMR{stamp}RCMRHYBFRX                    OK000000"
    )
}

pub fn write_acknowledgement(stamp: &str, path: &Path) -> Result<()> {
    fs::write(path, acknowledgement(stamp))
        .with_context(|| format!("Writing acknowledgement {path:?}"))?;
    info!("Wrote acknowledgement to {path:?}");
    Ok(())
}
