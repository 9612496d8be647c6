pub mod cli;
pub mod columns;
pub mod error;
pub mod export;
pub mod fill;
pub mod io_utils;
pub mod merge;
pub mod normalize;
pub mod reader;
pub mod session;
pub mod table;

use std::{env, fs, sync::OnceLock};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use log::{LevelFilter, info, warn};

use crate::{
    cli::{AckArgs, Cli, Commands, FinalizeArgs, MergeArgs},
    columns::{CLIENT_CODE, REFERENCE},
    error::PipelineError,
    fill::Mapping,
    merge::MergeOptions,
    session::{LotKind, Session},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("classcode", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Merge(args) => handle_merge(&args),
        Commands::Finalize(args) => handle_finalize(&args),
        Commands::Ack(args) => handle_ack(&args),
    }
}

fn resolve_stamp(date: Option<NaiveDate>) -> String {
    export::date_stamp(date.unwrap_or_else(|| Local::now().date_naive()))
}

fn handle_merge(args: &MergeArgs) -> Result<()> {
    let mut session = Session::new();
    session.set_entity(&args.entity);
    session.ingest(LotKind::Catalogue, &args.catalogue)?;
    session.ingest(LotKind::History, &args.history)?;
    session.ingest(LotKind::Client, &args.client)?;

    let entity = session
        .entity
        .clone()
        .ok_or_else(|| PipelineError::MissingPrecondition("entity label is empty".into()))?;
    let raw_catalogue = combined_lot(&session.catalogue, LotKind::Catalogue)?;
    let raw_history = combined_lot(&session.history, LotKind::History)?;
    let raw_client = combined_lot(&session.client, LotKind::Client)?;

    let current =
        normalize::normalize_catalogue(&raw_catalogue, args.catalogue_ref, args.catalogue_value)?;
    let previous =
        normalize::normalize_history(&raw_history, args.history_ref, args.history_value)?;
    let client = normalize::normalize_client(&raw_client, args.client_ref, args.client_value)?;

    let options = MergeOptions {
        keep_null_refs: args.keep_null_refs,
    };
    let outcome = merge::merge(&current, &previous, &client, &entity, options)?;

    let stamp = resolve_stamp(args.date);
    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("Creating output directory {:?}", args.out_dir))?;

    let dff_path = args.out_dir.join(export::dff_file_name(&entity, &stamp));
    export::write_csv(&outcome.merged, &dff_path)?;
    let missing_path = args.out_dir.join(export::missing_file_name(&stamp));
    export::write_csv(&outcome.missing, &missing_path)?;

    let descriptors = if args.worklist_columns.is_empty() {
        columns::HISTORY_DESCRIPTORS
            .iter()
            .map(|d| d.to_string())
            .collect()
    } else {
        args.worklist_columns.clone()
    };
    let worklist_path = args
        .out_dir
        .join(export::worklist_file_name(&entity, &stamp));
    if let Err(err) = export::write_worklist(&outcome.missing, &descriptors, &worklist_path) {
        warn!("worklist not written: {err}");
    }

    info!(
        "Merge complete: {} row(s), {} missing code(s)",
        outcome.merged.row_count(),
        outcome.missing.row_count()
    );
    Ok(())
}

/// Combines a lot's tables, halting when nothing readable was ingested.
fn combined_lot(lot: &session::Lot, kind: LotKind) -> Result<table::Table> {
    lot.combined().ok_or_else(|| {
        PipelineError::MissingPrecondition(format!(
            "no readable file in the {} lot",
            kind.label()
        ))
        .into()
    })
}

fn handle_finalize(args: &FinalizeArgs) -> Result<()> {
    let entity = args.entity.trim().to_uppercase();
    if entity.is_empty() {
        return Err(PipelineError::MissingPrecondition("entity label is empty".into()).into());
    }

    let merged = reader::read_path(&args.merged)?;
    let mapping = build_mapping(args)?;
    if mapping.is_empty() {
        return Err(PipelineError::MissingPrecondition(
            "no readable update file with any resolved code".into(),
        )
        .into());
    }

    let (mut final_table, mut report) = fill::apply_updates(&merged, &mapping)?;
    if args.infer {
        let group_column = args
            .infer_key
            .as_deref()
            .unwrap_or(fill::default_inference_key());
        fill::infer_codes(&mut final_table, group_column, &mut report)?;
    }

    let stamp = resolve_stamp(args.date);
    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("Creating output directory {:?}", args.out_dir))?;

    let dff_path = args.out_dir.join(export::dff_file_name(&entity, &stamp));
    export::write_csv(&final_table, &dff_path)?;
    let remaining = merge::missing_subset(&final_table)?;
    let missing_path = args.out_dir.join(export::missing_file_name(&stamp));
    export::write_csv(&remaining, &missing_path)?;
    let dfrx_path = args.out_dir.join(export::dfrx_file_name(&stamp));
    export::write_dfrx(&final_table, &entity, &dfrx_path)?;
    let ack_path = args.out_dir.join(export::ack_file_name(&stamp));
    export::write_acknowledgement(&stamp, &ack_path)?;

    if let Some(report_path) = &args.report {
        let json = serde_json::to_string_pretty(&report).context("Serializing fill report")?;
        fs::write(report_path, json)
            .with_context(|| format!("Writing fill report {report_path:?}"))?;
        info!("Wrote fill report to {report_path:?}");
    }

    info!(
        "Finalize complete: {}/{} row(s) coded ({} inferred), {} gap(s) remain",
        report.coded_after_inference,
        report.total_rows,
        report.inferred.len(),
        remaining.row_count()
    );
    Ok(())
}

/// Builds the supplementary mapping from the update files. Each file is read
/// with the robust reader; unreadable ones are skipped with a warning. The
/// key and code columns default to the canonical header names and can be
/// overridden with 1-based indices.
fn build_mapping(args: &FinalizeArgs) -> Result<Mapping> {
    let mut mapping = Mapping::new();
    for path in &args.updates {
        let bytes = std::fs::read(path).with_context(|| format!("Reading {path:?}"))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("<unnamed>");
        let table = match reader::read_bytes(name, &bytes) {
            Ok(table) => table,
            Err(err) => {
                warn!("updates: skipping file: {err}");
                continue;
            }
        };
        let key_pos = locate(&table, name, REFERENCE, args.updates_ref)?;
        let code_pos = locate(&table, name, CLIENT_CODE, args.updates_code)?;
        mapping.absorb(&table, key_pos, code_pos);
    }
    Ok(mapping)
}

fn locate(
    table: &table::Table,
    name: &str,
    canonical: &str,
    override_index: Option<usize>,
) -> Result<usize> {
    if let Some(index) = override_index {
        if index == 0 || index > table.width() {
            return Err(PipelineError::ColumnIndexOutOfRange {
                origin: name.to_string(),
                index,
                width: table.width(),
            }
            .into());
        }
        return Ok(index - 1);
    }
    table.column_index(canonical).ok_or_else(|| {
        PipelineError::MissingPrecondition(format!(
            "{name}: column '{canonical}' not found; pass its 1-based index explicitly"
        ))
        .into()
    })
}

fn handle_ack(args: &AckArgs) -> Result<()> {
    let stamp = resolve_stamp(args.date);
    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("Creating output directory {:?}", args.out_dir))?;
    let path = args.out_dir.join(export::ack_file_name(&stamp));
    export::write_acknowledgement(&stamp, &path)
}
