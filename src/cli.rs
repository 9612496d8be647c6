use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "Reconcile product classification codes", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Merge catalogue, history, and client files into the DFF table and
    /// the missing-code worklist
    Merge(MergeArgs),
    /// Fold a completed worklist back into a merged table and emit the
    /// finalized exports
    Finalize(FinalizeArgs),
    /// Write the fixed-format acknowledgement file
    Ack(AckArgs),
}

#[derive(Debug, Args)]
pub struct MergeArgs {
    /// Internal catalogue files (csv/txt/xlsx/xls, repeatable)
    #[arg(long = "catalogue", required = true, action = clap::ArgAction::Append)]
    pub catalogue: Vec<PathBuf>,
    /// Historical snapshot files (repeatable)
    #[arg(long = "history", required = true, action = clap::ArgAction::Append)]
    pub history: Vec<PathBuf>,
    /// Client-provided code files (repeatable)
    #[arg(long = "client", required = true, action = clap::ArgAction::Append)]
    pub client: Vec<PathBuf>,
    /// 1-based column holding the product reference in catalogue files
    #[arg(long = "catalogue-ref", default_value_t = 1)]
    pub catalogue_ref: usize,
    /// 1-based column holding the current-period code in catalogue files
    #[arg(long = "catalogue-value", default_value_t = 2)]
    pub catalogue_value: usize,
    /// 1-based column holding the product reference in history files
    #[arg(long = "history-ref", default_value_t = 1)]
    pub history_ref: usize,
    /// 1-based column holding the prior-period code in history files
    #[arg(long = "history-value", default_value_t = 2)]
    pub history_value: usize,
    /// 1-based column holding the product reference in client files
    #[arg(long = "client-ref", default_value_t = 1)]
    pub client_ref: usize,
    /// 1-based column holding the client family code in client files
    #[arg(long = "client-value", default_value_t = 2)]
    pub client_value: usize,
    /// Batch label attached to every merged row (uppercased)
    #[arg(short, long)]
    pub entity: String,
    /// Directory receiving the export files
    #[arg(short = 'o', long = "out-dir", default_value = ".")]
    pub out_dir: PathBuf,
    /// Descriptor columns to carry into the worklist workbook
    #[arg(long = "worklist-columns", value_delimiter = ',')]
    pub worklist_columns: Vec<String>,
    /// Keep rows whose reference is empty instead of dropping them
    #[arg(long = "keep-null-refs")]
    pub keep_null_refs: bool,
    /// Override the date stamp (YYMMDD, defaults to today)
    #[arg(long, value_parser = parse_date_stamp)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Args)]
pub struct FinalizeArgs {
    /// Merged DFF table produced by the merge step
    #[arg(short = 'i', long = "merged")]
    pub merged: PathBuf,
    /// Completed worklist files (csv/txt/xlsx/xls, repeatable)
    #[arg(long = "updates", required = true, action = clap::ArgAction::Append)]
    pub updates: Vec<PathBuf>,
    /// 1-based reference column in the updates files (default: locate the
    /// canonical header by name)
    #[arg(long = "updates-ref")]
    pub updates_ref: Option<usize>,
    /// 1-based code column in the updates files (default: locate the
    /// canonical header by name)
    #[arg(long = "updates-code")]
    pub updates_code: Option<usize>,
    /// Batch label used in the fixed-format export (uppercased)
    #[arg(short, long)]
    pub entity: String,
    /// Infer codes for remaining gaps by majority vote
    #[arg(long)]
    pub infer: bool,
    /// Grouping column for majority-vote inference
    #[arg(long = "infer-key")]
    pub infer_key: Option<String>,
    /// Directory receiving the export files
    #[arg(short = 'o', long = "out-dir", default_value = ".")]
    pub out_dir: PathBuf,
    /// Write the fill audit summary as JSON to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
    /// Override the date stamp (YYMMDD, defaults to today)
    #[arg(long, value_parser = parse_date_stamp)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Args)]
pub struct AckArgs {
    /// Directory receiving the acknowledgement file
    #[arg(short = 'o', long = "out-dir", default_value = ".")]
    pub out_dir: PathBuf,
    /// Override the date stamp (YYMMDD, defaults to today)
    #[arg(long, value_parser = parse_date_stamp)]
    pub date: Option<NaiveDate>,
}

pub fn parse_date_stamp(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%y%m%d")
        .map_err(|_| format!("'{value}' is not a YYMMDD date"))
}
