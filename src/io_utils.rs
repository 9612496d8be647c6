//! I/O utilities for encoding fallback, delimiter sniffing, and CSV output.
//!
//! All file ingestion flows through the candidate-encoding loop in
//! `reader`; this module holds the pieces that loop is built from:
//!
//! - **Encoding fallback order**: an explicit, testable constant list tried
//!   first-success-wins over a fixed-size leading sample.
//! - **Delimiter sniffing**: per-line occurrence statistics over the sample
//!   for a fixed candidate set (`;`, `,`, `|`, tab).
//! - **CSV writer construction** for the export formats.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};
use csv::QuoteStyle;
use encoding_rs::{Encoding, ISO_8859_15, UTF_8, WINDOWS_1252};

/// Decoders attempted in order; the first that decodes the full stream
/// without errors wins. The two 8-bit fallbacks cover the western-European
/// byte tables the historical files arrive in.
pub const ENCODING_CANDIDATES: [&'static Encoding; 3] = [UTF_8, WINDOWS_1252, ISO_8859_15];

/// Field separators considered by the sniffer, in tie-break priority order.
pub const DELIMITER_CANDIDATES: [u8; 4] = [b';', b',', b'|', b'\t'];

/// Bytes of the stream examined for encoding and delimiter detection.
pub const SNIFF_SAMPLE_LEN: usize = 2048;

/// Decodes `bytes` with `encoding`, failing on any malformed sequence.
pub fn decode_strict(bytes: &[u8], encoding: &'static Encoding) -> Option<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors { None } else { Some(text.into_owned()) }
}

/// Decodes `bytes` with `encoding`, replacing malformed sequences. Used on
/// the sniff sample, which may cut a multibyte character at its boundary;
/// only the full-stream decode validates the encoding.
pub fn decode_lossy(bytes: &[u8], encoding: &'static Encoding) -> String {
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

/// Picks the most plausible delimiter from a decoded leading sample.
///
/// For each candidate, occurrences are counted per non-empty sample line
/// (the final line is dropped when `truncated`, since it may be a partial
/// record). A candidate whose count is identical and non-zero on every line
/// outranks any inconsistent one; among equals the score decides, and the
/// fixed candidate order breaks remaining ties. Returns `None` when no
/// candidate appears at all.
pub fn sniff_delimiter(sample: &str, truncated: bool) -> Option<u8> {
    let mut lines: Vec<&str> = sample.lines().filter(|l| !l.trim().is_empty()).collect();
    if truncated && lines.len() > 1 {
        lines.pop();
    }
    if lines.is_empty() {
        return None;
    }

    let mut best: Option<(u8, bool, usize)> = None;
    for &candidate in &DELIMITER_CANDIDATES {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| line.matches(candidate as char).count())
            .collect();
        let min = *counts.iter().min().unwrap_or(&0);
        let max = *counts.iter().max().unwrap_or(&0);
        if max == 0 {
            continue;
        }
        let consistent = min == max && min > 0;
        let score = min;
        let better = match best {
            None => true,
            Some((_, best_consistent, best_score)) => {
                (consistent, score) > (best_consistent, best_score)
            }
        };
        if better {
            best = Some((candidate, consistent, score));
        }
    }
    best.map(|(delimiter, _, _)| delimiter)
}

/// Opens a CSV writer for export files. Quoting is minimal: the downstream
/// consumers of these formats expect bare fields.
pub fn open_export_writer(
    path: &Path,
    delimiter: u8,
    quote_style: QuoteStyle,
) -> Result<csv::Writer<Box<dyn Write>>> {
    let file: Box<dyn Write> = Box::new(BufWriter::new(
        File::create(path).with_context(|| format!("Creating output file {path:?}"))?,
    ));
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote_style(quote_style)
        .double_quote(true);
    Ok(builder.from_writer(file))
}

pub fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_semicolon_over_comma_when_consistent() {
        let sample = "a;b;c\n1;2;3\n4;5;6\n";
        assert_eq!(sniff_delimiter(sample, false), Some(b';'));
    }

    #[test]
    fn sniffs_comma_when_semicolons_absent() {
        let sample = "a,b,c\n1,2,3\n";
        assert_eq!(sniff_delimiter(sample, false), Some(b','));
    }

    #[test]
    fn consistent_candidate_beats_more_frequent_inconsistent_one() {
        // Commas appear often but unevenly; the pipe count is stable.
        let sample = "a|b,,,\nc|d,\ne|f,,\n";
        assert_eq!(sniff_delimiter(sample, false), Some(b'|'));
    }

    #[test]
    fn truncated_final_line_is_ignored() {
        let sample = "a\tb\tc\n1\t2\t3\n4\t2";
        assert_eq!(sniff_delimiter(sample, true), Some(b'\t'));
    }

    #[test]
    fn no_delimiter_found_in_single_column_data() {
        assert_eq!(sniff_delimiter("alpha\nbeta\n", false), None);
    }
}
