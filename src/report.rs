//src/report.rs

use std::io::BufRead;
use std::path::Path;

use crate::error::SourceError;
use crate::source::{io_to_source_error, open_maybe_gz};
use crate::types::ClassificationRecord;

/// Column layouts understood by [`parse_kraken_report`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// KrakenUniq:
    /// ```text
    /// %  reads  taxReads  kmers  dup  cov  taxID  rank  taxName
    /// ```
    /// Names may be indented with extra tabs.
    KrakenUniq,
    /// Kraken 2, with or without the two minimizer columns:
    /// ```text
    /// %  reads  taxReads  [minimizers  distinct]  rank  taxID  taxName
    /// ```
    Kraken2,
}

/// Reduce a rank name to the single-letter code used by Kraken 2 reports.
/// Codes are passed through unchanged.
pub fn rank_code(rank: &str) -> String {
    let code = match rank.trim().to_ascii_lowercase().as_str() {
        "superkingdom" | "domain" => "D",
        "kingdom" => "K",
        "phylum" => "P",
        "class" => "C",
        "order" => "O",
        "family" => "F",
        "genus" => "G",
        "species" => "S",
        "no rank" => "-",
        _ => return rank.trim().to_string(),
    };
    code.to_string()
}

/// Parses a Kraken-style taxonomy report into classification records.
/// Comment lines (`#`) and blank lines are skipped. A header line starting
/// with `%` marks a KrakenUniq report; without one, rows whose sixth column
/// is a coverage figure are read as KrakenUniq and the rest as Kraken 2.
pub fn parse_kraken_report<R: BufRead>(
    reader: R,
    sample_id: &str,
) -> Result<Vec<ClassificationRecord>, SourceError> {
    let mut format = None;
    let mut records = Vec::new();

    for (line_no, line_result) in reader.lines().enumerate() {
        let line = line_result.map_err(|e| SourceError::MalformedResponse {
            sample: sample_id.to_string(),
            reason: format!("line {}: {e}", line_no + 1),
        })?;

        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('%') {
            format = Some(ReportFormat::KrakenUniq);
            continue;
        }

        let record =
            parse_report_line(&line, format).map_err(|reason| SourceError::MalformedResponse {
                sample: sample_id.to_string(),
                reason: format!("line {}: {reason}", line_no + 1),
            })?;
        records.push(record);
    }

    Ok(records)
}

/// Layout of a row when the report carried no header.
fn infer_format(parts: &[&str]) -> ReportFormat {
    let is_float = |i: usize| parts.get(i).is_some_and(|p| p.trim().parse::<f64>().is_ok());
    // KrakenUniq has dup and cov where Kraken 2 has the rank letter.
    if parts.len() >= 9 && is_float(4) && is_float(5) {
        ReportFormat::KrakenUniq
    } else {
        ReportFormat::Kraken2
    }
}

fn parse_report_line(
    line: &str,
    declared: Option<ReportFormat>,
) -> Result<ClassificationRecord, String> {
    let parts: Vec<&str> = line.split('\t').collect();
    let format = declared.unwrap_or_else(|| infer_format(&parts));

    // (rank column, taxid column, first name column)
    let (rank_at, taxid_at, name_at) = match format {
        ReportFormat::KrakenUniq if parts.len() >= 9 => (7, 6, 8),
        ReportFormat::Kraken2 if parts.len() == 6 => (3, 4, 5),
        ReportFormat::Kraken2 if parts.len() >= 8 => (5, 6, 7),
        _ => return Err(format!("unexpected column count {}", parts.len())),
    };

    let field = |i: usize| parts[i].trim();
    let number = |i: usize, what: &str| -> Result<u64, String> {
        field(i).parse().map_err(|_| format!("bad {what} `{}`", field(i)))
    };

    let percentage = field(0)
        .parse::<f64>()
        .ok()
        .filter(|p| (0.0..=100.0).contains(p))
        .ok_or_else(|| format!("bad percentage `{}`", field(0)))?;
    let count_descendants = number(1, "read count")?;
    let count_direct = number(2, "direct read count")?;
    let taxon_id: u32 = field(taxid_at)
        .parse()
        .map_err(|_| format!("bad taxon id `{}`", field(taxid_at)))?;
    let rank = field(rank_at);
    if rank.is_empty() || rank.parse::<f64>().is_ok() {
        return Err(format!("bad rank `{rank}`"));
    }

    let name = parts[name_at..].join("\t").trim().to_string();

    Ok(ClassificationRecord {
        taxon_id,
        rank: rank_code(rank),
        count_direct,
        count_descendants,
        percentage,
        name: if name.is_empty() { None } else { Some(name) },
    })
}

/// Read a report from disk, gunzipping `.gz` files.
pub fn read_kraken_report(
    path: &Path,
    sample_id: &str,
) -> Result<Vec<ClassificationRecord>, SourceError> {
    let reader = open_maybe_gz(path).map_err(|e| io_to_source_error(e, sample_id, path))?;
    let records = parse_kraken_report(reader, sample_id)?;
    log::info!("Read {} report rows from {}", records.len(), path.display());
    Ok(records)
}
