//src/sink.rs

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;

use crate::assemble::{check_completeness, AnalysisRecord};
use crate::error::SinkError;
use crate::types::VerdictRecord;

/// Subdirectory of a [`LocalSink`] holding committed analysis records.
pub const OUTBOX_DIR: &str = "outbox";

/// What to do with an assembled analysis record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Write it out for a later upload.
    Store,
    /// Validate and serialize it without keeping anything.
    Test,
    /// Hand it over for good.
    Commit,
}

/// Destination for analysis records. Returns an identifier for committed
/// records; stored and tested ones may have none.
pub trait ResultSink {
    fn submit(
        &self,
        record: &AnalysisRecord,
        mode: OutputMode,
    ) -> Result<Option<String>, SinkError>;
}

/// Hand a freshly assembled record to `sink`, honouring the `complete` flag
/// returned by [`assemble`](crate::assemble::assemble).
///
/// An incomplete record is still stored in [`OutputMode::Store`] so the
/// fields can be fixed up by hand, but the call then reports it as
/// `Incomplete`. In the other modes nothing reaches the sink.
pub fn submit_assembled<S: ResultSink + ?Sized>(
    sink: &S,
    record: &AnalysisRecord,
    complete: bool,
    mode: OutputMode,
) -> Result<Option<String>, SinkError> {
    if complete {
        return sink.submit(record, mode);
    }
    if mode == OutputMode::Store {
        sink.submit(record, mode)?;
    }
    check_completeness(record)?;
    // `complete` was stale: the record passes now.
    if mode == OutputMode::Store {
        Ok(None)
    } else {
        sink.submit(record, mode)
    }
}

fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<(), SinkError> {
    let io_err = |source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let data = serde_json::to_vec_pretty(value)?;
    let mut file = File::create(path).map_err(io_err)?;
    file.write_all(&data).map_err(io_err)?;
    file.write_all(b"\n").map_err(io_err)?;
    Ok(())
}

/// Write a sample's verdicts to `<dir>/<sample>_qc_results.json`.
pub fn write_qc_results(
    record: &VerdictRecord,
    sample_id: &str,
    dir: &Path,
) -> Result<PathBuf, SinkError> {
    let path = dir.join(format!("{sample_id}_qc_results.json"));
    write_json_pretty(&path, record)?;
    log::info!("Wrote QC results to {}", path.display());
    Ok(path)
}

/// Keeps analysis records on the local filesystem.
///
/// Stored records go to `<dir>/<sample>_qc_metrics_analysis_fields.json`
/// whether or not they are complete. Committed records must pass the
/// completeness check and land in `<dir>/outbox/<id>.json`.
#[derive(Debug, Clone)]
pub struct LocalSink {
    dir: PathBuf,
}

impl LocalSink {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    fn primary_sample(record: &AnalysisRecord) -> &str {
        record
            .sample_ids()
            .first()
            .map(String::as_str)
            .unwrap_or("unknown")
    }
}

impl ResultSink for LocalSink {
    fn submit(
        &self,
        record: &AnalysisRecord,
        mode: OutputMode,
    ) -> Result<Option<String>, SinkError> {
        let sample = Self::primary_sample(record);

        match mode {
            OutputMode::Store => {
                let path = self
                    .dir
                    .join(format!("{sample}_qc_metrics_analysis_fields.json"));
                write_json_pretty(&path, record)?;
                log::info!("Stored analysis record at {}", path.display());
                Ok(None)
            }
            OutputMode::Test => {
                check_completeness(record)?;
                let bytes = serde_json::to_vec(record)?;
                log::info!("Test submission for {sample} OK ({} bytes)", bytes.len());
                Ok(None)
            }
            OutputMode::Commit => {
                check_completeness(record)?;
                let id = format!(
                    "{}-{sample}-{}",
                    record.name(),
                    Utc::now().format("%Y%m%dT%H%M%S%.3fZ")
                );
                let path = self.dir.join(OUTBOX_DIR).join(format!("{id}.json"));
                write_json_pretty(&path, record)?;
                log::info!("Committed analysis record {id}");
                Ok(Some(id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::assemble;
    use crate::config::QcConfig;
    use crate::headline::headline_for;
    use crate::spike::apply_spike_override;
    use crate::thresholds::classify;
    use crate::types::{MetricValues, Server};

    fn verdicts(config: &QcConfig) -> VerdictRecord {
        let mut values = MetricValues::new();
        for (metric, threshold) in config.thresholds.iter() {
            values.insert(metric.clone(), threshold.fail);
        }
        values.insert("count_descendants_spike_in".into(), 0.0);
        apply_spike_override(classify(&values, &config.thresholds).unwrap()).unwrap()
    }

    fn record(dir: &Path, write_results: bool) -> AnalysisRecord {
        let config = QcConfig::bundled().unwrap();
        let verdicts = verdicts(&config);
        let out = if write_results {
            write_qc_results(&verdicts, "S1", dir).unwrap()
        } else {
            dir.join("S1_qc_results.json")
        };
        let headline = headline_for(&verdicts);
        assemble("S1", &config.thresholds, &verdicts, headline, Server::Mscape, &out).0
    }

    #[test]
    fn qc_results_file_is_flat_json() {
        let dir = tempfile::tempdir().unwrap();
        let config = QcConfig::bundled().unwrap();
        let path = write_qc_results(&verdicts(&config), "S1", dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "S1_qc_results.json");

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["spike_detected"], "Fail");
        assert_eq!(written["percentage_spike_in_qc"], "NA");
        assert_eq!(written["total_reads_qc"], "Fail");
        assert_eq!(written["total_reads"], 2000);
    }

    #[test]
    fn store_writes_even_incomplete_records() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LocalSink::new(dir.path());
        let id = sink.submit(&record(dir.path(), false), OutputMode::Store).unwrap();
        assert!(id.is_none());
        assert!(dir.path().join("S1_qc_metrics_analysis_fields.json").is_file());
    }

    #[test]
    fn test_mode_rejects_incomplete_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LocalSink::new(dir.path());

        let err = sink.submit(&record(dir.path(), false), OutputMode::Test).unwrap_err();
        assert!(matches!(err, SinkError::Incomplete(_)));

        assert_eq!(sink.submit(&record(dir.path(), true), OutputMode::Test).unwrap(), None);
        assert!(!dir.path().join(OUTBOX_DIR).exists());
    }

    #[test]
    fn incomplete_record_is_stored_then_reported() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LocalSink::new(dir.path());
        let record = record(dir.path(), false);

        let err = submit_assembled(&sink, &record, false, OutputMode::Store).unwrap_err();
        assert!(matches!(err, SinkError::Incomplete(_)));
        assert!(!err.is_external());
        assert!(dir.path().join("S1_qc_metrics_analysis_fields.json").is_file());
    }

    #[test]
    fn incomplete_record_never_reaches_test_or_commit() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LocalSink::new(dir.path());
        let record = record(dir.path(), false);

        for mode in [OutputMode::Test, OutputMode::Commit] {
            let err = submit_assembled(&sink, &record, false, mode).unwrap_err();
            assert!(matches!(err, SinkError::Incomplete(_)), "{mode:?}");
        }
        assert!(!dir.path().join(OUTBOX_DIR).exists());
        assert!(!dir.path().join("S1_qc_metrics_analysis_fields.json").exists());
    }

    #[test]
    fn complete_record_is_submitted_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LocalSink::new(dir.path());
        let record = record(dir.path(), true);

        let id = submit_assembled(&sink, &record, true, OutputMode::Commit).unwrap();
        assert!(id.is_some());
        assert_eq!(submit_assembled(&sink, &record, true, OutputMode::Store).unwrap(), None);
        assert!(dir.path().join("S1_qc_metrics_analysis_fields.json").is_file());
    }

    #[test]
    fn commit_writes_to_outbox() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LocalSink::new(dir.path());
        let record = record(dir.path(), true);

        let id = sink.submit(&record, OutputMode::Commit).unwrap().unwrap();
        assert!(id.starts_with("ukhsa-classifier-qc-metrics-S1-"));

        let path = dir.path().join(OUTBOX_DIR).join(format!("{id}.json"));
        let committed: AnalysisRecord =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(committed, record);
    }
}
