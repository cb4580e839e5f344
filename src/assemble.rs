// src/assemble.rs

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::ThresholdSpec;
use crate::error::AssemblyError;
use crate::headline::Headline;
use crate::types::{Server, VerdictRecord};

pub const ANALYSIS_NAME: &str = "ukhsa-classifier-qc-metrics";
pub const ANALYSIS_DESCRIPTION: &str =
    "This is an analysis to generate QC statistics for individual samples";

/// The record submitted to the analysis-tracking service: one sample's QC
/// verdicts with the provenance needed to reproduce them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    name: String,
    description: String,
    /// UTC date the analysis ran, `YYYY-MM-DD`
    analysis_date: String,
    pipeline_name: String,
    pipeline_version: String,
    pipeline_url: String,
    sample_ids: Vec<String>,
    server: String,
    /// Thresholds the verdicts were judged against
    methods: serde_json::Value,
    /// Flat metric values and verdicts
    result_metrics: serde_json::Value,
    /// Headline
    result: String,
    outfile: Option<PathBuf>,
}

impl AnalysisRecord {
    /// A record holding only the fixed analysis and package details.
    fn with_details() -> Self {
        Self {
            name: ANALYSIS_NAME.to_string(),
            description: ANALYSIS_DESCRIPTION.to_string(),
            analysis_date: Utc::now().format("%Y-%m-%d").to_string(),
            pipeline_name: env!("CARGO_PKG_NAME").to_string(),
            pipeline_version: env!("CARGO_PKG_VERSION").to_string(),
            pipeline_url: env!("CARGO_PKG_REPOSITORY").to_string(),
            sample_ids: Vec::new(),
            server: String::new(),
            methods: serde_json::Value::Null,
            result_metrics: serde_json::Value::Null,
            result: String::new(),
            outfile: None,
        }
    }

    fn add_methods(&mut self, thresholds: &ThresholdSpec) -> Result<(), AssemblyError> {
        self.methods = serde_json::to_value(thresholds).map_err(|source| AssemblyError::Serialize {
            field: "methods",
            source,
        })?;
        Ok(())
    }

    fn add_results(
        &mut self,
        headline: Headline,
        verdicts: &VerdictRecord,
    ) -> Result<(), AssemblyError> {
        self.result_metrics = verdicts.to_json_value();
        self.result = headline.to_string();
        Ok(())
    }

    fn add_server_records(&mut self, sample_id: &str, server: Server) -> Result<(), AssemblyError> {
        self.server = server.to_string();
        if sample_id.trim().is_empty() {
            return Err(AssemblyError::EmptyField("sample_ids"));
        }
        self.sample_ids = vec![sample_id.to_string()];
        Ok(())
    }

    fn add_output_location(&mut self, location: &Path) -> Result<(), AssemblyError> {
        if !location.exists() {
            return Err(AssemblyError::MissingOutput(location.to_path_buf()));
        }
        self.outfile = Some(location.to_path_buf());
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn analysis_date(&self) -> &str {
        &self.analysis_date
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn methods(&self) -> &serde_json::Value {
        &self.methods
    }

    pub fn result_metrics(&self) -> &serde_json::Value {
        &self.result_metrics
    }

    pub fn result(&self) -> &str {
        &self.result
    }

    pub fn outfile(&self) -> Option<&Path> {
        self.outfile.as_deref()
    }
}

/// Check that every provenance field is filled in and the output artifact
/// exists on disk.
pub fn check_completeness(record: &AnalysisRecord) -> Result<(), AssemblyError> {
    let required = [
        ("name", &record.name),
        ("description", &record.description),
        ("analysis_date", &record.analysis_date),
        ("pipeline_name", &record.pipeline_name),
        ("pipeline_version", &record.pipeline_version),
        ("pipeline_url", &record.pipeline_url),
        ("server", &record.server),
        ("result", &record.result),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(AssemblyError::EmptyField(field));
        }
    }

    if record.sample_ids.is_empty() || record.sample_ids.iter().any(|id| id.trim().is_empty()) {
        return Err(AssemblyError::EmptyField("sample_ids"));
    }
    if !record.methods.is_object() {
        return Err(AssemblyError::NotAnObject("methods"));
    }
    if !record.result_metrics.is_object() {
        return Err(AssemblyError::NotAnObject("result_metrics"));
    }

    match &record.outfile {
        None => Err(AssemblyError::EmptyField("outfile")),
        Some(path) if !path.exists() => Err(AssemblyError::MissingOutput(path.clone())),
        Some(_) => Ok(()),
    }
}

/// Build the analysis record for one sample.
///
/// Never fails outright: a step that goes wrong is logged and the returned
/// flag is false, leaving the caller to choose between keeping the local
/// results and aborting before anything is submitted.
pub fn assemble(
    sample_id: &str,
    thresholds: &ThresholdSpec,
    verdicts: &VerdictRecord,
    headline: Headline,
    server: Server,
    output_location: &Path,
) -> (AnalysisRecord, bool) {
    let mut record = AnalysisRecord::with_details();

    let steps = [
        ("methods", record.add_methods(thresholds)),
        ("results", record.add_results(headline, verdicts)),
        ("server records", record.add_server_records(sample_id, server)),
        ("output location", record.add_output_location(output_location)),
        ("completeness check", check_completeness(&record)),
    ];

    let mut complete = true;
    for (step, outcome) in steps {
        if let Err(err) = outcome {
            log::error!("Analysis record for {sample_id}: {step} failed: {err}");
            complete = false;
        }
    }

    (record, complete)
}
