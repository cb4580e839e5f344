// src/lib.rs
pub mod assemble;
pub mod config;
pub mod error;
pub mod headline;
pub mod proportions;
pub mod report;
pub mod sink;
pub mod source;
pub mod spike;
pub mod thresholds;
pub mod types;

use rayon::prelude::*;

use crate::config::QcConfig;
use crate::error::QcError;
use crate::headline::{headline_for, Headline};
use crate::proportions::{summarize, ProportionSummary};
use crate::spike::apply_spike_override;
use crate::thresholds::classify;
use crate::types::{ClassificationRecord, MetricValues, SampleRecord, VerdictRecord};

/// Everything the evaluation produced for one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct QcResults {
    pub sample_id: String,
    pub summary: ProportionSummary,
    /// Metric values with their verdicts, spike-in detection included
    pub verdicts: VerdictRecord,
    pub headline: Headline,
}

impl QcResults {
    /// Generate the flat results JSON on demand
    pub fn get_results_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.verdicts)
    }

    /// One-line human summary for logs and terminals
    pub fn get_summary_line(&self) -> String {
        let flagged: Vec<&str> = self
            .verdicts
            .verdicts()
            .iter()
            .filter(|(_, v)| !matches!(v, types::Verdict::Pass))
            .map(|(k, _)| k.as_str())
            .collect();
        if flagged.is_empty() {
            format!("{}: {}", self.sample_id, self.headline)
        } else {
            format!("{}: {} ({})", self.sample_id, self.headline, flagged.join(", "))
        }
    }
}

/// Run the QC stages over one sample's classifier calls:
///  1) proportion summary
///  2) threshold verdicts, over the summary plus any `extra` metrics
///  3) spike-in detection
///  4) headline
///
/// Summary metrics win over `extra` metrics of the same name.
pub fn evaluate(
    sample_id: &str,
    records: &[ClassificationRecord],
    extra: &MetricValues,
    config: &QcConfig,
) -> Result<QcResults, QcError> {
    let summary = summarize(records, &config.markers)?;

    let mut values = extra.clone();
    values.extend(summary.metrics());

    let verdicts = apply_spike_override(classify(&values, &config.thresholds)?)?;
    let headline = headline_for(&verdicts);
    log::info!("{sample_id}: {headline}");

    Ok(QcResults {
        sample_id: sample_id.to_string(),
        summary,
        verdicts,
        headline,
    })
}

/// Evaluate a fetched sample, offering its numeric metadata as metrics.
pub fn evaluate_sample(sample: &SampleRecord, config: &QcConfig) -> Result<QcResults, QcError> {
    evaluate(
        &sample.sample_id,
        &sample.classifier_calls,
        &sample.numeric_metadata(),
        config,
    )
}

/// Evaluate many samples in parallel. Results come back in input order and
/// one sample's failure does not affect the others.
pub fn evaluate_batch(
    samples: &[SampleRecord],
    config: &QcConfig,
) -> Vec<Result<QcResults, QcError>> {
    samples
        .par_iter()
        .map(|sample| evaluate_sample(sample, config))
        .collect()
}
