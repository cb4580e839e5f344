//src/types.rs

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Metric name -> numeric value, e.g. `percentage_host -> 10.0`.
pub type MetricValues = BTreeMap<String, f64>;

/// A structured representation of one row of a classifier report:
/// the read counts a single taxon contributes to a sample.
///  taxID  rank  taxReads  reads  %  taxName
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    pub taxon_id: u32,
    pub rank: String,
    /// Reads assigned directly to this taxon
    pub count_direct: u64,
    /// Reads assigned to this taxon or anything beneath it
    pub count_descendants: u64,
    /// Share of all reads held by `count_descendants`, 0-100
    pub percentage: f64,
    #[serde(default, alias = "human_readable", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// The fixed read categories reported for every sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Unclassified,
    SpikeIn,
    Host,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Unclassified, Category::SpikeIn, Category::Host];

    /// Suffix used in metric names (`percentage_<key>`).
    pub fn key(self) -> &'static str {
        match self {
            Self::Unclassified => "unclassified",
            Self::SpikeIn => "spike_in",
            Self::Host => "host",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Outcome of checking one metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Pass,
    Warn,
    Fail,
    /// The metric could not be meaningfully judged.
    #[serde(rename = "NA")]
    NotApplicable,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "Pass",
            Self::Warn => "Warn",
            Self::Fail => "Fail",
            Self::NotApplicable => "NA",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server the sample lives on. Also used as the project name at the
/// analysis-tracking service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Server {
    Mscape,
    Synthscape,
}

impl Server {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mscape => "mscape",
            Self::Synthscape => "synthscape",
        }
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of the verdict field paired with `metric`.
pub fn qc_key(metric: &str) -> String {
    format!("{metric}_qc")
}

/// Metric values plus one verdict per checked metric.
///
/// Verdicts are keyed by their output name (`<metric>_qc`, `spike_detected`).
/// A record is only extended by building a new one, so a value handed to a
/// later stage is never changed behind the caller's back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerdictRecord {
    values: MetricValues,
    verdicts: BTreeMap<String, Verdict>,
}

impl VerdictRecord {
    pub(crate) fn new(values: MetricValues, verdicts: BTreeMap<String, Verdict>) -> Self {
        Self { values, verdicts }
    }

    /// Returns a copy of `self` with `key` set to `verdict`.
    pub(crate) fn with_verdict(mut self, key: impl Into<String>, verdict: Verdict) -> Self {
        self.verdicts.insert(key.into(), verdict);
        self
    }

    pub fn values(&self) -> &MetricValues {
        &self.values
    }

    pub fn verdicts(&self) -> &BTreeMap<String, Verdict> {
        &self.verdicts
    }

    pub fn value(&self, metric: &str) -> Option<f64> {
        self.values.get(metric).copied()
    }

    pub fn verdict(&self, key: &str) -> Option<Verdict> {
        self.verdicts.get(key).copied()
    }

    /// Flat JSON object with values and verdicts side by side.
    pub fn to_json_value(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (metric, &value) in &self.values {
            map.insert(metric.clone(), metric_json(value));
        }
        for (key, verdict) in &self.verdicts {
            map.insert(key.clone(), serde_json::Value::from(verdict.as_str()));
        }
        serde_json::Value::Object(map)
    }
}

impl Serialize for VerdictRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + self.verdicts.len()))?;
        for (metric, &value) in &self.values {
            map.serialize_entry(metric, &metric_json(value))?;
        }
        for (key, verdict) in &self.verdicts {
            map.serialize_entry(key, verdict)?;
        }
        map.end()
    }
}

/// Counts are stored as f64 alongside percentages; write whole numbers as
/// JSON integers so `total_reads` reads back as `10`, not `10.0`.
fn metric_json(value: f64) -> serde_json::Value {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0; // 2^53
    if value.is_finite() && value.fract() == 0.0 && value.abs() < MAX_EXACT {
        serde_json::Value::from(value as i64)
    } else {
        serde_json::Number::from_f64(value)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

/// Everything the record source knows about one sample.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SampleRecord {
    pub sample_id: String,
    pub classifier_calls: Vec<ClassificationRecord>,
    /// Remaining metadata fields, untouched.
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl SampleRecord {
    /// Numeric metadata fields, usable as metrics alongside the proportions.
    pub fn numeric_metadata(&self) -> MetricValues {
        self.metadata
            .iter()
            .filter_map(|(key, value)| value.as_f64().map(|v| (key.clone(), v)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn verdict_record_serializes_flat() {
        let mut values = MetricValues::new();
        values.insert("total_reads".to_string(), 10.0);
        values.insert("percentage_host".to_string(), 12.5);
        let record = VerdictRecord::new(values, BTreeMap::new())
            .with_verdict(qc_key("percentage_host"), Verdict::Fail)
            .with_verdict("spike_detected", Verdict::NotApplicable);

        let out = serde_json::to_value(&record).unwrap();
        assert_eq!(
            out,
            json!({
                "total_reads": 10,
                "percentage_host": 12.5,
                "percentage_host_qc": "Fail",
                "spike_detected": "NA",
            })
        );
        assert_eq!(out, record.to_json_value());
    }

    #[test]
    fn classification_record_accepts_human_readable_alias() {
        let record: ClassificationRecord = serde_json::from_value(json!({
            "taxon_id": 9606,
            "human_readable": "Homo sapiens",
            "rank": "S",
            "count_direct": 1,
            "count_descendants": 1,
            "percentage": 10.0,
        }))
        .unwrap();
        assert_eq!(record.name.as_deref(), Some("Homo sapiens"));
    }

    #[test]
    fn numeric_metadata_skips_non_numbers() {
        let mut metadata = serde_json::Map::new();
        metadata.insert("mean_read_length".into(), json!(150.5));
        metadata.insert("site".into(), json!("lab-1"));
        let sample = SampleRecord {
            sample_id: "S1".into(),
            classifier_calls: Vec::new(),
            metadata,
        };
        let numeric = sample.numeric_metadata();
        assert_eq!(numeric.len(), 1);
        assert_eq!(numeric["mean_read_length"], 150.5);
    }
}
