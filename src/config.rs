//src/config.rs

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{Category, ClassificationRecord};

/// Namespace holding the per-metric thresholds in a config document.
pub const THRESHOLDS_SECTION: &str = "sample_thresholds";

/// Thresholds shipped with the binary, used when no config file is given.
pub const DEFAULT_CONFIG_YAML: &str = include_str!("../resources/qc_thresholds.yaml");

pub const UNCLASSIFIED_TAXON_ID: u32 = 0;
/// Tobamovirus tabaci (TMV), the spike-in control.
pub const SPIKE_IN_TAXON_ID: u32 = 12242;
/// Homo sapiens.
pub const HOST_TAXON_ID: u32 = 9606;
pub const GENUS_RANK: &str = "G";

/// Whether higher or lower values of a metric are better.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Ascending,
    Descending,
}

/// Pass/fail boundaries for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub pass: f64,
    pub fail: f64,
}

impl Threshold {
    pub fn polarity(&self) -> Polarity {
        if self.pass > self.fail {
            Polarity::Ascending
        } else {
            Polarity::Descending
        }
    }
}

/// Validated metric name -> threshold mapping. Every entry has finite
/// `pass`/`fail` values that differ, so its polarity is always defined.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ThresholdSpec(BTreeMap<String, Threshold>);

impl ThresholdSpec {
    pub fn new(thresholds: BTreeMap<String, Threshold>) -> Result<Self, ConfigError> {
        for (metric, threshold) in &thresholds {
            if !threshold.pass.is_finite() || !threshold.fail.is_finite() {
                return Err(ConfigError::NonFinite {
                    metric: metric.clone(),
                });
            }
            if threshold.pass == threshold.fail {
                return Err(ConfigError::AmbiguousThreshold {
                    metric: metric.clone(),
                    value: threshold.pass,
                });
            }
        }
        Ok(Self(thresholds))
    }

    pub fn get(&self, metric: &str) -> Option<&Threshold> {
        self.0.get(metric)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Threshold)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// How a read category is recognised among the classifier calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MarkerFields", rename_all = "snake_case")]
pub enum TaxonMarker {
    TaxonId(u32),
    /// Case-insensitive match on the record's human readable name.
    Name(String),
}

impl TaxonMarker {
    pub fn matches(&self, record: &ClassificationRecord) -> bool {
        match self {
            Self::TaxonId(id) => record.taxon_id == *id,
            Self::Name(name) => record
                .name
                .as_deref()
                .is_some_and(|n| n.trim().eq_ignore_ascii_case(name)),
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct MarkerFields {
    taxon_id: Option<u32>,
    name: Option<String>,
}

impl TryFrom<MarkerFields> for TaxonMarker {
    type Error = String;

    fn try_from(fields: MarkerFields) -> Result<Self, Self::Error> {
        match (fields.taxon_id, fields.name) {
            (Some(id), None) => Ok(Self::TaxonId(id)),
            (None, Some(name)) if !name.trim().is_empty() => {
                Ok(Self::Name(name.trim().to_string()))
            }
            (None, Some(_)) => Err("marker name must not be empty".to_string()),
            (Some(_), Some(_)) => {
                Err("marker takes either `taxon_id` or `name`, not both".to_string())
            }
            (None, None) => Err("marker needs a `taxon_id` or a `name`".to_string()),
        }
    }
}

/// Category lookup rules. Any field left out of the document keeps its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryMarkers {
    pub unclassified: TaxonMarker,
    pub spike_in: TaxonMarker,
    pub host: TaxonMarker,
    /// Rank code whose records are summed into the genus metrics.
    pub genus_rank: String,
}

impl Default for CategoryMarkers {
    fn default() -> Self {
        Self {
            unclassified: TaxonMarker::TaxonId(UNCLASSIFIED_TAXON_ID),
            spike_in: TaxonMarker::TaxonId(SPIKE_IN_TAXON_ID),
            host: TaxonMarker::TaxonId(HOST_TAXON_ID),
            genus_rank: GENUS_RANK.to_string(),
        }
    }
}

impl CategoryMarkers {
    pub fn marker(&self, category: Category) -> &TaxonMarker {
        match category {
            Category::Unclassified => &self.unclassified,
            Category::SpikeIn => &self.spike_in,
            Category::Host => &self.host,
        }
    }
}

#[derive(Deserialize)]
struct ConfigDocument {
    sample_thresholds: Option<BTreeMap<String, Threshold>>,
    #[serde(default)]
    category_markers: CategoryMarkers,
}

/// A parsed and validated QC config document.
#[derive(Debug, Clone, PartialEq)]
pub struct QcConfig {
    pub thresholds: ThresholdSpec,
    pub markers: CategoryMarkers,
}

impl QcConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let doc: ConfigDocument = serde_yaml::from_str(text)?;
        let thresholds = doc
            .sample_thresholds
            .ok_or(ConfigError::MissingSection(THRESHOLDS_SECTION))?;

        Ok(Self {
            thresholds: ThresholdSpec::new(thresholds)?,
            markers: doc.category_markers,
        })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Read {} bytes of config from {}", text.len(), path.display());
        Self::from_yaml_str(&text)
    }

    pub fn bundled() -> Result<Self, ConfigError> {
        Self::from_yaml_str(DEFAULT_CONFIG_YAML)
    }
}
