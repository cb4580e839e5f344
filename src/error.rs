//src/error.rs

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Category;

/// The sample's own data cannot be evaluated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QcError {
    #[error("classification table is empty")]
    EmptyInput,

    #[error("{matches} classification records match the {category} category, expected at most one")]
    AmbiguousCategory { category: Category, matches: usize },

    #[error("metric `{0}` has thresholds configured but no value")]
    MissingMetric(String),
}

/// The thresholds document is unusable. Raised before any evaluation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("config document has no `{0}` section")]
    MissingSection(&'static str),

    #[error("threshold for `{metric}` has pass == fail ({value}), polarity is undefined")]
    AmbiguousThreshold { metric: String, value: f64 },

    #[error("threshold for `{metric}` is not a finite number")]
    NonFinite { metric: String },
}

/// An analysis record failed its completeness check.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("analysis field `{0}` is empty")]
    EmptyField(&'static str),

    #[error("analysis field `{0}` must be a JSON object")]
    NotAnObject(&'static str),

    #[error("output location {} does not exist", .0.display())]
    MissingOutput(PathBuf),

    #[error("could not serialize {field}: {source}")]
    Serialize {
        field: &'static str,
        source: serde_json::Error,
    },
}

/// Failure fetching a sample from the record source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no record found for sample {0}")]
    NotFound(String),

    #[error("could not reach record source: {0}")]
    Connection(String),

    #[error("record source is misconfigured: {0}")]
    Configuration(String),

    #[error("malformed record for sample {sample}: {reason}")]
    MalformedResponse { sample: String, reason: String },
}

/// Failure handing a record to the result sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("analysis record is incomplete: {0}")]
    Incomplete(#[from] AssemblyError),
}

impl SinkError {
    /// Only a failed write is the sink's fault; the other variants describe
    /// the record it was given.
    pub fn is_external(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Qc(#[from] QcError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl Error {
    /// True when the failure came from a collaborator (record source or
    /// result sink) rather than from the sample, its configuration or the
    /// analysis record handed to the sink.
    pub fn is_external(&self) -> bool {
        match self {
            Self::Source(_) => true,
            Self::Sink(err) => err.is_external(),
            Self::Qc(_) | Self::Config(_) | Self::Assembly(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_errors_are_told_apart_from_input_errors() {
        let bad_data: Error = QcError::MissingMetric("total_reads".into()).into();
        let unreachable: Error = SourceError::Connection("timed out".into()).into();
        assert!(!bad_data.is_external());
        assert!(unreachable.is_external());
    }

    #[test]
    fn incomplete_record_at_the_sink_is_not_a_backend_error() {
        let incomplete: Error = SinkError::Incomplete(AssemblyError::EmptyField("outfile")).into();
        assert!(!incomplete.is_external());

        let unserializable: Error =
            SinkError::Serialize(serde_json::from_str::<u8>("x").unwrap_err()).into();
        assert!(!unserializable.is_external());

        let write_failed: Error = SinkError::Io {
            path: PathBuf::from("/outbox/S1.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        }
        .into();
        assert!(write_failed.is_external());
    }

    #[test]
    fn messages_name_the_offender() {
        let err = QcError::AmbiguousCategory {
            category: Category::SpikeIn,
            matches: 2,
        };
        assert_eq!(
            err.to_string(),
            "2 classification records match the spike_in category, expected at most one"
        );
        let err = QcError::MissingMetric("percentage_genus".into());
        assert!(err.to_string().contains("percentage_genus"));
    }
}
