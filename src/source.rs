//src/source.rs

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;

use crate::error::SourceError;
use crate::report::read_kraken_report;
use crate::types::{ClassificationRecord, SampleRecord, Server};

/// Metadata field holding the classifier calls in a sample record.
pub const CLASSIFIER_CALLS_FIELD: &str = "classifier_calls";

/// Supplies one sample's classifier calls and metadata. Retrying, if any,
/// is the implementation's business; callers treat every error as final.
pub trait RecordSource {
    fn fetch(&self, sample_id: &str, server: Server) -> Result<SampleRecord, SourceError>;
}

/// Open `path` for line reading, decompressing it if it ends in `.gz`.
pub fn open_maybe_gz(path: &Path) -> io::Result<Box<dyn BufRead>> {
    let f = File::open(path)?;

    let is_gz = path
        .extension()
        .map(|ext| ext == "gz")
        .unwrap_or(false);

    let reader: Box<dyn BufRead> = if is_gz {
        Box::new(BufReader::new(MultiGzDecoder::new(f)))
    } else {
        Box::new(BufReader::new(f))
    };
    Ok(reader)
}

/// Map a local read failure onto the source error classes.
pub(crate) fn io_to_source_error(err: io::Error, sample_id: &str, path: &Path) -> SourceError {
    match err.kind() {
        io::ErrorKind::NotFound => SourceError::NotFound(sample_id.to_string()),
        io::ErrorKind::PermissionDenied => {
            SourceError::Configuration(format!("cannot read {}: {err}", path.display()))
        }
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => {
            SourceError::MalformedResponse {
                sample: sample_id.to_string(),
                reason: err.to_string(),
            }
        }
        _ => SourceError::Connection(format!("{}: {err}", path.display())),
    }
}

/// Sample records stored as JSON documents, one per sample:
/// `<root>/<server>/<sample>.json` or `<root>/<sample>.json`, either of them
/// optionally gzipped.
///
/// Each document is an object whose `classifier_calls` array holds the
/// classification records; every other field is kept as metadata.
#[derive(Debug, Clone)]
pub struct JsonRecordSource {
    root: PathBuf,
}

impl JsonRecordSource {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    fn locate(&self, sample_id: &str, server: Server) -> Option<PathBuf> {
        let dirs = [self.root.join(server.as_str()), self.root.clone()];
        dirs.iter()
            .flat_map(|dir| {
                [
                    dir.join(format!("{sample_id}.json")),
                    dir.join(format!("{sample_id}.json.gz")),
                ]
            })
            .find(|candidate| candidate.is_file())
    }
}

impl RecordSource for JsonRecordSource {
    fn fetch(&self, sample_id: &str, server: Server) -> Result<SampleRecord, SourceError> {
        if !self.root.is_dir() {
            return Err(SourceError::Configuration(format!(
                "record directory {} does not exist",
                self.root.display()
            )));
        }

        let path = self
            .locate(sample_id, server)
            .ok_or_else(|| SourceError::NotFound(sample_id.to_string()))?;
        log::debug!("Reading record for {sample_id} from {}", path.display());

        let reader = open_maybe_gz(&path).map_err(|e| io_to_source_error(e, sample_id, &path))?;
        let document: serde_json::Value =
            serde_json::from_reader(reader).map_err(|e| SourceError::MalformedResponse {
                sample: sample_id.to_string(),
                reason: e.to_string(),
            })?;

        parse_sample_record(sample_id, document)
    }
}

/// Split a sample document into its classifier calls and remaining metadata.
pub fn parse_sample_record(
    sample_id: &str,
    document: serde_json::Value,
) -> Result<SampleRecord, SourceError> {
    let malformed = |reason: String| SourceError::MalformedResponse {
        sample: sample_id.to_string(),
        reason,
    };

    let mut metadata = match document {
        serde_json::Value::Object(map) => map,
        other => return Err(malformed(format!("expected a JSON object, found {other}"))),
    };
    let calls = metadata
        .remove(CLASSIFIER_CALLS_FIELD)
        .ok_or_else(|| malformed(format!("missing `{CLASSIFIER_CALLS_FIELD}`")))?;
    let classifier_calls: Vec<ClassificationRecord> =
        serde_json::from_value(calls).map_err(|e| malformed(e.to_string()))?;

    Ok(SampleRecord {
        sample_id: sample_id.to_string(),
        classifier_calls,
        metadata,
    })
}

/// A single Kraken-style report file standing in for the record source.
/// Carries no metadata beyond the calls themselves.
#[derive(Debug, Clone)]
pub struct ReportRecordSource {
    path: PathBuf,
}

impl ReportRecordSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSource for ReportRecordSource {
    fn fetch(&self, sample_id: &str, _server: Server) -> Result<SampleRecord, SourceError> {
        let classifier_calls = read_kraken_report(&self.path, sample_id)?;
        Ok(SampleRecord {
            sample_id: sample_id.to_string(),
            classifier_calls,
            metadata: serde_json::Map::new(),
        })
    }
}
