use serde_json::{Map, Value};
use std::fmt;

use super::failure::{MissingInputError, RecordError};

/// Matched-record fields returned by the registry. Opaque to this crate.
pub type Payload = Map<String, Value>;

/// Which registry lookup a run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckType {
    BackgroundCheck,
    Certification,
}

impl CheckType {
    /// Human title used in alert subjects.
    pub fn title(&self) -> &'static str {
        match self {
            CheckType::BackgroundCheck => "NJDOE Background Check",
            CheckType::Certification => "NJDOE Certification Check",
        }
    }

    /// Scratch sub-directory, which also becomes the middle segment of the storage key.
    pub fn dir_name(&self) -> &'static str {
        match self {
            CheckType::BackgroundCheck => "background_check",
            CheckType::Certification => "certification_check",
        }
    }

    /// Artifact file name for an employee.
    ///
    /// The background-check spelling is historical and kept so existing keys are overwritten.
    pub fn file_name(&self, employee_number: &str) -> String {
        match self {
            CheckType::BackgroundCheck => {
                format!("njdoe_backround_check_records_{employee_number}.json")
            }
            CheckType::Certification => {
                format!("njdoe_certification_check_records_{employee_number}.json")
            }
        }
    }
}

impl fmt::Display for CheckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckType::BackgroundCheck => write!(f, "background-check"),
            CheckType::Certification => write!(f, "certification"),
        }
    }
}

/// Registry match plus the correlation fields this system injects.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationResult {
    pub payload: Payload,
    pub worker_id: String,
    pub employee_number: String,
}

impl VerificationResult {
    /// JSON document persisted as the artifact.
    ///
    /// Correlation fields overwrite same-named registry fields.
    pub fn to_document(&self) -> Value {
        let mut doc = self.payload.clone();
        doc.insert("worker_id".to_string(), Value::String(self.worker_id.clone()));
        doc.insert(
            "employee_number".to_string(),
            Value::String(self.employee_number.clone()),
        );
        Value::Object(doc)
    }
}

/// Classification of one record after lookup.
#[derive(Debug)]
pub enum Outcome {
    Match(VerificationResult),
    NoMatch,
    MissingInput(MissingInputError),
    Error(RecordError),
}

/// What the router did with a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordStatus {
    Uploaded { key: String },
    NoMatch,
    MissingData,
    Failed,
}

/// Per-run tally of record statuses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub uploaded: Vec<String>,
    pub no_match: usize,
    pub missing_data: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn record(&mut self, status: RecordStatus) {
        match status {
            RecordStatus::Uploaded { key } => self.uploaded.push(key),
            RecordStatus::NoMatch => self.no_match += 1,
            RecordStatus::MissingData => self.missing_data += 1,
            RecordStatus::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.uploaded.len() + self.no_match + self.missing_data + self.failed
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records: {} uploaded, {} no match, {} missing data, {} errors",
            self.total(),
            self.uploaded.len(),
            self.no_match,
            self.missing_data,
            self.failed
        )
    }
}
