use std::fmt;
use thiserror::Error;

/// Identity field a registry lookup could not be built without.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    EmployeeNumber,
    Ssn,
    BirthDate,
    Surname,
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingField::EmployeeNumber => write!(f, "employee number"),
            MissingField::Ssn => write!(f, "ssn"),
            MissingField::BirthDate => write!(f, "birth date"),
            MissingField::Surname => write!(f, "surname"),
        }
    }
}

/// A required identity field is absent or malformed.
///
/// Terminal for the record but never an error: the record is skipped without an alert.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing {field}: {reason}")]
pub struct MissingInputError {
    pub field: MissingField,
    pub reason: String,
}

impl MissingInputError {
    pub fn absent(field: MissingField) -> Self {
        Self {
            field,
            reason: "not present".to_string(),
        }
    }

    pub fn malformed(field: MissingField, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// A per-record failure that warrants an operator alert.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The registry lookup raised.
    #[error("registry lookup failed: {0:#}")]
    Lookup(anyhow::Error),

    /// Writing the artifact locally or uploading it failed.
    #[error("artifact upload failed: {0:#}")]
    Upload(anyhow::Error),
}

impl RecordError {
    /// Underlying error, for rendering the full chain in alerts.
    pub fn inner(&self) -> &anyhow::Error {
        match self {
            RecordError::Lookup(e) | RecordError::Upload(e) => e,
        }
    }
}

/// An upstream HR fetch failed twice in a row. Run-level and fatal.
#[derive(Debug, Error)]
#[error("{operation} failed after retry: {last:#}")]
pub struct FetchError {
    pub operation: String,
    pub last: anyhow::Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input_display() {
        let err = MissingInputError::absent(MissingField::BirthDate);
        assert_eq!(err.to_string(), "missing birth date: not present");

        let err = MissingInputError::malformed(MissingField::Ssn, "expected DDD-DD-DDDD");
        assert_eq!(err.to_string(), "missing ssn: expected DDD-DD-DDDD");
    }

    #[test]
    fn test_record_error_includes_chain() {
        let inner = anyhow::anyhow!("connection reset").context("GET /lookup");
        let err = RecordError::Lookup(inner);
        assert_eq!(
            err.to_string(),
            "registry lookup failed: GET /lookup: connection reset"
        );
    }

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError {
            operation: "ADP roster fetch".to_string(),
            last: anyhow::anyhow!("HTTP 503"),
        };
        assert_eq!(err.to_string(), "ADP roster fetch failed after retry: HTTP 503");
    }
}
