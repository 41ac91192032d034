//! NJDOE registry lookups
//!
//! The registry answers two questions about a person: whether a criminal
//! history (background check) approval is on file, and the status of their
//! certification applications. Both return either nothing or a flat set of
//! matched fields.

pub mod http;

use anyhow::Result;

use crate::models::{Payload, RegistryDate, SsnSegments};

/// External verification registry.
///
/// Lookups may be slow and may fail transiently; callers isolate failures per record.
pub trait Registry {
    /// Background-check approval and employment history lookup.
    fn background_check(&self, ssn: &SsnSegments, dob: &RegistryDate) -> Result<Option<Payload>>;

    /// Certification application status lookup for one candidate surname.
    fn certification_check(&self, surname: &str, ssn: &SsnSegments) -> Result<Option<Payload>>;
}
