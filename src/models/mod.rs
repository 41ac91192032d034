pub mod failure;
pub mod key;
pub mod outcome;
pub mod worker;

pub use failure::{FetchError, MissingField, MissingInputError, RecordError};
pub use key::{RegistryDate, SsnSegments, VerificationKey};
pub use outcome::{CheckType, Outcome, Payload, RecordStatus, RunSummary, VerificationResult};
pub use worker::{BirthDateFormat, StaffEntry, Surnames, WorkerRecord};
