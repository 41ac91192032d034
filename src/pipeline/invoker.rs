use tracing::debug;

use super::{Pause, PipelineOptions};
use crate::models::key::{derive_background_key, derive_certification_key};
use crate::models::{
    CheckType, MissingField, MissingInputError, Outcome, Payload, RecordError,
    VerificationKey, VerificationResult, WorkerRecord,
};
use crate::registry::Registry;

/// Outcome of one record plus how many registry calls it took.
#[derive(Debug)]
pub struct Invocation {
    pub outcome: Outcome,
    pub registry_calls: usize,
}

impl Invocation {
    fn skipped(error: MissingInputError) -> Self {
        Self {
            outcome: Outcome::MissingInput(error),
            registry_calls: 0,
        }
    }
}

/// Derives keys and calls the registry for one record at a time.
pub struct Invoker<'a> {
    registry: &'a dyn Registry,
    pause: &'a dyn Pause,
    options: &'a PipelineOptions,
}

impl<'a> Invoker<'a> {
    pub fn new(
        registry: &'a dyn Registry,
        pause: &'a dyn Pause,
        options: &'a PipelineOptions,
    ) -> Self {
        Self {
            registry,
            pause,
            options,
        }
    }

    /// Classify a record. Never fails: lookup errors become [`Outcome::Error`].
    pub fn verify(&self, record: &WorkerRecord) -> Invocation {
        match self.options.check {
            CheckType::BackgroundCheck => match derive_background_key(record) {
                Ok(key) => self.background_check(record, &key),
                Err(e) => Invocation::skipped(e),
            },
            CheckType::Certification => match derive_certification_key(record) {
                Ok(key) => self.certification_check(record, &key),
                Err(e) => Invocation::skipped(e),
            },
        }
    }

    fn background_check(&self, record: &WorkerRecord, key: &VerificationKey) -> Invocation {
        let Some(dob) = key.birth_date.as_ref() else {
            return Invocation::skipped(MissingInputError::absent(MissingField::BirthDate));
        };

        let outcome = match self.registry.background_check(&key.ssn, dob) {
            Ok(found) => classify(record, key, found),
            Err(e) => Outcome::Error(RecordError::Lookup(e)),
        };
        Invocation {
            outcome,
            registry_calls: 1,
        }
    }

    /// Try each candidate surname in order and stop at the first match.
    fn certification_check(&self, record: &WorkerRecord, key: &VerificationKey) -> Invocation {
        let mut calls = 0;

        for surname in &key.surnames {
            if calls > 0 && self.options.pause_between_surnames {
                self.pause.pause(self.options.wait_time);
            }
            calls += 1;

            match self.registry.certification_check(surname, &key.ssn) {
                Ok(found) => match classify(record, key, found) {
                    Outcome::NoMatch => {
                        debug!(
                            worker_id = %record.worker_id,
                            employee_number = %key.employee_number,
                            surname = %surname,
                            "no certification match for surname"
                        );
                    }
                    matched => {
                        return Invocation {
                            outcome: matched,
                            registry_calls: calls,
                        }
                    }
                },
                Err(e) => {
                    let e = e.context(format!("certification lookup for surname {surname}"));
                    return Invocation {
                        outcome: Outcome::Error(RecordError::Lookup(e)),
                        registry_calls: calls,
                    };
                }
            }
        }

        Invocation {
            outcome: Outcome::NoMatch,
            registry_calls: calls,
        }
    }
}

/// A non-empty payload is a match; anything else is not.
fn classify(record: &WorkerRecord, key: &VerificationKey, found: Option<Payload>) -> Outcome {
    match found {
        Some(payload) if !payload.is_empty() => Outcome::Match(VerificationResult {
            payload,
            worker_id: record.worker_id.clone(),
            employee_number: key.employee_number.clone(),
        }),
        _ => Outcome::NoMatch,
    }
}
