use colored::Colorize;
use tracing::{error, info};

use crate::models::{CheckType, Outcome, RecordError, RecordStatus, WorkerRecord};
use crate::notify::{Alert, Notifier};
use crate::storage::{ArtifactWriter, ObjectStore};

/// Drives exactly one side-effect path per classified record.
pub struct Router<'a> {
    check: CheckType,
    writer: &'a ArtifactWriter,
    store: &'a dyn ObjectStore,
    notifier: &'a dyn Notifier,
    run_id: &'a str,
}

impl<'a> Router<'a> {
    pub fn new(
        check: CheckType,
        writer: &'a ArtifactWriter,
        store: &'a dyn ObjectStore,
        notifier: &'a dyn Notifier,
        run_id: &'a str,
    ) -> Self {
        Self {
            check,
            writer,
            store,
            notifier,
            run_id,
        }
    }

    pub fn route(&self, record: &WorkerRecord, outcome: Outcome) -> RecordStatus {
        let id = record.display_id();

        match outcome {
            Outcome::Match(result) => {
                match self.writer.write_and_upload(&result, self.check, self.store) {
                    Ok(receipt) => {
                        println!("{id}\n\t{}", format!("Uploaded to {}!", receipt.key).green());
                        info!(
                            worker_id = %id,
                            employee_number = %result.employee_number,
                            key = %receipt.key,
                            sha256 = %receipt.sha256,
                            "artifact uploaded"
                        );
                        RecordStatus::Uploaded { key: receipt.key }
                    }
                    Err(e) => self.fail(record, RecordError::Upload(e)),
                }
            }
            Outcome::NoMatch => {
                println!("{id}\n\t{}", "NO MATCH".yellow());
                RecordStatus::NoMatch
            }
            Outcome::MissingInput(missing) => {
                println!("{id}\n\t{} ({})", "MISSING DATA".yellow(), missing.field);
                info!(worker_id = %id, reason = %missing, "skipped record");
                RecordStatus::MissingData
            }
            Outcome::Error(e) => self.fail(record, e),
        }
    }

    fn fail(&self, record: &WorkerRecord, e: RecordError) -> RecordStatus {
        let id = record.display_id();
        println!("{id}\n\t{}", "ERROR".red().bold());
        error!(worker_id = %id, error = %e, chain = ?e.inner(), "record failed");

        Alert::record_failure(self.check, id, &e, self.run_id).send(self.notifier);
        RecordStatus::Failed
    }
}
