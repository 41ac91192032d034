//! Per-record verification pipeline
//!
//! Each record is fully resolved (key derivation, registry lookup, routing,
//! upload or alert) before the next one starts. A record's failure is
//! contained to that record; only batch acquisition can end a run early.

pub mod invoker;
pub mod router;

#[cfg(test)]
mod tests;

use anyhow::Result;
use std::thread;
use std::time::Duration;
use tracing::{info, info_span};

use crate::hr::HrSystem;
use crate::models::{CheckType, RunSummary, WorkerRecord};
use crate::notify::Notifier;
use crate::registry::Registry;
use crate::source::BatchSource;
use crate::storage::{ArtifactWriter, ObjectStore};
use invoker::Invoker;
use router::Router;

/// Per-record settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub check: CheckType,
    /// Registry rate-limit pause between records
    pub wait_time: Duration,
    /// Also pause between surname attempts within one certification record
    pub pause_between_surnames: bool,
}

/// Blocking wait between registry calls.
pub trait Pause {
    fn pause(&self, duration: Duration);
}

/// [`Pause`] that sleeps the current thread.
pub struct ThreadSleep;

impl Pause for ThreadSleep {
    fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

/// External collaborators a pipeline talks to.
pub struct Collaborators<'a> {
    pub registry: &'a dyn Registry,
    pub store: &'a dyn ObjectStore,
    pub notifier: &'a dyn Notifier,
    pub pause: &'a dyn Pause,
}

pub struct Pipeline<'a> {
    options: &'a PipelineOptions,
    writer: &'a ArtifactWriter,
    collaborators: Collaborators<'a>,
    run_id: &'a str,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        options: &'a PipelineOptions,
        writer: &'a ArtifactWriter,
        collaborators: Collaborators<'a>,
        run_id: &'a str,
    ) -> Self {
        Self {
            options,
            writer,
            collaborators,
            run_id,
        }
    }

    /// Verify every record in order. Never fails: per-record faults are routed.
    pub fn run(&self, records: &[WorkerRecord]) -> RunSummary {
        let invoker = Invoker::new(
            self.collaborators.registry,
            self.collaborators.pause,
            self.options,
        );
        let router = Router::new(
            self.options.check,
            self.writer,
            self.collaborators.store,
            self.collaborators.notifier,
            self.run_id,
        );

        let mut summary = RunSummary::default();
        for (index, record) in records.iter().enumerate() {
            let span = info_span!("record", worker_id = %record.worker_id);
            let _entered = span.enter();

            let invocation = invoker.verify(record);
            let status = router.route(record, invocation.outcome);
            summary.record(status);

            let more = index + 1 < records.len();
            if more && invocation.registry_calls > 0 {
                self.collaborators.pause.pause(self.options.wait_time);
            }
        }

        info!(%summary, "run complete");
        summary
    }

    /// Acquire the batch from `source` and verify it.
    ///
    /// Batch acquisition errors (after their retry) are returned; they are run-fatal.
    pub fn sync(&self, source: &BatchSource, hr: &dyn HrSystem) -> Result<RunSummary> {
        let records = source.acquire(hr)?;
        info!(count = records.len(), check = %self.options.check, "acquired batch");
        Ok(self.run(&records))
    }
}
