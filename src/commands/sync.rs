//! `njdoe-sync <check>`: one end-to-end verification run.

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::{error, info, info_span};

use crate::config::{Config, ConfigOverrides};
use crate::fs::RunLock;
use crate::hr;
use crate::models::{CheckType, RunSummary};
use crate::notify::{Alert, Notifier, NullNotifier, SendmailNotifier};
use crate::pipeline::{Collaborators, Pipeline, ThreadSleep};
use crate::registry::http::HttpRegistry;
use crate::source::BatchSource;
use crate::storage::gcs::GcsBucket;
use crate::storage::ArtifactWriter;

/// Run one check against the configured HR source.
///
/// Configuration errors are returned before any alerting is possible.
/// Every later run-fatal error is alerted once and then returned.
pub fn execute(check: CheckType, overrides: ConfigOverrides) -> Result<RunSummary> {
    let run_id = uuid::Uuid::new_v4().to_string();
    let span = info_span!("run", run_id = %run_id, check = %check);
    let _entered = span.enter();

    let config = Config::from_env(&overrides).context("Failed to load configuration")?;
    info!(
        source = %config.source_mode,
        namespace = %config.namespace,
        notifications = config.notifications_enabled(),
        "starting sync"
    );

    let notifier: Box<dyn Notifier> = match &config.notify {
        Some(settings) => Box::new(SendmailNotifier::new(settings.clone())),
        None => Box::new(NullNotifier),
    };

    println!("{}", check.title().bold().blue());
    guarded(check, notifier.as_ref(), &run_id, || {
        run(check, &config, notifier.as_ref(), &run_id)
    })
}

/// Call `body`, alerting once if it fails.
pub fn guarded<F>(
    check: CheckType,
    notifier: &dyn Notifier,
    run_id: &str,
    body: F,
) -> Result<RunSummary>
where
    F: FnOnce() -> Result<RunSummary>,
{
    body().inspect_err(|e| {
        error!(error = %format!("{e:#}"), "run failed");
        Alert::run_failure(check, e, run_id).send(notifier);
    })
}

fn run(
    check: CheckType,
    config: &Config,
    notifier: &dyn Notifier,
    run_id: &str,
) -> Result<RunSummary> {
    let _lock = RunLock::acquire(&config.scratch_dir)?;

    let source = BatchSource::from_config(config)?;
    let hr = hr::connect(&config.hr)?;
    let registry = HttpRegistry::new(&config.registry_base_url)?;
    let store = GcsBucket::connect(&config.bucket, config.gcs_access_token.as_deref())?;
    let writer = ArtifactWriter::new(&config.scratch_dir, &config.namespace);
    let options = config.pipeline_options(check);

    let pipeline = Pipeline::new(
        &options,
        &writer,
        Collaborators {
            registry: &registry,
            store: &store,
            notifier,
            pause: &ThreadSleep,
        },
        run_id,
    );
    pipeline.sync(&source, hr.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Outbox(RefCell<Vec<String>>);

    impl Notifier for Outbox {
        fn send(&self, subject: &str, _body: &str) -> Result<()> {
            self.0.borrow_mut().push(subject.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_guarded_alerts_on_failure() {
        let outbox = Outbox::default();
        let result = guarded(CheckType::Certification, &outbox, "run-1", || {
            Err(anyhow!("roster fetch failed after retry"))
        });

        assert!(result.is_err());
        assert_eq!(*outbox.0.borrow(), vec!["NJDOE Certification Check Error"]);
    }

    #[test]
    fn test_guarded_is_silent_on_success() {
        let outbox = Outbox::default();
        let summary = guarded(CheckType::BackgroundCheck, &outbox, "run-1", || {
            Ok(RunSummary::default())
        })
        .unwrap();

        assert_eq!(summary.total(), 0);
        assert!(outbox.0.borrow().is_empty());
    }
}
