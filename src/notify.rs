//! Operator alerts for record and run failures.
//!
//! Alerts are emailed through the local `sendmail` binary. Delivery is
//! best-effort: failures are logged and never propagated, so an alert can
//! never mask the error it reports.

use anyhow::{bail, Context, Result};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tracing::{info, warn};
use wait_timeout::ChildExt;

use crate::config::NotifySettings;
use crate::models::{CheckType, RecordError};

const SENDMAIL_TIMEOUT: Duration = Duration::from_secs(30);

/// Messaging collaborator.
pub trait Notifier {
    fn send(&self, subject: &str, body: &str) -> Result<()>;
}

/// Send an alert, logging instead of returning any delivery failure.
pub fn send_best_effort(notifier: &dyn Notifier, subject: &str, body: &str) {
    match notifier.send(subject, body) {
        Ok(()) => info!(subject, "alert sent"),
        Err(e) => warn!(subject, error = %format!("{e:#}"), "alert delivery failed"),
    }
}

/// Subject and body for an alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub subject: String,
    pub body: String,
}

impl Alert {
    /// Alert for one record whose lookup or upload failed.
    pub fn record_failure(
        check: CheckType,
        worker_id: &str,
        error: &RecordError,
        run_id: &str,
    ) -> Self {
        Self {
            subject: format!("{} Error - {worker_id}", check.title()),
            body: format!("{error}\n\n{:?}\n\nrun: {run_id}", error.inner()),
        }
    }

    /// Alert for an error that ended the run.
    pub fn run_failure(check: CheckType, error: &anyhow::Error, run_id: &str) -> Self {
        Self {
            subject: format!("{} Error", check.title()),
            body: format!("{error:#}\n\n{error:?}\n\nrun: {run_id}"),
        }
    }

    pub fn send(&self, notifier: &dyn Notifier) {
        send_best_effort(notifier, &self.subject, &self.body);
    }
}

/// Notifier used when alerts are disabled.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn send(&self, subject: &str, _body: &str) -> Result<()> {
        info!(subject, "notifications disabled, alert not sent");
        Ok(())
    }
}

/// Emails alerts by piping a message to `sendmail -t`.
pub struct SendmailNotifier {
    settings: NotifySettings,
}

impl SendmailNotifier {
    pub fn new(settings: NotifySettings) -> Self {
        if settings.sendmail_path.is_none() && which::which("sendmail").is_err() {
            warn!("sendmail not found on PATH; alerts will not be delivered");
        }
        Self { settings }
    }

    fn binary(&self) -> Result<PathBuf> {
        match &self.settings.sendmail_path {
            Some(path) => Ok(path.clone()),
            None => which::which("sendmail").context("sendmail not found on PATH"),
        }
    }

    fn compose(&self, subject: &str, body: &str) -> String {
        format!(
            "From: {}\r\nTo: {}\r\nSubject: {}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{}\r\n",
            header_value(&self.settings.from),
            header_value(&self.settings.to),
            header_value(subject),
            body
        )
    }
}

/// Header values must stay on one line.
fn header_value(value: &str) -> String {
    value
        .chars()
        .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
        .collect()
}

impl Notifier for SendmailNotifier {
    fn send(&self, subject: &str, body: &str) -> Result<()> {
        let binary = self.binary()?;
        let message = self.compose(subject, body);

        let mut child = Command::new(&binary)
            .args(["-t", "-i"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to spawn {}", binary.display()))?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(message.as_bytes()) {
                drop(stdin);
                reap(&mut child);
                return Err(e).context("Failed to write message to sendmail");
            }
        }

        match child
            .wait_timeout(SENDMAIL_TIMEOUT)
            .context("Failed to wait for sendmail")?
        {
            Some(status) if status.success() => Ok(()),
            Some(status) => bail!("sendmail exited with: {status}"),
            None => {
                reap(&mut child);
                bail!(
                    "sendmail timed out after {}s",
                    SENDMAIL_TIMEOUT.as_secs()
                )
            }
        }
    }
}

/// Stop a sendmail child we are abandoning so it does not linger as a zombie.
fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
