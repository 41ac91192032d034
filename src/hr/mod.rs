//! HR system of record abstraction
//!
//! Both supported systems (ADP Workforce Now and Dayforce) are normalized to
//! [`WorkerRecord`] at this boundary so nothing downstream depends on their
//! response shapes.

pub mod adp;
pub mod dayforce;

use anyhow::Result;

use crate::config::HrSettings;
use crate::models::WorkerRecord;

/// Source of worker identity records.
pub trait HrSystem {
    /// Short name for logs and error messages
    fn name(&self) -> &'static str;

    /// Fetch one worker by its external identifier (ADP associate OID).
    fn fetch_worker(&self, associate_oid: &str) -> Result<WorkerRecord>;

    /// Fetch every worker with an active assignment, in upstream order.
    fn fetch_roster(&self) -> Result<Vec<WorkerRecord>>;
}

/// Authenticate against the configured HR system.
pub fn connect(settings: &HrSettings) -> Result<Box<dyn HrSystem>> {
    match settings {
        HrSettings::Adp(adp) => {
            let client = adp::AdpClient::connect(adp)?;
            Ok(Box::new(client))
        }
        HrSettings::Dayforce(dayforce) => {
            let client = dayforce::DayforceClient::connect(dayforce)?;
            Ok(Box::new(client))
        }
    }
}
