//! Batch source adapters
//!
//! Produce the ordered list of workers a run will verify, either from a
//! pre-selected staff list enriched through the HR system or from the full
//! HR roster filtered to the allowed business units.

pub mod retry;

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::{Config, SourceMode};
use crate::hr::HrSystem;
use crate::models::{StaffEntry, WorkerRecord};
use retry::retry_once;

/// Where a run's workers come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchSource {
    Preselected { staff_file: PathBuf },
    FullRoster { business_units: Vec<String> },
}

impl BatchSource {
    pub fn from_config(config: &Config) -> Result<Self> {
        match config.source_mode {
            SourceMode::Preselected => {
                let staff_file = config
                    .staff_file
                    .clone()
                    .context("TARGET_STAFF_FILE is required in preselected source mode")?;
                Ok(BatchSource::Preselected { staff_file })
            }
            SourceMode::FullRoster => Ok(BatchSource::FullRoster {
                business_units: config.business_units.clone(),
            }),
        }
    }

    /// Fetch the batch. Any upstream failure that survives its retry is returned.
    pub fn acquire(&self, hr: &dyn HrSystem) -> Result<Vec<WorkerRecord>> {
        match self {
            BatchSource::Preselected { staff_file } => {
                let staff = load_staff_list(staff_file)?;
                preselected(&staff, hr)
            }
            BatchSource::FullRoster { business_units } => full_roster(hr, business_units),
        }
    }
}

/// Read the pre-selected staff list (a JSON array of staff entries).
pub fn load_staff_list(path: &Path) -> Result<Vec<StaffEntry>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read staff list: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse staff list: {}", path.display()))
}

/// Enrich each staff entry with its HR record, preserving list order.
pub fn preselected(staff: &[StaffEntry], hr: &dyn HrSystem) -> Result<Vec<WorkerRecord>> {
    info!(count = staff.len(), hr = hr.name(), "enriching pre-selected staff");

    let mut records = Vec::with_capacity(staff.len());
    for entry in staff {
        let operation = format!("{} lookup for {}", hr.name(), entry.associate_oid);
        let fetched = retry_once(&operation, || hr.fetch_worker(&entry.associate_oid))?;
        records.push(WorkerRecord::enriched(entry, fetched));
    }
    Ok(records)
}

/// Fetch the active roster and keep workers in the allowed business units.
pub fn full_roster(hr: &dyn HrSystem, business_units: &[String]) -> Result<Vec<WorkerRecord>> {
    let operation = format!("{} roster fetch", hr.name());
    let roster = retry_once(&operation, || hr.fetch_roster())?;
    let total = roster.len();

    let records: Vec<WorkerRecord> = roster
        .into_iter()
        .filter(|record| {
            let keep = record.in_business_units(business_units);
            if !keep {
                debug!(
                    worker_id = %record.worker_id,
                    business_unit = ?record.business_unit,
                    "excluded by business unit"
                );
            }
            keep
        })
        .collect();

    info!(total, kept = records.len(), "filtered roster by business unit");
    Ok(records)
}
