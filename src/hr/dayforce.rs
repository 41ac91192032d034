//! Dayforce OData report client.
//!
//! Dayforce exposes report exports as OData entities under a tenant-specific
//! URL. The public base URL redirects to the tenant's host, so the first
//! request only resolves where the reports actually live.

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::HrSystem;
use crate::config::DayforceSettings;
use crate::http::{create_http_client, ensure_success};
use crate::models::{BirthDateFormat, Surnames, WorkerRecord};

const DAYFORCE_ODATA_BASE: &str = "https://www.dayforcehcm.com/OData";
const EXPORT_TOP: &str = "100000";

pub struct DayforceClient {
    client: Client,
    export_url: String,
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct ODataRows {
    #[serde(default)]
    value: Vec<Map<String, Value>>,
}

impl DayforceClient {
    pub fn connect(settings: &DayforceSettings) -> Result<Self> {
        let client = create_http_client()?;

        let base_url = format!("{DAYFORCE_ODATA_BASE}/{}/Reports/", settings.subdomain);
        let response = client
            .get(&base_url)
            .send()
            .with_context(|| format!("Failed to reach Dayforce: {base_url}"))?;
        let odata_url = response.url().to_string();
        if odata_url != base_url {
            debug!(%odata_url, "Dayforce base URL redirected");
        }

        Ok(Self {
            client,
            export_url: export_url(&odata_url, &settings.export_entity),
            username: settings.username.clone(),
            password: settings.password.clone(),
        })
    }
}

fn export_url(odata_url: &str, entity: &str) -> String {
    format!("{}/{}", odata_url.trim_end_matches('/'), entity)
}

impl HrSystem for DayforceClient {
    fn name(&self) -> &'static str {
        "Dayforce"
    }

    fn fetch_worker(&self, associate_oid: &str) -> Result<WorkerRecord> {
        bail!("Dayforce does not support per-worker lookups (requested {associate_oid})")
    }

    fn fetch_roster(&self) -> Result<Vec<WorkerRecord>> {
        let response = self
            .client
            .get(&self.export_url)
            .basic_auth(&self.username, Some(&self.password))
            .query(&[("$select", "*"), ("$top", EXPORT_TOP)])
            .send()
            .context("Failed to query Dayforce export")?;

        let rows: ODataRows = ensure_success(response, "Dayforce export query")?
            .json()
            .context("Failed to parse Dayforce export")?;

        let records: Vec<WorkerRecord> = rows.value.iter().map(row_to_record).collect();
        info!(count = records.len(), "fetched Dayforce export");
        Ok(records)
    }
}

fn text(row: &Map<String, Value>, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn row_to_record(row: &Map<String, Value>) -> WorkerRecord {
    let reference = text(row, "Reference_Code");
    WorkerRecord {
        worker_id: reference.clone().unwrap_or_default(),
        employee_number: reference,
        ssn: text(row, "SSN/SIN"),
        birth_date: text(row, "Birth_Date"),
        birth_date_format: BirthDateFormat::MonthDayYear,
        business_unit: text(row, "Business_Unit"),
        surnames: Surnames {
            legal: text(row, "Last_Name"),
            maiden: text(row, "Maiden_Name"),
            preferred: text(row, "Preferred_Last_Name"),
        },
        first_name: text(row, "First_Name"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_to_record() {
        let row = json!({
            "Reference_Code": "100234",
            "SSN/SIN": "123456789",
            "Birth_Date": "07/04/1990",
            "First_Name": "Ana",
            "Last_Name": "Smith",
            "Maiden_Name": null,
            "Preferred_Last_Name": "",
            "Business_Unit": "KIPP Newark"
        });
        let record = row_to_record(row.as_object().unwrap());

        assert_eq!(record.worker_id, "100234");
        assert_eq!(record.employee_number.as_deref(), Some("100234"));
        assert_eq!(record.ssn.as_deref(), Some("123456789"));
        assert_eq!(record.birth_date_format, BirthDateFormat::MonthDayYear);
        assert_eq!(record.surnames.legal.as_deref(), Some("Smith"));
        assert_eq!(record.surnames.maiden, None);
        assert_eq!(record.surnames.preferred, None);
        assert_eq!(record.business_unit.as_deref(), Some("KIPP Newark"));
    }

    #[test]
    fn test_numeric_reference_code() {
        let row = json!({"Reference_Code": 100234});
        let record = row_to_record(row.as_object().unwrap());
        assert_eq!(record.employee_number.as_deref(), Some("100234"));
    }

    #[test]
    fn test_odata_rows_parse() {
        let rows: ODataRows =
            serde_json::from_str(r#"{"@odata.context": "x", "value": [{"Reference_Code": "1"}]}"#)
                .unwrap();
        assert_eq!(rows.value.len(), 1);
    }

    #[test]
    fn test_export_url() {
        assert_eq!(
            export_url("https://us58.dayforcehcm.com/api/kipp/OData/Reports/", "export_njdoe"),
            "https://us58.dayforcehcm.com/api/kipp/OData/Reports/export_njdoe"
        );
    }
}
