//! ADP Workforce Now client.
//!
//! Authenticates with OAuth2 client credentials over mutual TLS and reads
//! worker records from `/hr/v2/workers`.

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Identity, StatusCode};
use serde::Deserialize;
use std::fs;
use tracing::{debug, info};

use super::HrSystem;
use crate::config::AdpSettings;
use crate::http::{ensure_success, http_client_builder};
use crate::models::{BirthDateFormat, Surnames, WorkerRecord};

/// Unmasked responses are required to read government ids.
const ACCEPT_UNMASKED: &str = "application/json;masked=false";

const WORKER_FIELDS: &[&str] = &[
    "workers/associateOID",
    "workers/workerID",
    "workers/person/governmentIDs",
    "workers/person/birthDate",
    "workers/person/legalName",
    "workers/person/birthName",
    "workers/person/preferredName",
    "workers/customFieldGroup/stringFields",
    "workers/workAssignments/primaryIndicator",
    "workers/workAssignments/assignmentStatus",
    "workers/workAssignments/homeOrganizationalUnits",
];

const ACTIVE_FILTER: &str = "workers/workAssignments/assignmentStatus/statusCode/codeValue eq 'A'";
const PAGE_SIZE: usize = 100;

const SSN_CODE: &str = "SSN";
const BUSINESS_UNIT_TYPE: &str = "Business Unit";
const EMPLOYEE_NUMBER_FIELD: &str = "Employee Number";

pub struct AdpClient {
    client: Client,
    api_base: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl AdpClient {
    /// Build the mTLS client and exchange client credentials for a bearer token.
    pub fn connect(settings: &AdpSettings) -> Result<Self> {
        let mut pem = fs::read(&settings.cert_path).with_context(|| {
            format!(
                "Failed to read ADP certificate: {}",
                settings.cert_path.display()
            )
        })?;
        pem.push(b'\n');
        pem.extend(fs::read(&settings.key_path).with_context(|| {
            format!("Failed to read ADP key: {}", settings.key_path.display())
        })?);
        let identity = Identity::from_pem(&pem).context("Invalid ADP certificate/key pair")?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_UNMASKED));

        let client = http_client_builder()
            .identity(identity)
            .default_headers(headers)
            .build()
            .context("Failed to create ADP HTTP client")?;

        let response = client
            .post(&settings.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", settings.client_id.as_str()),
                ("client_secret", settings.client_secret.as_str()),
            ])
            .send()
            .context("Failed to request ADP access token")?;
        let token: TokenResponse = ensure_success(response, "ADP token request")?
            .json()
            .context("Failed to parse ADP token response")?;

        info!(api_base = %settings.api_base, "authorized with ADP");

        Ok(Self {
            client,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            token: token.access_token,
        })
    }

    fn select() -> String {
        WORKER_FIELDS.join(",")
    }

    fn get_workers(&self, path: &str, query: &[(&str, String)]) -> Result<Option<WorkersPage>> {
        let url = format!("{}{}", self.api_base, path);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .with_context(|| format!("Failed to reach ADP: GET {path}"))?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let page: WorkersPage = ensure_success(response, &format!("ADP GET {path}"))?
            .json()
            .with_context(|| format!("Failed to parse ADP response for {path}"))?;
        Ok(Some(page))
    }
}

impl HrSystem for AdpClient {
    fn name(&self) -> &'static str {
        "ADP"
    }

    fn fetch_worker(&self, associate_oid: &str) -> Result<WorkerRecord> {
        let path = format!("/hr/v2/workers/{associate_oid}");
        let page = self.get_workers(&path, &[("$select", Self::select())])?;

        match page.and_then(|p| p.workers.into_iter().next()) {
            Some(worker) => Ok(worker.into_record()),
            None => bail!("ADP returned no worker for associate OID {associate_oid}"),
        }
    }

    fn fetch_roster(&self) -> Result<Vec<WorkerRecord>> {
        let mut records = Vec::new();
        let mut skip = 0usize;

        loop {
            let query = [
                ("$select", Self::select()),
                ("$filter", ACTIVE_FILTER.to_string()),
                ("$top", PAGE_SIZE.to_string()),
                ("$skip", skip.to_string()),
            ];
            let Some(page) = self.get_workers("/hr/v2/workers", &query)? else {
                break;
            };
            if page.workers.is_empty() {
                break;
            }

            let count = page.workers.len();
            records.extend(page.workers.into_iter().map(AdpWorker::into_record));
            debug!(skip, count, "fetched ADP worker page");
            skip += count;
        }

        info!(count = records.len(), "fetched ADP roster");
        Ok(records)
    }
}

// ADP response shapes. Only the fields this crate reads are modelled.

#[derive(Debug, Default, Deserialize)]
struct WorkersPage {
    #[serde(default)]
    workers: Vec<AdpWorker>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdpWorker {
    #[serde(rename = "associateOID", default)]
    associate_oid: Option<String>,
    #[serde(rename = "workerID", default)]
    worker_id: Option<IdValue>,
    #[serde(default)]
    person: Person,
    #[serde(default)]
    custom_field_group: CustomFieldGroup,
    #[serde(default)]
    work_assignments: Vec<WorkAssignment>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdValue {
    #[serde(default)]
    id_value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Person {
    #[serde(rename = "governmentIDs", default)]
    government_ids: Vec<GovernmentId>,
    #[serde(default)]
    birth_date: Option<String>,
    #[serde(default)]
    legal_name: Option<PersonName>,
    #[serde(default)]
    birth_name: Option<PersonName>,
    #[serde(default)]
    preferred_name: Option<PersonName>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GovernmentId {
    #[serde(default)]
    id_value: Option<String>,
    #[serde(default)]
    name_code: Code,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersonName {
    #[serde(default)]
    given_name: Option<String>,
    #[serde(default)]
    family_name1: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Code {
    #[serde(default)]
    code_value: Option<String>,
    #[serde(default)]
    short_name: Option<String>,
}

impl Code {
    fn is(&self, expected: &str) -> bool {
        [&self.code_value, &self.short_name]
            .into_iter()
            .flatten()
            .any(|v| v.trim().eq_ignore_ascii_case(expected))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomFieldGroup {
    #[serde(default)]
    string_fields: Vec<StringField>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StringField {
    #[serde(default)]
    name_code: Code,
    #[serde(default)]
    string_value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkAssignment {
    #[serde(default)]
    primary_indicator: bool,
    #[serde(default)]
    home_organizational_units: Vec<OrganizationalUnit>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrganizationalUnit {
    #[serde(default)]
    name_code: Code,
    #[serde(default)]
    type_code: Code,
}

impl AdpWorker {
    fn into_record(self) -> WorkerRecord {
        let worker_id = self
            .worker_id
            .and_then(|w| w.id_value)
            .or(self.associate_oid)
            .unwrap_or_default();

        let ssn = self
            .person
            .government_ids
            .iter()
            .find(|gi| gi.name_code.is(SSN_CODE))
            .and_then(|gi| gi.id_value.clone());

        let employee_number = self
            .custom_field_group
            .string_fields
            .iter()
            .find(|f| f.name_code.is(EMPLOYEE_NUMBER_FIELD))
            .and_then(|f| f.string_value.clone());

        // Primary assignment first, then the rest in upstream order.
        let mut assignments: Vec<&WorkAssignment> = self.work_assignments.iter().collect();
        assignments.sort_by_key(|a| !a.primary_indicator);
        let business_unit = assignments
            .iter()
            .flat_map(|a| a.home_organizational_units.iter())
            .find(|unit| unit.type_code.is(BUSINESS_UNIT_TYPE))
            .and_then(|unit| {
                unit.name_code
                    .code_value
                    .clone()
                    .or_else(|| unit.name_code.short_name.clone())
            });

        let family = |name: &Option<PersonName>| name.as_ref().and_then(|n| n.family_name1.clone());
        let surnames = Surnames {
            legal: family(&self.person.legal_name),
            maiden: family(&self.person.birth_name),
            preferred: family(&self.person.preferred_name),
        };
        let first_name = self
            .person
            .legal_name
            .as_ref()
            .and_then(|n| n.given_name.clone());

        WorkerRecord {
            worker_id,
            employee_number,
            ssn,
            birth_date: self.person.birth_date,
            birth_date_format: BirthDateFormat::YearMonthDay,
            business_unit,
            surnames,
            first_name,
        }
    }
}
