//! Registry client for the JSON lookup gateway.
//!
//! The gateway owns the registry's web session handling; this client only
//! sends the identity fields and interprets the reply.

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

use super::Registry;
use crate::http::{create_http_client, ensure_success};
use crate::models::{Payload, RegistryDate, SsnSegments};

const BACKGROUND_CHECK_PATH: &str = "/criminal-history/applicant-approval-employment-history";
const CERTIFICATION_PATH: &str = "/certification/application-status";

pub struct HttpRegistry {
    client: Client,
    base_url: String,
}

impl HttpRegistry {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: create_http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn lookup(&self, path: &str, query: &[(&str, &str)]) -> Result<Option<Payload>> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .with_context(|| format!("Failed to reach registry: GET {path}"))?;

        match response.status() {
            StatusCode::NO_CONTENT => {
                debug!(path, status = 204, "registry returned no record");
                return Ok(None);
            }
            StatusCode::NOT_FOUND => {
                let body = response.text().unwrap_or_default();
                if confirms_no_match(&body) {
                    debug!(path, status = 404, "registry returned no record");
                    return Ok(None);
                }
                warn!(path, "registry 404 without a no-match body");
                bail!(
                    "Registry GET {path}: HTTP 404 - endpoint not found (check REGISTRY_BASE_URL)"
                );
            }
            _ => {}
        }

        let body: Value = ensure_success(response, &format!("Registry GET {path}"))?
            .json()
            .with_context(|| format!("Failed to parse registry response for {path}"))?;
        interpret(body)
    }
}

/// A 404 means "no record" only when its body is a no-match reply.
/// Anything else (HTML error pages, empty bodies) points at a wrong URL.
fn confirms_no_match(body: &str) -> bool {
    serde_json::from_str::<Value>(body)
        .map(|v| matches!(interpret(v), Ok(None)))
        .unwrap_or(false)
}

/// Map a gateway reply to a match payload.
///
/// `null`, `false` and `{}` mean no match; any other non-object is a protocol error.
fn interpret(body: Value) -> Result<Option<Payload>> {
    match body {
        Value::Null | Value::Bool(false) => Ok(None),
        Value::Object(map) if map.is_empty() => Ok(None),
        Value::Object(map) => Ok(Some(map)),
        other => bail!("Unexpected registry response: {other}"),
    }
}

impl Registry for HttpRegistry {
    fn background_check(&self, ssn: &SsnSegments, dob: &RegistryDate) -> Result<Option<Payload>> {
        self.lookup(
            BACKGROUND_CHECK_PATH,
            &[
                ("ssn1", ssn.area.as_str()),
                ("ssn2", ssn.group.as_str()),
                ("ssn3", ssn.serial.as_str()),
                ("dob_month", dob.month.as_str()),
                ("dob_day", dob.day.as_str()),
                ("dob_year", dob.year.as_str()),
            ],
        )
    }

    fn certification_check(&self, surname: &str, ssn: &SsnSegments) -> Result<Option<Payload>> {
        self.lookup(
            CERTIFICATION_PATH,
            &[
                ("last_name", surname),
                ("ssn1", ssn.area.as_str()),
                ("ssn2", ssn.group.as_str()),
                ("ssn3", ssn.serial.as_str()),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_interpret_no_match_shapes() {
        assert_eq!(interpret(Value::Null).unwrap(), None);
        assert_eq!(interpret(json!(false)).unwrap(), None);
        assert_eq!(interpret(json!({})).unwrap(), None);
    }

    #[test]
    fn test_interpret_match() {
        let payload = interpret(json!({"status": "clear"})).unwrap().unwrap();
        assert_eq!(payload.get("status"), Some(&json!("clear")));
    }

    #[test]
    fn test_interpret_rejects_unexpected_shape() {
        assert!(interpret(json!(["clear"])).is_err());
        assert!(interpret(json!("clear")).is_err());
    }

    #[test]
    fn test_not_found_needs_no_match_body() {
        assert!(confirms_no_match("null"));
        assert!(confirms_no_match("{}"));
        assert!(confirms_no_match(" false "));
        assert!(!confirms_no_match(""));
        assert!(!confirms_no_match("<html><body>404 Not Found</body></html>"));
        assert!(!confirms_no_match(r#"{"error": "no such route"}"#));
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let registry = HttpRegistry::new("http://localhost:8080/").unwrap();
        assert_eq!(registry.base_url, "http://localhost:8080");
    }
}
