//! Google Cloud Storage uploads through the JSON API.

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::ObjectStore;
use crate::http::{create_http_client, ensure_success};

const UPLOAD_BASE: &str = "https://storage.googleapis.com/upload/storage/v1/b";
const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Metadata tokens are replaced this long before they expire.
const REFRESH_MARGIN: Duration = Duration::from_secs(300);

pub struct GcsBucket {
    client: Client,
    bucket: String,
    token: RefCell<BearerToken>,
}

/// Upload credential.
#[derive(Debug, Clone)]
enum BearerToken {
    /// Supplied through configuration; used as is for the whole run
    Static(String),
    /// Issued by the instance metadata server
    Metadata { value: String, expires_at: Instant },
}

impl BearerToken {
    fn needs_refresh(&self, now: Instant) -> bool {
        match self {
            BearerToken::Static(_) => false,
            BearerToken::Metadata { expires_at, .. } => now + REFRESH_MARGIN >= *expires_at,
        }
    }

    fn value(&self) -> &str {
        match self {
            BearerToken::Static(value) | BearerToken::Metadata { value, .. } => value,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

impl MetadataToken {
    fn into_bearer(self, issued_at: Instant) -> BearerToken {
        BearerToken::Metadata {
            value: self.access_token,
            expires_at: issued_at + Duration::from_secs(self.expires_in),
        }
    }
}

impl GcsBucket {
    /// Bucket handle using `access_token`, or the instance service account when `None`.
    pub fn connect(bucket: &str, access_token: Option<&str>) -> Result<Self> {
        let client = create_http_client()?;
        let token = match access_token {
            Some(token) => BearerToken::Static(token.to_string()),
            None => metadata_token(&client)?,
        };

        Ok(Self {
            client,
            bucket: bucket.to_string(),
            token: RefCell::new(token),
        })
    }

    fn upload_url(&self) -> String {
        format!("{UPLOAD_BASE}/{}/o", self.bucket)
    }

    /// Current bearer token, re-fetching a metadata token close to expiry.
    fn bearer(&self) -> Result<String> {
        if self.token.borrow().needs_refresh(Instant::now()) {
            let fresh = metadata_token(&self.client)?;
            info!("refreshed GCS access token");
            *self.token.borrow_mut() = fresh;
        }
        Ok(self.token.borrow().value().to_string())
    }
}

fn metadata_token(client: &Client) -> Result<BearerToken> {
    let issued_at = Instant::now();
    let response = client
        .get(METADATA_TOKEN_URL)
        .header("Metadata-Flavor", "Google")
        .send()
        .context("Failed to reach GCE metadata server (set GCS_ACCESS_TOKEN outside GCP)")?;
    let token: MetadataToken = ensure_success(response, "GCE metadata token request")?
        .json()
        .context("Failed to parse GCE metadata token")?;
    Ok(token.into_bearer(issued_at))
}

fn content_type(local_path: &Path) -> &'static str {
    match local_path.extension().and_then(|e| e.to_str()) {
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

impl ObjectStore for GcsBucket {
    fn upload_file(&self, local_path: &Path, key: &str) -> Result<()> {
        let body = fs::read(local_path)
            .with_context(|| format!("Failed to read {}", local_path.display()))?;
        let size = body.len();
        let token = self.bearer()?;

        let response = self
            .client
            .post(self.upload_url())
            .bearer_auth(&token)
            .query(&[("uploadType", "media"), ("name", key)])
            .header(CONTENT_TYPE, content_type(local_path))
            .body(body)
            .send()
            .with_context(|| format!("Failed to reach GCS for gs://{}/{key}", self.bucket))?;
        ensure_success(response, &format!("GCS upload gs://{}/{key}", self.bucket))?;

        debug!(bucket = %self.bucket, key, size, "uploaded object");
        Ok(())
    }
}
