//! Run configuration.
//!
//! Loaded once at process start from environment variables (a `.env` file is
//! honoured by `main`) and passed by reference to every component. Nothing
//! outside this module reads the environment.

use anyhow::{bail, Context, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::models::CheckType;
use crate::pipeline::PipelineOptions;

const DEFAULT_NAMESPACE: &str = "njdoe";
const DEFAULT_SCRATCH_DIR: &str = "data";
const DEFAULT_ADP_API_BASE: &str = "https://api.adp.com";
const DEFAULT_ADP_TOKEN_URL: &str = "https://accounts.adp.com/auth/oauth/v2/token";
const DEFAULT_DAYFORCE_ENTITY: &str = "export_njdoe";

/// Where the batch of workers comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceMode {
    /// Local staff list, each entry enriched by an HR lookup
    #[default]
    Preselected,
    /// Full HR export filtered by business unit
    FullRoster,
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceMode::Preselected => write!(f, "preselected"),
            SourceMode::FullRoster => write!(f, "full-roster"),
        }
    }
}

impl FromStr for SourceMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "preselected" => Ok(SourceMode::Preselected),
            "full-roster" | "full_roster" | "roster" => Ok(SourceMode::FullRoster),
            _ => bail!("Unknown source mode: {s}. Expected 'preselected' or 'full-roster'"),
        }
    }
}

/// ADP Workforce Now API credentials.
#[derive(Clone)]
pub struct AdpSettings {
    pub client_id: String,
    pub client_secret: String,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub api_base: String,
    pub token_url: String,
}

impl fmt::Debug for AdpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdpSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("cert_path", &self.cert_path)
            .field("key_path", &self.key_path)
            .field("api_base", &self.api_base)
            .field("token_url", &self.token_url)
            .finish()
    }
}

/// Dayforce OData report credentials.
#[derive(Clone)]
pub struct DayforceSettings {
    pub subdomain: String,
    pub username: String,
    pub password: String,
    pub export_entity: String,
}

impl fmt::Debug for DayforceSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DayforceSettings")
            .field("subdomain", &self.subdomain)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("export_entity", &self.export_entity)
            .finish()
    }
}

/// HR system of record for this run.
#[derive(Debug, Clone)]
pub enum HrSettings {
    Adp(AdpSettings),
    Dayforce(DayforceSettings),
}

/// Operator alert delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifySettings {
    pub to: String,
    pub from: String,
    pub sendmail_path: Option<PathBuf>,
}

/// Command-line overrides applied on top of the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub source_mode: Option<SourceMode>,
    pub disable_notifications: bool,
}

#[derive(Clone)]
pub struct Config {
    pub bucket: String,
    pub gcs_access_token: Option<String>,
    pub namespace: String,
    pub scratch_dir: PathBuf,
    pub wait_time: Duration,
    pub pause_between_surnames: bool,
    pub source_mode: SourceMode,
    pub hr: HrSettings,
    pub staff_file: Option<PathBuf>,
    pub business_units: Vec<String>,
    pub registry_base_url: String,
    pub notify: Option<NotifySettings>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bucket", &self.bucket)
            .field(
                "gcs_access_token",
                &self.gcs_access_token.as_ref().map(|_| "<redacted>"),
            )
            .field("namespace", &self.namespace)
            .field("scratch_dir", &self.scratch_dir)
            .field("wait_time", &self.wait_time)
            .field("pause_between_surnames", &self.pause_between_surnames)
            .field("source_mode", &self.source_mode)
            .field("hr", &self.hr)
            .field("staff_file", &self.staff_file)
            .field("business_units", &self.business_units)
            .field("registry_base_url", &self.registry_base_url)
            .field("notify", &self.notify)
            .finish()
    }
}

impl Config {
    /// Load from the process environment.
    pub fn from_env(overrides: &ConfigOverrides) -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok(), overrides)
    }

    /// Load from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F, overrides: &ConfigOverrides) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(&lookup);

        let source_mode = match overrides.source_mode {
            Some(mode) => mode,
            None => vars
                .optional("SOURCE_MODE")
                .map(|v| v.parse::<SourceMode>())
                .transpose()?
                .unwrap_or_default(),
        };

        let hr = match vars
            .optional("HR_SYSTEM")
            .unwrap_or_else(|| "adp".to_string())
            .to_lowercase()
            .as_str()
        {
            "adp" => HrSettings::Adp(AdpSettings {
                client_id: vars.required("ADP_CLIENT_ID")?,
                client_secret: vars.required("ADP_CLIENT_SECRET")?,
                cert_path: PathBuf::from(vars.required("ADP_CERT_FILEPATH")?),
                key_path: PathBuf::from(vars.required("ADP_KEY_FILEPATH")?),
                api_base: vars
                    .optional("ADP_API_BASE")
                    .unwrap_or_else(|| DEFAULT_ADP_API_BASE.to_string()),
                token_url: vars
                    .optional("ADP_TOKEN_URL")
                    .unwrap_or_else(|| DEFAULT_ADP_TOKEN_URL.to_string()),
            }),
            "dayforce" => HrSettings::Dayforce(DayforceSettings {
                subdomain: vars.required("DAYFORCE_SUBDOMAIN")?,
                username: vars.required("DAYFORCE_USERNAME")?,
                password: vars.required("DAYFORCE_PASSWORD")?,
                export_entity: vars
                    .optional("DAYFORCE_EXPORT_ENTITY")
                    .unwrap_or_else(|| DEFAULT_DAYFORCE_ENTITY.to_string()),
            }),
            other => bail!("Unknown HR_SYSTEM: {other}. Expected 'adp' or 'dayforce'"),
        };

        let staff_file = vars.optional("TARGET_STAFF_FILE").map(PathBuf::from);
        let business_units = vars
            .optional("BUSINESS_UNITS")
            .map(|v| parse_list(&v))
            .unwrap_or_default();

        match source_mode {
            SourceMode::Preselected => {
                if staff_file.is_none() {
                    bail!("TARGET_STAFF_FILE is required in preselected source mode");
                }
                if matches!(hr, HrSettings::Dayforce(_)) {
                    bail!("Dayforce only supports the full-roster source mode");
                }
            }
            SourceMode::FullRoster => {
                if business_units.is_empty() {
                    bail!("BUSINESS_UNITS must list at least one business unit in full-roster mode");
                }
            }
        }

        let wait_secs: u64 = vars
            .required("WAIT_TIME")?
            .trim()
            .parse()
            .context("WAIT_TIME must be a whole number of seconds")?;

        let enable_notifications = !overrides.disable_notifications
            && vars
                .optional("ENABLE_NOTIFICATIONS")
                .map(|v| parse_bool("ENABLE_NOTIFICATIONS", &v))
                .transpose()?
                .unwrap_or(true);

        let notify = if enable_notifications {
            Some(NotifySettings {
                to: vars.required("NOTIFY_TO")?,
                from: vars.required("NOTIFY_FROM")?,
                sendmail_path: vars.optional("SENDMAIL_PATH").map(PathBuf::from),
            })
        } else {
            None
        };

        Ok(Self {
            bucket: vars.required("GCS_BUCKET_NAME")?,
            gcs_access_token: vars.optional("GCS_ACCESS_TOKEN"),
            namespace: vars
                .optional("STORAGE_NAMESPACE")
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            scratch_dir: PathBuf::from(
                vars.optional("SCRATCH_DIR")
                    .unwrap_or_else(|| DEFAULT_SCRATCH_DIR.to_string()),
            ),
            wait_time: Duration::from_secs(wait_secs),
            pause_between_surnames: vars
                .optional("PAUSE_BETWEEN_SURNAMES")
                .map(|v| parse_bool("PAUSE_BETWEEN_SURNAMES", &v))
                .transpose()?
                .unwrap_or(true),
            source_mode,
            hr,
            staff_file,
            business_units,
            registry_base_url: vars.required("REGISTRY_BASE_URL")?,
            notify,
        })
    }

    pub fn notifications_enabled(&self) -> bool {
        self.notify.is_some()
    }

    /// Per-record pipeline settings for a check type.
    pub fn pipeline_options(&self, check: CheckType) -> PipelineOptions {
        PipelineOptions {
            check,
            wait_time: self.wait_time,
            pause_between_surnames: self.pause_between_surnames,
        }
    }
}

struct Vars<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Vars<'_> {
    fn optional(&self, name: &str) -> Option<String> {
        (self.0)(name).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, name: &str) -> Result<String> {
        self.optional(name)
            .with_context(|| format!("Missing required environment variable: {name}"))
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("{name} must be true or false, got '{other}'"),
    }
}
