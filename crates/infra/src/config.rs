//! Configuration loading and representation.
//!
//! Everything is read once at startup from environment variables and handed
//! to constructors explicitly; nothing reads the environment afterwards.
//!
//! | variable | default |
//! |----------|---------|
//! | `DATABASE_URL` | required |
//! | `PDFGEN_URL` | required |
//! | `ARCHIVE_URL` | required |
//! | `ARCHIVE_TOKEN` | none |
//! | `PERSON_URL` | none (enrichment disabled) |
//! | `HTTP_TIMEOUT_SECS` | `30` |
//! | `PUBLICATION_INTERVAL_SECS` | `600` |
//! | `PUBLICATION_INITIAL_DELAY_SECS` | `0` |
//! | `PUBLICATION_FALLBACK_COUNTERPARTY_LABEL` | `Nærmeste leder` |
//! | `ELECTOR_PATH` | unset → single-instance mode |
//! | `ELECTOR_INSTANCE_NAME` | `HOSTNAME` |
//! | `LOG_FORMAT` | `json` |

use std::time::Duration;

use thiserror::Error;

use followup_observability::LogFormat;

pub const DEFAULT_PUBLICATION_INTERVAL: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_FALLBACK_COUNTERPARTY_LABEL: &str = "Nærmeste leder";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Scheduler/orchestrator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicationConfig {
    /// Fixed delay between ticks. Never zero.
    pub interval: Duration,
    /// Delay before the first tick after startup.
    pub initial_delay: Duration,
    /// Counterparty name used in the summary when none can be resolved.
    pub fallback_counterparty_label: String,
}

impl Default for PublicationConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_PUBLICATION_INTERVAL,
            initial_delay: Duration::ZERO,
            fallback_counterparty_label: DEFAULT_FALLBACK_COUNTERPARTY_LABEL.to_string(),
        }
    }
}

impl PublicationConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }
}

/// How this instance decides whether it is the leader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElectorConfig {
    /// Single instance: always leader.
    Local,
    /// Ask the election sidecar at `url`; leader when it names `instance_name`.
    Http { url: String, instance_name: String },
}

/// Endpoints of the external collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub pdfgen_url: String,
    pub archive_url: String,
    pub archive_token: Option<String>,
    /// Person lookup base URL; `None` disables enrichment.
    pub person_url: Option<String>,
}

/// Complete configuration of the worker process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    pub database_url: String,
    pub log_format: LogFormat,
    pub publication: PublicationConfig,
    pub elector: ElectorConfig,
    pub http: HttpClientConfig,
}

impl WorkerConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (tests use a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let log_format = match get("LOG_FORMAT") {
            Some(v) => v.parse::<LogFormat>().map_err(|e| ConfigError::Invalid {
                key: "LOG_FORMAT",
                value: v.clone(),
                reason: e.to_string(),
            })?,
            None => LogFormat::default(),
        };

        let interval = match get("PUBLICATION_INTERVAL_SECS") {
            Some(v) => parse_secs("PUBLICATION_INTERVAL_SECS", &v)?,
            None => DEFAULT_PUBLICATION_INTERVAL,
        };
        if interval.is_zero() {
            return Err(ConfigError::Invalid {
                key: "PUBLICATION_INTERVAL_SECS",
                value: "0".to_string(),
                reason: "interval must be positive".to_string(),
            });
        }

        let initial_delay = match get("PUBLICATION_INITIAL_DELAY_SECS") {
            Some(v) => parse_secs("PUBLICATION_INITIAL_DELAY_SECS", &v)?,
            None => Duration::ZERO,
        };

        let publication = PublicationConfig {
            interval,
            initial_delay,
            fallback_counterparty_label: get("PUBLICATION_FALLBACK_COUNTERPARTY_LABEL")
                .unwrap_or_else(|| DEFAULT_FALLBACK_COUNTERPARTY_LABEL.to_string()),
        };

        let elector = match get("ELECTOR_PATH") {
            None => ElectorConfig::Local,
            Some(path) => {
                let instance_name = get("ELECTOR_INSTANCE_NAME")
                    .or_else(|| get("HOSTNAME"))
                    .ok_or(ConfigError::Missing("HOSTNAME"))?;
                ElectorConfig::Http {
                    url: with_http_scheme(&path),
                    instance_name,
                }
            }
        };

        let timeout = match get("HTTP_TIMEOUT_SECS") {
            Some(v) => parse_secs("HTTP_TIMEOUT_SECS", &v)?,
            None => DEFAULT_HTTP_TIMEOUT,
        };

        let http = HttpClientConfig {
            timeout,
            pdfgen_url: required("PDFGEN_URL")?,
            archive_url: required("ARCHIVE_URL")?,
            archive_token: get("ARCHIVE_TOKEN"),
            person_url: get("PERSON_URL"),
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            log_format,
            publication,
            elector,
            http,
        })
    }
}

fn parse_secs(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    value
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// The election sidecar path is usually given as `host:port`.
fn with_http_scheme(path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else {
        format!("http://{path}")
    }
}
