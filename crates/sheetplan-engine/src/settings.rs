//! Runtime settings
//!
//! Read once from the environment (a `.env` file is honoured if present)
//! through a lookup function, so tests never touch the process environment.

use crate::queue::DEFAULT_QUEUE_RANGE;
use sheetplan_sheets::RetryPolicy;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("CONFIG/{0} is required")]
    Missing(&'static str),

    #[error("CONFIG/{var}='{value}' is invalid: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// A value that must never end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerBackend {
    Memory,
    Postgres { database_url: Secret },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    pub api_key: Secret,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SheetsSettings {
    pub token: Secret,
    pub base_url: String,
    pub cache_ttl: Duration,
    pub cache_max_entries: usize,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSettings {
    pub spreadsheet_id: String,
    pub range: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub addr: SocketAddr,
    pub api_key: Secret,
    pub template_dir: PathBuf,
    pub llm: LlmSettings,
    pub sheets: SheetsSettings,
    pub ledger: LedgerBackend,
    /// Queue endpoint is disabled without a control spreadsheet
    pub queue: Option<QueueSettings>,
    pub request_timeout: Duration,
    pub log_format: LogFormat,
}

struct Env<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn optional(&self, var: &'static str) -> Option<String> {
        (self.lookup)(var)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, var: &'static str) -> Result<String, ConfigError> {
        self.optional(var).ok_or(ConfigError::Missing(var))
    }

    fn or(&self, var: &'static str, default: &str) -> String {
        self.optional(var).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(&self, var: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.optional(var) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
                var,
                reason: e.to_string(),
                value,
            }),
        }
    }

    fn seconds(&self, var: &'static str, default: f64) -> Result<Duration, ConfigError> {
        let secs: f64 = self.parsed(var, default)?;
        Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::Invalid {
            var,
            value: secs.to_string(),
            reason: "must be a non-negative number of seconds".to_string(),
        })
    }

    fn backoff_factor(&self, var: &'static str, default: f32) -> Result<f32, ConfigError> {
        let factor: f32 = self.parsed(var, default)?;
        if !factor.is_finite() || factor < 1.0 {
            return Err(ConfigError::Invalid {
                var,
                value: factor.to_string(),
                reason: "must be a number >= 1".to_string(),
            });
        }
        Ok(factor)
    }
}

impl Settings {
    /// Load `.env` (if any) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is normal in production.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env { lookup };

        let retry = RetryPolicy::default()
            .with_max_attempts(env.parsed("SHEETPLAN_RETRY_MAX_ATTEMPTS", 5u32)?)
            .with_wait_bounds(
                env.seconds("SHEETPLAN_RETRY_MIN_WAIT_SECS", 1.0)?,
                env.seconds("SHEETPLAN_RETRY_MAX_WAIT_SECS", 20.0)?,
            )
            .with_factor(env.backoff_factor("SHEETPLAN_RETRY_FACTOR", 2.0)?);

        let ledger = match env.or("SHEETPLAN_IDEMPOTENCY_BACKEND", "memory").to_ascii_lowercase().as_str() {
            "memory" => LedgerBackend::Memory,
            "postgres" => LedgerBackend::Postgres {
                database_url: Secret::new(env.required("DATABASE_URL")?),
            },
            other => {
                return Err(ConfigError::Invalid {
                    var: "SHEETPLAN_IDEMPOTENCY_BACKEND",
                    value: other.to_string(),
                    reason: "expected 'memory' or 'postgres'".to_string(),
                })
            }
        };

        let log_format = match env.or("SHEETPLAN_LOG_FORMAT", "pretty").to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            other => {
                return Err(ConfigError::Invalid {
                    var: "SHEETPLAN_LOG_FORMAT",
                    value: other.to_string(),
                    reason: "expected 'pretty' or 'json'".to_string(),
                })
            }
        };

        Ok(Settings {
            addr: env.parsed("SHEETPLAN_ADDR", SocketAddr::from(([0, 0, 0, 0], 8787)))?,
            api_key: Secret::new(env.required("SHEETPLAN_API_KEY")?),
            template_dir: PathBuf::from(env.or("SHEETPLAN_TEMPLATE_DIR", "templates")),
            llm: LlmSettings {
                api_key: Secret::new(env.required("SHEETPLAN_LLM_API_KEY")?),
                model: env.or("SHEETPLAN_LLM_MODEL", "gpt-4o-mini"),
                base_url: env.or("SHEETPLAN_LLM_BASE_URL", "https://api.openai.com/v1"),
            },
            sheets: SheetsSettings {
                token: Secret::new(env.required("SHEETPLAN_SHEETS_TOKEN")?),
                base_url: env.or("SHEETPLAN_SHEETS_BASE_URL", "https://sheets.googleapis.com/v4"),
                cache_ttl: env.seconds("SHEETPLAN_CACHE_TTL_SECS", 300.0)?,
                cache_max_entries: env.parsed("SHEETPLAN_CACHE_MAX_ENTRIES", 256usize)?,
                retry,
            },
            ledger,
            queue: env
                .optional("SHEETPLAN_QUEUE_SPREADSHEET_ID")
                .map(|spreadsheet_id| QueueSettings {
                    spreadsheet_id,
                    range: env.or("SHEETPLAN_QUEUE_RANGE", DEFAULT_QUEUE_RANGE),
                }),
            request_timeout: env.seconds("SHEETPLAN_REQUEST_TIMEOUT_SECS", 120.0)?,
            log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let mut vars: HashMap<String, String> = [
            ("SHEETPLAN_API_KEY", "server-secret"),
            ("SHEETPLAN_LLM_API_KEY", "sk-test"),
            ("SHEETPLAN_SHEETS_TOKEN", "ya29.test"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (k, v) in pairs {
            vars.insert(k.to_string(), v.to_string());
        }
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.addr.to_string(), "0.0.0.0:8787");
        assert_eq!(settings.template_dir, PathBuf::from("templates"));
        assert_eq!(settings.llm.model, "gpt-4o-mini");
        assert_eq!(settings.sheets.cache_ttl, Duration::from_secs(300));
        assert_eq!(settings.sheets.cache_max_entries, 256);
        assert_eq!(settings.sheets.retry.max_attempts, 5);
        assert_eq!(settings.sheets.retry.max_wait, Duration::from_secs(20));
        assert_eq!(settings.sheets.retry.factor, 2.0);
        assert_eq!(settings.ledger, LedgerBackend::Memory);
        assert_eq!(settings.queue, None);
        assert_eq!(settings.request_timeout, Duration::from_secs(120));
        assert_eq!(settings.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_missing_required() {
        let err = Settings::from_lookup(|_| None).unwrap_err();
        assert_eq!(err, ConfigError::Missing("SHEETPLAN_API_KEY"));

        let blank = Settings::from_lookup(lookup(&[("SHEETPLAN_LLM_API_KEY", "  ")])).unwrap_err();
        assert_eq!(blank, ConfigError::Missing("SHEETPLAN_LLM_API_KEY"));
    }

    #[test]
    fn test_invalid_numbers() {
        let err = Settings::from_lookup(lookup(&[("SHEETPLAN_CACHE_TTL_SECS", "five")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "SHEETPLAN_CACHE_TTL_SECS", .. }));

        let negative =
            Settings::from_lookup(lookup(&[("SHEETPLAN_REQUEST_TIMEOUT_SECS", "-1")])).unwrap_err();
        assert!(matches!(negative, ConfigError::Invalid { .. }));

        assert!(Settings::from_lookup(lookup(&[("SHEETPLAN_ADDR", "nowhere")])).is_err());
    }

    #[test]
    fn test_oversized_duration_is_invalid_not_a_panic() {
        let err = Settings::from_lookup(lookup(&[("SHEETPLAN_CACHE_TTL_SECS", "1e20")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "SHEETPLAN_CACHE_TTL_SECS", .. }));

        let inf = Settings::from_lookup(lookup(&[("SHEETPLAN_RETRY_MAX_WAIT_SECS", "inf")])).unwrap_err();
        assert!(matches!(inf, ConfigError::Invalid { var: "SHEETPLAN_RETRY_MAX_WAIT_SECS", .. }));
    }

    #[test]
    fn test_unknown_log_format_is_rejected() {
        let err = Settings::from_lookup(lookup(&[("SHEETPLAN_LOG_FORMAT", "jsno")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                var: "SHEETPLAN_LOG_FORMAT",
                value: "jsno".to_string(),
                reason: "expected 'pretty' or 'json'".to_string(),
            }
        );
    }

    #[test]
    fn test_retry_settings() {
        let settings = Settings::from_lookup(lookup(&[
            ("SHEETPLAN_RETRY_MAX_ATTEMPTS", "3"),
            ("SHEETPLAN_RETRY_FACTOR", "3"),
        ]))
        .unwrap();
        assert_eq!(settings.sheets.retry.max_attempts, 3);
        assert_eq!(settings.sheets.retry.factor, 3.0);

        let shrinking = Settings::from_lookup(lookup(&[("SHEETPLAN_RETRY_FACTOR", "0.5")])).unwrap_err();
        assert!(matches!(shrinking, ConfigError::Invalid { var: "SHEETPLAN_RETRY_FACTOR", .. }));
    }

    #[test]
    fn test_queue_and_postgres() {
        let settings = Settings::from_lookup(lookup(&[
            ("SHEETPLAN_QUEUE_SPREADSHEET_ID", "ctl-sheet"),
            ("SHEETPLAN_IDEMPOTENCY_BACKEND", "postgres"),
            ("DATABASE_URL", "postgres://localhost/sheetplan"),
            ("SHEETPLAN_LOG_FORMAT", "JSON"),
        ]))
        .unwrap();
        let queue = settings.queue.unwrap();
        assert_eq!(queue.spreadsheet_id, "ctl-sheet");
        assert_eq!(queue.range, "Queue!A2:F");
        assert!(matches!(settings.ledger, LedgerBackend::Postgres { .. }));
        assert_eq!(settings.log_format, LogFormat::Json);

        let no_url = Settings::from_lookup(lookup(&[("SHEETPLAN_IDEMPOTENCY_BACKEND", "postgres")]));
        assert_eq!(no_url.unwrap_err(), ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn test_secrets_are_redacted() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("server-secret"));
        assert!(!debug.contains("sk-test"));
        assert_eq!(settings.api_key.expose(), "server-secret");
    }
}
