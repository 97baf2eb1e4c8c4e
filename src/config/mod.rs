//! Configuration module for the journal query service.
//!
//! All configuration is loaded from `JQ_*` environment variables with sensible
//! defaults. A `.env` file is honoured when present.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::collab::{CallSettings, FailurePolicy};
use crate::models::Locale;
use crate::query::{QuerySettings, ResolutionPolicy};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(var: &'static str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Locale used when a request does not name one
    pub default_locale: Locale,
    /// Locales the locale service resolves against
    pub available_locales: Vec<Locale>,
    /// Upper bound for a single collaborator call
    pub collaborator_timeout: Duration,
    /// Extra attempts after a collaborator reports itself unavailable
    pub collaborator_retries: u32,
    pub failure_policy: FailurePolicy,
    pub version_policy: ResolutionPolicy,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let db_path = var("JQ_DB_PATH", "./data/journal.sqlite").into();

        let raw = var("JQ_BIND_ADDR", "127.0.0.1:8080");
        let bind_addr: SocketAddr = raw
            .parse()
            .map_err(|e: std::net::AddrParseError| {
                ConfigError::invalid("JQ_BIND_ADDR", &raw, e.to_string())
            })?;

        let log_level = var("JQ_LOG_LEVEL", "info");

        let raw = var("JQ_DEFAULT_LOCALE", "en_US");
        let default_locale = Locale::parse(&raw)
            .ok_or_else(|| ConfigError::invalid("JQ_DEFAULT_LOCALE", &raw, "not a locale"))?;

        let raw = var("JQ_AVAILABLE_LOCALES", "");
        let mut available_locales = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                Locale::parse(s).ok_or_else(|| {
                    ConfigError::invalid("JQ_AVAILABLE_LOCALES", s, "not a locale")
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if !available_locales.contains(&default_locale) {
            available_locales.insert(0, default_locale.clone());
        }

        let raw = var("JQ_COLLABORATOR_TIMEOUT_MS", "5000");
        let timeout_ms: u64 = raw.parse().map_err(|e: std::num::ParseIntError| {
            ConfigError::invalid("JQ_COLLABORATOR_TIMEOUT_MS", &raw, e.to_string())
        })?;
        if timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "JQ_COLLABORATOR_TIMEOUT_MS",
                &raw,
                "must be positive",
            ));
        }

        let raw = var("JQ_COLLABORATOR_RETRIES", "0");
        let collaborator_retries: u32 = raw.parse().map_err(|e: std::num::ParseIntError| {
            ConfigError::invalid("JQ_COLLABORATOR_RETRIES", &raw, e.to_string())
        })?;

        let raw = var("JQ_ON_COLLABORATOR_FAILURE", "degrade");
        let failure_policy = FailurePolicy::parse(&raw).ok_or_else(|| {
            ConfigError::invalid("JQ_ON_COLLABORATOR_FAILURE", &raw, "expected degrade or fail")
        })?;

        let raw = var("JQ_VERSION_POLICY", "first-eligible");
        let version_policy = ResolutionPolicy::parse(&raw).ok_or_else(|| {
            ConfigError::invalid(
                "JQ_VERSION_POLICY",
                &raw,
                "expected first-eligible or highest-version",
            )
        })?;

        Ok(Self {
            db_path,
            bind_addr,
            log_level,
            default_locale,
            available_locales,
            collaborator_timeout: Duration::from_millis(timeout_ms),
            collaborator_retries,
            failure_policy,
            version_policy,
        })
    }

    pub fn query_settings(&self) -> QuerySettings {
        QuerySettings {
            calls: CallSettings {
                timeout: self.collaborator_timeout,
                retries: self.collaborator_retries,
                failure_policy: self.failure_policy,
            },
            resolution: self.version_policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.db_path, PathBuf::from("./data/journal.sqlite"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.default_locale.language_id(), "en_US");
        assert_eq!(config.available_locales, vec![config.default_locale.clone()]);
        assert_eq!(config.collaborator_timeout, Duration::from_secs(5));
        assert_eq!(config.collaborator_retries, 0);
        assert_eq!(config.failure_policy, FailurePolicy::Degrade);
        assert_eq!(config.version_policy, ResolutionPolicy::FirstEligible);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("JQ_DEFAULT_LOCALE", "ru-RU"),
            ("JQ_AVAILABLE_LOCALES", "en_US, ru_RU"),
            ("JQ_COLLABORATOR_TIMEOUT_MS", "250"),
            ("JQ_COLLABORATOR_RETRIES", "2"),
            ("JQ_ON_COLLABORATOR_FAILURE", "fail"),
            ("JQ_VERSION_POLICY", "highest-version"),
        ])
        .unwrap();

        let ids: Vec<String> = config.available_locales.iter().map(|l| l.language_id()).collect();
        assert_eq!(ids, vec!["en_US", "ru_RU"]);

        let settings = config.query_settings();
        assert_eq!(settings.calls.timeout, Duration::from_millis(250));
        assert_eq!(settings.calls.retries, 2);
        assert_eq!(settings.calls.failure_policy, FailurePolicy::Fail);
        assert_eq!(settings.resolution, ResolutionPolicy::HighestVersion);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            config_from(&[("JQ_BIND_ADDR", "nowhere")]),
            Err(ConfigError::Invalid { var: "JQ_BIND_ADDR", .. })
        ));
        assert!(config_from(&[("JQ_COLLABORATOR_TIMEOUT_MS", "0")]).is_err());
        assert!(config_from(&[("JQ_ON_COLLABORATOR_FAILURE", "ignore")]).is_err());
        assert!(config_from(&[("JQ_DEFAULT_LOCALE", "??")]).is_err());
    }
}
