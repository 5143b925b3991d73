//! Configuration for the tollgate daemon.
//!
//! TOML file + `TOLLGATE_`-prefixed environment variables, merged via
//! figment (env wins), then validated and translated into
//! `tollgate_core::ServiceConfig` plus the transport connection values.
//! The bot token never appears in debug output -- it is handed out as a
//! `SecretString` only.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tollgate_core::{AdminId, DestinationId, ServiceConfig};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no bot token configured (set `token` in the config file or TOLLGATE_TOKEN)")]
    NoToken,

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level configuration for the daemon.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Bot API token. Prefer `TOLLGATE_TOKEN` over the file.
    #[serde(default)]
    pub token: Option<String>,

    /// Bot API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default)]
    pub service: ServiceSection,

    #[serde(default)]
    pub admins: AdminsSection,

    /// Destinations to register at startup.
    #[serde(default)]
    pub destinations: Vec<DestinationSeed>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: None,
            api_url: default_api_url(),
            service: ServiceSection::default(),
            admins: AdminsSection::default(),
            destinations: Vec::new(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.telegram.org".into()
}

/// Policy tuning, mirroring `ServiceConfig` in file-friendly units.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceSection {
    pub subscription_days: i64,
    pub invite_ttl_hours: u64,
    pub remind_days: i64,
    pub warning_cooldown_minutes: u64,
    pub admin_warn_days: i64,
    pub admin_warn_interval_hours: u64,
    pub reconcile_interval_secs: u64,
    pub reconcile_initial_delay_secs: u64,
    pub max_outbound_in_flight: usize,
    pub not_paid_threshold: u32,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            subscription_days: 30,
            invite_ttl_hours: 24,
            remind_days: 3,
            warning_cooldown_minutes: 60,
            admin_warn_days: 2,
            admin_warn_interval_hours: 24,
            reconcile_interval_secs: 60,
            reconcile_initial_delay_secs: 5,
            max_outbound_in_flight: 8,
            not_paid_threshold: 3,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct AdminsSection {
    /// Static super-admin allow-list (platform user ids).
    #[serde(rename = "super", default)]
    pub super_admins: Vec<i64>,
}

/// One destination to register at startup.
#[derive(Debug, Deserialize, Serialize)]
pub struct DestinationSeed {
    pub id: i64,
}

// ── Loading ─────────────────────────────────────────────────────────

impl Config {
    /// Load from an explicit file path (if any), the default location,
    /// and the environment, in ascending priority.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        let file = path.map_or_else(default_config_path, Path::to_path_buf);
        figment = figment.merge(Toml::file(file));
        figment = figment.merge(Env::prefixed("TOLLGATE_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.service.subscription_days <= 0 {
            return Err(ConfigError::Validation {
                field: "service.subscription_days".into(),
                reason: "must be positive".into(),
            });
        }
        if self.service.invite_ttl_hours == 0 {
            return Err(ConfigError::Validation {
                field: "service.invite_ttl_hours".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.service.not_paid_threshold == 0 {
            return Err(ConfigError::Validation {
                field: "service.not_paid_threshold".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.service.reconcile_interval_secs == 0 {
            return Err(ConfigError::Validation {
                field: "service.reconcile_interval_secs".into(),
                reason: "must be at least 1".into(),
            });
        }
        if url::Url::parse(&self.api_url).is_err() {
            return Err(ConfigError::Validation {
                field: "api_url".into(),
                reason: format!("not a valid URL: {}", self.api_url),
            });
        }
        Ok(())
    }

    /// The bot token as a secret, or an error if none is configured.
    pub fn token(&self) -> Result<SecretString, ConfigError> {
        self.token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(SecretString::from)
            .ok_or(ConfigError::NoToken)
    }

    /// Parsed API base URL. Only valid after [`Config::load`] succeeded.
    pub fn api_url(&self) -> Result<url::Url, ConfigError> {
        url::Url::parse(&self.api_url).map_err(|e| ConfigError::Validation {
            field: "api_url".into(),
            reason: e.to_string(),
        })
    }

    /// Destination ids to register at startup.
    pub fn destination_ids(&self) -> Vec<DestinationId> {
        self.destinations
            .iter()
            .map(|d| DestinationId::new(d.id))
            .collect()
    }

    /// Translate into the core's runtime policy config.
    pub fn service_config(&self) -> ServiceConfig {
        let s = &self.service;
        ServiceConfig {
            subscription_days: s.subscription_days,
            invite_ttl: Duration::from_secs(s.invite_ttl_hours * 3600),
            remind_days: s.remind_days,
            warning_cooldown: Duration::from_secs(s.warning_cooldown_minutes * 60),
            admin_warn_days: s.admin_warn_days,
            admin_warn_interval: Duration::from_secs(s.admin_warn_interval_hours * 3600),
            reconcile_interval: Duration::from_secs(s.reconcile_interval_secs),
            reconcile_initial_delay: Duration::from_secs(s.reconcile_initial_delay_secs),
            max_outbound_in_flight: s.max_outbound_in_flight,
            not_paid_threshold: s.not_paid_threshold,
            super_admins: self
                .admins
                .super_admins
                .iter()
                .map(|&id| AdminId::new(id))
                .collect(),
        }
    }
}

/// `~/.config/tollgate/tollgate.toml` (platform-appropriate).
pub fn default_config_path() -> PathBuf {
    ProjectDirs::from("", "", "tollgate")
        .map_or_else(|| PathBuf::from("tollgate.toml"), |dirs| {
            dirs.config_dir().join("tollgate.toml")
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_apply_without_a_file() {
        let file = write_config("token = \"t0ken\"\n");
        let config = Config::load(Some(file.path())).unwrap();

        assert_eq!(config.service.subscription_days, 30);
        assert_eq!(config.service.invite_ttl_hours, 24);
        assert_eq!(config.api_url, "https://api.telegram.org");
        assert!(config.destinations.is_empty());
    }

    #[test]
    fn file_values_override_defaults() {
        let file = write_config(
            r#"
token = "t0ken"

[service]
subscription_days = 60
invite_ttl_hours = 1
remind_days = 7

[admins]
super = [111, 222]

[[destinations]]
id = -1001

[[destinations]]
id = -1002
"#,
        );
        let config = Config::load(Some(file.path())).unwrap();

        let service = config.service_config();
        assert_eq!(service.subscription_days, 60);
        assert_eq!(service.invite_ttl, Duration::from_secs(3600));
        assert_eq!(service.remind_days, 7);
        assert_eq!(
            service.super_admins,
            vec![AdminId::new(111), AdminId::new(222)]
        );
        assert_eq!(config.destination_ids().len(), 2);
    }

    #[test]
    fn zero_subscription_days_is_rejected() {
        let file = write_config("token = \"t\"\n[service]\nsubscription_days = 0\n");
        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { field, .. } if field.contains("subscription_days")));
    }

    #[test]
    fn bad_api_url_is_rejected() {
        let file = write_config("token = \"t\"\napi_url = \"not a url\"\n");
        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { field, .. } if field == "api_url"));
    }

    #[test]
    fn missing_token_is_a_dedicated_error() {
        let file = write_config("api_url = \"https://example.org\"\n");
        let config = Config::load(Some(file.path())).unwrap();
        assert!(matches!(config.token(), Err(ConfigError::NoToken)));
    }
}
