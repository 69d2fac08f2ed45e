//! Shared configuration for the `topo` binary.
//!
//! TOML environment profiles, credential resolution (env + keyring +
//! plaintext), and translation to `topo_core::EnvironmentConfig` and
//! `topo_core::DownloadSettings`. Core never reads these types; it only
//! receives what this crate builds.

use std::collections::HashMap;
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

use topo_core::{DownloadSettings, EnvironmentConfig, ListEntitiesOptions, TlsVerification};

/// Keyring service name; entries are keyed `<environment>/api-token`.
pub const KEYRING_SERVICE: &str = "topo";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no API token configured for environment '{environment}'")]
    NoCredentials { environment: String },

    #[error("environment '{name}' not found in configuration")]
    UnknownEnvironment { name: String, available: Vec<String> },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Environment used when `--env` is not given.
    pub default_environment: Option<String>,

    /// Download defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named environment profiles.
    #[serde(default)]
    pub environments: HashMap<String, Environment>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_time_from_minutes")]
    pub time_from_minutes: i64,

    #[serde(default)]
    pub time_to_minutes: i64,

    #[serde(default = "default_entity_page_size")]
    pub entity_page_size: i64,

    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    /// Pause before re-fetching a type after a field rejection, in ms.
    #[serde(default = "default_field_retry_delay_ms")]
    pub field_retry_delay_ms: u64,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_output_folder")]
    pub output_folder: PathBuf,

    #[serde(default = "default_project")]
    pub project: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            time_from_minutes: default_time_from_minutes(),
            time_to_minutes: 0,
            entity_page_size: default_entity_page_size(),
            concurrent_requests: default_concurrent_requests(),
            field_retry_delay_ms: default_field_retry_delay_ms(),
            timeout: default_timeout(),
            output_folder: default_output_folder(),
            project: default_project(),
        }
    }
}

fn default_time_from_minutes() -> i64 {
    7 * 24 * 60
}
fn default_entity_page_size() -> i64 {
    500
}
fn default_concurrent_requests() -> usize {
    5
}
fn default_field_retry_delay_ms() -> u64 {
    1000
}
fn default_timeout() -> u64 {
    60
}
fn default_output_folder() -> PathBuf {
    PathBuf::from("download")
}
fn default_project() -> String {
    "project".into()
}

/// A named environment profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Environment {
    /// Environment base URL (e.g., "https://abc12345.live.example.com").
    pub url: String,

    /// API token (plaintext; prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable name containing the API token.
    pub token_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Accept invalid TLS certificates.
    pub insecure: Option<bool>,

    /// Override timeout.
    pub timeout: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "topo", "topo").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("topo");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from `path` + environment.
///
/// A missing file is not an error; `TOPO_`-prefixed variables use `__`
/// as the nesting separator (`TOPO_DEFAULTS__TIMEOUT=30`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("TOPO_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Environment selection ───────────────────────────────────────────

impl Config {
    /// Look up an environment by name, falling back to `default_environment`.
    pub fn environment(&self, name: Option<&str>) -> Result<(&str, &Environment), ConfigError> {
        let name = name
            .or(self.default_environment.as_deref())
            .unwrap_or("default");

        self.environments
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| {
                let mut available: Vec<String> = self.environments.keys().cloned().collect();
                available.sort();
                ConfigError::UnknownEnvironment {
                    name: name.into(),
                    available,
                }
            })
    }
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve an API token from the credential chain.
pub fn resolve_token(env: &Environment, env_name: &str) -> Result<SecretString, ConfigError> {
    resolve_token_with(
        env,
        env_name,
        |var| std::env::var(var).ok(),
        keyring_token,
    )
}

fn keyring_token(env_name: &str) -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{env_name}/api-token"))
        .ok()?
        .get_password()
        .ok()
}

fn resolve_token_with(
    env: &Environment,
    env_name: &str,
    lookup_var: impl Fn(&str) -> Option<String>,
    lookup_keyring: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    // 1. Profile's token_env → env var lookup
    if let Some(val) = env.token_env.as_deref().and_then(&lookup_var) {
        return Ok(SecretString::from(val));
    }

    // 2. System keyring
    if let Some(secret) = lookup_keyring(env_name) {
        return Ok(SecretString::from(secret));
    }

    // 3. Plaintext in config
    if let Some(ref token) = env.token {
        return Ok(SecretString::from(token.clone()));
    }

    Err(ConfigError::NoCredentials {
        environment: env_name.into(),
    })
}

// ── Translation to core types ───────────────────────────────────────

/// Parse and validate an environment URL.
pub fn parse_url(raw: &str) -> Result<url::Url, ConfigError> {
    let url: url::Url = raw.parse().map_err(|_| ConfigError::Validation {
        field: "url".into(),
        reason: format!("invalid URL: {raw}"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "url".into(),
            reason: format!("expected http or https, got '{}'", url.scheme()),
        });
    }
    Ok(url)
}

/// Build an `EnvironmentConfig` from a profile.
pub fn environment_to_config(
    env: &Environment,
    env_name: &str,
    defaults: &Defaults,
) -> Result<EnvironmentConfig, ConfigError> {
    let url = parse_url(&env.url)?;
    let token = resolve_token(env, env_name)?;

    let tls = if env.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = env.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    Ok(EnvironmentConfig {
        url,
        token,
        tls,
        timeout: Duration::from_secs(env.timeout.unwrap_or(defaults.timeout)),
    })
}

impl Defaults {
    /// Download settings from the configured defaults.
    pub fn download_settings(&self) -> DownloadSettings {
        DownloadSettings {
            list: ListEntitiesOptions {
                time_from_minutes: self.time_from_minutes,
                time_to_minutes: self.time_to_minutes,
                entity_page_size: self.entity_page_size,
            },
            concurrent_requests: self.concurrent_requests,
            field_retry_delay: Duration::from_millis(self.field_retry_delay_ms),
            project_name: self.project.clone(),
        }
    }
}
