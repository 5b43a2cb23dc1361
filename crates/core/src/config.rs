//! Application configuration.
//!
//! Values are layered: built-in defaults, then the TOML file under the user
//! config directory, then `TRANSPORT_INPUTS_*` environment variables, then the
//! plain `API_URL` / `API_TOKEN` variables understood by existing deployments.

use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat, Map};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Backend used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
/// Directory under the user config dir holding `config.toml`.
pub const CONFIG_DIR: &str = "transport-inputs";
const CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "TRANSPORT_INPUTS";
const DEFAULT_RUN_TIMEOUT_SECS: i64 = 30;
const DEFAULT_PROBE_TIMEOUT_SECS: i64 = 15;

const DEFAULT_CONFIG: &str = r#"# Transport inputs client configuration.

# Base URL of the model backend.
api_url = "http://127.0.0.1:8000"

# Bearer token sent with /v1/run. Leave unset to omit the Authorization header.
# api_token = ""

# Timeout for POST /v1/run, in seconds.
run_timeout_secs = 30

# Timeout for the connectivity probes, in seconds.
probe_timeout_secs = 15
"#;

/// Resolved configuration for the backend client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the backend, without a trailing path.
    pub api_url: String,
    /// Optional bearer token.
    #[serde(default)]
    pub api_token: Option<String>,
    /// Timeout for model runs, in seconds.
    pub run_timeout_secs: u64,
    /// Timeout for probe requests, in seconds.
    pub probe_timeout_secs: u64,
}

/// Environment variables feeding the configuration, captured up front.
///
/// `prefixed` holds the `TRANSPORT_INPUTS_*` variables; `api_url` and
/// `api_token` are the plain `API_URL` / `API_TOKEN` variables, which take
/// precedence over everything else.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    /// `TRANSPORT_INPUTS_*` variables, keyed by their full name.
    pub prefixed: Map<String, String>,
    /// Value of `API_URL`.
    pub api_url: Option<String>,
    /// Value of `API_TOKEN`.
    pub api_token: Option<String>,
}

impl EnvOverrides {
    /// Capture the relevant variables of the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(env::vars())
    }

    /// Pick the relevant variables out of `vars`.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let prefix = format!("{ENV_PREFIX}_");
        let mut overrides = Self::default();
        for (key, value) in vars {
            let (key, value) = (key.into(), value.into());
            match key.as_str() {
                "API_URL" => overrides.api_url = Some(value).filter(|value| !value.is_empty()),
                "API_TOKEN" => overrides.api_token = Some(value),
                _ if key.starts_with(&prefix) => {
                    overrides.prefixed.insert(key, value);
                }
                _ => {}
            }
        }
        overrides
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            run_timeout_secs: DEFAULT_RUN_TIMEOUT_SECS as u64,
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS as u64,
        }
    }
}

impl AppConfig {
    /// Load from the default config file and the process environment.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path(), &EnvOverrides::from_env())
    }

    /// Load from an explicit file (which may be absent) and captured variables.
    pub fn load_from(path: &Path, overrides: &EnvOverrides) -> Result<Self> {
        let settings = Config::builder()
            .set_default("api_url", DEFAULT_API_URL)?
            .set_default("run_timeout_secs", DEFAULT_RUN_TIMEOUT_SECS)?
            .set_default("probe_timeout_secs", DEFAULT_PROBE_TIMEOUT_SECS)?
            .add_source(
                File::from(path.to_path_buf())
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(Environment::with_prefix(ENV_PREFIX).source(Some(overrides.prefixed.clone())))
            .set_override_option("api_url", overrides.api_url.clone())?
            .set_override_option("api_token", overrides.api_token.clone())?
            .build()
            .with_context(|| format!("failed to read configuration from {}", path.display()))?;

        let mut config: AppConfig = settings
            .try_deserialize()
            .context("failed to parse configuration")?;
        config.api_url = config.api_url.trim().trim_end_matches('/').to_string();
        if config.api_url.is_empty() {
            anyhow::bail!("api_url must not be empty");
        }
        Ok(config)
    }

    /// Token to send, if one is configured and non-empty.
    pub fn token(&self) -> Option<&str> {
        self.api_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }

    /// Timeout applied to model runs.
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    /// Timeout applied to probe requests.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

/// Default location of the configuration file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join(CONFIG_FILE)
}

/// Write a commented default configuration file if none exists yet.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = config_path();
    write_default_config(&path)?;
    Ok(path)
}

fn write_default_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "wrote default configuration");
    Ok(true)
}
