//! Layered configuration for the migration tool.
//!
//! Sources, lowest to highest precedence: built-in defaults, a TOML file, then
//! `APPSHIFT_*` environment variables. The TOML file is either passed
//! explicitly or named by `APPSHIFT_CONFIG_FILE`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

const ENV_PREFIX: &str = "APPSHIFT_";
const CONFIG_FILE_VAR: &str = "APPSHIFT_CONFIG_FILE";

/// Settings shared by the store, the fetch layer and the migration engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite file holding manifest history, page associations and cache
    /// generations (`APPSHIFT_DB_PATH`).
    pub db_path: PathBuf,

    /// `APPSHIFT_USER_AGENT`
    pub user_agent: String,

    /// Per-response body cap (`APPSHIFT_MAX_BYTES`).
    pub max_bytes: usize,

    /// Per-request timeout (`APPSHIFT_TIMEOUT_MS`).
    pub timeout_ms: u64,

    /// Header set to `true` on every migration request so intermediaries can
    /// tell them apart from navigations (`APPSHIFT_MARKER_HEADER`).
    pub marker_header: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./appshift-store.sqlite"),
            user_agent: concat!("appshift/", env!("CARGO_PKG_VERSION")).into(),
            max_bytes: 5 * 1024 * 1024,
            timeout_ms: 20_000,
            marker_header: "X-Use-Fetch".into(),
        }
    }
}

impl AppConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load from defaults, `APPSHIFT_CONFIG_FILE` (when set) and the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::LoadFailed` when a source cannot be read or
    /// deserialized, or the first validation failure.
    pub fn load() -> Result<Self, ConfigError> {
        let file = std::env::var_os(CONFIG_FILE_VAR).map(PathBuf::from);
        Self::load_from(file.as_deref())
    }

    /// Like [`AppConfig::load`], with an explicit TOML file taking the place
    /// of `APPSHIFT_CONFIG_FILE`.
    pub fn load_from(file: Option<&Path>) -> Result<Self, ConfigError> {
        let config: Self = Self::figment(file)
            .extract()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;
        config.validate()?;
        tracing::debug!(db_path = %config.db_path.display(), file = ?file, "configuration loaded");
        Ok(config)
    }

    fn figment(file: Option<&Path>) -> Figment {
        let base = Figment::from(Serialized::defaults(Self::default()));
        let base = match file {
            Some(path) => base.merge(Toml::file(path)),
            None => base,
        };
        base.merge(Env::prefixed(ENV_PREFIX).map(|key| key.as_str().to_lowercase().into()))
    }
}
