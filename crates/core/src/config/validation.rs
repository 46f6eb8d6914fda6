//! Post-load checks for [`AppConfig`].

use std::ops::RangeInclusive;

use crate::config::AppConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

const MAX_BYTES: RangeInclusive<usize> = 1..=50 * 1024 * 1024;
const TIMEOUT_MS: RangeInclusive<u64> = 100..=300_000;

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

fn within<T>(field: &str, value: T, range: RangeInclusive<T>) -> Result<(), ConfigError>
where
    T: PartialOrd + std::fmt::Display,
{
    if range.contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, format!("{value} is outside {}..={}", range.start(), range.end())))
    }
}

/// Header names are RFC 9110 tokens.
fn is_header_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c))
}

impl AppConfig {
    /// # Errors
    ///
    /// `ConfigError::Missing` for an empty `db_path`, otherwise
    /// `ConfigError::Invalid` naming the first out-of-range field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Missing {
                field: "db_path".into(),
                hint: "set APPSHIFT_DB_PATH or db_path in the config file".into(),
            });
        }

        within("max_bytes", self.max_bytes, MAX_BYTES)?;
        within("timeout_ms", self.timeout_ms, TIMEOUT_MS)?;

        if self.user_agent.trim().is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }
        if !is_header_name(&self.marker_header) {
            return Err(invalid("marker_header", "must be a valid HTTP header name"));
        }

        Ok(())
    }
}
