//! Engine configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Environment variable holding the lock wait bound in milliseconds
pub const LOCK_TIMEOUT_ENV: &str = "BANKING_LOCK_TIMEOUT_MS";
/// Environment variable holding the account number allocation bound
pub const ACCOUNT_NUMBER_ATTEMPTS_ENV: &str = "BANKING_ACCOUNT_NUMBER_ATTEMPTS";

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_ACCOUNT_NUMBER_ATTEMPTS: u32 = 32;

/// Tunables shared by the account store, ledger engine and workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Longest time an operation waits for an account or application lock
    #[serde(with = "millis")]
    pub lock_timeout: Duration,
    /// How many random account numbers are tried before giving up
    pub max_account_number_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            max_account_number_attempts: DEFAULT_ACCOUNT_NUMBER_ATTEMPTS,
        }
    }
}

impl EngineConfig {
    /// Set the lock wait bound
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// Set the account number allocation bound
    pub fn with_max_account_number_attempts(mut self, attempts: u32) -> Self {
        self.max_account_number_attempts = attempts;
        self
    }

    /// Build a configuration from the environment, falling back to defaults
    /// for unset or blank variables.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let mut config = Self::default();

        if let Some(value) = read_var(LOCK_TIMEOUT_ENV)? {
            let millis = parse_positive(LOCK_TIMEOUT_ENV, &value)?;
            config.lock_timeout = Duration::from_millis(millis);
        }

        if let Some(value) = read_var(ACCOUNT_NUMBER_ATTEMPTS_ENV)? {
            let attempts = parse_positive(ACCOUNT_NUMBER_ATTEMPTS_ENV, &value)?;
            config.max_account_number_attempts =
                u32::try_from(attempts).map_err(|_| ConfigurationError::InvalidValue {
                    variable: ACCOUNT_NUMBER_ATTEMPTS_ENV,
                    value,
                })?;
        }

        Ok(config)
    }
}

fn read_var(variable: &'static str) -> Result<Option<String>, ConfigurationError> {
    match env::var(variable) {
        Ok(value) => {
            let value = value.trim().to_string();
            Ok((!value.is_empty()).then_some(value))
        }
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigurationError::InvalidValue {
            variable,
            value: "<non-UTF-8 value>".to_string(),
        }),
    }
}

fn parse_positive(variable: &'static str, value: &str) -> Result<u64, ConfigurationError> {
    match value.parse::<u64>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(ConfigurationError::InvalidValue {
            variable,
            value: value.to_string(),
        }),
    }
}

/// Errors raised while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Invalid value '{value}' for {variable}: expected a positive integer")]
    InvalidValue {
        variable: &'static str,
        value: String,
    },
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
