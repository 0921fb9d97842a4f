//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::config::schema::ClientConfig;
use crate::config::validation::{validate_config, ValidationError};

pub const ENV_RPC_URL: &str = "ETH_RPC_URL";
pub const ENV_CHAIN_ID: &str = "ETH_CHAIN_ID";
pub const ENV_GAS_BUFFER_SIMPLE: &str = "ETH_GAS_LIMIT_BUFFER_SIMPLE";
pub const ENV_GAS_BUFFER_COMPLEX: &str = "ETH_GAS_LIMIT_BUFFER_COMPLEX";
pub const ENV_MAX_FEE_PER_GAS: &str = "ETH_MAX_FEE_PER_GAS";
pub const ENV_PRIORITY_FEE_MAINNET: &str = "ETH_PRIORITY_FEE_MAINNET";
pub const ENV_PRIORITY_FEE_BASE: &str = "ETH_PRIORITY_FEE_BASE";
pub const ENV_PRIORITY_FEE_DEFAULT: &str = "ETH_PRIORITY_FEE_DEFAULT";
pub const ENV_TIMEOUT_SECS: &str = "ETH_TRANSACTION_TIMEOUT_SECONDS";
pub const ENV_TICKER_SECS: &str = "ETH_TRANSACTION_TICKER_SECONDS";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { var: &'static str, reason: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { var, reason } => write!(f, "invalid {}: {}", var, reason),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load a TOML file, apply `ETH_*` overrides from the process environment, validate.
pub fn load_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    load_config_with(path, |name| std::env::var(name).ok())
}

/// Same as [`load_config`] with an explicit variable lookup.
pub fn load_config_with<F>(path: &Path, lookup: F) -> Result<ClientConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let mut config: ClientConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    apply_env_overrides(&mut config, lookup)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Build a configuration from defaults and `ETH_*` variables only.
pub fn load_from_env() -> Result<ClientConfig, ConfigError> {
    let mut config = ClientConfig::default();

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables onto `config`.
///
/// A malformed `ETH_CHAIN_ID` is an error. Every other malformed value is
/// ignored with a warning and the file/default value stays in effect.
pub fn apply_env_overrides<F>(config: &mut ClientConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(url) = get(ENV_RPC_URL) {
        config.blockchain.rpc_url = url;
    }

    if let Some(raw) = get(ENV_CHAIN_ID) {
        config.blockchain.chain_id = raw.parse().map_err(|e: std::num::ParseIntError| ConfigError::Env {
            var: ENV_CHAIN_ID,
            reason: e.to_string(),
        })?;
    }

    override_with(&get, ENV_GAS_BUFFER_SIMPLE, &mut config.gas.simple_buffer);
    override_with(&get, ENV_GAS_BUFFER_COMPLEX, &mut config.gas.complex_buffer);

    override_with(&get, ENV_MAX_FEE_PER_GAS, &mut config.fees.max_fee_per_gas);
    override_with(&get, ENV_PRIORITY_FEE_MAINNET, &mut config.fees.priority_fee_mainnet);
    override_with(&get, ENV_PRIORITY_FEE_BASE, &mut config.fees.priority_fee_base);
    override_with(&get, ENV_PRIORITY_FEE_DEFAULT, &mut config.fees.priority_fee_default);

    override_with(&get, ENV_TIMEOUT_SECS, &mut config.confirmation.timeout_secs);
    override_with(&get, ENV_TICKER_SECS, &mut config.confirmation.interval_secs);

    Ok(())
}

fn override_with<T, G>(get: &G, var: &'static str, target: &mut T)
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(var) else { return };
    match raw.parse::<T>() {
        Ok(value) => *target = value,
        Err(e) => tracing::warn!(var, value = %raw, error = %e, "Ignoring unparsable setting"),
    }
}
