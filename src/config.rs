// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Settings come from a YAML file, environment variables and command line
//! flags. A flag beats an environment variable, which beats the file.
//!
//! ## File layout
//!
//! ```yaml
//! blockchain:
//!   address: http://127.0.0.1:8545   # request/response endpoint (deploy)
//!   ws: ws://127.0.0.1:8545          # pub-sub endpoint (allowance, owner, monitor)
//!   pk: <hex or PEM private key>
//!   timeout: 30s
//! contract:
//!   address: 0x...
//!   default_wei_funds: 0
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `SW_BLOCKCHAIN_ADDRESS` | `blockchain.address` |
//! | `SW_BLOCKCHAIN_WS` | `blockchain.ws` |
//! | `SW_BLOCKCHAIN_PK` | `blockchain.pk` |
//! | `SW_BLOCKCHAIN_TIMEOUT` | `blockchain.timeout` |
//! | `SW_CONTRACT_ADDRESS` | `contract.address` |
//! | `SW_CONTRACT_DEFAULT_WEI_FUNDS` | `contract.default_wei_funds` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`), default `pretty` |
//! | `RUST_LOG` | Log level filter, default `info` |

use std::path::{Path, PathBuf};
use std::time::Duration;

use alloy::primitives::U256;
use serde::Deserialize;

use crate::blockchain::RunnerConfig;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config/config.yaml";

pub const BLOCKCHAIN_ADDRESS_ENV: &str = "SW_BLOCKCHAIN_ADDRESS";
pub const BLOCKCHAIN_WS_ENV: &str = "SW_BLOCKCHAIN_WS";
pub const BLOCKCHAIN_PK_ENV: &str = "SW_BLOCKCHAIN_PK";
pub const BLOCKCHAIN_TIMEOUT_ENV: &str = "SW_BLOCKCHAIN_TIMEOUT";
pub const CONTRACT_ADDRESS_ENV: &str = "SW_CONTRACT_ADDRESS";
pub const CONTRACT_DEFAULT_WEI_FUNDS_ENV: &str = "SW_CONTRACT_DEFAULT_WEI_FUNDS";

/// Configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    #[error("invalid duration `{value}`: {reason}")]
    InvalidDuration { value: String, reason: &'static str },

    #[error("invalid value for `{key}`: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    blockchain: FileBlockchain,
    contract: FileContract,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileBlockchain {
    address: Option<String>,
    ws: Option<String>,
    pk: Option<String>,
    timeout: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileContract {
    address: Option<String>,
    #[serde(alias = "default_wei_founds")]
    default_wei_funds: Option<u64>,
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub private_key: Option<String>,
    pub contract_address: Option<String>,
}

/// Node connection settings.
#[derive(Clone)]
pub struct BlockchainConfig {
    /// Request/response RPC endpoint
    pub address: String,
    /// Pub-sub RPC endpoint
    pub ws: String,
    pub private_key: String,
    /// Deadline for each network operation
    pub timeout: Duration,
}

impl std::fmt::Debug for BlockchainConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainConfig")
            .field("address", &self.address)
            .field("ws", &self.ws)
            .field("private_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ContractConfig {
    pub address: String,
    /// Wei attached to contract deployments
    pub default_wei_funds: u64,
}

/// Fully resolved application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub blockchain: BlockchainConfig,
    pub contract: ContractConfig,
}

impl AppConfig {
    /// Load `path`, then apply the process environment and `overrides`.
    pub fn load(path: &Path, overrides: &Overrides) -> Result<Self, ConfigError> {
        Self::load_with_env(path, overrides, |key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::load`] with a custom environment lookup.
    pub fn load_with_env(
        path: &Path,
        overrides: &Overrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_with_env(&contents, overrides, env)
    }

    /// Resolve settings from YAML text, the environment and `overrides`.
    pub fn from_yaml_with_env(
        yaml: &str,
        overrides: &Overrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to a mapping
        let file: FileConfig = if yaml.trim().is_empty() {
            FileConfig::default()
        } else {
            serde_yaml::from_str(yaml)?
        };

        let pick = |flag: Option<&String>, key: &str, fallback: Option<String>| {
            flag.cloned().or_else(|| env(key)).or(fallback)
        };

        let timeout_raw = pick(None, BLOCKCHAIN_TIMEOUT_ENV, file.blockchain.timeout)
            .ok_or(ConfigError::Missing("blockchain.timeout"))?;
        let timeout = parse_duration(&timeout_raw)?;

        let default_wei_funds = match env(CONTRACT_DEFAULT_WEI_FUNDS_ENV) {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "contract.default_wei_funds",
                value: raw,
            })?,
            None => file.contract.default_wei_funds.unwrap_or(0),
        };

        let config = Self {
            blockchain: BlockchainConfig {
                address: pick(None, BLOCKCHAIN_ADDRESS_ENV, file.blockchain.address)
                    .unwrap_or_default(),
                ws: pick(None, BLOCKCHAIN_WS_ENV, file.blockchain.ws).unwrap_or_default(),
                private_key: pick(
                    overrides.private_key.as_ref(),
                    BLOCKCHAIN_PK_ENV,
                    file.blockchain.pk,
                )
                .unwrap_or_default(),
                timeout,
            },
            contract: ContractConfig {
                address: pick(
                    overrides.contract_address.as_ref(),
                    CONTRACT_ADDRESS_ENV,
                    file.contract.address,
                )
                .unwrap_or_default(),
                default_wei_funds,
            },
        };

        tracing::debug!(config = ?config, "Configuration loaded");
        Ok(config)
    }

    /// Settings for the allowance and ownership commands and for deployment.
    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            private_key: self.blockchain.private_key.clone(),
            contract_address: self.contract.address.clone(),
            default_value: U256::from(self.contract.default_wei_funds),
            timeout: self.blockchain.timeout,
        }
    }
}

/// Parse `500ms`, `30s`, `5m`, `1h` or a plain number of seconds.
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    let s = value.trim();
    let invalid = |reason| ConfigError::InvalidDuration {
        value: value.to_string(),
        reason,
    };

    // `ms` must be checked before `s` and `m`
    let (digits, unit_secs, millis) = if let Some(ms) = s.strip_suffix("ms") {
        (ms, 0, true)
    } else if let Some(secs) = s.strip_suffix('s') {
        (secs, 1, false)
    } else if let Some(mins) = s.strip_suffix('m') {
        (mins, 60, false)
    } else if let Some(hours) = s.strip_suffix('h') {
        (hours, 3600, false)
    } else {
        (s, 1, false)
    };

    let amount: u64 = digits
        .trim()
        .parse()
        .map_err(|_| invalid("expected a whole number with an optional ms, s, m or h suffix"))?;

    let duration = if millis {
        Duration::from_millis(amount)
    } else {
        amount
            .checked_mul(unit_secs)
            .map(Duration::from_secs)
            .ok_or_else(|| invalid("duration overflows"))?
    };

    if duration.is_zero() {
        return Err(invalid("duration must be greater than zero"));
    }
    Ok(duration)
}
