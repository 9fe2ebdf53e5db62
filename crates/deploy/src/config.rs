//! Run configuration.
//!
//! Sources are layered, later ones winning: built-in defaults, the TOML file,
//! `SHIPYARD_`-prefixed environment variables, then explicit overrides (the
//! CLI). Durations are whole seconds in every source.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    coordinator::{DEFAULT_SETTLING_DELAY, VerificationSettings},
    errors::ConfigurationError,
    orchestrator::validate_specs,
    services::{
        etherscan::DEFAULT_API_URL,
        node::{DEFAULT_CONFIRMATION_TIMEOUT, DEFAULT_POLL_INTERVAL, NodeConfig},
    },
    types::ContractSpec,
};

/// Default configuration file name.
pub const CONFIG_FILENAME: &str = "Shipyard.toml";

/// Prefix of the environment variables read by [`Config::load`].
pub const ENV_PREFIX: &str = "SHIPYARD_";

/// Default bound on a single verification attempt.
pub const DEFAULT_VERIFICATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Everything a run needs, resolved from all configuration sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// JSON-RPC endpoint of the target network.
    pub network_url: Option<Url>,
    /// Hex private key of the deployer. Never written back to disk.
    #[serde(skip_serializing)]
    pub signing_key: Option<String>,
    #[serde(skip_serializing)]
    pub explorer_api_key: Option<String>,
    /// Etherscan's multichain API when unset.
    pub explorer_api_url: Option<Url>,
    /// Queried from the node when unset.
    pub chain_id: Option<u64>,
    #[serde(with = "secs")]
    pub settling_delay: Duration,
    #[serde(with = "secs")]
    pub confirmation_timeout: Duration,
    #[serde(with = "secs")]
    pub poll_interval: Duration,
    /// Zero disables the bound.
    #[serde(with = "secs")]
    pub verification_timeout: Duration,
    pub verification_concurrency: usize,
    pub artifacts_dir: PathBuf,
    pub report_path: Option<PathBuf>,
    #[serde(default)]
    pub contracts: Vec<ContractSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network_url: None,
            signing_key: None,
            explorer_api_key: None,
            explorer_api_url: None,
            chain_id: None,
            settling_delay: DEFAULT_SETTLING_DELAY,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            verification_timeout: DEFAULT_VERIFICATION_TIMEOUT,
            verification_concurrency: 1,
            artifacts_dir: PathBuf::from("artifacts"),
            report_path: None,
            contracts: Vec::new(),
        }
    }
}

/// Values given on the command line. Unset fields leave lower layers alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_url: Option<Url>,
    #[serde(skip_serializing_if = "Option::is_none", with = "opt_secs")]
    pub settling_delay: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_path: Option<PathBuf>,
}

impl Config {
    /// Layer defaults, `path` (if it exists), the environment and `overrides`.
    pub fn figment(path: &Path, overrides: &ConfigOverrides) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Serialized::defaults(overrides))
    }

    /// Resolve the configuration. Does not validate it.
    pub fn load(path: &Path, overrides: &ConfigOverrides) -> Result<Self, ConfigurationError> {
        let config: Self = Self::figment(path, overrides)
            .extract()
            .map_err(|e| ConfigurationError::Load(e.to_string()))?;

        tracing::debug!(
            path = %path.display(),
            contracts = config.contracts.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Check that every required value is present and consistent.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.network_url()?;
        self.signing_key()?;
        self.explorer_api_key()?;

        if self.verification_concurrency == 0 {
            return Err(ConfigurationError::Invalid {
                field: "verification_concurrency",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigurationError::Invalid {
                field: "poll_interval",
                reason: "must be at least 1 second".to_string(),
            });
        }
        if self.confirmation_timeout < self.poll_interval {
            return Err(ConfigurationError::Invalid {
                field: "confirmation_timeout",
                reason: "must not be shorter than poll_interval".to_string(),
            });
        }

        validate_specs(&self.contracts)
    }

    pub fn network_url(&self) -> Result<&Url, ConfigurationError> {
        self.network_url
            .as_ref()
            .ok_or(ConfigurationError::Missing("network_url"))
    }

    pub fn signing_key(&self) -> Result<&str, ConfigurationError> {
        non_empty(self.signing_key.as_deref()).ok_or(ConfigurationError::Missing("signing_key"))
    }

    pub fn explorer_api_key(&self) -> Result<&str, ConfigurationError> {
        non_empty(self.explorer_api_key.as_deref())
            .ok_or(ConfigurationError::Missing("explorer_api_key"))
    }

    pub fn explorer_api_url(&self) -> Result<Url, ConfigurationError> {
        match &self.explorer_api_url {
            Some(url) => Ok(url.clone()),
            None => Url::parse(DEFAULT_API_URL).map_err(|e| ConfigurationError::Invalid {
                field: "explorer_api_url",
                reason: e.to_string(),
            }),
        }
    }

    pub fn node_config(&self) -> Result<NodeConfig, ConfigurationError> {
        Ok(NodeConfig {
            chain_id: self.chain_id,
            confirmation_timeout: self.confirmation_timeout,
            poll_interval: self.poll_interval,
            ..NodeConfig::new(self.network_url()?.clone())
        })
    }

    pub fn verification_settings(&self) -> VerificationSettings {
        VerificationSettings {
            settling_delay: self.settling_delay,
            timeout: (!self.verification_timeout.is_zero()).then_some(self.verification_timeout),
            concurrency: self.verification_concurrency.max(1),
        }
    }

    /// Save the configuration, without secrets, to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Load a configuration written by [`Config::save_to_file`], ignoring the
    /// environment.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Configuration file not found: {}", path.display());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::string(&content))
            .extract()
            .context("Failed to parse config file")?;
        tracing::info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// (De)serialize a [`Duration`] as whole seconds.
mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

mod opt_secs {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_u64(duration.as_secs()),
            None => serializer.serialize_none(),
        }
    }
}
