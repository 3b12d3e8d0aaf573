//! Configuration for a quorum node

use std::path::Path;

use quorum_staking::{StakingLimits, APY_SCALE};
use serde::{Deserialize, Serialize};

/// Base units per whole token.
pub const TOKEN: u128 = 1_000_000_000_000_000_000;

/// Main node configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuorumConfig {
    /// Component and agent registries
    #[serde(default)]
    pub units: UnitsConfig,

    /// Service registry
    #[serde(default)]
    pub service: ServiceConfig,

    /// Staking admission
    #[serde(default)]
    pub staking: StakingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Unit registry metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitsConfig {
    #[serde(default = "default_component_name")]
    pub component_name: String,

    #[serde(default = "default_component_symbol")]
    pub component_symbol: String,

    #[serde(default = "default_agent_name")]
    pub agent_name: String,

    #[serde(default = "default_agent_symbol")]
    pub agent_symbol: String,

    /// Prefix of every unit token URI
    #[serde(default = "default_base_uri")]
    pub base_uri: String,
}

impl Default for UnitsConfig {
    fn default() -> Self {
        Self {
            component_name: default_component_name(),
            component_symbol: default_component_symbol(),
            agent_name: default_agent_name(),
            agent_symbol: default_agent_symbol(),
            base_uri: default_base_uri(),
        }
    }
}

/// Service registry metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,

    #[serde(default = "default_service_symbol")]
    pub symbol: String,

    #[serde(default = "default_base_uri")]
    pub base_uri: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            symbol: default_service_symbol(),
            base_uri: default_base_uri(),
        }
    }
}

/// Initial staking limits.
///
/// Amounts are whole tokens and the APY is a percentage so every value fits
/// the integer range environment overrides are parsed into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakingConfig {
    /// Maximum minimum-deposit, in whole tokens
    #[serde(default = "default_min_deposit_tokens")]
    pub min_deposit_tokens: u64,

    /// Maximum emissions duration in seconds
    #[serde(default = "default_max_emissions_duration")]
    pub max_emissions_duration_secs: u64,

    #[serde(default = "default_max_services")]
    pub max_services: u32,

    /// Maximum APY in percent
    #[serde(default = "default_max_apy_percent")]
    pub max_apy_percent: u64,

    /// Enforce the implementation whitelist
    #[serde(default = "default_true")]
    pub check_implementations: bool,
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            min_deposit_tokens: default_min_deposit_tokens(),
            max_emissions_duration_secs: default_max_emissions_duration(),
            max_services: default_max_services(),
            max_apy_percent: default_max_apy_percent(),
            check_implementations: true,
        }
    }
}

impl StakingConfig {
    /// Limits in base units.
    pub fn limits(&self) -> StakingLimits {
        StakingLimits {
            min_deposit: (self.min_deposit_tokens as u128).saturating_mul(TOKEN),
            max_emissions_duration: self.max_emissions_duration_secs,
            max_services: self.max_services,
            max_apy: (self.max_apy_percent as u128).saturating_mul(APY_SCALE / 100),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_component_name() -> String {
    "Component Registry".to_string()
}

fn default_component_symbol() -> String {
    "COMPONENT".to_string()
}

fn default_agent_name() -> String {
    "Agent Registry".to_string()
}

fn default_agent_symbol() -> String {
    "AGENT".to_string()
}

fn default_service_name() -> String {
    "Service Registry".to_string()
}

fn default_service_symbol() -> String {
    "SERVICE".to_string()
}

fn default_base_uri() -> String {
    "ipfs://".to_string()
}

fn default_min_deposit_tokens() -> u64 {
    10_000
}

fn default_max_emissions_duration() -> u64 {
    365 * 24 * 60 * 60
}

fn default_max_services() -> u32 {
    100
}

fn default_max_apy_percent() -> u64 {
    500
}

fn default_log_level() -> String {
    "info".to_string()
}

impl QuorumConfig {
    /// Load configuration: defaults, then the optional file, then `QUORUM_`
    /// environment variables (`QUORUM_STAKING__MAX_SERVICES=10`).
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&QuorumConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("QUORUM")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }
}
