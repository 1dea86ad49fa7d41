//! Configuration file management.
//!
//! `config.toml` lives in the data directory. Every field has a default, so
//! a missing file or a partial one is fine.

use std::path::PathBuf;

use cadence_types::{Address, DEFAULT_PERIOD_SECS};
use serde::{Deserialize, Serialize};

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Oracle settings.
    #[serde(default)]
    pub oracle: OracleConfig,
    /// Venue pair settings.
    #[serde(default)]
    pub pair: PairConfig,
    /// Sentry settings.
    #[serde(default)]
    pub sentry: SentryConfig,
    /// Advanced settings.
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

/// Oracle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Minimum seconds between two updates.
    #[serde(default = "default_period")]
    pub period_secs: u64,
    /// How often the keeper checks whether an update is due.
    #[serde(default = "default_keeper_interval")]
    pub keeper_interval_secs: u64,
}

/// Venue pair configuration. Reserves are decimal strings because they may
/// exceed the TOML integer range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairConfig {
    #[serde(default = "default_token0")]
    pub token0: Address,
    #[serde(default = "default_token0_decimals")]
    pub token0_decimals: u8,
    #[serde(default = "default_token1")]
    pub token1: Address,
    #[serde(default = "default_token1_decimals")]
    pub token1_decimals: u8,
    #[serde(default = "default_reserve0")]
    pub reserve0: String,
    #[serde(default = "default_reserve1")]
    pub reserve1: String,
}

/// Sentry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentryConfig {
    /// Initial admin role holder.
    #[serde(default = "default_admin")]
    pub admin: Address,
}

/// Advanced configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Log level: "trace" | "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
}

// Default value functions

fn default_period() -> u64 {
    DEFAULT_PERIOD_SECS
}

fn default_keeper_interval() -> u64 {
    60
}

fn default_token0() -> Address {
    Address::repeat(0x06)
}

fn default_token0_decimals() -> u8 {
    6
}

fn default_token1() -> Address {
    Address::repeat(0x18)
}

fn default_token1_decimals() -> u8 {
    18
}

fn default_reserve0() -> String {
    // 1,000,000 units at 6 decimals
    "1000000000000".to_string()
}

fn default_reserve1() -> String {
    // 1,000,000 units at 18 decimals
    "1000000000000000000000000".to_string()
}

fn default_admin() -> Address {
    Address::repeat(0xad)
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            period_secs: default_period(),
            keeper_interval_secs: default_keeper_interval(),
        }
    }
}

impl Default for PairConfig {
    fn default() -> Self {
        Self {
            token0: default_token0(),
            token0_decimals: default_token0_decimals(),
            token1: default_token1(),
            token1_decimals: default_token1_decimals(),
            reserve0: default_reserve0(),
            reserve1: default_reserve1(),
        }
    }
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self {
            admin: default_admin(),
        }
    }
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            data_dir: String::new(),
        }
    }
}

impl PairConfig {
    /// Parsed initial reserves.
    pub fn reserves(&self) -> anyhow::Result<(u128, u128)> {
        let reserve0 = self
            .reserve0
            .parse::<u128>()
            .map_err(|e| anyhow::anyhow!("pair.reserve0 {:?}: {e}", self.reserve0))?;
        let reserve1 = self
            .reserve1
            .parse::<u128>()
            .map_err(|e| anyhow::anyhow!("pair.reserve1 {:?}: {e}", self.reserve1))?;
        Ok((reserve0, reserve1))
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: DaemonConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if self.advanced.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.advanced.data_dir)
        }
    }

    /// Get the config file path.
    fn config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    /// Platform-specific default data directory.
    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("CADENCE_DATA_DIR") {
            return PathBuf::from(dir);
        }
        #[cfg(target_os = "macos")]
        {
            dirs_fallback("Library/Application Support/Cadence")
        }
        #[cfg(not(target_os = "macos"))]
        {
            dirs_fallback(".cadence")
        }
    }
}

/// Fallback home directory resolution.
fn dirs_fallback(subpath: &str) -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(subpath))
        .unwrap_or_else(|_| PathBuf::from("/tmp/cadence"))
}
