//! # Bot Configuration
//!
//! Loaded from a TOML file, then overridden from the environment.
//!
//! ```toml
//! [node]
//! endpoint = "http://127.0.0.1:8545"
//! request_timeout_secs = 10
//! connect_timeout_secs = 3
//!
//! [faucet]
//! amount = 100.0
//! address = "tpc1z..."
//! fee = 0.01
//!
//! [wallet]
//! name = "default_wallet"
//!
//! [chain]
//! hrp = "tpc"
//!
//! [store]
//! path = "./data/claims"
//!
//! [status]
//! interval_secs = 60
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::application::EligibilityConfig;
use crate::domain::{Amount, TESTNET_HRP};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("Failed to read {path}: {error}")]
    Io {
        /// Path of the file that failed to load.
        path: String,
        /// Error message from the I/O operation.
        error: String,
    },

    /// TOML parsing error.
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// A value is out of range or missing.
    #[error("Invalid config value for {field}: {reason}")]
    Invalid {
        /// Offending key.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// Node connection settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSection {
    /// JSON-RPC endpoint.
    pub endpoint: String,
    /// Per round trip timeout.
    pub request_timeout_secs: u64,
    /// TCP connect timeout.
    pub connect_timeout_secs: u64,
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8545".to_string(),
            request_timeout_secs: 10,
            connect_timeout_secs: 3,
        }
    }
}

/// Faucet payout settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FaucetSection {
    /// PAC bonded per claim.
    pub amount: f64,
    /// Address the faucet pays from.
    pub address: String,
    /// PAC fee per bond.
    pub fee: f64,
}

impl Default for FaucetSection {
    fn default() -> Self {
        Self {
            amount: 100.0,
            address: String::new(),
            fee: 0.01,
        }
    }
}

/// Wallet service settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletSection {
    /// Wallet JSON-RPC endpoint; the node endpoint when unset.
    pub endpoint: Option<String>,
    /// Wallet name.
    pub name: String,
    /// Wallet password.
    pub password: String,
}

impl Default for WalletSection {
    fn default() -> Self {
        Self {
            endpoint: None,
            name: "default_wallet".to_string(),
            password: String::new(),
        }
    }
}

/// Chain parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainSection {
    /// Address human-readable prefix.
    pub hrp: String,
}

impl Default for ChainSection {
    fn default() -> Self {
        Self {
            hrp: TESTNET_HRP.to_string(),
        }
    }
}

/// Chat platform settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordSection {
    /// Bot token.
    pub token: String,
    /// Guild the slash commands are registered in.
    pub guild_id: String,
    /// User id the bot posts as; its own messages are ignored.
    pub bot_user_id: String,
}

impl Default for DiscordSection {
    fn default() -> Self {
        Self {
            token: String::new(),
            guild_id: String::new(),
            bot_user_id: "faucet-bot".to_string(),
        }
    }
}

/// Claim store settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// RocksDB directory.
    pub path: String,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: "./data/claims".to_string(),
        }
    }
}

/// Status task settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusSection {
    /// Refresh interval.
    pub interval_secs: u64,
}

impl Default for StatusSection {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

/// Complete bot configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Node connection.
    pub node: NodeSection,
    /// Faucet payout.
    pub faucet: FaucetSection,
    /// Wallet service.
    pub wallet: WalletSection,
    /// Chain parameters.
    pub chain: ChainSection,
    /// Chat platform.
    pub discord: DiscordSection,
    /// Claim store.
    pub store: StoreSection,
    /// Status task.
    pub status: StatusSection,
}

impl BotConfig {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        info!("Loaded configuration from {}", path.display());
        Self::parse(&content)
    }

    /// Parse from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply `FAUCET_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`, keyed by environment variable name.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup("FAUCET_NODE_ENDPOINT") {
            self.node.endpoint = endpoint;
        }
        if let Some(amount) = lookup("FAUCET_AMOUNT") {
            match amount.parse() {
                Ok(amount) => self.faucet.amount = amount,
                Err(_) => warn!("FAUCET_AMOUNT must be a decimal PAC value, got '{}'", amount),
            }
        }
        if let Some(address) = lookup("FAUCET_ADDRESS") {
            self.faucet.address = address;
        }
        if let Some(endpoint) = lookup("FAUCET_WALLET_ENDPOINT") {
            self.wallet.endpoint = Some(endpoint);
        }
        if let Some(name) = lookup("FAUCET_WALLET_NAME") {
            self.wallet.name = name;
        }
        if let Some(password) = lookup("FAUCET_WALLET_PASSWORD") {
            self.wallet.password = password;
        }
        if let Some(hrp) = lookup("FAUCET_CHAIN_HRP") {
            self.chain.hrp = hrp;
        }
        if let Some(token) = lookup("FAUCET_DISCORD_TOKEN") {
            self.discord.token = token;
        }
        if let Some(guild) = lookup("FAUCET_DISCORD_GUILD_ID") {
            self.discord.guild_id = guild;
        }
        if let Some(path) = lookup("FAUCET_STORE_PATH") {
            self.store.path = path;
        }
    }

    /// Reject values the bot cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Checked in NanoPAC so a positive value that rounds to zero is refused
        if !Amount::from_pac(self.faucet.amount).is_some_and(|a| a > Amount::ZERO) {
            return Err(ConfigError::Invalid {
                field: "faucet.amount",
                reason: format!("must be at least 1 NanoPAC, got {}", self.faucet.amount),
            });
        }
        if Amount::from_pac(self.faucet.fee).is_none() {
            return Err(ConfigError::Invalid {
                field: "faucet.fee",
                reason: format!("must be a non-negative PAC amount, got {}", self.faucet.fee),
            });
        }
        if self.faucet.address.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "faucet.address",
                reason: "must be set".to_string(),
            });
        }
        if self.node.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "node.endpoint",
                reason: "must be set".to_string(),
            });
        }
        if self.wallet.endpoint.as_deref().is_some_and(|e| e.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                field: "wallet.endpoint",
                reason: "must not be empty when set".to_string(),
            });
        }
        if self.node.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "node.request_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.node.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "node.connect_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.status.interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "status.interval_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.chain.hrp.is_empty() {
            return Err(ConfigError::Invalid {
                field: "chain.hrp",
                reason: "must be set".to_string(),
            });
        }
        Ok(())
    }

    /// Amount bonded per claim.
    pub fn faucet_amount(&self) -> Amount {
        Amount::from_pac(self.faucet.amount).unwrap_or(Amount::ZERO)
    }

    /// Fee attached to each bond.
    pub fn faucet_fee(&self) -> Amount {
        Amount::from_pac(self.faucet.fee).unwrap_or(Amount::ZERO)
    }

    /// Wallet endpoint, falling back to the node endpoint.
    pub fn wallet_endpoint(&self) -> &str {
        self.wallet.endpoint.as_deref().unwrap_or(&self.node.endpoint)
    }

    /// Per round trip timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.node.request_timeout_secs)
    }

    /// Connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.node.connect_timeout_secs)
    }

    /// Status refresh interval.
    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status.interval_secs)
    }

    /// Settings for the eligibility engine.
    pub fn eligibility(&self) -> EligibilityConfig {
        EligibilityConfig {
            faucet_amount: self.faucet_amount(),
            hrp: self.chain.hrp.clone(),
            request_timeout: self.request_timeout(),
        }
    }

    /// Create a config for testing (small timeouts).
    pub fn for_testing() -> Self {
        Self {
            node: NodeSection {
                endpoint: "http://127.0.0.1:8545".to_string(),
                request_timeout_secs: 1,
                connect_timeout_secs: 1,
            },
            faucet: FaucetSection {
                amount: 5.0,
                address: "tpc1zzyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3s6ly4d".to_string(),
                fee: 0.0,
            },
            status: StatusSection { interval_secs: 1 },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = BotConfig::default();
        assert_eq!(config.node.endpoint, "http://127.0.0.1:8545");
        assert_eq!(config.chain.hrp, "tpc");
        assert_eq!(config.faucet_amount(), Amount::from_nanopac(100_000_000_000));
        assert_eq!(config.wallet_endpoint(), "http://127.0.0.1:8545");
        // Faucet address has no sensible default
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_partial_file() {
        let config = BotConfig::parse(
            r#"
            [faucet]
            amount = 5.5
            address = "tpc1zzyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3s6ly4d"

            [wallet]
            endpoint = "http://10.0.0.2:8545"
            "#,
        )
        .unwrap();

        assert_eq!(config.faucet_amount(), Amount::from_nanopac(5_500_000_000));
        assert_eq!(config.node.request_timeout_secs, 10);
        assert_eq!(config.wallet_endpoint(), "http://10.0.0.2:8545");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            BotConfig::parse("[faucet]\namount = \"lots\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = BotConfig::load("/nonexistent/faucet-bot.toml").unwrap();
        assert_eq!(config.status.interval_secs, 60);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("FAUCET_NODE_ENDPOINT", "http://node:8545"),
            ("FAUCET_AMOUNT", "7.25"),
            ("FAUCET_CHAIN_HRP", "pc"),
            ("FAUCET_STORE_PATH", "/var/lib/faucet"),
        ]
        .into_iter()
        .collect();

        let mut config = BotConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.node.endpoint, "http://node:8545");
        assert_eq!(config.faucet.amount, 7.25);
        assert_eq!(config.chain.hrp, "pc");
        assert_eq!(config.store.path, "/var/lib/faucet");
    }

    #[test]
    fn test_bad_amount_override_ignored() {
        let mut config = BotConfig::default();
        config.apply_overrides(|key| (key == "FAUCET_AMOUNT").then(|| "many".to_string()));
        assert_eq!(config.faucet.amount, 100.0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = BotConfig::for_testing();
        assert!(config.validate().is_ok());

        config.faucet.amount = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "faucet.amount", .. })
        ));

        // Positive but below one NanoPAC
        let mut config = BotConfig::for_testing();
        config.faucet.amount = 1e-12;
        assert_eq!(config.faucet_amount(), Amount::ZERO);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "faucet.amount", .. })
        ));

        let mut config = BotConfig::for_testing();
        config.faucet.amount = f64::MAX;
        assert!(config.validate().is_err());

        let mut config = BotConfig::for_testing();
        config.faucet.fee = -0.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "faucet.fee", .. })
        ));

        let mut config = BotConfig::for_testing();
        config.node.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = BotConfig::for_testing();
        config.node.endpoint = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_eligibility_settings() {
        let settings = BotConfig::for_testing().eligibility();
        assert_eq!(settings.faucet_amount, Amount::from_nanopac(5_000_000_000));
        assert_eq!(settings.request_timeout, Duration::from_secs(1));
        assert_eq!(settings.hrp, "tpc");
    }
}
