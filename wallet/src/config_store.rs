use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{WalletError, WalletResult};
use crate::provider::{ChainParams, NativeCurrency};

pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;

pub const ENV_ENVIRONMENT: &str = "SEPOLIA_WALLET_ENV";
pub const ENV_RPC_URL: &str = "SEPOLIA_WALLET_RPC_URL";
pub const ENV_HISTORY_URL: &str = "SEPOLIA_WALLET_HISTORY_URL";
pub const ENV_CHAIN_ID: &str = "SEPOLIA_WALLET_CHAIN_ID";
pub const ENV_POLL_MS: &str = "SEPOLIA_WALLET_POLL_MS";

/// The single chain the wallet operates on
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub chain_name: String,
    pub rpc_urls: Vec<String>,
    pub currency_name: String,
    pub currency_symbol: String,
    pub currency_decimals: u8,
    pub block_explorer_urls: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            chain_id: SEPOLIA_CHAIN_ID,
            chain_name: "Sepolia Test Network".to_string(),
            rpc_urls: vec!["https://rpc.sepolia.org".to_string()],
            currency_name: "SepoliaETH".to_string(),
            currency_symbol: "ETH".to_string(),
            currency_decimals: 18,
            block_explorer_urls: vec!["https://sepolia.etherscan.io/".to_string()],
        }
    }
}

impl NetworkConfig {
    pub fn chain_id_hex(&self) -> String {
        format!("0x{:x}", self.chain_id)
    }

    /// Parameters for registering this network with a wallet that does not know it
    pub fn chain_params(&self) -> ChainParams {
        ChainParams {
            chain_id: self.chain_id_hex(),
            chain_name: self.chain_name.clone(),
            rpc_urls: self.rpc_urls.clone(),
            native_currency: NativeCurrency {
                name: self.currency_name.clone(),
                symbol: self.currency_symbol.clone(),
                decimals: self.currency_decimals,
            },
            block_explorer_urls: self.block_explorer_urls.clone(),
        }
    }

    /// Explorer link for a transaction hash, when an explorer is configured
    pub fn explorer_tx_url(&self, tx_hash: &str) -> Option<String> {
        self.block_explorer_urls
            .first()
            .map(|base| format!("{}/tx/{}", base.trim_end_matches('/'), tx_hash))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WalletConfig {
    pub network: NetworkConfig,
    pub history_api_url: String,
    /// JSON-RPC endpoint used when no injected wallet is available
    pub rpc_endpoint: String,
    pub confirmation_poll_ms: u64,
    pub environment: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self::new("development")
    }
}

impl WalletConfig {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            network: NetworkConfig::default(),
            history_api_url: "http://localhost:3000/api".to_string(),
            rpc_endpoint: "http://localhost:8545".to_string(),
            confirmation_poll_ms: 2_000,
            environment: environment.into(),
        }
    }

    /// Apply `(name, value)` overrides; unknown names are ignored
    pub fn apply_overrides<I, K, V>(&mut self, vars: I) -> WalletResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (name, value) in vars {
            let (name, value) = (name.as_ref(), value.as_ref());
            if !is_known_override(name) {
                continue;
            }
            if value.trim().is_empty() || value.chars().any(char::is_control) {
                log::warn!("Ignoring {}: empty or contains control characters", name);
                continue;
            }
            let value = value.trim();

            match name {
                ENV_ENVIRONMENT => self.environment = value.to_string(),
                ENV_RPC_URL => self.rpc_endpoint = value.to_string(),
                ENV_HISTORY_URL => self.history_api_url = value.to_string(),
                ENV_CHAIN_ID => {
                    self.network.chain_id = parse_chain_id(value)?;
                }
                ENV_POLL_MS => {
                    self.confirmation_poll_ms = value.parse().map_err(|_| {
                        WalletError::ConfigError(format!("{} must be an integer", ENV_POLL_MS))
                    })?;
                }
                _ => {}
            }
            log::debug!("Applied config override {}", name);
        }
        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> WalletResult<()> {
        self.apply_overrides(std::env::vars())
    }

    pub fn validate(&self) -> WalletResult<()> {
        if self.history_api_url.trim().is_empty() {
            return Err(WalletError::ConfigError(
                "history_api_url must not be empty".to_string(),
            ));
        }
        if self.rpc_endpoint.trim().is_empty() {
            return Err(WalletError::ConfigError(
                "rpc_endpoint must not be empty".to_string(),
            ));
        }
        if self.confirmation_poll_ms == 0 {
            return Err(WalletError::ConfigError(
                "confirmation_poll_ms must be greater than 0".to_string(),
            ));
        }
        if self.network.rpc_urls.iter().any(|url| url.trim().is_empty()) {
            return Err(WalletError::ConfigError(
                "network rpc_urls must not contain empty entries".to_string(),
            ));
        }
        Ok(())
    }
}

fn is_known_override(name: &str) -> bool {
    matches!(
        name,
        ENV_ENVIRONMENT | ENV_RPC_URL | ENV_HISTORY_URL | ENV_CHAIN_ID | ENV_POLL_MS
    )
}

fn parse_chain_id(value: &str) -> WalletResult<u64> {
    let parsed = match value.strip_prefix("0x") {
        Some(digits) => u64::from_str_radix(digits, 16),
        None => value.parse(),
    };
    parsed.map_err(|_| WalletError::ConfigError(format!("Invalid chain id '{}'", value)))
}

/// Loads and saves the wallet configuration as JSON.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Read the config file, or defaults when it does not exist. Nothing is written.
    pub fn load_or_default(&self) -> WalletResult<WalletConfig> {
        if !self.path.exists() {
            log::info!(
                "No config at {}, using defaults",
                self.path.display()
            );
            return Ok(WalletConfig::default());
        }

        let bytes = fs::read(&self.path)?;
        let config: WalletConfig = serde_json::from_slice(&bytes)?;
        Ok(config)
    }

    /// Load, apply environment overrides and validate
    pub fn load_effective(&self) -> WalletResult<WalletConfig> {
        let mut config = self.load_or_default()?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &WalletConfig) -> WalletResult<()> {
        config.validate()?;
        let serialized = serde_json::to_vec_pretty(config)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("new");
        fs::write(&tmp_path, serialized)?;
        fs::rename(tmp_path, &self.path)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
