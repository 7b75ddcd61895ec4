//! Configuration management for kittyboard

use crate::error::KittyError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "kittyboard.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub node: NodeConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeModule {
    Sudo,
    UpgradeKey,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    #[serde(default = "default_chain_name")]
    pub chain_name: String,
    #[serde(default = "default_block_time_ms")]
    pub block_time_ms: u64,
    /// Blocks an auction created without an explicit expiry stays open.
    #[serde(default = "default_auction_period")]
    pub auction_period: u64,
    #[serde(default = "default_auction_period_limit")]
    pub auction_period_limit: u64,
    /// Validity window in blocks for mortal transactions.
    #[serde(default = "default_mortal_period")]
    pub mortal_period: u64,
    #[serde(default = "default_upgrade_module")]
    pub upgrade_module: UpgradeModule,
    #[serde(default = "default_endowment")]
    pub endowment: u128,
    /// Phrases endowed at genesis. The first one holds the sudo or upgrade key.
    #[serde(default = "default_dev_accounts")]
    pub dev_accounts: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_enabled")]
    pub persist_chain: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default = "default_enabled")]
    pub import_dev_keys: bool,
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            chain_name: default_chain_name(),
            block_time_ms: default_block_time_ms(),
            auction_period: default_auction_period(),
            auction_period_limit: default_auction_period_limit(),
            mortal_period: default_mortal_period(),
            upgrade_module: default_upgrade_module(),
            endowment: default_endowment(),
            dev_accounts: default_dev_accounts(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            data_dir: default_data_dir(),
            persist_chain: default_enabled(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            tick_ms: default_tick_ms(),
            import_dev_keys: default_enabled(),
            log_file: default_log_file(),
        }
    }
}

impl Config {
    pub fn from_toml(contents: &str) -> Result<Self, KittyError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), KittyError> {
        if self.node.chain_name.trim().is_empty() {
            return Err(KittyError::ConfigError(
                "node.chain_name must not be empty".to_string(),
            ));
        }
        if self.node.block_time_ms == 0 {
            return Err(KittyError::ConfigError(
                "node.block_time_ms must be greater than zero".to_string(),
            ));
        }
        if self.node.auction_period == 0 || self.node.auction_period > self.node.auction_period_limit {
            return Err(KittyError::ConfigError(format!(
                "node.auction_period must be between 1 and auction_period_limit ({})",
                self.node.auction_period_limit
            )));
        }
        if self.node.mortal_period == 0 {
            return Err(KittyError::ConfigError(
                "node.mortal_period must be greater than zero".to_string(),
            ));
        }
        if self.node.dev_accounts.iter().all(|p| p.trim().is_empty()) {
            return Err(KittyError::ConfigError(
                "node.dev_accounts needs at least one phrase to hold the upgrade key".to_string(),
            ));
        }
        if self.ui.tick_ms == 0 {
            return Err(KittyError::ConfigError(
                "ui.tick_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn keys_path(&self) -> PathBuf {
        self.storage.data_dir.join("keys.json")
    }

    pub fn addressbook_path(&self) -> PathBuf {
        self.storage.data_dir.join("addressbook.json")
    }

    pub fn chain_db_path(&self) -> PathBuf {
        self.storage.data_dir.join("chain.db")
    }

    pub fn log_path(&self) -> PathBuf {
        self.storage.data_dir.join(&self.ui.log_file)
    }
}

/// Load `path`, falling back to defaults when the file is absent.
pub fn load_config(path: &Path) -> Result<Config, KittyError> {
    if !path.exists() {
        let config = Config::default();
        config.validate()?;
        return Ok(config);
    }
    let contents = fs::read_to_string(path)?;
    Config::from_toml(&contents)
}

fn default_chain_name() -> String {
    "Kitty Devnet".to_string()
}

fn default_block_time_ms() -> u64 {
    3000
}

fn default_auction_period() -> u64 {
    20
}

fn default_auction_period_limit() -> u64 {
    17280
}

fn default_mortal_period() -> u64 {
    64
}

fn default_upgrade_module() -> UpgradeModule {
    UpgradeModule::Sudo
}

fn default_endowment() -> u128 {
    1_000_000_000
}

fn default_dev_accounts() -> Vec<String> {
    ["Alice", "Bob", "Charlie", "Dave"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kittyboard")
}

fn default_enabled() -> bool {
    true
}

fn default_tick_ms() -> u64 {
    250
}

fn default_log_file() -> String {
    "kittyboard.log".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.node.upgrade_module, UpgradeModule::Sudo);
        assert_eq!(config.node.auction_period_limit, 17280);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config = Config::from_toml(
            r#"
            [node]
            chain_name = "Local"
            upgrade_module = "upgrade_key"

            [storage]
            data_dir = "/tmp/kb"
            persist_chain = false
            "#,
        )
        .unwrap();

        assert_eq!(config.node.chain_name, "Local");
        assert_eq!(config.node.upgrade_module, UpgradeModule::UpgradeKey);
        assert_eq!(config.node.block_time_ms, 3000);
        assert!(!config.storage.persist_chain);
        assert_eq!(config.chain_db_path(), PathBuf::from("/tmp/kb/chain.db"));
        assert_eq!(config.ui.tick_ms, 250);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(Config::from_toml("[node]\nblock_time_ms = 0").is_err());
        assert!(Config::from_toml("[node]\nchain_name = \"  \"").is_err());
        assert!(Config::from_toml("[node]\nauction_period = 20000").is_err());
        assert!(Config::from_toml("[node]\ndev_accounts = []").is_err());
        assert!(Config::from_toml("[node]\nupgrade_module = \"root\"").is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = load_config(Path::new("/definitely/not/here.toml")).unwrap();
        assert_eq!(config.node.chain_name, "Kitty Devnet");
    }
}
