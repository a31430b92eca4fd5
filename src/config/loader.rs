//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching config.toml
//! structure, with environment overrides for the endpoints and secrets.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::application::detector::{DetectorConfig, RAYDIUM_AMM_V4};
use crate::application::engine::EngineConfig;
use crate::domain::admission::TokenFilters;
use crate::domain::risk::{self, RiskConfig};

/// Main configuration structure matching config.toml
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub risk: RiskSection,
    #[serde(default)]
    pub detector: DetectorSection,
    pub tokens: TokensSection,
    pub jupiter: JupiterSection,
    pub solana: SolanaSection,
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Risk management configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct RiskSection {
    /// Minimum pool depth in USDC for a listing to be tradable
    pub min_liquidity_usdc: f64,
    /// Slippage tolerance in basis points (1% = 100 bps)
    pub slippage_bps: u16,
    /// Venue labels allowed in swap routes (empty = any venue)
    #[serde(default)]
    pub allowed_venues: Vec<String>,
    /// Require renounced mint/freeze authority before entry
    #[serde(default)]
    pub require_verified: bool,
    /// Reject tokens with anti-bot transfer restrictions
    #[serde(default = "default_true")]
    pub reject_antibot: bool,
    /// Take-profit percentage
    pub target_profit_pct: f64,
    /// Stop-loss percentage
    pub stop_loss_pct: f64,
    /// Maximum holding time in seconds before a forced exit
    pub max_holding_secs: u64,
    /// Single-interval price move that counts as a volatility spike
    #[serde(default = "default_volatility_spike_pct")]
    pub volatility_spike_pct: f64,
    /// Whether the volatility spike exit is armed
    #[serde(default = "default_true")]
    pub volatility_exit_enabled: bool,
    /// Fraction of wallet balance committed per trade (percent)
    pub position_size_pct: f64,
    /// Maximum number of simultaneously open trades
    pub max_open_trades: usize,
    /// Minimum seconds between consecutive admitted trades
    pub cooldown_secs: u64,
    /// Swap amount in USDC (upper bound on position sizing)
    pub swap_amount_usdc: f64,
    /// Price polling cadence in seconds
    #[serde(default = "default_price_check_interval_secs")]
    pub price_check_interval_secs: u64,
    /// Honeypot heuristic: maximum acceptable quote price impact (percent)
    #[serde(default = "default_max_price_impact_pct")]
    pub max_price_impact_pct: f64,
    /// Priority fee attached to executed transactions, in lamports
    #[serde(default = "default_priority_fee_lamports")]
    pub priority_fee_lamports: u64,
}

/// Listing detector configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct DetectorSection {
    /// AMM program whose transactions are watched for pool creation
    #[serde(default = "default_program_id")]
    pub program_id: String,
    /// If non-empty, only these mints may trade
    #[serde(default)]
    pub whitelist: Vec<String>,
    /// These mints never trade
    #[serde(default)]
    pub blacklist: Vec<String>,
    /// Signature dedup cache capacity
    #[serde(default = "default_dedup_capacity")]
    pub dedup_capacity: usize,
    /// Signature dedup entry TTL in seconds
    #[serde(default = "default_dedup_ttl_secs")]
    pub dedup_ttl_secs: u64,
    /// Capacity of the candidate channel toward the engine
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for DetectorSection {
    fn default() -> Self {
        Self {
            program_id: default_program_id(),
            whitelist: Vec::new(),
            blacklist: Vec::new(),
            dedup_capacity: default_dedup_capacity(),
            dedup_ttl_secs: default_dedup_ttl_secs(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Tokens configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct TokensSection {
    /// Quote asset mint (USDC)
    pub quote_mint: String,
    /// Quote asset decimals
    #[serde(default = "default_quote_decimals")]
    pub quote_decimals: u8,
}

/// Jupiter API configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct JupiterSection {
    /// Jupiter V6 API base URL
    pub api_url: String,
    /// Optional API key for higher rate limits (get from jup.ag)
    #[serde(default)]
    pub api_key: Option<String>,
}

impl JupiterSection {
    /// Get API key with environment variable fallback
    /// Checks JUPITER_API_KEY env var if config value is empty/None
    pub fn get_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.api_key {
            if !key.is_empty() {
                return Some(key.clone());
            }
        }
        std::env::var("JUPITER_API_KEY").ok()
    }
}

/// Solana RPC configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct SolanaSection {
    /// RPC endpoint (use private RPC for production)
    pub rpc_url: String,
    /// Websocket endpoint for transaction subscriptions
    pub ws_url: String,
    /// Commitment level: "processed", "confirmed", "finalized"
    #[serde(default = "default_commitment")]
    pub commitment: String,
    /// Wallet keypair path (NEVER commit this file!)
    pub keypair_path: String,
}

impl SolanaSection {
    /// Get RPC URL with environment variable override
    /// Checks SOLANA_RPC_URL env var first, falls back to config value
    pub fn get_rpc_url(&self) -> String {
        std::env::var("SOLANA_RPC_URL").unwrap_or_else(|_| self.rpc_url.clone())
    }

    /// Get websocket URL with environment variable override
    pub fn get_ws_url(&self) -> String {
        std::env::var("SOLANA_WS_URL").unwrap_or_else(|_| self.ws_url.clone())
    }

    /// Get keypair path with environment variable override
    /// Checks SOLANA_KEYPAIR_PATH env var first, falls back to config value
    pub fn get_keypair_path(&self) -> String {
        std::env::var("SOLANA_KEYPAIR_PATH").unwrap_or_else(|_| self.keypair_path.clone())
    }
}

/// Engine configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    /// Seconds the engine waits for positions to unwind on shutdown
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_volatility_spike_pct() -> f64 {
    risk::DEFAULT_VOLATILITY_SPIKE_PCT
}

fn default_max_price_impact_pct() -> f64 {
    risk::DEFAULT_MAX_PRICE_IMPACT_PCT
}

fn default_price_check_interval_secs() -> u64 {
    5
}

fn default_priority_fee_lamports() -> u64 {
    10_000
}

fn default_program_id() -> String {
    RAYDIUM_AMM_V4.to_string()
}

fn default_dedup_capacity() -> usize {
    crate::domain::dedup::DEFAULT_CAPACITY
}

fn default_dedup_ttl_secs() -> u64 {
    crate::domain::dedup::DEFAULT_TTL.as_secs()
}

fn default_channel_capacity() -> usize {
    64
}

fn default_quote_decimals() -> u8 {
    6
}

fn default_commitment() -> String {
    "confirmed".to_string()
}

fn default_shutdown_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.risk.min_liquidity_usdc < 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "min_liquidity_usdc must be >= 0, got {}",
                self.risk.min_liquidity_usdc
            )));
        }

        if self.risk.target_profit_pct <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "target_profit_pct must be > 0, got {}",
                self.risk.target_profit_pct
            )));
        }

        if self.risk.stop_loss_pct <= 0.0 || self.risk.stop_loss_pct > 100.0 {
            return Err(ConfigError::ValidationError(format!(
                "stop_loss_pct must be 0-100, got {}",
                self.risk.stop_loss_pct
            )));
        }

        if self.risk.position_size_pct <= 0.0 || self.risk.position_size_pct > 100.0 {
            return Err(ConfigError::ValidationError(format!(
                "position_size_pct must be 0-100, got {}",
                self.risk.position_size_pct
            )));
        }

        if self.risk.max_price_impact_pct <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "max_price_impact_pct must be > 0, got {}",
                self.risk.max_price_impact_pct
            )));
        }

        if self.risk.max_open_trades == 0 {
            return Err(ConfigError::ValidationError(
                "max_open_trades must be > 0".to_string(),
            ));
        }

        if self.risk.swap_amount_usdc <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "swap_amount_usdc must be > 0, got {}",
                self.risk.swap_amount_usdc
            )));
        }

        if self.risk.price_check_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "price_check_interval_secs must be > 0".to_string(),
            ));
        }

        if self.detector.program_id.is_empty() {
            return Err(ConfigError::ValidationError(
                "program_id cannot be empty".to_string(),
            ));
        }

        if self.tokens.quote_mint.is_empty() {
            return Err(ConfigError::ValidationError(
                "quote_mint cannot be empty".to_string(),
            ));
        }

        if self.jupiter.api_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "api_url cannot be empty".to_string(),
            ));
        }

        if self.solana.rpc_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "rpc_url cannot be empty".to_string(),
            ));
        }

        if self.solana.ws_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "ws_url cannot be empty".to_string(),
            ));
        }

        if self.solana.keypair_path.is_empty() {
            return Err(ConfigError::ValidationError(
                "keypair_path cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn token_filters(&self) -> TokenFilters {
        TokenFilters {
            whitelist: self.detector.whitelist.clone(),
            blacklist: self.detector.blacklist.clone(),
        }
    }
}

impl From<&Config> for RiskConfig {
    fn from(config: &Config) -> Self {
        RiskConfig {
            min_liquidity_usdc: config.risk.min_liquidity_usdc,
            slippage_bps: config.risk.slippage_bps,
            allowed_venues: config.risk.allowed_venues.clone(),
            require_verified: config.risk.require_verified,
            reject_antibot: config.risk.reject_antibot,
            target_profit_pct: config.risk.target_profit_pct,
            stop_loss_pct: config.risk.stop_loss_pct,
            max_holding: Duration::from_secs(config.risk.max_holding_secs),
            volatility_spike_pct: config.risk.volatility_spike_pct,
            volatility_exit_enabled: config.risk.volatility_exit_enabled,
            position_size_pct: config.risk.position_size_pct,
            max_open_trades: config.risk.max_open_trades,
            cooldown: Duration::from_secs(config.risk.cooldown_secs),
            swap_amount_usdc: config.risk.swap_amount_usdc,
            price_check_interval: Duration::from_secs(config.risk.price_check_interval_secs),
            max_price_impact_pct: config.risk.max_price_impact_pct,
            priority_fee_lamports: config.risk.priority_fee_lamports,
        }
    }
}

impl From<&Config> for DetectorConfig {
    fn from(config: &Config) -> Self {
        DetectorConfig {
            program_id: config.detector.program_id.clone(),
            quote_mint: config.tokens.quote_mint.clone(),
            dedup_capacity: config.detector.dedup_capacity,
            dedup_ttl_secs: config.detector.dedup_ttl_secs,
            channel_capacity: config.detector.channel_capacity,
        }
    }
}

impl From<&Config> for EngineConfig {
    fn from(config: &Config) -> Self {
        EngineConfig {
            shutdown_timeout: Duration::from_secs(config.engine.shutdown_timeout_secs),
            quote_decimals: config.tokens.quote_decimals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_valid_config() -> String {
        r#"
[risk]
min_liquidity_usdc = 1000.0
slippage_bps = 100
target_profit_pct = 20.0
stop_loss_pct = 10.0
max_holding_secs = 14400
position_size_pct = 5.0
max_open_trades = 3
cooldown_secs = 30
swap_amount_usdc = 10.0

[detector]
blacklist = ["BadMint1111111111111111111111111111111111111"]

[tokens]
quote_mint = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"

[jupiter]
api_url = "https://quote-api.jup.ag/v6"

[solana]
rpc_url = "https://api.mainnet-beta.solana.com"
ws_url = "wss://api.mainnet-beta.solana.com"
keypair_path = "~/.config/solana/id.json"
"#
        .to_string()
    }

    #[test]
    fn test_load_valid_config() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(create_valid_config().as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.risk.slippage_bps, 100);
        assert_eq!(config.tokens.quote_decimals, 6);
        assert_eq!(config.detector.program_id, RAYDIUM_AMM_V4);
        assert_eq!(config.engine.shutdown_timeout_secs, 30);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_config("/nonexistent/config.toml"),
            Err(ConfigError::IoError(_))
        ));
    }

    #[test]
    fn test_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"not [valid toml").unwrap();
        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_validation_rejects_zero_trades() {
        let toml = create_valid_config().replace("max_open_trades = 3", "max_open_trades = 0");
        let config: Config = toml::from_str(&toml).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validation_rejects_bad_stop_loss() {
        let toml = create_valid_config().replace("stop_loss_pct = 10.0", "stop_loss_pct = 150.0");
        let config: Config = toml::from_str(&toml).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_risk_config_conversion() {
        let config: Config = toml::from_str(&create_valid_config()).unwrap();
        let risk = RiskConfig::from(&config);
        assert_eq!(risk.max_holding, Duration::from_secs(14400));
        assert_eq!(risk.cooldown, Duration::from_secs(30));
        assert!((risk.max_price_impact_pct - 15.0).abs() < f64::EPSILON);
        assert!(risk.reject_antibot);
        assert!(risk.volatility_exit_enabled);
    }

    #[test]
    fn test_filters_from_config() {
        let config: Config = toml::from_str(&create_valid_config()).unwrap();
        let filters = config.token_filters();
        assert!(!filters.allows("BadMint1111111111111111111111111111111111111"));
        assert!(filters.allows("SomeOtherMint"));
    }
}
