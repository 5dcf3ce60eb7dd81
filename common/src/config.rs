// common/src/config.rs
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use config::{Config as ConfigFile, File, Environment};

use crate::error::ConfigurationError;
use crate::utils::is_valid_address;

/// Longest session lifetime accepted from configuration
pub const MAX_SESSION_TTL_DAYS: i64 = 365;

/// Central configuration, loaded once at startup and shared read-only
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub chain: ChainConfig,
    pub payment: PaymentConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_addr")]
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { addr: default_server_addr() }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign session tokens
    pub session_secret: String,
    #[serde(default = "default_session_ttl_days")]
    pub session_ttl_days: i64,
    #[serde(default = "default_true")]
    pub cookie_secure: bool,
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
    #[serde(default = "default_nonce_rate_limit")]
    pub nonce_rate_limit_per_minute: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainConfig {
    pub rpc_url: String,
    #[serde(default = "default_rpc_timeout")]
    pub rpc_timeout_secs: u64,
    pub payment_contract: String,
    pub staking_contract: String,
    #[serde(default)]
    pub token_address: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// Required payment in wei, as a decimal string
    pub fixed_amount: String,
    /// Minimum staked balance in wei, as a decimal string
    pub min_staked_amount: String,
    /// Reject receipts without a decodable PaymentDone event
    #[serde(default)]
    pub require_payment_event: bool,
}

fn default_server_addr() -> String {
    "127.0.0.1:8081".to_string()
}

fn default_session_ttl_days() -> i64 {
    7
}

fn default_true() -> bool {
    true
}

fn default_cleanup_interval() -> u64 {
    3600
}

fn default_nonce_rate_limit() -> usize {
    10
}

fn default_rpc_timeout() -> u64 {
    10
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, ConfigurationError> {
        // Get the run mode, defaulting to "development"
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        // Locate the config directory
        let config_dir = env::var("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                // Check if we're in the project root or a subcrate
                let mut path = PathBuf::from("./config");
                if !path.exists() {
                    path = PathBuf::from("../config");
                }
                path
            });

        tracing::info!("Loading configuration from {}", config_dir.display());
        tracing::info!("Using run mode: {}", run_mode);

        let config: Config = ConfigFile::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", run_mode))).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // e.g. APP__CHAIN__RPC_URL
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Check every field that the services rely on being well-formed
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.auth.session_secret.trim().is_empty() {
            return Err(invalid("auth.session_secret", "must not be empty"));
        }
        if self.auth.session_ttl_days <= 0 {
            return Err(invalid("auth.session_ttl_days", "must be positive"));
        }
        if self.auth.session_ttl_days > MAX_SESSION_TTL_DAYS {
            return Err(invalid(
                "auth.session_ttl_days",
                format!("must be at most {}", MAX_SESSION_TTL_DAYS),
            ));
        }
        if self.auth.nonce_rate_limit_per_minute == 0 {
            return Err(invalid("auth.nonce_rate_limit_per_minute", "must be positive"));
        }

        match url::Url::parse(&self.chain.rpc_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => {
                return Err(invalid(
                    "chain.rpc_url",
                    format!("unsupported scheme `{}`", url.scheme()),
                ))
            }
            Err(e) => return Err(invalid("chain.rpc_url", e.to_string())),
        }
        if self.chain.rpc_timeout_secs == 0 {
            return Err(invalid("chain.rpc_timeout_secs", "must be positive"));
        }
        if !is_valid_address(&self.chain.payment_contract) {
            return Err(invalid("chain.payment_contract", "not a 20-byte hex address"));
        }
        if !is_valid_address(&self.chain.staking_contract) {
            return Err(invalid("chain.staking_contract", "not a 20-byte hex address"));
        }
        if let Some(token) = &self.chain.token_address {
            if !is_valid_address(token) {
                return Err(invalid("chain.token_address", "not a 20-byte hex address"));
            }
        }

        if !is_decimal_amount(&self.payment.fixed_amount) {
            return Err(invalid("payment.fixed_amount", "must be a decimal integer"));
        }
        if !is_decimal_amount(&self.payment.min_staked_amount) {
            return Err(invalid("payment.min_staked_amount", "must be a decimal integer"));
        }

        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigurationError {
    ConfigurationError::Invalid {
        field,
        reason: reason.into(),
    }
}

// uint256 tops out at 78 decimal digits
fn is_decimal_amount(value: &str) -> bool {
    !value.is_empty() && value.len() <= 78 && value.bytes().all(|b| b.is_ascii_digit())
}
