//! Configuration module for the deployment orchestrator.
//!
//! This module provides structures and utilities for managing orchestrator
//! configuration. It supports loading configuration from TOML files and
//! provides validation to ensure all required configuration values are
//! properly set.

use deployer_types::{parse_address, SecretString};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		let message = err.message().to_string();
		ConfigError::Parse(message)
	}
}

/// Main configuration structure for the deployment orchestrator.
///
/// Contains all configuration sections required for the orchestrator to
/// operate: network access, fee estimation, executor behavior, queue
/// scheduling and alert dispatch.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Network and signer configuration.
	pub network: NetworkConfig,
	/// Fee estimation configuration.
	pub fees: FeeSettings,
	/// Deployment executor configuration.
	pub executor: ExecutorSettings,
	/// Queue scheduling configuration.
	pub queue: QueueSettings,
	/// Alert pipeline configuration.
	#[serde(default)]
	pub alerts: AlertSettings,
}

/// Network access and signer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
	/// HTTP RPC endpoint of the ledger provider.
	pub rpc_url: String,
	/// Chain ID for replay protection.
	pub chain_id: u64,
	/// Private key of the deployer account.
	pub private_key: SecretString,
	/// Factory contract that instantiates binary markets.
	pub market_factory: String,
	/// Factory contract that instantiates copy-trading vaults.
	pub vault_factory: String,
}

/// Fee estimation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeeSettings {
	/// Safety multiplier applied to price/fee fields; must exceed 1.0.
	#[serde(default = "default_price_multiplier")]
	pub price_multiplier: f64,
	/// Headroom multiplier applied to gas-limit estimates.
	#[serde(default = "default_limit_multiplier")]
	pub limit_multiplier: f64,
	/// Lower acceptable gas-price bound, in gwei.
	#[serde(default = "default_min_gas_price_gwei")]
	pub min_gas_price_gwei: f64,
	/// Upper acceptable gas-price bound, in gwei.
	#[serde(default = "default_max_gas_price_gwei")]
	pub max_gas_price_gwei: f64,
	/// Reference fiat price of the native token, used for budget checks.
	#[serde(default = "default_reference_fiat_price")]
	pub reference_fiat_price: f64,
	/// Gas limit used when estimation fails (e.g. the call would revert).
	#[serde(default = "default_gas_limit")]
	pub default_gas_limit: u64,
}

/// Deployment executor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutorSettings {
	/// Maximum seconds to wait for confirmation of one deployment.
	#[serde(default = "default_timeout_seconds")]
	pub timeout_seconds: u64,
	/// Confirmations required before a deployment counts as final.
	#[serde(default = "default_confirmation_blocks")]
	pub confirmation_blocks: u64,
	/// Interval between receipt polls, in seconds.
	#[serde(default = "default_poll_interval_secs")]
	pub poll_interval_secs: u64,
	/// Bounded attempts for the submission RPC itself.
	#[serde(default = "default_submit_attempts")]
	pub submit_attempts: u32,
	/// Oracle addresses allowed to resolve markets.
	#[serde(default)]
	pub oracle_whitelist: Vec<String>,
}

/// Queue scheduling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueSettings {
	/// Maximum jobs pulled per processing pass.
	#[serde(default = "default_batch_size")]
	pub batch_size: usize,
	/// Retry budget for each job.
	#[serde(default = "default_max_retries")]
	pub max_retries: u32,
	/// Base delay for exponential backoff, in milliseconds.
	#[serde(default = "default_retry_delay_ms")]
	pub retry_delay_ms: u64,
	/// Interval between queue processing passes, in seconds.
	#[serde(default = "default_process_interval_secs")]
	pub process_interval_secs: u64,
}

/// Alert pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlertSettings {
	/// Window during which repeated identical alerts are suppressed, in
	/// milliseconds.
	#[serde(default = "default_dedup_window_ms")]
	pub dedup_window_ms: u64,
	/// Optional webhook endpoint for chat notifications.
	#[serde(default)]
	pub chat_webhook_url: Option<String>,
}

impl Default for AlertSettings {
	fn default() -> Self {
		Self {
			dedup_window_ms: default_dedup_window_ms(),
			chat_webhook_url: None,
		}
	}
}

fn default_price_multiplier() -> f64 {
	1.2
}

fn default_limit_multiplier() -> f64 {
	1.25
}

fn default_min_gas_price_gwei() -> f64 {
	1.0
}

fn default_max_gas_price_gwei() -> f64 {
	500.0
}

fn default_reference_fiat_price() -> f64 {
	3000.0
}

fn default_gas_limit() -> u64 {
	3_000_000
}

fn default_timeout_seconds() -> u64 {
	180
}

fn default_confirmation_blocks() -> u64 {
	2
}

fn default_poll_interval_secs() -> u64 {
	5
}

fn default_submit_attempts() -> u32 {
	3
}

fn default_batch_size() -> usize {
	5
}

fn default_max_retries() -> u32 {
	3
}

fn default_retry_delay_ms() -> u64 {
	1_000
}

fn default_process_interval_secs() -> u64 {
	30
}

fn default_dedup_window_ms() -> u64 {
	60_000
}

impl Config {
	/// Loads configuration from a TOML file.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let contents = std::fs::read_to_string(path)?;
		Self::from_toml_str(&contents)
	}

	/// Parses configuration from a TOML string and validates it.
	pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
		let config: Config = toml::from_str(contents)?;
		config.validate()?;
		Ok(config)
	}

	/// Validates cross-field constraints that serde cannot express.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.network.rpc_url.is_empty() {
			return Err(ConfigError::Validation("rpc_url must not be empty".into()));
		}
		if self.network.chain_id == 0 {
			return Err(ConfigError::Validation("chain_id must be non-zero".into()));
		}
		parse_address(&self.network.market_factory)
			.map_err(|e| ConfigError::Validation(format!("market_factory: {}", e)))?;
		parse_address(&self.network.vault_factory)
			.map_err(|e| ConfigError::Validation(format!("vault_factory: {}", e)))?;

		if self.fees.price_multiplier <= 1.0 {
			return Err(ConfigError::Validation(
				"price_multiplier must exceed 1.0".into(),
			));
		}
		if self.fees.limit_multiplier < 1.0 {
			return Err(ConfigError::Validation(
				"limit_multiplier must be at least 1.0".into(),
			));
		}
		if self.fees.min_gas_price_gwei <= 0.0
			|| self.fees.max_gas_price_gwei <= self.fees.min_gas_price_gwei
		{
			return Err(ConfigError::Validation(
				"gas price bounds must satisfy 0 < min < max".into(),
			));
		}
		if self.fees.default_gas_limit == 0 {
			return Err(ConfigError::Validation(
				"default_gas_limit must be non-zero".into(),
			));
		}

		if self.executor.timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"timeout_seconds must be non-zero".into(),
			));
		}
		if self.executor.confirmation_blocks == 0 {
			return Err(ConfigError::Validation(
				"confirmation_blocks must be non-zero".into(),
			));
		}
		if self.executor.poll_interval_secs == 0 {
			return Err(ConfigError::Validation(
				"poll_interval_secs must be non-zero".into(),
			));
		}
		if self.executor.submit_attempts == 0 {
			return Err(ConfigError::Validation(
				"submit_attempts must be non-zero".into(),
			));
		}
		for entry in &self.executor.oracle_whitelist {
			parse_address(entry)
				.map_err(|e| ConfigError::Validation(format!("oracle_whitelist: {}", e)))?;
		}

		if self.queue.batch_size == 0 {
			return Err(ConfigError::Validation("batch_size must be non-zero".into()));
		}
		if self.queue.process_interval_secs == 0 {
			return Err(ConfigError::Validation(
				"process_interval_secs must be non-zero".into(),
			));
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn base_toml() -> String {
		r#"
			[network]
			rpc_url = "http://localhost:8545"
			chain_id = 31337
			private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
			market_factory = "0x1111111111111111111111111111111111111111"
			vault_factory = "0x2222222222222222222222222222222222222222"

			[fees]

			[executor]
			oracle_whitelist = ["0x3333333333333333333333333333333333333333"]

			[queue]
		"#
		.to_string()
	}

	#[test]
	fn test_parse_with_defaults() {
		let config = Config::from_toml_str(&base_toml()).unwrap();
		assert_eq!(config.fees.price_multiplier, 1.2);
		assert_eq!(config.fees.max_gas_price_gwei, 500.0);
		assert_eq!(config.executor.confirmation_blocks, 2);
		assert_eq!(config.queue.batch_size, 5);
		assert_eq!(config.queue.process_interval_secs, 30);
		assert_eq!(config.alerts.dedup_window_ms, 60_000);
	}

	#[test]
	fn test_rejects_price_multiplier_at_one() {
		let toml = base_toml().replace("[fees]", "[fees]\nprice_multiplier = 1.0");
		let err = Config::from_toml_str(&toml).unwrap_err();
		assert!(err.to_string().contains("price_multiplier"));
	}

	#[test]
	fn test_rejects_inverted_price_bounds() {
		let toml = base_toml().replace(
			"[fees]",
			"[fees]\nmin_gas_price_gwei = 10.0\nmax_gas_price_gwei = 5.0",
		);
		let err = Config::from_toml_str(&toml).unwrap_err();
		assert!(err.to_string().contains("gas price bounds"));
	}

	#[test]
	fn test_rejects_malformed_whitelist_entry() {
		let toml = base_toml().replace(
			"oracle_whitelist = [\"0x3333333333333333333333333333333333333333\"]",
			"oracle_whitelist = [\"0x1234\"]",
		);
		let err = Config::from_toml_str(&toml).unwrap_err();
		assert!(err.to_string().contains("oracle_whitelist"));
	}

	#[test]
	fn test_rejects_zero_batch_size() {
		let toml = base_toml().replace("[queue]", "[queue]\nbatch_size = 0");
		let err = Config::from_toml_str(&toml).unwrap_err();
		assert!(err.to_string().contains("batch_size"));
	}

	#[test]
	fn test_private_key_is_redacted_in_debug() {
		let config = Config::from_toml_str(&base_toml()).unwrap();
		let debug = format!("{:?}", config.network);
		assert!(!debug.contains("ac0974be"));
	}
}
