//! Utility functions for common type conversions and transformations.
//!
//! This module provides helper functions for converting between different
//! data formats and string formatting commonly used throughout the
//! orchestration system.

pub mod builders;

use crate::chain::Address;

/// One gwei in wei.
pub const GWEI: u128 = 1_000_000_000;

/// One ether in wei, as a float for fiat conversion.
const WEI_PER_ETH: f64 = 1e18;

/// Returns the current unix timestamp in seconds.
pub fn current_timestamp() -> u64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.unwrap_or_default()
		.as_secs()
}

/// Utility function to truncate an identifier for display purposes.
///
/// Shows only the first 8 characters followed by ".." for longer strings.
pub fn truncate_id(id: &str) -> String {
	if id.len() <= 8 {
		id.to_string()
	} else {
		format!("{}..", &id[..8])
	}
}

/// Adds "0x" prefix to a hex string if it doesn't already have one.
pub fn with_0x_prefix(hex_str: &str) -> String {
	if hex_str.to_lowercase().starts_with("0x") {
		hex_str.to_string()
	} else {
		format!("0x{}", hex_str)
	}
}

/// Removes "0x" prefix from a hex string if present.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}

/// Parse a hex string address into the orchestrator [`Address`] type.
///
/// Accepts strings with or without "0x" prefix; requires exactly 20 bytes.
pub fn parse_address(hex_str: &str) -> Result<Address, String> {
	let hex = without_0x_prefix(hex_str);
	hex::decode(hex)
		.map_err(|e| format!("Invalid hex: {}", e))
		.and_then(|bytes| {
			if bytes.len() != 20 {
				Err(format!(
					"Invalid address length: expected 20 bytes, got {}",
					bytes.len()
				))
			} else {
				Ok(Address(bytes))
			}
		})
}

/// Converts a gwei amount to wei.
pub fn gwei_to_wei(gwei: f64) -> u128 {
	(gwei * GWEI as f64) as u128
}

/// Converts a wei amount to a fractional ether value for fiat conversion.
///
/// Precision loss above 2^53 wei is acceptable here: the result feeds a
/// fiat estimate, not on-chain accounting.
pub fn wei_to_eth(wei: u128) -> f64 {
	wei as f64 / WEI_PER_ETH
}
