//! Fee estimation types.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Immutable fee estimation snapshot.
///
/// All fee fields are non-negative by construction. `total_cost` is
/// `gas_limit * max(gas_price, max_fee_per_gas)`: the worst-case spend
/// authorized by the quote, not the expected effective cost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeQuote {
	/// Gas limit to authorize, including the configured headroom.
	pub gas_limit: u64,
	/// Legacy gas price in wei, multiplier applied.
	pub gas_price: u128,
	/// Maximum fee per gas in wei (fee-market pricing), multiplier applied.
	pub max_fee_per_gas: u128,
	/// Maximum priority fee per gas in wei, multiplier applied.
	pub max_priority_fee_per_gas: u128,
	/// Worst-case total cost in wei.
	pub total_cost: U256,
	/// Worst-case total cost converted at the reference fiat price.
	pub total_cost_fiat: f64,
}

impl FeeQuote {
	/// The price used for worst-case cost accounting.
	pub fn effective_price(&self) -> u128 {
		self.gas_price.max(self.max_fee_per_gas)
	}
}
