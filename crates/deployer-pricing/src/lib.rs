//! Fee estimation for the deployment orchestrator.
//!
//! This module converts raw provider fee data into bounded, safety-margined
//! quotes for deployment transactions, and provides the budget and
//! gas-price validity checks used by callers before submission.

use alloy_primitives::U256;
use deployer_delivery::{ChainProvider, DeliveryError};
use deployer_types::{gwei_to_wei, wei_to_eth, FeeQuote, Transaction};
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Errors that can occur during fee estimation.
///
/// Estimation failures are non-retryable within the same quote call;
/// callers retry at a higher level.
#[derive(Debug, Error)]
pub enum EstimationError {
	/// The provider could not supply fee data at all.
	#[error("Fee data unavailable: {0}")]
	Unavailable(#[from] DeliveryError),
	/// The provider response lacked the fee-market fields.
	#[error("Fee-market fields missing from provider response")]
	MissingFeeMarket,
}

/// Configuration for fee estimation.
///
/// Held by the estimator behind explicit getters and setters; there is no
/// process-wide state.
#[derive(Debug, Clone)]
pub struct FeeConfig {
	/// Safety multiplier applied to price/fee fields; must exceed 1.0.
	pub price_multiplier: f64,
	/// Headroom multiplier applied to gas-limit estimates.
	pub limit_multiplier: f64,
	/// Lower acceptable gas-price bound, in wei.
	pub min_gas_price_wei: u128,
	/// Upper acceptable gas-price bound, in wei.
	pub max_gas_price_wei: u128,
	/// Reference fiat price of the native token.
	pub reference_fiat_price: f64,
	/// Gas limit used when estimation fails.
	pub default_gas_limit: u64,
}

impl FeeConfig {
	/// Builds a config from gwei-denominated bounds.
	pub fn with_gwei_bounds(
		price_multiplier: f64,
		limit_multiplier: f64,
		min_gas_price_gwei: f64,
		max_gas_price_gwei: f64,
		reference_fiat_price: f64,
		default_gas_limit: u64,
	) -> Self {
		Self {
			price_multiplier,
			limit_multiplier,
			min_gas_price_wei: gwei_to_wei(min_gas_price_gwei),
			max_gas_price_wei: gwei_to_wei(max_gas_price_gwei),
			reference_fiat_price,
			default_gas_limit,
		}
	}
}

/// Service that produces fee quotes for deployment transactions.
pub struct FeeEstimator {
	/// The ledger provider queried for base fee data and gas estimates.
	provider: Arc<dyn ChainProvider>,
	/// Estimation configuration.
	config: RwLock<FeeConfig>,
}

impl FeeEstimator {
	/// Creates a new FeeEstimator with the specified provider and config.
	pub fn new(provider: Arc<dyn ChainProvider>, config: FeeConfig) -> Self {
		Self {
			provider,
			config: RwLock::new(config),
		}
	}

	/// Returns a snapshot of the current configuration.
	pub fn config(&self) -> FeeConfig {
		match self.config.read() {
			Ok(config) => config.clone(),
			Err(poisoned) => poisoned.into_inner().clone(),
		}
	}

	fn update_config(&self, apply: impl FnOnce(&mut FeeConfig)) {
		let mut config = match self.config.write() {
			Ok(config) => config,
			Err(poisoned) => poisoned.into_inner(),
		};
		apply(&mut config);
	}

	/// Replaces the price multiplier.
	pub fn set_price_multiplier(&self, multiplier: f64) {
		self.update_config(|config| config.price_multiplier = multiplier);
	}

	/// Replaces the gas-limit multiplier.
	pub fn set_limit_multiplier(&self, multiplier: f64) {
		self.update_config(|config| config.limit_multiplier = multiplier);
	}

	/// Replaces the reference fiat price.
	pub fn set_reference_fiat_price(&self, price: f64) {
		self.update_config(|config| config.reference_fiat_price = price);
	}

	/// Replaces the acceptable gas-price bounds, in wei.
	pub fn set_price_bounds(&self, min_wei: u128, max_wei: u128) {
		self.update_config(|config| {
			config.min_gas_price_wei = min_wei;
			config.max_gas_price_wei = max_wei;
		});
	}

	/// Produces a fee quote for the given transaction.
	///
	/// Applies the configured safety multipliers with ceiling rounding,
	/// clamps prices into the configured bounds, and falls back to the
	/// default gas limit when estimation fails (a reverting estimate call
	/// must not block deployment; conservative headroom is preferable).
	pub async fn quote(&self, tx: &Transaction) -> Result<FeeQuote, EstimationError> {
		let config = self.config();
		let fee_data = self.provider.fee_data().await?;

		let (max_fee, max_priority) = match (
			fee_data.max_fee_per_gas,
			fee_data.max_priority_fee_per_gas,
		) {
			(Some(max_fee), Some(max_priority)) => (max_fee, max_priority),
			_ => return Err(EstimationError::MissingFeeMarket),
		};

		let gas_price = self.bounded_price(mul_ceil(fee_data.gas_price, config.price_multiplier));
		let max_fee_per_gas = self.bounded_price(mul_ceil(max_fee, config.price_multiplier));
		let max_priority_fee_per_gas = mul_ceil(max_priority, config.price_multiplier);

		let gas_limit = match self.provider.estimate_gas(tx).await {
			Ok(estimate) => mul_ceil(estimate as u128, config.limit_multiplier) as u64,
			Err(e) => {
				tracing::warn!(
					default_gas_limit = config.default_gas_limit,
					"Gas estimation failed, using default limit: {}",
					e
				);
				config.default_gas_limit
			},
		};

		let effective_price = gas_price.max(max_fee_per_gas);
		let total_cost = U256::from(gas_limit) * U256::from(effective_price);
		let total_cost_fiat =
			wei_to_eth(effective_price.saturating_mul(gas_limit as u128)) * config.reference_fiat_price;

		Ok(FeeQuote {
			gas_limit,
			gas_price,
			max_fee_per_gas,
			max_priority_fee_per_gas,
			total_cost,
			total_cost_fiat,
		})
	}

	/// Whether a gas price falls within the configured acceptable bounds.
	///
	/// Quotes clamp out-of-range prices; this check exists so callers can
	/// surface the misconfiguration instead of relying on the clamp.
	pub fn is_valid_gas_price(&self, price_wei: u128) -> bool {
		let config = self.config();
		price_wei >= config.min_gas_price_wei && price_wei <= config.max_gas_price_wei
	}

	/// Whether a quote's fiat cost fits within the given budget.
	///
	/// Exact at the boundary: a quote costing exactly the budget fits.
	pub fn is_within_budget(quote: &FeeQuote, budget_fiat: f64) -> bool {
		quote.total_cost_fiat <= budget_fiat
	}

	fn bounded_price(&self, price_wei: u128) -> u128 {
		let config = self.config();
		let clamped = price_wei.clamp(config.min_gas_price_wei, config.max_gas_price_wei);
		if clamped != price_wei {
			tracing::warn!(
				price_wei,
				min = config.min_gas_price_wei,
				max = config.max_gas_price_wei,
				"Gas price outside configured bounds, clamping"
			);
		}
		clamped
	}
}

/// Multiplies an integer amount by a float factor, rounding up.
///
/// Ceiling rounding avoids under-provisioning fees and gas.
fn mul_ceil(value: u128, multiplier: f64) -> u128 {
	(value as f64 * multiplier).ceil() as u128
}

#[cfg(test)]
mod tests {
	use super::*;
	use deployer_delivery::MockChainProvider;
	use deployer_types::utils::builders::TransactionBuilder;
	use deployer_types::{FeeData, GWEI};

	fn test_config() -> FeeConfig {
		FeeConfig::with_gwei_bounds(1.2, 1.25, 1.0, 500.0, 3000.0, 3_000_000)
	}

	fn provider_with_fees(gas_price: u128, max_fee: Option<u128>) -> MockChainProvider {
		let mut provider = MockChainProvider::new();
		provider.expect_fee_data().returning(move || {
			Box::pin(async move {
				Ok(FeeData {
					gas_price,
					max_fee_per_gas: max_fee,
					max_priority_fee_per_gas: max_fee.map(|_| 2 * GWEI),
				})
			})
		});
		provider
	}

	fn mock_gas_estimate(provider: &mut MockChainProvider, gas: u64) {
		provider
			.expect_estimate_gas()
			.returning(move |_| Box::pin(async move { Ok(gas) }));
	}

	#[tokio::test]
	async fn test_quote_applies_ceiling_multiplier() {
		let mut provider = provider_with_fees(10 * GWEI + 1, Some(10 * GWEI));
		mock_gas_estimate(&mut provider, 100_000);

		let estimator = FeeEstimator::new(Arc::new(provider), test_config());
		let quote = estimator
			.quote(&TransactionBuilder::new().build())
			.await
			.unwrap();

		// ceil((10 gwei + 1) * 1.2) and ceil(100_000 * 1.25)
		assert_eq!(quote.gas_price, 12_000_000_002);
		assert_eq!(quote.max_fee_per_gas, 12 * GWEI);
		assert_eq!(quote.gas_limit, 125_000);
	}

	#[tokio::test]
	async fn test_quote_is_monotonic_in_base_price() {
		for (low, high) in [(GWEI, 2 * GWEI), (7 * GWEI, 70 * GWEI)] {
			let mut provider_low = provider_with_fees(low, Some(low));
			mock_gas_estimate(&mut provider_low, 21_000);
			let mut provider_high = provider_with_fees(high, Some(high));
			mock_gas_estimate(&mut provider_high, 21_000);

			let tx = TransactionBuilder::new().build();
			let quote_low = FeeEstimator::new(Arc::new(provider_low), test_config())
				.quote(&tx)
				.await
				.unwrap();
			let quote_high = FeeEstimator::new(Arc::new(provider_high), test_config())
				.quote(&tx)
				.await
				.unwrap();

			assert!(quote_low.gas_price < quote_high.gas_price);
			assert!(quote_low.total_cost < quote_high.total_cost);
		}
	}

	#[tokio::test]
	async fn test_quote_falls_back_to_default_limit() {
		let mut provider = provider_with_fees(10 * GWEI, Some(10 * GWEI));
		provider.expect_estimate_gas().returning(|_| {
			Box::pin(async { Err(DeliveryError::Network("execution reverted".to_string())) })
		});

		let estimator = FeeEstimator::new(Arc::new(provider), test_config());
		let quote = estimator
			.quote(&TransactionBuilder::new().build())
			.await
			.unwrap();

		assert_eq!(quote.gas_limit, 3_000_000);
	}

	#[tokio::test]
	async fn test_quote_fails_without_fee_market_fields() {
		let provider = provider_with_fees(10 * GWEI, None);

		let estimator = FeeEstimator::new(Arc::new(provider), test_config());
		let result = estimator.quote(&TransactionBuilder::new().build()).await;

		assert!(matches!(result, Err(EstimationError::MissingFeeMarket)));
	}

	#[tokio::test]
	async fn test_quote_clamps_to_max_bound() {
		// 600 gwei * 1.2 is far above the 500 gwei ceiling
		let mut provider = provider_with_fees(600 * GWEI, Some(600 * GWEI));
		mock_gas_estimate(&mut provider, 21_000);

		let estimator = FeeEstimator::new(Arc::new(provider), test_config());
		let quote = estimator
			.quote(&TransactionBuilder::new().build())
			.await
			.unwrap();

		assert_eq!(quote.gas_price, 500 * GWEI);
		assert_eq!(quote.max_fee_per_gas, 500 * GWEI);
	}

	#[test]
	fn test_is_valid_gas_price_at_bounds() {
		let estimator = FeeEstimator::new(Arc::new(MockChainProvider::new()), test_config());

		// Bounds are [1, 500] gwei, inclusive
		assert!(!estimator.is_valid_gas_price(GWEI / 2));
		assert!(estimator.is_valid_gas_price(GWEI));
		assert!(estimator.is_valid_gas_price(500 * GWEI));
		assert!(!estimator.is_valid_gas_price(500 * GWEI + 1));
	}

	#[test]
	fn test_is_within_budget_exact_at_boundary() {
		let quote = FeeQuote {
			gas_limit: 21_000,
			gas_price: 10 * GWEI,
			max_fee_per_gas: 10 * GWEI,
			max_priority_fee_per_gas: 2 * GWEI,
			total_cost: U256::from(21_000u64) * U256::from(10 * GWEI),
			total_cost_fiat: 50.0,
		};

		assert!(FeeEstimator::is_within_budget(&quote, 50.0));
		assert!(FeeEstimator::is_within_budget(&quote, 50.01));
		assert!(!FeeEstimator::is_within_budget(&quote, 49.99));
	}

	#[test]
	fn test_setters_update_config() {
		let estimator = FeeEstimator::new(Arc::new(MockChainProvider::new()), test_config());

		estimator.set_price_multiplier(1.5);
		estimator.set_reference_fiat_price(2500.0);
		estimator.set_price_bounds(2 * GWEI, 100 * GWEI);

		let config = estimator.config();
		assert_eq!(config.price_multiplier, 1.5);
		assert_eq!(config.reference_fiat_price, 2500.0);
		assert!(!estimator.is_valid_gas_price(GWEI));
		assert!(estimator.is_valid_gas_price(50 * GWEI));
	}

	#[test]
	fn test_mul_ceil_rounds_up() {
		assert_eq!(mul_ceil(10, 1.2), 12);
		assert_eq!(mul_ceil(11, 1.2), 14); // 13.2 rounds up
		assert_eq!(mul_ceil(0, 1.2), 0);
	}
}
