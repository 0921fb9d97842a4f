//! Gas limit and fee policy.
//!
//! # Responsibilities
//! - Buffer the node's gas estimate and cap it at 2/3 of the block gas limit
//! - Price fee-market transactions from the latest base fee and a per-chain tip
//! - Fall back to the node's suggested gas price on legacy networks
//! - Reject max fees above the configured ceiling
//!
//! Policy violations are returned to the caller, never clamped.

use crate::blockchain::connector::{GasEstimateRequest, NodeConnector};
use crate::blockchain::transaction::TxIntent;
use crate::blockchain::types::{BlockchainError, BlockchainResult, BASE_CHAIN_ID, MAINNET_CHAIN_ID};
use crate::config::schema::{FeeConfig, GasConfig};
use crate::observability::metrics;

/// Numerator/denominator of the share of the block gas limit one transaction may claim.
const BLOCK_GAS_SHARE: (u64, u64) = (2, 3);

/// Fee and gas limit policy resolved from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FeeEstimator {
    simple_buffer: f64,
    complex_buffer: f64,
    max_fee_per_gas: u128,
    priority_fee_mainnet: u128,
    priority_fee_base: u128,
    priority_fee_default: u128,
}

impl FeeEstimator {
    pub fn new(gas: &GasConfig, fees: &FeeConfig) -> Self {
        Self {
            simple_buffer: gas.simple_buffer(),
            complex_buffer: gas.complex_buffer(),
            max_fee_per_gas: u128::from(fees.max_fee_per_gas),
            priority_fee_mainnet: u128::from(fees.priority_fee_mainnet),
            priority_fee_base: u128::from(fees.priority_fee_base),
            priority_fee_default: u128::from(fees.priority_fee_default),
        }
    }

    /// Multiplier for an intent: simple for empty payloads, complex otherwise.
    pub fn buffer_for(&self, intent: &TxIntent) -> f64 {
        if intent.is_simple_transfer() {
            self.simple_buffer
        } else {
            self.complex_buffer
        }
    }

    /// Configured ceiling for max fee per gas, in wei.
    pub fn max_fee_ceiling(&self) -> u128 {
        self.max_fee_per_gas
    }

    /// Fixed tip for `chain_id`.
    pub fn priority_fee_for(&self, chain_id: u64) -> u128 {
        match chain_id {
            MAINNET_CHAIN_ID => self.priority_fee_mainnet,
            BASE_CHAIN_ID => self.priority_fee_base,
            _ => self.priority_fee_default,
        }
    }

    /// Estimate a buffered gas limit for `intent`.
    ///
    /// The block cap is skipped when the latest header cannot be fetched.
    pub async fn estimate_gas_limit(
        &self,
        node: &dyn NodeConnector,
        intent: &TxIntent,
    ) -> BlockchainResult<u64> {
        let request = GasEstimateRequest {
            from: intent.from.unwrap_or_default(),
            to: intent.to,
            value: intent.value,
            data: intent.data.clone(),
        };
        let estimate = node
            .estimate_gas(&request)
            .await
            .map_err(|e| e.during("estimate gas"))?;

        let buffer = self.buffer_for(intent);
        let gas_limit = apply_buffer(estimate, buffer);

        match node.latest_header().await {
            Ok(header) if header.gas_limit > 0 => {
                let max_allowed = block_gas_cap(header.gas_limit);
                if gas_limit > max_allowed {
                    metrics::record_policy_rejection("gas_limit");
                    return Err(BlockchainError::GasLimitTooHigh {
                        gas_limit,
                        max_allowed,
                    });
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Latest header unavailable, skipping block gas cap");
            }
        }

        tracing::debug!(estimate, buffer, gas_limit, "Gas limit estimated");
        Ok(gas_limit)
    }

    /// Fill in the pricing fields of `intent` and validate the result.
    ///
    /// Fee-market pricing applies when the latest header carries a base fee
    /// and the intent does not already hold both fee-market fields. It
    /// overwrites both fields and clears any legacy gas price. Otherwise a
    /// missing gas price is taken from the node's suggestion.
    pub async fn compute_fees(
        &self,
        node: &dyn NodeConnector,
        chain_id: u64,
        intent: &mut TxIntent,
    ) -> BlockchainResult<()> {
        let header = node
            .latest_header()
            .await
            .map_err(|e| e.during("get latest header"))?;

        match header.base_fee_per_gas {
            Some(base_fee) if !intent.has_fee_market_fields() => {
                let priority_fee = self.priority_fee_for(chain_id);
                let max_fee = base_fee.saturating_mul(2).saturating_add(priority_fee);

                intent.max_priority_fee_per_gas = Some(priority_fee);
                intent.max_fee_per_gas = Some(max_fee);
                intent.gas_price = None;

                tracing::debug!(
                    chain_id,
                    base_fee,
                    priority_fee,
                    max_fee,
                    "Fee-market pricing applied"
                );
            }
            _ => {
                if intent.gas_price.is_none() && !intent.has_fee_market_fields() {
                    let gas_price = node
                        .suggest_gas_price()
                        .await
                        .map_err(|e| e.during("suggest gas price"))?;
                    intent.gas_price = Some(gas_price);
                    tracing::debug!(chain_id, gas_price, "Legacy pricing applied");
                }
            }
        }

        self.validate_fees(intent)
    }

    /// Reject a max fee per gas above the ceiling.
    pub fn validate_fees(&self, intent: &TxIntent) -> BlockchainResult<()> {
        match intent.max_fee_per_gas {
            Some(max_fee_per_gas) if max_fee_per_gas > self.max_fee_per_gas => {
                metrics::record_policy_rejection("max_fee");
                Err(BlockchainError::MaxFeeTooHigh {
                    max_fee_per_gas,
                    max_allowed: self.max_fee_per_gas,
                })
            }
            _ => Ok(()),
        }
    }
}

impl Default for FeeEstimator {
    fn default() -> Self {
        Self::new(&GasConfig::default(), &FeeConfig::default())
    }
}

/// `estimate × buffer`, truncated.
pub fn apply_buffer(estimate: u64, buffer: f64) -> u64 {
    (estimate as f64 * buffer) as u64
}

/// Largest gas limit accepted for a block with `block_gas_limit`.
pub fn block_gas_cap(block_gas_limit: u64) -> u64 {
    let (num, den) = BLOCK_GAS_SHARE;
    block_gas_limit.saturating_mul(num) / den
}
