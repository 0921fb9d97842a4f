//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files.
//! Numeric policy knobs are stored as given and resolved through accessor
//! methods that fall back to safe defaults when a value is out of bounds.

use serde::{Deserialize, Serialize};

/// 1 gwei expressed in wei.
const GWEI: u64 = 1_000_000_000;

/// Default gas limit multiplier for plain value transfers.
pub const DEFAULT_GAS_BUFFER_SIMPLE: f64 = 1.1;
/// Default gas limit multiplier for calls carrying a payload.
pub const DEFAULT_GAS_BUFFER_COMPLEX: f64 = 1.2;
/// Accepted range for both gas limit multipliers.
pub const GAS_BUFFER_BOUNDS: (f64, f64) = (0.5, 3.0);

pub const DEFAULT_MAX_FEE_PER_GAS: u64 = 500 * GWEI;
pub const DEFAULT_PRIORITY_FEE_MAINNET: u64 = 2 * GWEI;
pub const DEFAULT_PRIORITY_FEE_BASE: u64 = GWEI;
pub const DEFAULT_PRIORITY_FEE_OTHER: u64 = 15 * GWEI / 10;

pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_CONFIRMATION_INTERVAL_SECS: u64 = 3;

/// Root configuration for the transaction client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Node endpoint and chain identity.
    pub blockchain: BlockchainConfig,

    /// Gas limit estimation policy.
    pub gas: GasConfig,

    /// Fee policy.
    pub fees: FeeConfig,

    /// Confirmation polling.
    pub confirmation: ConfirmationConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Node connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BlockchainConfig {
    /// JSON-RPC endpoint URL. Required.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    pub failover_urls: Vec<String>,

    /// Chain ID (e.g., 1 for Ethereum mainnet, 31337 for local Anvil). Required.
    pub chain_id: u64,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,
}

impl Default for BlockchainConfig {
    fn default() -> Self {
        Self {
            rpc_url: String::new(),
            failover_urls: Vec::new(),
            chain_id: 0,
            rpc_timeout_secs: 10,
        }
    }
}

/// Gas limit buffers, applied to the node's estimate.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GasConfig {
    /// Multiplier for transfers with an empty payload.
    pub simple_buffer: f64,

    /// Multiplier for transactions carrying call data.
    pub complex_buffer: f64,
}

impl GasConfig {
    /// Effective simple buffer; out-of-range values fall back to 1.1.
    pub fn simple_buffer(&self) -> f64 {
        bounded_buffer(self.simple_buffer, DEFAULT_GAS_BUFFER_SIMPLE)
    }

    /// Effective complex buffer; out-of-range values fall back to 1.2.
    pub fn complex_buffer(&self) -> f64 {
        bounded_buffer(self.complex_buffer, DEFAULT_GAS_BUFFER_COMPLEX)
    }
}

fn bounded_buffer(value: f64, default: f64) -> f64 {
    let (min, max) = GAS_BUFFER_BOUNDS;
    if value.is_finite() && (min..=max).contains(&value) {
        value
    } else {
        default
    }
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            simple_buffer: DEFAULT_GAS_BUFFER_SIMPLE,
            complex_buffer: DEFAULT_GAS_BUFFER_COMPLEX,
        }
    }
}

/// Fee policy, all values in wei per gas.
///
/// TOML integers are 64-bit; `FeeEstimator` widens these to `u128`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeeConfig {
    /// Ceiling for max fee per gas (protection against spikes).
    pub max_fee_per_gas: u64,

    /// Fixed tip on Ethereum mainnet (chain 1).
    pub priority_fee_mainnet: u64,

    /// Fixed tip on Base (chain 8453).
    pub priority_fee_base: u64,

    /// Fixed tip on every other chain.
    pub priority_fee_default: u64,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            max_fee_per_gas: DEFAULT_MAX_FEE_PER_GAS,
            priority_fee_mainnet: DEFAULT_PRIORITY_FEE_MAINNET,
            priority_fee_base: DEFAULT_PRIORITY_FEE_BASE,
            priority_fee_default: DEFAULT_PRIORITY_FEE_OTHER,
        }
    }
}

/// Confirmation polling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Total time to wait for a receipt.
    pub timeout_secs: u64,

    /// Delay between receipt lookups.
    pub interval_secs: u64,
}

impl ConfirmationConfig {
    /// Effective timeout; zero falls back to 300.
    pub fn timeout_secs(&self) -> u64 {
        positive_or(self.timeout_secs, DEFAULT_CONFIRMATION_TIMEOUT_SECS)
    }

    /// Effective interval; zero falls back to 3.
    pub fn interval_secs(&self) -> u64 {
        positive_or(self.interval_secs, DEFAULT_CONFIRMATION_INTERVAL_SECS)
    }
}

fn positive_or(value: u64, default: u64) -> u64 {
    if value > 0 {
        value
    } else {
        default
    }
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_CONFIRMATION_TIMEOUT_SECS,
            interval_secs: DEFAULT_CONFIRMATION_INTERVAL_SECS,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}
