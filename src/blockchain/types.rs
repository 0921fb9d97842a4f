//! Chain-specific types and error definitions.

use alloy::primitives::{Address, TxHash};
use thiserror::Error;

/// 1 gwei expressed in wei.
pub const GWEI: u128 = 1_000_000_000;

/// Chain ID of Ethereum mainnet.
pub const MAINNET_CHAIN_ID: u64 = 1;

/// Chain ID of Base.
pub const BASE_CHAIN_ID: u64 = 8453;

/// Errors that can occur during the transaction lifecycle.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// Missing or invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// A node call made by the engine failed.
    #[error("failed to {operation}: {source}")]
    Node {
        operation: &'static str,
        #[source]
        source: Box<BlockchainError>,
    },

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// The node connection has been closed.
    #[error("Blockchain not available: {0}")]
    NotAvailable(String),

    /// Account is missing key material or identity fields.
    #[error("Invalid account: {0}")]
    InvalidAccount(String),

    /// Transaction sender differs from the connected account.
    #[error("Sender {actual} does not match connected account {expected}")]
    SenderMismatch { expected: Address, actual: Address },

    /// Neither fee-market fields nor a legacy gas price ended up populated.
    #[error(
        "transaction must specify either fee-market fields (max fee, max priority fee) or a legacy gas price"
    )]
    MissingFeeSpecification,

    /// Invalid private key format or signing failure.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Buffered gas limit exceeds the share of the block gas limit we allow.
    #[error("Gas limit {gas_limit} exceeds maximum allowed {max_allowed}")]
    GasLimitTooHigh { gas_limit: u64, max_allowed: u64 },

    /// Max fee per gas exceeds the configured ceiling.
    #[error("Max fee too high: {max_fee_per_gas} wei exceeds ceiling {max_allowed} wei")]
    MaxFeeTooHigh {
        max_fee_per_gas: u128,
        max_allowed: u128,
    },

    /// The node has no receipt for this hash (pending or unknown).
    #[error("Transaction not found or pending: {0}")]
    ReceiptNotFound(TxHash),

    /// The node does not know the transaction.
    #[error("Transaction {0} not found")]
    TransactionNotFound(TxHash),

    /// No receipt was observed before the confirmation window closed.
    #[error("Transaction timeout: {tx_hash} not mined within {timeout_secs} seconds")]
    ConfirmationTimeout { tx_hash: TxHash, timeout_secs: u64 },
}

impl BlockchainError {
    /// Wrap a connector failure with the name of the engine operation.
    pub fn during(self, operation: &'static str) -> Self {
        BlockchainError::Node {
            operation,
            source: Box::new(self),
        }
    }

    /// Policy rejections are surfaced for manual adjustment, never clamped.
    pub fn is_policy_violation(&self) -> bool {
        matches!(
            self,
            BlockchainError::GasLimitTooHigh { .. } | BlockchainError::MaxFeeTooHigh { .. }
        )
    }

    /// Transient node errors that a caller may reasonably retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            BlockchainError::Rpc(_) | BlockchainError::Timeout(_) => true,
            BlockchainError::Node { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// A confirmation timeout says nothing about whether the transaction failed.
    pub fn is_inconclusive(&self) -> bool {
        matches!(self, BlockchainError::ConfirmationTimeout { .. })
    }
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;
