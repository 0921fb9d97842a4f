//! Transaction lifecycle engine.
//!
//! # Data Flow
//! ```text
//! TxIntent (partially filled by the caller)
//!     → transaction.rs (nonce, gas limit, fees, sign)
//!         ↳ fees.rs (gas buffer + block cap, fee-market or legacy pricing)
//!     → broadcast.rs (send, pending receipt)
//!     → confirmation.rs (poll until mined or timeout)
//!         ↳ receipt.rs (normalize node receipt + transaction)
//! ```
//!
//! Every node call goes through the `NodeConnector` trait in connector.rs;
//! client.rs is the alloy-backed implementation.
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod broadcast;
pub mod client;
pub mod confirmation;
pub mod connector;
pub mod engine;
pub mod fees;
pub mod receipt;
pub mod transaction;
pub mod types;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;

pub use client::RpcNodeClient;
pub use connector::NodeConnector;
pub use engine::TxClient;
pub use receipt::{TransactionReceipt, TxStatus};
pub use transaction::{SignedTransaction, TxIntent};
pub use types::{BlockchainError, BlockchainResult};
pub use wallet::Account;
