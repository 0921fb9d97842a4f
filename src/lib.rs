//! Transaction lifecycle client for fee-market EVM chains.
//!
//! Fills in nonce, gas limit and fees for a transfer intent, signs it,
//! broadcasts it, and tracks it to a receipt under a timeout.

pub mod blockchain;
pub mod config;
pub mod observability;

pub use blockchain::{Account, BlockchainError, TxClient, TxIntent};
pub use config::schema::ClientConfig;
