//! Configuration validation.
//!
//! Semantic checks only (serde handles syntax). Returns every problem, not
//! just the first, so a broken deployment can be fixed in one pass.

use thiserror::Error;

use crate::config::schema::ClientConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("blockchain.rpc_url is required")]
    MissingRpcUrl,

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("blockchain.chain_id is required and must be non-zero")]
    MissingChainId,

    #[error("blockchain.rpc_timeout_secs must be greater than zero")]
    ZeroRpcTimeout,
}

/// Validate a configuration before it is accepted.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let chain = &config.blockchain;

    if chain.rpc_url.trim().is_empty() {
        errors.push(ValidationError::MissingRpcUrl);
    } else if let Err(e) = chain.rpc_url.parse::<url::Url>() {
        errors.push(ValidationError::InvalidUrl {
            url: chain.rpc_url.clone(),
            reason: e.to_string(),
        });
    }

    for failover in &chain.failover_urls {
        if let Err(e) = failover.parse::<url::Url>() {
            errors.push(ValidationError::InvalidUrl {
                url: failover.clone(),
                reason: e.to_string(),
            });
        }
    }

    if chain.chain_id == 0 {
        errors.push(ValidationError::MissingChainId);
    }

    if chain.rpc_timeout_secs == 0 {
        errors.push(ValidationError::ZeroRpcTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
