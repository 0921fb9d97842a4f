//! Accounts and key material.
//!
//! # Security
//! - Private keys are loaded ONLY from environment variables
//! - Keys are never logged or serialized
//! - An account with only a public key is read-only

use std::str::FromStr;

use alloy::primitives::{hex, keccak256, Address};
use alloy::signers::local::PrivateKeySigner;
use k256::ecdsa::VerifyingKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;

use crate::blockchain::types::{BlockchainError, BlockchainResult};

/// Comma-separated list of account labels.
pub const ACCOUNTS_ENV_VAR: &str = "ETH_ACCOUNTS";

/// Identity used for signing and as the default sender.
#[derive(Clone)]
pub struct Account {
    address: Address,
    public_key: Option<VerifyingKey>,
    chain_id: u64,
    label: Option<String>,
    /// `None` for read-only accounts.
    signer: Option<PrivateKeySigner>,
}

impl Account {
    /// Create a signing account from a hex-encoded private key (with or without 0x).
    pub fn from_private_key(private_key_hex: &str, chain_id: u64) -> BlockchainResult<Self> {
        let key_hex = private_key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer = PrivateKeySigner::from_str(key_hex)
            .map_err(|e| BlockchainError::Wallet(format!("Invalid private key format: {}", e)))?;
        let public_key = signer.credential().verifying_key().clone();

        Ok(Self {
            address: signer.address(),
            public_key: Some(public_key),
            chain_id,
            label: None,
            signer: Some(signer),
        })
    }

    /// Create a read-only account from a hex-encoded public key.
    ///
    /// Accepts SEC1 encodings (compressed or uncompressed) and the raw
    /// 64-byte `x || y` form.
    pub fn from_public_key(public_key_hex: &str, chain_id: u64) -> BlockchainResult<Self> {
        let key_hex = public_key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);
        let mut bytes = hex::decode(key_hex)
            .map_err(|e| BlockchainError::Wallet(format!("Invalid public key hex: {}", e)))?;
        if bytes.len() == 64 {
            bytes.insert(0, 0x04);
        }

        let public_key = VerifyingKey::from_sec1_bytes(&bytes)
            .map_err(|e| BlockchainError::Wallet(format!("Invalid public key: {}", e)))?;

        Ok(Self {
            address: public_key_to_address(&public_key),
            public_key: Some(public_key),
            chain_id,
            label: None,
            signer: None,
        })
    }

    /// Attach a human-readable label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn public_key(&self) -> Option<&VerifyingKey> {
        self.public_key.as_ref()
    }

    /// True when the account holds no private key.
    pub fn is_read_only(&self) -> bool {
        self.signer.is_none()
    }

    /// Check every field a signing account needs and hand out the signer.
    pub fn signing_key(&self) -> BlockchainResult<&PrivateKeySigner> {
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| BlockchainError::InvalidAccount("account private key is not set".into()))?;
        if self.public_key.is_none() {
            return Err(BlockchainError::InvalidAccount("account public key is not set".into()));
        }
        if self.address == Address::ZERO {
            return Err(BlockchainError::InvalidAccount("account address is not set".into()));
        }
        if self.chain_id == 0 {
            return Err(BlockchainError::InvalidAccount("account chain ID is not set".into()));
        }
        Ok(signer)
    }

    /// Load every account listed in `ETH_ACCOUNTS` from the process environment.
    pub fn load_all_from_env(chain_id: u64) -> BlockchainResult<Vec<Self>> {
        Self::load_all(|name| std::env::var(name).ok(), chain_id)
    }

    /// Load accounts through an arbitrary variable lookup.
    ///
    /// For each label `L`, reads `ETH_ACCOUNT_<L>_PRIVATE_KEY` and falls back
    /// to `ETH_ACCOUNT_<L>_PUBLIC_KEY`.
    pub fn load_all<F>(lookup: F, chain_id: u64) -> BlockchainResult<Vec<Self>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let labels = lookup(ACCOUNTS_ENV_VAR)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| BlockchainError::Config(format!("{} env variable not set", ACCOUNTS_ENV_VAR)))?;

        let mut accounts = Vec::new();
        for label in labels.split(',').map(str::trim).filter(|l| !l.is_empty()) {
            let upper = label.to_uppercase();
            let private_key = lookup(&format!("ETH_ACCOUNT_{}_PRIVATE_KEY", upper)).filter(|v| !v.is_empty());
            let public_key = lookup(&format!("ETH_ACCOUNT_{}_PUBLIC_KEY", upper)).filter(|v| !v.is_empty());

            let account = match (private_key, public_key) {
                (Some(private_key), _) => Self::from_private_key(&private_key, chain_id).map_err(|e| {
                    BlockchainError::InvalidAccount(format!("invalid private key for {}: {}", label, e))
                })?,
                (None, Some(public_key)) => Self::from_public_key(&public_key, chain_id).map_err(|e| {
                    BlockchainError::InvalidAccount(format!("invalid public key for {}: {}", label, e))
                })?,
                (None, None) => {
                    return Err(BlockchainError::InvalidAccount(format!(
                        "no private or public key found for account[{}] in environment variables",
                        label
                    )))
                }
            };

            tracing::info!(
                label = label,
                address = %account.address(),
                read_only = account.is_read_only(),
                "Account loaded"
            );
            accounts.push(account.with_label(label));
        }

        if accounts.is_empty() {
            return Err(BlockchainError::Config(format!(
                "no accounts found in {} environment variable",
                ACCOUNTS_ENV_VAR
            )));
        }
        Ok(accounts)
    }
}

/// Keccak-256 of the uncompressed point, last 20 bytes.
fn public_key_to_address(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    Address::from_slice(&keccak256(&point.as_bytes()[1..])[12..])
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .field("label", &self.label)
            .field("read_only", &self.is_read_only())
            .finish_non_exhaustive()
    }
}
