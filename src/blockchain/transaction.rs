//! Transaction intents, signing, and the signed artifact.
//!
//! # Responsibilities
//! - Complete an intent in place (sender, nonce, gas limit, fees)
//! - Pick the fee-market or legacy envelope from the populated fee fields
//! - Sign under the chain ID recorded when the client connected

use std::sync::Arc;

use alloy::consensus::{SignableTransaction, Transaction as _, TxEip1559, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::primitives::{Address, Bytes, Signature, TxHash, TxKind, U256};
use alloy::signers::SignerSync;

use crate::blockchain::connector::NodeConnector;
use crate::blockchain::fees::FeeEstimator;
use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::blockchain::wallet::Account;
use crate::observability::metrics;

/// A caller's transaction request. Completed in place by [`TransactionSigner::sign`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxIntent {
    /// Defaults to the connected account when `None`.
    pub from: Option<Address>,
    pub to: Address,
    pub value: U256,
    /// Empty for a plain transfer.
    pub data: Bytes,
    /// `None` (or zero) means "estimate".
    pub gas_limit: Option<u64>,
    pub gas_price: Option<u128>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
    /// `None` means "use the pending nonce".
    pub nonce: Option<u64>,
    /// Informational only; signing uses the connected chain.
    pub chain_id: Option<u64>,
}

impl TxIntent {
    /// Plain value transfer.
    pub fn transfer(to: Address, value: U256) -> Self {
        Self {
            to,
            value,
            ..Self::default()
        }
    }

    pub fn with_from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_data(mut self, data: Bytes) -> Self {
        self.data = data;
        self
    }

    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    pub fn with_gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = Some(gas_price);
        self
    }

    pub fn with_fee_market(mut self, max_fee_per_gas: u128, max_priority_fee_per_gas: u128) -> Self {
        self.max_fee_per_gas = Some(max_fee_per_gas);
        self.max_priority_fee_per_gas = Some(max_priority_fee_per_gas);
        self
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    pub fn is_simple_transfer(&self) -> bool {
        self.data.is_empty()
    }

    /// Both fee-market fields are set.
    pub fn has_fee_market_fields(&self) -> bool {
        self.max_fee_per_gas.is_some() && self.max_priority_fee_per_gas.is_some()
    }

    /// Gas limit, treating zero as unset.
    pub fn explicit_gas_limit(&self) -> Option<u64> {
        self.gas_limit.filter(|&g| g > 0)
    }
}

/// Signed, immutable transaction ready for broadcast.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedTransaction {
    envelope: TxEnvelope,
    signature: Signature,
}

impl SignedTransaction {
    fn new(envelope: TxEnvelope, signature: Signature) -> Self {
        Self {
            envelope,
            signature,
        }
    }

    pub fn hash(&self) -> TxHash {
        *self.envelope.tx_hash()
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.envelope.chain_id()
    }

    pub fn nonce(&self) -> u64 {
        self.envelope.nonce()
    }

    pub fn gas_limit(&self) -> u64 {
        self.envelope.gas_limit()
    }

    /// Legacy gas price; `None` for fee-market envelopes.
    pub fn gas_price(&self) -> Option<u128> {
        self.envelope.gas_price()
    }

    pub fn max_fee_per_gas(&self) -> u128 {
        self.envelope.max_fee_per_gas()
    }

    pub fn max_priority_fee_per_gas(&self) -> Option<u128> {
        self.envelope.max_priority_fee_per_gas()
    }

    pub fn to(&self) -> Option<Address> {
        self.envelope.to()
    }

    pub fn value(&self) -> U256 {
        self.envelope.value()
    }

    pub fn input(&self) -> &Bytes {
        self.envelope.input()
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn is_fee_market(&self) -> bool {
        matches!(self.envelope, TxEnvelope::Eip1559(_))
    }

    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        if self.is_fee_market() {
            "eip1559"
        } else {
            "legacy"
        }
    }

    /// EIP-2718 encoding, as sent with `eth_sendRawTransaction`.
    pub fn encoded(&self) -> Bytes {
        Bytes::from(self.envelope.encoded_2718())
    }

    pub fn envelope(&self) -> &TxEnvelope {
        &self.envelope
    }
}

/// Completes and signs intents for one connected chain.
pub struct TransactionSigner {
    node: Arc<dyn NodeConnector>,
    estimator: FeeEstimator,
    chain_id: u64,
}

impl TransactionSigner {
    pub fn new(node: Arc<dyn NodeConnector>, estimator: FeeEstimator, chain_id: u64) -> Self {
        Self {
            node,
            estimator,
            chain_id,
        }
    }

    pub fn estimator(&self) -> &FeeEstimator {
        &self.estimator
    }

    /// Complete `intent` and sign it with `account`.
    ///
    /// Node calls run in order: nonce, gas estimate, header, gas price.
    /// Completed fields are written back to `intent`, also when a later step fails.
    pub async fn sign(&self, account: &Account, intent: &mut TxIntent) -> BlockchainResult<SignedTransaction> {
        let signer = account.signing_key()?;
        let sender = account.address();

        match intent.from {
            Some(from) if from != sender => {
                return Err(BlockchainError::SenderMismatch {
                    expected: sender,
                    actual: from,
                })
            }
            _ => intent.from = Some(sender),
        }

        if intent.nonce.is_none() {
            let nonce = self
                .node
                .pending_nonce(sender)
                .await
                .map_err(|e| e.during("get nonce"))?;
            intent.nonce = Some(nonce);
        }

        if intent.explicit_gas_limit().is_none() {
            let gas_limit = self.estimator.estimate_gas_limit(self.node.as_ref(), intent).await?;
            intent.gas_limit = Some(gas_limit);
        }

        self.estimator
            .compute_fees(self.node.as_ref(), self.chain_id, intent)
            .await?;

        let signed = build_and_sign(intent, self.chain_id, signer)?;

        metrics::record_signed(signed.kind());
        tracing::info!(
            tx_hash = %signed.hash(),
            from = %sender,
            to = %intent.to,
            nonce = signed.nonce(),
            gas_limit = signed.gas_limit(),
            kind = signed.kind(),
            "Transaction signed"
        );
        Ok(signed)
    }
}

fn build_and_sign<S: SignerSync>(intent: &TxIntent, chain_id: u64, signer: &S) -> BlockchainResult<SignedTransaction> {
    let nonce = intent.nonce.unwrap_or_default();
    let gas_limit = intent.gas_limit.unwrap_or_default();

    let envelope_and_sig = match (intent.max_fee_per_gas, intent.max_priority_fee_per_gas, intent.gas_price) {
        (Some(max_fee_per_gas), Some(max_priority_fee_per_gas), _) => {
            let tx = TxEip1559 {
                chain_id,
                nonce,
                gas_limit,
                max_fee_per_gas,
                max_priority_fee_per_gas,
                to: TxKind::Call(intent.to),
                value: intent.value,
                access_list: Default::default(),
                input: intent.data.clone(),
            };
            let signature = sign_hash(signer, tx.signature_hash())?;
            (TxEnvelope::from(tx.into_signed(signature)), signature)
        }
        (_, _, Some(gas_price)) => {
            let tx = TxLegacy {
                chain_id: Some(chain_id),
                nonce,
                gas_price,
                gas_limit,
                to: TxKind::Call(intent.to),
                value: intent.value,
                input: intent.data.clone(),
            };
            let signature = sign_hash(signer, tx.signature_hash())?;
            (TxEnvelope::from(tx.into_signed(signature)), signature)
        }
        _ => return Err(BlockchainError::MissingFeeSpecification),
    };

    let (envelope, signature) = envelope_and_sig;
    Ok(SignedTransaction::new(envelope, signature))
}

fn sign_hash<S: SignerSync>(signer: &S, hash: alloy::primitives::B256) -> BlockchainResult<Signature> {
    signer
        .sign_hash_sync(&hash)
        .map_err(|e| BlockchainError::Wallet(format!("failed to sign transaction: {}", e)))
}
