//! Unsigned multisig transfer construction
//!
//! A [`TransferDescriptor`] is the JSON record co-signers agree on. The
//! builder validates it and produces a transaction with one public-key slot
//! per signer, in slot order.

use super::address::{address_network, match_address, multisig_hash160};
use crate::core::{
    AnchorMode, AuthSlot, HashMode, Memo, MultisigSpendingCondition, MultisigTransaction, Network,
    PostConditionMode, Principal, StacksPublicKey, TokenTransfer,
};
use crate::error::MultisigError;
use rayon::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// Descriptor
// =============================================================================

/// Decimal amount as found in input records: a string or a JSON integer
#[derive(Deserialize)]
#[serde(untagged)]
enum DecimalField {
    Text(String),
    Number(u64),
}

fn decimal_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match DecimalField::deserialize(deserializer)? {
        DecimalField::Text(s) => s,
        DecimalField::Number(n) => n.to_string(),
    })
}

fn optional_decimal_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(match Option::<DecimalField>::deserialize(deserializer)? {
        Some(DecimalField::Text(s)) if s.trim().is_empty() => None,
        Some(DecimalField::Text(s)) => Some(s),
        Some(DecimalField::Number(n)) => Some(n.to_string()),
        None => None,
    })
}

fn non_empty_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.trim().is_empty()))
}

/// Everything needed to build one unsigned multisig transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferDescriptor {
    /// Expected sender address; when present the keys must derive it
    #[serde(default, deserialize_with = "non_empty_string", skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    pub recipient: String,
    /// microSTX, decimal
    #[serde(deserialize_with = "decimal_string")]
    pub amount: String,
    /// microSTX, decimal
    #[serde(deserialize_with = "decimal_string")]
    pub fee: String,
    #[serde(default, deserialize_with = "optional_decimal_string", skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// UTF-8 memo of at most 34 bytes; trailing NUL bytes are dropped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string", skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// Hex-encoded compressed public keys, in slot order
    pub public_keys: Vec<String>,
    #[serde(alias = "requiredSignatures")]
    pub num_signatures: u16,
}

impl TransferDescriptor {
    pub fn new(
        recipient: impl Into<String>,
        amount: impl Into<String>,
        fee: impl Into<String>,
        public_keys: Vec<String>,
        num_signatures: u16,
    ) -> Self {
        Self {
            sender: None,
            recipient: recipient.into(),
            amount: amount.into(),
            fee: fee.into(),
            nonce: None,
            memo: None,
            network: None,
            public_keys,
            num_signatures,
        }
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    pub fn with_network(mut self, network: Network) -> Self {
        self.network = Some(network.to_string());
        self
    }
}

/// Parse a non-negative decimal integer that must fit in a u64
pub fn parse_numeric(field: &'static str, value: &str) -> Result<u64, MultisigError> {
    let trimmed = value.trim();
    let invalid = || MultisigError::InvalidNumeric {
        field,
        value: value.to_string(),
    };
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    trimmed.parse::<u64>().map_err(|_| invalid())
}

// =============================================================================
// Configuration
// =============================================================================

/// Transaction-wide settings applied to every build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuildOptions {
    pub anchor_mode: AnchorMode,
    pub post_condition_mode: PostConditionMode,
    /// Network used when a descriptor does not name one
    pub default_network: Network,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            anchor_mode: AnchorMode::Any,
            post_condition_mode: PostConditionMode::Deny,
            default_network: Network::Mainnet,
        }
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builds unsigned multisig token transfers
#[derive(Debug, Clone, Default)]
pub struct TransactionBuilder {
    options: BuildOptions,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: BuildOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Build one unsigned transaction
    pub fn build(
        &self,
        descriptor: &TransferDescriptor,
    ) -> Result<MultisigTransaction, MultisigError> {
        let threshold = descriptor.num_signatures;
        let network = match &descriptor.network {
            Some(name) => name.parse::<Network>().map_err(MultisigError::MalformedInput)?,
            None => self.options.default_network,
        };

        let given_keys = descriptor
            .public_keys
            .iter()
            .map(|k| StacksPublicKey::from_hex(k))
            .collect::<Result<Vec<_>, _>>()?;
        crate::core::check_threshold(threshold, given_keys.len())?;

        let pubkeys = match &descriptor.sender {
            Some(sender) => {
                let sender_network = address_network(sender)?;
                if sender_network != network {
                    return Err(MultisigError::InvalidAddress(format!(
                        "sender {} is a {} address but the transaction targets {}",
                        sender, sender_network, network
                    )));
                }
                match_address(&given_keys, threshold, sender)?
            }
            None => given_keys,
        };

        let amount = parse_numeric("amount", &descriptor.amount)?;
        let fee = parse_numeric("fee", &descriptor.fee)?;
        let nonce = match &descriptor.nonce {
            Some(nonce) if !nonce.trim().is_empty() => parse_numeric("nonce", nonce)?,
            _ => 0,
        };

        let recipient: Principal = descriptor.recipient.parse()?;
        let memo = match &descriptor.memo {
            Some(text) => Memo::new(text.as_bytes())?,
            None => Memo::default(),
        };

        let signer = multisig_hash160(&pubkeys, threshold)?;
        let tx = MultisigTransaction {
            network,
            auth: MultisigSpendingCondition {
                hash_mode: HashMode::P2sh,
                signer,
                nonce,
                fee,
                slots: pubkeys.into_iter().map(AuthSlot::PublicKey).collect(),
                signatures_required: threshold,
            },
            anchor_mode: self.options.anchor_mode,
            post_condition_mode: self.options.post_condition_mode,
            payload: TokenTransfer {
                recipient,
                amount,
                memo,
            },
        };

        log::debug!(
            "Built {}-of-{} transfer of {} microSTX from {}",
            threshold,
            tx.auth.slots.len(),
            amount,
            tx.derived_address()
        );
        Ok(tx)
    }

    /// Build every descriptor in parallel; each item yields its own result
    pub fn build_batch_partial(
        &self,
        descriptors: &[TransferDescriptor],
    ) -> Vec<Result<MultisigTransaction, MultisigError>> {
        descriptors.par_iter().map(|d| self.build(d)).collect()
    }

    /// Build every descriptor, failing on the first (lowest index) bad item
    pub fn build_batch(
        &self,
        descriptors: &[TransferDescriptor],
    ) -> Result<Vec<MultisigTransaction>, MultisigError> {
        let results = self.build_batch_partial(descriptors);
        let mut txs = Vec::with_capacity(results.len());
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(tx) => txs.push(tx),
                Err(err) => {
                    log::warn!("Batch item {} rejected: {}", index, err);
                    return Err(MultisigError::BatchItem {
                        index,
                        source: Box::new(err),
                    });
                }
            }
        }
        log::info!("Built {} multisig transactions", txs.len());
        Ok(txs)
    }
}
