//! Multisig token-transfer transactions
//!
//! Models the subset of the Stacks transaction format needed for STX token
//! transfers from an M-of-N multisig account:
//! - Standard authorization with a multisig spending condition
//! - Ordered auth slots, each holding a public key or a signature
//! - A token-transfer payload with recipient, amount, and memo

use super::network::Network;
use super::principal::Principal;
use crate::crypto::{parse_public_key, PUBLIC_KEY_LENGTH, RECOVERABLE_SIGNATURE_LENGTH};
use crate::error::MultisigError;
use serde::{Serialize, Serializer};
use std::fmt;

// =============================================================================
// Constants
// =============================================================================

/// Authorization type for standard (non-sponsored) transactions
pub const AUTH_TYPE_STANDARD: u8 = 0x04;

/// Maximum memo length in bytes
pub const MEMO_MAX_LENGTH: usize = 34;

/// Public key encoding flag used when extending the sighash chain
pub const PUBKEY_ENCODING_COMPRESSED: u8 = 0x00;

fn serialize_hex<S: Serializer, T: AsRef<[u8]>>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

// =============================================================================
// Keys and signatures
// =============================================================================

/// A compressed secp256k1 public key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StacksPublicKey([u8; PUBLIC_KEY_LENGTH]);

impl StacksPublicKey {
    /// Validate and wrap compressed public key bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, MultisigError> {
        parse_public_key(bytes).map_err(|_| {
            MultisigError::InvalidPublicKey(format!(
                "{} is not a compressed secp256k1 public key",
                hex::encode(bytes)
            ))
        })?;
        let mut key = [0u8; PUBLIC_KEY_LENGTH];
        key.copy_from_slice(bytes);
        Ok(Self(key))
    }

    /// Parse a hex-encoded compressed public key
    pub fn from_hex(hex_key: &str) -> Result<Self, MultisigError> {
        let bytes = hex::decode(hex_key.trim()).map_err(|_| {
            MultisigError::InvalidPublicKey(format!("{:?} is not valid hex", hex_key))
        })?;
        Self::from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for StacksPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for StacksPublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_hex(&self.0, serializer)
    }
}

/// A 65-byte recoverable signature: `recovery_id || r || s`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageSignature(pub [u8; RECOVERABLE_SIGNATURE_LENGTH]);

impl MessageSignature {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, MultisigError> {
        let sig: [u8; RECOVERABLE_SIGNATURE_LENGTH] = bytes.try_into().map_err(|_| {
            MultisigError::MalformedInput(format!(
                "signature must be {} bytes, got {}",
                RECOVERABLE_SIGNATURE_LENGTH,
                bytes.len()
            ))
        })?;
        Ok(Self(sig))
    }

    pub fn from_hex(hex_sig: &str) -> Result<Self, MultisigError> {
        let bytes = hex::decode(hex_sig.trim())
            .map_err(|_| MultisigError::MalformedInput(format!("{:?} is not valid hex", hex_sig)))?;
        Self::from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; RECOVERABLE_SIGNATURE_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Serialize for MessageSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_hex(&self.0, serializer)
    }
}

// =============================================================================
// Auth slots
// =============================================================================

/// One position in the spending condition's ordered field list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum AuthSlot {
    PublicKey(StacksPublicKey),
    Signature(MessageSignature),
}

impl AuthSlot {
    pub fn is_signature(&self) -> bool {
        matches!(self, AuthSlot::Signature(_))
    }

    /// The stored public key, if this slot has not been signed
    pub fn public_key(&self) -> Option<&StacksPublicKey> {
        match self {
            AuthSlot::PublicKey(key) => Some(key),
            AuthSlot::Signature(_) => None,
        }
    }
}

// =============================================================================
// Enums
// =============================================================================

/// How the spending condition's hash commits to the redeem script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum HashMode {
    /// hash160 of the redeem script
    P2sh = 0x01,
    /// hash160 of a P2WSH program wrapping the redeem script
    P2wsh = 0x03,
}

impl HashMode {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(HashMode::P2sh),
            0x03 => Some(HashMode::P2wsh),
            _ => None,
        }
    }

    /// Whether `byte` is one of the single-signature hash modes
    pub fn is_single_sig_byte(byte: u8) -> bool {
        matches!(byte, 0x00 | 0x02)
    }
}

/// Block anchoring preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum AnchorMode {
    OnChainOnly = 0x01,
    OffChainOnly = 0x02,
    #[default]
    Any = 0x03,
}

impl AnchorMode {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(AnchorMode::OnChainOnly),
            0x02 => Some(AnchorMode::OffChainOnly),
            0x03 => Some(AnchorMode::Any),
            _ => None,
        }
    }
}

/// Whether asset movements not covered by post conditions are allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PostConditionMode {
    Allow = 0x01,
    #[default]
    Deny = 0x02,
}

impl PostConditionMode {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(PostConditionMode::Allow),
            0x02 => Some(PostConditionMode::Deny),
            _ => None,
        }
    }
}

// =============================================================================
// Memo
// =============================================================================

/// Transfer memo, at most 34 bytes
///
/// The wire form is zero padded, so trailing zero bytes are not significant
/// and are dropped on construction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Memo(Vec<u8>);

impl Memo {
    pub fn new(bytes: &[u8]) -> Result<Self, MultisigError> {
        let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
        if end > MEMO_MAX_LENGTH {
            return Err(MultisigError::InvalidMemo(end));
        }
        Ok(Self(bytes[..end].to_vec()))
    }

    /// Decode the zero-padded wire form
    pub fn from_padded(padded: &[u8; MEMO_MAX_LENGTH]) -> Self {
        let end = padded.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
        Self(padded[..end].to_vec())
    }

    pub fn to_padded(&self) -> [u8; MEMO_MAX_LENGTH] {
        let mut padded = [0u8; MEMO_MAX_LENGTH];
        padded[..self.0.len()].copy_from_slice(&self.0);
        padded
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Memo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl Serialize for Memo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// =============================================================================
// Spending condition and payload
// =============================================================================

/// Multisig spending condition of a standard authorization
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MultisigSpendingCondition {
    pub hash_mode: HashMode,
    /// hash160 identifying the multisig account
    #[serde(serialize_with = "serialize_hex")]
    pub signer: [u8; 20],
    pub nonce: u64,
    pub fee: u64,
    /// Ordered public-key / signature slots
    pub slots: Vec<AuthSlot>,
    pub signatures_required: u16,
}

impl MultisigSpendingCondition {
    /// Number of slots already holding a signature
    pub fn signature_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_signature()).count()
    }

    /// Number of slots still holding a public key
    pub fn public_key_count(&self) -> usize {
        self.slots.len() - self.signature_count()
    }

    /// Length of the leading run of signed slots
    pub fn signed_prefix_len(&self) -> usize {
        self.slots.iter().take_while(|s| s.is_signature()).count()
    }

    /// Whether the signed slots form a contiguous prefix
    pub fn is_signed_prefix(&self) -> bool {
        self.signed_prefix_len() == self.signature_count()
    }
}

/// STX token transfer payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenTransfer {
    pub recipient: Principal,
    /// Amount in microSTX
    pub amount: u64,
    pub memo: Memo,
}

/// Progress of signature collection, derived from slot contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SigningState {
    Unsigned,
    PartiallySigned,
    FullySigned,
}

impl fmt::Display for SigningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigningState::Unsigned => write!(f, "unsigned"),
            SigningState::PartiallySigned => write!(f, "partially signed"),
            SigningState::FullySigned => write!(f, "fully signed"),
        }
    }
}

/// Counts of the auth fields in a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthFieldInfo {
    pub auth_fields: usize,
    pub pubkeys: usize,
    pub signatures: usize,
    pub signatures_required: u16,
}

// =============================================================================
// Transaction
// =============================================================================

/// A (possibly partially signed) multisig token transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MultisigTransaction {
    pub network: Network,
    pub auth: MultisigSpendingCondition,
    pub anchor_mode: AnchorMode,
    pub post_condition_mode: PostConditionMode,
    pub payload: TokenTransfer,
}

impl MultisigTransaction {
    /// Address of the multisig account spending the funds
    pub fn derived_address(&self) -> String {
        self.network.multisig_version().address(&self.auth.signer)
    }

    /// Signatures collected so far, counted as the leading run of signed slots
    ///
    /// A signature after an unsigned slot does not count.
    pub fn signature_count(&self) -> usize {
        self.auth.signed_prefix_len()
    }

    pub fn signatures_required(&self) -> u16 {
        self.auth.signatures_required
    }

    /// Whether enough signatures are present to broadcast
    pub fn is_fully_signed(&self) -> bool {
        self.signature_count() >= self.auth.signatures_required as usize
    }

    pub fn state(&self) -> SigningState {
        if self.is_fully_signed() {
            SigningState::FullySigned
        } else if self.signature_count() == 0 {
            SigningState::Unsigned
        } else {
            SigningState::PartiallySigned
        }
    }

    /// Summary of the slot contents
    pub fn auth_field_info(&self) -> AuthFieldInfo {
        AuthFieldInfo {
            auth_fields: self.auth.slots.len(),
            pubkeys: self.auth.public_key_count(),
            signatures: self.auth.signature_count(),
            signatures_required: self.auth.signatures_required,
        }
    }

    /// Indices of signed slots after the unsigned slot holding `pubkey`
    ///
    /// Returns `None` if `pubkey` is not held by any unsigned slot.
    pub fn signers_after(&self, pubkey: &StacksPublicKey) -> Option<Vec<usize>> {
        let index = self
            .auth
            .slots
            .iter()
            .position(|slot| slot.public_key() == Some(pubkey))?;

        Some(
            self.auth
                .slots
                .iter()
                .enumerate()
                .skip(index + 1)
                .filter(|(_, slot)| slot.is_signature())
                .map(|(i, _)| i)
                .collect(),
        )
    }

    /// Copy with nonce, fee and slots cleared: the origin of the sighash chain
    pub fn initial_sighash_form(&self) -> Self {
        let mut cleared = self.clone();
        cleared.auth.nonce = 0;
        cleared.auth.fee = 0;
        cleared.auth.slots.clear();
        cleared
    }
}
