//! Signing devices
//!
//! A [`Signer`] holds private keys behind derivation paths and signs
//! serialized transactions. Hardware wallets answer with an APDU status word;
//! [`SoftwareSigner`] follows the same contract in-process.

use super::sighash::presign_hash_at;
use crate::core::{deserialize_bytes, StacksPublicKey};
use crate::crypto::{KeyPair, PUBLIC_KEY_LENGTH, RECOVERABLE_SIGNATURE_LENGTH};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// Status codes
// =============================================================================

/// APDU status word returned by a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub const SUCCESS: StatusCode = StatusCode(0x9000);
    pub const DEVICE_LOCKED: StatusCode = StatusCode(0x5515);
    pub const WRONG_LENGTH: StatusCode = StatusCode(0x6700);
    pub const EMPTY_BUFFER: StatusCode = StatusCode(0x6982);
    pub const DATA_INVALID: StatusCode = StatusCode(0x6984);
    pub const CONDITIONS_NOT_SATISFIED: StatusCode = StatusCode(0x6985);
    pub const TRANSACTION_REJECTED: StatusCode = StatusCode(0x6986);
    pub const BAD_KEY_HANDLE: StatusCode = StatusCode(0x6a80);
    pub const INSTRUCTION_NOT_SUPPORTED: StatusCode = StatusCode(0x6d00);
    pub const APP_NOT_OPEN: StatusCode = StatusCode(0x6e00);

    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    fn description(self) -> Option<&'static str> {
        Some(match self {
            Self::SUCCESS => "no errors",
            Self::DEVICE_LOCKED => "device locked",
            Self::WRONG_LENGTH => "wrong length",
            Self::EMPTY_BUFFER => "empty buffer",
            Self::DATA_INVALID => "data is invalid",
            Self::CONDITIONS_NOT_SATISFIED => "conditions not satisfied",
            Self::TRANSACTION_REJECTED => "transaction rejected",
            Self::BAD_KEY_HANDLE => "bad key handle",
            Self::INSTRUCTION_NOT_SUPPORTED => "instruction not supported",
            Self::APP_NOT_OPEN => "app does not seem to be open",
            _ => return None,
        })
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.description() {
            Some(text) => write!(f, "{:#06x} ({})", self.0, text),
            None => write!(f, "{:#06x}", self.0),
        }
    }
}

/// Errors reported by a signing device
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignerError {
    #[error("Device returned status {0}")]
    Status(StatusCode),
    #[error("Device did not respond in time")]
    Timeout,
    #[error("Signing was cancelled")]
    Cancelled,
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("No key at {0}")]
    UnknownKey(String),
    #[error("Invalid derivation path: {0}")]
    InvalidPath(String),
}

/// Raw answer to a sign request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerResponse {
    /// `recovery_id || r || s`; meaningful only when `status` is success
    pub signature: [u8; RECOVERABLE_SIGNATURE_LENGTH],
    pub status: StatusCode,
}

impl SignerResponse {
    pub fn success(signature: [u8; RECOVERABLE_SIGNATURE_LENGTH]) -> Self {
        Self {
            signature,
            status: StatusCode::SUCCESS,
        }
    }

    pub fn failure(status: StatusCode) -> Self {
        Self {
            signature: [0u8; RECOVERABLE_SIGNATURE_LENGTH],
            status,
        }
    }
}

// =============================================================================
// Key handles
// =============================================================================

const HARDENED: u32 = 0x8000_0000;

/// Stacks BIP-44 coin type
pub const STACKS_COIN_TYPE: u32 = 5757;

/// A BIP-32 derivation path on the device, e.g. `m/44'/5757'/0'/0/0`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyHandle {
    path: Vec<u32>,
}

impl KeyHandle {
    pub fn from_components(path: Vec<u32>) -> Self {
        Self { path }
    }

    /// `m/44'/5757'/0'/0/{index}`
    pub fn single_sig(index: u32) -> Self {
        Self::from_components(vec![
            44 | HARDENED,
            STACKS_COIN_TYPE | HARDENED,
            HARDENED,
            0,
            index,
        ])
    }

    /// `m/5757'/0'/0/0/{index}`
    pub fn multisig(index: u32) -> Self {
        Self::from_components(vec![STACKS_COIN_TYPE | HARDENED, HARDENED, 0, 0, index])
    }

    pub fn components(&self) -> &[u32] {
        &self.path
    }
}

impl FromStr for KeyHandle {
    type Err = SignerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SignerError::InvalidPath(s.to_string());
        let mut parts = s.trim().split('/');
        if parts.next() != Some("m") {
            return Err(invalid());
        }

        let path = parts
            .map(|part| {
                let (digits, hardened) = match part.strip_suffix(['\'', 'h']) {
                    Some(digits) => (digits, true),
                    None => (part, false),
                };
                let index: u32 = digits.parse().map_err(|_| invalid())?;
                if index >= HARDENED {
                    return Err(invalid());
                }
                Ok(if hardened { index | HARDENED } else { index })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if path.is_empty() {
            return Err(invalid());
        }
        Ok(Self { path })
    }
}

impl fmt::Display for KeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m")?;
        for component in &self.path {
            if component & HARDENED != 0 {
                write!(f, "/{}'", component & !HARDENED)?;
            } else {
                write!(f, "/{}", component)?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// Signer trait
// =============================================================================

/// A device able to sign multisig transactions
///
/// Calls are blocking; a device serves one request at a time, which callers
/// get by holding `&mut` access.
pub trait Signer {
    /// Compressed public key at `handle`
    fn public_key(&mut self, handle: &KeyHandle) -> Result<[u8; PUBLIC_KEY_LENGTH], SignerError>;

    /// Sign a serialized (possibly partially signed) transaction with the key
    /// at `handle`
    fn sign(&mut self, handle: &KeyHandle, tx_bytes: &[u8]) -> Result<SignerResponse, SignerError>;

    /// Release the device once a session ends
    fn release(&mut self) {}
}

/// In-process signer holding secp256k1 keys by derivation path
#[derive(Default)]
pub struct SoftwareSigner {
    keys: HashMap<KeyHandle, KeyPair>,
}

impl SoftwareSigner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, handle: KeyHandle, key: KeyPair) {
        self.keys.insert(handle, key);
    }

    /// Builder-style [`SoftwareSigner::insert`]
    pub fn with_key(mut self, handle: KeyHandle, key: KeyPair) -> Self {
        self.insert(handle, key);
        self
    }

    /// Load hex private keys as `m/5757'/0'/0/0/{i}` in the given order
    pub fn from_private_keys<S: AsRef<str>>(hex_keys: &[S]) -> Result<Self, SignerError> {
        let mut signer = Self::new();
        for (i, hex_key) in hex_keys.iter().enumerate() {
            let key = KeyPair::from_private_key_hex(hex_key.as_ref())
                .map_err(|e| SignerError::Transport(format!("private key {}: {}", i, e)))?;
            signer.insert(KeyHandle::multisig(i as u32), key);
        }
        Ok(signer)
    }

    pub fn handles(&self) -> impl Iterator<Item = &KeyHandle> {
        self.keys.keys()
    }

    fn key(&self, handle: &KeyHandle) -> Result<&KeyPair, SignerError> {
        self.keys
            .get(handle)
            .ok_or_else(|| SignerError::UnknownKey(handle.to_string()))
    }
}

impl Signer for SoftwareSigner {
    fn public_key(&mut self, handle: &KeyHandle) -> Result<[u8; PUBLIC_KEY_LENGTH], SignerError> {
        Ok(self.key(handle)?.public_key_bytes())
    }

    fn sign(&mut self, handle: &KeyHandle, tx_bytes: &[u8]) -> Result<SignerResponse, SignerError> {
        let key = self.key(handle)?;
        let tx = match deserialize_bytes(tx_bytes) {
            Ok(tx) => tx,
            Err(e) => {
                log::debug!("Refusing to sign undecodable transaction: {}", e);
                return Ok(SignerResponse::failure(StatusCode::DATA_INVALID));
            }
        };

        let own_key = StacksPublicKey::from_slice(&key.public_key_bytes())
            .map_err(|e| SignerError::Transport(e.to_string()))?;
        let index = match tx
            .auth
            .slots
            .iter()
            .position(|slot| slot.public_key() == Some(&own_key))
        {
            Some(index) => index,
            None => return Ok(SignerResponse::failure(StatusCode::CONDITIONS_NOT_SATISFIED)),
        };

        let presign = presign_hash_at(&tx, index);
        Ok(SignerResponse::success(key.sign_recoverable(&presign)))
    }
}
