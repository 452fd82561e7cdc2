//! Error taxonomy shared by the codec, builder, and signing coordinator

use crate::crypto::{C32Error, KeyError};
use crate::multisig::signer::SignerError;
use thiserror::Error;

/// Errors related to multisig transfer operations
///
/// Every failing operation leaves the transaction it was given untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MultisigError {
    #[error(
        "Public keys did not match expected address. Expected {expected}, \
         but public keys correspond to {sorted} (sorted) or {given} (as given)"
    )]
    AddressMismatch {
        expected: String,
        sorted: String,
        given: String,
    },
    #[error("Invalid numeric value for {field}: {value:?}")]
    InvalidNumeric { field: &'static str, value: String },
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Memo is {0} bytes, the limit is 34")]
    InvalidMemo(usize),
    #[error("Public key {0} not found among the transaction's unsigned slots")]
    UnknownSigner(String),
    #[error("Slot {index} cannot be signed: slots {signed_after:?} after it are already signed")]
    OutOfOrderSigning {
        index: usize,
        signed_after: Vec<usize>,
    },
    #[error("Slot {0} is already signed")]
    AlreadySigned(usize),
    #[error("Transaction already carries its {0} required signatures")]
    AlreadyComplete(u16),
    #[error("Signer device error: {0}")]
    SignerDeviceError(SignerError),
    #[error("Insufficient signatures: have {have}, need {need}")]
    IncompleteSignatures { have: usize, need: u16 },
    #[error("Invalid signature in slot {index}: {reason}")]
    InvalidSignature { index: usize, reason: String },
    #[error("Malformed input: {0}")]
    MalformedInput(String),
    #[error("Transaction has a single-signature spending condition")]
    SingleSigNotSupported,
    #[error("Batch item {index} failed: {source}")]
    BatchItem {
        index: usize,
        #[source]
        source: Box<MultisigError>,
    },
}

impl MultisigError {
    /// Whether the caller may retry (possibly with a different signer or slot)
    /// without correcting its input
    pub fn is_retryable(&self) -> bool {
        match self {
            MultisigError::SignerDeviceError(_) | MultisigError::OutOfOrderSigning { .. } => true,
            MultisigError::BatchItem { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

impl From<C32Error> for MultisigError {
    fn from(err: C32Error) -> Self {
        MultisigError::InvalidAddress(err.to_string())
    }
}

impl From<KeyError> for MultisigError {
    fn from(err: KeyError) -> Self {
        MultisigError::InvalidPublicKey(err.to_string())
    }
}

impl From<SignerError> for MultisigError {
    fn from(err: SignerError) -> Self {
        MultisigError::SignerDeviceError(err)
    }
}
