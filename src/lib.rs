//! stacks-multisig: M-of-N multisig STX token transfers
//!
//! This crate covers the full lifecycle of a multisig transfer:
//! - c32check multisig addresses derived from ordered public keys
//! - Unsigned transaction construction from JSON transfer records
//! - Ordered signature collection through pluggable signing devices
//! - SIP-005 wire encoding, with base64 as the transport form
//! - Parallel batch construction
//!
//! # Example
//!
//! ```rust
//! use stacks_multisig::multisig::{TransactionBuilder, TransferDescriptor};
//!
//! let descriptor = TransferDescriptor::new(
//!     "SP000000000000000000002Q6VF78",
//!     "1000",
//!     "300",
//!     vec![
//!         "02b30fafab3a12372c5d150d567034f37d60a91168009a779498168b0e9d8ec7f2".to_string(),
//!         "03ce61f1d155738a5e434fc8a61c3e104f891d1ec71576e8ad85abb68b34670d35".to_string(),
//!         "03ef2340518b5867b23598a9cf74611f8b98064f7d55cdb8c107c67b5efcbc5c77".to_string(),
//!     ],
//!     2,
//! );
//!
//! let tx = TransactionBuilder::new().build(&descriptor).unwrap();
//! assert_eq!(tx.derived_address(), "SM2R12RQCV9SCAZPM37VSCVP4X3EQK1Y70KCV7EDE");
//!
//! // Hand the transaction to the next co-signer
//! let encoded = stacks_multisig::core::serialize(&tx);
//! println!("{}", encoded);
//! ```

pub mod cli;
pub mod core;
pub mod crypto;
pub mod error;
pub mod multisig;
pub mod storage;

// Re-export commonly used types
pub use crate::core::{
    deserialize, serialize, AuthSlot, MultisigTransaction, Network, Principal, SigningState,
    StacksPublicKey,
};
pub use crypto::KeyPair;
pub use error::MultisigError;
pub use multisig::{
    finalize, BatchProcessor, BuildOptions, KeyHandle, Signer, SigningCoordinator,
    SoftwareSigner, TransactionBuilder, TransferDescriptor,
};
pub use storage::StorageError;
