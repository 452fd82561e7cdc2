//! M-of-N multisig token transfers
//!
//! Co-signers agree on a [`TransferDescriptor`], build the same unsigned
//! transaction, then pass it along so each device appends its signature in
//! slot order.
//!
//! # Example
//!
//! ```ignore
//! use stacks_multisig::multisig::{finalize, KeyHandle, SigningCoordinator, TransactionBuilder};
//!
//! let mut tx = TransactionBuilder::new().build(&descriptor)?;
//!
//! let mut session = SigningCoordinator::new(&mut device);
//! session.sign_one(&mut tx, &KeyHandle::multisig(0))?;
//! session.sign_one(&mut tx, &KeyHandle::multisig(1))?;
//!
//! let wire_bytes = finalize(&tx)?;
//! ```

pub mod address;
pub mod batch;
pub mod builder;
pub mod coordinator;
pub mod sighash;
pub mod signer;

pub use address::{derive_address, match_address, multisig_hash160, parse_address};
pub use batch::BatchProcessor;
pub use builder::{parse_numeric, BuildOptions, TransactionBuilder, TransferDescriptor};
pub use coordinator::{auth_field_info, finalize, signers_after, SigningCoordinator};
pub use sighash::{
    initial_sighash, postsign_hash, presign_hash, presign_hash_at, recover_signers, verify_origin,
};
pub use signer::{KeyHandle, Signer, SignerError, SignerResponse, SoftwareSigner, StatusCode};
