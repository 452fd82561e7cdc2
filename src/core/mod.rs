//! Core transaction components
//!
//! This module contains the fundamental building blocks:
//! - Network parameters (transaction version, chain ID, address versions)
//! - Principals (standard and contract recipients)
//! - Multisig redeem scripts (P2SH, P2SH-P2WSH)
//! - Multisig token-transfer transactions and their auth slots
//! - The SIP-005 wire codec

pub mod codec;
pub mod network;
pub mod principal;
pub mod script;
pub mod transaction;

pub use codec::{deserialize, deserialize_bytes, serialize, serialize_bytes, txid};
pub use network::{
    AddressVersion, Network, CHAIN_ID_MAINNET, CHAIN_ID_TESTNET, TX_VERSION_MAINNET,
    TX_VERSION_TESTNET,
};
pub use principal::{validate_contract_name, Principal, StandardPrincipal};
pub use script::{check_threshold, multisig_redeem_script, p2sh_hash, p2wsh_hash, MAX_MULTISIG_KEYS};
pub use transaction::{
    AnchorMode, AuthFieldInfo, AuthSlot, HashMode, Memo, MessageSignature,
    MultisigSpendingCondition, MultisigTransaction, PostConditionMode, SigningState,
    StacksPublicKey, TokenTransfer, AUTH_TYPE_STANDARD, MEMO_MAX_LENGTH,
};
