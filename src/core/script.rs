//! Redeem scripts for multisig spending conditions
//!
//! A Stacks multisig account is the hash160 of a Bitcoin-style
//! `OP_M <pubkey_1> ... <pubkey_N> OP_N OP_CHECKMULTISIG` script, so key order
//! is part of the account identity.

use super::transaction::StacksPublicKey;
use crate::crypto::{hash160, sha256};
use crate::error::MultisigError;

// =============================================================================
// Opcodes
// =============================================================================

/// `OP_1`; `OP_2`..`OP_16` follow consecutively
pub const OP_1: u8 = 0x51;
/// `OP_CHECKMULTISIG`
pub const OP_CHECKMULTISIG: u8 = 0xae;
/// Push-33-bytes opcode used for compressed public keys
pub const OP_PUSH_33: u8 = 0x21;

/// Largest key count a small-integer opcode can express
pub const MAX_MULTISIG_KEYS: usize = 16;

/// Opcode pushing a small integer (1..=16)
pub fn small_int_opcode(n: usize) -> Option<u8> {
    if (1..=MAX_MULTISIG_KEYS).contains(&n) {
        Some(OP_1 + (n as u8 - 1))
    } else {
        None
    }
}

/// Validate an M-of-N combination
pub fn check_threshold(threshold: u16, key_count: usize) -> Result<(), MultisigError> {
    if key_count == 0 {
        return Err(MultisigError::InvalidThreshold(
            "at least one public key is required".to_string(),
        ));
    }
    if key_count > MAX_MULTISIG_KEYS {
        return Err(MultisigError::InvalidThreshold(format!(
            "{} public keys exceed the limit of {}",
            key_count, MAX_MULTISIG_KEYS
        )));
    }
    if threshold == 0 {
        return Err(MultisigError::InvalidThreshold(
            "threshold must be at least 1".to_string(),
        ));
    }
    if threshold as usize > key_count {
        return Err(MultisigError::InvalidThreshold(format!(
            "threshold {} exceeds signer count {}",
            threshold, key_count
        )));
    }
    Ok(())
}

/// Build the canonical M-of-N checkmultisig script, keys in the order given
pub fn multisig_redeem_script(
    pubkeys: &[StacksPublicKey],
    threshold: u16,
) -> Result<Vec<u8>, MultisigError> {
    check_threshold(threshold, pubkeys.len())?;

    let mut script = Vec::with_capacity(3 + pubkeys.len() * 34);
    script.extend(small_int_opcode(threshold as usize));
    for pubkey in pubkeys {
        script.push(OP_PUSH_33);
        script.extend_from_slice(pubkey.as_bytes());
    }
    script.extend(small_int_opcode(pubkeys.len()));
    script.push(OP_CHECKMULTISIG);

    Ok(script)
}

/// hash160 of the redeem script (P2SH account hash)
pub fn p2sh_hash(pubkeys: &[StacksPublicKey], threshold: u16) -> Result<[u8; 20], MultisigError> {
    Ok(hash160(&multisig_redeem_script(pubkeys, threshold)?))
}

/// hash160 of the version-0 witness program wrapping the script (P2SH-P2WSH)
pub fn p2wsh_hash(pubkeys: &[StacksPublicKey], threshold: u16) -> Result<[u8; 20], MultisigError> {
    let script = multisig_redeem_script(pubkeys, threshold)?;
    let mut witness_program = vec![0x00, 0x20];
    witness_program.extend_from_slice(&sha256(&script));
    Ok(hash160(&witness_program))
}
