//! Multisig sighash chain
//!
//! Every signature commits to the signatures before it:
//!
//! ```text
//! initial  = sha512_256(tx with nonce = 0, fee = 0, no auth fields)
//! presign  = sha512_256(cur || auth_type || fee || nonce)
//! postsign = sha512_256(presign || key_encoding || signature)
//! ```
//!
//! The signer of slot `i` signs the presign hash reached after walking the
//! signatures in `slots[..i]`. Public-key slots do not advance the chain.

use crate::core::{
    p2sh_hash, p2wsh_hash, serialize_bytes, AuthSlot, HashMode, MessageSignature,
    MultisigTransaction, StacksPublicKey, AUTH_TYPE_STANDARD,
};
use crate::core::transaction::PUBKEY_ENCODING_COMPRESSED;
use crate::crypto::{recover_public_key, sha512_256};
use crate::error::MultisigError;

/// Hash of the transaction with its authorization cleared
pub fn initial_sighash(tx: &MultisigTransaction) -> [u8; 32] {
    sha512_256(&serialize_bytes(&tx.initial_sighash_form()))
}

/// Hash a signer signs, binding the current sighash to fee and nonce
pub fn presign_hash(cur_sighash: &[u8; 32], fee: u64, nonce: u64) -> [u8; 32] {
    let mut data = Vec::with_capacity(32 + 1 + 8 + 8);
    data.extend_from_slice(cur_sighash);
    data.push(AUTH_TYPE_STANDARD);
    data.extend_from_slice(&fee.to_be_bytes());
    data.extend_from_slice(&nonce.to_be_bytes());
    sha512_256(&data)
}

/// Sighash after appending a signature to the chain
pub fn postsign_hash(presign: &[u8; 32], signature: &MessageSignature) -> [u8; 32] {
    let mut data = Vec::with_capacity(32 + 1 + 65);
    data.extend_from_slice(presign);
    data.push(PUBKEY_ENCODING_COMPRESSED);
    data.extend_from_slice(signature.as_bytes());
    sha512_256(&data)
}

/// Presign hash the signer of slot `index` must sign
pub fn presign_hash_at(tx: &MultisigTransaction, index: usize) -> [u8; 32] {
    let (fee, nonce) = (tx.auth.fee, tx.auth.nonce);
    let mut cur = initial_sighash(tx);
    for slot in tx.auth.slots.iter().take(index) {
        if let AuthSlot::Signature(sig) = slot {
            cur = postsign_hash(&presign_hash(&cur, fee, nonce), sig);
        }
    }
    presign_hash(&cur, fee, nonce)
}

/// Recover the public key behind every signature slot, in slot order
pub fn recover_signers(
    tx: &MultisigTransaction,
) -> Result<Vec<(usize, StacksPublicKey)>, MultisigError> {
    let (fee, nonce) = (tx.auth.fee, tx.auth.nonce);
    let mut cur = initial_sighash(tx);
    let mut signers = Vec::new();

    for (index, slot) in tx.auth.slots.iter().enumerate() {
        if let AuthSlot::Signature(sig) = slot {
            let presign = presign_hash(&cur, fee, nonce);
            let key = recover_public_key(&presign, sig.as_bytes()).map_err(|e| {
                MultisigError::InvalidSignature {
                    index,
                    reason: e.to_string(),
                }
            })?;
            let key = StacksPublicKey::from_slice(&key).map_err(|e| {
                MultisigError::InvalidSignature {
                    index,
                    reason: e.to_string(),
                }
            })?;
            signers.push((index, key));
            cur = postsign_hash(&presign, sig);
        }
    }

    Ok(signers)
}

/// Check that the slots (stored keys plus recovered signers) reproduce the
/// spending condition's signer hash
pub fn verify_origin(tx: &MultisigTransaction) -> Result<(), MultisigError> {
    let recovered = recover_signers(tx)?;
    let mut recovered_iter = recovered.iter();

    let keys: Vec<StacksPublicKey> = tx
        .auth
        .slots
        .iter()
        .filter_map(|slot| match slot {
            AuthSlot::PublicKey(key) => Some(*key),
            AuthSlot::Signature(_) => recovered_iter.next().map(|(_, key)| *key),
        })
        .collect();

    let threshold = tx.auth.signatures_required;
    let hash = match tx.auth.hash_mode {
        HashMode::P2sh => p2sh_hash(&keys, threshold)?,
        HashMode::P2wsh => p2wsh_hash(&keys, threshold)?,
    };
    if hash == tx.auth.signer {
        return Ok(());
    }

    match recovered.first() {
        Some((index, _)) => Err(MultisigError::InvalidSignature {
            index: *index,
            reason: format!(
                "recovered signers derive {}, spending condition commits to {}",
                hex::encode(hash),
                hex::encode(tx.auth.signer)
            ),
        }),
        None => Err(MultisigError::MalformedInput(format!(
            "public keys derive {}, spending condition commits to {}",
            hex::encode(hash),
            hex::encode(tx.auth.signer)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::deserialize;
    use crate::crypto::KeyPair;

    const UNSIGNED: &str = "AAAAAAEEAesfTSYLdkSwJgUv89TTC1X5PI27AAAAAAAAAAAAAAAAAAABLAAAAAMAA4J/+ietWvSBID1M9WVM0gMSOY+pIIT/duS03/3a/hBZAAOp0R9tQQLtMjdA+VZo1vIGxbXLxc5ccCjOuhc2+71oYQACBRMtvRJw9mra9DcjlAqYvmMxq+lb+lODiBW/IUpaIVAAAgMCAAAAAAAFFgAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA+gAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

    const PRIVATE_KEYS: [&str; 3] = [
        "dd7229314db5d50122cd8d4ff8975f57317f54c946cd233d8d35f5b616fe961e01",
        "119a851bd1201b93e6477a0a9c7d29515735530df92ab265166ca3da119f803501",
        "22d45b79bda06915c5d1a98da577089763b6c660304d3919e50797352dc6722f01",
    ];

    fn signer(i: usize) -> KeyPair {
        KeyPair::from_private_key_hex(PRIVATE_KEYS[i]).unwrap()
    }

    fn sign_slot(tx: &mut MultisigTransaction, index: usize, key: &KeyPair) {
        let presign = presign_hash_at(tx, index);
        tx.auth.slots[index] = AuthSlot::Signature(MessageSignature(key.sign_recoverable(&presign)));
    }

    #[test]
    fn test_initial_and_presign_vectors() {
        let tx = deserialize(UNSIGNED).unwrap();
        let initial = initial_sighash(&tx);
        assert_eq!(
            hex::encode(initial),
            "af3ba98f0504bbbd33ef12126604a791bb9d73f6517a2d3be29c1116af991ff9"
        );
        assert_eq!(
            hex::encode(presign_hash(&initial, 300, 0)),
            "8507586ffe103429c4716d562588ae107e26f485acf0f3514c25c7e5e445a5c4"
        );
        assert_eq!(presign_hash_at(&tx, 0), presign_hash(&initial, 300, 0));
        assert_eq!(presign_hash_at(&tx, 2), presign_hash_at(&tx, 0));
    }

    #[test]
    fn test_chain_advances_on_signatures() {
        let mut tx = deserialize(UNSIGNED).unwrap();
        let before = presign_hash_at(&tx, 1);
        sign_slot(&mut tx, 0, &signer(0));
        let after = presign_hash_at(&tx, 1);
        assert_ne!(before, after);

        let sig = match &tx.auth.slots[0] {
            AuthSlot::Signature(sig) => *sig,
            other => panic!("slot 0 not signed: {:?}", other),
        };
        let presign0 = presign_hash_at(&tx, 0);
        assert_eq!(after, presign_hash(&postsign_hash(&presign0, &sig), 300, 0));
    }

    #[test]
    fn test_recover_and_verify_origin() {
        let mut tx = deserialize(UNSIGNED).unwrap();
        verify_origin(&tx).unwrap();

        sign_slot(&mut tx, 0, &signer(0));
        sign_slot(&mut tx, 1, &signer(1));

        let recovered = recover_signers(&tx).unwrap();
        assert_eq!(recovered.len(), 2);
        assert_eq!(recovered[0].0, 0);
        assert_eq!(recovered[0].1.to_hex(), signer(0).public_key_hex());
        assert_eq!(recovered[1].1.to_hex(), signer(1).public_key_hex());

        verify_origin(&tx).unwrap();
    }

    #[test]
    fn test_wrong_signer_fails_origin_check() {
        let mut tx = deserialize(UNSIGNED).unwrap();
        sign_slot(&mut tx, 0, &signer(2));

        assert!(matches!(
            verify_origin(&tx),
            Err(MultisigError::InvalidSignature { index: 0, .. })
        ));
    }

    #[test]
    fn test_fee_change_invalidates_signatures() {
        let mut tx = deserialize(UNSIGNED).unwrap();
        sign_slot(&mut tx, 0, &signer(0));
        tx.auth.fee += 1;

        assert!(verify_origin(&tx).is_err());
    }

    #[test]
    fn test_unverifiable_signature_bytes() {
        let mut tx = deserialize(UNSIGNED).unwrap();
        tx.auth.slots[0] = AuthSlot::Signature(MessageSignature([0xff; 65]));

        assert!(matches!(
            recover_signers(&tx),
            Err(MultisigError::InvalidSignature { index: 0, .. })
        ));
    }
}
