//! Ordered signature collection
//!
//! Signatures are appended strictly left to right: a slot may only be signed
//! while every slot after it still holds a public key, because each signature
//! commits to the sighash produced by the signatures before it.

use super::sighash::{presign_hash_at, recover_signers};
use super::signer::{KeyHandle, Signer, SignerError};
use crate::core::{
    serialize_bytes, AuthFieldInfo, AuthSlot, MessageSignature, MultisigTransaction,
    StacksPublicKey,
};
use crate::crypto::recover_public_key;
use crate::error::MultisigError;

/// A signing session holding exclusive access to one device
///
/// The device is released when the session is dropped.
pub struct SigningCoordinator<'d, S: Signer + ?Sized> {
    signer: &'d mut S,
}

impl<'d, S: Signer + ?Sized> SigningCoordinator<'d, S> {
    pub fn new(signer: &'d mut S) -> Self {
        log::debug!("Signing session opened");
        Self { signer }
    }

    /// Sign the slot belonging to the key at `handle`
    ///
    /// Returns the index of the slot that was signed. On any error `tx` is
    /// left unchanged.
    pub fn sign_one(
        &mut self,
        tx: &mut MultisigTransaction,
        handle: &KeyHandle,
    ) -> Result<usize, MultisigError> {
        let device_key = self.signer.public_key(handle)?;
        let pubkey = StacksPublicKey::from_slice(&device_key).map_err(|_| {
            SignerError::Transport(format!(
                "device returned invalid public key {}",
                hex::encode(device_key)
            ))
        })?;

        let index = match tx
            .auth
            .slots
            .iter()
            .position(|slot| slot.public_key() == Some(&pubkey))
        {
            Some(index) => index,
            None => return Err(missing_signer(tx, &pubkey)),
        };

        if tx.is_fully_signed() {
            return Err(MultisigError::AlreadyComplete(tx.auth.signatures_required));
        }

        // only the first unsigned slot may be signed
        let signed_after = tx.signers_after(&pubkey).unwrap_or_default();
        if index != tx.auth.signed_prefix_len() || !signed_after.is_empty() {
            return Err(MultisigError::OutOfOrderSigning {
                index,
                signed_after,
            });
        }

        let response = self.signer.sign(handle, &serialize_bytes(tx))?;
        if !response.status.is_success() {
            log::warn!("Device at {} refused to sign: {}", handle, response.status);
            return Err(SignerError::Status(response.status).into());
        }

        let presign = presign_hash_at(tx, index);
        match recover_public_key(&presign, &response.signature) {
            Ok(recovered) if recovered == *pubkey.as_bytes() => {}
            _ => {
                return Err(SignerError::Transport(format!(
                    "signature from {} does not verify against slot {}",
                    handle, index
                ))
                .into())
            }
        }

        tx.auth.slots[index] = AuthSlot::Signature(MessageSignature(response.signature));
        log::info!(
            "Signed slot {} ({} of {} signatures)",
            index,
            tx.signature_count(),
            tx.auth.signatures_required
        );
        Ok(index)
    }

    /// Sign with each handle in turn, stopping once the transaction is complete
    pub fn sign_all(
        &mut self,
        tx: &mut MultisigTransaction,
        handles: &[KeyHandle],
    ) -> Result<Vec<usize>, MultisigError> {
        let mut signed = Vec::new();
        for handle in handles {
            if tx.is_fully_signed() {
                break;
            }
            signed.push(self.sign_one(tx, handle)?);
        }
        Ok(signed)
    }
}

impl<S: Signer + ?Sized> Drop for SigningCoordinator<'_, S> {
    fn drop(&mut self) {
        self.signer.release();
        log::debug!("Signing session closed");
    }
}

/// Classify a key that holds no unsigned slot
fn missing_signer(tx: &MultisigTransaction, pubkey: &StacksPublicKey) -> MultisigError {
    let recovered = recover_signers(tx).unwrap_or_default();
    match recovered.iter().find(|(_, key)| key == pubkey) {
        Some((index, _)) => MultisigError::AlreadySigned(*index),
        None => MultisigError::UnknownSigner(pubkey.to_hex()),
    }
}

/// Wire bytes of a transaction carrying its required signatures
///
/// Only the leading run of signed slots counts towards the threshold, and a
/// signature after an unsigned slot is rejected.
pub fn finalize(tx: &MultisigTransaction) -> Result<Vec<u8>, MultisigError> {
    let have = tx.signature_count();
    let need = tx.auth.signatures_required;
    if have < need as usize {
        return Err(MultisigError::IncompleteSignatures { have, need });
    }
    if !tx.auth.is_signed_prefix() {
        return Err(MultisigError::MalformedInput(format!(
            "signatures after unsigned slot {}",
            have
        )));
    }
    Ok(serialize_bytes(tx))
}

/// Signed slots after the unsigned slot holding `pubkey`
pub fn signers_after(tx: &MultisigTransaction, pubkey: &StacksPublicKey) -> Option<Vec<usize>> {
    tx.signers_after(pubkey)
}

pub fn auth_field_info(tx: &MultisigTransaction) -> AuthFieldInfo {
    tx.auth_field_info()
}
