//! ECDSA key management for transaction signing
//!
//! Provides key pair generation, recoverable signing, and public key recovery
//! using the secp256k1 elliptic curve. Stacks signatures are 65 bytes laid out
//! as `recovery_id || r || s`.

use rand::rngs::OsRng;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use thiserror::Error;

/// Length of a compressed secp256k1 public key
pub const PUBLIC_KEY_LENGTH: usize = 33;

/// Length of a recoverable signature (recovery id, r, s)
pub const RECOVERABLE_SIGNATURE_LENGTH: usize = 65;

/// Errors that can occur during key operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("Invalid private key")]
    InvalidPrivateKey,
    #[error("Invalid public key")]
    InvalidPublicKey,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Secp256k1 error: {0}")]
    Secp256k1Error(#[from] secp256k1::Error),
}

/// A key pair consisting of a private key and its corresponding public key
#[derive(Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from an existing secret key
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from a hex-encoded private key
    ///
    /// Accepts 32-byte keys and the 33-byte Stacks form with a trailing
    /// `01` compression flag.
    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_key.trim()).map_err(|_| KeyError::InvalidPrivateKey)?;
        let key_bytes = match bytes.len() {
            32 => &bytes[..],
            33 if bytes[32] == 0x01 => &bytes[..32],
            _ => return Err(KeyError::InvalidPrivateKey),
        };
        let secret_key =
            SecretKey::from_slice(key_bytes).map_err(|_| KeyError::InvalidPrivateKey)?;
        Ok(Self::from_secret_key(secret_key))
    }

    /// Get the private key as a hex string
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// Get the compressed public key bytes
    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.public_key.serialize()
    }

    /// Get the public key as a hex string (compressed format)
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    /// Sign a 32-byte digest, returning a recoverable signature
    pub fn sign_recoverable(&self, digest: &[u8; 32]) -> [u8; RECOVERABLE_SIGNATURE_LENGTH] {
        sign_recoverable(&self.secret_key, digest)
    }
}

/// Parse and validate a compressed public key
pub fn parse_public_key(bytes: &[u8]) -> Result<PublicKey, KeyError> {
    if bytes.len() != PUBLIC_KEY_LENGTH {
        return Err(KeyError::InvalidPublicKey);
    }
    PublicKey::from_slice(bytes).map_err(|_| KeyError::InvalidPublicKey)
}

/// Parse a public key from hex string
pub fn public_key_from_hex(hex_key: &str) -> Result<PublicKey, KeyError> {
    let bytes = hex::decode(hex_key.trim()).map_err(|_| KeyError::InvalidPublicKey)?;
    parse_public_key(&bytes)
}

/// Sign a 32-byte digest with a secret key, producing `recovery_id || r || s`
pub fn sign_recoverable(
    secret_key: &SecretKey,
    digest: &[u8; 32],
) -> [u8; RECOVERABLE_SIGNATURE_LENGTH] {
    let secp = Secp256k1::new();
    let message = Message::from_digest(*digest);
    let (recovery_id, compact) = secp
        .sign_ecdsa_recoverable(&message, secret_key)
        .serialize_compact();

    let mut out = [0u8; RECOVERABLE_SIGNATURE_LENGTH];
    out[0] = recovery_id.to_i32() as u8;
    out[1..].copy_from_slice(&compact);
    out
}

/// Recover the compressed public key that produced a recoverable signature
pub fn recover_public_key(
    digest: &[u8; 32],
    signature: &[u8; RECOVERABLE_SIGNATURE_LENGTH],
) -> Result<[u8; PUBLIC_KEY_LENGTH], KeyError> {
    let secp = Secp256k1::new();
    let recovery_id =
        RecoveryId::from_i32(signature[0] as i32).map_err(|_| KeyError::InvalidSignature)?;
    let sig = RecoverableSignature::from_compact(&signature[1..], recovery_id)
        .map_err(|_| KeyError::InvalidSignature)?;
    let message = Message::from_digest(*digest);

    let public_key = secp.recover_ecdsa(&message, &sig)?;
    Ok(public_key.serialize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::sha512_256;

    #[test]
    fn test_key_pair_generation() {
        let kp = KeyPair::generate();
        assert_eq!(kp.private_key_hex().len(), 64);
        assert_eq!(kp.public_key_bytes().len(), PUBLIC_KEY_LENGTH);
    }

    #[test]
    fn test_stacks_private_key_format() {
        // 33-byte keys carry a trailing compression flag
        let kp = KeyPair::from_private_key_hex(
            "dd7229314db5d50122cd8d4ff8975f57317f54c946cd233d8d35f5b616fe961e01",
        )
        .unwrap();
        assert_eq!(
            kp.public_key_hex(),
            "03827ffa27ad5af481203d4cf5654cd20312398fa92084ff76e4b4dffddafe1059"
        );

        let plain = KeyPair::from_private_key_hex(&kp.private_key_hex()).unwrap();
        assert_eq!(plain.public_key_hex(), kp.public_key_hex());

        assert!(KeyPair::from_private_key_hex("dd72").is_err());
        assert!(KeyPair::from_private_key_hex(
            "dd7229314db5d50122cd8d4ff8975f57317f54c946cd233d8d35f5b616fe961e02"
        )
        .is_err());
    }

    #[test]
    fn test_sign_and_recover() {
        let kp = KeyPair::generate();
        let digest = sha512_256(b"Hello, multisig!");

        let signature = kp.sign_recoverable(&digest);
        assert!(signature[0] <= 3);
        assert_eq!(
            recover_public_key(&digest, &signature).unwrap(),
            kp.public_key_bytes()
        );

        let other = sha512_256(b"a different message");
        assert_ne!(
            recover_public_key(&other, &signature).ok(),
            Some(kp.public_key_bytes())
        );
    }

    #[test]
    fn test_public_key_parsing() {
        let kp = KeyPair::generate();
        assert!(public_key_from_hex(&kp.public_key_hex()).is_ok());

        // Uncompressed keys are rejected
        let uncompressed = kp.public_key.serialize_uncompressed();
        assert_eq!(
            parse_public_key(&uncompressed),
            Err(KeyError::InvalidPublicKey)
        );
        assert!(public_key_from_hex("zz").is_err());
        assert!(parse_public_key(&[0x05; 33]).is_err());
    }
}
