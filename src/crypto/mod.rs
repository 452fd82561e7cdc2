//! Cryptographic utilities
//!
//! This module provides:
//! - SHA-256, hash160 and SHA-512/256 hashing
//! - c32check address encoding
//! - ECDSA key management (secp256k1) with recoverable signatures

pub mod c32;
pub mod hash;
pub mod keys;

pub use c32::{
    b58_to_c32, c32_address, c32_address_decode, c32_decode, c32_encode, c32_to_b58,
    c32check_decode, c32check_encode, C32Error,
};
pub use hash::{checksum, double_sha256, hash160, sha256, sha256_hex, sha512_256};
pub use keys::{
    parse_public_key, public_key_from_hex, recover_public_key, sign_recoverable, KeyError,
    KeyPair, PUBLIC_KEY_LENGTH, RECOVERABLE_SIGNATURE_LENGTH,
};
