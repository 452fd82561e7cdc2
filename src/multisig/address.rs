//! Multisig address derivation and matching
//!
//! Address = c32check(multisig version, hash160(redeem script)). The redeem
//! script commits to key order, so the same key set yields a different
//! address for every permutation.

use crate::core::{p2sh_hash, AddressVersion, Network, StacksPublicKey};
use crate::crypto::c32_address_decode;
use crate::error::MultisigError;

/// hash160 of the M-of-N redeem script over `pubkeys` in the given order
pub fn multisig_hash160(
    pubkeys: &[StacksPublicKey],
    threshold: u16,
) -> Result<[u8; 20], MultisigError> {
    p2sh_hash(pubkeys, threshold)
}

/// Derive the multisig address of `pubkeys` in the exact order given
pub fn derive_address(
    pubkeys: &[StacksPublicKey],
    threshold: u16,
    network: Network,
) -> Result<String, MultisigError> {
    let hash = multisig_hash160(pubkeys, threshold)?;
    Ok(network.multisig_version().address(&hash))
}

/// Decode and checksum-validate a c32 address
pub fn parse_address(address: &str) -> Result<(u8, [u8; 20]), MultisigError> {
    c32_address_decode(address)
        .map_err(|e| MultisigError::InvalidAddress(format!("{}: {}", address.trim(), e)))
}

/// Network encoded in an address's version character
pub fn address_network(address: &str) -> Result<Network, MultisigError> {
    let (version, _) = parse_address(address)?;
    AddressVersion::from_byte(version)
        .map(AddressVersion::network)
        .ok_or_else(|| {
            MultisigError::InvalidAddress(format!("{}: unknown address version {}", address, version))
        })
}

/// Find the key order whose address equals `expected`
///
/// Tries lexicographically sorted order first, then the order given, and
/// returns the keys in the matching order.
pub fn match_address(
    pubkeys: &[StacksPublicKey],
    threshold: u16,
    expected: &str,
) -> Result<Vec<StacksPublicKey>, MultisigError> {
    let expected = expected.trim();
    let network = address_network(expected)?;

    let mut sorted = pubkeys.to_vec();
    sorted.sort();
    let sorted_address = derive_address(&sorted, threshold, network)?;
    if sorted_address == expected {
        log::debug!("{} matched with keys in sorted order", expected);
        return Ok(sorted);
    }

    let given_address = derive_address(pubkeys, threshold, network)?;
    if given_address == expected {
        log::debug!("{} matched with keys in given order", expected);
        return Ok(pubkeys.to_vec());
    }

    Err(MultisigError::AddressMismatch {
        expected: expected.to_string(),
        sorted: sorted_address,
        given: given_address,
    })
}
