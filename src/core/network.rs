//! Network parameters: transaction versions, chain IDs and address versions

use crate::crypto::c32_address;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Transaction version byte for mainnet
pub const TX_VERSION_MAINNET: u8 = 0x00;
/// Transaction version byte for testnet
pub const TX_VERSION_TESTNET: u8 = 0x80;

/// Chain ID for mainnet (replay protection)
pub const CHAIN_ID_MAINNET: u32 = 0x0000_0001;
/// Chain ID for testnet (replay protection)
pub const CHAIN_ID_TESTNET: u32 = 0x8000_0000;

/// c32 address versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AddressVersion {
    /// `SM...`
    MainnetMultiSig = 20,
    /// `SN...`
    TestnetMultiSig = 21,
    /// `SP...`
    MainnetSingleSig = 22,
    /// `ST...`
    TestnetSingleSig = 26,
}

impl AddressVersion {
    /// Parse an address version byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            20 => Some(AddressVersion::MainnetMultiSig),
            21 => Some(AddressVersion::TestnetMultiSig),
            22 => Some(AddressVersion::MainnetSingleSig),
            26 => Some(AddressVersion::TestnetSingleSig),
            _ => None,
        }
    }

    /// Network this version belongs to
    pub fn network(self) -> Network {
        match self {
            AddressVersion::MainnetMultiSig | AddressVersion::MainnetSingleSig => Network::Mainnet,
            AddressVersion::TestnetMultiSig | AddressVersion::TestnetSingleSig => Network::Testnet,
        }
    }

    /// Whether this version denotes a multisig account
    pub fn is_multisig(self) -> bool {
        matches!(
            self,
            AddressVersion::MainnetMultiSig | AddressVersion::TestnetMultiSig
        )
    }

    /// Render a hash160 as an address of this version
    pub fn address(self, hash160: &[u8; 20]) -> String {
        match c32_address(self as u8, hash160) {
            Ok(address) => address,
            Err(_) => unreachable!("address versions are below 32"),
        }
    }
}

/// Network a transaction is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

impl Network {
    /// Transaction version byte
    pub fn transaction_version(self) -> u8 {
        match self {
            Network::Mainnet => TX_VERSION_MAINNET,
            Network::Testnet => TX_VERSION_TESTNET,
        }
    }

    /// Chain ID committed to by every transaction
    pub fn chain_id(self) -> u32 {
        match self {
            Network::Mainnet => CHAIN_ID_MAINNET,
            Network::Testnet => CHAIN_ID_TESTNET,
        }
    }

    /// Identify the network from a transaction's version byte and chain ID
    pub fn from_wire(version: u8, chain_id: u32) -> Option<Self> {
        match (version, chain_id) {
            (TX_VERSION_MAINNET, CHAIN_ID_MAINNET) => Some(Network::Mainnet),
            (TX_VERSION_TESTNET, CHAIN_ID_TESTNET) => Some(Network::Testnet),
            _ => None,
        }
    }

    /// Address version for multisig accounts on this network
    pub fn multisig_version(self) -> AddressVersion {
        match self {
            Network::Mainnet => AddressVersion::MainnetMultiSig,
            Network::Testnet => AddressVersion::TestnetMultiSig,
        }
    }

    /// Address version for single-signature accounts on this network
    pub fn single_sig_version(self) -> AddressVersion {
        match self {
            Network::Mainnet => AddressVersion::MainnetSingleSig,
            Network::Testnet => AddressVersion::TestnetSingleSig,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Testnet => write!(f, "testnet"),
        }
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            other => Err(format!("unknown network {:?}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_parameters() {
        assert_eq!(Network::Mainnet.transaction_version(), 0x00);
        assert_eq!(Network::Testnet.transaction_version(), 0x80);
        assert_eq!(Network::from_wire(0x00, 1), Some(Network::Mainnet));
        assert_eq!(Network::from_wire(0x80, 0x8000_0000), Some(Network::Testnet));
        assert_eq!(Network::from_wire(0x00, 0x8000_0000), None);
    }

    #[test]
    fn test_address_versions() {
        let version = Network::Testnet.multisig_version();
        assert_eq!(version as u8, 21);
        assert!(version.is_multisig());
        assert_eq!(version.network(), Network::Testnet);
        assert!(!Network::Mainnet.single_sig_version().is_multisig());
        assert_eq!(AddressVersion::from_byte(26), Some(AddressVersion::TestnetSingleSig));
        assert_eq!(AddressVersion::from_byte(5), None);
        assert_eq!(
            AddressVersion::MainnetSingleSig.address(&[0u8; 20]),
            "SP000000000000000000002Q6VF78"
        );
    }

    #[test]
    fn test_parse_network() {
        assert_eq!("Testnet".parse::<Network>(), Ok(Network::Testnet));
        assert_eq!(" mainnet ".parse::<Network>(), Ok(Network::Mainnet));
        assert!("devnet".parse::<Network>().is_err());
        assert_eq!(Network::default(), Network::Mainnet);
    }
}
