//! Principals: the recipients of token transfers
//!
//! A principal is either a standard account (`SP...`) or a contract
//! (`SP....contract-name`).

use super::network::{AddressVersion, Network};
use crate::crypto::c32_address_decode;
use crate::error::MultisigError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Upper bound on contract name length
pub const CONTRACT_NAME_MAX_LENGTH: usize = 128;

/// A standard account principal
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StandardPrincipal {
    pub version: u8,
    pub hash160: [u8; 20],
}

impl StandardPrincipal {
    /// Network this principal's version belongs to, if the version is known
    pub fn network(&self) -> Option<Network> {
        AddressVersion::from_byte(self.version).map(AddressVersion::network)
    }
}

impl fmt::Display for StandardPrincipal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match crate::crypto::c32_address(self.version, &self.hash160) {
            Ok(address) => write!(f, "{}", address),
            Err(_) => write!(f, "<invalid version {}>", self.version),
        }
    }
}

/// Recipient of a token transfer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Principal {
    Standard(StandardPrincipal),
    Contract {
        address: StandardPrincipal,
        name: String,
    },
}

impl Principal {
    /// The account part of the principal
    pub fn address(&self) -> &StandardPrincipal {
        match self {
            Principal::Standard(address) => address,
            Principal::Contract { address, .. } => address,
        }
    }
}

/// Check a contract name against the Clarity naming rules
pub fn validate_contract_name(name: &str) -> Result<(), MultisigError> {
    let mut chars = name.chars();
    let valid_start = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if !valid_start || !valid_rest || name.len() > CONTRACT_NAME_MAX_LENGTH {
        return Err(MultisigError::InvalidAddress(format!(
            "invalid contract name {:?}",
            name
        )));
    }
    Ok(())
}

impl FromStr for Principal {
    type Err = MultisigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (address_part, contract_name) = match s.split_once('.') {
            Some((address, name)) => (address, Some(name)),
            None => (s, None),
        };

        let (version, hash160) = c32_address_decode(address_part)
            .map_err(|e| MultisigError::InvalidAddress(format!("{}: {}", address_part, e)))?;
        let address = StandardPrincipal { version, hash160 };

        match contract_name {
            None => Ok(Principal::Standard(address)),
            Some(name) => {
                validate_contract_name(name)?;
                Ok(Principal::Contract {
                    address,
                    name: name.to_string(),
                })
            }
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Principal::Standard(address) => write!(f, "{}", address),
            Principal::Contract { address, name } => write!(f, "{}.{}", address, name),
        }
    }
}

impl Serialize for Principal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_standard() {
        let principal: Principal = "ST2ZRX0K27GW0SP3GJCEMHD95TQGJMKB7G9Y0X1MH".parse().unwrap();
        assert_eq!(principal.address().version, 26);
        assert_eq!(principal.address().network(), Some(Network::Testnet));
        assert_eq!(
            principal.to_string(),
            "ST2ZRX0K27GW0SP3GJCEMHD95TQGJMKB7G9Y0X1MH"
        );
    }

    #[test]
    fn test_parse_contract() {
        let principal: Principal = "SP000000000000000000002Q6VF78.pox-4".parse().unwrap();
        match &principal {
            Principal::Contract { address, name } => {
                assert_eq!(address.hash160, [0u8; 20]);
                assert_eq!(name, "pox-4");
            }
            other => panic!("expected contract principal, got {:?}", other),
        }
        assert_eq!(principal.to_string(), "SP000000000000000000002Q6VF78.pox-4");
    }

    #[test]
    fn test_invalid_principals() {
        assert!(matches!(
            "not-an-address".parse::<Principal>(),
            Err(MultisigError::InvalidAddress(_))
        ));
        assert!("SP000000000000000000002Q6VF78.4pox".parse::<Principal>().is_err());
        assert!("SP000000000000000000002Q6VF78.".parse::<Principal>().is_err());
        assert!("SP000000000000000000002Q6VF79".parse::<Principal>().is_err());
    }
}
