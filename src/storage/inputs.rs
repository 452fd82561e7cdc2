//! Input and output files
//!
//! Transfer records and build options are JSON. Transaction lists are JSON
//! arrays of base64 transport strings, the form co-signers pass around.

use crate::core::{deserialize, serialize, MultisigTransaction};
use crate::error::MultisigError;
use crate::multisig::{BuildOptions, TransferDescriptor};
use serde::Deserialize;
use std::fs;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Transaction {index} could not be decoded: {source}")]
    Transaction {
        index: usize,
        #[source]
        source: MultisigError,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(value: OneOrMany<T>) -> Self {
        match value {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, StorageError> {
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

/// Load transfer records: a JSON array, or a single record object
pub fn load_transfer_descriptors(path: &Path) -> Result<Vec<TransferDescriptor>, StorageError> {
    let records: OneOrMany<TransferDescriptor> = read_json(path)?;
    let records: Vec<TransferDescriptor> = records.into();
    if let Some(index) = records.iter().position(|r| r.public_keys.is_empty()) {
        return Err(StorageError::InvalidData(format!(
            "record {} lists no public keys",
            index
        )));
    }
    log::debug!("Loaded {} transfer records from {}", records.len(), path.display());
    Ok(records)
}

/// Load encoded transactions without decoding them
pub fn load_encoded_transactions(path: &Path) -> Result<Vec<String>, StorageError> {
    let encoded: OneOrMany<String> = read_json(path)?;
    Ok(encoded.into())
}

/// Load and decode a list of encoded transactions
pub fn load_transactions(path: &Path) -> Result<Vec<MultisigTransaction>, StorageError> {
    load_encoded_transactions(path)?
        .iter()
        .enumerate()
        .map(|(index, text)| {
            deserialize(text).map_err(|source| StorageError::Transaction { index, source })
        })
        .collect()
}

/// Write transactions as a JSON array of transport strings
pub fn save_transactions(
    txs: &[MultisigTransaction],
    path: &Path,
) -> Result<(), StorageError> {
    let encoded: Vec<String> = txs.iter().map(serialize).collect();
    save_encoded_transactions(&encoded, path)
}

pub fn save_encoded_transactions(encoded: &[String], path: &Path) -> Result<(), StorageError> {
    let file = fs::File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, encoded)?;
    log::debug!("Wrote {} transactions to {}", encoded.len(), path.display());
    Ok(())
}

/// Load build options; absent fields keep their defaults
pub fn load_build_options(path: &Path) -> Result<BuildOptions, StorageError> {
    read_json(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{serialize_bytes, AnchorMode, Network, PostConditionMode};
    use crate::multisig::{BatchProcessor, KeyHandle, SigningCoordinator, SoftwareSigner};

    const PRIVATE_KEYS: [&str; 3] = [
        "dd7229314db5d50122cd8d4ff8975f57317f54c946cd233d8d35f5b616fe961e01",
        "119a851bd1201b93e6477a0a9c7d29515735530df92ab265166ca3da119f803501",
        "22d45b79bda06915c5d1a98da577089763b6c660304d3919e50797352dc6722f01",
    ];

    const RECORDS: &str = r#"[
        { "recipient": "ST2ZRX0K27GW0SP3GJCEMHD95TQGJMKB7G9Y0X1MH", "fee": "300", "amount": "10000",
          "publicKeys": ["03827ffa27ad5af481203d4cf5654cd20312398fa92084ff76e4b4dffddafe1059",
                         "03a9d11f6d4102ed323740f95668d6f206c5b5cbc5ce5c7028ceba1736fbbd6861",
                         "0205132dbd1270f66adaf43723940a98be6331abe95bfa53838815bf214a5a2150"],
          "numSignatures": 3, "nonce": "4", "network": "testnet" },
        { "recipient": "ST2ZRX0K27GW0SP3GJCEMHD95TQGJMKB7G9Y0X1MH", "fee": "777", "amount": "100000",
          "publicKeys": ["03827ffa27ad5af481203d4cf5654cd20312398fa92084ff76e4b4dffddafe1059",
                         "03a9d11f6d4102ed323740f95668d6f206c5b5cbc5ce5c7028ceba1736fbbd6861",
                         "0205132dbd1270f66adaf43723940a98be6331abe95bfa53838815bf214a5a2150"],
          "numSignatures": 2, "network": "testnet" },
        { "recipient": "ST2ZRX0K27GW0SP3GJCEMHD95TQGJMKB7G9Y0X1MH", "fee": "300", "amount": "50000",
          "publicKeys": ["03827ffa27ad5af481203d4cf5654cd20312398fa92084ff76e4b4dffddafe1059",
                         "03a9d11f6d4102ed323740f95668d6f206c5b5cbc5ce5c7028ceba1736fbbd6861",
                         "0205132dbd1270f66adaf43723940a98be6331abe95bfa53838815bf214a5a2150"],
          "numSignatures": 1, "nonce": "1" },
        { "recipient": "ST2ZRX0K27GW0SP3GJCEMHD95TQGJMKB7G9Y0X1MH", "fee": "777", "amount": "100000",
          "publicKeys": ["03827ffa27ad5af481203d4cf5654cd20312398fa92084ff76e4b4dffddafe1059",
                         "03a9d11f6d4102ed323740f95668d6f206c5b5cbc5ce5c7028ceba1736fbbd6861",
                         "0205132dbd1270f66adaf43723940a98be6331abe95bfa53838815bf214a5a2150"],
          "numSignatures": 2, "sender": "SM3NHYK961DV49C160MQZ7N6K1DAZJF4DQFQMT4AY" }
    ]"#;

    #[test]
    fn test_batch_file_yields_independent_transactions() {
        let temp_dir = tempfile::tempdir().unwrap();
        let input_path = temp_dir.path().join("inputs.json");
        fs::write(&input_path, RECORDS).unwrap();

        let records = load_transfer_descriptors(&input_path).unwrap();
        assert_eq!(records.len(), 4);

        let txs = BatchProcessor::default().process(&records).unwrap();
        let tx_path = temp_dir.path().join("txs.json");
        save_transactions(&txs, &tx_path).unwrap();

        let mut loaded = load_transactions(&tx_path).unwrap();
        assert_eq!(loaded, txs);
        assert_eq!(loaded[1].network, Network::Testnet);
        assert_eq!(loaded[2].network, Network::Mainnet);

        let untouched: Vec<Vec<u8>> = loaded[1..].iter().map(serialize_bytes).collect();

        let mut signer = SoftwareSigner::from_private_keys(&PRIVATE_KEYS).unwrap();
        SigningCoordinator::new(&mut signer)
            .sign_one(&mut loaded[0], &KeyHandle::multisig(0))
            .unwrap();

        assert_eq!(loaded[0].signature_count(), 1);
        let after: Vec<Vec<u8>> = loaded[1..].iter().map(serialize_bytes).collect();
        assert_eq!(after, untouched);
    }

    #[test]
    fn test_single_record_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("one.json");
        let records: serde_json::Value = serde_json::from_str(RECORDS).unwrap();
        fs::write(&path, records[2].to_string()).unwrap();

        let loaded = load_transfer_descriptors(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].num_signatures, 1);
    }

    #[test]
    fn test_structural_errors() {
        let temp_dir = tempfile::tempdir().unwrap();

        let missing = temp_dir.path().join("missing.json");
        assert!(matches!(
            load_transfer_descriptors(&missing),
            Err(StorageError::IoError(_))
        ));

        let malformed = temp_dir.path().join("malformed.json");
        fs::write(&malformed, r#"[{ "recipient": "SP000000000000000000002Q6VF78" }]"#).unwrap();
        assert!(matches!(
            load_transfer_descriptors(&malformed),
            Err(StorageError::SerializationError(_))
        ));

        let no_keys = temp_dir.path().join("no_keys.json");
        fs::write(
            &no_keys,
            r#"{ "recipient": "SP000000000000000000002Q6VF78", "fee": "1", "amount": "1",
                 "publicKeys": [], "numSignatures": 1 }"#,
        )
        .unwrap();
        assert!(matches!(
            load_transfer_descriptors(&no_keys),
            Err(StorageError::InvalidData(_))
        ));

        let bad_tx = temp_dir.path().join("bad_tx.json");
        fs::write(&bad_tx, r#"["AAAA"]"#).unwrap();
        assert!(matches!(
            load_transactions(&bad_tx),
            Err(StorageError::Transaction { index: 0, .. })
        ));
    }

    #[test]
    fn test_build_options_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{ "defaultNetwork": "testnet", "anchorMode": "on_chain_only" }"#).unwrap();

        let options = load_build_options(&path).unwrap();
        assert_eq!(options.default_network, Network::Testnet);
        assert_eq!(options.anchor_mode, AnchorMode::OnChainOnly);
        assert_eq!(options.post_condition_mode, PostConditionMode::Deny);
    }
}
