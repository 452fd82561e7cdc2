//! CLI commands for multisig transfers
//!
//! Implements all command handlers for the CLI interface.

use crate::core::{deserialize, serialize, txid, MultisigTransaction, Network, StacksPublicKey};
use crate::crypto::{b58_to_c32, c32_to_b58};
use crate::error::MultisigError;
use crate::multisig::{
    derive_address, finalize, verify_origin, BatchProcessor, BuildOptions, KeyHandle,
    SigningCoordinator, SoftwareSigner, TransactionBuilder,
};
use crate::storage::{
    load_build_options, load_transactions, load_transfer_descriptors, save_transactions,
};
use std::path::{Path, PathBuf};

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Settings shared by all commands
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub options: BuildOptions,
    /// Forces the network for every transaction built
    pub network: Option<Network>,
}

impl AppConfig {
    /// Load options from an optional JSON file and apply the network override
    pub fn load(config: Option<&Path>, network: Option<Network>) -> CliResult<Self> {
        let mut options = match config {
            Some(path) => load_build_options(path)?,
            None => BuildOptions::default(),
        };
        if let Some(network) = network {
            options.default_network = network;
        }
        Ok(Self { options, network })
    }
}

/// Where to read transactions from: an inline string or a JSON list file
pub fn read_transactions(tx: Option<&str>, input: Option<&Path>) -> CliResult<Vec<MultisigTransaction>> {
    match (tx, input) {
        (Some(encoded), None) => Ok(vec![deserialize(encoded)?]),
        (None, Some(path)) => Ok(load_transactions(path)?),
        _ => Err("pass exactly one of --tx or --input".into()),
    }
}

fn write_transactions(txs: &[MultisigTransaction], output: Option<&PathBuf>) -> CliResult<()> {
    match output {
        Some(path) => {
            save_transactions(txs, path)?;
            println!("💾 Saved {} transaction(s) to {:?}", txs.len(), path);
        }
        None => {
            for tx in txs {
                println!("{}", serialize(tx));
            }
        }
    }
    Ok(())
}

/// Derive a multisig address from public keys
pub fn cmd_address(config: &AppConfig, pubkeys: &[String], threshold: u16) -> CliResult<()> {
    let keys = pubkeys
        .iter()
        .map(|k| StacksPublicKey::from_hex(k))
        .collect::<Result<Vec<_>, _>>()?;
    let network = config.network.unwrap_or(config.options.default_network);

    let given = derive_address(&keys, threshold, network)?;
    let mut sorted_keys = keys.clone();
    sorted_keys.sort();
    let sorted = derive_address(&sorted_keys, threshold, network)?;

    println!("🔐 {}-of-{} multisig on {}", threshold, keys.len(), network);
    println!("   📍 Address (keys as given): {}", given);
    if sorted != given {
        println!("   📍 Address (keys sorted):   {}", sorted);
    }
    Ok(())
}

/// Build unsigned transactions from a JSON records file
pub fn cmd_create_tx(config: &AppConfig, input: &Path, output: Option<&PathBuf>) -> CliResult<()> {
    let records = load_transfer_descriptors(input)?;
    let records: Vec<_> = match config.network {
        Some(network) => records.into_iter().map(|r| r.with_network(network)).collect(),
        None => records,
    };

    let processor = BatchProcessor::new(TransactionBuilder::with_options(config.options.clone()));
    let txs = processor.process(&records)?;

    println!("✅ Built {} unsigned transaction(s)", txs.len());
    for (i, tx) in txs.iter().enumerate() {
        println!(
            "   {} ─ {} → {} : {} microSTX (fee {}, {}-of-{})",
            i,
            tx.derived_address(),
            tx.payload.recipient,
            tx.payload.amount,
            tx.auth.fee,
            tx.auth.signatures_required,
            tx.auth.slots.len()
        );
    }
    write_transactions(&txs, output)
}

/// Print a transaction as JSON
pub fn cmd_decode(txs: &[MultisigTransaction]) -> CliResult<()> {
    for tx in txs {
        println!("{}", serde_json::to_string_pretty(tx)?);
    }
    Ok(())
}

/// Show signing progress for each transaction
pub fn cmd_info(txs: &[MultisigTransaction]) -> CliResult<()> {
    for (i, tx) in txs.iter().enumerate() {
        let info = tx.auth_field_info();
        println!("📜 Transaction {}", i);
        println!("   ├─ From: {}", tx.derived_address());
        println!("   ├─ To: {}", tx.payload.recipient);
        println!("   ├─ Amount: {} microSTX", tx.payload.amount);
        println!("   ├─ Fee: {} microSTX, nonce {}", tx.auth.fee, tx.auth.nonce);
        if !tx.payload.memo.is_empty() {
            println!("   ├─ Memo: {}", tx.payload.memo);
        }
        println!(
            "   ├─ Signatures: {}/{} ({} key slots open, {})",
            info.signatures, info.signatures_required, info.pubkeys, tx.state()
        );
        match verify_origin(tx) {
            Ok(()) => println!("   ├─ Signatures verify against the sender"),
            Err(e) => println!("   ├─ ⚠️  {}", e),
        }
        println!("   └─ TxID: {}", txid(tx));
    }
    Ok(())
}

/// Sign transactions with software private keys
///
/// Keys are tried in order; keys that do not belong to a transaction, or
/// already signed it, are skipped.
pub fn cmd_sign(
    txs: &mut [MultisigTransaction],
    private_keys: &[String],
    output: Option<&PathBuf>,
) -> CliResult<()> {
    let mut signer = SoftwareSigner::from_private_keys(private_keys)?;
    let handles: Vec<KeyHandle> = (0..private_keys.len() as u32).map(KeyHandle::multisig).collect();

    {
        let mut session = SigningCoordinator::new(&mut signer);
        for (i, tx) in txs.iter_mut().enumerate() {
            for handle in &handles {
                if tx.is_fully_signed() {
                    break;
                }
                match session.sign_one(tx, handle) {
                    Ok(slot) => println!("✍️  Transaction {}: signed slot {}", i, slot),
                    Err(e @ (MultisigError::UnknownSigner(_) | MultisigError::AlreadySigned(_))) => {
                        log::warn!("Transaction {}: skipping key {}: {}", i, handle, e);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            println!(
                "   Transaction {} has {}/{} signatures",
                i,
                tx.signature_count(),
                tx.auth.signatures_required
            );
        }
    }

    write_transactions(txs, output)
}

/// Print broadcast-ready hex for fully signed transactions
pub fn cmd_finalize(txs: &[MultisigTransaction]) -> CliResult<()> {
    for tx in txs {
        let bytes = finalize(tx)?;
        verify_origin(tx)?;
        println!("{}", hex::encode(bytes));
        log::info!("Finalized {}", txid(tx));
    }
    Ok(())
}

/// Convert between Bitcoin base58check and Stacks c32check addresses
pub fn cmd_convert_address(address: &str) -> CliResult<()> {
    let address = address.trim();
    if address.starts_with('S') {
        println!("{}", c32_to_b58(address)?);
    } else {
        println!("{}", b58_to_c32(address)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_config_network_override() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{ "defaultNetwork": "mainnet" }"#).unwrap();

        let config = AppConfig::load(Some(path.as_path()), Some(Network::Testnet)).unwrap();
        assert_eq!(config.options.default_network, Network::Testnet);

        let config = AppConfig::load(None, None).unwrap();
        assert_eq!(config.options, BuildOptions::default());
    }

    #[test]
    fn test_read_transactions_requires_one_source() {
        assert!(read_transactions(None, None).is_err());
        assert!(read_transactions(Some("AAAA"), None).is_err());
    }

    #[test]
    fn test_create_sign_finalize() {
        let temp_dir = tempfile::tempdir().unwrap();
        let input = temp_dir.path().join("inputs.json");
        let unsigned = temp_dir.path().join("unsigned.json");
        let signed = temp_dir.path().join("signed.json");
        fs::write(
            &input,
            r#"[{ "recipient": "SP000000000000000000002Q6VF78", "fee": "300", "amount": "1000",
                  "publicKeys": ["03827ffa27ad5af481203d4cf5654cd20312398fa92084ff76e4b4dffddafe1059",
                                 "03a9d11f6d4102ed323740f95668d6f206c5b5cbc5ce5c7028ceba1736fbbd6861",
                                 "0205132dbd1270f66adaf43723940a98be6331abe95bfa53838815bf214a5a2150"],
                  "numSignatures": 2 }]"#,
        )
        .unwrap();

        let config = AppConfig::default();
        cmd_create_tx(&config, &input, Some(&unsigned)).unwrap();

        let mut txs = read_transactions(None, Some(unsigned.as_path())).unwrap();
        assert!(cmd_finalize(&txs).is_err());

        let keys = vec![
            "dd7229314db5d50122cd8d4ff8975f57317f54c946cd233d8d35f5b616fe961e01".to_string(),
            "119a851bd1201b93e6477a0a9c7d29515735530df92ab265166ca3da119f803501".to_string(),
        ];
        cmd_sign(&mut txs, &keys, Some(&signed)).unwrap();

        let txs = read_transactions(None, Some(signed.as_path())).unwrap();
        assert!(txs[0].is_fully_signed());
        cmd_finalize(&txs).unwrap();
    }
}
