//! Batch construction of independent transfers

use super::builder::{TransactionBuilder, TransferDescriptor};
use crate::core::{serialize, MultisigTransaction};
use crate::error::MultisigError;
use rayon::prelude::*;

/// Builds many transfers at once; items share no state
#[derive(Debug, Clone, Default)]
pub struct BatchProcessor {
    builder: TransactionBuilder,
}

impl BatchProcessor {
    pub fn new(builder: TransactionBuilder) -> Self {
        Self { builder }
    }

    /// Build all descriptors, or report the lowest failing index
    pub fn process(
        &self,
        descriptors: &[TransferDescriptor],
    ) -> Result<Vec<MultisigTransaction>, MultisigError> {
        self.builder.build_batch(descriptors)
    }

    /// Build all descriptors, keeping each item's outcome
    pub fn process_partial(
        &self,
        descriptors: &[TransferDescriptor],
    ) -> Vec<Result<MultisigTransaction, MultisigError>> {
        self.builder.build_batch_partial(descriptors)
    }

    /// Build all descriptors and encode them as transport strings
    pub fn process_encoded(
        &self,
        descriptors: &[TransferDescriptor],
    ) -> Result<Vec<String>, MultisigError> {
        let txs = self.process(descriptors)?;
        Ok(txs.par_iter().map(serialize).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{deserialize, HashMode, Network};

    const SENDER: &str = "SM2R12RQCV9SCAZPM37VSCVP4X3EQK1Y70KCV7EDE";
    const RECIPIENT: &str = "ST2ZRX0K27GW0SP3GJCEMHD95TQGJMKB7G9Y0X1MH";

    fn public_keys() -> Vec<String> {
        vec![
            "02b30fafab3a12372c5d150d567034f37d60a91168009a779498168b0e9d8ec7f2".to_string(),
            "03ce61f1d155738a5e434fc8a61c3e104f891d1ec71576e8ad85abb68b34670d35".to_string(),
            "03ef2340518b5867b23598a9cf74611f8b98064f7d55cdb8c107c67b5efcbc5c77".to_string(),
        ]
    }

    fn inputs() -> Vec<TransferDescriptor> {
        vec![
            TransferDescriptor::new(RECIPIENT, "10000", "300", public_keys(), 3)
                .with_nonce("4")
                .with_network(Network::Testnet),
            TransferDescriptor::new(RECIPIENT, "100000", "777", public_keys(), 2)
                .with_network(Network::Testnet),
            TransferDescriptor::new(RECIPIENT, "50000", "300", public_keys(), 1).with_nonce("1"),
            TransferDescriptor::new(RECIPIENT, "100000", "777", public_keys(), 2).with_sender(SENDER),
        ]
    }

    #[test]
    fn test_batch_from_array() {
        let inputs = inputs();
        let txs = BatchProcessor::default().process(&inputs).unwrap();
        assert_eq!(txs.len(), inputs.len());

        for (input, tx) in inputs.iter().zip(&txs) {
            let info = tx.auth_field_info();
            assert_eq!(info.auth_fields, 3);
            assert_eq!(info.pubkeys, 3);
            assert_eq!(info.signatures, 0);
            assert_eq!(info.signatures_required, input.num_signatures);

            for (slot, key) in tx.auth.slots.iter().zip(&input.public_keys) {
                assert_eq!(slot.public_key().map(|k| k.to_hex()).as_ref(), Some(key));
            }
            assert_eq!(tx.auth.fee.to_string(), input.fee);
            assert_eq!(tx.auth.hash_mode, HashMode::P2sh);
        }

        assert_eq!(txs[0].auth.nonce, 4);
        assert_eq!(txs[1].auth.nonce, 0);
        assert_eq!(txs[2].network, Network::Mainnet);
        assert_eq!(txs[3].derived_address(), SENDER);
    }

    #[test]
    fn test_encoded_batch_decodes() {
        let processor = BatchProcessor::default();
        let encoded = processor.process_encoded(&inputs()).unwrap();
        let txs = processor.process(&inputs()).unwrap();

        for (text, tx) in encoded.iter().zip(&txs) {
            assert_eq!(&deserialize(text).unwrap(), tx);
        }
    }

    #[test]
    fn test_batch_reports_failing_index() {
        let mut inputs = inputs();
        inputs[2].public_keys.pop();
        inputs[2].num_signatures = 3;

        match BatchProcessor::default().process(&inputs) {
            Err(MultisigError::BatchItem { index, source }) => {
                assert_eq!(index, 2);
                assert!(matches!(*source, MultisigError::InvalidThreshold(_)));
            }
            other => panic!("expected batch failure, got {:?}", other),
        }

        let partial = BatchProcessor::default().process_partial(&inputs);
        assert_eq!(partial.iter().filter(|r| r.is_ok()).count(), 3);
    }
}
