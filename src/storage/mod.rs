//! Storage module for transfer records and encoded transactions

pub mod inputs;

pub use inputs::{
    load_build_options, load_encoded_transactions, load_transactions, load_transfer_descriptors,
    save_encoded_transactions, save_transactions, StorageError,
};
