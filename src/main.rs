//! stx-multisig CLI Application
//!
//! Builds, signs and finalizes Stacks multisig token transfers.

use clap::{Args, Parser, Subcommand};
use stacks_multisig::cli::{self, AppConfig};
use stacks_multisig::core::Network;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stx-multisig")]
#[command(version)]
#[command(about = "M-of-N multisig STX transfers", long_about = None)]
struct Cli {
    /// JSON file with build options
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Network to build for (mainnet or testnet)
    #[arg(short, long, global = true)]
    network: Option<Network>,

    #[command(subcommand)]
    command: Commands,
}

/// Transactions to operate on
#[derive(Args)]
struct TxSource {
    /// Base64 encoded transaction
    #[arg(long, conflicts_with = "input")]
    tx: Option<String>,

    /// JSON file holding a list of encoded transactions
    #[arg(short, long)]
    input: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive the multisig address of a key set
    Address {
        /// Hex public keys, in slot order
        #[arg(short, long = "pubkey", required = true, value_delimiter = ',')]
        pubkeys: Vec<String>,

        /// Required signatures (M)
        #[arg(short = 'm', long)]
        threshold: u16,
    },

    /// Build unsigned transactions from a records file
    CreateTx {
        /// JSON array of transfer records
        #[arg(short, long)]
        input: PathBuf,

        /// Write encoded transactions to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print transactions as JSON
    Decode {
        #[command(flatten)]
        source: TxSource,
    },

    /// Show signing progress
    Info {
        #[command(flatten)]
        source: TxSource,
    },

    /// Sign with software private keys
    Sign {
        #[command(flatten)]
        source: TxSource,

        /// Hex private keys, tried in order
        #[arg(short, long = "key", required = true, value_delimiter = ',')]
        keys: Vec<String>,

        /// Write encoded transactions to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print broadcast-ready hex of fully signed transactions
    Finalize {
        #[command(flatten)]
        source: TxSource,
    },

    /// Convert a Bitcoin address to its Stacks form (or back)
    B58ToC32 {
        address: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref(), cli.network)?;

    match cli.command {
        Commands::Address { pubkeys, threshold } => {
            cli::cmd_address(&config, &pubkeys, threshold)?;
        }

        Commands::CreateTx { input, output } => {
            cli::cmd_create_tx(&config, &input, output.as_ref())?;
        }

        Commands::Decode { source } => {
            let txs = cli::read_transactions(source.tx.as_deref(), source.input.as_deref())?;
            cli::cmd_decode(&txs)?;
        }

        Commands::Info { source } => {
            let txs = cli::read_transactions(source.tx.as_deref(), source.input.as_deref())?;
            cli::cmd_info(&txs)?;
        }

        Commands::Sign {
            source,
            keys,
            output,
        } => {
            let mut txs = cli::read_transactions(source.tx.as_deref(), source.input.as_deref())?;
            cli::cmd_sign(&mut txs, &keys, output.as_ref())?;
        }

        Commands::Finalize { source } => {
            let txs = cli::read_transactions(source.tx.as_deref(), source.input.as_deref())?;
            cli::cmd_finalize(&txs)?;
        }

        Commands::B58ToC32 { address } => {
            cli::cmd_convert_address(&address)?;
        }
    }

    Ok(())
}
