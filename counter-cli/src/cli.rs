use clap::{Args, Parser, Subcommand, ValueEnum};

use stacks_counter::NetworkType;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum NetworkChoice {
    Devnet,
    Testnet,
    Mainnet,
}

impl From<NetworkChoice> for NetworkType {
    fn from(choice: NetworkChoice) -> Self {
        match choice {
            NetworkChoice::Devnet => NetworkType::Devnet,
            NetworkChoice::Testnet => NetworkType::Testnet,
            NetworkChoice::Mainnet => NetworkType::Mainnet,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "counter-cli")]
#[command(about = "Read and update the Stacks counter contract")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub network: NetworkOptions,

    #[command(subcommand)]
    pub command: Commands,
}

/// Overrides layered on top of the environment configuration
#[derive(Debug, Args)]
pub struct NetworkOptions {
    /// Network to use instead of STACKS_NETWORK.
    #[arg(long, global = true, value_enum)]
    pub network: Option<NetworkChoice>,

    /// API endpoint to use instead of STACKS_API_URL.
    #[arg(long, global = true)]
    pub api_url: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Follow the counter value and chain height until interrupted.
    Watch,
    /// List the devnet simulated accounts.
    Accounts,
    /// Submit `increment` from a devnet account.
    Increment(WriteArgs),
    /// Submit `decrement` from a devnet account.
    Decrement(WriteArgs),
    /// Show a transaction's status.
    Status(StatusArgs),
    /// Print the latest burn block height.
    Height,
}

#[derive(Debug, Args)]
pub struct WriteArgs {
    /// Devnet account name (wallet_1) or address.
    #[arg(long, default_value = "wallet_1")]
    pub account: String,

    /// Return as soon as the transaction is accepted.
    #[arg(long)]
    pub no_wait: bool,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Transaction id, with or without 0x.
    pub txid: String,
}
