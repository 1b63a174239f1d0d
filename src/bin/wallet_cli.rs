//! Demo CLI: derive addresses and look up balances across every
//! supported chain from one hex-encoded master seed.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use wayfinder_wallet::{Chain, DeriveParams, MasterSeed, Sdk, ALL_CHAINS};

#[derive(Parser)]
#[command(name = "wallet-cli", about = "Deterministic multi-chain HD wallet demo CLI")]
struct Cli {
    /// Hex-encoded master seed. Generate one with `openssl rand -hex 32`.
    #[arg(long, global = true)]
    seed: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every chain tag the SDK supports.
    ListChains,
    /// Derive and print the address for one (scope, user, chain, index).
    Address {
        #[arg(long, default_value = "wallet-cli")]
        scope: String,
        #[arg(long, default_value = "demo-user")]
        user: String,
        #[arg(long)]
        chain: Chain,
        #[arg(long, default_value = "0")]
        index: String,
    },
    /// Derive addresses for every supported chain at the same index.
    AddressAll {
        #[arg(long, default_value = "wallet-cli")]
        scope: String,
        #[arg(long, default_value = "demo-user")]
        user: String,
        #[arg(long, default_value = "0")]
        index: String,
    },
    /// Fetch the on-chain balance for a derived address.
    Balance {
        #[arg(long, default_value = "wallet-cli")]
        scope: String,
        #[arg(long, default_value = "demo-user")]
        user: String,
        #[arg(long)]
        chain: Chain,
        #[arg(long, default_value = "0")]
        index: String,
    },
}

fn seed_from_arg(seed: Option<String>) -> Result<MasterSeed> {
    let hex_seed = seed.context("--seed is required for this command")?;
    Ok(MasterSeed::from_hex(&hex_seed).context("invalid --seed")?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::ListChains => {
            for chain in ALL_CHAINS {
                println!("{}", chain.as_str());
            }
        }
        Command::Address { scope, user, chain, index } => {
            let sdk = Sdk::new(seed_from_arg(cli.seed)?).await?;
            let wallet = sdk.create_wallet()?;
            let params = DeriveParams::new(scope, user, chain, index)?;
            let address = wallet.derive_address(&params).await?;
            println!("{}: {}", chain.as_str(), address);
        }
        Command::AddressAll { scope, user, index } => {
            let sdk = Sdk::new(seed_from_arg(cli.seed)?).await?;
            let wallet = sdk.create_wallet()?;
            for &chain in ALL_CHAINS {
                let params = DeriveParams::new(scope.clone(), user.clone(), chain, index.clone())?;
                match wallet.derive_address(&params).await {
                    Ok(address) => println!("{:<10} {}", chain.as_str(), address),
                    Err(e) => println!("{:<10} <error: {}>", chain.as_str(), e.message),
                }
            }
        }
        Command::Balance { scope, user, chain, index } => {
            let sdk = Sdk::new(seed_from_arg(cli.seed)?).await?;
            let wallet = sdk.create_wallet()?;
            let params = DeriveParams::new(scope, user, chain, index)?;
            let balance = wallet.balance(&params).await?;
            println!("{} {}", balance, chain.as_str());
        }
    }

    Ok(())
}
