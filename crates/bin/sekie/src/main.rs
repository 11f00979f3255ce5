//! sekie lending CLI
//!
//! Runs lifecycle phases of the sekie lending module, one transaction each.
//!
//! ## Usage
//!
//! ```bash
//! # mint the collateral once
//! sekie --config sekie.toml create-collection
//! sekie --config sekie.toml create-token
//!
//! # single phases
//! sekie init-pool
//! sekie offer
//! sekie select
//! sekie pay-loan
//!
//! # several phases, stopping at the first failure
//! sekie run init-pool offer select pay-loan
//!
//! # print a payload without submitting it
//! sekie payload select
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use sekie_client::{
    DispatchError, Identity, LendingConfig, LendingOrchestrator, Phase, PhaseReport, RestClient,
    Role, TxHash,
};

#[derive(Parser)]
#[command(name = "sekie")]
#[command(about = "NFT-collateralized lending client for the sekie module")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file with network, identities, assets and pool parameters
    #[arg(short, long, default_value = "sekie.toml", global = true)]
    config: String,

    /// Override the fullnode URL from the config
    #[arg(long, global = true)]
    node_url: Option<String>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a participant's coin balance
    Balance {
        /// lender, borrower or admin
        #[arg(default_value = "lender")]
        role: Role,
    },

    /// Create the collateral collection (signed by the borrower)
    CreateCollection,

    /// Mint the collateral token (signed by the borrower)
    CreateToken,

    /// Create the collection's loan pool (signed by the admin)
    InitPool,

    /// Deposit the configured amount into the pool (signed by the lender)
    Offer,

    /// Withdraw the lender's open offer (signed by the lender)
    Revoke,

    /// Borrow against the configured token (signed by the borrower)
    Select,

    /// Repay the open loan (signed by the borrower)
    PayLoan,

    /// Run phases in order, stopping at the first failure
    Run {
        /// init-pool, offer, revoke, select, pay-loan
        #[arg(required = true)]
        phases: Vec<Phase>,
    },

    /// Print the payload of a phase without submitting it
    Payload {
        phase: Phase,
    },

    /// Generate a fresh identity for a role
    Keygen {
        #[arg(default_value = "lender")]
        role: Role,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "sekie=info,sekie_client=info",
        1 => "sekie=debug,sekie_client=debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.into()),
        )
        .init();

    // keygen needs no config
    if let Commands::Keygen { role } = cli.command {
        print_identity(&Identity::generate(role));
        return Ok(());
    }

    let mut config = LendingConfig::load(&cli.config)
        .with_context(|| format!("failed to load config {}", cli.config))?;
    if let Some(url) = cli.node_url {
        config.network.node_url = url;
    }

    let ledger = RestClient::from_config(&config.network);
    info!("using {} (module {})", ledger.api_url(), config.network.module());
    let lending = LendingOrchestrator::new(config, ledger);

    match cli.command {
        Commands::Balance { role } => {
            let balance = lending.balance(role).await?;
            println!("{} {}", balance, lending.config().network.coin_type);
        }
        Commands::CreateCollection => report("create_collection", lending.create_collection().await)?,
        Commands::CreateToken => report("create_token", lending.create_token().await)?,
        Commands::InitPool => report_phase(lending.run_phase(Phase::InitPool).await)?,
        Commands::Offer => report_phase(lending.run_phase(Phase::LenderOffer).await)?,
        Commands::Revoke => report_phase(lending.run_phase(Phase::LenderRevoke).await)?,
        Commands::Select => report_phase(lending.run_phase(Phase::BorrowerSelect).await)?,
        Commands::PayLoan => report_phase(lending.run_phase(Phase::BorrowerPayLoan).await)?,
        Commands::Run { phases } => {
            let reports = lending.run_sequence(&phases).await;
            let completed = reports.iter().filter(|r| r.is_success()).count();
            for r in reports {
                report_phase(r)?;
            }
            info!("{}/{} phases completed", completed, phases.len());
        }
        Commands::Payload { phase } => {
            let payload = lending.payload_for(phase);
            println!("signer: {} {}", phase.signer(), lending.signer_for(phase).address());
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        Commands::Keygen { role } => print_identity(&Identity::generate(role)),
    }

    Ok(())
}

fn report(what: &str, outcome: Result<TxHash, DispatchError>) -> Result<()> {
    match outcome {
        Ok(hash) => {
            println!("{}: {}", what, hash);
            Ok(())
        }
        Err(e) => anyhow::bail!("{} failed ({}): {}", what, e.kind(), e.message()),
    }
}

fn report_phase(r: PhaseReport) -> Result<()> {
    report(&format!("{} [{}]", r.phase, r.signer), r.outcome)
}

fn print_identity(identity: &Identity) {
    println!("[identities.{}]", identity.role());
    println!("address = \"{}\"", identity.address());
    println!("public_key = \"{}\"", identity.public_key_hex());
    println!("private_key = \"{}\"", identity.private_key_hex().as_str());
}
