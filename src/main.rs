// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # wallet CLI
//!
//! Subcommands:
//! - `wallet allowance` - Get, set, increase or reduce a beneficiary's allowance
//! - `wallet owner`     - Get or transfer contract ownership
//! - `wallet monitor`   - Stream contract events as JSON until interrupted
//! - `wallet deploy`    - Deploy the wallet contract

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use relational_allowance_wallet::{
    blockchain::{run_allowance, run_owner, with_deadline, EvmClient},
    config::{AppConfig, Overrides, DEFAULT_CONFIG_FILE},
    deploy::{deploy_contract, read_bytecode},
    logging::{setup_logging, LogFormat},
    monitor::EventMonitor,
    report::LogReporter,
    WalletError, WalletResult,
};

/// Time allowed for a graceful shutdown after a signal before forcing exit.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Exit status for bad input or configuration; every other failure exits with 1.
const INPUT_ERROR_STATUS: u8 = 2;

/// Operator CLI for the allowance wallet contract.
#[derive(Parser)]
#[command(name = "wallet", version, about)]
struct Cli {
    /// Path to the YAML config file.
    #[arg(long, short = 'f', global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Account private key (hex or PEM); overrides SW_BLOCKCHAIN_PK.
    #[arg(long = "pk", short = 'k', global = true)]
    private_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Change or read the allowance of a beneficiary.
    Allowance {
        /// Action to perform: set, get, increase or reduce.
        #[arg(long)]
        action: String,

        /// Beneficiary address.
        #[arg(long = "target-address", short = 't')]
        target_address: String,

        /// Amount in ether (ignored by `get`).
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        amount: i64,

        /// Contract address; overrides the configured one.
        #[arg(long = "contract-address", short = 'c')]
        contract_address: Option<String>,
    },

    /// Read or transfer contract ownership.
    Owner {
        /// Action to perform: transfer or get.
        #[arg(long)]
        action: String,

        /// New owner address (required by `transfer`).
        #[arg(long = "target-address", short = 't')]
        target_address: Option<String>,

        /// Contract address; overrides the configured one.
        #[arg(long = "contract-address", short = 'c')]
        contract_address: Option<String>,
    },

    /// Print contract events as JSON until interrupted.
    Monitor {
        /// Contract address; overrides the configured one.
        #[arg(long = "contract-address", short = 'c')]
        contract_address: Option<String>,
    },

    /// Deploy the wallet contract.
    Deploy {
        /// File holding the hex-encoded creation bytecode.
        #[arg(long)]
        bytecode: PathBuf,
    },
}

impl Commands {
    fn contract_address(&self) -> Option<String> {
        match self {
            Commands::Allowance {
                contract_address, ..
            }
            | Commands::Owner {
                contract_address, ..
            }
            | Commands::Monitor { contract_address } => contract_address.clone(),
            Commands::Deploy { .. } => None,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_logging(LogFormat::from_env()) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_signals(shutdown.clone()));

    // The monitor unwinds on cancellation by itself; other commands are cut short
    let graceful = matches!(cli.command, Commands::Monitor { .. });

    let outcome = tokio::select! {
        result = run(cli, shutdown.clone()) => result,
        _ = interrupted(shutdown.clone(), graceful) => {
            eprintln!("Error: interrupted");
            return ExitCode::FAILURE;
        }
    };

    tracing::debug!("Closing application");
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(exit_status(&e))
        }
    }
}

fn exit_status(err: &WalletError) -> u8 {
    if err.is_input_error() {
        INPUT_ERROR_STATUS
    } else {
        1
    }
}

async fn run(cli: Cli, shutdown: CancellationToken) -> WalletResult<()> {
    let overrides = Overrides {
        private_key: cli.private_key,
        contract_address: cli.command.contract_address(),
    };
    let config = AppConfig::load(&cli.config, &overrides)?;
    let runner = config.runner_config();
    let timeout = config.blockchain.timeout;
    let reporter = LogReporter;

    match cli.command {
        Commands::Allowance {
            action,
            target_address,
            amount,
            ..
        } => {
            let client = dial(&config.blockchain.ws, timeout).await?;
            let output =
                run_allowance(&client, &runner, &reporter, &action, &target_address, amount).await?;
            println!("{output}");
        }
        Commands::Owner {
            action,
            target_address,
            ..
        } => {
            let client = dial(&config.blockchain.ws, timeout).await?;
            let output =
                run_owner(&client, &runner, &reporter, &action, target_address.as_deref()).await?;
            println!("{output}");
        }
        Commands::Monitor { .. } => {
            let client = Arc::new(dial(&config.blockchain.ws, timeout).await?);
            EventMonitor::new(client, config.contract.address, timeout, Arc::new(reporter))
                .start(shutdown)
                .await?;
        }
        Commands::Deploy { bytecode } => {
            let bytecode = read_bytecode(&bytecode)?;
            let client = dial(&config.blockchain.address, timeout).await?;
            let deployment = deploy_contract(&client, &runner, &reporter, bytecode).await?;
            println!("Contract deployed at address {}", deployment.address);
        }
    }

    Ok(())
}

async fn dial(endpoint: &str, timeout: Duration) -> WalletResult<EvmClient> {
    with_deadline("dial node", timeout, EvmClient::connect(endpoint)).await
}

/// Resolves once `shutdown` is cancelled, or never when `graceful`.
async fn interrupted(shutdown: CancellationToken, graceful: bool) {
    shutdown.cancelled().await;
    if graceful {
        std::future::pending::<()>().await
    }
}

/// Cancel `shutdown` on the first signal, then force exit after a grace period.
async fn watch_signals(shutdown: CancellationToken) {
    wait_for_signal().await;
    tracing::info!("Shutdown signal received");
    shutdown.cancel();

    tokio::time::sleep(SHUTDOWN_GRACE).await;
    tracing::warn!("Fallback exit");
    std::process::exit(1);
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut streams = Vec::new();
    for kind in [SignalKind::terminate(), SignalKind::hangup()] {
        match signal(kind) {
            Ok(stream) => streams.push(stream),
            Err(e) => tracing::warn!(error = %e, "Failed to install signal handler"),
        }
    }

    let others = async {
        match streams.as_mut_slice() {
            [term, hup] => {
                tokio::select! {
                    _ = term.recv() => {},
                    _ = hup.recv() => {},
                }
            }
            [one] => {
                one.recv().await;
            }
            _ => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = others => {},
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
