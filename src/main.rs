//! Custody CLI Application
//!
//! A command-line interface for operating a custody wallet and its token
//! sale.

use clap::{Parser, Subcommand};
use custody_sale::cli::{self, AppState};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "custody")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "A quorum-gated custody wallet and token sale", long_about = None)]
struct Cli {
    /// Data directory for deployment storage
    #[arg(short, long, default_value = ".custody_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a new wallet and campaign
    Init {
        /// JSON deployment config (owners, required, beneficiary, campaign)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Overwrite an existing deployment
        #[arg(long)]
        force: bool,
    },

    /// Credit value to an account
    Fund {
        /// Account to credit
        #[arg(short, long)]
        account: String,

        /// Amount in whole units (e.g. 1.5)
        #[arg(short = 'n', long)]
        amount: String,
    },

    /// Advance the ordering position
    Advance {
        /// Target position
        #[arg(short, long)]
        to: Option<u64>,

        /// Positions to advance by when no target is given
        #[arg(short, long, default_value = "1")]
        count: u64,
    },

    /// Send value into the wallet
    Deposit {
        #[arg(short, long)]
        from: String,

        #[arg(short = 'n', long)]
        amount: String,
    },

    /// Contribute value to the campaign
    Contribute {
        #[arg(short, long)]
        from: String,

        #[arg(short = 'n', long)]
        amount: String,
    },

    /// Propose a wallet transaction
    Propose {
        /// Proposing owner
        #[arg(short, long)]
        from: String,

        /// Call in signature form, e.g. addOwner(acct4), finalize(), transfer
        call: String,

        /// Target account (`wallet`, `campaign` or an address)
        #[arg(short, long)]
        target: Option<String>,

        /// Value attached, in whole units
        #[arg(short, long)]
        value: Option<String>,
    },

    /// Confirm a transaction
    Confirm {
        id: u64,

        #[arg(short, long)]
        from: String,
    },

    /// Revoke a confirmation
    Revoke {
        id: u64,

        #[arg(short, long)]
        from: String,
    },

    /// Execute a confirmed transaction
    Execute {
        id: u64,

        #[arg(short, long)]
        from: String,
    },

    /// Reclaim a contribution after a failed campaign
    Refund {
        #[arg(short, long)]
        from: String,
    },

    /// Roll back to a saved backup (0 is the newest)
    Restore {
        #[arg(short, long, default_value = "0")]
        backup: usize,
    },

    /// Display wallet and campaign state
    Status,

    /// List wallet transactions
    Transactions {
        /// Include pending transactions
        #[arg(long)]
        pending: bool,

        /// Include executed transactions
        #[arg(long)]
        executed: bool,

        #[arg(long, default_value = "0")]
        offset: usize,

        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Show balances for an account
    Balance {
        /// Account (`wallet`, `campaign` or an address)
        account: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Handle init command separately (doesn't need saved state)
    if let Commands::Init { config, force } = &cli.command {
        return cli::cmd_init(&cli.data_dir, config.as_deref(), *force);
    }

    let mut state = AppState::new(cli.data_dir.clone())?;

    match cli.command {
        Commands::Init { .. } => unreachable!(),

        Commands::Fund { account, amount } => {
            cli::cmd_fund(&mut state, &account, &amount)?;
        }

        Commands::Advance { to, count } => {
            cli::cmd_advance(&mut state, to, count)?;
        }

        Commands::Deposit { from, amount } => {
            cli::cmd_deposit(&mut state, &from, &amount)?;
        }

        Commands::Contribute { from, amount } => {
            cli::cmd_contribute(&mut state, &from, &amount)?;
        }

        Commands::Propose {
            from,
            call,
            target,
            value,
        } => {
            cli::cmd_propose(
                &mut state,
                &from,
                &call,
                target.as_deref(),
                value.as_deref(),
            )?;
        }

        Commands::Confirm { id, from } => {
            cli::cmd_confirm(&mut state, id, &from)?;
        }

        Commands::Revoke { id, from } => {
            cli::cmd_revoke(&mut state, id, &from)?;
        }

        Commands::Execute { id, from } => {
            cli::cmd_execute(&mut state, id, &from)?;
        }

        Commands::Refund { from } => {
            cli::cmd_refund(&mut state, &from)?;
        }

        Commands::Restore { backup } => {
            cli::cmd_restore(&mut state, backup)?;
        }

        Commands::Status => {
            cli::cmd_status(&state)?;
        }

        Commands::Transactions {
            pending,
            executed,
            offset,
            limit,
        } => {
            cli::cmd_transactions(&state, pending, executed, offset, limit)?;
        }

        Commands::Balance { account } => {
            cli::cmd_balance(&state, &account)?;
        }
    }

    Ok(())
}
