//! CLI commands for the custody deployment
//!
//! Implements all command handlers for the CLI interface. Every mutating
//! command loads the saved deployment, applies one operation and saves it
//! back.

use crate::config::SystemConfig;
use crate::core::{Address, Event, Receipt, UNIT};
use crate::multisig::{Call, ExecutionOutcome, TxFilter};
use crate::storage::{Storage, StorageConfig};
use crate::system::CustodySystem;
use std::path::{Path, PathBuf};

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Decimal places of one whole unit
const UNIT_DECIMALS: usize = 18;

/// Application state
pub struct AppState {
    pub system: CustodySystem,
    pub storage: Storage,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Load the saved deployment
    pub fn new(data_dir: PathBuf) -> CliResult<Self> {
        let storage = open_storage(&data_dir)?;

        if !storage.exists() {
            return Err(format!(
                "no deployment found in {:?}. Run: custody init",
                data_dir
            )
            .into());
        }

        let system = storage.load()?;

        Ok(Self {
            system,
            storage,
            data_dir,
        })
    }

    /// Save the current state
    pub fn save(&self) -> CliResult<()> {
        self.storage.save(&self.system)?;
        Ok(())
    }

    /// Resolve `wallet` and `campaign` aliases, otherwise take the name as is
    pub fn resolve(&self, name: &str) -> Address {
        match name.trim() {
            "wallet" => self.system.wallet().address().clone(),
            "campaign" => self.system.campaign().address().clone(),
            other => Address::from(other),
        }
    }
}

fn open_storage(data_dir: &Path) -> CliResult<Storage> {
    let storage_config = StorageConfig {
        data_dir: data_dir.to_path_buf(),
        ..Default::default()
    };
    Ok(Storage::new(storage_config)?)
}

// =============================================================================
// Amount formatting
// =============================================================================

/// Parse a decimal amount of whole units (`1`, `0.5`) into base units
pub fn parse_amount(input: &str) -> CliResult<u128> {
    let input = input.trim();
    let (whole, fraction) = match input.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (input, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(format!("invalid amount: {:?}", input).into());
    }
    if fraction.len() > UNIT_DECIMALS {
        return Err(format!("too many decimal places in {}", input).into());
    }

    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse()? };
    let scaled_fraction: u128 = if fraction.is_empty() {
        0
    } else {
        let digits: u128 = fraction.parse()?;
        digits * 10u128.pow((UNIT_DECIMALS - fraction.len()) as u32)
    };

    whole
        .checked_mul(UNIT)
        .and_then(|w| w.checked_add(scaled_fraction))
        .ok_or_else(|| format!("amount too large: {}", input).into())
}

/// Format base units as a decimal amount of whole units
pub fn format_amount(amount: u128) -> String {
    let whole = amount / UNIT;
    let fraction = amount % UNIT;
    if fraction == 0 {
        return whole.to_string();
    }
    let fraction = format!("{:0width$}", fraction, width = UNIT_DECIMALS);
    format!("{}.{}", whole, fraction.trim_end_matches('0'))
}

fn describe(event: &Event) -> String {
    match event {
        Event::Submission { transaction_id } => format!("Submission #{}", transaction_id),
        Event::Confirmation {
            sender,
            transaction_id,
        } => format!("Confirmation #{} by {}", transaction_id, sender),
        Event::Revocation {
            sender,
            transaction_id,
        } => format!("Revocation #{} by {}", transaction_id, sender),
        Event::Execution { transaction_id } => format!("Execution #{}", transaction_id),
        Event::ExecutionFailure { transaction_id } => {
            format!("ExecutionFailure #{}", transaction_id)
        }
        Event::OwnerAddition { owner } => format!("OwnerAddition {}", owner),
        Event::OwnerRemoval { owner } => format!("OwnerRemoval {}", owner),
        Event::RequirementChange { required } => format!("RequirementChange {}", required),
        Event::Deposit { sender, value } => {
            format!("Deposit {} from {}", format_amount(*value), sender)
        }
        Event::Issuance { to, value } => format!("Issuance {} to {}", format_amount(*value), to),
        Event::Transfer { from, to, value } => {
            format!("Transfer {} {} -> {}", format_amount(*value), from, to)
        }
        Event::Approval {
            owner,
            spender,
            value,
        } => format!("Approval {} {} -> {}", format_amount(*value), owner, spender),
        Event::LogRefund { to, value } => format!("LogRefund {} to {}", format_amount(*value), to),
    }
}

fn print_receipt(receipt: &Receipt) {
    if receipt.is_empty() {
        println!("   (no events)");
        return;
    }
    let last = receipt.len() - 1;
    for (i, event) in receipt.events.iter().enumerate() {
        let branch = if i == last { "└─" } else { "├─" };
        println!("   {} {}", branch, describe(event));
    }
}

// =============================================================================
// Commands
// =============================================================================

/// Deploy a new wallet and campaign
pub fn cmd_init(data_dir: &Path, config_path: Option<&Path>, force: bool) -> CliResult<()> {
    let storage = open_storage(data_dir)?;

    if storage.exists() {
        if !force {
            println!("⚠️  Deployment already exists at {:?}", data_dir);
            println!("   Use --force to reinitialize (this will delete existing data)");
            return Ok(());
        }
        let removed = storage.reset()?;
        println!("🗑️  Removed {} file(s) of the previous deployment", removed);
    }

    let config = match config_path {
        Some(path) => SystemConfig::from_file(path)?,
        None => SystemConfig::default(),
    };

    let (system, receipt) = CustodySystem::new(config)?;
    storage.save(&system)?;

    let wallet = system.wallet();
    let campaign = system.campaign();
    let window = campaign.config();

    println!("✅ Deployment initialized!");
    println!("   📁 Data directory: {:?}", data_dir);
    println!("   🔐 Wallet: {}", wallet.address());
    println!("   ├─ Owners: {}", wallet.registry().description());
    println!("   └─ Created: {}", wallet.created_at().format("%Y-%m-%d %H:%M:%S UTC"));
    println!("   🪙 Campaign: {}", campaign.address());
    println!(
        "   ├─ Window: [{}, {})",
        window.start_position, window.end_position
    );
    println!("   ├─ Rate: {} per unit", window.exchange_rate);
    println!("   └─ Goal: {}", format_amount(window.min_funding_goal));
    print_receipt(&receipt);

    Ok(())
}

/// Credit value to an external account
pub fn cmd_fund(state: &mut AppState, account: &str, amount: &str) -> CliResult<()> {
    let account = state.resolve(account);
    let amount = parse_amount(amount)?;

    state.system.fund(&account, amount)?;
    state.save()?;

    println!("💰 Funded {} with {}", account, format_amount(amount));
    println!(
        "   Balance: {}",
        format_amount(state.system.balance_of(&account))
    );
    Ok(())
}

/// Move the ordering position forward
pub fn cmd_advance(state: &mut AppState, to: Option<u64>, count: u64) -> CliResult<()> {
    let position = match to {
        Some(target) => state.system.advance_to(target)?,
        None => {
            let target = state.system.position().saturating_add(count);
            state.system.advance_to(target)?
        }
    };
    state.save()?;

    println!("⏩ Position: {}", position);
    println!("   Campaign: {}", state.system.phase());
    Ok(())
}

/// Send value into the wallet
pub fn cmd_deposit(state: &mut AppState, from: &str, amount: &str) -> CliResult<()> {
    let from = state.resolve(from);
    let amount = parse_amount(amount)?;

    let receipt = state.system.deposit(&from, amount)?;
    state.save()?;

    println!("📥 Deposited into wallet");
    print_receipt(&receipt);
    Ok(())
}

/// Contribute value to the campaign
pub fn cmd_contribute(state: &mut AppState, from: &str, amount: &str) -> CliResult<()> {
    let from = state.resolve(from);
    let amount = parse_amount(amount)?;

    let receipt = state.system.contribute(&from, amount)?;
    state.save()?;

    println!("🪙 Contribution accepted");
    print_receipt(&receipt);
    println!(
        "   Issued balance: {}",
        format_amount(state.system.campaign().balance_of(&from))
    );
    Ok(())
}

/// Propose a transaction. Without an explicit target, governance calls go to
/// the wallet and `finalize()` goes to the campaign.
pub fn cmd_propose(
    state: &mut AppState,
    from: &str,
    call: &str,
    target: Option<&str>,
    value: Option<&str>,
) -> CliResult<()> {
    let from = state.resolve(from);
    let call: Call = call.parse()?;
    let value = match value {
        Some(value) => parse_amount(value)?,
        None => 0,
    };

    let target = match target {
        Some(target) => state.resolve(target),
        None if call.is_governance() => state.system.wallet().address().clone(),
        None if call == Call::Finalize => state.system.campaign().address().clone(),
        None => return Err("a plain transfer needs --target".into()),
    };

    let receipt = state.system.submit(&from, target.clone(), value, &call)?;
    state.save()?;

    println!("📤 Proposed {} -> {}", call, target);
    if value > 0 {
        println!("   Value: {}", format_amount(value));
    }
    print_receipt(&receipt);
    Ok(())
}

pub fn cmd_confirm(state: &mut AppState, id: u64, from: &str) -> CliResult<()> {
    let from = state.resolve(from);

    let receipt = state.system.confirm(id, &from)?;
    state.save()?;

    println!("✍️  Confirmed transaction #{}", id);
    print_receipt(&receipt);
    Ok(())
}

pub fn cmd_revoke(state: &mut AppState, id: u64, from: &str) -> CliResult<()> {
    let from = state.resolve(from);

    let receipt = state.system.revoke(id, &from)?;
    state.save()?;

    println!("↩️  Revoked confirmation on #{}", id);
    print_receipt(&receipt);
    Ok(())
}

pub fn cmd_execute(state: &mut AppState, id: u64, from: &str) -> CliResult<()> {
    let from = state.resolve(from);

    let receipt = state.system.execute(id, &from)?;
    state.save()?;

    println!("⚙️  Executed transaction #{}", id);
    print_receipt(&receipt);
    Ok(())
}

/// Reclaim a contribution from a failed campaign
pub fn cmd_refund(state: &mut AppState, from: &str) -> CliResult<()> {
    let from = state.resolve(from);

    let receipt = state.system.refund(&from)?;
    state.save()?;

    println!("💸 Refund paid");
    print_receipt(&receipt);
    Ok(())
}

/// Roll the deployment back to a saved backup generation
pub fn cmd_restore(state: &mut AppState, generation: usize) -> CliResult<()> {
    let available = state.storage.list_backups();
    if !available.contains(&generation) {
        println!("❌ Backup {} not found", generation);
        println!("   Available: {:?}", available);
        return Ok(());
    }

    state.system = state.storage.restore_backup(generation)?;

    println!("⏪ Restored backup {}", generation);
    println!("   Position: {}", state.system.position());
    println!("   Campaign: {}", state.system.phase());
    Ok(())
}

/// Show wallet and campaign state
pub fn cmd_status(state: &AppState) -> CliResult<()> {
    let system = &state.system;
    let wallet = system.wallet();
    let campaign = system.campaign();

    println!("📍 Position: {}", system.position());
    println!();
    println!("🔐 Wallet {}", wallet.address());
    println!("   ├─ Threshold: {}", wallet.registry().description());
    for owner in wallet.owners() {
        println!("   ├─ Owner: {}", owner);
    }
    println!(
        "   ├─ Pending: {}",
        wallet.transaction_count(TxFilter::PENDING)
    );
    println!(
        "   └─ Balance: {}",
        format_amount(wallet.balance(system.ledger()))
    );
    println!();
    println!("🪙 Campaign {}", campaign.address());
    println!("   ├─ State: {}", system.phase());
    println!(
        "   ├─ Raised: {} (goal {})",
        format_amount(campaign.total_raised()),
        format_amount(campaign.config().min_funding_goal)
    );
    println!(
        "   ├─ Held: {}",
        format_amount(campaign.held_value(system.ledger()))
    );
    println!("   ├─ Total supply: {}", format_amount(campaign.total_supply()));
    println!("   └─ Holders: {}", campaign.holder_count());

    let funded = system.ledger().accounts();
    if !funded.is_empty() {
        println!();
        println!(
            "💰 Ledger ({} funded in total)",
            format_amount(system.total_funded())
        );
        let last = funded.len() - 1;
        for (i, (account, balance)) in funded.into_iter().enumerate() {
            let branch = if i == last { "└─" } else { "├─" };
            println!("   {} {}: {}", branch, account, format_amount(*balance));
        }
    }

    let stats = state.storage.stats()?;
    println!();
    println!("📁 Storage {:?}", stats.data_dir);
    println!("   ├─ State file: {} bytes", stats.file_size);
    println!("   └─ Backups: {}", stats.backup_count);

    match system.verify() {
        Ok(()) => println!("\n✅ Conservation checks pass"),
        Err(e) => println!("\n❌ Conservation check FAILED: {}", e),
    }
    Ok(())
}

/// List wallet transactions
pub fn cmd_transactions(
    state: &AppState,
    pending: bool,
    executed: bool,
    offset: usize,
    limit: usize,
) -> CliResult<()> {
    let wallet = state.system.wallet();
    // No flags means both
    let filter = if pending || executed {
        TxFilter::from_flags(pending, executed)
    } else {
        TxFilter::all()
    };

    let ids = wallet.transaction_ids(offset, limit, filter);
    if ids.is_empty() {
        println!("📭 No transactions found.");
        return Ok(());
    }

    println!(
        "📋 Transactions ({} of {}):",
        ids.len(),
        wallet.transaction_count(filter)
    );
    for id in ids {
        let tx = match wallet.transaction(id) {
            Some(tx) => tx,
            None => continue,
        };
        let call = Call::decode(&tx.payload)
            .map(|c| c.to_string())
            .unwrap_or_else(|_| format!("0x{}", hex::encode(&tx.payload)));
        let status = if tx.is_pending() {
            format!(
                "pending {}/{}",
                wallet.confirmation_count(id),
                wallet.threshold()
            )
        } else if tx.succeeded() {
            "executed".to_string()
        } else {
            match &tx.outcome {
                Some(ExecutionOutcome::Failed(reason)) => format!("failed: {}", reason),
                _ => "failed".to_string(),
            }
        };

        println!("   #{} {} -> {} [{}]", id, call, tx.target, status);
        if tx.value > 0 {
            println!("      value {}", format_amount(tx.value));
        }
        let confirmations: Vec<String> = wallet
            .confirmations(id)
            .iter()
            .map(|a| a.to_string())
            .collect();
        if !confirmations.is_empty() {
            println!("      confirmed by {}", confirmations.join(", "));
        }
    }
    Ok(())
}

/// Show value and issued balances for an account
pub fn cmd_balance(state: &AppState, account: &str) -> CliResult<()> {
    let account = state.resolve(account);
    let campaign = state.system.campaign();

    println!("💰 Balance for {}", account);
    println!(
        "   ├─ Value: {}",
        format_amount(state.system.balance_of(&account))
    );
    println!(
        "   ├─ Issued: {}",
        format_amount(campaign.balance_of(&account))
    );
    println!(
        "   └─ Contributed: {}",
        format_amount(campaign.contribution_of(&account))
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1").unwrap(), UNIT);
        assert_eq!(parse_amount("0.5").unwrap(), UNIT / 2);
        assert_eq!(parse_amount(".25").unwrap(), UNIT / 4);
        assert_eq!(parse_amount("2.").unwrap(), 2 * UNIT);
        assert_eq!(parse_amount("0.000000000000000001").unwrap(), 1);

        assert!(parse_amount("").is_err());
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("0.0000000000000000001").is_err());
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(UNIT), "1");
        assert_eq!(format_amount(UNIT / 2), "0.5");
        assert_eq!(format_amount(5500 * UNIT), "5500");
        assert_eq!(format_amount(1), "0.000000000000000001");
        assert_eq!(format_amount(0), "0");
    }

    #[test]
    fn test_init_then_load() {
        let dir = tempfile::tempdir().unwrap();
        cmd_init(dir.path(), None, false).unwrap();

        let mut state = AppState::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(state.system.wallet().owners().len(), 2);

        cmd_fund(&mut state, "acct5", "3").unwrap();
        cmd_advance(&mut state, Some(10), 1).unwrap();
        cmd_contribute(&mut state, "acct5", "1").unwrap();
        cmd_propose(&mut state, "acct0", "finalize()", None, None).unwrap();

        let state = AppState::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(state.system.position(), 10);
        assert_eq!(state.system.campaign().contribution_of(&"acct5".into()), UNIT);
        assert_eq!(state.system.wallet().transaction_count(TxFilter::all()), 1);
        assert_eq!(
            state.resolve("campaign"),
            *state.system.campaign().address()
        );
    }

    #[test]
    fn test_forced_init_discards_previous_deployment() {
        let dir = tempfile::tempdir().unwrap();
        cmd_init(dir.path(), None, false).unwrap();
        let mut state = AppState::new(dir.path().to_path_buf()).unwrap();
        cmd_fund(&mut state, "acct5", "1").unwrap();
        cmd_advance(&mut state, None, 3).unwrap();
        assert!(!state.storage.list_backups().is_empty());

        // Without --force the deployment is kept
        cmd_init(dir.path(), None, false).unwrap();
        assert_eq!(AppState::new(dir.path().to_path_buf()).unwrap().system.position(), 3);

        cmd_init(dir.path(), None, true).unwrap();
        let state = AppState::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(state.system.position(), 0);
        assert_eq!(state.system.total_funded(), 0);
        assert!(state.storage.list_backups().is_empty());
        cmd_status(&state).unwrap();
    }

    #[test]
    fn test_restore_rolls_back_one_save() {
        let dir = tempfile::tempdir().unwrap();
        cmd_init(dir.path(), None, false).unwrap();
        let mut state = AppState::new(dir.path().to_path_buf()).unwrap();
        cmd_advance(&mut state, Some(4), 1).unwrap();
        cmd_advance(&mut state, Some(9), 1).unwrap();

        cmd_restore(&mut state, 0).unwrap();
        assert_eq!(state.system.position(), 4);
        assert_eq!(AppState::new(dir.path().to_path_buf()).unwrap().system.position(), 4);

        // Unknown generation leaves the state alone
        cmd_restore(&mut state, 4).unwrap();
        assert_eq!(state.system.position(), 4);
    }

    #[test]
    fn test_missing_deployment() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppState::new(dir.path().to_path_buf()).is_err());
    }
}
