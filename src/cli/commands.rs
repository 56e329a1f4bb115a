//! CLI commands for the wallet simulator
//!
//! Implements all command handlers for the CLI interface.

use crate::ledger::ETHER;
use crate::scenario::{Scenario, ScenarioReport, ScenarioRunner};
use crate::storage::{save_to_file, StateSnapshot, StorageConfig, WalletStore};
use std::path::{Path, PathBuf};

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Options shared by the commands that run a scenario
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub data_dir: PathBuf,
    /// Print the report as JSON instead of text
    pub json: bool,
    /// Persist the final state to the data directory
    pub save: bool,
}

fn open_store(data_dir: &Path) -> CliResult<WalletStore> {
    let config = StorageConfig {
        data_dir: data_dir.to_path_buf(),
        ..Default::default()
    };
    Ok(WalletStore::new(config)?)
}

/// Format base units as ether when they divide evenly
fn format_amount(amount: u128) -> String {
    if amount != 0 && amount % ETHER == 0 {
        format!("{} ether", amount / ETHER)
    } else {
        format!("{} wei", amount)
    }
}

/// Run the built-in reentrancy attack
pub fn cmd_demo(options: &RunOptions) -> CliResult<()> {
    run_scenario(Scenario::multi_attack(), options)
}

/// Run a scenario file
pub fn cmd_run(path: &Path, options: &RunOptions) -> CliResult<()> {
    let scenario = Scenario::load(path)?;
    run_scenario(scenario, options)
}

fn run_scenario(scenario: Scenario, options: &RunOptions) -> CliResult<()> {
    let runner = ScenarioRunner::new(scenario)?;
    let (report, sim) = runner.run()?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if options.save {
        let store = open_store(&options.data_dir)?;
        store.save(&StateSnapshot::capture(&sim.wallet, &sim.ledger))?;
        if !options.json {
            println!("\n💾 State saved to {:?}", store.data_dir());
        }
    }

    Ok(())
}

fn print_report(report: &ScenarioReport) {
    println!("🧪 Scenario: {}", report.name);
    println!("   📍 Wallet: {}", report.wallet);
    println!("   💰 Initial balance: {}", format_amount(report.initial_balance));
    println!();

    for step in &report.steps {
        let marker = if step.succeeded() { "✅" } else { "❌" };
        println!("   {} [{}] {}", marker, step.index, step.description);
        if let Some(e) = &step.error {
            println!("      └─ {}", e);
        }
        println!("      └─ balance: {}", format_amount(step.balance_after));
    }

    for (receiver, attempts) in &report.reentry_attempts {
        if attempts.is_empty() {
            continue;
        }
        println!("\n   🔁 Reentry attempts by {}:", receiver);
        for attempt in attempts {
            let outcome = attempt.error.as_deref().unwrap_or("succeeded");
            println!(
                "   ├─ depth {} as {} for {}: {}",
                attempt.depth,
                attempt.caller,
                format_amount(attempt.amount),
                outcome
            );
        }
    }

    println!();
    println!("   👥 Owners: {}", report.owners.join(", "));
    for (owner, right) in &report.rights {
        println!("   ├─ {}: {:?}", owner, right);
    }
    println!("   📤 Sent out: {}", format_amount(report.total_sent));
    println!("   💰 Final balance: {}", format_amount(report.final_balance));
}

/// Show the saved wallet state
pub fn cmd_inspect(data_dir: &Path) -> CliResult<()> {
    let store = open_store(data_dir)?;

    if !store.exists() {
        println!("📭 No saved wallet state in {:?}", data_dir);
        println!("   Run a scenario with --save first.");
        return Ok(());
    }

    let snapshot = store.load()?;
    let saved_at = snapshot.saved_at;
    let (wallet, ledger) = snapshot.restore();

    println!("👛 Wallet {}", wallet.address());
    println!("   ├─ Deployer: {}", wallet.deployer());
    if let Some(label) = &wallet.config().label {
        println!("   ├─ Label: {}", label);
    }
    println!("   ├─ Balance: {}", format_amount(wallet.get_balance(&ledger)));
    println!("   ├─ Owners: {}", wallet.owners().join(", "));
    println!("   ├─ Rights consumed: {}", wallet.consumed_count());
    println!("   └─ Saved at: {}", saved_at);

    let events = wallet.events();
    if !events.is_empty() {
        println!("\n📜 Last events:");
        for event in events.iter().rev().take(10) {
            println!("   {} {:?}", event.timestamp.format("%H:%M:%S"), event.kind);
        }
    }

    Ok(())
}

/// Export the saved state to a file
pub fn cmd_export(data_dir: &Path, output: &Path) -> CliResult<()> {
    let store = open_store(data_dir)?;
    let snapshot = store.load()?;
    save_to_file(&snapshot, output)?;

    println!("📦 Exported wallet {} to {:?}", snapshot.wallet.address, output);
    Ok(())
}

/// List saved backups
pub fn cmd_backups(data_dir: &Path) -> CliResult<()> {
    let store = open_store(data_dir)?;
    let backups = store.list_backups();

    if backups.is_empty() {
        println!("📭 No backups found");
        return Ok(());
    }

    println!("🗂️  Backups:");
    for index in backups {
        println!("   └─ {}", index);
    }

    Ok(())
}

/// Restore a backup as the current state
pub fn cmd_restore(data_dir: &Path, index: usize) -> CliResult<()> {
    let store = open_store(data_dir)?;
    let snapshot = store.restore_backup(index)?;

    println!("♻️  Restored backup {}", index);
    println!("   📍 Wallet: {}", snapshot.wallet.address);
    println!("   🕒 Saved at: {}", snapshot.saved_at);

    Ok(())
}
