//! cflip - switch Claude Code between API providers.
//!
//! ```bash
//! cflip status                      # active provider and models
//! cflip switch glm --api-key KEY    # install, store key, switch
//! cflip model sonnet glm-4.6        # remap one category
//! cflip backup prune --older-than 14d
//! cflip snapshot restore snapshot-glm-20250101-120000
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use cflip::archive::{format_stamp, ArchiveEntry};
use cflip::config::{Configuration, CredentialStatus};
use cflip::logging::{filter_directive, init_tracing};
use cflip::settings::default_settings_path;
use cflip::{ConfigStore, ModelCategory, ProviderRegistry, SettingsDocument, SwitchOutcome, Switcher};

#[derive(Parser)]
#[command(name = "cflip")]
#[command(about = "Switch Claude Code between API providers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ~/.cflip/config.toml).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Claude Code settings file (default: ~/.claude/settings.json).
    #[arg(long, global = true, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Debug logging.
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Errors only.
    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the active provider, models and settings file state.
    Status,

    /// List configured and installable providers.
    List,

    /// Switch to a provider.
    Switch {
        provider: String,
        /// Store this API key for the provider before switching.
        #[arg(long, value_name = "KEY")]
        api_key: Option<String>,
    },

    /// Map a model category to a model of the active provider.
    Model {
        #[arg(value_parser = parse_category)]
        category: ModelCategory,
        model_id: String,
    },

    /// Manage settings backups.
    #[command(subcommand)]
    Backup(BackupCommand),

    /// Manage per-provider snapshots.
    #[command(subcommand)]
    Snapshot(SnapshotCommand),
}

#[derive(Subcommand)]
enum BackupCommand {
    /// Back up the current settings file.
    Create {
        #[arg(long, short)]
        description: Option<String>,
    },
    List,
    /// Copy a backup over the settings file.
    Restore { id: String },
    Delete { id: String },
    /// Delete backups older than the given age.
    Prune {
        #[arg(long, default_value = "7d", value_parser = humantime::parse_duration)]
        older_than: std::time::Duration,
    },
    Stats,
}

#[derive(Subcommand)]
enum SnapshotCommand {
    List,
    /// Copy a snapshot over the settings file.
    Restore { id: String },
}

fn parse_category(s: &str) -> std::result::Result<ModelCategory, String> {
    s.parse()
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(Configuration::config_path);

    let configured_level = Configuration::read_from(&config_path)
        .ok()
        .map(|config| config.settings.log_level);
    init_tracing(&filter_directive(
        cli.verbose,
        cli.quiet,
        configured_level.as_deref(),
    ));

    match run(cli, config_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, config_path: PathBuf) -> Result<()> {
    let registry = Arc::new(ProviderRegistry::builtin());
    let store = ConfigStore::new(config_path, registry);
    let settings_path = cli.settings.unwrap_or_else(default_settings_path);
    let switcher = Switcher::new(store, settings_path);

    match cli.command {
        Commands::Status => status(&switcher),
        Commands::List => list(&switcher),
        Commands::Switch { provider, api_key } => {
            let outcome = switcher.switch_provider(&provider, api_key.as_deref())?;
            report_switch(&switcher, &outcome)
        }
        Commands::Model { category, model_id } => {
            let outcome = switcher.switch_model(category, &model_id)?;
            println!("{category} -> {model_id}");
            report_switch(&switcher, &outcome)
        }
        Commands::Backup(command) => backup(&switcher, command),
        Commands::Snapshot(command) => snapshot(&switcher, command),
    }
}

fn status(switcher: &Switcher) -> Result<()> {
    let config = switcher.store().load()?;
    let provider = config.active_provider()?;

    println!("Provider:  {} ({})", provider.display_name, provider.name);
    match provider.resolve_credential() {
        CredentialStatus::Configured(key) => println!("API key:   {}", key.hint()),
        CredentialStatus::Unconfigured { reason } => println!("API key:   missing ({reason})"),
        CredentialStatus::Subscription => println!("Auth:      subscription"),
    }
    for category in ModelCategory::all() {
        if let Some(model) = config.active.model_for(*category) {
            println!("{:<10} {model}", format!("{category}:"));
        }
    }

    let document = SettingsDocument::load(switcher.settings_path())?;
    let current = switcher.store().registry().infer_provider(document.base_url());
    println!();
    println!("Config:    {}", switcher.store().path().display());
    println!(
        "Settings:  {} (points at {current})",
        switcher.settings_path().display()
    );
    Ok(())
}

fn list(switcher: &Switcher) -> Result<()> {
    let config = switcher.store().load()?;

    for name in config.provider_names() {
        let provider = config.provider(name)?;
        let marker = if name == config.active.provider { "*" } else { " " };
        let ready = if provider.is_configured() { "" } else { " [needs API key]" };
        println!("{marker} {name:<14} {}{ready}", provider.display_name);
        for model in config.models_by_provider(name) {
            println!("      {:<8} {}", model.category.as_str(), model.id);
        }
    }

    let installable: Vec<&str> = switcher
        .store()
        .registry()
        .names()
        .into_iter()
        .filter(|name| !config.providers.contains_key(*name))
        .collect();
    if !installable.is_empty() {
        println!();
        println!("Available: {}", installable.join(", "));
    }
    Ok(())
}

fn report_switch(switcher: &Switcher, outcome: &SwitchOutcome) -> Result<()> {
    println!(
        "Switched {} -> {} ({})",
        outcome.previous_provider,
        outcome.provider,
        switcher.settings_path().display()
    );
    if let Some(backup) = &outcome.backup {
        println!("Backup:   {}", backup.id);
    }
    if let Some(snapshot) = &outcome.snapshot {
        println!("Snapshot: {}", snapshot.id);
    }
    for warning in &outcome.warnings {
        eprintln!("Warning: {warning}");
    }

    let config = switcher.store().load()?;
    let provider = config.active_provider()?;
    if provider.auth.requires_setup && !provider.auth.setup_instructions.is_empty() {
        println!("{}", provider.auth.setup_instructions);
    }
    if let CredentialStatus::Unconfigured { .. } = provider.resolve_credential() {
        eprintln!(
            "Warning: no API key stored for '{}'; rerun with --api-key",
            provider.name
        );
    }
    Ok(())
}

fn backup(switcher: &Switcher, command: BackupCommand) -> Result<()> {
    let config = switcher.store().load()?;
    let backups = switcher.backups(&config);

    match command {
        BackupCommand::Create { description } => {
            let info = backups.create_backup(description.as_deref())?;
            println!("Created {} ({} bytes)", info.id, info.size);
        }
        BackupCommand::List => {
            let mut all = backups.list_backups()?;
            all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            if all.is_empty() {
                println!("No backups in {}", backups.dir().display());
            }
            for info in &all {
                print_entry(info);
            }
        }
        BackupCommand::Restore { id } => {
            backups.restore_backup(&id)?;
            println!("Restored {id} to {}", switcher.settings_path().display());
        }
        BackupCommand::Delete { id } => {
            backups.delete_backup(&id)?;
            println!("Deleted {id}");
        }
        BackupCommand::Prune { older_than } => {
            let max_age = chrono::Duration::from_std(older_than)
                .context("--older-than is out of range")?;
            let report = backups.prune_backups(max_age)?;
            println!("Deleted {} backup(s)", report.deleted.len());
            for id in &report.skipped {
                println!("Skipped {id} (unrecognised timestamp)");
            }
        }
        BackupCommand::Stats => {
            let stats = backups.stats()?;
            println!("Backups:   {}", stats.count);
            println!("Size:      {} bytes", stats.total_size);
            if let (Some(oldest), Some(newest)) = (stats.oldest, stats.newest) {
                println!("Oldest:    {}", format_stamp(oldest));
                println!("Newest:    {}", format_stamp(newest));
            }
            for (provider, count) in &stats.by_provider {
                println!("  {provider:<12} {count}");
            }
        }
    }
    Ok(())
}

fn snapshot(switcher: &Switcher, command: SnapshotCommand) -> Result<()> {
    let snapshots = switcher.snapshots();
    match command {
        SnapshotCommand::List => {
            let all = snapshots.list_snapshots()?;
            if all.is_empty() {
                println!("No snapshots in {}", snapshots.dir().display());
            }
            for info in &all {
                print_entry(info);
            }
        }
        SnapshotCommand::Restore { id } => {
            snapshots.restore_snapshot(&id, switcher.settings_path())?;
            println!("Restored {id} to {}", switcher.settings_path().display());
        }
    }
    Ok(())
}

fn print_entry(entry: &ArchiveEntry) {
    let when = entry
        .timestamp
        .map(format_stamp)
        .unwrap_or_else(|| "?".to_string());
    println!(
        "{:<48} {when:<16} {:<12} {:>8} B",
        entry.id, entry.provider, entry.size
    );
}
