//! Reposync CLI Binary
//!
//! Command-line interface for the repository snapshot engine: hash local
//! trees, check remote freshness, ingest or refresh repositories, and
//! inspect stored records and annotations.

use anyhow::Context;
use clap::{Parser, Subcommand};
use comfy_table::Table;
use owo_colors::OwoColorize;
use reposync::config::SyncConfig;
use reposync::logging::{init_logging, LoggingConfig};
use reposync::remote::GitHubHost;
use reposync::storage::{FsBlobStore, SledRecordStore};
use reposync::sync::url::{canonicalize_source_url, repo_id_for_url};
use reposync::sync::{RepoState, SnapshotStore};
use reposync::tree::TreeScanner;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Reposync CLI - Merkle-based repository snapshot management
#[derive(Parser)]
#[command(name = "reposync")]
#[command(about = "Merkle-based repository snapshot and change detection")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Hash a local directory tree and print its snapshot summary
    Scan {
        /// Directory to hash
        dir: PathBuf,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Compare a repository's stored revision against its remote
    Check {
        /// Source repository URL
        url: String,
    },
    /// Ingest a new repository or refresh an existing one
    Update {
        /// Source repository URL
        url: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List role annotations stored for a repository
    Roles {
        /// Source repository URL
        url: String,
    },
    /// Show the stored record for a repository
    Show {
        /// Source repository URL
        url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = SyncConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    let logging = if cli.verbose {
        config.logging.clone()
    } else {
        LoggingConfig {
            level: "off".to_string(),
            ..config.logging.clone()
        }
    };
    init_logging(Some(&logging)).context("failed to initialize logging")?;
    info!("Reposync CLI starting");

    match cli.command {
        Commands::Scan { dir, format } => scan(&dir, &format),
        Commands::Check { url } => check(&config, &url).await,
        Commands::Update { url, format } => update(&config, &url, &format).await,
        Commands::Roles { url } => roles(&config, &url),
        Commands::Show { url } => show(&config, &url),
    }
}

fn build_store(config: &SyncConfig) -> anyhow::Result<SnapshotStore> {
    let host = GitHubHost::new(config.request_timeout()).context("failed to build host client")?;
    let records = SledRecordStore::new(config.records_path())
        .context("failed to open the record store")?;
    let blobs = FsBlobStore::new(config.blobs_path());
    Ok(SnapshotStore::new(
        Arc::new(host),
        Arc::new(blobs),
        Arc::new(records),
        config.clone(),
    ))
}

fn scan(dir: &PathBuf, format: &str) -> anyhow::Result<()> {
    let snapshot = TreeScanner::new(dir).scan()?;
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }
    println!("root hash:   {}", snapshot.root_hash);
    println!("files:       {}", snapshot.total_files);
    println!("directories: {}", snapshot.total_directories);
    Ok(())
}

async fn check(config: &SyncConfig, url: &str) -> anyhow::Result<()> {
    let store = build_store(config)?;
    let check = store.check_for_update(url).await?;
    match check.state {
        RepoState::Unknown => println!("{}: not ingested yet", "unknown".yellow()),
        RepoState::Fresh => println!(
            "{}: stored revision matches {}",
            "fresh".green(),
            check.remote_revision.as_deref().unwrap_or("-")
        ),
        RepoState::Stale => println!(
            "{}: remote is at {}",
            "stale".red(),
            check.remote_revision.as_deref().unwrap_or("-")
        ),
    }
    Ok(())
}

async fn update(config: &SyncConfig, url: &str, format: &str) -> anyhow::Result<()> {
    let store = build_store(config)?;
    let check = store.check_for_update(url).await?;

    let outcome = match check.state {
        RepoState::Unknown => store.ingest(url, &HashMap::new()).await?,
        _ => store.materialize(&check.repo_id).await?,
    };

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    let snapshot = outcome.record.snapshot.as_ref();
    println!(
        "{} {} at {}",
        if outcome.changed { "updated".green().to_string() } else { "cached".cyan().to_string() },
        outcome.record.display_name,
        outcome.local_path.display()
    );
    if let Some(snapshot) = snapshot {
        println!("root hash: {}", snapshot.root_hash);
    }
    if let Some(delta) = &outcome.delta {
        let mut table = Table::new();
        table.set_header(vec!["", "added", "removed", "modified"]);
        table.add_row(vec![
            "files".to_string(),
            delta.summary.files_added.to_string(),
            delta.summary.files_removed.to_string(),
            delta.summary.files_modified.to_string(),
        ]);
        table.add_row(vec![
            "directories".to_string(),
            delta.summary.directories_added.to_string(),
            delta.summary.directories_removed.to_string(),
            delta.summary.directories_modified.to_string(),
        ]);
        println!("{table}");
    }
    Ok(())
}

fn roles(config: &SyncConfig, url: &str) -> anyhow::Result<()> {
    let store = build_store(config)?;
    let canonical = canonicalize_source_url(url)?;
    let repo_id = repo_id_for_url(&canonical);
    let record = store.get_record(&repo_id)?;

    let local_path = record
        .local_path
        .clone()
        .unwrap_or_else(|| config.working_dir(&repo_id));
    let roles = store.aggregate_roles(&record, &local_path);
    if roles.is_empty() {
        println!("no annotations stored");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["path", "role"]);
    for (path, role) in roles {
        table.add_row(vec![path.display().to_string(), role]);
    }
    println!("{table}");
    Ok(())
}

fn show(config: &SyncConfig, url: &str) -> anyhow::Result<()> {
    let store = build_store(config)?;
    let canonical = canonicalize_source_url(url)?;
    let repo_id = repo_id_for_url(&canonical);
    let record = store.get_record(&repo_id)?;

    println!("repository:  {}", record.display_name);
    println!("source:      {}", record.source_url);
    println!("repo id:     {}", record.repo_id);
    println!(
        "revision:    {}",
        record.latest_revision.as_deref().unwrap_or("-")
    );
    if let Some(snapshot) = &record.snapshot {
        println!("root hash:   {}", snapshot.root_hash);
        println!("files:       {}", snapshot.total_files);
        println!("directories: {}", snapshot.total_directories);
    }
    println!("updated at:  {}", record.updated_at.to_rfc3339());
    Ok(())
}
