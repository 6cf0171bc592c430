//! # rag-sync CLI
//!
//! Runs inside a CI job and keeps the branch's RAG index in step with the
//! repository.
//!
//! ## Usage
//!
//! ```bash
//! rag-sync [--config rag-sync.toml] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rag-sync sync` | Bootstrap or incrementally reconcile the branch index |
//! | `rag-sync sync --dry-run` | Classify changes without sending mutations |
//! | `rag-sync indexes` | List remote indexes and whether the branch index exists |
//! | `rag-sync changes` | Print the indexable change set for this run |
//!
//! ## Examples
//!
//! ```bash
//! # Inside a GitHub Actions step (inputs arrive as INPUT_* variables)
//! rag-sync sync
//!
//! # Locally, diffing HEAD against its parent
//! rag-sync --host localhost --port 8080 --branch main --source git-diff sync --dry-run
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use rag_sync::changes::build_source;
use rag_sync::ci;
use rag_sync::config::{self, Env, FileConfig, Overrides, SyncConfig};
use rag_sync::corpus::Corpus;
use rag_sync::index::{name_matches, DocumentIndex, RagClient};
use rag_sync::reconcile::{Reconciler, SyncReport};

/// rag-sync: reflect repository changes into a branch-scoped RAG index.
///
/// Settings come from an optional TOML file, then the CI environment
/// (`INPUT_RAGHOST`, `INPUT_RAGPORT`, `INPUT_BRANCH`, `INPUT_TOKEN`,
/// `GITHUB_*`), then the flags below.
#[derive(Parser)]
#[command(name = "rag-sync", version, about)]
struct Cli {
    /// Path to an optional configuration file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// RAG service host.
    #[arg(long, global = true)]
    host: Option<String>,

    /// RAG service port.
    #[arg(long, global = true)]
    port: Option<String>,

    /// Branch to sync; also the remote index name.
    #[arg(long, global = true)]
    branch: Option<String>,

    /// Change source: `github-commit`, `github-pr`, or `git-diff`.
    #[arg(long, global = true)]
    source: Option<String>,

    /// Working tree root. Changed paths are resolved against it.
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Log at debug level (overridden by `RUST_LOG`).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the branch index with the repository.
    ///
    /// Creates the index from the whole working tree when it does not exist
    /// yet; otherwise creates, updates, and deletes documents for the files
    /// the change source reports.
    Sync {
        /// Resolve and classify changes, but send no create/update/delete.
        #[arg(long)]
        dry_run: bool,
    },

    /// List remote indexes and whether the branch index exists.
    Indexes,

    /// Print the indexable changed files for this run.
    Changes,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let env = config::env_snapshot();
    match run(cli, &env) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            if ci::running_in_actions(&env) {
                println!("{}", ci::error_annotation(&format!("{:#}", err)));
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, env: &Env) -> anyhow::Result<()> {
    let file = match &cli.config {
        Some(path) => config::load_file_config(path)?,
        None => FileConfig::default(),
    };
    let overrides = Overrides {
        host: cli.host,
        port: cli.port,
        branch: cli.branch,
        source: cli.source,
        root: cli.root,
    };
    let cfg = config::resolve(file, env, &overrides)?;

    log_ci_env(env);
    info!(
        host = cfg.rag_host.as_str(),
        port = cfg.rag_port,
        branch = cfg.branch.as_str(),
        source = cfg.change_source.label(),
        "configuration resolved"
    );

    match cli.command {
        Commands::Sync { dry_run } => run_sync(&cfg, env, dry_run),
        Commands::Indexes => run_indexes(&cfg),
        Commands::Changes => run_changes(&cfg),
    }
}

fn run_sync(cfg: &SyncConfig, env: &Env, dry_run: bool) -> anyhow::Result<()> {
    let client = RagClient::from_config(cfg)?;
    let corpus = Corpus::new(&cfg.corpus)?;
    let source = build_source(cfg)?;

    let report = Reconciler::new(&client, &corpus, &cfg.branch)
        .dry_run(dry_run)
        .run(source.as_ref())?;

    print_report(&cfg.branch, &report);

    if let Some(path) = env.get("GITHUB_STEP_SUMMARY").filter(|p| !p.is_empty()) {
        ci::append_step_summary(Path::new(path), &ci::step_summary(&cfg.branch, &report))
            .with_context(|| format!("Failed to write step summary: {}", path))?;
    }

    Ok(())
}

fn print_report(branch: &str, report: &SyncReport) {
    println!("sync {}", branch);
    match report {
        SyncReport::Bootstrapped { created } => {
            println!("  mode: bootstrap");
            println!("  created documents: {}", created);
        }
        SyncReport::NoChanges => {
            println!("  mode: incremental");
            println!("  no indexable changes");
        }
        SyncReport::Reconciled(summary) => {
            println!("  mode: incremental");
            println!("  created documents: {}", summary.created);
            println!("  updated documents: {}", summary.updated);
            println!("  unchanged documents: {}", summary.unchanged);
            println!("  update not found: {}", summary.update_not_found);
            println!("  deleted documents: {}", summary.deleted);
            println!("  delete not found: {}", summary.delete_not_found);
        }
        SyncReport::Planned {
            bootstrap,
            create,
            update,
            delete,
        } => {
            println!(
                "  mode: dry run ({})",
                if *bootstrap { "bootstrap" } else { "incremental" }
            );
            println!("  would create: {}", create);
            println!("  would update: {}", update);
            println!("  would delete: {}", delete);
        }
    }
    println!("ok");
}

fn run_indexes(cfg: &SyncConfig) -> anyhow::Result<()> {
    let client = RagClient::from_config(cfg)?;
    let indexes = client.list_indexes()?;

    println!("{:<32} BRANCH", "INDEX");
    for name in &indexes {
        let marker = if name_matches(name, &cfg.branch) { "*" } else { "" };
        println!("{:<32} {}", name, marker);
    }
    let exists = indexes.iter().any(|name| name_matches(name, &cfg.branch));
    println!();
    println!("branch index '{}' exists: {}", cfg.branch, exists);
    Ok(())
}

fn run_changes(cfg: &SyncConfig) -> anyhow::Result<()> {
    let corpus = Corpus::new(&cfg.corpus)?;
    let source = build_source(cfg)?;
    let changed = source.changed_files()?;
    for path in corpus.filter_paths(&changed) {
        println!("{}", path);
    }
    Ok(())
}

fn log_ci_env(env: &Env) {
    for key in [
        "GITHUB_SHA",
        "GITHUB_REPOSITORY",
        "GITHUB_REPOSITORY_OWNER",
        "GITHUB_HEAD_REF",
        "GITHUB_BASE_REF",
        "GITHUB_REF",
        "GITHUB_REF_NAME",
    ] {
        if let Some(value) = env.get(key) {
            debug!(key, value = value.as_str(), "ci environment");
        }
    }
}
