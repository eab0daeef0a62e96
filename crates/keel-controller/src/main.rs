use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use keel_controller::config::loader::load_config_with_default_path;
use keel_controller::observability::{apply_logging_level, init_tracing};
use keel_controller::{KeelConfig, OwnerRecord, ReconcileReport, Reconciler};
use keel_core::{EngineMode, LoadResult};
use keel_db_memory::InMemoryObjectStore;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "keel")]
#[command(about = "Reconcile the objects owned by an evaluated configuration")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./keel.toml when present)
    #[arg(short, long, global = true, env = "KEEL_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay load results for one owner against an in-memory store
    Reconcile(ReconcileArgs),
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args)]
struct ReconcileArgs {
    /// Owner name
    #[arg(long)]
    owner: String,

    /// Owner namespace (overrides reconcile.default_namespace)
    #[arg(short, long)]
    namespace: Option<String>,

    /// Engine mode (overrides reconcile.default_mode)
    #[arg(short, long, value_enum)]
    mode: Option<ModeArg>,

    /// Owner label as KEY=VALUE; may be repeated
    #[arg(short, long = "label", value_parser = parse_key_value)]
    labels: Vec<(String, String)>,

    /// Finish with a pass that removes the owner
    #[arg(long)]
    remove: bool,

    /// Print every stored object after the last pass
    #[arg(long)]
    dump: bool,

    /// Load result JSON files, applied in order
    #[arg(required_unless_present = "remove")]
    files: Vec<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Up,
    Ci,
}

impl From<ModeArg> for EngineMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Up => EngineMode::Up,
            ModeArg::Ci => EngineMode::Ci,
        }
    }
}

#[derive(Serialize)]
struct PassOutput<'a> {
    source: String,
    report: &'a ReconcileReport,
}

#[tokio::main]
async fn main() {
    // Initialize tracing early with the default level
    init_tracing();

    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let cfg = load_config_with_default_path(cli.config.as_ref())
        .map_err(|e| anyhow::anyhow!("configuration error: {e}"))?;
    apply_logging_level(&cfg.logging.level);

    match cli.command {
        Commands::Reconcile(args) => reconcile(&cfg, args).await?,
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&cfg)?);
        }
    }

    Ok(())
}

async fn reconcile(cfg: &KeelConfig, args: ReconcileArgs) -> Result<()> {
    let store = Arc::new(InMemoryObjectStore::new());
    let reconciler = Reconciler::new(store.clone(), cfg);
    let owner = reconciler.owner_key(&args.owner, args.namespace.as_deref());
    let record = args
        .labels
        .into_iter()
        .fold(OwnerRecord::new(), |record, (k, v)| record.with_label(k, v));
    let mode = args.mode.map(EngineMode::from);

    tracing::info!(owner = %owner, files = args.files.len(), "Replaying load results");

    for path in &args.files {
        let result = read_load_result(path)?;
        let report = reconciler
            .reconcile(&owner, &record, &result, mode)
            .await
            .with_context(|| format!("reconciling {}", path.display()))?;
        print_pass(&path.display().to_string(), &report)?;
    }

    if args.remove {
        let report = reconciler
            .remove_owner(&owner)
            .await
            .with_context(|| format!("removing owner {owner}"))?;
        print_pass("remove", &report)?;
    }

    if args.dump {
        println!("{}", serde_json::to_string_pretty(&store.snapshot())?);
    }

    Ok(())
}

fn read_load_result(path: &Path) -> Result<LoadResult> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

fn print_pass(source: &str, report: &ReconcileReport) -> Result<()> {
    let output = PassOutput {
        source: source.to_string(),
        report,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    let summary = format!(
        "{source}: {} created, {} updated, {} deleted, {} unchanged",
        report.created.len(),
        report.updated.len(),
        report.deleted.len(),
        report.unchanged.len()
    );
    if report.is_complete() {
        print_success(&summary);
    } else {
        print_error(&format!("{summary}, {} failed", report.failures.len()));
    }
    if report.deletions_suppressed {
        eprintln!("{} load result has an error; stale objects kept", "!".yellow());
    }
    Ok(())
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))?;
    if key.is_empty() {
        return Err(format!("empty key in `{s}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn print_success(msg: &str) {
    eprintln!("{} {}", "✓".green(), msg);
}

fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("team=web").unwrap(),
            ("team".to_string(), "web".to_string())
        );
        assert_eq!(
            parse_key_value("note=a=b").unwrap(),
            ("note".to_string(), "a=b".to_string())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_remove_without_files() {
        let cli = Cli::try_parse_from(["keel", "reconcile", "--owner", "tf", "--remove"]).unwrap();
        match cli.command {
            Commands::Reconcile(args) => {
                assert!(args.remove);
                assert!(args.files.is_empty());
            }
            Commands::Config => panic!("expected reconcile"),
        }
        assert!(Cli::try_parse_from(["keel", "reconcile", "--owner", "tf"]).is_err());
    }
}
