pub mod config;
pub mod fetch;
pub mod marker;
pub mod paths;
pub mod reconcile;
pub mod sync;
pub mod types;
pub mod unpack;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::SyncConfig;
use crate::fetch::HttpSource;

#[derive(Parser)]
#[command(
    name = "update-packages",
    version,
    about = "Sync the packages directory with its manifest of branch archives"
)]
struct Cli {
    /// Packages directory
    #[arg(long, global = true, default_value = "packages")]
    packages_dir: PathBuf,

    /// Manifest file [default: <packages-dir>/config.json]
    #[arg(long, global = true)]
    manifest: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove, download and unpack packages until the directory matches the manifest
    Sync,

    /// Show what a sync would do without changing anything
    Status,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let mut config = SyncConfig::new(cli.packages_dir);
    if let Some(manifest) = cli.manifest {
        config = config.with_manifest(manifest);
    }

    let result = match cli.command.unwrap_or(Commands::Sync) {
        Commands::Sync => cmd_sync(&config),
        Commands::Status => cmd_status(&config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_sync(config: &SyncConfig) -> Result<(), Box<dyn std::error::Error>> {
    let source = HttpSource::new(&config.tool_version);
    let report = sync::run(config, &source)?;

    println!(
        "Done: {} updated, {} skipped, {} removed",
        report.updated.len(),
        report.skipped.len(),
        report.removed.len()
    );

    Ok(())
}

fn cmd_status(config: &SyncConfig) -> Result<(), Box<dyn std::error::Error>> {
    let plan = sync::status(config)?;

    if plan.is_noop() && plan.current.is_empty() {
        println!("No packages configured");
        return Ok(());
    }

    println!("{:<40} {:>8}", "PACKAGE", "ACTION");
    println!("{}", "-".repeat(49));

    for name in &plan.extraneous {
        println!("{:<40} {:>8}", name.to_string_lossy(), "remove");
    }
    for key in &plan.current {
        println!("{:<40} {:>8}", key.to_string(), "skip");
    }
    for key in &plan.stale {
        println!("{:<40} {:>8}", key.to_string(), "fetch");
    }

    Ok(())
}
