//! minewatch — worker-count monitoring, one cycle per invocation.
//!
//! Meant to be started by cron or a systemd timer:
//!
//! ```text
//! minewatch --config /etc/minewatch/minewatch.toml run
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "minewatch",
    about = "Alerting and uptime accounting for remote worker dashboards",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to the TOML configuration.
    #[arg(short, long, global = true, default_value = "minewatch.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll every site once, send due notifications, persist state.
    Run {
        /// Log notifications instead of sending them and leave state untouched.
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the persisted status and uptime of every site.
    Status,
    /// Validate the configuration and print the resolved sites.
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,minewatch=debug")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { dry_run } => commands::run::run(&cli.config, dry_run).await,
        Commands::Status => commands::status::status(&cli.config),
        Commands::Check => commands::check::check(&cli.config),
    }
}
