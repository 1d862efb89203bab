//! nodepool - command line entry point of the node-pool manager.
//!
//! # Commands
//!
//! - `nodepool version` - Show build and host information
//! - `nodepool logo` - Print the project logo
//! - `nodepool config check` - Validate settings and print the effective values

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod error;

use commands::version::OutputFormat;
use commands::{config, logo, version};
use error::CliResult;

/// Kubernetes node-pool manager
#[derive(Parser)]
#[command(name = "nodepool")]
#[command(author = "CodeFuture Authors")]
#[command(version)]
#[command(about = "Kubernetes node-pool manager")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (JSON, TOML or YAML)
    #[arg(long, global = true, env = "NODEPOOL_CONFIG")]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show build and host information
    #[command(alias = "v")]
    Version(VersionArgs),

    /// Print the project logo
    Logo,

    /// Validate and inspect settings
    #[command(alias = "c")]
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Args)]
struct VersionArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "banner")]
    output: OutputFormat,

    /// Kubernetes server version to report instead of discovering it
    #[arg(long)]
    kube_version: Option<String>,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Load and validate settings, then print them as YAML
    Check {
        /// Settings file, overriding --config
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let file = match &cli.command {
        Commands::Config {
            command: ConfigCommands::Check { file: Some(file) },
        } => Some(file.as_path()),
        _ => cli.config.as_deref(),
    };
    let settings = config::load(file)?;
    init_logging(&settings);

    let color = settings.banner.color && !cli.no_color;
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Version(args) => {
            let discovery = version::server_version_source(&settings.kube);
            version::run(
                &mut stdout,
                args.output,
                args.kube_version.as_deref(),
                &discovery,
                color,
            )
            .await
        }
        Commands::Logo => logo::run(&mut stdout, color),
        Commands::Config {
            command: ConfigCommands::Check { .. },
        } => config::check(&mut stdout, &settings),
    }
}

fn init_logging(settings: &nodepool_config::Settings) {
    let mut log = nodepool_log::LogConfig::from_env();
    if let Some(level) = nodepool_log::Level::parse(&settings.log.level) {
        log = log.with_level(level);
    }
    if let Some(format) = nodepool_log::Format::parse(&settings.log.format) {
        log = log.with_format(format);
    }
    nodepool_log::init(&log);
}
