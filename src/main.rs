use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use std::io::stderr;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

mod cmd;
mod config;

use cmd::bootstrap::BootstrapArgs;
use cmd::check::CheckArgs;

#[derive(Parser, Debug)]
#[command(author, version, about = "Bare-metal bootstrap from rescue mode", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output - shows more detailed logs
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bootstraps every configured target
    Bootstrap(BootstrapArgs),
    /// Validates a configuration file without contacting anything
    Check(CheckArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // RUST_LOG wins; otherwise our crates at info (debug with --verbose)
    let level = if cli.verbose { "debug" } else { "info" };
    let default_directives = format!(
        "metalstrap={level},metalstrap_actions={level},metalstrap_workflow={level},metalstrap_provider={level},metalstrap_remote={level},hyper=warn,reqwest=warn,rustls=warn,h2=warn"
    );
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));
    registry()
        .with(filter)
        .with(fmt::layer().with_writer(stderr))
        .init();

    match cli.command {
        Commands::Bootstrap(args) => {
            let summary = cmd::bootstrap::run_bootstrap(args).await?;
            println!("{summary}");
            if !summary.is_success() {
                error!(
                    failed = summary.failed().count(),
                    "Bootstrap finished with failed hosts"
                );
                std::process::exit(1);
            }
            info!("All hosts bootstrapped");
        }
        Commands::Check(args) => cmd::check::run_check(args)?,
    }

    Ok(())
}
