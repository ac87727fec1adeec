//! p4bump - Automated Perforce version bumping via the p4 CLI.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use p4bump::config::{self, BumpConfig};
use p4bump::perforce::Perforce;
use p4bump::{bump, version};

#[derive(Parser)]
#[command(
    name = "p4bump",
    about = "Automated Perforce version bumping via the p4 CLI",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file.
    #[arg(short, long, default_value = "p4bump.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bump the version manifest in a new pending changelist.
    Bump,
    /// Show the latest submitted change under the configured depot path.
    Latest,
    /// Check p4 login state.
    Login,
    /// Show the current version manifest.
    Show,
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

fn build_client(config: &BumpConfig, verbose: bool) -> Perforce {
    let mut p4 = match &config.p4_executable {
        Some(executable) => Perforce::with_executable(executable),
        None => Perforce::new(),
    };
    p4.set_verbose(verbose);
    p4
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(path = %cli.config.display(), error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    let p4 = build_client(&config, cli.verbose > 0);

    let result = match cli.command {
        Commands::Bump => bump::run(&p4, &config).await.map(|outcome| {
            println!(
                "Created changelist {} for build {} (cl {})",
                outcome.changelist, outcome.version.build, outcome.version.cl
            );
        }),
        Commands::Latest => {
            let depot_recursive = format!("{}/...", config.depot.trim_end_matches('/'));
            match p4.latest_change(&depot_recursive).await {
                Ok(Some(change)) => {
                    println!("{}", change.change);
                    Ok(())
                }
                Ok(None) => Err(bump::BumpError::NoChanges(depot_recursive)),
                Err(e) => Err(e.into()),
            }
        }
        Commands::Login => match p4.check_login().await {
            Ok(user) => {
                println!("Logged in as {user}");
                Ok(())
            }
            Err(e) => Err(e.into()),
        },
        Commands::Show => match version::read(&config.version_file) {
            Ok(v) => {
                println!("build {} (cl {})", v.build, v.cl);
                Ok(())
            }
            Err(e) => Err(e.into()),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
