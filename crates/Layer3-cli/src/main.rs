//! aiexec CLI - component registry inspector

mod report;

use aiexec_core::component::ComponentDiscovery;
use aiexec_foundation::DiscoveryConfig;
use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// aiexec-components - list the component types available to the workflow editor
#[derive(Parser, Debug)]
#[command(name = "aiexec-components")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Read discovery settings from this JSON file instead of the global/project files
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the built-in registry as {"components": {category: {name: template}}}
    Builtin {
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Print the registry found under the given directories
    Custom {
        /// Directories (or single unit files) to scan
        #[arg(required = true)]
        paths: Vec<String>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Scan without caching and list every unit that failed to load
    Report {
        /// Directories to scan (built-in directories when omitted)
        paths: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging (stderr, stdout is reserved for JSON)
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let owned;
    let discovery = match &args.config {
        Some(path) => {
            let config = DiscoveryConfig::load_from(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            owned = ComponentDiscovery::new(config)?;
            &owned
        }
        None => ComponentDiscovery::global(),
    };

    match args.command {
        Command::Builtin { pretty } => {
            let builtin = discovery.builtin().await;
            print_json(&builtin, pretty)?;
        }
        Command::Custom { paths, pretty } => {
            let registry = discovery.custom(&paths).await?;
            print_json(registry.as_ref(), pretty)?;
        }
        Command::Report { paths } => {
            let report = if paths.is_empty() {
                discovery.scan_builtin().await
            } else {
                discovery.scan(&paths).await?
            };
            print!("{}", report::render(&report));

            if !report.failures.is_empty() {
                tracing::warn!("{} unit(s) failed to load", report.failures.len());
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let output = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", output);
    Ok(())
}
