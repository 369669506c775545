mod commands;
mod utils;

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "terrace")]
#[command(about = "Converge cloud resources to a declared state", long_about = None)]
struct Cli {
    /// Declaration file (default: discovered from the current directory)
    #[arg(short = 'f', long = "file", env = "TERRACE_CONFIG", global = true)]
    file: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the declaration without contacting any provider
    Validate,
    /// Show what apply would do
    Plan {
        /// Read resources back from the provider and account for drift
        #[arg(long)]
        refresh: bool,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Converge actual state to the declaration
    Apply {
        /// Read resources back from the provider and repair drift
        #[arg(long)]
        refresh: bool,
        /// Maximum provider operations in flight (overrides settings)
        #[arg(short, long)]
        concurrency: Option<usize>,
        /// Print the execution report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete every resource recorded in state
    Destroy {
        /// Skip the confirmation requirement
        #[arg(short, long)]
        yes: bool,
    },
    /// Compare recorded state with what the provider reports
    Drift {
        #[arg(long)]
        json: bool,
    },
    /// Show recorded state
    State {
        #[arg(long)]
        json: bool,
    },
    /// Show version information
    Version,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Version needs no declaration
    if matches!(cli.command, Commands::Version) {
        println!("terrace {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let project = utils::Project::load(cli.file.as_deref())?;

    match cli.command {
        Commands::Validate => commands::validate::handle(&project),
        Commands::Plan { refresh, json } => commands::plan::handle(&project, refresh, json).await,
        Commands::Apply {
            refresh,
            concurrency,
            json,
        } => commands::apply::handle(&project, refresh, concurrency, json).await,
        Commands::Destroy { yes } => commands::destroy::handle(&project, yes).await,
        Commands::Drift { json } => commands::drift::handle(&project, json).await,
        Commands::State { json } => commands::state::handle(&project, json).await,
        Commands::Version => Ok(()),
    }
}
