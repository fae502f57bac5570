mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "icsync")]
#[command(about = "Generate iCalendar files and push them to a remote calendar")]
struct Cli {
    /// Log protocol details (overrides ICSYNC_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a single event to an .ics file
    Create(commands::create::CreateArgs),
    /// Decode an .ics file and list its events
    Inspect {
        /// Path to the .ics file ("-" for stdin)
        file: PathBuf,
    },
    /// Obtain (or refresh) an access token for the remote calendar
    Auth,
    /// Insert every event of an .ics file into a remote calendar
    Import {
        /// Remote calendar ID, e.g. "primary"
        #[arg(short, long)]
        calendar: String,

        /// Path to the .ics file ("-" for stdin)
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    match cli.command {
        Commands::Create(args) => commands::create::run(args),
        Commands::Inspect { file } => commands::inspect::run(&file),
        Commands::Auth => commands::auth::run(&cancel).await,
        Commands::Import { calendar, file } => {
            commands::import::run(&cancel, &calendar, &file).await
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("ICSYNC_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
