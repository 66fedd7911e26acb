mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::OutputArgs;

#[derive(Parser)]
#[command(name = "orgcal")]
#[command(about = "Export outline documents to iCalendar files")]
struct Cli {
    /// Log debug details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export one outline document as a calendar
    Export {
        /// Outline JSON produced by the document parser
        outline: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Combine several outline documents into one calendar
    Combine {
        /// Outline JSON files, in agenda order
        #[arg(required = true)]
        outlines: Vec<PathBuf>,

        /// JSON map of outline path to the entry positions to include
        #[arg(long)]
        restrict: Option<PathBuf>,

        /// Pre-rendered VEVENT block appended to the calendar
        #[arg(long)]
        anniversaries: Option<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Export { outline, output } => commands::export::run(&outline, &output),
        Commands::Combine {
            outlines,
            restrict,
            anniversaries,
            output,
        } => commands::combine::run(
            &outlines,
            restrict.as_deref(),
            anniversaries.as_deref(),
            &output,
        ),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}
