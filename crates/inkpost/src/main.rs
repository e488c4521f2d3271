//! inkpost CLI - Markdown publishing pipeline.
//!
//! Provides commands for:
//! - `render`: Render Markdown documents to platform-ready HTML
//! - `headings`: Print the heading outline of a document as JSON

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{HeadingsArgs, RenderArgs};
use output::Output;

/// inkpost - Markdown publishing pipeline.
#[derive(Parser)]
#[command(name = "inkpost", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render Markdown documents to HTML.
    Render(RenderArgs),
    /// Print the headings of a rendered document as JSON.
    Headings(HeadingsArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let verbose = matches!(&cli.command, Commands::Render(args) if args.verbose);
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Render(args) => args.execute(),
        Commands::Headings(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
