use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use booru_prompter::cli;
use booru_prompter::cli::collections::CollectionsAction;
use booru_prompter::cli::filters::FiltersAction;
use booru_prompter::cli::render::RenderArgs;

#[derive(Parser)]
#[command(name = "booru-prompter", version)]
#[command(about = "Build image-generation prompts from booru tags", long_about = None)]
struct Cli {
    /// Path to config file (defaults to ./booru-prompter.toml or ~/.config/booru-prompter/config.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Enable debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render prompts from a saved collection or a dump of raw items
    Render(RenderArgs),

    /// Manage saved collections
    Collections {
        #[command(subcommand)]
        action: CollectionsAction,
    },

    /// Manage saved filters
    Filters {
        #[command(subcommand)]
        action: FiltersAction,
    },

    /// List models, and each source's formatters and request parameters
    Models {
        /// Only show this source
        #[arg(short, long)]
        source: Option<String>,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // stdout carries prompts only
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Render(args) => cli::render::run(cli.config, args)?,
        Commands::Collections { action } => cli::collections::run(cli.config, action)?,
        Commands::Filters { action } => cli::filters::run(cli.config, action)?,
        Commands::Models { source } => cli::models::run(cli.config, source)?,
    }

    Ok(())
}
