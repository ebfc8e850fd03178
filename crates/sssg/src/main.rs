//! sssg CLI - simple static site generator.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

use commands::build::BuildArgs;

#[derive(Parser)]
#[command(name = "sssg")]
#[command(about = "Render a directory of templates, Markdown and assets into a static site")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to sssg.toml config file
    #[arg(short, long, global = true, default_value = "sssg.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true, env = "SSSG_DEBUG")]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter site in the current directory
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        yes: bool,
    },

    /// Build the site
    Build(BuildArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    match cli.command {
        Commands::Init { yes } => {
            commands::init::run(yes).await?;
        }
        Commands::Build(args) => {
            commands::build::run(&cli.config, args).await?;
        }
    }

    Ok(())
}
