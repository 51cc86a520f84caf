//! lsys - render and explore L-systems
//!
//! Usage:
//!   lsys render <grammar> [-i N] [-f svg|png|json] [-o out]
//!   lsys strings <grammar>       Print every iteration's symbols
//!   lsys stats <grammar>         Buffer usage per iteration
//!   lsys view <grammar>          Interactive terminal viewer

mod cli;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use cli::{RenderArgs, StatsArgs, StringsArgs, ViewArgs};
use logging::LogTarget;

#[derive(Parser)]
#[command(name = "lsys")]
#[command(about = "Grammar-driven turtle drawings from L-systems", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine config (YAML); defaults are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Draw one iteration to SVG, PNG or JSON
    Render(RenderArgs),

    /// Print the symbol string of every iteration
    Strings(StringsArgs),

    /// Per-iteration sizes, buffer usage and load time
    Stats(StatsArgs),

    /// Browse iterations in the terminal
    View(ViewArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let target = match cli.command {
        Commands::View(_) => LogTarget::Discard,
        _ => LogTarget::Stderr,
    };
    logging::init_logging(cli.verbose, target);
    tracing::debug!(config = ?cli.config, "CLI args parsed");

    let config = cli::common::load_config(cli.config.as_deref())?;

    match &cli.command {
        Commands::Render(args) => cli::cmd_render(args, &config),
        Commands::Strings(args) => cli::cmd_strings(args, &config),
        Commands::Stats(args) => cli::cmd_stats(args, &config),
        Commands::View(args) => cli::cmd_view(args, &config),
    }
}
