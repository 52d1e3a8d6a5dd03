//! Polysite - a multilingual static site builder.

use anyhow::Result;
use clap::{ColorChoice, Parser};
use polysite::cli::{Cli, Commands, build, watch};
use polysite::logger;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {}
    }
    logger::set_verbose(cli.command.build_args().verbose);

    match &cli.command {
        Commands::Build { .. } => {
            let config = build::load_config(&cli)?;
            build::build_site(config).map(|_| ())
        }
        Commands::Watch { .. } => watch::watch_site(&cli),
    }
}
