//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Polysite multilingual static site builder
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path
    #[arg(short = 'C', long, global = true, default_value = "site.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build every language site once
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Build, then rebuild on every change until interrupted
    #[command(visible_alias = "w")]
    Watch {
        #[command(flatten)]
        build_args: BuildArgs,
    },
}

/// Shared build arguments for Build and Watch commands
#[derive(clap::Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Include draft pages
    #[arg(short = 'D', long)]
    pub drafts: bool,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long)]
    pub verbose: bool,

    /// Output directory path (relative to project root)
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub output: Option<PathBuf>,
}

impl Commands {
    pub const fn build_args(&self) -> &BuildArgs {
        match self {
            Self::Build { build_args } | Self::Watch { build_args } => build_args,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_build_flags() {
        let cli = Cli::parse_from(["polysite", "build", "--drafts", "-o", "dist"]);
        let args = cli.command.build_args();
        assert!(args.drafts);
        assert!(!args.verbose);
        assert_eq!(args.output.as_deref(), Some(std::path::Path::new("dist")));
        assert_eq!(cli.config, PathBuf::from("site.toml"));
    }

    #[test]
    fn test_parse_watch_with_config() {
        let cli = Cli::parse_from(["polysite", "-C", "demo/site.toml", "w", "--verbose"]);
        assert!(matches!(cli.command, Commands::Watch { .. }));
        assert!(cli.command.build_args().verbose);
        assert_eq!(cli.config, PathBuf::from("demo/site.toml"));
    }
}
