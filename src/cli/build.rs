//! `build` command and config loading shared with `watch`.

use std::sync::Arc;

use anyhow::{Context, Result};

use super::{BuildArgs, Cli};
use crate::config::SiteConfig;
use crate::log;
use crate::sites::{BuildCfg, SiteSet};

/// Load the config file and apply command-line overrides.
pub fn load_config(cli: &Cli) -> Result<Arc<SiteConfig>> {
    let mut config = SiteConfig::load(&cli.config)?;
    apply_overrides(&mut config, cli.command.build_args());
    Ok(Arc::new(config))
}

/// Flags take precedence over `site.toml`.
pub fn apply_overrides(config: &mut SiteConfig, args: &BuildArgs) {
    if args.drafts {
        config.build.drafts = true;
    }
    if let Some(output) = &args.output {
        config.build.output = output.clone();
    }
}

/// Build every language site once.
pub fn build_site(config: Arc<SiteConfig>) -> Result<SiteSet> {
    let output = config.root_join(&config.build.output);
    let mut sites = SiteSet::from_config(config).context("failed to set up sites")?;
    let report = sites.build(BuildCfg::full()).context("build failed")?;
    report.log();
    log!("build"; "output written to {}", output.display());
    Ok(sites)
}
