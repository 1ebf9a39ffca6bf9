//! Subcommands and the chart arguments they share.

pub mod render;
pub mod watch;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use chartwatch_core::{ConfigError, FilterConfig, Settings, WatchConfig};

/// Where the chart is and what to select from it.
#[derive(Args, Debug, Default)]
pub struct ChartArgs {
    /// Chart directory or archive passed to `helm template`.
    #[arg(long)]
    pub chart: Option<PathBuf>,

    /// Release name. Omitted from the engine call when empty.
    #[arg(long = "name", value_name = "RELEASE")]
    pub release: Option<String>,

    /// Values file, forwarded as `-f` and watched. Repeatable.
    #[arg(short = 'f', long = "values", value_name = "FILE")]
    pub values: Vec<PathBuf>,

    /// Select documents of KIND whose name matches PATTERN. Repeatable.
    #[arg(long = "filter", value_name = "KIND[=PATTERN]")]
    pub filters: Vec<String>,

    /// Resource kind to select (single-entry form of `--filter`).
    #[arg(long)]
    pub kind: Option<String>,

    /// Name pattern for `--kind`. Defaults to any name.
    #[arg(long, value_name = "PATTERN")]
    pub resource: Option<String>,

    /// Engine executable.
    #[arg(long, value_name = "PROGRAM", env = "CHARTWATCH_HELM")]
    pub helm: Option<PathBuf>,

    /// YAML configuration file. Flags override its scalars and extend its lists.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Arguments forwarded verbatim to the engine.
    #[arg(last = true, value_name = "ARGS")]
    pub args: Vec<String>,
}

impl ChartArgs {
    /// Merge flags over the config file and validate the result.
    pub fn resolve(self, watch: Vec<PathBuf>) -> Result<Settings> {
        let base = match &self.config {
            Some(path) => WatchConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => WatchConfig::default(),
        };
        let flags = self
            .into_config(watch)
            .context("invalid chartwatch configuration")?;
        base.merge(flags)
            .resolve()
            .context("invalid chartwatch configuration")
    }

    fn into_config(self, watch: Vec<PathBuf>) -> Result<WatchConfig, ConfigError> {
        let mut filters = self
            .filters
            .iter()
            .map(|flag| flag.parse::<FilterConfig>())
            .collect::<Result<Vec<_>, _>>()?;
        match (self.kind, self.resource) {
            (Some(kind), resource) => filters.push(FilterConfig::new(kind, resource)),
            (None, Some(_)) => return Err(ConfigError::ResourceWithoutKind),
            (None, None) => {}
        }
        Ok(WatchConfig {
            chart: self.chart,
            release: self.release,
            helm: self.helm,
            values: self.values,
            watch,
            args: self.args,
            filters,
        })
    }
}
