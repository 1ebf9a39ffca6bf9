//! `chartwatch watch`: render on start and on every chart change.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use chartwatch_watcher::{start_blocking, WatchOptions};

use super::ChartArgs;

#[derive(Args, Debug)]
pub struct WatchArgs {
    #[command(flatten)]
    pub chart: ChartArgs,

    /// Extra path to watch. Directories are expanded once at startup.
    #[arg(long = "watch", value_name = "PATH")]
    pub watch: Vec<PathBuf>,
}

impl WatchArgs {
    pub fn run(self) -> Result<()> {
        let settings = self.chart.resolve(self.watch)?;
        let chart = settings.request.chart.clone();
        start_blocking(WatchOptions::from(settings))
            .with_context(|| format!("watching {} failed", chart.display()))?;
        Ok(())
    }
}
