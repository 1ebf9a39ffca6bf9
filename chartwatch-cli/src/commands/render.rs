//! `chartwatch render`: one cycle, then exit.

use anyhow::{Context, Result};
use clap::Args;

use chartwatch_watcher::{render_once_blocking, WatchOptions};

use super::ChartArgs;

#[derive(Args, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub chart: ChartArgs,
}

impl RenderArgs {
    pub fn run(self) -> Result<()> {
        let settings = self.chart.resolve(Vec::new())?;
        let chart = settings.request.chart.clone();
        render_once_blocking(WatchOptions::from(settings))
            .with_context(|| format!("rendering {} failed", chart.display()))?;
        Ok(())
    }
}
