use anyhow::{bail, Result};
use mscons_core::{Direction, MeteringPoint};
use mscons_service::{
    config::AppConfig,
    jobs::{self, CsvJob},
    metrics_export, observability,
    sinks::{AlwaysProceed, SizeAdvisory, TerminalPrompt},
};
use std::{env, path::PathBuf, sync::Arc};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let mut assume_yes = false;
    let mut positional = Vec::new();
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--yes" | "-y" => assume_yes = true,
            _ => positional.push(arg),
        }
    }
    if positional.len() < 2 || positional.len() > 3 {
        bail!("usage: csv_to_mscons <csv_file> <metering_point> [consumption|generation] [--yes]");
    }

    // Load configuration (MSCONS_CONFIG can point at a partner-specific file).
    let cfg = AppConfig::load()?;

    let metering_point = MeteringPoint::new(&positional[1])?;
    let direction = match positional.get(2) {
        Some(s) => s.parse::<Direction>()?,
        None => cfg.defaults.direction,
    };

    if cfg.metrics.is_some() {
        metrics_export::init()?;
    }

    let advisory: Arc<dyn SizeAdvisory> = if assume_yes {
        Arc::new(AlwaysProceed)
    } else {
        Arc::new(TerminalPrompt)
    };

    let job = CsvJob {
        path: PathBuf::from(&positional[0]),
        metering_point,
        direction,
    };
    let result = jobs::run_csv_job(&cfg, job, advisory).await;

    // Metrics are written even when the run was aborted.
    metrics_export::flush(cfg.metrics.as_ref(), result).await?;
    Ok(())
}
