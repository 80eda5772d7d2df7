use anyhow::Result;
use mscons_service::{
    config::AppConfig,
    jobs, metrics_export, observability,
    sinks::{AlwaysProceed, SizeAdvisory, TerminalPrompt},
};
use std::{env, sync::Arc};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // `--yes` skips the size confirmation prompt
    let assume_yes = env::args().skip(1).any(|a| a == "--yes" || a == "-y");

    let cfg = AppConfig::load()?;

    if cfg.metrics.is_some() {
        metrics_export::init()?;
    }

    let advisory: Arc<dyn SizeAdvisory> = if assume_yes {
        Arc::new(AlwaysProceed)
    } else {
        Arc::new(TerminalPrompt)
    };

    let result = jobs::run_slp_job(&cfg, advisory).await;

    // Metrics are written even when the run was aborted.
    metrics_export::flush(cfg.metrics.as_ref(), result).await
}
