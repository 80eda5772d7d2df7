use std::path::Path;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

use crate::config::MetricsConfig;

static PROM_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder. Runs are one-shot, so instead of serving
/// `/metrics` the snapshot is written out with [`write_textfile`].
pub fn init() -> anyhow::Result<()> {
    if PROM_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus metrics recorder: {e}"))?;

    // Ignore error if the handle was already set; this should only be called once.
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

/// Render the current snapshot to `path` (textfile collector format).
pub async fn write_textfile(path: &Path) -> anyhow::Result<()> {
    let Some(handle) = PROM_HANDLE.get() else {
        anyhow::bail!("Prometheus recorder not initialized");
    };
    tokio::fs::write(path, handle.render()).await?;
    tracing::info!(path = %path.display(), "metrics snapshot written");
    Ok(())
}

/// Write the snapshot if `[metrics]` is configured and hand back `outcome`.
/// A failed write is only logged so it never masks the run's own result.
pub async fn flush<T, E>(metrics: Option<&MetricsConfig>, outcome: Result<T, E>) -> Result<T, E> {
    if let Some(cfg) = metrics {
        if let Err(e) = write_textfile(&cfg.textfile).await {
            tracing::error!(error = %e, path = %cfg.textfile.display(), "failed to write metrics textfile");
        }
    }
    outcome
}
