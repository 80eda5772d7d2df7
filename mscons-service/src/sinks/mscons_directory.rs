use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use mscons_core::{
    naming::{approximate_size, plan_bundles, Bundle, BundleNaming, NamedDocument},
    MessageBuilder, MeteringDay,
};

use crate::{
    pipeline::{collect_all, Envelope, PipelineError, Sink},
    sinks::SizeAdvisory,
};

/// Builds one MSCONS interchange per metering day and writes them grouped
/// for the archiver: one directory per month bundle plus a master directory,
/// each named after its bundle.
///
/// Nothing is written if the upstream fails or the size advisory declines.
/// Bundles are staged next to their target and swapped in whole, replacing
/// whatever an earlier run left there.
pub struct MsconsDirectorySink {
    builder: MessageBuilder,
    naming: BundleNaming,
    out_dir: PathBuf,
    limit_bytes: usize,
    advisory: Arc<dyn SizeAdvisory>,
}

impl MsconsDirectorySink {
    pub fn new<P: Into<PathBuf>>(
        builder: MessageBuilder,
        naming: BundleNaming,
        out_dir: P,
        limit_bytes: usize,
        advisory: Arc<dyn SizeAdvisory>,
    ) -> Self {
        Self {
            builder,
            naming,
            out_dir: out_dir.into(),
            limit_bytes,
            advisory,
        }
    }

    fn build_documents(&self, days: &[Envelope<MeteringDay>]) -> Vec<NamedDocument> {
        days.iter()
            .map(|env| {
                let d = &env.payload;
                let content = self
                    .builder
                    .build_series(d.metering_point.as_str(), d.direction.obis(), &d.series);
                NamedDocument::new(self.builder.partner(), d.series.day(), &d.metering_point, d.direction, content)
            })
            .collect()
    }

    async fn confirm_size(&self, approx_bytes: usize) -> Result<(), PipelineError> {
        if approx_bytes <= self.limit_bytes {
            return Ok(());
        }
        let advisory = self.advisory.clone();
        let limit = self.limit_bytes;
        let proceed = tokio::task::spawn_blocking(move || advisory.confirm(approx_bytes, limit))
            .await
            .map_err(|e| PipelineError::Sink(format!("size confirmation failed: {e}")))?;
        if proceed {
            Ok(())
        } else {
            metrics::counter!("mscons_batches_declined_total").increment(1);
            Err(PipelineError::Sink(format!(
                "batch of ~{approx_bytes} bytes exceeds the {limit} byte limit and was not confirmed"
            )))
        }
    }

    fn staging_dir(&self, bundle: &Bundle) -> PathBuf {
        self.out_dir.join(format!(".{}.partial", bundle.stem()))
    }

    async fn stage_bundle(&self, bundle: &Bundle, documents: &[NamedDocument]) -> Result<PathBuf, PipelineError> {
        let dir = self.staging_dir(bundle);
        if tokio::fs::metadata(&dir).await.is_ok() {
            tokio::fs::remove_dir_all(&dir)
                .await
                .map_err(|e| PipelineError::Sink(format!("failed to clear '{}': {e}", dir.display())))?;
        }
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| PipelineError::Sink(format!("failed to create '{}': {e}", dir.display())))?;

        for &idx in &bundle.documents {
            let doc = &documents[idx];
            let path = dir.join(&doc.file_name);
            tokio::fs::write(&path, doc.content.as_str())
                .await
                .map_err(|e| PipelineError::Sink(format!("failed to write '{}': {e}", path.display())))?;
        }
        Ok(dir)
    }

    /// Replace the bundle directory with its staged copy, so files of an
    /// earlier run never mix with this one.
    async fn publish_bundle(&self, bundle: &Bundle, staged: &Path) -> Result<(), PipelineError> {
        let target = self.out_dir.join(bundle.stem());
        if tokio::fs::metadata(&target).await.is_ok() {
            tokio::fs::remove_dir_all(&target)
                .await
                .map_err(|e| PipelineError::Sink(format!("failed to replace '{}': {e}", target.display())))?;
        }
        tokio::fs::rename(staged, &target)
            .await
            .map_err(|e| PipelineError::Sink(format!("failed to publish '{}': {e}", target.display())))?;

        tracing::info!(bundle = %bundle.name, files = bundle.documents.len(), "bundle written");
        Ok(())
    }

    /// Stage every bundle first; published output only changes once all of
    /// them were written.
    async fn write_bundles(&self, bundles: &[&Bundle], documents: &[NamedDocument]) -> Result<(), PipelineError> {
        let mut staged = Vec::with_capacity(bundles.len());
        for bundle in bundles {
            match self.stage_bundle(bundle, documents).await {
                Ok(dir) => staged.push(dir),
                Err(e) => {
                    staged.push(self.staging_dir(bundle));
                    for dir in &staged {
                        let _ = tokio::fs::remove_dir_all(dir).await;
                    }
                    return Err(e);
                }
            }
        }

        for (bundle, dir) in bundles.iter().zip(&staged) {
            self.publish_bundle(bundle, dir).await?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Sink<MeteringDay> for MsconsDirectorySink {
    async fn run<S>(&self, input: S) -> Result<(), PipelineError>
    where
        S: futures::Stream<Item = Result<Envelope<MeteringDay>, PipelineError>> + Send + Unpin + 'static,
    {
        let days = collect_all(input).await?;
        if days.is_empty() {
            tracing::warn!("no metering days to convert");
            return Ok(());
        }

        let started = Instant::now();
        let documents = self.build_documents(&days);
        metrics::counter!("mscons_documents_built_total").increment(documents.len() as u64);
        metrics::histogram!("mscons_build_seconds").record(started.elapsed().as_secs_f64());

        let approx_bytes = approximate_size(&documents);
        self.confirm_size(approx_bytes).await?;

        let plan = plan_bundles(&documents, &self.naming);
        let bundles: Vec<&Bundle> = plan.months.iter().chain(std::iter::once(&plan.master)).collect();
        self.write_bundles(&bundles, &documents).await?;

        metrics::counter!("mscons_output_bytes_total").increment(approx_bytes as u64);
        tracing::info!(
            documents = documents.len(),
            months = plan.months.len(),
            approx_bytes,
            out_dir = %self.out_dir.display(),
            "MSCONS batch written"
        );
        Ok(())
    }
}
