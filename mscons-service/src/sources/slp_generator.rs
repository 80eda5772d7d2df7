use mscons_core::{
    profile::{compute_day_scales, consumption_days, pv_days, ConsumptionParams, PvParams},
    Direction, MeteringDay, WindowConvention,
};
use time::Date;

use crate::{
    config::{GeneratorDefaults, ResolvedPoint},
    pipeline::{Envelope, EnvelopeStream, PipelineError, Source},
};

/// Synthetic days for a list of metering points.
///
/// Consumption points follow their load profile family; generation points
/// get a PV curve. All PV points of one run share the same weather history,
/// only their per-slot jitter differs.
pub struct SlpGeneratorSource {
    points: Vec<ResolvedPoint>,
    start: Date,
    days: usize,
    seed: u32,
    noise_pct: f64,
    window: WindowConvention,
}

impl SlpGeneratorSource {
    pub fn new(points: Vec<ResolvedPoint>, start: Date, days: usize, seed: u32, defaults: &GeneratorDefaults, window: WindowConvention) -> Self {
        Self {
            points,
            start,
            days,
            seed,
            noise_pct: defaults.noise_pct,
            window,
        }
    }

    fn generate(&self) -> Vec<MeteringDay> {
        let day_scales = compute_day_scales(self.seed, self.start, self.days);
        let mut out = Vec::with_capacity(self.points.len() * self.days);

        for (idx, point) in self.points.iter().enumerate() {
            let point_seed = self.seed.wrapping_add(idx as u32 + 1);
            let series = match point.direction {
                Direction::Consumption => {
                    let params = ConsumptionParams::from_annual(point.profile, point.expected_annual_kwh, self.noise_pct);
                    consumption_days(point_seed, &params, self.start, self.days, self.window)
                }
                Direction::Generation => {
                    let params = PvParams { peak_kw: point.pv_peak_kw };
                    pv_days(point_seed, &params, self.start, &day_scales, self.window)
                }
            };
            tracing::debug!(metering_point = %point.id, direction = ?point.direction, days = series.len(), "profile generated");

            out.extend(series.into_iter().map(|series| MeteringDay {
                metering_point: point.id.clone(),
                direction: point.direction,
                series,
            }));
        }
        out
    }
}

#[async_trait::async_trait]
impl Source<MeteringDay> for SlpGeneratorSource {
    async fn stream(&self) -> EnvelopeStream<MeteringDay> {
        let days = self.generate();
        tracing::info!(points = self.points.len(), days = self.days, seed = self.seed, "synthetic profiles generated");
        metrics::counter!("slp_generated_days_total").increment(days.len() as u64);

        Box::pin(futures::stream::iter(
            days.into_iter().map(|d| Ok::<_, PipelineError>(Envelope::new(d))),
        ))
    }
}
