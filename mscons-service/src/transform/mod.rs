use crate::pipeline::{Envelope, PipelineError, Transform};
use mscons_core::{domain::SLOTS_PER_DAY, MeteringDay};

/// Pure validation of a `MeteringDay` before it reaches the message builder.
///
/// Rules:
/// - exactly 96 values.
/// - every value finite.
///
/// The builder itself writes whatever it is given, so this is the last gate.
pub fn validate_metering_day(env: Envelope<MeteringDay>) -> Result<Envelope<MeteringDay>, PipelineError> {
    let d = &env.payload;
    let values = d.series.values();

    if values.len() != SLOTS_PER_DAY {
        return Err(PipelineError::Transform(format!(
            "{} day {}: expected {SLOTS_PER_DAY} values, found {}",
            d.metering_point,
            d.series.day(),
            values.len()
        )));
    }

    if let Some(slot) = values.iter().position(|v| !v.is_finite()) {
        return Err(PipelineError::Transform(format!(
            "{} day {}: non-finite value in slot {slot}",
            d.metering_point,
            d.series.day()
        )));
    }

    if values.iter().any(|v| *v < 0.0) {
        tracing::warn!(metering_point = %d.metering_point, day = %d.series.day(), "negative quarter-hour values passed through");
    }

    Ok(env)
}

#[derive(Clone, Default)]
pub struct MeteringDayValidation;

#[async_trait::async_trait]
impl Transform<MeteringDay, MeteringDay> for MeteringDayValidation {
    async fn apply(&self, input: Envelope<MeteringDay>) -> Result<Envelope<MeteringDay>, PipelineError> {
        match validate_metering_day(input) {
            Ok(env) => Ok(env),
            Err(e) => {
                metrics::counter!("validation_metering_day_rejected_total").increment(1);
                Err(e)
            }
        }
    }
}
