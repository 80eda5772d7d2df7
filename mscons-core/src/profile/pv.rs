use time::{Date, Duration};

use crate::{
    domain::{QuarterHourSeries, WindowConvention, SLOTS_PER_DAY},
    profile::{consumption::gauss, Lcg},
};

/// Expected irradiance relative to midsummer, January first.
const SEASONAL_FACTORS: [f64; 12] = [0.20, 0.30, 0.50, 0.70, 0.85, 1.00, 1.00, 0.90, 0.70, 0.50, 0.30, 0.20];

const SOLAR_NOON_HOUR: f64 = 13.0;
const DAYLIGHT_WIDTH_HOURS: f64 = 2.6;
/// kW held for a quarter hour, in kWh.
const SLOT_HOURS: f64 = 0.25;
const JITTER: f64 = 0.05;
/// Mixed into the seed for the per-slot stream so it does not replay the
/// weather draws.
const SLOT_STREAM_SALT: u32 = 0x9E37_79B9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Weather {
    Bad,
    Cloudy,
    Normal,
    Sunny,
}

impl Weather {
    fn from_draw(r: f64) -> Self {
        if r < 0.15 {
            Self::Bad
        } else if r < 0.4 {
            Self::Cloudy
        } else if r < 0.8 {
            Self::Normal
        } else {
            Self::Sunny
        }
    }

    fn factor_range(self) -> (f64, f64) {
        match self {
            Self::Bad => (0.50, 0.65),
            Self::Cloudy => (0.65, 0.85),
            Self::Normal => (0.85, 0.98),
            Self::Sunny => (0.98, 1.05),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PvParams {
    pub peak_kw: f64,
}

pub fn seasonal_factor(day: Date) -> f64 {
    SEASONAL_FACTORS[usize::from(u8::from(day.month())) - 1]
}

/// 0.25 / 0.5 / 0.25 moving average; edge days stand in for their missing
/// neighbour.
pub fn smooth_day_scales(raw: &[f64]) -> Vec<f64> {
    (0..raw.len())
        .map(|i| {
            let prev = if i == 0 { raw[i] } else { raw[i - 1] };
            let next = raw.get(i + 1).copied().unwrap_or(raw[i]);
            0.25 * prev + 0.5 * raw[i] + 0.25 * next
        })
        .collect()
}

/// Seasonal × weather scale for each of `day_count` days from `start`.
///
/// All raw factors are drawn first, then smoothed over the whole batch, so
/// days generated together share one weather history.
pub fn compute_day_scales(seed: u32, start: Date, day_count: usize) -> Vec<f64> {
    let mut rng = Lcg::new(seed);
    let raw: Vec<f64> = (0..day_count)
        .map(|i| {
            let day = start + Duration::days(i as i64);
            let (low, high) = Weather::from_draw(rng.next_f64()).factor_range();
            seasonal_factor(day) * rng.in_range(low, high)
        })
        .collect();
    smooth_day_scales(&raw)
}

/// One day of PV yield in kWh per slot for a plant of `params.peak_kw`.
pub fn generate_pv_slots(rng: &mut Lcg, params: &PvParams, day_scale: f64) -> Vec<f64> {
    (0..SLOTS_PER_DAY)
        .map(|i| {
            let hour = i as f64 / 4.0;
            let base = params.peak_kw * day_scale * gauss(hour, SOLAR_NOON_HOUR, DAYLIGHT_WIDTH_HOURS) * SLOT_HOURS;
            (base * (1.0 + rng.symmetric(JITTER))).max(0.0)
        })
        .collect()
}

/// `scales.len()` consecutive PV days from `start`, one per precomputed scale.
pub fn pv_days(
    seed: u32,
    params: &PvParams,
    start: Date,
    scales: &[f64],
    convention: WindowConvention,
) -> Vec<QuarterHourSeries> {
    let mut rng = Lcg::new(seed ^ SLOT_STREAM_SALT);
    scales
        .iter()
        .enumerate()
        .map(|(i, scale)| {
            let values = generate_pv_slots(&mut rng, params, *scale);
            QuarterHourSeries::for_day(start + Duration::days(i as i64), convention, values)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn weather_thresholds() {
        assert_eq!(Weather::from_draw(0.0), Weather::Bad);
        assert_eq!(Weather::from_draw(0.149), Weather::Bad);
        assert_eq!(Weather::from_draw(0.15), Weather::Cloudy);
        assert_eq!(Weather::from_draw(0.4), Weather::Normal);
        assert_eq!(Weather::from_draw(0.8), Weather::Sunny);
    }

    #[test]
    fn smoothing_reuses_edges() {
        let s = smooth_day_scales(&[1.0, 0.0, 1.0]);
        assert_eq!(s, vec![0.75, 0.5, 0.75]);
        assert_eq!(smooth_day_scales(&[0.5]), vec![0.5]);
        assert!(smooth_day_scales(&[]).is_empty());
    }

    #[test]
    fn day_scales_are_deterministic_and_bounded() {
        let a = compute_day_scales(42, date!(2025 - 06 - 01), 30);
        let b = compute_day_scales(42, date!(2025 - 06 - 01), 30);
        assert_eq!(a, b);
        assert!(a.iter().all(|s| (0.5..=1.05).contains(s)));
    }

    #[test]
    fn winter_scales_are_lower_than_summer() {
        let winter = compute_day_scales(5, date!(2025 - 12 - 01), 31);
        let summer = compute_day_scales(5, date!(2025 - 06 - 01), 30);
        let max_winter = winter.iter().copied().fold(0.0, f64::max);
        let min_summer = summer.iter().copied().fold(f64::MAX, f64::min);
        assert!(max_winter < min_summer);
    }

    #[test]
    fn pv_day_peaks_around_one_pm_and_is_dark_at_night() {
        let mut rng = Lcg::new(1);
        let values = generate_pv_slots(&mut rng, &PvParams { peak_kw: 4.0 }, 1.0);
        assert_eq!(values.len(), 96);

        let (peak_slot, peak) = values
            .iter()
            .enumerate()
            .fold((0, 0.0), |acc, (i, v)| if *v > acc.1 { (i, *v) } else { acc });
        assert!((47..=57).contains(&peak_slot), "peak at {peak_slot}");
        assert!(peak <= 4.0 * SLOT_HOURS * (1.0 + JITTER));
        assert!(values[0] < 1e-4);
        assert!(values.iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn pv_days_reproduce_from_seed() {
        let scales = compute_day_scales(3, date!(2025 - 04 - 10), 5);
        let a = pv_days(3, &PvParams { peak_kw: 10.0 }, date!(2025 - 04 - 10), &scales, WindowConvention::Settlement);
        let b = pv_days(3, &PvParams { peak_kw: 10.0 }, date!(2025 - 04 - 10), &scales, WindowConvention::Settlement);
        assert_eq!(a, b);
        assert_eq!(a.len(), 5);
        assert_eq!(a[4].day(), date!(2025 - 04 - 14));
    }
}
