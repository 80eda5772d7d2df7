use std::str::FromStr;

use time::{Date, Duration};

use crate::{
    domain::{QuarterHourSeries, WindowConvention, SLOTS_PER_DAY},
    error::ConfigError,
    profile::Lcg,
};

/// Standard load profile families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub enum ProfileFamily {
    /// Household.
    #[default]
    H0,
    /// Commercial.
    G0,
    /// Agriculture and everything else.
    L0,
}

pub(crate) fn gauss(x: f64, center: f64, width: f64) -> f64 {
    let z = (x - center) / width;
    (-0.5 * z * z).exp()
}

impl ProfileFamily {
    /// Relative demand at `hour` (fractional hour of day).
    pub fn shape(self, hour: f64) -> f64 {
        match self {
            Self::H0 => 0.35 + 0.55 * gauss(hour, 7.5, 1.2) + 1.0 * gauss(hour, 19.5, 2.0) + 0.3 * gauss(hour, 13.0, 1.5),
            Self::G0 => 0.2 + 1.0 * gauss(hour, 10.5, 2.5) + 0.8 * gauss(hour, 15.0, 2.5),
            Self::L0 => 0.5 + 0.5 * gauss(hour, 7.0, 1.5) + 0.4 * gauss(hour, 18.0, 2.5),
        }
    }

    /// The 96 slot weights of one day, summing to one.
    pub fn normalized_day(self) -> Vec<f64> {
        let raw: Vec<f64> = (0..SLOTS_PER_DAY).map(|i| self.shape(i as f64 / 4.0)).collect();
        let sum: f64 = raw.iter().sum();
        raw.into_iter().map(|v| v / sum).collect()
    }
}

impl FromStr for ProfileFamily {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "H0" => Ok(Self::H0),
            "G0" => Ok(Self::G0),
            "L0" => Ok(Self::L0),
            _ => Err(ConfigError::UnknownProfile(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsumptionParams {
    pub family: ProfileFamily,
    pub daily_kwh: f64,
    /// Uniform noise amplitude in percent of each slot's value.
    pub noise_pct: f64,
}

impl ConsumptionParams {
    pub fn from_annual(family: ProfileFamily, annual_kwh: f64, noise_pct: f64) -> Self {
        Self {
            family,
            daily_kwh: annual_kwh / 365.0,
            noise_pct,
        }
    }
}

/// `slots` consecutive quarter-hour values following `params.family`.
///
/// Every complete day (each run of 96 slots) is rescaled so it sums to
/// `params.daily_kwh` regardless of noise. A trailing partial day keeps its
/// noisy values.
pub fn generate_consumption(seed: u32, params: &ConsumptionParams, slots: usize) -> Vec<f64> {
    let shape = params.family.normalized_day();
    let amplitude = params.noise_pct / 100.0;
    let mut rng = Lcg::new(seed);

    let mut values: Vec<f64> = (0..slots)
        .map(|i| {
            let noise = rng.symmetric(amplitude);
            (shape[i % SLOTS_PER_DAY] * params.daily_kwh * (1.0 + noise)).max(0.0)
        })
        .collect();

    for day in values.chunks_exact_mut(SLOTS_PER_DAY) {
        let sum: f64 = day.iter().sum();
        if sum > 0.0 {
            let factor = params.daily_kwh / sum;
            day.iter_mut().for_each(|v| *v *= factor);
        }
    }

    values
}

/// `day_count` consecutive consumption days starting at `start`.
pub fn consumption_days(
    seed: u32,
    params: &ConsumptionParams,
    start: Date,
    day_count: usize,
    convention: WindowConvention,
) -> Vec<QuarterHourSeries> {
    let values = generate_consumption(seed, params, day_count * SLOTS_PER_DAY);
    values
        .chunks_exact(SLOTS_PER_DAY)
        .enumerate()
        .map(|(i, day)| QuarterHourSeries::for_day(start + Duration::days(i as i64), convention, day.to_vec()))
        .collect()
}
