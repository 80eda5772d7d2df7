use time::{Date, Duration, PrimitiveDateTime};

pub const SLOTS_PER_DAY: usize = 96;
pub const SLOT_LENGTH: Duration = Duration::minutes(15);

/// How a calendar day maps onto the instants a series covers.
///
/// Timestamps are kept as wall-clock fields of the convention's reference
/// frame: local time for [`WindowConvention::LocalCivil`], UTC for
/// [`WindowConvention::Settlement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub enum WindowConvention {
    /// Local midnight to local midnight.
    #[cfg_attr(feature = "serde", serde(rename = "local"))]
    LocalCivil,
    /// 22:00 UTC on the calendar date, for 24 hours.
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "settlement"))]
    Settlement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: PrimitiveDateTime,
    pub end: PrimitiveDateTime,
}

impl DayWindow {
    pub fn for_day(day: Date, convention: WindowConvention) -> Self {
        let start = match convention {
            WindowConvention::LocalCivil => day.midnight(),
            WindowConvention::Settlement => day.midnight() + Duration::hours(22),
        };
        Self {
            start,
            end: start + Duration::days(1),
        }
    }

    /// Start and end of slot `index`.
    pub fn slot(&self, index: usize) -> (PrimitiveDateTime, PrimitiveDateTime) {
        let start = self.start + SLOT_LENGTH * index as u32;
        (start, start + SLOT_LENGTH)
    }
}

/// One day of quarter-hour readings.
///
/// Built wholesale by the importer or a profile generator; there are no
/// mutators. Values are kept as a `Vec` so callers can check the slot count
/// of externally sourced data before handing it to the message builder.
#[derive(Debug, Clone, PartialEq)]
pub struct QuarterHourSeries {
    day: Date,
    window: DayWindow,
    values: Vec<f64>,
}

impl QuarterHourSeries {
    pub fn new(day: Date, window: DayWindow, values: Vec<f64>) -> Self {
        Self { day, window, values }
    }

    /// Series for `day` windowed according to `convention`.
    pub fn for_day(day: Date, convention: WindowConvention, values: Vec<f64>) -> Self {
        Self::new(day, DayWindow::for_day(day, convention), values)
    }

    pub fn day(&self) -> Date {
        self.day
    }

    pub fn window(&self) -> DayWindow {
        self.window
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Same readings, re-anchored to another day-window convention.
    pub fn rewindowed(self, convention: WindowConvention) -> Self {
        Self {
            window: DayWindow::for_day(self.day, convention),
            ..self
        }
    }
}
