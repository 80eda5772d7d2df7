pub mod metering;
pub mod series;

pub use metering::{Direction, MeteringDay, MeteringPoint};
pub use series::{DayWindow, QuarterHourSeries, WindowConvention, SLOTS_PER_DAY, SLOT_LENGTH};
