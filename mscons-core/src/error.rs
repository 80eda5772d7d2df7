use time::Date;

/// Reasons a quarter-hour CSV import is rejected as a whole.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ImportError {
    #[error("CSV contains no readable rows; expected `DD.MM.YYYY HH:MM;...;<kWh>`")]
    NoRows,
    #[error("day {day} does not have exactly 96 values (found {count})")]
    SlotCount { day: Date, count: usize },
    #[error("day {day} contains a non-finite value in slot {slot}")]
    NonFinite { day: Date, slot: usize },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("metering point id must not be empty")]
    EmptyMeteringPoint,
    #[error("unknown load profile family '{0}' (expected H0, G0 or L0)")]
    UnknownProfile(String),
    #[error("unknown direction '{0}' (expected consumption or generation)")]
    UnknownDirection(String),
}
