use std::{fmt, str::FromStr};

use crate::{domain::QuarterHourSeries, error::ConfigError};

/// Identifier of a metering location (MaLo/MeLo), carried as an opaque string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeteringPoint(String);

impl MeteringPoint {
    pub fn new(id: impl AsRef<str>) -> Result<Self, ConfigError> {
        let trimmed = id.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ConfigError::EmptyMeteringPoint);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Parse a newline-separated list, dropping blanks and duplicates while
    /// keeping first-seen order.
    pub fn parse_list(raw: &str) -> Vec<Self> {
        let mut out: Vec<Self> = Vec::new();
        for point in raw.lines().filter_map(|l| Self::new(l).ok()) {
            if !out.contains(&point) {
                out.push(point);
            }
        }
        out
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MeteringPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(rename_all = "lowercase"))]
pub enum Direction {
    #[default]
    Consumption,
    Generation,
}

impl Direction {
    /// OBIS register code for total active energy in this direction.
    pub fn obis(self) -> &'static str {
        match self {
            Self::Consumption => "1.8.0",
            Self::Generation => "2.8.0",
        }
    }

    /// Label used in output file names.
    pub fn file_label(self) -> &'static str {
        match self {
            Self::Consumption => "VERBRAUCH",
            Self::Generation => "ERZEUGUNG",
        }
    }
}

impl FromStr for Direction {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "consumption" | "verbrauch" => Ok(Self::Consumption),
            "generation" | "erzeugung" => Ok(Self::Generation),
            other => Err(ConfigError::UnknownDirection(other.to_string())),
        }
    }
}

/// A series attributed to a metering point and energy direction; the unit
/// handed from sources to the message writer.
#[derive(Debug, Clone, PartialEq)]
pub struct MeteringDay {
    pub metering_point: MeteringPoint,
    pub direction: Direction,
    pub series: QuarterHourSeries,
}
