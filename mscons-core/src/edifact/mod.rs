//! EDIFACT MSCONS assembly.
//!
//! Segments are written as `TAG+field+field'` with the default UNA service
//! characters (`:` component, `+` element, `.` decimal, `?` release, `'`
//! terminator) and concatenated without line breaks.

pub mod builder;
pub mod shape;

use std::fmt;

use time::PrimitiveDateTime;

pub use builder::{InterchangeStamp, MessageBuilder, PartnerConfig, PlaceholderFlavor};
pub use shape::{check_shape, ShapeViolation};

pub const SERVICE_STRING_ADVICE: &str = "UNA:+.? '";

/// One complete interchange; opaque once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdifactMessage(String);

impl EdifactMessage {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EdifactMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Appends segments to a buffer and counts them.
#[derive(Debug, Default)]
pub(crate) struct SegmentWriter {
    buf: String,
    count: usize,
}

impl SegmentWriter {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: String::with_capacity(capacity),
            count: 0,
        }
    }

    pub(crate) fn segment(&mut self, tag: &str, elements: &[&str]) {
        self.buf.push_str(tag);
        for element in elements {
            self.buf.push('+');
            self.buf.push_str(element);
        }
        self.buf.push('\'');
        self.count += 1;
    }

    pub(crate) fn count(&self) -> usize {
        self.count
    }

    pub(crate) fn into_inner(self) -> String {
        self.buf
    }
}

/// `CCYYMMDDHHMM` followed by a released `+00` offset, for DTM format 303.
pub fn format_datetime(dt: PrimitiveDateTime) -> String {
    format!(
        "{:04}{:02}{:02}{:02}{:02}?+00",
        dt.year(),
        u8::from(dt.month()),
        dt.day(),
        dt.hour(),
        dt.minute()
    )
}

/// `YYMMDD:HHMM` as used in the UNB preparation stamp.
pub fn format_interchange_stamp(dt: PrimitiveDateTime) -> String {
    format!(
        "{:02}{:02}{:02}:{:02}{:02}",
        dt.year().rem_euclid(100),
        u8::from(dt.month()),
        dt.day(),
        dt.hour(),
        dt.minute()
    )
}

/// Fixed-point with up to six decimals, trailing zeros and a dangling point
/// removed. Non-finite input is written as `0`.
pub fn format_quantity(value: f64) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let fixed = format!("{value:.6}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "" | "-0" => "0".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn datetime_uses_released_plus() {
        assert_eq!(format_datetime(datetime!(2025-08-15 22:00)), "202508152200?+00");
        assert_eq!(format_datetime(datetime!(2025-01-02 03:45)), "202501020345?+00");
    }

    #[test]
    fn interchange_stamp_has_two_digit_year() {
        assert_eq!(format_interchange_stamp(datetime!(2026-02-02 09:05)), "260202:0905");
    }

    #[test]
    fn quantities_strip_trailing_zeros() {
        assert_eq!(format_quantity(5.0), "5");
        assert_eq!(format_quantity(5.2), "5.2");
        assert_eq!(format_quantity(0.0), "0");
        assert_eq!(format_quantity(-0.0), "0");
        assert_eq!(format_quantity(0.123_456_7), "0.123457");
        assert_eq!(format_quantity(120.0), "120");
        assert_eq!(format_quantity(0.000_000_1), "0");
        assert_eq!(format_quantity(1e-6), "0.000001");
        assert_eq!(format_quantity(f64::NAN), "0");
        assert_eq!(format_quantity(f64::INFINITY), "0");
    }

    #[test]
    fn large_quantities_never_use_exponent() {
        let s = format_quantity(1.5e15);
        assert_eq!(s, "1500000000000000");
    }

    #[test]
    fn writer_counts_segments() {
        let mut w = SegmentWriter::default();
        w.segment("UNS", &["D"]);
        w.segment("NAD", &["MS", "9979383000006::293"]);
        assert_eq!(w.count(), 2);
        assert_eq!(w.into_inner(), "UNS+D'NAD+MS+9979383000006::293'");
    }
}
