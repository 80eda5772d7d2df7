//! Quarter-hour CSV import.
//!
//! Accepts logs of the form `DD.MM.YYYY HH:MM;...;<kWh>` (one reading per
//! line) and turns them into one [`QuarterHourSeries`] per calendar day.
//! Lines that do not look like a reading are skipped, never reported.

use std::collections::BTreeMap;

use csv::{ReaderBuilder, StringRecord, Trim};
use time::{macros::format_description, Date, PrimitiveDateTime, Time};

use crate::{
    domain::{QuarterHourSeries, WindowConvention, SLOTS_PER_DAY},
    error::ImportError,
};

/// Field layout of the incoming log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(rename_all = "lowercase"))]
pub enum CsvDialect {
    /// `;`-separated; first field is the timestamp, last field the value.
    #[default]
    Semicolon,
    /// `,`-separated; the first field may carry a `;` tail which is dropped,
    /// the second field is the value.
    Comma,
}

impl CsvDialect {
    fn delimiter(self) -> u8 {
        match self {
            Self::Semicolon => b';',
            Self::Comma => b',',
        }
    }

    fn split<'r>(self, record: &'r StringRecord) -> Option<(&'r str, &'r str)> {
        if record.len() < 2 {
            return None;
        }
        match self {
            Self::Semicolon => Some((record.get(0)?, record.get(record.len() - 1)?)),
            Self::Comma => {
                let ts = record.get(0)?.split(';').next()?.trim();
                Some((ts, record.get(1)?))
            }
        }
    }
}

const HEADER_LABELS: [&str; 3] = ["datum", "date", "zeitstempel"];

fn is_header(record: &StringRecord) -> bool {
    record.iter().any(|field| {
        let lower = field.to_ascii_lowercase();
        HEADER_LABELS.iter().any(|label| lower.contains(label))
    })
}

/// Date and time may be separated by any run of whitespace.
fn parse_timestamp(s: &str) -> Option<PrimitiveDateTime> {
    let format = format_description!("[day].[month].[year] [hour]:[minute]");
    let mut parts = s.split_whitespace();
    let (date, time) = (parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    PrimitiveDateTime::parse(&format!("{date} {time}"), format).ok()
}

/// Decimal comma or point; anything unparsable or non-finite reads as zero.
fn parse_value(s: &str) -> f64 {
    s.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

fn slot_index(t: Time) -> Option<usize> {
    if t.minute() % 15 != 0 || t.second() != 0 || t.nanosecond() != 0 {
        return None;
    }
    Some(usize::from(t.hour()) * 4 + usize::from(t.minute()) / 15)
}

/// Parse `text` into one series per day found, ascending by day.
///
/// Slots without a reading are zero, readings off the quarter-hour grid are
/// dropped and a later duplicate timestamp overrides an earlier one. Every
/// series is windowed local midnight to midnight; callers re-anchor them with
/// [`QuarterHourSeries::rewindowed`] if they deliver settlement days.
pub fn parse_quarter_hour_csv(text: &str, dialect: CsvDialect) -> Vec<QuarterHourSeries> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(dialect.delimiter())
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        // One reading per line; a stray quote must not swallow later lines.
        .quoting(false)
        .from_reader(text.as_bytes());

    let mut readings: Vec<(PrimitiveDateTime, f64)> = Vec::new();
    let mut skipped = 0usize;

    for result in rdr.records() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(error = %e, "skipping unreadable CSV line");
                skipped += 1;
                continue;
            }
        };
        if is_header(&record) {
            continue;
        }

        let Some((ts_str, value_str)) = dialect.split(&record) else {
            skipped += 1;
            continue;
        };
        let Some(ts) = parse_timestamp(ts_str) else {
            skipped += 1;
            continue;
        };

        readings.push((ts, parse_value(value_str)));
    }

    // Stable, so the later of two equal timestamps lands last and wins below.
    readings.sort_by_key(|(ts, _)| *ts);

    let mut by_day: BTreeMap<Date, Vec<f64>> = BTreeMap::new();
    for (ts, value) in readings {
        let slots = by_day.entry(ts.date()).or_insert_with(|| vec![0.0; SLOTS_PER_DAY]);
        if let Some(idx) = slot_index(ts.time()) {
            slots[idx] = value;
        }
    }

    tracing::debug!(days = by_day.len(), skipped, "quarter-hour CSV parsed");

    by_day
        .into_iter()
        .map(|(day, values)| QuarterHourSeries::for_day(day, WindowConvention::LocalCivil, values))
        .collect()
}

/// Check an import result as a whole: at least one day, 96 finite values per day.
pub fn validate_days(days: &[QuarterHourSeries]) -> Result<(), ImportError> {
    if days.is_empty() {
        return Err(ImportError::NoRows);
    }
    for series in days {
        let values = series.values();
        if values.len() != SLOTS_PER_DAY {
            return Err(ImportError::SlotCount {
                day: series.day(),
                count: values.len(),
            });
        }
        if let Some(slot) = values.iter().position(|v| !v.is_finite()) {
            return Err(ImportError::NonFinite { day: series.day(), slot });
        }
    }
    Ok(())
}

/// Parse and validate; all-or-nothing.
pub fn import_quarter_hour_csv(text: &str, dialect: CsvDialect) -> Result<Vec<QuarterHourSeries>, ImportError> {
    let days = parse_quarter_hour_csv(text, dialect);
    validate_days(&days)?;
    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn two_readings_fill_first_slots_of_the_day() {
        let days = parse_quarter_hour_csv("15.08.2025 00:00;5,0\n15.08.2025 00:15;5,2", CsvDialect::Semicolon);
        assert_eq!(days.len(), 1);

        let d = &days[0];
        assert_eq!(d.day(), date!(2025 - 08 - 15));
        assert_eq!(d.values().len(), 96);
        assert_eq!(d.values()[0], 5.0);
        assert_eq!(d.values()[1], 5.2);
        assert!(d.values()[2..].iter().all(|v| *v == 0.0));
        assert_eq!(d.window().start, datetime!(2025-08-15 00:00));
        assert_eq!(d.window().end, datetime!(2025-08-16 00:00));
    }

    #[test]
    fn header_blank_and_garbage_lines_are_skipped() {
        let text = "Datum;Uhrzeit;Wert\n\n   \nnot a reading\n16.08.2025 23:45;Zähler 1;1.5\n";
        let days = parse_quarter_hour_csv(text, CsvDialect::Semicolon);
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].values()[95], 1.5);
        assert!((days[0].total() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn days_are_sorted_and_gaps_zero_filled() {
        let text = "02.01.2025 12:00;2\n01.01.2025 06:30;1\n";
        let days = parse_quarter_hour_csv(text, CsvDialect::Semicolon);
        let keys: Vec<_> = days.iter().map(QuarterHourSeries::day).collect();
        assert_eq!(keys, [date!(2025 - 01 - 01), date!(2025 - 01 - 02)]);
        assert_eq!(days[0].values()[26], 1.0);
        assert_eq!(days[1].values()[48], 2.0);
        assert_eq!(days[1].values().iter().filter(|v| **v != 0.0).count(), 1);
    }

    #[test]
    fn comma_dialect_drops_semicolon_tail_of_first_field() {
        let text = "15.08.2025 00:15;extra;stuff,0.75\n15.08.2025 00:30,1\n";
        let days = parse_quarter_hour_csv(text, CsvDialect::Comma);
        assert_eq!(days[0].values()[1], 0.75);
        assert_eq!(days[0].values()[2], 1.0);
    }

    #[test]
    fn off_grid_readings_are_dropped_and_later_duplicates_win() {
        let text = "15.08.2025 00:07;9\n15.08.2025 01:00;1\n15.08.2025 01:00;3\n";
        let days = parse_quarter_hour_csv(text, CsvDialect::Semicolon);
        assert_eq!(days[0].values()[4], 3.0);
        assert!((days[0].total() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn unparsable_values_coerce_to_zero() {
        let text = "15.08.2025 00:00;abc\n15.08.2025 00:15;NaN\n15.08.2025 00:30;inf\n";
        let days = parse_quarter_hour_csv(text, CsvDialect::Semicolon);
        assert_eq!(days.len(), 1);
        assert!(days[0].values().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn stray_quote_only_costs_its_own_line() {
        let text = "15.08.2025 00:00;\"5,0\n15.08.2025 00:15;5,2\n15.08.2025 00:30;1,0";
        let days = parse_quarter_hour_csv(text, CsvDialect::Semicolon);
        assert_eq!(days.len(), 1);
        assert_eq!(&days[0].values()[..3], &[0.0, 5.2, 1.0]);
    }

    #[test]
    fn date_and_time_may_be_separated_by_any_whitespace() {
        let text = "15.08.2025  00:00;1\n15.08.2025\t00:15;2\n15.08.2025 \t 00:30;3\n";
        let days = parse_quarter_hour_csv(text, CsvDialect::Semicolon);
        assert_eq!(days.len(), 1);
        assert_eq!(&days[0].values()[..3], &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn import_rejects_input_without_readings() {
        let err = import_quarter_hour_csv("Datum;Wert\nfoo;bar\n", CsvDialect::Semicolon).unwrap_err();
        assert_eq!(err, ImportError::NoRows);
    }

    #[test]
    fn validation_names_the_offending_day() {
        let good = QuarterHourSeries::for_day(date!(2025 - 08 - 01), WindowConvention::LocalCivil, vec![0.0; 96]);
        let short = QuarterHourSeries::for_day(date!(2025 - 08 - 02), WindowConvention::LocalCivil, vec![0.0; 92]);
        let err = validate_days(&[good.clone(), short]).unwrap_err();
        assert_eq!(
            err,
            ImportError::SlotCount {
                day: date!(2025 - 08 - 02),
                count: 92
            }
        );
        assert!(err.to_string().contains("2025-08-02"));

        let mut values = vec![0.0; 96];
        values[10] = f64::NAN;
        let nan = QuarterHourSeries::for_day(date!(2025 - 08 - 03), WindowConvention::LocalCivil, values);
        assert!(matches!(
            validate_days(&[good, nan]),
            Err(ImportError::NonFinite { slot: 10, .. })
        ));
    }
}
