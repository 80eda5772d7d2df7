use std::path::PathBuf;

use mscons_core::{
    import::{import_quarter_hour_csv, CsvDialect},
    Direction, MeteringDay, MeteringPoint, WindowConvention,
};

use crate::pipeline::{Envelope, EnvelopeStream, PipelineError, Source};

/// Quarter-hour log (`DD.MM.YYYY HH:MM;...;<kWh>`) for a single metering point.
///
/// The file is read whole and imported all-or-nothing: if any day fails
/// validation the stream yields only that error.
pub struct QuarterHourCsvFileSource {
    path: PathBuf,
    dialect: CsvDialect,
    metering_point: MeteringPoint,
    direction: Direction,
    window: WindowConvention,
}

impl QuarterHourCsvFileSource {
    pub fn new<P: Into<PathBuf>>(
        path: P,
        dialect: CsvDialect,
        metering_point: MeteringPoint,
        direction: Direction,
        window: WindowConvention,
    ) -> Self {
        Self {
            path: path.into(),
            dialect,
            metering_point,
            direction,
            window,
        }
    }
}

#[async_trait::async_trait]
impl Source<MeteringDay> for QuarterHourCsvFileSource {
    async fn stream(&self) -> EnvelopeStream<MeteringDay> {
        let path = self.path.clone();
        let dialect = self.dialect;
        let metering_point = self.metering_point.clone();
        let direction = self.direction;
        let window = self.window;

        let s = async_stream::try_stream! {
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| PipelineError::Source(format!("failed to read CSV file '{}': {e}", path.display())))?;
            // Exports are often Windows-1252; stray bytes only hit header or
            // comment lines, which the importer drops anyway.
            let text = String::from_utf8_lossy(&bytes);

            let days = match import_quarter_hour_csv(&text, dialect) {
                Ok(days) => days,
                Err(e) => {
                    metrics::counter!("csv_import_rejected_total").increment(1);
                    Err(PipelineError::Source(format!("{}: {e}", path.display())))?
                }
            };

            tracing::info!(
                file = %path.display(),
                days = days.len(),
                metering_point = %metering_point,
                "quarter-hour CSV imported"
            );
            metrics::counter!("csv_imported_days_total").increment(days.len() as u64);

            for series in days {
                yield Envelope::new(MeteringDay {
                    metering_point: metering_point.clone(),
                    direction,
                    series: series.rewindowed(window),
                });
            }
        };

        Box::pin(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::collect_all;
    use time::macros::{date, datetime};

    fn temp_csv(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("mscons-{}-{name}", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn yields_one_day_per_calendar_day_in_configured_window() {
        let path = temp_csv("two-days.csv", "15.08.2025 00:00;5,0\n16.08.2025 00:15;5,2\n");
        let source = QuarterHourCsvFileSource::new(
            &path,
            CsvDialect::Semicolon,
            MeteringPoint::new("DE913000000000000000000000000000X").unwrap(),
            Direction::Generation,
            WindowConvention::Settlement,
        );

        let days = collect_all(source.stream().await).await.unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(days.len(), 2);
        let first = &days[0].payload;
        assert_eq!(first.series.day(), date!(2025 - 08 - 15));
        assert_eq!(first.series.window().start, datetime!(2025-08-15 22:00));
        assert_eq!(first.direction, Direction::Generation);
        assert_eq!(days[1].payload.series.values()[1], 5.2);
    }

    #[tokio::test]
    async fn latin1_header_does_not_abort_the_import() {
        let path = std::env::temp_dir().join(format!("mscons-{}-latin1.csv", std::process::id()));
        std::fs::write(&path, b"Datum;Z\xE4hlerstand\n15.08.2025 00:15;5,2\n").unwrap();
        let source = QuarterHourCsvFileSource::new(
            &path,
            CsvDialect::Semicolon,
            MeteringPoint::new("12345678901").unwrap(),
            Direction::Consumption,
            WindowConvention::LocalCivil,
        );

        let days = collect_all(source.stream().await).await.unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].payload.series.values()[1], 5.2);
    }

    #[tokio::test]
    async fn unreadable_input_aborts_the_import() {
        let path = temp_csv("empty.csv", "Datum;Wert\n");
        let source = QuarterHourCsvFileSource::new(
            &path,
            CsvDialect::Semicolon,
            MeteringPoint::new("12345678901").unwrap(),
            Direction::Consumption,
            WindowConvention::LocalCivil,
        );

        let err = collect_all(source.stream().await).await.unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, PipelineError::Source(msg) if msg.contains("no readable rows")));
    }

    #[tokio::test]
    async fn missing_file_is_a_source_error() {
        let source = QuarterHourCsvFileSource::new(
            "/nonexistent/mscons.csv",
            CsvDialect::Semicolon,
            MeteringPoint::new("12345678901").unwrap(),
            Direction::Consumption,
            WindowConvention::LocalCivil,
        );
        let err = collect_all(source.stream().await).await.unwrap_err();
        assert!(matches!(err, PipelineError::Source(msg) if msg.contains("failed to read CSV file")));
    }
}
