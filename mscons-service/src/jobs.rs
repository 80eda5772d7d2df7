use std::{path::PathBuf, sync::Arc};

use mscons_core::{
    edifact::check_shape,
    import::{parse_quarter_hour_csv, CsvDialect},
    naming::{document_file_name, BundleNaming},
    profile::{generate_consumption, ConsumptionParams, ProfileFamily},
    Direction, MessageBuilder, MeteringDay, MeteringPoint, QuarterHourSeries,
};
use time::macros::date;

use crate::{
    config::AppConfig,
    pipeline::{Pipeline, PipelineError},
    sinks::{MsconsDirectorySink, SizeAdvisory},
    sources::{QuarterHourCsvFileSource, SlpGeneratorSource},
    transform::MeteringDayValidation,
};

fn message_builder(cfg: &AppConfig) -> MessageBuilder {
    MessageBuilder::new(cfg.partner.clone(), cfg.message.placeholder)
}

/// Convert one uploaded quarter-hour log for one metering point.
pub struct CsvJob {
    pub path: PathBuf,
    pub metering_point: MeteringPoint,
    pub direction: Direction,
}

pub async fn run_csv_job(cfg: &AppConfig, job: CsvJob, advisory: Arc<dyn SizeAdvisory>) -> Result<(), PipelineError> {
    let naming = BundleNaming::Csv {
        partner: cfg.partner.clone(),
        metering_point: job.metering_point.clone(),
        direction: job.direction,
    };
    let source = QuarterHourCsvFileSource::new(job.path, cfg.csv.dialect, job.metering_point, job.direction, cfg.message.window);
    let sink = MsconsDirectorySink::new(message_builder(cfg), naming, &cfg.output.dir, cfg.output.limit_bytes(), advisory);

    let pipeline: Pipeline<_, MeteringDay, _> = Pipeline {
        source,
        transforms: vec![Arc::new(MeteringDayValidation)],
        sink,
    };
    pipeline.run().await
}

/// Generate synthetic days for every point of the `[slp]` section.
pub async fn run_slp_job(cfg: &AppConfig, advisory: Arc<dyn SizeAdvisory>) -> anyhow::Result<()> {
    let Some(slp) = &cfg.slp else {
        anyhow::bail!("no [slp] section in configuration");
    };
    let start = slp.start_date()?;
    let points = slp.resolve_points(&cfg.defaults)?;

    let naming = BundleNaming::Slp {
        start,
        point_count: points.len(),
    };
    let source = SlpGeneratorSource::new(points, start, slp.days, slp.seed, &cfg.defaults, cfg.message.window);
    let sink = MsconsDirectorySink::new(message_builder(cfg), naming, &cfg.output.dir, cfg.output.limit_bytes(), advisory);

    let pipeline: Pipeline<_, MeteringDay, _> = Pipeline {
        source,
        transforms: vec![Arc::new(MeteringDayValidation)],
        sink,
    };
    pipeline.run().await?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfTestCheck {
    pub name: &'static str,
    pub outcome: Result<(), String>,
}

fn check(name: &'static str, ok: bool, detail: impl FnOnce() -> String) -> SelfTestCheck {
    SelfTestCheck {
        name,
        outcome: if ok { Ok(()) } else { Err(detail()) },
    }
}

/// Exercise import, generation, naming and message assembly with the
/// configured partner and report each property.
pub fn self_test(cfg: &AppConfig) -> Vec<SelfTestCheck> {
    let mut checks = Vec::new();

    let days = parse_quarter_hour_csv("15.08.2025 00:00;5,0\n15.08.2025 00:15;5,2", CsvDialect::Semicolon);
    let csv_ok = days.len() == 1
        && days[0].day() == date!(2025 - 08 - 15)
        && days[0].values().len() == 96
        && days[0].values()[0] == 5.0
        && days[0].values()[1] == 5.2
        && days[0].values()[2..].iter().all(|v| *v == 0.0);
    checks.push(check("csv import fills one day", csv_ok, || format!("parsed {} day(s)", days.len())));

    let params = ConsumptionParams {
        family: ProfileFamily::H0,
        daily_kwh: 20.0,
        noise_pct: 5.0,
    };
    let a = generate_consumption(123, &params, 96);
    let b = generate_consumption(123, &params, 96);
    checks.push(check("generation is deterministic", a == b, || "seed 123 produced differing values".to_string()));

    let total: f64 = a.iter().sum();
    checks.push(check("generated day conserves energy", (total - 20.0).abs() <= 0.01, || {
        format!("sum {total:.4} kWh, expected 20")
    }));

    let point = MeteringPoint::new("99999999999").ok();
    let name = point
        .as_ref()
        .map(|p| document_file_name(&cfg.partner, date!(2025 - 08 - 15), p, Direction::Consumption))
        .unwrap_or_default();
    checks.push(check(
        "file name carries date, point and direction",
        name.contains("20250815") && name.contains("99999999999") && name.contains("VERBRAUCH"),
        || name.clone(),
    ));

    let series = QuarterHourSeries::for_day(date!(2025 - 08 - 15), cfg.message.window, a);
    let msg = message_builder(cfg).build_series("99999999999", Direction::Consumption.obis(), &series);
    let text = msg.as_str();
    checks.push(check(
        "message starts with UNA and UNB",
        text.starts_with("UNA:+.? 'UNB+"),
        || text.chars().take(24).collect(),
    ));
    checks.push(check("message closes the interchange", text.contains("UNZ+1+"), || "no UNZ+1+".to_string()));
    let shape = check_shape(text);
    checks.push(check("message shape", shape.is_ok(), || {
        shape.err().map(|e| e.to_string()).unwrap_or_default()
    }));

    checks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::AlwaysProceed;

    #[test]
    fn self_test_passes_with_default_config() {
        let checks = self_test(&AppConfig::default());
        assert_eq!(checks.len(), 7);
        for c in &checks {
            assert_eq!(c.outcome, Ok(()), "{}", c.name);
        }
    }

    #[tokio::test]
    async fn slp_job_requires_slp_section() {
        let err = run_slp_job(&AppConfig::default(), Arc::new(AlwaysProceed)).await.unwrap_err();
        assert!(err.to_string().contains("[slp]"));
    }

    #[tokio::test]
    async fn slp_job_writes_one_file_per_point_and_day() {
        let dir = std::env::temp_dir().join(format!("mscons-slp-job-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let toml = format!(
            "[output]\ndir = {:?}\n[slp]\nstart = \"2025-08-30\"\ndays = 3\nseed = 1\nmetering_points = \"50226092026\\n51620926184\"\n",
            dir.display().to_string()
        );
        let cfg = AppConfig::from_toml(&toml).unwrap();

        run_slp_job(&cfg, Arc::new(AlwaysProceed)).await.unwrap();

        let master = dir.join("MSCONS_20250830_2MaLo_master");
        assert_eq!(std::fs::read_dir(&master).unwrap().count(), 6);
        let september = dir.join("MSCONS_202509_2MaLo");
        assert_eq!(std::fs::read_dir(&september).unwrap().count(), 2);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn csv_job_converts_every_day() {
        let base = std::env::temp_dir().join(format!("mscons-csv-job-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&base);
        std::fs::create_dir_all(&base).unwrap();
        let csv = base.join("input.csv");
        std::fs::write(&csv, "Datum;Wert\n15.08.2025 00:00;5,0\n15.08.2025 00:15;5,2\n").unwrap();

        let mut cfg = AppConfig::default();
        cfg.output.dir = base.join("out");
        let job = CsvJob {
            path: csv,
            metering_point: MeteringPoint::new("DE913000000000000000000000000000X").unwrap(),
            direction: Direction::Generation,
        };
        run_csv_job(&cfg, job, Arc::new(AlwaysProceed)).await.unwrap();

        let file = cfg
            .output
            .dir
            .join("MSCONS_TL_9979383000006_9906629000002_202508_DE913000000000000000000000000000X_ERZEUGUNG_CSV")
            .join("MSCONS_TL_9979383000006_9906629000002_20250815_DE913000000000000000000000000000X_ERZEUGUNG.txt");
        let text = std::fs::read_to_string(file).unwrap();
        assert!(text.contains("PIA+5+1-0?:2.8.0:SRW'"));
        assert!(text.contains("QTY+220:5.2'"));
        std::fs::remove_dir_all(&base).ok();
    }
}
