use mscons_core::{
    import::CsvDialect,
    profile::ProfileFamily,
    Direction, MeteringPoint, PartnerConfig, PlaceholderFlavor, WindowConvention,
};
use serde::Deserialize;
use std::{fs, path::PathBuf};
use time::{macros::format_description, Date};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MessageConfig {
    pub window: WindowConvention,
    pub placeholder: PlaceholderFlavor,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorDefaults {
    pub profile: ProfileFamily,
    pub expected_annual_kwh: f64,
    pub noise_pct: f64,
    pub direction: Direction,
    pub pv_peak_kw: f64,
}

impl Default for GeneratorDefaults {
    fn default() -> Self {
        Self {
            profile: ProfileFamily::H0,
            expected_annual_kwh: 7300.0,
            noise_pct: 6.0,
            direction: Direction::Consumption,
            pv_peak_kw: 4.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    /// Soft limit; larger batches need confirmation.
    pub limit_mb: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("out"),
            limit_mb: 50,
        }
    }
}

impl OutputConfig {
    pub fn limit_bytes(&self) -> usize {
        (self.limit_mb as usize).saturating_mul(1024 * 1024)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CsvConfig {
    pub dialect: CsvDialect,
}

/// Per-metering-point overrides for synthetic generation.
#[derive(Debug, Clone, Deserialize)]
pub struct PointConfig {
    pub id: String,
    pub direction: Option<Direction>,
    pub profile: Option<ProfileFamily>,
    pub expected_annual_kwh: Option<f64>,
    pub pv_peak_kw: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlpConfig {
    /// First day, `YYYY-MM-DD`.
    pub start: String,
    pub days: usize,
    #[serde(default)]
    pub seed: u32,
    /// Newline-separated ids using the generator defaults.
    #[serde(default)]
    pub metering_points: String,
    #[serde(default)]
    pub points: Vec<PointConfig>,
}

impl SlpConfig {
    pub fn start_date(&self) -> anyhow::Result<Date> {
        let format = format_description!("[year]-[month]-[day]");
        Date::parse(self.start.trim(), format).map_err(|e| anyhow::anyhow!("invalid slp.start '{}': {e}", self.start))
    }

    /// Every configured point with defaults applied; list entries first,
    /// then explicit `[[slp.points]]`, duplicates dropped.
    pub fn resolve_points(&self, defaults: &GeneratorDefaults) -> anyhow::Result<Vec<ResolvedPoint>> {
        let mut out: Vec<ResolvedPoint> = MeteringPoint::parse_list(&self.metering_points)
            .into_iter()
            .map(|id| ResolvedPoint::with_defaults(id, defaults))
            .collect();

        for p in &self.points {
            let id = MeteringPoint::new(&p.id)?;
            if out.iter().any(|r| r.id == id) {
                continue;
            }
            let mut resolved = ResolvedPoint::with_defaults(id, defaults);
            resolved.direction = p.direction.unwrap_or(resolved.direction);
            resolved.profile = p.profile.unwrap_or(resolved.profile);
            resolved.expected_annual_kwh = p.expected_annual_kwh.unwrap_or(resolved.expected_annual_kwh);
            resolved.pv_peak_kw = p.pv_peak_kw.unwrap_or(resolved.pv_peak_kw);
            out.push(resolved);
        }

        if out.is_empty() {
            anyhow::bail!("slp job has no metering points");
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPoint {
    pub id: MeteringPoint,
    pub direction: Direction,
    pub profile: ProfileFamily,
    pub expected_annual_kwh: f64,
    pub pv_peak_kw: f64,
}

impl ResolvedPoint {
    fn with_defaults(id: MeteringPoint, defaults: &GeneratorDefaults) -> Self {
        Self {
            id,
            direction: defaults.direction,
            profile: defaults.profile,
            expected_annual_kwh: defaults.expected_annual_kwh,
            pv_peak_kw: defaults.pv_peak_kw,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Prometheus text exposition written at the end of a run.
    pub textfile: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub partner: PartnerConfig,
    pub message: MessageConfig,
    pub defaults: GeneratorDefaults,
    pub output: OutputConfig,
    pub csv: CsvConfig,
    pub slp: Option<SlpConfig>,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    /// Load from `$MSCONS_CONFIG` (default `mscons-config.toml`). A missing
    /// default file yields the built-in configuration.
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        match env::var("MSCONS_CONFIG") {
            Ok(path) => Self::from_file(&path),
            Err(_) => {
                let path = "mscons-config.toml";
                if fs::metadata(path).is_ok() {
                    Self::from_file(path)
                } else {
                    tracing::info!("no {path} found, using built-in configuration");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| anyhow::anyhow!("failed to read config '{path}': {e}"))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }
}
