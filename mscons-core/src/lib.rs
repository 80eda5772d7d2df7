pub mod domain;
pub mod edifact;
pub mod error;
pub mod import;
pub mod naming;
pub mod profile;

pub use domain::{DayWindow, Direction, MeteringDay, MeteringPoint, QuarterHourSeries, WindowConvention};
pub use edifact::{EdifactMessage, MessageBuilder, PartnerConfig, PlaceholderFlavor};
pub use error::{ConfigError, ImportError};
