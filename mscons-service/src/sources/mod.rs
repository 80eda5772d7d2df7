pub mod quarter_hour_csv_file;
pub mod slp_generator;

pub use quarter_hour_csv_file::QuarterHourCsvFileSource;
pub use slp_generator::SlpGeneratorSource;
