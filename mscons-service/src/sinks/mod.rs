pub mod mscons_directory;
pub mod size_advisory;

pub use mscons_directory::MsconsDirectorySink;
pub use size_advisory::{AlwaysProceed, SizeAdvisory, TerminalPrompt};
