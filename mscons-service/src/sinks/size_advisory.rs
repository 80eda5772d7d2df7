use std::io::{self, BufRead, Write};

/// Decides whether a batch above the soft size limit goes ahead.
pub trait SizeAdvisory: Send + Sync {
    fn confirm(&self, approx_bytes: usize, limit_bytes: usize) -> bool;
}

impl<F> SizeAdvisory for F
where
    F: Fn(usize, usize) -> bool + Send + Sync,
{
    fn confirm(&self, approx_bytes: usize, limit_bytes: usize) -> bool {
        self(approx_bytes, limit_bytes)
    }
}

/// Proceed without asking (`--yes`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysProceed;

impl SizeAdvisory for AlwaysProceed {
    fn confirm(&self, approx_bytes: usize, limit_bytes: usize) -> bool {
        tracing::warn!(approx_bytes, limit_bytes, "output exceeds soft size limit, proceeding");
        true
    }
}

/// Ask on the terminal; anything but `y`/`yes` declines.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

fn megabytes(bytes: usize) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

impl SizeAdvisory for TerminalPrompt {
    fn confirm(&self, approx_bytes: usize, limit_bytes: usize) -> bool {
        let mut stderr = io::stderr();
        let _ = write!(
            stderr,
            "About {:.1} MB of MSCONS output (> {:.0} MB). Continue? [y/N] ",
            megabytes(approx_bytes),
            megabytes(limit_bytes)
        );
        let _ = stderr.flush();

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}
