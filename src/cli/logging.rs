//! Output gating for the CLI.
//!
//! The core reports through callbacks and never prints; this type decides
//! which of those reports reach stdout, and how often progress lines appear.

/// Verbosity of CLI output.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Errors only (stderr); nothing on stdout.
    Quiet,
    /// Run banner, progress lines, final result.
    Normal,
    /// Everything, including per-skip and per-best diagnostics.
    Verbose,
}

impl LogLevel {
    /// True when a message gated at `required` should be printed.
    #[must_use]
    pub fn allows(self, required: LogLevel) -> bool {
        match self {
            LogLevel::Quiet => false,
            LogLevel::Normal => required == LogLevel::Normal,
            LogLevel::Verbose => true,
        }
    }

    /// Iterations between progress lines for a base reporting interval.
    /// Verbose output reports ten times as often.
    #[must_use]
    pub fn progress_stride(self, base: usize) -> usize {
        match self {
            LogLevel::Verbose => (base / 10).max(1),
            _ => base.max(1),
        }
    }
}

/// Print `msg` when the current level permits messages gated at `required`.
pub fn log(level: LogLevel, required: LogLevel, msg: &str) {
    if level.allows(required) {
        println!("{msg}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_allows_nothing() {
        assert!(!LogLevel::Quiet.allows(LogLevel::Normal));
        assert!(!LogLevel::Quiet.allows(LogLevel::Verbose));
    }

    #[test]
    fn test_normal_hides_verbose_detail() {
        assert!(LogLevel::Normal.allows(LogLevel::Normal));
        assert!(!LogLevel::Normal.allows(LogLevel::Verbose));
    }

    #[test]
    fn test_verbose_allows_everything() {
        assert!(LogLevel::Verbose.allows(LogLevel::Normal));
        assert!(LogLevel::Verbose.allows(LogLevel::Verbose));
    }

    #[test]
    fn test_progress_stride() {
        assert_eq!(LogLevel::Normal.progress_stride(100), 100);
        assert_eq!(LogLevel::Verbose.progress_stride(100), 10);
        // Tiny intervals never collapse to zero
        assert_eq!(LogLevel::Verbose.progress_stride(5), 1);
        assert_eq!(LogLevel::Quiet.progress_stride(0), 1);
    }
}
