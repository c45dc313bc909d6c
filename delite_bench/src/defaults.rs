//! Centralized default values for delite-bench.
//!
//! These are the fallbacks used when neither the command line nor the
//! configuration file provide a value.

// ============================================================================
// Run Defaults
// ============================================================================

/// Default number of times each app is run per configuration.
pub const DEFAULT_RUNS: u16 = 10;

/// Environment variable the timed run reads its JVM options from.
///
/// The executor prepends the timing dump options to whatever value this
/// variable already holds.
pub const DEFAULT_OPTIONS_ENV: &str = "JAVA_OPTS";

// ============================================================================
// Storage Defaults
// ============================================================================

/// Directory holding the per-commit timing data, relative to the repository root.
pub const DEFAULT_OUTPUT_ROOT: &str = "benchmark/times";

/// Sample files store microseconds; reports work in seconds.
/// Conversions shift the decimal exponent by this much instead of scaling,
/// so values survive a write and read unchanged.
pub const MICROS_EXPONENT: i32 = 6;

// ============================================================================
// Report Defaults
// ============================================================================

/// Default number of timed commits shown per version comparison plot.
pub const DEFAULT_BARS: usize = 3;

/// Default number of leading samples dropped by the fixed warm-up policy.
pub const DEFAULT_WARMUP_DISCARD: usize = 1;

/// Decimal places used for values embedded in the HTML report.
pub const REPORT_VALUE_PRECISION: usize = 4;

/// Name of the directory the report is written to inside the newest commit directory.
pub const REPORT_DIR_NAME: &str = "report";

#[inline]
pub const fn default_runs() -> u16 {
    DEFAULT_RUNS
}

#[inline]
pub const fn default_bars() -> usize {
    DEFAULT_BARS
}

#[inline]
pub const fn default_warmup_discard() -> usize {
    DEFAULT_WARMUP_DISCARD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_runs() {
        assert_eq!(DEFAULT_RUNS, 10);
        assert_eq!(default_runs(), 10);
    }

    #[test]
    fn test_default_bars() {
        assert_eq!(DEFAULT_BARS, 3);
        assert_eq!(default_bars(), 3);
    }

    #[test]
    fn test_default_warmup_discard() {
        assert_eq!(default_warmup_discard(), 1);
    }
}
