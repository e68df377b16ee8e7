//! Configuration management with environment variable support.
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HARNESS_OUTPUT_DIR` | Base directory for run directories and reports | `./harness_reports` |
//! | `HARNESS_MAX_WORKERS` | Fixed worker pool size (`0` = one thread per unit) | `0` |
//! | `HARNESS_REPORT_FORMAT` | Report format, `json` or `html` | `json` |
//! | `HARNESS_LOG` | Default log filter when `RUST_LOG` is unset | `browser_harness=info` |
//! | `HARNESS_RUN_RETENTION_HOURS` | Age after which `runs clean` removes a run | `72` |
//!
//! # Example
//!
//! ```bash
//! export HARNESS_OUTPUT_DIR="/var/tmp/nightly"
//! export HARNESS_MAX_WORKERS=4
//! export HARNESS_REPORT_FORMAT=html
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use crate::report::ReportFormat;

// ============================================================================
// Default Values
// ============================================================================

/// Default base directory for reports
pub const DEFAULT_OUTPUT_DIR: &str = "./harness_reports";

/// Default report format name
pub const DEFAULT_REPORT_FORMAT: &str = "json";

/// Default log filter
pub const DEFAULT_LOG_FILTER: &str = "browser_harness=info";

/// Default run retention (hours)
pub const DEFAULT_RUN_RETENTION_HOURS: u64 = 72;

// ============================================================================
// Environment Variable Names
// ============================================================================

pub const ENV_OUTPUT_DIR: &str = "HARNESS_OUTPUT_DIR";
pub const ENV_MAX_WORKERS: &str = "HARNESS_MAX_WORKERS";
pub const ENV_REPORT_FORMAT: &str = "HARNESS_REPORT_FORMAT";
pub const ENV_LOG: &str = "HARNESS_LOG";
pub const ENV_RUN_RETENTION_HOURS: &str = "HARNESS_RUN_RETENTION_HOURS";

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Centralized configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub output: OutputSettings,
    pub scheduler: SchedulerSettings,
    pub logging: LogSettings,
}

/// Where and how reports are written
#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub base_dir: PathBuf,
    pub format: ReportFormat,
    pub retention: Duration,
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// `None` means one thread per unit
    pub max_workers: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct LogSettings {
    pub filter: String,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self::from_lookup(|_| None)
    }

    /// Build from an arbitrary key lookup; unparsable values fall back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let retention_hours = lookup(ENV_RUN_RETENTION_HOURS)
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_RUN_RETENTION_HOURS);

        Self {
            output: OutputSettings {
                base_dir: PathBuf::from(
                    lookup(ENV_OUTPUT_DIR).unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()),
                ),
                format: lookup(ENV_REPORT_FORMAT)
                    .and_then(|s| s.parse::<ReportFormat>().ok())
                    .unwrap_or_default(),
                retention: hours(retention_hours),
            },
            scheduler: SchedulerSettings {
                max_workers: lookup(ENV_MAX_WORKERS)
                    .and_then(|s| s.parse::<usize>().ok())
                    .filter(|&n| n > 0),
            },
            logging: LogSettings {
                filter: lookup(ENV_LOG).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            },
        }
    }
}

/// Duration of `n` hours, saturating instead of overflowing
pub fn hours(n: u64) -> Duration {
    Duration::from_secs(n.saturating_mul(3600))
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_defaults() {
        let config = Config::defaults();
        assert_eq!(config.output.base_dir, PathBuf::from(DEFAULT_OUTPUT_DIR));
        assert_eq!(config.output.format, ReportFormat::Json);
        assert_eq!(config.scheduler.max_workers, None);
        assert_eq!(config.logging.filter, DEFAULT_LOG_FILTER);
        assert_eq!(config.output.retention, Duration::from_secs(72 * 3600));
    }

    #[test]
    fn test_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (ENV_OUTPUT_DIR, "/tmp/nightly"),
            (ENV_MAX_WORKERS, "4"),
            (ENV_REPORT_FORMAT, "HTML"),
            (ENV_RUN_RETENTION_HOURS, "1"),
        ]
        .into_iter()
        .collect();
        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.output.base_dir, PathBuf::from("/tmp/nightly"));
        assert_eq!(config.output.format, ReportFormat::Html);
        assert_eq!(config.scheduler.max_workers, Some(4));
        assert_eq!(config.output.retention, Duration::from_secs(3600));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = Config::from_lookup(|key| match key {
            ENV_MAX_WORKERS => Some("0".to_string()),
            ENV_REPORT_FORMAT => Some("xml".to_string()),
            ENV_RUN_RETENTION_HOURS => Some("soon".to_string()),
            _ => None,
        });
        assert_eq!(config.scheduler.max_workers, None);
        assert_eq!(config.output.format, ReportFormat::Json);
        assert_eq!(config.output.retention, Duration::from_secs(DEFAULT_RUN_RETENTION_HOURS * 3600));
    }

    #[test]
    fn test_huge_retention_saturates() {
        let config = Config::from_lookup(|key| (key == ENV_RUN_RETENTION_HOURS).then(|| u64::MAX.to_string()));
        assert_eq!(config.output.retention, Duration::from_secs(u64::MAX));
        assert_eq!(hours(2), Duration::from_secs(7200));
    }
}
