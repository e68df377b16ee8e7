//! Run directory management.
//!
//! Each harness invocation writes into its own timestamped directory under
//! the configured output base, so concurrent units get distinct report paths
//! and old runs can be listed or pruned.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::report::ReportFormat;

/// Metadata file written into every run directory
pub const RUN_METADATA_FILE: &str = ".run.json";

/// One invocation's output directory
#[derive(Debug, Clone)]
pub struct RunDirectory {
    /// Unique run ID
    pub id: String,
    /// Root directory for this run
    pub dir: PathBuf,
}

impl RunDirectory {
    /// A new run under `base`, named `<name>_<timestamp>`
    pub fn new(base: impl AsRef<Path>, name: &str) -> Self {
        let id = format!("{}_{}", sanitize_name(name), generate_timestamp_suffix());
        let dir = base.as_ref().join(&id);
        Self { id, dir }
    }

    /// Use an existing directory as the run directory
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let id = dir
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("run_{}", generate_timestamp_suffix()));
        Self { id, dir }
    }

    /// Create the directory and write its metadata file
    pub fn init(&self, units: usize) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;

        let metadata = serde_json::json!({
            "id": self.id,
            "created": chrono::Utc::now().to_rfc3339(),
            "units": units,
            "host": hostname::get().ok().map(|h| h.to_string_lossy().into_owned()),
        });

        fs::write(self.dir.join(RUN_METADATA_FILE), serde_json::to_string_pretty(&metadata)?)?;
        Ok(())
    }

    /// Report path for one unit; indices keep same-titled units apart
    pub fn report_path(&self, index: usize, title: &str, format: ReportFormat) -> PathBuf {
        self.dir
            .join(format!("{:03}_{}.{}", index, sanitize_name(title), format.extension()))
    }

    /// JSON reports in this run (HTML manifests included), sorted by name
    pub fn list_reports(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut reports = Vec::new();
        if self.dir.exists() {
            for entry in fs::read_dir(&self.dir)? {
                let path = entry?.path();
                let is_json = path.extension().map(|e| e == "json").unwrap_or(false);
                let is_metadata = path.file_name().map(|n| n == RUN_METADATA_FILE).unwrap_or(false);
                if path.is_file() && is_json && !is_metadata {
                    reports.push(path);
                }
            }
        }
        reports.sort();
        Ok(reports)
    }
}

/// Generate a timestamp suffix
fn generate_timestamp_suffix() -> String {
    chrono::Utc::now().format("%Y%m%d_%H%M%S%3f").to_string()
}

/// Sanitize a name for use in filenames
pub fn sanitize_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        })
        .collect();
    if sanitized.is_empty() { "unnamed".to_string() } else { sanitized }
}

/// Remove run directories under `base` older than `max_age`
pub fn cleanup_old_runs(base: &Path, max_age: Duration) -> std::io::Result<usize> {
    if !base.exists() {
        return Ok(0);
    }

    let now = SystemTime::now();
    let mut cleaned = 0;

    for entry in fs::read_dir(base)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() || !path.join(RUN_METADATA_FILE).exists() {
            continue;
        }

        let age = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());
        if age.is_some_and(|age| age > max_age) && fs::remove_dir_all(&path).is_ok() {
            cleaned += 1;
        }
    }

    Ok(cleaned)
}

/// List run directories under `base`
pub fn list_runs(base: &Path) -> std::io::Result<Vec<PathBuf>> {
    if !base.exists() {
        return Ok(Vec::new());
    }

    let mut runs = Vec::new();
    for entry in fs::read_dir(base)? {
        let path = entry?.path();
        if path.is_dir() && path.join(RUN_METADATA_FILE).exists() {
            runs.push(path);
        }
    }
    runs.sort();
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("hello world"), "hello_world");
        assert_eq!(sanitize_name("login/logout"), "login_logout");
        assert_eq!(sanitize_name(""), "unnamed");
    }

    #[test]
    fn test_report_path_is_unique_per_index() {
        let run = RunDirectory::in_dir("/tmp/run_1");
        let a = run.report_path(0, "Login flow", ReportFormat::Json);
        let b = run.report_path(1, "Login flow", ReportFormat::Html);
        assert!(a.ends_with("000_Login_flow.json"));
        assert!(b.ends_with("001_Login_flow.html"));
    }

    #[test]
    fn test_init_and_list() {
        let base = tempfile::tempdir().unwrap();
        let run = RunDirectory::new(base.path(), "nightly");
        run.init(2).unwrap();
        fs::write(run.report_path(0, "a", ReportFormat::Json), "{}").unwrap();

        assert!(run.id.starts_with("nightly_"));
        assert_eq!(list_runs(base.path()).unwrap(), vec![run.dir.clone()]);
        assert_eq!(run.list_reports().unwrap().len(), 1);
    }

    #[test]
    fn test_cleanup_keeps_recent_runs() {
        let base = tempfile::tempdir().unwrap();
        let run = RunDirectory::new(base.path(), "recent");
        run.init(0).unwrap();
        fs::create_dir_all(base.path().join("not_a_run")).unwrap();
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(cleanup_old_runs(base.path(), Duration::from_secs(3600)).unwrap(), 0);
        assert_eq!(cleanup_old_runs(base.path(), Duration::ZERO).unwrap(), 1);
        assert!(base.path().join("not_a_run").exists());
    }
}
