//! Per-unit screenshot buffer.
//!
//! Images are held in memory under the relative path that events reference,
//! and only reach disk when the owning reporter is finalized. The relative
//! path does not depend on the image content, so it can be recorded in an
//! event before the report's location is known.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use tracing::{debug, error, warn};
use uuid::Uuid;

use super::camera::Camera;
use super::types::{DIRECTORY_SUFFIX, EXTENSION, FlushSummary, SnapshotError, SnapshotResult};

/// Capture buffer owned by exactly one test unit
#[derive(Default)]
pub struct ScreenshotStore {
    camera: Option<Box<dyn Camera>>,
    buffer: BTreeMap<String, Vec<u8>>,
}

impl ScreenshotStore {
    /// Create an empty store with no camera bound
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store bound to a camera
    pub fn with_camera(camera: Box<dyn Camera>) -> Self {
        Self {
            camera: Some(camera),
            buffer: BTreeMap::new(),
        }
    }

    /// Bind (or rebind) the surface images are captured from
    pub fn set_camera(&mut self, camera: Box<dyn Camera>) {
        self.camera = Some(camera);
    }

    pub fn has_camera(&self) -> bool {
        self.camera.is_some()
    }

    /// Number of images waiting to be flushed
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Relative paths of buffered images, in path order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.buffer.keys().map(String::as_str)
    }

    /// Capture an image and return the relative path it will be flushed to.
    ///
    /// Returns `Ok(None)` when no camera is bound.
    pub fn take(&mut self) -> SnapshotResult<Option<String>> {
        let Some(camera) = self.camera.as_mut() else {
            return Ok(None);
        };

        let data = camera.capture_image()?;
        if data.is_empty() {
            return Err(SnapshotError::Capture(format!(
                "{} camera returned an empty image",
                camera.source_type()
            )));
        }

        let path = generate_relative_path();
        debug!(path = %path, bytes = data.len(), "buffered screenshot");
        self.buffer.insert(path.clone(), data);
        Ok(Some(path))
    }

    /// Capture an image for an event, logging rather than returning failures
    pub fn take_for_event(&mut self) -> Option<String> {
        match self.take() {
            Ok(path) => path,
            Err(e) => {
                warn!("Screenshot capture failed, event recorded without one: {}", e);
                None
            }
        }
    }

    /// Write every buffered image next to `output_path`.
    ///
    /// The companion directory (`output_path` + `_screenshots`) is removed
    /// first so a re-run under the same name never mixes in stale images.
    /// Buffered images are discarded whether or not their write succeeds.
    pub fn flush(&mut self, output_path: &Path) -> FlushSummary {
        let mut summary = FlushSummary::default();

        let directory = screenshot_directory(output_path);
        if directory.exists() {
            if let Err(e) = fs::remove_dir_all(&directory) {
                error!("Failed to remove stale screenshot directory {}: {}", directory.display(), e);
            }
        }

        for (relative, data) in std::mem::take(&mut self.buffer) {
            let target = companion_path(output_path, &relative);
            let written = target
                .parent()
                .map_or(Ok(()), fs::create_dir_all)
                .and_then(|()| fs::write(&target, &data));

            match written {
                Ok(()) => summary.written.push(target),
                Err(e) => {
                    error!("Failed to write screenshot {}: {}", target.display(), e);
                    summary.failed.push(relative);
                }
            }
        }

        summary
    }
}

impl std::fmt::Debug for ScreenshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreenshotStore")
            .field("camera", &self.camera.as_ref().map(|c| c.source_type().to_string()))
            .field("buffered", &self.buffer.len())
            .finish()
    }
}

/// Directory holding the screenshots of the report at `output_path`
pub fn screenshot_directory(output_path: &Path) -> PathBuf {
    companion_path(output_path, DIRECTORY_SUFFIX)
}

/// Append a relative screenshot path to a report path by plain concatenation
pub fn companion_path(output_path: &Path, relative: &str) -> PathBuf {
    let mut joined = OsString::from(output_path.as_os_str());
    joined.push(relative);
    PathBuf::from(joined)
}

fn generate_relative_path() -> String {
    format!("{}{}{}{}", DIRECTORY_SUFFIX, MAIN_SEPARATOR, Uuid::new_v4(), EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screenshot::camera::MockFramebuffer;

    struct BrokenCamera;

    impl Camera for BrokenCamera {
        fn capture_image(&mut self) -> SnapshotResult<Vec<u8>> {
            Err(SnapshotError::Capture("session lost".into()))
        }

        fn source_type(&self) -> &str {
            "broken"
        }
    }

    fn mock_store() -> ScreenshotStore {
        ScreenshotStore::with_camera(Box::new(MockFramebuffer::with_color(16, 16, [9, 9, 9])))
    }

    #[test]
    fn test_take_without_camera_is_silent() {
        let mut store = ScreenshotStore::new();
        assert!(!store.has_camera());
        assert_eq!(store.take().unwrap(), None);
        assert!(store.is_empty());

        store.set_camera(Box::new(MockFramebuffer::new(2, 2)));
        assert!(store.has_camera());
    }

    #[test]
    fn test_take_assigns_unique_relative_paths() {
        let mut store = mock_store();
        let a = store.take().unwrap().unwrap();
        let b = store.take().unwrap().unwrap();

        assert_ne!(a, b);
        assert!(a.starts_with(DIRECTORY_SUFFIX));
        assert!(a.ends_with(EXTENSION));
        assert_eq!(store.len(), 2);

        let mut expected = vec![a.as_str(), b.as_str()];
        expected.sort();
        assert_eq!(store.paths().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_failed_capture_is_absent_for_events() {
        let mut store = ScreenshotStore::with_camera(Box::new(BrokenCamera));
        assert!(store.take().is_err());
        assert_eq!(store.take_for_event(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_flush_writes_and_clears_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("report.json");

        let mut store = mock_store();
        let relative = store.take().unwrap().unwrap();
        let summary = store.flush(&output);

        assert!(summary.is_complete());
        assert_eq!(summary.written, vec![companion_path(&output, &relative)]);
        assert!(summary.written[0].exists());
        assert!(store.is_empty());
    }

    #[test]
    fn test_flush_removes_stale_directory() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("report.json");
        let stale = screenshot_directory(&output).join("old.png");
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, b"old").unwrap();

        let mut store = mock_store();
        store.take().unwrap();
        store.flush(&output);

        assert!(!stale.exists());
        assert_eq!(fs::read_dir(screenshot_directory(&output)).unwrap().count(), 1);
    }

    #[test]
    fn test_companion_path_concatenates() {
        let path = companion_path(Path::new("/tmp/run/login.html"), "_screenshots");
        assert_eq!(path, PathBuf::from("/tmp/run/login.html_screenshots"));
    }
}
