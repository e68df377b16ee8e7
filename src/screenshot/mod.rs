pub mod camera;
pub mod store;
pub mod types;

pub use camera::{Camera, MockFramebuffer};
pub use store::{ScreenshotStore, companion_path, screenshot_directory};
pub use types::{DIRECTORY_SUFFIX, EXTENSION, FlushSummary, SnapshotError, SnapshotResult};
