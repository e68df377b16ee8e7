//! Browser automation collaborator.
//!
//! The harness never speaks a browser protocol itself. A test unit is handed
//! a [`BrowserSession`] by a factory; the harness only needs window queries,
//! `close()`, and a [`Camera`] bound to the same session for failure
//! screenshots. [`MockBrowser`] is an in-process session that renders its
//! current page title into a framebuffer.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::screenshot::{Camera, MockFramebuffer, SnapshotError, SnapshotResult};

/// Result type for browser operations
pub type BrowserResult<T> = Result<T, BrowserError>;

/// Error types for browser operations
#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    /// The session could not be created or a command failed
    #[error("Session error: {0}")]
    Session(String),

    /// No window matched the requested handle or title
    #[error("No such window: {0}")]
    NoSuchWindow(String),

    /// The session was already closed
    #[error("Session is closed")]
    Closed,
}

/// What kind of browser a unit asks its factory for
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Capabilities {
    pub browser_name: String,
    pub version: String,

    /// Vendor-specific options passed through untouched
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Capabilities {
    pub fn new(browser_name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            browser_name: browser_name.into(),
            version: version.into(),
            extra: serde_json::Map::new(),
        }
    }

    /// "name version", as shown in reports
    pub fn label(&self) -> String {
        if self.version.is_empty() {
            self.browser_name.clone()
        } else {
            format!("{} {}", self.browser_name, self.version)
        }
    }
}

/// A live browser session
pub trait BrowserSession: Send {
    fn capabilities(&self) -> &Capabilities;

    /// Title of the currently selected window
    fn title(&self) -> BrowserResult<String>;

    fn window_handles(&self) -> BrowserResult<Vec<String>>;

    fn switch_to_window(&mut self, handle: &str) -> BrowserResult<()>;

    /// Resize the window to fill the screen
    fn maximize(&mut self) -> BrowserResult<()>;

    fn close(&mut self) -> BrowserResult<()>;

    /// A capture handle bound to this session, if it can take screenshots
    fn camera(&self) -> Option<Box<dyn Camera>>;
}

/// Select the first window whose title contains `partial_title`, ignoring case
pub fn switch_to(session: &mut dyn BrowserSession, partial_title: &str) -> BrowserResult<String> {
    let needle = partial_title.to_lowercase();
    for handle in session.window_handles()? {
        session.switch_to_window(&handle)?;
        if session.title()?.to_lowercase().contains(&needle) {
            return Ok(handle);
        }
    }
    Err(BrowserError::NoSuchWindow(partial_title.to_string()))
}

#[derive(Debug)]
struct MockWindow {
    handle: String,
    title: String,
}

#[derive(Debug)]
struct MockState {
    windows: Vec<MockWindow>,
    current: usize,
    maximized: bool,
    closed: bool,
}

/// In-process browser session for demos and tests
#[derive(Debug, Clone)]
pub struct MockBrowser {
    capabilities: Capabilities,
    state: Arc<Mutex<MockState>>,
    screen: (u32, u32),
}

impl MockBrowser {
    /// Open a session with a single window showing `title`
    pub fn new(capabilities: Capabilities, title: impl Into<String>) -> Self {
        Self {
            capabilities,
            state: Arc::new(Mutex::new(MockState {
                windows: vec![MockWindow {
                    handle: "window-0".to_string(),
                    title: title.into(),
                }],
                current: 0,
                maximized: false,
                closed: false,
            })),
            screen: (320, 96),
        }
    }

    /// Open another window and return its handle; the selection is unchanged
    pub fn open_window(&self, title: impl Into<String>) -> String {
        let mut state = lock(&self.state);
        let handle = format!("window-{}", state.windows.len());
        state.windows.push(MockWindow {
            handle: handle.clone(),
            title: title.into(),
        });
        handle
    }

    /// Simulate navigation in the selected window
    pub fn navigate(&self, title: impl Into<String>) {
        let mut state = lock(&self.state);
        let current = state.current;
        state.windows[current].title = title.into();
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }

    pub fn is_maximized(&self) -> bool {
        lock(&self.state).maximized
    }

    fn ensure_open(state: &MockState) -> BrowserResult<()> {
        if state.closed { Err(BrowserError::Closed) } else { Ok(()) }
    }
}

impl BrowserSession for MockBrowser {
    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn title(&self) -> BrowserResult<String> {
        let state = lock(&self.state);
        Self::ensure_open(&state)?;
        Ok(state.windows[state.current].title.clone())
    }

    fn window_handles(&self) -> BrowserResult<Vec<String>> {
        let state = lock(&self.state);
        Self::ensure_open(&state)?;
        Ok(state.windows.iter().map(|w| w.handle.clone()).collect())
    }

    fn switch_to_window(&mut self, handle: &str) -> BrowserResult<()> {
        let mut state = lock(&self.state);
        Self::ensure_open(&state)?;
        let index = state
            .windows
            .iter()
            .position(|w| w.handle == handle)
            .ok_or_else(|| BrowserError::NoSuchWindow(handle.to_string()))?;
        state.current = index;
        Ok(())
    }

    fn maximize(&mut self) -> BrowserResult<()> {
        let mut state = lock(&self.state);
        Self::ensure_open(&state)?;
        state.maximized = true;
        Ok(())
    }

    fn close(&mut self) -> BrowserResult<()> {
        let mut state = lock(&self.state);
        Self::ensure_open(&state)?;
        state.closed = true;
        Ok(())
    }

    fn camera(&self) -> Option<Box<dyn Camera>> {
        Some(Box::new(MockCamera {
            state: Arc::clone(&self.state),
            screen: self.screen,
        }))
    }
}

/// Renders the mock session's selected window title
struct MockCamera {
    state: Arc<Mutex<MockState>>,
    screen: (u32, u32),
}

impl Camera for MockCamera {
    fn capture_image(&mut self) -> SnapshotResult<Vec<u8>> {
        let title = {
            let state = lock(&self.state);
            if state.closed {
                return Err(SnapshotError::Capture("browser session is closed".into()));
            }
            state.windows[state.current].title.clone()
        };

        let (width, height) = self.screen;
        MockFramebuffer::page(width, height, &title).capture_image()
    }

    fn source_type(&self) -> &str {
        "mock"
    }
}

/// Ignores poisoning; the mock keeps serving its last state
fn lock(state: &Mutex<MockState>) -> std::sync::MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_label() {
        assert_eq!(Capabilities::new("firefox", "120").label(), "firefox 120");
        assert_eq!(Capabilities::new("chrome", "").label(), "chrome");
    }

    #[test]
    fn test_switch_to_matches_partial_title() {
        let mut browser = MockBrowser::new(Capabilities::new("firefox", "120"), "Home");
        browser.open_window("Checkout - Payment");

        let handle = switch_to(&mut browser, "PAYMENT").unwrap();
        assert_eq!(handle, "window-1");
        assert_eq!(browser.title().unwrap(), "Checkout - Payment");
        assert!(matches!(switch_to(&mut browser, "missing"), Err(BrowserError::NoSuchWindow(_))));
    }

    #[test]
    fn test_camera_follows_navigation() {
        let mut browser = MockBrowser::new(Capabilities::default(), "Home");
        let mut camera = browser.camera().unwrap();
        let before = camera.capture_image().unwrap();

        browser.navigate("Order confirmed");
        assert_eq!(browser.title().unwrap(), "Order confirmed");
        assert_ne!(camera.capture_image().unwrap(), before);

        assert!(!browser.is_maximized());
        browser.maximize().unwrap();
        assert!(browser.is_maximized());
    }

    #[test]
    fn test_close_disables_session_and_camera() {
        let mut browser = MockBrowser::new(Capabilities::default(), "Home");
        let mut camera = browser.camera().unwrap();
        assert!(camera.capture_image().is_ok());

        browser.close().unwrap();
        assert!(browser.is_closed());
        assert!(matches!(browser.title(), Err(BrowserError::Closed)));
        assert!(camera.capture_image().is_err());
    }
}
