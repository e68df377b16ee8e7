//! Capture primitive abstraction.
//!
//! A [`Camera`] is the narrow surface a browser session lends to a
//! [`ScreenshotStore`](super::ScreenshotStore): one call, one encoded image.
//! [`MockFramebuffer`] is an in-memory implementation used by the mock
//! browser and by tests.

use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

use super::types::{SnapshotError, SnapshotResult};

/// Glyph cell size of the built-in font
const GLYPH: u32 = 8;

/// Height of the title bar drawn by [`MockFramebuffer::page`]
const TITLE_BAR: u32 = 16;

/// A capture handle bound to one rendering surface
///
/// Implementations return PNG bytes of whatever they are bound to (a remote
/// browser viewport, a framebuffer).
pub trait Camera: Send {
    fn capture_image(&mut self) -> SnapshotResult<Vec<u8>>;

    /// Short identifier for logs (e.g. "webdriver", "mock")
    fn source_type(&self) -> &str;
}

/// In-memory RGB surface that encodes itself as PNG on capture
#[derive(Debug, Clone)]
pub struct MockFramebuffer {
    image: RgbImage,
}

impl MockFramebuffer {
    /// Black surface of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_color(width, height, [0, 0, 0])
    }

    pub fn with_color(width: u32, height: u32, color: [u8; 3]) -> Self {
        Self {
            image: RgbImage::from_pixel(width, height, Rgb(color)),
        }
    }

    /// A white viewport with `title` in a dark bar across the top
    pub fn page(width: u32, height: u32, title: &str) -> Self {
        let mut fb = Self::with_color(width, height, [255, 255, 255]);
        fb.fill_rect(0, 0, width, TITLE_BAR, [60, 60, 60]);
        fb.draw_text(4, (TITLE_BAR - GLYPH) / 2, title, [255, 255, 255], [60, 60, 60]);
        fb
    }

    /// Decode a previously captured PNG
    pub fn decode(png: &[u8]) -> SnapshotResult<Self> {
        let image = image::load_from_memory_with_format(png, ImageFormat::Png)?.to_rgb8();
        Ok(Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Fill a rectangle, clipped to the surface
    pub fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, color: [u8; 3]) {
        let right = x.saturating_add(width).min(self.width());
        let bottom = y.saturating_add(height).min(self.height());
        for py in y..bottom {
            for px in x..right {
                self.image.put_pixel(px, py, Rgb(color));
            }
        }
    }

    /// Draw a single line of 8x8 glyphs; characters past the right edge are dropped
    pub fn draw_text(&mut self, x: u32, y: u32, text: &str, fg: [u8; 3], bg: [u8; 3]) {
        let columns = (self.width().saturating_sub(x) / GLYPH) as usize;
        for (i, ch) in text.chars().take(columns).enumerate() {
            let glyph = BASIC_FONTS.get(ch).unwrap_or_default();
            let left = x + i as u32 * GLYPH;
            for (row, bits) in (0u32..).zip(glyph) {
                for col in 0..GLYPH {
                    // leftmost pixel is the low bit
                    let color = if (bits >> col) & 1 == 1 { fg } else { bg };
                    self.put(left + col, y + row, color);
                }
            }
        }
    }

    /// Pixel color, or `None` outside the surface
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        self.contains(x, y).then(|| self.image.get_pixel(x, y).0)
    }

    pub fn to_png(&self) -> SnapshotResult<Vec<u8>> {
        if self.width() == 0 || self.height() == 0 {
            return Err(SnapshotError::Encode("framebuffer has no pixels".into()));
        }
        let mut png = Vec::new();
        self.image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        Ok(png)
    }

    fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width() && y < self.height()
    }

    fn put(&mut self, x: u32, y: u32, color: [u8; 3]) {
        if self.contains(x, y) {
            self.image.put_pixel(x, y, Rgb(color));
        }
    }
}

impl Camera for MockFramebuffer {
    fn capture_image(&mut self) -> SnapshotResult<Vec<u8>> {
        self.to_png()
    }

    fn source_type(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 4] = [0x89, 0x50, 0x4E, 0x47];

    #[test]
    fn test_fill_rect_is_clipped() {
        let mut fb = MockFramebuffer::new(20, 20);
        fb.fill_rect(15, 15, 10, 10, [255, 0, 0]);
        assert_eq!(fb.pixel(14, 14), Some([0, 0, 0]));
        assert_eq!(fb.pixel(19, 19), Some([255, 0, 0]));
        assert_eq!(fb.pixel(20, 20), None);
    }

    #[test]
    fn test_page_draws_title_bar() {
        let fb = MockFramebuffer::page(120, 40, "Login");
        assert_eq!(fb.pixel(0, 0), Some([60, 60, 60]));
        assert_eq!(fb.pixel(60, 30), Some([255, 255, 255]));

        let has_glyph = (4..12).any(|y| (4..12).any(|x| fb.pixel(x, y) == Some([255, 255, 255])));
        assert!(has_glyph, "title text should be drawn in the bar");
    }

    #[test]
    fn test_capture_decodes_to_same_surface() {
        let mut fb = MockFramebuffer::with_color(50, 30, [128, 128, 128]);
        let png = fb.capture_image().unwrap();
        assert_eq!(&png[0..4], &PNG_MAGIC);

        let decoded = MockFramebuffer::decode(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (50, 30));
        assert_eq!(decoded.pixel(25, 15), Some([128, 128, 128]));
    }

    #[test]
    fn test_empty_surface_fails_to_encode() {
        assert!(MockFramebuffer::new(0, 0).to_png().is_err());
        assert!(MockFramebuffer::decode(b"not a png").is_err());
    }
}
