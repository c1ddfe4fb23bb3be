//! Viewport and content measurement.
//!
//! The controller positions the overlay content box in the middle of the
//! viewport each time the overlay is shown. Where the numbers come from is
//! decided at composition time by choosing a [`MeasurementProvider`]:
//!
//! - [`FixedMeasurement`] - values supplied by the host, updatable on resize
//! - [`StyleMeasurement`] - content box read from computed style strings
//!
//! # Viewport fallback
//!
//! Hosts do not always expose a window-level size. [`ViewportMetrics`]
//! carries every candidate and [`ViewportMetrics::resolve`] picks one:
//!
//! ```text
//! window size (if reported) ──► document element client size (if width != 0) ──► body client size
//! ```

mod style;

use parking_lot::RwLock;
use serde::Serialize;

pub use style::{parse_css_pixels, StyleMeasurement, StyleSource};

/// Width and height in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// True when both dimensions are zero.
    pub fn is_zero(&self) -> bool {
        self.width == 0.0 && self.height == 0.0
    }
}

/// Top-left corner of the overlay content box, relative to the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Position {
    pub top: f64,
    pub left: f64,
}

impl Position {
    pub fn new(top: f64, left: f64) -> Self {
        Self { top, left }
    }

    /// Position that centers `content` inside `viewport`.
    ///
    /// Content larger than the viewport yields negative offsets; the box is
    /// still centered, it just overflows on both sides.
    ///
    /// ```
    /// use busy_overlay::measure::{Position, Size};
    ///
    /// let pos = Position::centered(Size::new(1280.0, 720.0), Size::new(320.0, 240.0));
    /// assert_eq!(pos, Position::new(240.0, 480.0));
    /// ```
    pub fn centered(viewport: Size, content: Size) -> Self {
        Self {
            top: viewport.height / 2.0 - content.height / 2.0,
            left: viewport.width / 2.0 - content.width / 2.0,
        }
    }
}

/// Every viewport size candidate a host can report.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportMetrics {
    /// Window inner size. `None` (or zero width) when the host has no window metric.
    pub window: Option<Size>,
    /// Client size of the root document element.
    pub document_element: Size,
    /// Client size of the body element.
    pub body: Size,
}

impl ViewportMetrics {
    /// Metrics for a host that reports a window size.
    pub fn window(size: Size) -> Self {
        Self {
            window: Some(size),
            ..Self::default()
        }
    }

    /// Pick the viewport size using the fallback chain.
    pub fn resolve(&self) -> Size {
        match self.window {
            Some(window) if window.width != 0.0 => window,
            _ if self.document_element.width != 0.0 => self.document_element,
            _ => self.body,
        }
    }
}

/// Source of the sizes needed to center the overlay.
pub trait MeasurementProvider: Send + Sync {
    /// Current viewport size.
    fn viewport(&self) -> Size;

    /// Current size of the overlay content box.
    fn content_box(&self) -> Size;
}

/// Default window size used when the host reports nothing better.
pub const DEFAULT_VIEWPORT: Size = Size {
    width: 1280.0,
    height: 720.0,
};

/// Default content box: 20em x 15em at a 16px root font size.
pub const DEFAULT_CONTENT_BOX: Size = Size {
    width: 320.0,
    height: 240.0,
};

/// Measurement from host-supplied values.
///
/// Hosts push new values on resize with [`set_viewport`](Self::set_viewport)
/// and [`set_content_box`](Self::set_content_box); the next show picks them up.
#[derive(Debug)]
pub struct FixedMeasurement {
    viewport: RwLock<ViewportMetrics>,
    content: RwLock<Size>,
}

impl FixedMeasurement {
    pub fn new(viewport: ViewportMetrics, content: Size) -> Self {
        Self {
            viewport: RwLock::new(viewport),
            content: RwLock::new(content),
        }
    }

    pub fn set_viewport(&self, viewport: ViewportMetrics) {
        *self.viewport.write() = viewport;
    }

    pub fn set_content_box(&self, content: Size) {
        *self.content.write() = content;
    }
}

impl Default for FixedMeasurement {
    fn default() -> Self {
        Self::new(ViewportMetrics::window(DEFAULT_VIEWPORT), DEFAULT_CONTENT_BOX)
    }
}

impl MeasurementProvider for FixedMeasurement {
    fn viewport(&self) -> Size {
        self.viewport.read().resolve()
    }

    fn content_box(&self) -> Size {
        *self.content.read()
    }
}
