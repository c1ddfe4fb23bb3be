//! Measurement backed by computed style strings.
//!
//! Hosts that can only report the content element's computed `width` and
//! `height` as CSS strings (`"320px"`) implement [`StyleSource`]. The values
//! are read with integer semantics: the leading whole number is taken and
//! everything after it, unit included, is ignored.

use super::{MeasurementProvider, Size, ViewportMetrics};

/// Host access to viewport metrics and the content element's computed style.
pub trait StyleSource: Send + Sync {
    /// Viewport size candidates.
    fn viewport_metrics(&self) -> ViewportMetrics;

    /// Computed value of a CSS property on the overlay content element.
    fn computed_style(&self, property: &str) -> Option<String>;
}

/// Parse the leading integer of a CSS length such as `"240px"`.
///
/// Fractions are truncated (`"12.9px"` is 12). Returns `None` when the value
/// does not start with a number, e.g. `"auto"`.
///
/// ```
/// use busy_overlay::measure::parse_css_pixels;
///
/// assert_eq!(parse_css_pixels("240px"), Some(240.0));
/// assert_eq!(parse_css_pixels(" -8px"), Some(-8.0));
/// assert_eq!(parse_css_pixels("auto"), None);
/// ```
pub fn parse_css_pixels(value: &str) -> Option<f64> {
    let trimmed = value.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    let magnitude: f64 = digits[..end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// [`MeasurementProvider`] that reads the content box from computed style.
#[derive(Debug)]
pub struct StyleMeasurement<S> {
    source: S,
}

impl<S: StyleSource> StyleMeasurement<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    fn dimension(&self, property: &str) -> f64 {
        let raw = self.source.computed_style(property);
        match raw.as_deref().and_then(parse_css_pixels) {
            Some(px) => px,
            None => {
                tracing::debug!(property, value = ?raw, "Unmeasurable content dimension, using 0");
                0.0
            }
        }
    }
}

impl<S: StyleSource> MeasurementProvider for StyleMeasurement<S> {
    fn viewport(&self) -> Size {
        self.source.viewport_metrics().resolve()
    }

    fn content_box(&self) -> Size {
        Size::new(self.dimension("width"), self.dimension("height"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct StubStyle {
        metrics: ViewportMetrics,
        styles: HashMap<&'static str, &'static str>,
    }

    impl StyleSource for StubStyle {
        fn viewport_metrics(&self) -> ViewportMetrics {
            self.metrics
        }

        fn computed_style(&self, property: &str) -> Option<String> {
            self.styles.get(property).map(|v| v.to_string())
        }
    }

    #[test]
    fn test_parse_css_pixels() {
        assert_eq!(parse_css_pixels("320px"), Some(320.0));
        assert_eq!(parse_css_pixels("320"), Some(320.0));
        assert_eq!(parse_css_pixels("12.9px"), Some(12.0));
        assert_eq!(parse_css_pixels("  7px"), Some(7.0));
        assert_eq!(parse_css_pixels("+5px"), Some(5.0));
        assert_eq!(parse_css_pixels(""), None);
        assert_eq!(parse_css_pixels("px"), None);
        assert_eq!(parse_css_pixels("-"), None);
    }

    #[test]
    fn test_content_box_from_computed_style() {
        let source = StubStyle {
            metrics: ViewportMetrics::window(Size::new(800.0, 600.0)),
            styles: HashMap::from([("width", "320px"), ("height", "240px")]),
        };
        let measurement = StyleMeasurement::new(source);

        assert_eq!(measurement.viewport(), Size::new(800.0, 600.0));
        assert_eq!(measurement.content_box(), Size::new(320.0, 240.0));
    }

    #[test]
    fn test_unmeasurable_dimension_is_zero() {
        let source = StubStyle {
            metrics: ViewportMetrics {
                window: None,
                document_element: Size::default(),
                body: Size::new(500.0, 400.0),
            },
            styles: HashMap::from([("width", "auto")]),
        };
        let measurement = StyleMeasurement::new(source);

        assert_eq!(measurement.viewport(), Size::new(500.0, 400.0));
        assert_eq!(measurement.content_box(), Size::default());
    }
}
