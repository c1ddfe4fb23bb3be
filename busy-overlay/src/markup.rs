//! Overlay markup generation.
//!
//! Produces the style block and container elements a host page inserts to
//! draw the overlay. The controller never reads this; it is cosmetic.

use std::fmt::Write;

use crate::config::OverlayConfig;

/// Id of the outer container element.
pub const CONTAINER_ID: &str = "busy-overlay-container";

/// Id of the content box the controller positions.
pub const CONTENT_ID: &str = "busy-overlay-content";

const STYLE: &str = "\
.busy-overlay-background {
  top: 0px;
  left: 0px;
  position: absolute;
  z-index: 10000;
  height: 100%;
  width: 100%;
  background-color: #808080;
  opacity: 0.7;
}
.busy-overlay-content {
  position: absolute;
  font-weight: bold;
  height: 15em;
  width: 20em;
  z-index: 10000;
  text-align: center;
}
";

/// Markup for one overlay instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayMarkup {
    animation: Option<String>,
    content_html: String,
}

impl OverlayMarkup {
    pub fn new(animation: Option<String>, content_html: impl Into<String>) -> Self {
        Self {
            animation,
            content_html: content_html.into(),
        }
    }

    /// Markup using the animation class from `config`.
    pub fn from_config(config: &OverlayConfig, content_html: impl Into<String>) -> Self {
        Self::new(config.animation.clone(), content_html)
    }

    /// The `<style>` block.
    pub fn style(&self) -> String {
        format!("<style>\n{STYLE}</style>")
    }

    /// Container, background and content elements.
    ///
    /// The content HTML is inserted as-is; the animation class is escaped.
    pub fn container(&self) -> String {
        let mut out = String::new();
        let _ = write!(out, "<div id=\"{CONTAINER_ID}\"");
        if let Some(class) = self.animation.as_deref().filter(|c| !c.trim().is_empty()) {
            let _ = write!(out, " class=\"{}\"", escape_attribute(class.trim()));
        }
        out.push_str(" hidden>\n");
        out.push_str("  <div class=\"busy-overlay-background\">\n");
        let _ = writeln!(
            out,
            "    <div id=\"{CONTENT_ID}\" class=\"busy-overlay-content\">{}</div>",
            self.content_html
        );
        out.push_str("  </div>\n");
        out.push_str("</div>");
        out
    }

    /// Style block followed by the container.
    pub fn render(&self) -> String {
        format!("{}\n{}\n", self.style(), self.container())
    }
}

/// Escape a value for use inside a double-quoted HTML attribute.
pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
