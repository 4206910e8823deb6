//! Seam to the host's content rendering pipeline.

use crate::util::{strip_all_tags, unescape_html_entities};

/// Site-wide content transformations applied before text normalization.
///
/// Only [`RenderPipeline::render`] is host-specific; tag stripping and entity
/// decoding default to the built-in helpers.
pub trait RenderPipeline {
    /// Apply site content filters/shortcodes to raw text, producing HTML.
    fn render(&self, raw_text: &str) -> String;

    /// Reduce HTML to plain text.
    fn strip_tags(&self, html_text: &str) -> String {
        strip_all_tags(html_text)
    }

    /// Decode HTML entities.
    fn unescape_entities(&self, text: &str) -> String {
        unescape_html_entities(text)
    }
}

/// Renderer that returns raw text unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughRenderer;

impl RenderPipeline for PassthroughRenderer {
    fn render(&self, raw_text: &str) -> String {
        raw_text.to_string()
    }
}

impl<R: RenderPipeline + ?Sized> RenderPipeline for &R {
    fn render(&self, raw_text: &str) -> String {
        (**self).render(raw_text)
    }

    fn strip_tags(&self, html_text: &str) -> String {
        (**self).strip_tags(html_text)
    }

    fn unescape_entities(&self, text: &str) -> String {
        (**self).unescape_entities(text)
    }
}
