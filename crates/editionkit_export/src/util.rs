//! Stateless text helpers shared by the formatter and the render pipeline.

use std::sync::LazyLock;

use quick_xml::escape::{resolve_html5_entity, unescape_with};
use regex::Regex;

use crate::conf::C_IMAGE_TAG_MARKER;
use crate::spec::ExportError;

static RE_SCRIPT_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script[^>]*?>.*?</script>|<style[^>]*?>.*?</style>")
        .expect("static script/style pattern")
});
static RE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->|<[^>]*>").expect("static tag pattern"));
static RE_NOSCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<noscript[^>]*?>.*?</noscript>").expect("static noscript pattern")
});
static RE_ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#[0-9]+|#[xX][0-9A-Fa-f]+|[A-Za-z][A-Za-z0-9]*);")
        .expect("static entity pattern")
});

////////////////////////////////////////////////////////////////////////////////
// #region BlockExclusion

/// Compile one removal pattern per excluded block type.
///
/// A span runs from `<!-- {prefix}:{block} ...-->` to the nearest
/// `<!-- /{prefix}:{block} -->`, across newlines.
pub fn compile_block_patterns(
    prefix: &str,
    blocks: &[String],
) -> Result<Vec<Regex>, ExportError> {
    blocks
        .iter()
        .map(|c_block| {
            let c_marker = format!("{}:{}", regex::escape(prefix), regex::escape(c_block));
            let c_pattern = format!(r"(?s)<!-- {c_marker} [^>]*-->.*?<!-- /{c_marker} -->");
            Regex::new(&c_pattern).map_err(|err| ExportError::InvalidPattern {
                block: c_block.clone(),
                message: err.to_string(),
            })
        })
        .collect()
}

/// Remove every span matched by `patterns`, applied in order.
pub fn exclude_blocks(content: &str, patterns: &[Regex]) -> String {
    let mut c_content = content.to_string();
    for pattern in patterns {
        c_content = pattern.replace_all(&c_content, "").into_owned();
    }
    c_content
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region MarkupNormalization

/// Drop `script`/`style` elements with their contents, then all remaining
/// tags and comments, then trim.
pub fn strip_all_tags(html: &str) -> String {
    let c_text = RE_SCRIPT_STYLE.replace_all(html, "");
    let c_text = RE_TAG.replace_all(&c_text, "");
    c_text.trim().to_string()
}

/// Decode named and numeric HTML entities. Unknown entities are kept verbatim.
pub fn unescape_html_entities(text: &str) -> String {
    RE_ENTITY
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let c_entity = &caps[0];
            unescape_with(c_entity, resolve_html5_entity)
                .map(|c_val| c_val.into_owned())
                .unwrap_or_else(|_| c_entity.to_string())
        })
        .into_owned()
}

/// Remove carriage returns and line feeds.
pub fn remove_line_breaks(text: &str) -> String {
    text.replace(['\r', '\n'], "")
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ImageCounting

/// Remove `<noscript>` spans (lazy-load fallbacks duplicate images).
pub fn remove_noscript(html: &str) -> String {
    RE_NOSCRIPT.replace_all(html, "").into_owned()
}

/// Count image tag markers in rendered HTML.
pub fn count_image_markers(html: &str) -> usize {
    html.matches(C_IMAGE_TAG_MARKER).count()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
