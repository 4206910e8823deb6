//! Content item to edition protocol record formatting.

use chrono::Datelike;
use regex::Regex;

use crate::conf::{C_ROW_PLACEHOLDER, N_IMAGE_LENGTH_WEIGHT};
use crate::render::RenderPipeline;
use crate::spec::{
    ContentItem, EnumExportField, EnumRecordValue, ExportError, ExportRecord, SpecContentOptions,
    SpecSiteContext,
};
use crate::util::{
    compile_block_patterns, count_image_markers, exclude_blocks, remove_line_breaks,
    remove_noscript,
};

/// Builds one [`ExportRecord`] per content item.
///
/// `format` is pure: the same item always yields the same record, and every
/// derivation falls back to empty text or zero instead of failing.
pub struct RecordFormatter<R: RenderPipeline> {
    renderer: R,
    site: SpecSiteContext,
    content_options: SpecContentOptions,
    l_block_patterns: Vec<Regex>,
}

impl<R: RenderPipeline> RecordFormatter<R> {
    /// Create a formatter; compiles the excluded block patterns up front.
    pub fn new(
        renderer: R,
        site: SpecSiteContext,
        content_options: SpecContentOptions,
    ) -> Result<Self, ExportError> {
        let l_block_patterns = if content_options.if_exclude_blocks {
            compile_block_patterns(
                &content_options.block_marker_prefix,
                &content_options.excluded_blocks,
            )?
        } else {
            vec![]
        };
        Ok(Self {
            renderer,
            site,
            content_options,
            l_block_patterns,
        })
    }

    /// Content options in effect.
    pub fn content_options(&self) -> &SpecContentOptions {
        &self.content_options
    }

    /// Format `item` into a record whose formula cells still carry the row
    /// placeholder.
    pub fn format(&self, item: &ContentItem) -> ExportRecord {
        ExportRecord::from_values([
            EnumRecordValue::Text(derive_issue_number(item)),
            EnumRecordValue::Text(derive_issue_year(item)),
            EnumRecordValue::Integer(1),
            EnumRecordValue::Text(self.derive_content(item)),
            EnumRecordValue::Text(item.permalink.clone()),
            EnumRecordValue::Text(self.renderer.strip_tags(&item.title)),
            EnumRecordValue::Text(derive_pub_date(item)),
            EnumRecordValue::Text(self.site.site_name.clone()),
            EnumRecordValue::Formula(derive_length_formula()),
            EnumRecordValue::Integer(self.derive_image_count(item) as i64),
            EnumRecordValue::Formula(derive_images_length_formula()),
            EnumRecordValue::Formula(derive_total_length_formula()),
            EnumRecordValue::Text(String::new()),
            EnumRecordValue::Integer(1),
        ])
    }

    fn derive_content(&self, item: &ContentItem) -> String {
        let c_content: String = self
            .content_options
            .sources
            .iter()
            .map(|source| source.resolve(item))
            .collect();
        let c_content = exclude_blocks(&c_content, &self.l_block_patterns);
        let c_rendered = self.renderer.render(&c_content);
        let c_decoded = self.renderer.unescape_entities(&c_rendered);
        let c_plain = self.renderer.strip_tags(&c_decoded);
        remove_line_breaks(&c_plain)
    }

    fn derive_image_count(&self, item: &ContentItem) -> usize {
        let c_rendered = remove_noscript(&self.renderer.render(&item.body));
        count_image_markers(&c_rendered) + usize::from(item.has_featured_image)
    }
}

/// ISO week number, two digits.
fn derive_issue_number(item: &ContentItem) -> String {
    item.published_at
        .map(|dt| format!("{:02}", dt.iso_week().week()))
        .unwrap_or_default()
}

/// Calendar year of the publish date. Not the ISO week-year: on Dec 29-31 the
/// issue number may already be week 01 of the next year.
fn derive_issue_year(item: &ContentItem) -> String {
    item.published_at
        .map(|dt| dt.format("%Y").to_string())
        .unwrap_or_default()
}

fn derive_pub_date(item: &ContentItem) -> String {
    item.published_at
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn derive_length_formula() -> String {
    format!(
        "=LEN({}{C_ROW_PLACEHOLDER})",
        EnumExportField::Content.column_letter()
    )
}

fn derive_images_length_formula() -> String {
    format!(
        "=SUM({}{C_ROW_PLACEHOLDER}*{N_IMAGE_LENGTH_WEIGHT})",
        EnumExportField::Images.column_letter()
    )
}

fn derive_total_length_formula() -> String {
    format!(
        "=SUM({}{C_ROW_PLACEHOLDER}+{}{C_ROW_PLACEHOLDER})",
        EnumExportField::Length.column_letter(),
        EnumExportField::ImagesLength.column_letter()
    )
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::render::PassthroughRenderer;
    use crate::spec::{EnumContentField, EnumContentSource};

    fn build_formatter(
        content_options: SpecContentOptions,
    ) -> RecordFormatter<PassthroughRenderer> {
        RecordFormatter::new(
            PassthroughRenderer,
            SpecSiteContext {
                site_name: "Acme News".to_string(),
            },
            content_options,
        )
        .unwrap()
    }

    fn build_item(y: i32, m: u32, d: u32) -> ContentItem {
        ContentItem {
            id: 1,
            published_at: NaiveDate::from_ymd_opt(y, m, d).and_then(|dt| dt.and_hms_opt(9, 30, 0)),
            title: "Spring Launch".to_string(),
            body: "<p>Hello</p>".to_string(),
            permalink: "https://acme.example/spring-launch".to_string(),
            ..Default::default()
        }
    }

    fn text(c_val: &str) -> EnumRecordValue {
        EnumRecordValue::Text(c_val.to_string())
    }

    #[test]
    fn format_matches_edition_protocol_example() {
        let formatter = build_formatter(SpecContentOptions::default());
        let record = formatter.format(&build_item(2024, 3, 4));

        let expected = ExportRecord::from_values([
            text("10"),
            text("2024"),
            EnumRecordValue::Integer(1),
            text("Hello"),
            text("https://acme.example/spring-launch"),
            text("Spring Launch"),
            text("2024-03-04"),
            text("Acme News"),
            EnumRecordValue::Formula("=LEN(D%index%)".to_string()),
            EnumRecordValue::Integer(0),
            EnumRecordValue::Formula("=SUM(J%index%*300)".to_string()),
            EnumRecordValue::Formula("=SUM(I%index%+K%index%)".to_string()),
            text(""),
            EnumRecordValue::Integer(1),
        ]);
        assert_eq!(record, expected);
    }

    #[test]
    fn issue_number_is_zero_padded_iso_week() {
        let formatter = build_formatter(SpecContentOptions::default());
        let record = formatter.format(&build_item(2024, 1, 3));
        assert_eq!(record.get(EnumExportField::IssueNumber), &text("01"));
    }

    #[test]
    fn issue_year_keeps_calendar_year_at_iso_boundary() {
        let formatter = build_formatter(SpecContentOptions::default());
        // 2024-12-30 is in ISO week 1 of 2025.
        let record = formatter.format(&build_item(2024, 12, 30));
        assert_eq!(record.get(EnumExportField::IssueNumber), &text("01"));
        assert_eq!(record.get(EnumExportField::IssueYear), &text("2024"));
    }

    #[test]
    fn missing_publish_date_degrades_to_empty_text() {
        let formatter = build_formatter(SpecContentOptions::default());
        let item = ContentItem {
            published_at: None,
            ..build_item(2024, 3, 4)
        };
        let record = formatter.format(&item);
        assert_eq!(record.get(EnumExportField::IssueNumber), &text(""));
        assert_eq!(record.get(EnumExportField::IssueYear), &text(""));
        assert_eq!(record.get(EnumExportField::PubDate), &text(""));
    }

    #[test]
    fn content_is_excluded_decoded_stripped_and_flattened() {
        let formatter = build_formatter(SpecContentOptions::default());
        let item = ContentItem {
            body: concat!(
                "<p>Fish &amp; chips</p>\n",
                "<!-- wp:lo/link-list-block {\"a\":1} --><ul><li>Link</li></ul>",
                "<!-- /wp:lo/link-list-block -->\r\n<p>&lt;b&gt;Bold&lt;/b&gt;</p>"
            )
            .to_string(),
            ..build_item(2024, 3, 4)
        };
        let record = formatter.format(&item);
        assert_eq!(record.get(EnumExportField::Content), &text("Fish & chipsBold"));
    }

    #[test]
    fn excerpt_body_variant_prepends_excerpt_without_exclusion() {
        let formatter = build_formatter(SpecContentOptions::excerpt_body());
        let item = ContentItem {
            excerpt: "Lead. ".to_string(),
            body: "<!-- wp:lo/link-list-block -->Kept<!-- /wp:lo/link-list-block -->".to_string(),
            ..build_item(2024, 3, 4)
        };
        let record = formatter.format(&item);
        assert_eq!(record.get(EnumExportField::Content), &text("Lead. Kept"));
    }

    #[test]
    fn configured_sources_include_meta_and_terms() {
        let formatter = build_formatter(SpecContentOptions {
            sources: vec![
                EnumContentSource::Meta("kicker".to_string()),
                EnumContentSource::Field(EnumContentField::Body),
                EnumContentSource::Taxonomy("category".to_string()),
            ],
            ..Default::default()
        });
        let mut item = build_item(2024, 3, 4);
        item.meta.insert("kicker".to_string(), "Breaking: ".to_string());
        item.terms
            .insert("category".to_string(), vec![" News".to_string()]);
        let record = formatter.format(&item);
        assert_eq!(
            record.get(EnumExportField::Content),
            &text("Breaking: Hello News")
        );
    }

    #[test]
    fn image_count_adds_featured_image() {
        let formatter = build_formatter(SpecContentOptions::default());
        let mut item = ContentItem {
            body: "<img src=1><img src=2><noscript><img src=2></noscript><img src=3>".to_string(),
            ..build_item(2024, 3, 4)
        };
        item.has_featured_image = true;
        assert_eq!(
            formatter.format(&item).get(EnumExportField::Images),
            &EnumRecordValue::Integer(4)
        );
        item.has_featured_image = false;
        assert_eq!(
            formatter.format(&item).get(EnumExportField::Images),
            &EnumRecordValue::Integer(3)
        );
    }

    #[test]
    fn title_markup_is_stripped() {
        let formatter = build_formatter(SpecContentOptions::default());
        let item = ContentItem {
            title: "<em>Spring</em> Launch".to_string(),
            ..build_item(2024, 3, 4)
        };
        assert_eq!(
            formatter.format(&item).get(EnumExportField::ObjectTitle),
            &text("Spring Launch")
        );
    }

    #[test]
    fn format_is_idempotent() {
        let formatter = build_formatter(SpecContentOptions::default());
        let item = build_item(2024, 3, 4);
        assert_eq!(formatter.format(&item), formatter.format(&item));
    }
}
