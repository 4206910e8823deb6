//! Edition protocol constants and default preset factories.

use editionkit_io_xlsx::conf::derive_default_xlsx_write_options;

use crate::spec::{EnumContentField, EnumContentSource, SpecContentOptions, SpecExportOptions};

/// Row placeholder emitted in formula templates; replaced by the 1-based row
/// number when a record is placed on the sheet.
pub const C_ROW_PLACEHOLDER: &str = "%index%";
/// Column names of the edition protocol, in column order (`A..N`).
pub const TUP_EXPORT_FIELD_NAMES: [&str; 14] = [
    "IssueNumber",
    "IssueYear",
    "Uniqueness",
    "Content",
    "URL",
    "ObjectTitle",
    "PubDate",
    "MediaCopyright",
    "Length",
    "Images",
    "ImagesLength",
    "TotalLength",
    "License",
    "IsEditorial",
];
/// Number of columns per record.
pub const N_EXPORT_FIELDS: usize = TUP_EXPORT_FIELD_NAMES.len();
/// Character weight of one image in the `ImagesLength` formula.
pub const N_IMAGE_LENGTH_WEIGHT: u32 = 300;
/// Marker counted as one embedded image in rendered content.
pub const C_IMAGE_TAG_MARKER: &str = "<img";

/// Default block-comment namespace (`<!-- wp:name -->`).
pub const C_BLOCK_MARKER_PREFIX_DEFAULT: &str = "wp";
/// Block types excluded from content by default.
pub const TUP_EXCLUDED_BLOCKS_DEFAULT: [&str; 1] = ["lo/link-list-block"];

/// Upload subdirectory holding generated artifacts.
pub const C_ARTIFACT_SUBDIR: &str = "export-edition-protocol";
/// Extension of primary-mode artifacts.
pub const C_ARTIFACT_EXTENSION: &str = "xlsx";
/// Extension of protocol-mode downloads (bytes are still XLSX).
pub const C_PROTOCOL_EXTENSION: &str = "csv";

/// ISO week opening an export period.
pub const N_PERIOD_WEEK_FIRST: u32 = 1;
/// ISO week closing an export period.
pub const N_PERIOD_WEEK_LAST: u32 = 52;

/// Content options for the full pipeline: body only, with block exclusion.
pub fn derive_full_pipeline_content_options() -> SpecContentOptions {
    SpecContentOptions {
        sources: vec![EnumContentSource::Field(EnumContentField::Body)],
        if_exclude_blocks: true,
        excluded_blocks: TUP_EXCLUDED_BLOCKS_DEFAULT
            .iter()
            .map(ToString::to_string)
            .collect(),
        block_marker_prefix: C_BLOCK_MARKER_PREFIX_DEFAULT.to_string(),
    }
}

/// Content options for the excerpt variant: excerpt + body, no block exclusion.
pub fn derive_excerpt_body_content_options() -> SpecContentOptions {
    SpecContentOptions {
        sources: vec![
            EnumContentSource::Field(EnumContentField::Excerpt),
            EnumContentSource::Field(EnumContentField::Body),
        ],
        if_exclude_blocks: false,
        ..derive_full_pipeline_content_options()
    }
}

/// Build default export options: full content pipeline, default workbook layout.
pub fn derive_default_export_options() -> SpecExportOptions {
    SpecExportOptions {
        content: derive_full_pipeline_content_options(),
        xlsx: derive_default_xlsx_write_options(),
    }
}
