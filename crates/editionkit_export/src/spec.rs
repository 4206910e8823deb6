//! Edition protocol models, options and top-level error types.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use editionkit_io_xlsx::{EnumCellValue, SpecXlsxWriteOptions, XlsxWriteError, derive_column_letter};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conf::{C_ROW_PLACEHOLDER, N_EXPORT_FIELDS, TUP_EXPORT_FIELD_NAMES};

////////////////////////////////////////////////////////////////////////////////
// #region ContentItem

/// Publication state of a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumContentStatus {
    /// Publicly visible; eligible for export.
    #[default]
    Publish,
    /// Not yet published.
    Draft,
}

/// One article as supplied by the content store. Read-only to the exporter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentItem {
    /// Store identifier.
    pub id: u64,
    /// Publication state.
    pub status: EnumContentStatus,
    /// Publish timestamp (site-local).
    pub published_at: Option<NaiveDateTime>,
    /// Title, may contain markup.
    pub title: String,
    /// Raw body, may contain markup and block comments.
    pub body: String,
    /// Excerpt text.
    pub excerpt: String,
    /// Canonical permalink.
    pub permalink: String,
    /// Whether the item has a featured image.
    pub has_featured_image: bool,
    /// Free-form meta fields.
    pub meta: BTreeMap<String, String>,
    /// Taxonomy name to assigned term names.
    pub terms: BTreeMap<String, Vec<String>>,
}

impl ContentItem {
    /// Whether the item is published and dated.
    pub fn is_exportable(&self) -> bool {
        self.status == EnumContentStatus::Publish && self.published_at.is_some()
    }
}

/// Site-wide values shared by every record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecSiteContext {
    /// Site display name, used as media copyright.
    pub site_name: String,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ContentOptions

/// Item field usable as a content source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumContentField {
    /// Raw body.
    Body,
    /// Excerpt.
    Excerpt,
    /// Title.
    Title,
}

/// One piece concatenated into the `Content` column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumContentSource {
    /// A built-in item field.
    Field(EnumContentField),
    /// A meta value by key; missing keys contribute nothing.
    Meta(String),
    /// Term names of a taxonomy, concatenated without separator.
    Taxonomy(String),
}

impl EnumContentSource {
    /// Resolve this source against `item`.
    pub fn resolve(&self, item: &ContentItem) -> String {
        match self {
            Self::Field(EnumContentField::Body) => item.body.clone(),
            Self::Field(EnumContentField::Excerpt) => item.excerpt.clone(),
            Self::Field(EnumContentField::Title) => item.title.clone(),
            Self::Meta(key) => item.meta.get(key).cloned().unwrap_or_default(),
            Self::Taxonomy(key) => item
                .terms
                .get(key)
                .map(|l_terms| l_terms.concat())
                .unwrap_or_default(),
        }
    }
}

/// How the `Content` column is derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecContentOptions {
    /// Sources concatenated in order before normalization.
    pub sources: Vec<EnumContentSource>,
    /// Remove excluded block spans before rendering.
    pub if_exclude_blocks: bool,
    /// Block type names whose spans are removed.
    pub excluded_blocks: Vec<String>,
    /// Namespace in block comments, e.g. `wp` in `<!-- wp:image -->`.
    pub block_marker_prefix: String,
}

impl Default for SpecContentOptions {
    fn default() -> Self {
        crate::conf::derive_full_pipeline_content_options()
    }
}

impl SpecContentOptions {
    /// Body only, with block exclusion.
    pub fn full_pipeline() -> Self {
        crate::conf::derive_full_pipeline_content_options()
    }

    /// Excerpt followed by body, without block exclusion.
    pub fn excerpt_body() -> Self {
        crate::conf::derive_excerpt_body_content_options()
    }
}

/// Top-level export configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecExportOptions {
    /// Content column derivation.
    pub content: SpecContentOptions,
    /// Workbook output options.
    pub xlsx: SpecXlsxWriteOptions,
}

impl Default for SpecExportOptions {
    fn default() -> Self {
        crate::conf::derive_default_export_options()
    }
}

impl SpecExportOptions {
    /// Parse options from JSON; absent keys keep their defaults.
    pub fn from_json(c_json: &str) -> Result<Self, ExportError> {
        Ok(serde_json::from_str(c_json)?)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ExportRecord

/// Edition protocol columns in sheet order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EnumExportField {
    IssueNumber,
    IssueYear,
    Uniqueness,
    Content,
    Url,
    ObjectTitle,
    PubDate,
    MediaCopyright,
    Length,
    Images,
    ImagesLength,
    TotalLength,
    License,
    IsEditorial,
}

impl EnumExportField {
    /// All fields in column order.
    pub const ALL: [EnumExportField; N_EXPORT_FIELDS] = [
        Self::IssueNumber,
        Self::IssueYear,
        Self::Uniqueness,
        Self::Content,
        Self::Url,
        Self::ObjectTitle,
        Self::PubDate,
        Self::MediaCopyright,
        Self::Length,
        Self::Images,
        Self::ImagesLength,
        Self::TotalLength,
        Self::License,
        Self::IsEditorial,
    ];

    /// Zero-based position in the record.
    pub fn index(self) -> usize {
        self as usize
    }

    /// 1-based sheet column.
    pub fn column(self) -> usize {
        self.index() + 1
    }

    /// Sheet column letter (`Content` is `D`).
    pub fn column_letter(self) -> String {
        derive_column_letter(self.column())
    }

    /// Header text.
    pub fn name(self) -> &'static str {
        TUP_EXPORT_FIELD_NAMES[self.index()]
    }
}

/// One record cell before row placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumRecordValue {
    /// Literal text.
    Text(String),
    /// Literal integer.
    Integer(i64),
    /// Formula template; may contain the row placeholder.
    Formula(String),
}

impl EnumRecordValue {
    /// Resolve the row placeholder and convert to a sheet cell.
    ///
    /// Text is substituted as well as formulas; integers pass through.
    pub fn resolve_row(&self, n_row: usize) -> EnumCellValue {
        let c_row = n_row.to_string();
        match self {
            Self::Text(val) => EnumCellValue::String(val.replace(C_ROW_PLACEHOLDER, &c_row)),
            Self::Integer(val) => EnumCellValue::Number(*val as f64),
            Self::Formula(val) => EnumCellValue::Formula(val.replace(C_ROW_PLACEHOLDER, &c_row)),
        }
    }

    /// Text payload of text/formula values.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(val) | Self::Formula(val) => Some(val),
            Self::Integer(_) => None,
        }
    }
}

/// One formatted row: a fixed ordered mapping of [`EnumExportField`] to value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    values: [EnumRecordValue; N_EXPORT_FIELDS],
}

impl ExportRecord {
    /// Build a record from values in column order.
    pub fn from_values(values: [EnumRecordValue; N_EXPORT_FIELDS]) -> Self {
        Self { values }
    }

    /// Value of `field`.
    pub fn get(&self, field: EnumExportField) -> &EnumRecordValue {
        &self.values[field.index()]
    }

    /// `(field, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (EnumExportField, &EnumRecordValue)> {
        EnumExportField::ALL.into_iter().zip(self.values.iter())
    }

    /// Sheet cells for this record placed at 1-based `n_row`.
    pub fn to_row(&self, n_row: usize) -> Vec<EnumCellValue> {
        self.values.iter().map(|val| val.resolve_row(n_row)).collect()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Artifacts

/// Where a stored artifact lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecArtifactLocation {
    /// Filesystem path.
    pub path: PathBuf,
    /// Public download URL.
    pub url: String,
}

/// Output of one completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecExportArtifact {
    /// Period year the artifact covers.
    pub year: i32,
    /// Storage location.
    pub location: SpecArtifactLocation,
    /// Serialized size in bytes.
    pub n_bytes: usize,
    /// Sheet rows, header included.
    pub n_rows: usize,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Errors that abort an export run.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Sheet building or serialization failed.
    #[error(transparent)]
    Xlsx(#[from] XlsxWriteError),
    /// Artifact storage IO failed.
    #[error("storage error at {path:?}: {source}")]
    Io {
        /// Path being written or deleted.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// JSON (de)serialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// A configured excluded block name produced an invalid pattern.
    #[error("invalid block pattern for {block:?}: {message}")]
    InvalidPattern {
        /// Block type name.
        block: String,
        /// Regex compile error text.
        message: String,
    },
    /// Year has no representable ISO week bounds.
    #[error("invalid export period year: {0}")]
    InvalidPeriod(i32),
    /// Content store lookup failed.
    #[error("content store error: {0}")]
    ContentStore(String),
    /// The run was cancelled or superseded by a newer request.
    #[error("export run for {year} was cancelled or superseded")]
    RunConflict {
        /// Period year.
        year: i32,
    },
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
