//! Shared XLSX specification models.

use rust_xlsxwriter::XlsxError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conf::{C_SHEET_NAME_DEFAULT, EnumFmtKey, derive_default_xlsx_formats};

////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Cell format specification applied through `rust_xlsxwriter::Format`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,
    /// Italic style.
    pub italic: Option<bool>,

    /// Horizontal alignment.
    pub align: Option<String>,
    /// Vertical alignment.
    pub valign: Option<String>,
    /// Text wrap.
    pub text_wrap: Option<bool>,

    /// Number format code.
    pub num_format: Option<String>,
    /// Background fill color.
    pub bg_color: Option<String>,
    /// Font color.
    pub font_color: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            text_wrap: other.text_wrap.or(self.text_wrap),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
            font_color: other.font_color.clone().or_else(|| self.font_color.clone()),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellAndGrid

/// Normalized cell value written to the worksheet.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCellValue {
    /// Missing/blank value.
    None,
    /// Text value.
    String(String),
    /// Numeric value.
    Number(f64),
    /// Formula text (with or without the leading `=`), evaluated by the
    /// spreadsheet application on open.
    Formula(String),
}

impl EnumCellValue {
    /// Text content for string/formula cells.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::String(val) | Self::Formula(val) => Some(val),
            Self::None | Self::Number(_) => None,
        }
    }
}

/// Flat single-sheet grid. Row 1 is the header; every row has header width.
///
/// Public addressing is 1-based (`cell(1, 1)` is `A1`).
#[derive(Debug, Clone, PartialEq)]
pub struct SpecSheetGrid {
    rows: Vec<Vec<EnumCellValue>>,
    width: usize,
}

impl SpecSheetGrid {
    /// Create a grid holding only the header row.
    pub fn new<S: AsRef<str>>(header: &[S]) -> Self {
        let row_header = header
            .iter()
            .map(|name| EnumCellValue::String(name.as_ref().to_string()))
            .collect::<Vec<_>>();
        Self {
            width: row_header.len(),
            rows: vec![row_header],
        }
    }

    /// Append one body row and return its 1-based row number.
    pub fn push_row(&mut self, row: Vec<EnumCellValue>) -> Result<usize, XlsxWriteError> {
        if row.len() != self.width {
            return Err(XlsxWriteError::RaggedRow {
                row: self.rows.len() + 1,
                width: row.len(),
                expected: self.width,
            });
        }
        self.rows.push(row);
        Ok(self.rows.len())
    }

    /// Cell at 1-based `(row, col)`.
    pub fn cell(&self, row: usize, col: usize) -> Option<&EnumCellValue> {
        if row == 0 || col == 0 {
            return None;
        }
        self.rows.get(row - 1).and_then(|r| r.get(col - 1))
    }

    /// Header row values.
    pub fn header(&self) -> &[EnumCellValue] {
        &self.rows[0]
    }

    /// Total rows, header included.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// All rows, header first.
    pub fn rows(&self) -> &[Vec<EnumCellValue>] {
        &self.rows
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WriteOptions

/// Autofit rule for column width inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumAutofitColumnsRule {
    /// Disable autofit.
    None,
    /// Infer width from header cells only (default).
    #[default]
    Header,
    /// Infer width from body cells only.
    Body,
    /// Infer width from both header and body cells.
    All,
}

/// Autofit policy for the written sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecAutofitCellsPolicy {
    /// Autofit width inference rule.
    pub rule_columns: EnumAutofitColumnsRule,
    /// Max body rows inspected when body-based inference is active.
    pub height_body_inferred_max: Option<usize>,
    /// Minimum final width.
    pub width_cell_min: usize,
    /// Maximum final width.
    pub width_cell_max: usize,
    /// Width padding added after inference.
    pub width_cell_padding: usize,
}

impl Default for SpecAutofitCellsPolicy {
    fn default() -> Self {
        Self {
            rule_columns: EnumAutofitColumnsRule::Header,
            height_body_inferred_max: Some(20_000),
            width_cell_min: 8,
            width_cell_max: 60,
            width_cell_padding: 2,
        }
    }
}

/// Writer-wide options controlling sheet naming and formatting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecXlsxWriteOptions {
    /// Requested sheet name; sanitized before use.
    pub sheet_name: String,
    /// Format for header cells.
    pub fmt_header: SpecCellFormat,
    /// Format for text body cells.
    pub fmt_text: SpecCellFormat,
    /// Format for number and formula body cells.
    pub fmt_number: SpecCellFormat,
    /// Freeze the header row.
    pub if_freeze_header: bool,
    /// Column autofit policy.
    pub policy_autofit: SpecAutofitCellsPolicy,
}

impl Default for SpecXlsxWriteOptions {
    fn default() -> Self {
        let dict_fmt = derive_default_xlsx_formats();
        let fmt_of = |key: EnumFmtKey| dict_fmt.get(key.as_str()).cloned().unwrap_or_default();
        Self {
            sheet_name: C_SHEET_NAME_DEFAULT.to_string(),
            fmt_header: fmt_of(EnumFmtKey::Header),
            fmt_text: fmt_of(EnumFmtKey::Text),
            fmt_number: fmt_of(EnumFmtKey::Number),
            if_freeze_header: true,
            policy_autofit: SpecAutofitCellsPolicy::default(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportAndErrors

/// Per-write call report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecXlsxReport {
    /// Actual sheet name in workbook.
    pub sheet_name: String,
    /// Rows written, header included.
    pub n_rows: usize,
    /// Columns written.
    pub n_cols: usize,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecXlsxReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

/// Errors raised while building or serializing a sheet.
#[derive(Debug, Error)]
pub enum XlsxWriteError {
    /// Underlying `rust_xlsxwriter` failure (includes file IO on save).
    #[error("xlsx write error: {0}")]
    Xlsx(#[from] XlsxError),
    /// Row does not match header width.
    #[error("row {row} has {width} cells; expected {expected}")]
    RaggedRow {
        /// 1-based row number the row would have taken.
        row: usize,
        /// Actual cell count.
        width: usize,
        /// Header width.
        expected: usize,
    },
    /// Grid does not fit in a single Excel worksheet.
    #[error("grid of {rows}x{cols} exceeds Excel sheet limits")]
    GridTooLarge {
        /// Total rows.
        rows: usize,
        /// Total columns.
        cols: usize,
    },
    /// Row/column index does not fit the worksheet index type.
    #[error("{0}")]
    IndexOverflow(String),
    /// Autofit policy is inconsistent.
    #[error("invalid autofit policy: {0}")]
    InvalidPolicy(String),
    /// The writer holds exactly one sheet.
    #[error("sheet already written; writer holds a single sheet")]
    SheetAlreadyWritten,
    /// Save requested before any sheet was written.
    #[error("no sheet written before save")]
    NoSheet,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
