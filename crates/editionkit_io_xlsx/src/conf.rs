//! XLSX constants and default preset factories.

use std::collections::BTreeMap;

use crate::spec::{SpecCellFormat, SpecXlsxWriteOptions};

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Excel cell text maximum length, in characters.
pub const N_LEN_EXCEL_CELL_TEXT_MAX: usize = 32_767;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];
/// Sheet name used when the caller does not provide one.
pub const C_SHEET_NAME_DEFAULT: &str = "Worksheet";
/// Upper bound Excel accepts for a column width.
pub const N_WIDTH_EXCEL_COLUMN_MAX: usize = 255;

/// Canonical format preset keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumFmtKey {
    /// Generic text cell format.
    Text,
    /// Number and formula cell format.
    Number,
    /// Header cell format.
    Header,
}

impl EnumFmtKey {
    /// Preset name used in [`derive_default_xlsx_formats`].
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Header => "header",
        }
    }
}

/// Build default named format presets used by [`crate::writer::XlsxWriter`].
///
/// Presets carry no font or border overrides, so the produced sheet looks like
/// a plain workbook apart from the bold header row.
pub fn derive_default_xlsx_formats() -> BTreeMap<String, SpecCellFormat> {
    let cfg_base_fmt_spec = SpecCellFormat::default();

    let mut dict_fmt = BTreeMap::new();
    dict_fmt.insert(EnumFmtKey::Text.as_str().to_string(), cfg_base_fmt_spec.clone());
    dict_fmt.insert(
        EnumFmtKey::Header.as_str().to_string(),
        cfg_base_fmt_spec.with_(SpecCellFormat {
            bold: Some(true),
            ..Default::default()
        }),
    );
    dict_fmt.insert(
        EnumFmtKey::Number.as_str().to_string(),
        cfg_base_fmt_spec.with_(SpecCellFormat {
            num_format: Some("0".to_string()),
            ..Default::default()
        }),
    );

    dict_fmt
}

/// Build default write options.
pub fn derive_default_xlsx_write_options() -> SpecXlsxWriteOptions {
    SpecXlsxWriteOptions::default()
}
