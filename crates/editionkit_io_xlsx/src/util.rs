//! Stateless helper utilities used by the XLSX writer kernel.

use crate::conf::{
    C_SHEET_NAME_DEFAULT, N_LEN_EXCEL_CELL_TEXT_MAX, N_LEN_EXCEL_SHEET_NAME_MAX,
    N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
};
use crate::spec::{EnumCellValue, XlsxWriteError};

////////////////////////////////////////////////////////////////////////////////
// #region Addressing

/// Convert a 1-based column number to its Excel letter (`1 -> "A"`, `27 -> "AA"`).
///
/// Returns an empty string for `0`.
pub fn derive_column_letter(col_1based: usize) -> String {
    let mut n_rest = col_1based;
    let mut l_chars = Vec::new();
    while n_rest > 0 {
        let n_rem = (n_rest - 1) % 26;
        l_chars.push(char::from(b'A' + n_rem as u8));
        n_rest = (n_rest - 1) / 26;
    }
    l_chars.iter().rev().collect()
}

/// Validate that a `height x width` grid fits in one worksheet.
pub fn validate_grid_extent(height: usize, width: usize) -> Result<(), XlsxWriteError> {
    if height > N_NROWS_EXCEL_MAX || width > N_NCOLS_EXCEL_MAX {
        return Err(XlsxWriteError::GridTooLarge {
            rows: height,
            cols: width,
        });
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().to_string();
    if c_name.is_empty() {
        c_name = C_SHEET_NAME_DEFAULT.to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Cut `text` to the Excel cell text limit on a char boundary.
pub fn truncate_cell_text(text: &str) -> &str {
    match text.char_indices().nth(N_LEN_EXCEL_CELL_TEXT_MAX) {
        Some((n_idx_byte, _)) => &text[..n_idx_byte],
        None => text,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WidthEstimation

/// Estimate display width, counting non-ASCII characters as wider glyphs.
pub fn estimate_unicode_string_width(s: &str) -> usize {
    let n_ascii = s.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = s.chars().count().saturating_sub(n_ascii);
    n_ascii + (n_non_ascii as f64 * 1.6).round() as usize
}

/// Estimate displayed width units for one cell value.
///
/// Formula cells are sized like short numbers since only their result shows.
pub fn estimate_width_len(value: &EnumCellValue) -> usize {
    match value {
        EnumCellValue::None => 0,
        EnumCellValue::String(s) => estimate_unicode_string_width(s),
        EnumCellValue::Number(n) => {
            if n.fract() == 0.0 {
                (*n as i64).to_string().len()
            } else {
                format!("{n:.4}").len()
            }
        }
        EnumCellValue::Formula(_) => 6,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
