//! `editionkit_io_xlsx` v1:
//! Single-sheet XLSX kernel for edition protocol exports.
//!
//! Module layout:
//! - `conf`   : Excel limits and default format presets
//! - `spec`   : grid/cell models, options and errors
//! - `util`   : pure helper functions
//! - `writer` : grid-to-workbook writer
pub mod conf;
pub mod spec;
pub mod util;
pub mod writer;

pub use conf::{
    C_SHEET_NAME_DEFAULT, N_LEN_EXCEL_CELL_TEXT_MAX, N_LEN_EXCEL_SHEET_NAME_MAX,
    N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
};
pub use spec::{
    EnumAutofitColumnsRule, EnumCellValue, SpecAutofitCellsPolicy, SpecCellFormat, SpecSheetGrid,
    SpecXlsxReport, SpecXlsxWriteOptions, XlsxWriteError,
};
pub use util::{
    derive_column_letter, estimate_unicode_string_width, sanitize_sheet_name, truncate_cell_text,
};
pub use writer::{XlsxWriter, write_grid_to_buffer};
