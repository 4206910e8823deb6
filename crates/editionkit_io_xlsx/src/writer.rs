//! XLSX writer kernel that turns a [`SpecSheetGrid`] into workbook output.

use log::{debug, warn};
use rust_xlsxwriter::{Format, FormatAlign, Workbook, Worksheet};

use crate::conf::{N_LEN_EXCEL_CELL_TEXT_MAX, N_WIDTH_EXCEL_COLUMN_MAX};
use crate::spec::{
    EnumAutofitColumnsRule, EnumCellValue, SpecAutofitCellsPolicy, SpecCellFormat, SpecSheetGrid,
    SpecXlsxReport, SpecXlsxWriteOptions, XlsxWriteError,
};
use crate::util::{
    estimate_width_len, sanitize_sheet_name, truncate_cell_text, validate_grid_extent,
};

/// Stateful single-sheet workbook writer.
///
/// The workbook is buffered in memory and only leaves it through
/// [`Self::save_to_buffer`].
pub struct XlsxWriter {
    workbook: Workbook,
    write_options: SpecXlsxWriteOptions,
    report: Option<SpecXlsxReport>,
}

impl XlsxWriter {
    /// Create writer bound to format/options presets.
    pub fn new(write_options: SpecXlsxWriteOptions) -> Self {
        Self {
            workbook: Workbook::new(),
            write_options,
            report: None,
        }
    }

    /// Report of the written sheet, if any.
    pub fn report(&self) -> Option<&SpecXlsxReport> {
        self.report.as_ref()
    }

    /// Write the grid as the workbook's only sheet.
    ///
    /// Row 1 of the grid lands in Excel row 1 (zero-based row 0), column 1 in `A`.
    pub fn write_grid(&mut self, grid: &SpecSheetGrid) -> Result<&SpecXlsxReport, XlsxWriteError> {
        if self.report.is_some() {
            return Err(XlsxWriteError::SheetAlreadyWritten);
        }
        validate_policy_autofit(&self.write_options.policy_autofit)?;
        validate_grid_extent(grid.height(), grid.width())?;

        let mut report = SpecXlsxReport {
            sheet_name: sanitize_sheet_name(&self.write_options.sheet_name, "_"),
            n_rows: grid.height(),
            n_cols: grid.width(),
            warnings: vec![],
        };
        if report.sheet_name != self.write_options.sheet_name {
            report.warn(format!(
                "Sheet name {:?} sanitized to {:?}.",
                self.write_options.sheet_name, report.sheet_name
            ));
        }

        let fmt_header = derive_rust_xlsx_format(&self.write_options.fmt_header);
        let fmt_text = derive_rust_xlsx_format(&self.write_options.fmt_text);
        let fmt_number = derive_rust_xlsx_format(&self.write_options.fmt_number);

        let worksheet = self.workbook.add_worksheet();
        worksheet.set_name(&report.sheet_name)?;

        for (n_idx_row, row_values) in grid.rows().iter().enumerate() {
            for (n_idx_col, value) in row_values.iter().enumerate() {
                let format = if n_idx_row == 0 {
                    &fmt_header
                } else {
                    match value {
                        EnumCellValue::Number(_) | EnumCellValue::Formula(_) => &fmt_number,
                        EnumCellValue::None | EnumCellValue::String(_) => &fmt_text,
                    }
                };
                if let EnumCellValue::String(val) = value
                    && truncate_cell_text(val).len() < val.len()
                {
                    let c_warning = format!(
                        "Cell ({}, {}) text truncated to {N_LEN_EXCEL_CELL_TEXT_MAX} characters.",
                        n_idx_row + 1,
                        n_idx_col + 1
                    );
                    warn!("{c_warning}");
                    report.warn(c_warning);
                }
                write_cell_with_format(worksheet, n_idx_row, n_idx_col, value, format)?;
            }
        }

        if self.write_options.if_freeze_header {
            worksheet.set_freeze_panes(1, 0)?;
        }

        apply_autofit_widths(worksheet, grid, &self.write_options.policy_autofit)?;

        debug!(
            "xlsx sheet {:?} written: rows={} cols={}",
            report.sheet_name, report.n_rows, report.n_cols
        );
        Ok(self.report.insert(report))
    }

    /// Serialize the workbook to XLSX bytes.
    pub fn save_to_buffer(&mut self) -> Result<Vec<u8>, XlsxWriteError> {
        if self.report.is_none() {
            return Err(XlsxWriteError::NoSheet);
        }
        Ok(self.workbook.save_to_buffer()?)
    }
}

/// Write `grid` with `write_options` and return the XLSX bytes with the sheet
/// report.
pub fn write_grid_to_buffer(
    grid: &SpecSheetGrid,
    write_options: &SpecXlsxWriteOptions,
) -> Result<(Vec<u8>, SpecXlsxReport), XlsxWriteError> {
    let mut writer = XlsxWriter::new(write_options.clone());
    let report = writer.write_grid(grid)?.clone();
    Ok((writer.save_to_buffer()?, report))
}

fn validate_policy_autofit(policy_autofit: &SpecAutofitCellsPolicy) -> Result<(), XlsxWriteError> {
    if policy_autofit.width_cell_min == 0 {
        return Err(XlsxWriteError::InvalidPolicy(
            "policy_autofit.width_cell_min must be >= 1.".to_string(),
        ));
    }
    if policy_autofit.width_cell_max < policy_autofit.width_cell_min {
        return Err(XlsxWriteError::InvalidPolicy(
            "policy_autofit.width_cell_max must be >= policy_autofit.width_cell_min.".to_string(),
        ));
    }
    Ok(())
}

fn apply_autofit_widths(
    worksheet: &mut Worksheet,
    grid: &SpecSheetGrid,
    policy_autofit: &SpecAutofitCellsPolicy,
) -> Result<(), XlsxWriteError> {
    if matches!(policy_autofit.rule_columns, EnumAutofitColumnsRule::None) || grid.width() == 0 {
        return Ok(());
    }

    let mut l_width_by_col_header = vec![0usize; grid.width()];
    let mut l_width_by_col_body = vec![0usize; grid.width()];

    for (n_idx_col, value) in grid.header().iter().enumerate() {
        l_width_by_col_header[n_idx_col] = estimate_width_len(value);
    }

    let n_rows_body_max = policy_autofit
        .height_body_inferred_max
        .unwrap_or(usize::MAX);
    for row_values in grid.rows().iter().skip(1).take(n_rows_body_max) {
        for (n_idx_col, value) in row_values.iter().enumerate() {
            l_width_by_col_body[n_idx_col] =
                usize::max(l_width_by_col_body[n_idx_col], estimate_width_len(value));
        }
    }

    let n_min = usize::max(1, policy_autofit.width_cell_min);
    let n_max = usize::min(
        N_WIDTH_EXCEL_COLUMN_MAX,
        usize::max(n_min, policy_autofit.width_cell_max),
    );
    let n_pad = policy_autofit.width_cell_padding;

    for n_idx_col in 0..grid.width() {
        let n_width_recorded = match policy_autofit.rule_columns {
            EnumAutofitColumnsRule::Header | EnumAutofitColumnsRule::None => {
                l_width_by_col_header[n_idx_col]
            }
            EnumAutofitColumnsRule::Body => l_width_by_col_body[n_idx_col],
            EnumAutofitColumnsRule::All => usize::max(
                l_width_by_col_header[n_idx_col],
                l_width_by_col_body[n_idx_col],
            ),
        };
        let n_width_final = usize::min(n_max, usize::max(n_min, n_width_recorded + n_pad));
        worksheet.set_column_width(cast_col_num(n_idx_col)?, n_width_final as f64)?;
    }

    Ok(())
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row_idx: usize,
    col_idx: usize,
    value: &EnumCellValue,
    format: &Format,
) -> Result<(), XlsxWriteError> {
    let n_row = cast_row_num(row_idx)?;
    let n_col = cast_col_num(col_idx)?;
    match value {
        EnumCellValue::None => {
            worksheet.write_blank(n_row, n_col, format)?;
        }
        EnumCellValue::String(val) if val.is_empty() => {
            worksheet.write_blank(n_row, n_col, format)?;
        }
        EnumCellValue::String(val) => {
            worksheet.write_string_with_format(n_row, n_col, truncate_cell_text(val), format)?;
        }
        EnumCellValue::Number(val) => {
            worksheet.write_number_with_format(n_row, n_col, *val, format)?;
        }
        EnumCellValue::Formula(val) => {
            worksheet.write_formula_with_format(n_row, n_col, val.as_str(), format)?;
        }
    }
    Ok(())
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if spec.italic.unwrap_or(false) {
        format = format.set_italic();
    }

    if let Some(val) = &spec.align
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = &spec.valign
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }

    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }
    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }
    if let Some(val) = &spec.font_color {
        format = format.set_font_color(val.as_str());
    }

    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    format
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    let value = align.trim().to_ascii_lowercase();
    match value.as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "fill" => Some(FormatAlign::Fill),
        "justify" => Some(FormatAlign::Justify),
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" | "vertical_center" => Some(FormatAlign::VerticalCenter),
        _ => None,
    }
}

fn cast_row_num(value: usize) -> Result<u32, XlsxWriteError> {
    u32::try_from(value)
        .map_err(|_| XlsxWriteError::IndexOverflow(format!("row index overflow: {value}")))
}

fn cast_col_num(value: usize) -> Result<u16, XlsxWriteError> {
    u16::try_from(value)
        .map_err(|_| XlsxWriteError::IndexOverflow(format!("column index overflow: {value}")))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use calamine::{Data, Reader, Xlsx, open_workbook_from_rs};

    use super::*;

    fn build_grid() -> SpecSheetGrid {
        let mut grid = SpecSheetGrid::new(&["Name", "Count", "Double", "Note"]);
        grid.push_row(vec![
            EnumCellValue::String("alpha".to_string()),
            EnumCellValue::Number(3.0),
            EnumCellValue::Formula("=SUM(B2*2)".to_string()),
            EnumCellValue::String(String::new()),
        ])
        .unwrap();
        grid
    }

    fn read_back(v_bytes: Vec<u8>) -> Xlsx<Cursor<Vec<u8>>> {
        open_workbook_from_rs(Cursor::new(v_bytes)).unwrap()
    }

    #[test]
    fn write_grid_roundtrips_values_and_formulas() {
        let (v_bytes, report) =
            write_grid_to_buffer(&build_grid(), &SpecXlsxWriteOptions::default()).unwrap();
        assert!(report.warnings.is_empty());
        let mut workbook = read_back(v_bytes);

        assert_eq!(workbook.sheet_names(), vec!["Worksheet".to_string()]);
        let range = workbook.worksheet_range("Worksheet").unwrap();
        assert_eq!(
            range.get_value((0, 0)),
            Some(&Data::String("Name".to_string()))
        );
        assert_eq!(
            range.get_value((1, 0)),
            Some(&Data::String("alpha".to_string()))
        );
        assert_eq!(range.get_value((1, 1)), Some(&Data::Float(3.0)));

        let formulas = workbook.worksheet_formula("Worksheet").unwrap();
        assert_eq!(
            formulas.get_value((1, 2)).map(String::as_str),
            Some("SUM(B2*2)")
        );
    }

    #[test]
    fn write_grid_sanitizes_sheet_name_with_warning() {
        let mut writer = XlsxWriter::new(SpecXlsxWriteOptions {
            sheet_name: "2024/edition".to_string(),
            ..Default::default()
        });
        let report = writer.write_grid(&build_grid()).unwrap().clone();
        assert_eq!(report.sheet_name, "2024_edition");
        assert_eq!(report.n_rows, 2);
        assert_eq!(report.n_cols, 4);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn writer_holds_a_single_sheet() {
        let mut writer = XlsxWriter::new(SpecXlsxWriteOptions::default());
        assert!(matches!(
            writer.save_to_buffer(),
            Err(XlsxWriteError::NoSheet)
        ));
        writer.write_grid(&build_grid()).unwrap();
        assert!(matches!(
            writer.write_grid(&build_grid()),
            Err(XlsxWriteError::SheetAlreadyWritten)
        ));
    }

    #[test]
    fn invalid_autofit_policy_is_rejected() {
        let mut writer = XlsxWriter::new(SpecXlsxWriteOptions {
            policy_autofit: SpecAutofitCellsPolicy {
                width_cell_min: 10,
                width_cell_max: 5,
                ..Default::default()
            },
            ..Default::default()
        });
        assert!(matches!(
            writer.write_grid(&build_grid()),
            Err(XlsxWriteError::InvalidPolicy(_))
        ));
    }

    #[test]
    fn overlong_text_is_truncated_with_warning() {
        let mut grid = SpecSheetGrid::new(&["Content", "Title"]);
        grid.push_row(vec![
            EnumCellValue::String("a".repeat(40_000)),
            EnumCellValue::String("kept".to_string()),
        ])
        .unwrap();

        let (v_bytes, report) =
            write_grid_to_buffer(&grid, &SpecXlsxWriteOptions::default()).unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("(2, 1)"));

        let mut workbook = read_back(v_bytes);
        let range = workbook.worksheet_range("Worksheet").unwrap();
        match range.get_value((1, 0)) {
            Some(Data::String(val)) => {
                assert_eq!(val.chars().count(), N_LEN_EXCEL_CELL_TEXT_MAX);
            }
            other => panic!("unexpected cell: {other:?}"),
        }
        assert_eq!(
            range.get_value((1, 1)),
            Some(&Data::String("kept".to_string()))
        );
    }
}
