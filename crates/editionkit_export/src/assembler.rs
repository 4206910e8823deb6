//! Sheet assembly: header row plus one placed record per item.

use editionkit_io_xlsx::{SpecSheetGrid, SpecXlsxWriteOptions, write_grid_to_buffer};
use log::debug;

use crate::conf::TUP_EXPORT_FIELD_NAMES;
use crate::formatter::RecordFormatter;
use crate::render::RenderPipeline;
use crate::spec::{ContentItem, ExportError, ExportRecord};

/// Append-only sheet builder.
///
/// Row numbers depend only on append order: the `n`-th appended record
/// (0-based) lands on row `n + 2`, row 1 being the header.
#[derive(Debug, Clone)]
pub struct SheetAssembler {
    grid: SpecSheetGrid,
}

impl Default for SheetAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl SheetAssembler {
    /// Start a sheet holding only the header row.
    pub fn new() -> Self {
        Self {
            grid: SpecSheetGrid::new(&TUP_EXPORT_FIELD_NAMES),
        }
    }

    /// 1-based row the next record will occupy.
    pub fn next_row(&self) -> usize {
        self.grid.height() + 1
    }

    /// Rows written so far, header included.
    pub fn row_count(&self) -> usize {
        self.grid.height()
    }

    /// Place `record` on the next row, resolving its row placeholders.
    pub fn append_record(&mut self, record: &ExportRecord) -> Result<usize, ExportError> {
        let n_row = self.next_row();
        let n_row_written = self.grid.push_row(record.to_row(n_row))?;
        debug!("assembled record on row {n_row_written}");
        Ok(n_row_written)
    }

    /// Format `item` and place it on the next row.
    pub fn append_item<R: RenderPipeline>(
        &mut self,
        formatter: &RecordFormatter<R>,
        item: &ContentItem,
    ) -> Result<usize, ExportError> {
        self.append_record(&formatter.format(item))
    }

    /// Borrow the grid built so far.
    pub fn grid(&self) -> &SpecSheetGrid {
        &self.grid
    }

    /// Finish assembly and take the grid.
    pub fn finish(self) -> SpecSheetGrid {
        self.grid
    }
}

/// Assemble `items` (already filtered and ordered) into a sheet grid.
pub fn assemble<R: RenderPipeline>(
    items: &[ContentItem],
    formatter: &RecordFormatter<R>,
) -> Result<SpecSheetGrid, ExportError> {
    let mut assembler = SheetAssembler::new();
    for item in items {
        assembler.append_item(formatter, item)?;
    }
    Ok(assembler.finish())
}

/// Assemble already formatted records into a sheet grid.
pub fn assemble_records(records: &[ExportRecord]) -> Result<SpecSheetGrid, ExportError> {
    let mut assembler = SheetAssembler::new();
    for record in records {
        assembler.append_record(record)?;
    }
    Ok(assembler.finish())
}

/// Assemble `items` and serialize the sheet to XLSX bytes.
pub fn assemble_to_bytes<R: RenderPipeline>(
    items: &[ContentItem],
    formatter: &RecordFormatter<R>,
    write_options: &SpecXlsxWriteOptions,
) -> Result<Vec<u8>, ExportError> {
    let grid = assemble(items, formatter)?;
    let (v_bytes, _) = write_grid_to_buffer(&grid, write_options)?;
    Ok(v_bytes)
}
