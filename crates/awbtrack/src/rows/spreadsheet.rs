use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use crate::error::RowSourceError;
use crate::rows::{RowSource, SheetFormat, Table};

/// Reads the first worksheet of an Excel or OpenDocument workbook.
pub struct SpreadsheetSource;

impl SpreadsheetSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SpreadsheetSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RowSource for SpreadsheetSource {
    fn parse(&self, bytes: &[u8]) -> Result<Table, RowSourceError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| RowSourceError::Spreadsheet(e.to_string()))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| RowSourceError::Spreadsheet("workbook has no sheets".to_string()))?
            .map_err(|e| RowSourceError::Spreadsheet(e.to_string()))?;

        let mut rows = range.rows();
        let headers = match rows.next() {
            Some(row) => row.iter().map(|c| render_cell(c).trim().to_string()).collect(),
            None => return Err(RowSourceError::MissingHeader),
        };
        let records = rows
            .map(|row| row.iter().map(render_cell).collect())
            .collect();

        Ok(Table { headers, records })
    }

    fn supports(&self, format: SheetFormat) -> bool {
        matches!(format, SheetFormat::Xlsx)
    }
}

/// Renders a cell the way it reads in the sheet. Waybill numbers typed as
/// numbers come back as floats, so integral values drop the `.0`.
fn render_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            format!("{}", *f as i64)
        }
        other => other.to_string(),
    }
}
