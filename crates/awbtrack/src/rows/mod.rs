//! Turning uploaded tabular files into ordered rows.
//!
//! Each supported format implements [`RowSource`] and produces a raw
//! [`Table`]. The [`RowSourceRegistry`] picks a source by file name, then
//! locates the identifier column and builds a [`RowSet`] the engine can walk
//! as many times as it needs.

pub mod delimited;
pub mod spreadsheet;

use std::collections::HashMap;

use crate::error::RowSourceError;

/// Tabular formats the registry can decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Csv,
    Xlsx,
}

impl SheetFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "csv" | "txt" | "tsv" => Some(Self::Csv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(Self::Xlsx),
            _ => None,
        }
    }

    /// Resolves the format from a file name, trying the extension first and
    /// then the guessed MIME type.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = std::path::Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        if let Some(format) = Self::from_extension(ext) {
            return Some(format);
        }

        let mime = mime_guess::from_path(filename).first()?;
        match mime.essence_str() {
            "text/csv" | "text/plain" | "text/tab-separated-values" => Some(Self::Csv),
            "application/vnd.ms-excel"
            | "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            | "application/vnd.oasis.opendocument.spreadsheet" => Some(Self::Xlsx),
            _ => None,
        }
    }
}

/// Header plus raw cell values, as decoded from the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub records: Vec<Vec<String>>,
}

pub trait RowSource: Send + Sync {
    fn parse(&self, bytes: &[u8]) -> Result<Table, RowSourceError>;
    fn supports(&self, format: SheetFormat) -> bool;
}

/// One data row, keyed by column header. When a header repeats, the first
/// column with that name owns the value.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// 1-based position among the data rows.
    pub number: usize,
    /// Cell of the identifier column, taken by position.
    pub key: String,
    pub values: HashMap<String, String>,
}

impl Row {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }
}

/// The materialized rows of one file, with the identifier column resolved.
#[derive(Debug, Clone)]
pub struct RowSet {
    headers: Vec<String>,
    rows: Vec<Row>,
    key_column: String,
}

impl RowSet {
    /// Builds a row set from a decoded table. Blank rows are dropped.
    pub fn from_table(table: Table, needle: &str) -> Result<Self, RowSourceError> {
        if table.headers.iter().all(|h| h.is_empty()) {
            return Err(RowSourceError::MissingHeader);
        }

        let key_index = locate_column(&table.headers, needle).ok_or_else(|| {
            RowSourceError::MissingColumn {
                needle: needle.to_string(),
                columns: table.headers.join(", "),
            }
        })?;
        let key_column = table.headers[key_index].clone();

        let rows = table
            .records
            .into_iter()
            .filter(|record| record.iter().any(|cell| !cell.trim().is_empty()))
            .enumerate()
            .map(|(i, record)| {
                let key = record.get(key_index).cloned().unwrap_or_default();
                let mut values = HashMap::with_capacity(table.headers.len());
                let cells = record.into_iter().chain(std::iter::repeat(String::new()));
                for (header, cell) in table.headers.iter().zip(cells) {
                    values.entry(header.clone()).or_insert(cell);
                }
                Row {
                    number: i + 1,
                    key,
                    values,
                }
            })
            .collect();

        Ok(Self {
            headers: table.headers,
            rows,
            key_column,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Header of the column holding the identifiers.
    pub fn key_column(&self) -> &str {
        &self.key_column
    }

    /// Raw identifier of a row; empty when the cell is missing.
    pub fn key_of<'a>(&self, row: &'a Row) -> &'a str {
        &row.key
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }
}

impl<'a> IntoIterator for &'a RowSet {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Index of the first header containing `needle`, ignoring case.
pub fn locate_column(headers: &[String], needle: &str) -> Option<usize> {
    let needle = needle.to_lowercase();
    headers
        .iter()
        .position(|h| h.to_lowercase().contains(&needle))
}

pub struct RowSourceRegistry {
    sources: Vec<Box<dyn RowSource>>,
    key_needle: String,
}

impl RowSourceRegistry {
    pub fn new(key_needle: &str) -> Self {
        let sources: Vec<Box<dyn RowSource>> = vec![
            Box::new(delimited::CsvSource::new()),
            Box::new(spreadsheet::SpreadsheetSource::new()),
        ];

        Self {
            sources,
            key_needle: key_needle.to_string(),
        }
    }

    pub fn key_needle(&self) -> &str {
        &self.key_needle
    }

    /// Decodes `bytes` according to `filename` and resolves the identifier column.
    pub fn load(&self, filename: &str, bytes: &[u8]) -> Result<RowSet, RowSourceError> {
        let format = SheetFormat::from_filename(filename)
            .ok_or_else(|| RowSourceError::UnsupportedFormat(filename.to_string()))?;

        let source = self
            .sources
            .iter()
            .find(|s| s.supports(format))
            .ok_or_else(|| RowSourceError::UnsupportedFormat(filename.to_string()))?;

        let table = source.parse(bytes)?;
        RowSet::from_table(table, &self.key_needle)
    }
}

impl Default for RowSourceRegistry {
    fn default() -> Self {
        Self::new("awb")
    }
}
