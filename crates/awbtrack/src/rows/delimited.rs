use csv::ReaderBuilder;

use crate::error::RowSourceError;
use crate::rows::{RowSource, SheetFormat, Table};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub struct CsvSource;

impl CsvSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CsvSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RowSource for CsvSource {
    fn parse(&self, bytes: &[u8]) -> Result<Table, RowSourceError> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

        let mut reader = ReaderBuilder::new()
            .delimiter(sniff_delimiter(bytes))
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .byte_headers()?
            .iter()
            .map(|h| String::from_utf8_lossy(h).trim().to_string())
            .collect();

        let mut records = Vec::new();
        for record in reader.byte_records() {
            let record = record?;
            records.push(
                record
                    .iter()
                    .map(|cell| String::from_utf8_lossy(cell).to_string())
                    .collect(),
            );
        }

        Ok(Table { headers, records })
    }

    fn supports(&self, format: SheetFormat) -> bool {
        matches!(format, SheetFormat::Csv)
    }
}

/// Picks the separator that occurs most often in the header line, preferring
/// comma on ties. Some locales export spreadsheets with `;` or tabs.
fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let header = bytes.split(|b| *b == b'\n').next().unwrap_or_default();
    let count = |d: u8| header.iter().filter(|b| **b == d).count();

    let mut best = (b',', count(b','));
    for candidate in [b';', b'\t'] {
        let n = count(candidate);
        if n > best.1 {
            best = (candidate, n);
        }
    }
    best.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Table {
        CsvSource::new().parse(input.as_bytes()).unwrap()
    }

    #[test]
    fn test_parses_headers_and_records() {
        let table = parse("AWB,Pieces\n176-12345675,2\n020-11111111,5\n");
        assert_eq!(table.headers, vec!["AWB", "Pieces"]);
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[1], vec!["020-11111111", "5"]);
    }

    #[test]
    fn test_trims_headers_and_strips_bom() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b" AWB , Note\n1,2\n");
        let table = CsvSource::new().parse(&bytes).unwrap();
        assert_eq!(table.headers, vec!["AWB", "Note"]);
    }

    #[test]
    fn test_accepts_ragged_rows() {
        let table = parse("AWB,Note\n176-12345675\n020-11111111,x,extra\n");
        assert_eq!(table.records[0], vec!["176-12345675"]);
        assert_eq!(table.records[1].len(), 3);
    }

    #[test]
    fn test_quoted_cells() {
        let table = parse("AWB,Note\n\"176-12345675\",\"a, b\"\n");
        assert_eq!(table.records[0], vec!["176-12345675", "a, b"]);
    }

    #[test]
    fn test_semicolon_delimited() {
        let table = parse("AWB;Pieces;Weight\n176-12345675;2;10,5\n");
        assert_eq!(table.headers, vec!["AWB", "Pieces", "Weight"]);
        assert_eq!(table.records[0], vec!["176-12345675", "2", "10,5"]);
    }

    #[test]
    fn test_sniff_prefers_comma_on_tie() {
        assert_eq!(sniff_delimiter(b"AWB\n1"), b',');
        assert_eq!(sniff_delimiter(b"a\tb\tc\n"), b'\t');
    }

    #[test]
    fn test_header_only() {
        let table = parse("AWB\n");
        assert_eq!(table.headers, vec!["AWB"]);
        assert!(table.records.is_empty());
    }
}
