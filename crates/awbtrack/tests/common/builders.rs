//! Builders for upload payloads.

#![allow(dead_code)]

/// Builds a CSV upload row by row.
pub struct CsvBuilder {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CsvBuilder {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row(mut self, cells: &[&str]) -> Self {
        self.rows.push(cells.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.headers).expect("write header");
        for row in &self.rows {
            writer.write_record(row).expect("write row");
        }
        writer.into_inner().expect("flush csv")
    }
}

/// A two-column upload (`AWB No`, `Reference`) with one row per identifier.
pub fn waybill_csv(identifiers: &[&str]) -> Vec<u8> {
    identifiers
        .iter()
        .enumerate()
        .fold(CsvBuilder::new(&["AWB No", "Reference"]), |builder, (i, id)| {
            builder.row(&[id, &format!("ref-{}", i + 1)])
        })
        .build()
}
