//! Tabular export of a job's results.

use async_trait::async_trait;

use crate::error::ExportError;
use crate::model::TrackingResult;

/// Export columns, in output order.
pub const EXPORT_COLUMNS: [&str; 10] = [
    "AWB",
    "Prefix",
    "Number",
    "Status",
    "Origin",
    "Destination",
    "Pieces",
    "Gross Weight",
    "Last Activity",
    "Document URL",
];

/// One result as a row of cells matching [`EXPORT_COLUMNS`]. Missing fields
/// become empty cells.
pub fn result_row(result: &TrackingResult) -> Vec<String> {
    let record = &result.record;
    let cell = |value: &Option<String>| value.clone().unwrap_or_default();
    vec![
        result.identifier.clone(),
        result.prefix.clone(),
        result.number.clone(),
        cell(&record.status),
        cell(&record.origin),
        cell(&record.destination),
        cell(&record.pieces),
        cell(&record.gross_weight),
        cell(&record.last_activity),
        cell(&record.document_url),
    ]
}

/// Header row followed by one row per result.
pub fn export_rows(results: &[TrackingResult]) -> Vec<Vec<String>> {
    let mut rows = Vec::with_capacity(results.len() + 1);
    rows.push(EXPORT_COLUMNS.iter().map(|c| c.to_string()).collect());
    rows.extend(results.iter().map(result_row));
    rows
}

/// Renders results as a CSV file with a header row.
pub fn results_to_csv(results: &[TrackingResult]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in export_rows(results) {
        writer.write_record(&row)?;
    }
    writer.into_inner().map_err(|e| {
        ExportError::Io(std::io::Error::new(e.error().kind(), e.error().to_string()))
    })
}

/// An external spreadsheet that can be overwritten with rows.
#[async_trait]
pub trait SheetSink: Send + Sync {
    async fn clear(&self) -> Result<(), ExportError>;
    async fn write_rows(&self, rows: Vec<Vec<String>>) -> Result<(), ExportError>;
}

/// Replaces the sheet's contents with the results: clear first, then the
/// header row and data rows in one write. Returns the number of data rows.
pub async fn push_to_sheet(
    sink: &dyn SheetSink,
    results: &[TrackingResult],
) -> Result<usize, ExportError> {
    sink.clear().await?;
    sink.write_rows(export_rows(results)).await?;
    log::info!("Pushed {} results to spreadsheet", results.len());
    Ok(results.len())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::identifier::WaybillKey;
    use crate::model::ShipmentRecord;

    fn sample() -> Vec<TrackingResult> {
        let record = ShipmentRecord {
            status: Some("Delivered".to_string()),
            origin: Some("FRA".to_string()),
            destination: Some("JFK".to_string()),
            pieces: Some("2".to_string()),
            gross_weight: Some("12, 5 KG".to_string()),
            last_activity: Some("Delivered to consignee".to_string()),
            last_activity_date: Some("2026-03-01".to_string()),
            document_url: None,
        };
        vec![
            TrackingResult::new(1, "176-12345675", &WaybillKey::new("176", "12345675"), record),
            TrackingResult::new(
                1,
                "020 11111111",
                &WaybillKey::new("020", "11111111"),
                ShipmentRecord::default(),
            ),
        ]
    }

    #[test]
    fn test_csv_header_and_column_order() {
        let csv = String::from_utf8(results_to_csv(&sample()).unwrap()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "AWB,Prefix,Number,Status,Origin,Destination,Pieces,Gross Weight,Last Activity,Document URL"
        );
        assert_eq!(
            lines.next().unwrap(),
            "176-12345675,176,12345675,Delivered,FRA,JFK,2,\"12, 5 KG\",Delivered to consignee,"
        );
        assert_eq!(lines.next().unwrap(), "020 11111111,020,11111111,,,,,,,");
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_csv_of_no_results_is_header_only() {
        let csv = String::from_utf8(results_to_csv(&[]).unwrap()).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }

    #[derive(Default)]
    struct RecordingSheet {
        calls: Mutex<Vec<String>>,
        rows: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl SheetSink for RecordingSheet {
        async fn clear(&self) -> Result<(), ExportError> {
            self.calls.lock().unwrap().push("clear".to_string());
            self.rows.lock().unwrap().clear();
            Ok(())
        }

        async fn write_rows(&self, rows: Vec<Vec<String>>) -> Result<(), ExportError> {
            self.calls.lock().unwrap().push("write".to_string());
            self.rows.lock().unwrap().extend(rows);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_push_clears_then_writes_header_first() {
        let sheet = RecordingSheet::default();
        sheet.rows.lock().unwrap().push(vec!["stale".to_string()]);

        let written = push_to_sheet(&sheet, &sample()).await.unwrap();

        assert_eq!(written, 2);
        assert_eq!(*sheet.calls.lock().unwrap(), vec!["clear", "write"]);
        let rows = sheet.rows.lock().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0], "AWB");
        assert_eq!(rows[1][0], "176-12345675");
    }

    struct FailingSheet;

    #[async_trait]
    impl SheetSink for FailingSheet {
        async fn clear(&self) -> Result<(), ExportError> {
            Err(ExportError::Sink("quota exceeded".to_string()))
        }

        async fn write_rows(&self, _rows: Vec<Vec<String>>) -> Result<(), ExportError> {
            panic!("must not write after a failed clear");
        }
    }

    #[tokio::test]
    async fn test_push_stops_when_clear_fails() {
        let err = push_to_sheet(&FailingSheet, &sample()).await.unwrap_err();
        assert!(matches!(err, ExportError::Sink(_)));
    }
}
