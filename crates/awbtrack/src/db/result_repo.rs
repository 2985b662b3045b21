//! Result repository — insert and query for the `results` table.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw tracking result row.
#[derive(Debug, Clone, Default)]
pub struct ResultRow {
    pub id: i64,
    pub job_id: i64,
    pub identifier: String,
    pub prefix: String,
    pub number: String,
    pub status: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub pieces: Option<String>,
    pub gross_weight: Option<String>,
    pub last_activity: Option<String>,
    pub last_activity_date: Option<String>,
    pub document_url: Option<String>,
    pub created_at: String,
}

impl ResultRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            job_id: row.get("job_id")?,
            identifier: row.get("identifier")?,
            prefix: row.get("prefix")?,
            number: row.get("number")?,
            status: row.get("status")?,
            origin: row.get("origin")?,
            destination: row.get("destination")?,
            pieces: row.get("pieces")?,
            gross_weight: row.get("gross_weight")?,
            last_activity: row.get("last_activity")?,
            last_activity_date: row.get("last_activity_date")?,
            document_url: row.get("document_url")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Inserts a result row and returns its assigned id. `row.id` is ignored.
pub fn insert(db: &Database, row: &ResultRow) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO results (job_id, identifier, prefix, number, status, origin,
             destination, pieces, gross_weight, last_activity, last_activity_date,
             document_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                row.job_id,
                row.identifier,
                row.prefix,
                row.number,
                row.status,
                row.origin,
                row.destination,
                row.pieces,
                row.gross_weight,
                row.last_activity,
                row.last_activity_date,
                row.document_url,
                row.created_at,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

/// All results of one job in insertion order.
pub fn find_by_job(db: &Database, job_id: i64) -> Result<Vec<ResultRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM results WHERE job_id = ?1 ORDER BY id ASC")?;
        let rows = stmt
            .query_map(params![job_id], ResultRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}
