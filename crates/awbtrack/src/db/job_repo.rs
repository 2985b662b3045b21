//! Job repository — CRUD operations for the `jobs` table.

use rusqlite::types::ToSql;
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DatabaseError};

/// A raw job row from the database.
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: i64,
    pub filename: String,
    pub total_rows: i64,
    pub processed_rows: i64,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            filename: row.get("filename")?,
            total_rows: row.get("total_rows")?,
            processed_rows: row.get("processed_rows")?,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Inserts a new job and returns its assigned id.
pub fn insert(
    db: &Database,
    filename: &str,
    status: &str,
    created_at: &str,
) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO jobs (filename, status, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            params![filename, status, created_at],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

/// Finds a job by its ID.
pub fn find_by_id(db: &Database, id: i64) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row("SELECT * FROM jobs WHERE id = ?1", params![id], JobRow::from_row)
            .optional()?;
        Ok(row)
    })
}

/// Lists all jobs, newest first.
pub fn list(db: &Database) -> Result<Vec<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM jobs ORDER BY created_at DESC, id DESC")?;
        let rows = stmt
            .query_map([], JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Lists jobs whose status is one of `statuses`, oldest first.
pub fn find_by_statuses(db: &Database, statuses: &[&str]) -> Result<Vec<JobRow>, DatabaseError> {
    if statuses.is_empty() {
        return Ok(Vec::new());
    }
    db.with_conn(|conn| {
        let sql = format!(
            "SELECT * FROM jobs WHERE status IN ({}) ORDER BY id ASC",
            placeholders(1, statuses.len())
        );
        let params_ref: Vec<&dyn ToSql> = statuses.iter().map(|s| s as &dyn ToSql).collect();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_ref.as_slice(), JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Sets the row total. Returns the number of rows changed (0 when the job
/// does not exist).
pub fn update_total(
    db: &Database,
    id: i64,
    total: i64,
    updated_at: &str,
) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE jobs SET total_rows = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, total, updated_at],
        )?;
        Ok(changed)
    })
}

/// Advances the processed count. The update only applies while the new value
/// stays within the total and does not move backwards.
pub fn update_processed(
    db: &Database,
    id: i64,
    processed: i64,
    updated_at: &str,
) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE jobs SET processed_rows = ?2, updated_at = ?3
             WHERE id = ?1 AND ?2 <= total_rows AND ?2 >= processed_rows",
            params![id, processed, updated_at],
        )?;
        Ok(changed)
    })
}

/// Compare-and-set of the status column: moves the job to `to` only if its
/// current status is one of `from`. Returns the number of rows changed.
pub fn transition_status(
    db: &Database,
    id: i64,
    from: &[&str],
    to: &str,
    updated_at: &str,
) -> Result<usize, DatabaseError> {
    if from.is_empty() {
        return Ok(0);
    }
    db.with_conn(|conn| {
        let sql = format!(
            "UPDATE jobs SET status = ?2, updated_at = ?3 WHERE id = ?1 AND status IN ({})",
            placeholders(4, from.len())
        );
        let mut params_ref: Vec<&dyn ToSql> = vec![&id as &dyn ToSql, &to, &updated_at];
        params_ref.extend(from.iter().map(|s| s as &dyn ToSql));
        let changed = conn.execute(&sql, params_ref.as_slice())?;
        Ok(changed)
    })
}

/// `?start, ?start+1, ...` for `count` parameters.
fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}
