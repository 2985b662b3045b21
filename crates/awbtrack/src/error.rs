use std::path::PathBuf;
use thiserror::Error;

use crate::engine::ControlAction;
use crate::model::{JobId, JobStatus};

#[derive(Error, Debug)]
pub enum AwbtrackError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Row source error: {0}")]
    RowSource(#[from] RowSourceError),

    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Control error: {0}")]
    Control(#[from] ControlError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid value for environment variable {name}: {value}")]
    InvalidEnv { name: String, value: String },
}

/// Failures while turning an uploaded file into rows. All of these are fatal
/// to the job that owns the file.
#[derive(Error, Debug)]
pub enum RowSourceError {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to read spreadsheet: {0}")]
    Spreadsheet(String),

    #[error("File contains no header row")]
    MissingHeader,

    #[error("No column matching '{needle}' found (columns: {columns})")]
    MissingColumn { needle: String, columns: String },
}

/// Failures of a single identifier lookup. Recovered per row by the engine.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Tracking service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode tracking response: {0}")]
    Decode(String),

    #[error("Shipment not found")]
    NotFound,

    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Job {0} not found")]
    NotFound(JobId),

    #[error("Job {job_id} cannot move from {from} to {to}")]
    InvalidTransition {
        job_id: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Job {job_id} progress {processed} exceeds total {total}")]
    ProgressOverflow {
        job_id: JobId,
        processed: u64,
        total: u64,
    },

    #[error("Corrupt job record: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Database(#[from] crate::db::DatabaseError),
}

/// Errors returned synchronously to the caller of a control action.
/// No job state is changed when one of these is returned.
#[derive(Error, Debug)]
pub enum ControlError {
    #[error("Job {0} not found")]
    JobNotFound(JobId),

    #[error("Cannot {action} job {job_id} while it is {status}")]
    InvalidTransition {
        job_id: JobId,
        action: ControlAction,
        status: JobStatus,
    },

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ControlError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ControlError::JobNotFound(id),
            other => ControlError::Store(other),
        }
    }
}

/// Job-level failures. A job that hits one of these ends in `failed`.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    RowSource(#[from] RowSourceError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Worker failed: {0}")]
    Worker(String),

    #[error("Engine is shutting down")]
    ShuttingDown,
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to flush export buffer: {0}")]
    Io(#[from] std::io::Error),

    #[error("Spreadsheet sink failed: {0}")]
    Sink(String),
}

pub type Result<T> = std::result::Result<T, AwbtrackError>;
