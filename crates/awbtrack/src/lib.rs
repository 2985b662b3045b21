pub mod broadcast;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod export;
pub mod identifier;
pub mod logging;
pub mod lookup;
pub mod model;
pub mod rows;
pub mod store;

pub use broadcast::{EventBroadcaster, EventSink, JobEmitter, LogLevel, TrackEvent};
pub use config::{load_config, load_config_from_str, Config};
pub use db::Database;
pub use engine::{ControlAction, JobEngine, PacingInterval};
pub use error::{
    AwbtrackError, ConfigError, ControlError, EngineError, ExportError, LookupError, Result,
    RowSourceError, StoreError,
};
pub use export::{push_to_sheet, results_to_csv, SheetSink};
pub use identifier::{split_waybill, WaybillKey};
pub use lookup::{HttpLookup, Lookup};
pub use model::{Job, JobId, JobStatus, ShipmentRecord, TrackingResult};
pub use rows::{RowSet, RowSourceRegistry, SheetFormat};
pub use store::{JobStore, MemoryJobStore, SqliteJobStore};
