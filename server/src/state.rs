use std::sync::Arc;

use awbtrack::config::DatabaseLocation;
use awbtrack::{
    AwbtrackError, Config, EventBroadcaster, HttpLookup, JobEngine, JobStore, Lookup,
    MemoryJobStore, RowSourceRegistry, SqliteJobStore,
};

/// Shared application state available to all handlers via `State<AppState>`.
///
/// Cheap to clone; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub engine: JobEngine,
    /// Fan-out of engine events to WebSocket viewers.
    pub broadcaster: Arc<EventBroadcaster>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Opens the configured store and lookup gateway and wires the engine.
    pub fn build(config: Config) -> Result<Self, AwbtrackError> {
        let store: Arc<dyn JobStore> = match config.database.location() {
            DatabaseLocation::Memory => {
                tracing::warn!("Using in-memory job store, jobs are lost on restart");
                Arc::new(MemoryJobStore::new())
            }
            DatabaseLocation::File(path) => {
                tracing::info!(path = %path.display(), "Opening job database");
                Arc::new(SqliteJobStore::open(&path)?)
            }
        };
        let lookup = HttpLookup::new(&config.lookup.endpoint, config.lookup.timeout())?;
        tracing::info!(endpoint = lookup.endpoint(), "Tracking gateway configured");

        Ok(Self::with_parts(config, store, Arc::new(lookup)))
    }

    pub fn with_parts(config: Config, store: Arc<dyn JobStore>, lookup: Arc<dyn Lookup>) -> Self {
        let broadcaster = Arc::new(EventBroadcaster::new(config.engine.event_buffer));
        let engine = JobEngine::new(
            store,
            lookup,
            broadcaster.clone(),
            RowSourceRegistry::new(&config.engine.identifier_column),
        );

        Self {
            engine,
            broadcaster,
            config: Arc::new(config),
        }
    }
}
