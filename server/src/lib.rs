//! HTTP and WebSocket front end for the awbtrack job engine.
//!
//! Uploads create jobs, control requests pause, resume or cancel them, and
//! every engine event is streamed to connected viewers over `/ws`.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod ws;

pub use routes::app;
pub use state::AppState;
