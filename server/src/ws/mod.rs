//! WebSocket event stream.
//!
//! Every connection subscribes to the broadcaster and receives every event
//! as a JSON text frame; viewers filter by job id themselves.

mod handler;
mod heartbeat;

pub use handler::ws_handler;
pub use heartbeat::HEARTBEAT_INTERVAL_SECS;
