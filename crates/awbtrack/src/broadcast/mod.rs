//! Fan-out of job events to live viewers.
//!
//! The engine publishes every [`TrackEvent`] through an [`EventSink`]. The
//! [`EventBroadcaster`] delivers each event to every connected subscriber;
//! viewers filter by job id themselves. Delivery is best-effort and never
//! blocks the publisher.

pub mod broadcaster;
pub mod emitter;
pub mod event;

pub use broadcaster::{EventBroadcaster, EventSink, SubscriberId};
pub use emitter::JobEmitter;
pub use event::{LogLevel, TrackEvent};
