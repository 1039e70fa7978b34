//! Paso's event fabric: the wire protocol, the bounded broadcast bus, the
//! Unix-socket daemon server, and the reconnecting client library.

pub mod client;
pub mod daemon;
pub mod event_bus;
pub mod metrics;
pub mod protocol;

pub use client::EventClient;
pub use daemon::Daemon;
pub use event_bus::EventBus;
pub use metrics::Metrics;
pub use protocol::{EventEnvelope, EventType, Message, MessageBody, PROTOCOL_VERSION};
