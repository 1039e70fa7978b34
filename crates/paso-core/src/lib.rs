//! Core library for Paso — the embedded SQLite store, domain types,
//! configuration, logging, and the shared shutdown/retry primitives used by
//! both the daemon and the CLI/TUI front ends.

pub mod config;
pub mod error;
pub mod logging;
pub mod retry;
pub mod shutdown;
pub mod store;
pub mod types;

pub use error::PasoError;
pub use store::Store;
