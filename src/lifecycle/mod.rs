//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → buffered channel returned by Server::run
//!     → caller decides when to stop
//!
//! Shutdown (shutdown.rs):
//!     Running::shutdown() → trigger → stop accepting → drain in-flight → exit
//! ```
//!
//! # Design Decisions
//! - Signals are advisory; only an explicit shutdown stops the listener
//! - Shutdown drains in-flight requests before the serving task ends

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::{Signal, TerminationSignals};
