//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (setup phase, one task):
//!     add(method, uri, handler, middlewares)
//!     → path.rs (clean, dedup key)
//!     → duplicate? → RouteError::Duplicate
//!     → middleware chain applied, Route appended
//!     resource(uri, R) → five add() calls
//!
//! Compilation (once, from Server::run):
//!     Route[]
//!     → sort by dedup key, descending (specific before general)
//!     → validate method, path, conflicts
//!     → bind to axum::Router ({name} / {*name} syntax)
//!     → table emptied
//! ```
//!
//! # Design Decisions
//! - Duplicate definitions are a returned error, not a panic; the entry point
//!   decides to abort
//! - Routes are frozen once compiled
//! - Deterministic: same registrations always compile to the same router

pub mod error;
pub mod path;
pub mod resource;
pub mod table;

pub use error::{CompileError, RouteError};
pub use resource::Resource;
pub use table::{Route, RouteTable};
