//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, ambient layers: request ID, trace, timeout, body limit)
//!     → compiled route (routing::RouteTable)
//!     → middleware.rs chain → handler.rs Handler
//!     → bind.rs (form → validated model), response.rs (JSON), static_files.rs
//!     → Send to client
//! ```

pub mod bind;
pub mod handler;
pub mod middleware;
pub mod response;
pub mod server;
pub mod static_files;

pub use bind::{bind, bind_pairs, BindError, Modeler, Valid, ValidationError};
pub use handler::{handler, Handler};
pub use middleware::{chain, Middleware};
pub use response::{json, JSON_CONTENT_TYPE};
pub use server::{Running, Server, ServerError};
pub use static_files::static_files;
