//! Route configuration errors.
//!
//! Both kinds are programming mistakes in route setup: callers are expected
//! to propagate them out of the setup phase and abort the process.

use axum::http::Method;
use thiserror::Error;

/// Rejected route registration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    /// Another route with the same method and variable-normalized pattern
    /// already exists.
    #[error("duplicated definition: {method} {uri}")]
    Duplicate { method: Method, uri: String },
}

/// Failure while handing the route table to the multiplexer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    #[error("method not found: {0}")]
    UnsupportedMethod(Method),

    #[error("invalid route pattern {pattern:?}: must start with '/'")]
    InvalidPath { pattern: String },

    #[error("route {pattern:?} conflicts with an existing route: {reason}")]
    Conflict { pattern: String, reason: String },
}
