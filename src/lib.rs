//! Toolkit for REST services and small web sites.
//!
//! - [`routing`]: route table with duplicate detection, RESTful resources and
//!   most-specific-first compilation onto an Axum router
//! - [`http`]: handlers, middleware chains, form binding, the server itself
//! - [`views`]: HTML templates loaded from one or more directories, with hot
//!   reload
//! - [`lifecycle`]: termination signals and graceful shutdown
//! - [`config`], [`observability`]: TOML configuration, logging and metrics

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod views;

pub use config::Config;
pub use http::{
    bind, bind_pairs, chain, handler, json, static_files, BindError, Handler, Middleware,
    Modeler, Running, Server, ServerError, Valid, ValidationError,
};
pub use lifecycle::{Shutdown, Signal};
pub use routing::{CompileError, Resource, RouteError, RouteTable};
pub use views::{FuncMap, ViewError, ViewStore, ViewWatcher};
