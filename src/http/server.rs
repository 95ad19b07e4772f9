//! HTTP server setup and lifecycle.
//!
//! # Responsibilities
//! - Collect route registrations until `run`
//! - Compile the route table into an Axum Router
//! - Wire up middleware (tracing, limits, request ID, view store)
//! - Bind the listener (plain or TLS) and serve on a background task
//! - Hand the caller the termination-signal channel and a shutdown switch
//!
//! # Design Decisions
//! - `run` binds before spawning, so a taken port is an error the caller sees
//! - Serve-time errors after a successful bind are logged from the task
//! - Signals are only delivered; stopping is the caller's decision

use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use axum::http::Method;
use axum::{Extension, Router};
use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{Config, LimitsConfig, TlsConfig};
use crate::http::handler::Handler;
use crate::http::middleware::Middleware;
use crate::lifecycle::{Shutdown, Signal, TerminationSignals};
use crate::routing::{CompileError, Resource, RouteError, RouteTable};
use crate::views::ViewStore;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("bind {address}: {source}")]
    Bind { address: String, source: io::Error },

    #[error("load TLS certificate/key: {0}")]
    Tls(#[source] io::Error),

    #[error("subscribe to termination signals: {0}")]
    Signals(#[source] io::Error),

    #[error("server task failed: {0}")]
    Task(#[from] JoinError),
}

/// REST server: register routes, then [`Server::run`] once.
#[derive(Debug, Default)]
pub struct Server {
    config: Config,
    routes: RouteTable,
    views: Option<ViewStore>,
}

impl Server {
    /// Create a new server with the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            routes: RouteTable::new(),
            views: None,
        }
    }

    pub fn get(
        &mut self,
        uri: &str,
        handler: Handler,
        middlewares: &[Middleware],
    ) -> Result<(), RouteError> {
        self.add(Method::GET, uri, handler, middlewares)
    }

    pub fn post(
        &mut self,
        uri: &str,
        handler: Handler,
        middlewares: &[Middleware],
    ) -> Result<(), RouteError> {
        self.add(Method::POST, uri, handler, middlewares)
    }

    pub fn put(
        &mut self,
        uri: &str,
        handler: Handler,
        middlewares: &[Middleware],
    ) -> Result<(), RouteError> {
        self.add(Method::PUT, uri, handler, middlewares)
    }

    pub fn delete(
        &mut self,
        uri: &str,
        handler: Handler,
        middlewares: &[Middleware],
    ) -> Result<(), RouteError> {
        self.add(Method::DELETE, uri, handler, middlewares)
    }

    /// Register a route for any method. Methods other than GET, POST, PUT
    /// and DELETE are rejected when the server is compiled.
    pub fn add(
        &mut self,
        method: Method,
        uri: &str,
        handler: Handler,
        middlewares: &[Middleware],
    ) -> Result<(), RouteError> {
        self.routes.add(method, uri, handler, middlewares)
    }

    /// Register the five conventional routes of `resource` under `uri`.
    pub fn resource<R: Resource>(
        &mut self,
        uri: &str,
        resource: R,
        middlewares: &[Middleware],
    ) -> Result<(), RouteError> {
        self.routes.resource(uri, resource, middlewares)
    }

    /// Make `views` available to handlers as `Extension<ViewStore>`.
    pub fn with_views(mut self, views: ViewStore) -> Self {
        self.views = Some(views);
        self
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Compile the routes into a Router carrying all middleware layers,
    /// without binding anything.
    pub fn into_router(mut self) -> Result<Router, CompileError> {
        self.build_router()
    }

    fn build_router(&mut self) -> Result<Router, CompileError> {
        let router = self.routes.compile()?;
        Ok(apply_layers(router, &self.config.limits, self.views.clone()))
    }

    /// Compile, bind `host:port` and start serving in the background.
    ///
    /// Returns as soon as the listener is bound. Port 0 picks a free port;
    /// see [`Running::local_addr`].
    pub async fn run(mut self, port: u16) -> Result<Running, ServerError> {
        let app = self.build_router()?;

        let tls = match &self.config.listener.tls {
            Some(tls) => Some(load_tls_config(tls).await.map_err(ServerError::Tls)?),
            None => None,
        };

        let host = self.config.listener.host.clone();
        let listener = TcpListener::bind((host.as_str(), port))
            .await
            .map_err(|source| ServerError::Bind {
                address: format!("{host}:{port}"),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| ServerError::Bind {
            address: format!("{host}:{port}"),
            source,
        })?;

        let signals = TerminationSignals::listen().map_err(ServerError::Signals)?;
        let shutdown = Shutdown::new();
        let drain = Duration::from_secs(self.config.limits.request_timeout_secs);

        let task = match tls {
            Some(tls) => {
                let listener = listener.into_std().map_err(|source| ServerError::Bind {
                    address: local_addr.to_string(),
                    source,
                })?;
                tokio::spawn(serve_tls(listener, tls, app, shutdown.clone(), drain))
            }
            None => tokio::spawn(serve_plain(listener, app, shutdown.clone())),
        };

        tracing::info!(
            address = %local_addr,
            tls = self.config.listener.tls.is_some(),
            "HTTP server starting"
        );

        Ok(Running {
            local_addr,
            signals,
            shutdown,
            task,
        })
    }
}

/// Handle to a server started by [`Server::run`].
#[derive(Debug)]
pub struct Running {
    local_addr: SocketAddr,
    signals: TerminationSignals,
    shutdown: Shutdown,
    task: JoinHandle<()>,
}

impl Running {
    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The termination-signal channel.
    pub fn signals(&mut self) -> &mut TerminationSignals {
        &mut self.signals
    }

    /// Sender feeding the termination-signal channel.
    pub fn notifier(&self) -> mpsc::Sender<Signal> {
        self.signals.notifier()
    }

    /// Block until a termination signal arrives.
    pub async fn wait_for_signal(&mut self) -> Option<Signal> {
        self.signals.recv().await
    }

    /// Stop accepting connections and wait for in-flight requests to finish.
    pub async fn shutdown(self) -> Result<(), ServerError> {
        tracing::info!(address = %self.local_addr, "Shutting down");
        self.shutdown.trigger();
        self.task.await?;
        Ok(())
    }
}

/// Ambient layers; the last one added runs first.
#[allow(deprecated)]
fn apply_layers(router: Router, limits: &LimitsConfig, views: Option<ViewStore>) -> Router {
    let router = match views {
        Some(views) => router.layer(Extension(views)),
        None => router,
    };
    router
        .layer(RequestBodyLimitLayer::new(limits.max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            limits.request_timeout_secs,
        )))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

async fn serve_plain(listener: TcpListener, app: Router, shutdown: Shutdown) {
    let result = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move { shutdown.notified().await })
        .await;
    if let Err(e) = result {
        tracing::error!(error = %e, "HTTP server failed");
    }
    tracing::info!("HTTP server stopped");
}

async fn serve_tls(
    listener: std::net::TcpListener,
    tls: RustlsConfig,
    app: Router,
    shutdown: Shutdown,
    drain: Duration,
) {
    let handle = axum_server::Handle::new();
    let stopper = handle.clone();
    tokio::spawn(async move {
        shutdown.notified().await;
        stopper.graceful_shutdown(Some(drain));
    });

    let result = axum_server::from_tcp_rustls(listener, tls)
        .handle(handle)
        .serve(app.into_make_service())
        .await;
    if let Err(e) = result {
        tracing::error!(error = %e, "HTTPS server failed");
    }
    tracing::info!("HTTPS server stopped");
}

/// Load TLS configuration from certificate and key files.
async fn load_tls_config(tls: &TlsConfig) -> io::Result<RustlsConfig> {
    let cert_path = Path::new(&tls.cert_path);
    let key_path = Path::new(&tls.key_path);
    if !cert_path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Certificate file not found: {:?}", cert_path),
        ));
    }
    if !key_path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Private key file not found: {:?}", key_path),
        ));
    }
    RustlsConfig::from_pem_file(cert_path, key_path).await
}
