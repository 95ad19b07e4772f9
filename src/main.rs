//! srest demo server.
//!
//! Serves a home page (rendered from `index.html` when views are
//! configured), a JSON health check, an in-memory `notes` resource and static
//! files under `/public`, then waits for SIGINT/SIGTERM and drains.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use axum::extract::{Extension, Path};
use axum::http::{Request, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::body::Body;
use axum::RequestExt;
use clap::Parser;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use srest::config::{load_config, Config};
use srest::observability::{logging, metrics};
use srest::{
    handler, json, static_files, FuncMap, Middleware, Modeler, Resource, Server, Valid,
    ValidationError, ViewStore, ViewWatcher,
};

#[derive(Parser, Debug)]
#[command(name = "srest", version, about = "REST toolkit demo server")]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on. Overrides `listener.port`.
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory served under /public.
    #[arg(long, default_value = "public")]
    public: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    logging::init(&config.observability);

    tracing::info!("srest v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let views = ViewStore::new();
    // Dropping the watcher stops it, so keep it for the life of main.
    let _watcher = if config.views.dirs.trim().is_empty() {
        None
    } else {
        views.load(&config.views.dirs, FuncMap::default_funcs())?;
        views.set_debug(config.views.debug);
        if config.views.watch {
            Some(ViewWatcher::new(views.clone(), &config.views.dirs).run()?)
        } else {
            None
        }
    };

    let port = cli.port.unwrap_or(config.listener.port);
    let mut server = Server::new(config).with_views(views);
    server.get("/", handler(home), &[access_log()])?;
    server.get("/health", handler(health), &[])?;
    server.resource("/notes", Notes::default(), &[access_log()])?;
    server.get("/public/*file", static_files("/public", &cli.public), &[])?;

    let mut running = server.run(port).await?;
    tracing::info!(address = %running.local_addr(), "Listening for connections");

    if let Some(signal) = running.wait_for_signal().await {
        tracing::info!(signal = %signal, "Stopping");
    }
    running.shutdown().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn access_log() -> Middleware {
    Middleware::from_fn(|req: Request<Body>, next| async move {
        let start = Instant::now();
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let res = next.call(req).await;
        tracing::debug!(
            method = %method,
            path = %path,
            status = res.status().as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Request handled"
        );
        res
    })
}

async fn home(Extension(views): Extension<ViewStore>) -> Response {
    if views.names().is_empty() {
        return Html("<h1>srest</h1>").into_response();
    }
    views
        .render("index.html", minijinja::context! { title => "srest" })
        .into_response()
}

async fn health() -> Response {
    json(&serde_json::json!({ "status": "ok" }))
}

#[derive(Debug, Clone, Serialize)]
struct Note {
    id: u64,
    title: String,
    body: String,
}

#[derive(Debug, Deserialize)]
struct NoteForm {
    title: String,
    #[serde(default)]
    body: String,
}

impl Modeler for NoteForm {
    fn is_valid(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::new("title is required"));
        }
        Ok(())
    }
}

#[derive(Default)]
struct Notes {
    notes: RwLock<BTreeMap<u64, Note>>,
    next_id: AtomicU64,
}

impl Notes {
    fn insert(&self, form: NoteForm) -> Note {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let note = Note {
            id,
            title: form.title,
            body: form.body,
        };
        self.notes.write().insert(id, note.clone());
        note
    }
}

async fn note_id(req: &mut Request<Body>) -> Result<u64, Response> {
    req.extract_parts::<Path<u64>>()
        .await
        .map(|Path(id)| id)
        .map_err(IntoResponse::into_response)
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "note not found").into_response()
}

impl Resource for Notes {
    async fn create(&self, req: Request<Body>) -> Response {
        match req.extract::<Valid<NoteForm>, _>().await {
            Ok(Valid(form)) => (StatusCode::CREATED, json(&self.insert(form))).into_response(),
            Err(rejection) => rejection.into_response(),
        }
    }

    async fn one(&self, mut req: Request<Body>) -> Response {
        let id = match note_id(&mut req).await {
            Ok(id) => id,
            Err(res) => return res,
        };
        let note = self.notes.read().get(&id).cloned();
        match note {
            Some(note) => json(&note),
            None => not_found(),
        }
    }

    async fn list(&self, _req: Request<Body>) -> Response {
        let notes: Vec<Note> = self.notes.read().values().cloned().collect();
        json(&notes)
    }

    async fn update(&self, mut req: Request<Body>) -> Response {
        let id = match note_id(&mut req).await {
            Ok(id) => id,
            Err(res) => return res,
        };
        let form = match req.extract::<Valid<NoteForm>, _>().await {
            Ok(Valid(form)) => form,
            Err(rejection) => return rejection.into_response(),
        };
        let updated = self.notes.write().get_mut(&id).map(|note| {
            note.title = form.title;
            note.body = form.body;
            note.clone()
        });
        match updated {
            Some(note) => json(&note),
            None => not_found(),
        }
    }

    async fn delete(&self, mut req: Request<Body>) -> Response {
        let id = match note_id(&mut req).await {
            Ok(id) => id,
            Err(res) => return res,
        };
        let removed = self.notes.write().remove(&id);
        match removed {
            Some(_) => StatusCode::NO_CONTENT.into_response(),
            None => not_found(),
        }
    }
}
