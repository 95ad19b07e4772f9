//! View loading and rendering errors.

use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Body written when a render names a template that is not loaded.
pub const NOT_FOUND_BODY: &str = "template view not found";

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("template not found: {0}")]
    NotFound(String),

    #[error("no template directories given")]
    NoDirectories,

    #[error("views were never loaded")]
    NotLoaded,

    #[error("empty file: {}", .0.display())]
    EmptyFile(PathBuf),

    #[error("walk {}: {source}", root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse template {name}: {source}")]
    Parse {
        name: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("render template {name}: {source}")]
    Render {
        name: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("write response: {0}")]
    Write(#[source] std::io::Error),
}

impl ViewError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ViewError::NotFound(_))
    }
}

impl IntoResponse for ViewError {
    fn into_response(self) -> Response {
        match &self {
            ViewError::NotFound(name) => {
                tracing::warn!(template = %name, "Template not found");
                (StatusCode::INTERNAL_SERVER_ERROR, NOT_FOUND_BODY).into_response()
            }
            other => {
                tracing::error!(error = %other, "Render failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
        }
    }
}
