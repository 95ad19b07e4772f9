//! Static file serving under a URL prefix.

use std::path::PathBuf;

use axum::body::Body;
use axum::http::{Request, StatusCode, Uri};
use axum::response::IntoResponse;
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::http::handler::Handler;
use crate::routing::path;

/// Serve files from `dir` for requests under `uri`.
///
/// The `uri` prefix is stripped before the path is resolved against `dir`,
/// so it is meant for a catch-all route:
///
/// ```rust,ignore
/// server.get("/public/*file", static_files("/public", "assets"), &[])?;
/// ```
pub fn static_files(uri: &str, dir: impl Into<PathBuf>) -> Handler {
    let prefix = path::clean(uri);
    let serve = ServeDir::new(dir.into());

    Handler::new(move |req: Request<Body>| {
        let stripped = strip_prefix(req, &prefix);
        let serve = serve.clone();
        async move {
            let Some(req) = stripped else {
                return StatusCode::NOT_FOUND.into_response();
            };
            match serve.oneshot(req).await {
                Ok(res) => res.into_response(),
                Err(never) => match never {},
            }
        }
    })
}

fn strip_prefix(mut req: Request<Body>, prefix: &str) -> Option<Request<Body>> {
    let rest = strip_path(req.uri().path(), prefix)?;
    let path_and_query = match req.uri().query() {
        Some(query) => format!("{rest}?{query}"),
        None => rest,
    };
    *req.uri_mut() = path_and_query.parse::<Uri>().ok()?;
    Some(req)
}

/// `/public/css/a.css` under `/public` → `/css/a.css`.
fn strip_path(path: &str, prefix: &str) -> Option<String> {
    if prefix == "/" {
        return Some(path.to_string());
    }
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() {
        Some("/".to_string())
    } else if rest.starts_with('/') {
        Some(rest.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::Response;

    async fn get(handler: &Handler, uri: &str) -> Response {
        handler
            .call(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    #[test]
    fn test_strip_path() {
        assert_eq!(strip_path("/public/a.css", "/public").as_deref(), Some("/a.css"));
        assert_eq!(strip_path("/public", "/public").as_deref(), Some("/"));
        assert_eq!(strip_path("/publicity", "/public"), None);
        assert_eq!(strip_path("/other/a.css", "/public"), None);
        assert_eq!(strip_path("/a.css", "/").as_deref(), Some("/a.css"));
    }

    #[tokio::test]
    async fn test_serves_files_under_prefix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("css")).unwrap();
        std::fs::write(dir.path().join("css").join("site.css"), "body{}").unwrap();

        let handler = static_files("/public/", dir.path());

        let res = get(&handler, "/public/css/site.css").await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"body{}");

        assert_eq!(
            get(&handler, "/public/missing.css").await.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get(&handler, "/elsewhere/css/site.css").await.status(),
            StatusCode::NOT_FOUND
        );
    }
}
