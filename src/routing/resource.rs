//! RESTful resource convention.
//!
//! One [`Resource`] registered at `uri` expands to five routes:
//!
//! ```text
//! One    : GET    uri/:id
//! List   : GET    uri
//! Create : POST   uri
//! Update : PUT    uri/:id
//! Delete : DELETE uri/:id
//! ```

use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;

use crate::http::handler::Handler;

/// The five request operations of a REST resource.
///
/// Implementations can use `async fn` directly; extract path variables with
/// `axum::RequestExt::extract_parts::<Path<_>>()`.
pub trait Resource: Send + Sync + 'static {
    fn create(&self, req: Request<Body>) -> impl Future<Output = Response> + Send;
    fn one(&self, req: Request<Body>) -> impl Future<Output = Response> + Send;
    fn list(&self, req: Request<Body>) -> impl Future<Output = Response> + Send;
    fn update(&self, req: Request<Body>) -> impl Future<Output = Response> + Send;
    fn delete(&self, req: Request<Body>) -> impl Future<Output = Response> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    One,
    List,
    Create,
    Update,
    Delete,
}

impl Action {
    /// Registration order used when expanding a resource.
    pub(crate) const ALL: [Action; 5] = [
        Action::One,
        Action::List,
        Action::Create,
        Action::Update,
        Action::Delete,
    ];

    pub(crate) fn method(self) -> Method {
        match self {
            Action::One | Action::List => Method::GET,
            Action::Create => Method::POST,
            Action::Update => Method::PUT,
            Action::Delete => Method::DELETE,
        }
    }

    /// Route pattern for this action under `base`.
    pub(crate) fn pattern(self, base: &str) -> String {
        match self {
            Action::List | Action::Create => base.to_string(),
            Action::One | Action::Update | Action::Delete => format!("{base}/:id"),
        }
    }

    pub(crate) fn handler<R: Resource>(self, resource: &Arc<R>) -> Handler {
        let resource = Arc::clone(resource);
        Handler::new(move |req| {
            let resource = Arc::clone(&resource);
            async move {
                match self {
                    Action::One => resource.one(req).await,
                    Action::List => resource.list(req).await,
                    Action::Create => resource.create(req).await,
                    Action::Update => resource.update(req).await,
                    Action::Delete => resource.delete(req).await,
                }
            }
        })
    }
}
