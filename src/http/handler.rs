//! Type-erased request handlers.
//!
//! Every registered route, middleware output and resource action is stored as
//! a [`Handler`]: a cheaply clonable async `Request -> Response` function.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;

type HandlerFn = dyn Fn(Request<Body>) -> BoxFuture<'static, Response> + Send + Sync;

/// An async request handler shared by reference count.
#[derive(Clone)]
pub struct Handler {
    inner: Arc<HandlerFn>,
}

impl Handler {
    /// Wrap an async closure taking the raw request.
    pub fn new<F, Fut, R>(f: F) -> Self
    where
        F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        Self {
            inner: Arc::new(move |req| {
                let fut = f(req);
                Box::pin(async move { fut.await.into_response() })
            }),
        }
    }

    /// Invoke the handler.
    pub fn call(&self, req: Request<Body>) -> BoxFuture<'static, Response> {
        (self.inner)(req)
    }

    #[cfg(test)]
    pub(crate) fn same_as(&self, other: &Handler) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").finish_non_exhaustive()
    }
}

/// Adapt an axum handler function (with extractors) into a [`Handler`].
///
/// ```rust,ignore
/// async fn show(Path(id): Path<u64>) -> String { id.to_string() }
/// server.get("/users/:id", handler(show), &[])?;
/// ```
pub fn handler<H, T>(h: H) -> Handler
where
    H: axum::handler::Handler<T, ()>,
    T: 'static,
{
    Handler::new(move |req| h.clone().call(req, ()))
}
