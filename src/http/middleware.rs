//! Middleware composition.
//!
//! A [`Middleware`] turns one [`Handler`] into another. [`chain`] stacks a
//! list of them around a terminal handler so that declaration order equals
//! execution order on the way in:
//!
//! ```text
//! chain(T, [A, B])  ==  A(B(T))
//! request  → A pre → B pre → T → B post → A post → response
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::IntoResponse;

use crate::http::handler::Handler;

type WrapFn = dyn Fn(Handler) -> Handler + Send + Sync;

/// A handler wrapper, cloned into every route it is attached to.
#[derive(Clone)]
pub struct Middleware {
    wrap: Arc<WrapFn>,
}

impl Middleware {
    /// Build a middleware from a `Handler -> Handler` function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Handler) -> Handler + Send + Sync + 'static,
    {
        Self { wrap: Arc::new(f) }
    }

    /// Build a middleware from an async function receiving the request and
    /// the next handler, in the style of `axum::middleware::from_fn`.
    pub fn from_fn<F, Fut, R>(f: F) -> Self
    where
        F: Fn(Request<Body>, Handler) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        let f = Arc::new(f);
        Self::new(move |next| {
            let f = Arc::clone(&f);
            Handler::new(move |req| f(req, next.clone()))
        })
    }

    /// Wrap a handler.
    pub fn wrap(&self, handler: Handler) -> Handler {
        (self.wrap)(handler)
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware").finish_non_exhaustive()
    }
}

/// Compose `middlewares` around `terminal`.
///
/// The last middleware becomes the innermost wrapper, the first the
/// outermost. An empty list returns `terminal` untouched.
pub fn chain(terminal: Handler, middlewares: &[Middleware]) -> Handler {
    if middlewares.is_empty() {
        return terminal;
    }
    middlewares
        .iter()
        .rev()
        .fold(terminal, |inner, middleware| middleware.wrap(inner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::Response;
    use std::sync::Mutex;

    fn request() -> Request<Body> {
        Request::builder().uri("/").body(Body::empty()).unwrap()
    }

    async fn body_string(res: Response) -> String {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn prefixing(text: &'static str) -> Middleware {
        Middleware::from_fn(move |req, next: Handler| async move {
            let res = next.call(req).await;
            format!("{text}{}", body_string(res).await)
        })
    }

    fn recording(log: Arc<Mutex<Vec<String>>>, name: &'static str) -> Middleware {
        Middleware::from_fn(move |req, next: Handler| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(format!("{name} pre"));
                let res = next.call(req).await;
                log.lock().unwrap().push(format!("{name} post"));
                res
            }
        })
    }

    #[tokio::test]
    async fn test_empty_chain_returns_terminal() {
        let terminal = Handler::new(|_req| async { "true" });
        let chained = chain(terminal.clone(), &[]);
        assert!(chained.same_as(&terminal));
    }

    #[tokio::test]
    async fn test_declaration_order_is_execution_order() {
        let terminal = Handler::new(|_req| async { "true" });
        let h = chain(terminal, &[prefixing("one"), prefixing("two")]);
        assert_eq!(body_string(h.call(request()).await).await, "onetwotrue");
    }

    #[tokio::test]
    async fn test_onion_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let terminal_log = Arc::clone(&log);
        let terminal = Handler::new(move |_req| {
            terminal_log.lock().unwrap().push("T".to_string());
            async { "done" }
        });
        let h = chain(
            terminal,
            &[recording(Arc::clone(&log), "A"), recording(Arc::clone(&log), "B")],
        );
        h.call(request()).await;
        assert_eq!(
            *log.lock().unwrap(),
            vec!["A pre", "B pre", "T", "B post", "A post"]
        );
    }

    #[tokio::test]
    async fn test_middleware_can_short_circuit() {
        let terminal = Handler::new(|_req| async { "unreachable" });
        let deny = Middleware::from_fn(|_req, _next: Handler| async {
            axum::http::StatusCode::BAD_REQUEST
        });
        let res = chain(terminal, &[deny]).call(request()).await;
        assert_eq!(res.status(), axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(body_string(res).await, "");
    }
}
