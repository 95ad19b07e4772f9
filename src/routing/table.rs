//! Route registration and compilation.
//!
//! # Responsibilities
//! - Store (method, pattern) → handler entries during setup
//! - Reject duplicate definitions at registration time
//! - Expand resources into their five conventional routes
//! - Sort specific patterns first and bind everything to an `axum::Router`
//!
//! # Design Decisions
//! - Registration happens on one task before serving starts; the table holds
//!   no locks
//! - Compile never panics: conflicts the multiplexer would reject are found
//!   with `matchit` first and returned as [`CompileError`]
//! - After a successful compile the table is emptied to release memory

use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::routing::{on, MethodFilter};
use axum::Router;

use crate::http::handler::Handler;
use crate::http::middleware::{chain, Middleware};
use crate::observability::metrics;
use crate::routing::error::{CompileError, RouteError};
use crate::routing::path;
use crate::routing::resource::{Action, Resource};

/// One registered route.
#[derive(Debug, Clone)]
pub struct Route {
    pub method: Method,
    pub pattern: String,
    handler: Handler,
}

impl Route {
    pub fn handler(&self) -> &Handler {
        &self.handler
    }
}

/// Append-only registry of routes, compiled once into an `axum::Router`.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
    keys: HashSet<String>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` wrapped in `middlewares` for `method` and `uri`.
    ///
    /// GET routes also answer on `uri + "/"` (except `/` and catch-all
    /// patterns), so both trailing-slash conventions reach the handler.
    ///
    /// Duplicates are detected per method, but all methods share one path
    /// tree: `GET /users/:id` and `PUT /users/:uid` register fine yet fail
    /// [`RouteTable::compile`] with [`CompileError::Conflict`]. Use the same
    /// variable name at the same position across methods.
    pub fn add(
        &mut self,
        method: Method,
        uri: &str,
        handler: Handler,
        middlewares: &[Middleware],
    ) -> Result<(), RouteError> {
        let pattern = path::clean(uri);
        if !self.keys.insert(dedup_key(&method, &pattern)) {
            return Err(RouteError::Duplicate {
                method,
                uri: pattern,
            });
        }
        self.push(method, pattern, chain(handler, middlewares));
        Ok(())
    }

    /// Register the five conventional routes of `resource` under `uri`,
    /// all sharing `middlewares`.
    ///
    /// Either every route is registered or, on a duplicate, none is.
    pub fn resource<R: Resource>(
        &mut self,
        uri: &str,
        resource: R,
        middlewares: &[Middleware],
    ) -> Result<(), RouteError> {
        let planned: Vec<(Action, String)> = Action::ALL
            .into_iter()
            .map(|action| (action, path::clean(&action.pattern(uri))))
            .collect();

        let mut pending = HashSet::new();
        for (action, pattern) in &planned {
            let key = dedup_key(&action.method(), pattern);
            if self.keys.contains(&key) || !pending.insert(key) {
                return Err(RouteError::Duplicate {
                    method: action.method(),
                    uri: pattern.clone(),
                });
            }
        }

        let resource = Arc::new(resource);
        self.keys.extend(pending);
        for (action, pattern) in planned {
            let handler = chain(action.handler(&resource), middlewares);
            self.push(action.method(), pattern, handler);
        }
        Ok(())
    }

    fn push(&mut self, method: Method, pattern: String, handler: Handler) {
        if method == Method::GET && pattern != "/" && !path::ends_with_catch_all(&pattern) {
            self.routes.push(Route {
                method: method.clone(),
                pattern: format!("{pattern}/"),
                handler: handler.clone(),
            });
        }

        tracing::debug!(method = %method, pattern = %pattern, "Route registered");
        self.routes.push(Route {
            method,
            pattern,
            handler,
        });
    }

    /// Pending routes in registration order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Sort the table most-specific-first and bind every route to a new
    /// `axum::Router`.
    ///
    /// On success the table is emptied; calling it again yields an empty
    /// router.
    pub fn compile(&mut self) -> Result<Router, CompileError> {
        self.routes
            .sort_by_cached_key(|route| Reverse(path::normalize_for_dedup(&route.pattern)));

        let mut checker = matchit::Router::new();
        let mut seen = HashSet::new();
        let mut bound = HashSet::new();
        let mut router = Router::new();

        for route in &self.routes {
            let filter = method_filter(&route.method)?;
            let router_path = path::to_router_syntax(&route.pattern);
            if !router_path.starts_with('/') {
                return Err(CompileError::InvalidPath {
                    pattern: route.pattern.clone(),
                });
            }
            if seen.insert(router_path.clone()) {
                checker
                    .insert(router_path.clone(), ())
                    .map_err(|e| CompileError::Conflict {
                        pattern: route.pattern.clone(),
                        reason: e.to_string(),
                    })?;
            }
            // Distinct patterns such as `/a/:id` and a literal `/a/{id}` can
            // land on the same router path.
            if !bound.insert((route.method.clone(), router_path.clone())) {
                return Err(CompileError::Conflict {
                    pattern: route.pattern.clone(),
                    reason: format!("{} {router_path} is already bound", route.method),
                });
            }
            router = router.route(&router_path, on(filter, endpoint(route)));
        }

        tracing::info!(routes = self.routes.len(), "Routes compiled");
        self.routes = Vec::new();
        self.keys = HashSet::new();
        Ok(router)
    }
}

fn dedup_key(method: &Method, pattern: &str) -> String {
    format!("{}:{}", method, path::normalize_for_dedup(pattern))
}

fn method_filter(method: &Method) -> Result<MethodFilter, CompileError> {
    match *method {
        Method::GET => Ok(MethodFilter::GET),
        Method::POST => Ok(MethodFilter::POST),
        Method::PUT => Ok(MethodFilter::PUT),
        Method::DELETE => Ok(MethodFilter::DELETE),
        _ => Err(CompileError::UnsupportedMethod(method.clone())),
    }
}

/// Axum endpoint that runs the route's handler and records request metrics.
fn endpoint(
    route: &Route,
) -> impl Fn(Request<Body>) -> futures_util::future::BoxFuture<'static, axum::response::Response>
       + Clone
       + Send
       + Sync
       + 'static {
    let handler = route.handler.clone();
    let pattern: Arc<str> = Arc::from(route.pattern.as_str());
    move |req: Request<Body>| {
        let handler = handler.clone();
        let pattern = Arc::clone(&pattern);
        Box::pin(async move {
            let start = Instant::now();
            let method = req.method().to_string();
            let res = handler.call(req).await;
            metrics::record_request(&method, res.status().as_u16(), &pattern, start);
            res
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::Response;
    use tower::ServiceExt;

    fn text(body: &'static str) -> Handler {
        Handler::new(move |_req| async move { body })
    }

    async fn get(router: Router, uri: &str) -> (u16, String) {
        send(router, Method::GET, uri).await
    }

    async fn send(router: Router, method: Method, uri: &str) -> (u16, String) {
        let res: Response = router
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status().as_u16();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn test_duplicate_is_rejected() {
        let mut table = RouteTable::new();
        table.add(Method::GET, "/me/:id/name", text("a"), &[]).unwrap();
        let err = table
            .add(Method::GET, "/me/:x/name", text("b"), &[])
            .unwrap_err();
        assert_eq!(
            err,
            RouteError::Duplicate {
                method: Method::GET,
                uri: "/me/:x/name".to_string()
            }
        );
    }

    #[test]
    fn test_same_pattern_different_method_is_allowed() {
        let mut table = RouteTable::new();
        table.add(Method::GET, "/items", text("a"), &[]).unwrap();
        table.add(Method::POST, "/items", text("b"), &[]).unwrap();
        assert!(table.add(Method::POST, "/items/", text("c"), &[]).is_err());
    }

    #[test]
    fn test_get_registers_trailing_slash_twin() {
        let mut table = RouteTable::new();
        table.add(Method::GET, "/items", text("a"), &[]).unwrap();
        table.add(Method::GET, "/", text("root"), &[]).unwrap();
        table.add(Method::POST, "/items", text("b"), &[]).unwrap();
        table.add(Method::GET, "/files/*path", text("f"), &[]).unwrap();

        let patterns: Vec<(String, String)> = table
            .routes()
            .iter()
            .map(|r| (r.method.to_string(), r.pattern.clone()))
            .collect();
        assert_eq!(
            patterns,
            vec![
                ("GET".to_string(), "/items/".to_string()),
                ("GET".to_string(), "/items".to_string()),
                ("GET".to_string(), "/".to_string()),
                ("POST".to_string(), "/items".to_string()),
                ("GET".to_string(), "/files/*path".to_string()),
            ]
        );
    }

    #[test]
    fn test_compile_rejects_unsupported_method() {
        let mut table = RouteTable::new();
        table.add(Method::PATCH, "/items", text("a"), &[]).unwrap();
        assert_eq!(
            table.compile().unwrap_err(),
            CompileError::UnsupportedMethod(Method::PATCH)
        );
    }

    #[test]
    fn test_compile_rejects_relative_pattern() {
        let mut table = RouteTable::new();
        table.add(Method::POST, "items", text("a"), &[]).unwrap();
        assert!(matches!(
            table.compile(),
            Err(CompileError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_compile_reports_conflicts() {
        let mut table = RouteTable::new();
        table.add(Method::PUT, "/me/:id", text("a"), &[]).unwrap();
        table.add(Method::DELETE, "/me/:other", text("b"), &[]).unwrap();
        assert!(matches!(
            table.compile(),
            Err(CompileError::Conflict { .. })
        ));
    }

    #[test]
    fn test_failed_resource_registers_nothing() {
        struct Nop;
        impl Resource for Nop {
            async fn create(&self, _req: Request<Body>) -> Response {
                Response::default()
            }
            async fn one(&self, _req: Request<Body>) -> Response {
                Response::default()
            }
            async fn list(&self, _req: Request<Body>) -> Response {
                Response::default()
            }
            async fn update(&self, _req: Request<Body>) -> Response {
                Response::default()
            }
            async fn delete(&self, _req: Request<Body>) -> Response {
                Response::default()
            }
        }

        let mut table = RouteTable::new();
        table.add(Method::POST, "/r", text("taken"), &[]).unwrap();
        let err = table.resource("/r", Nop, &[]).unwrap_err();
        assert_eq!(
            err,
            RouteError::Duplicate {
                method: Method::POST,
                uri: "/r".to_string()
            }
        );
        assert_eq!(table.len(), 1);

        // No keys leaked either: the GET routes are still free.
        table.add(Method::GET, "/r", text("list"), &[]).unwrap();
        table.add(Method::GET, "/r/:id", text("one"), &[]).unwrap();
    }

    #[test]
    fn test_compile_reports_same_router_path_twice() {
        let mut table = RouteTable::new();
        table.add(Method::GET, "/a/{id}", text("a"), &[]).unwrap();
        table.add(Method::GET, "/a/:id", text("b"), &[]).unwrap();
        assert!(matches!(
            table.compile(),
            Err(CompileError::Conflict { .. })
        ));
    }

    #[test]
    fn test_variable_names_are_shared_across_methods() {
        let mut table = RouteTable::new();
        table.add(Method::GET, "/users/:id", text("a"), &[]).unwrap();
        table.add(Method::PUT, "/users/:uid", text("b"), &[]).unwrap();
        assert!(matches!(
            table.compile(),
            Err(CompileError::Conflict { .. })
        ));

        let mut table = RouteTable::new();
        table.add(Method::GET, "/users/:id", text("a"), &[]).unwrap();
        table.add(Method::PUT, "/users/:id", text("b"), &[]).unwrap();
        assert!(table.compile().is_ok());
    }

    #[test]
    fn test_compile_releases_table() {
        let mut table = RouteTable::new();
        table.add(Method::GET, "/items", text("a"), &[]).unwrap();
        table.compile().unwrap();
        assert!(table.is_empty());
        // Keys are released too, so the same route can be registered again.
        table.add(Method::GET, "/items", text("a"), &[]).unwrap();
    }

    #[tokio::test]
    async fn test_trailing_slash_routes_to_same_handler() {
        let mut table = RouteTable::new();
        table.add(Method::GET, "/items", text("items"), &[]).unwrap();
        let router = table.compile().unwrap();
        assert_eq!(get(router.clone(), "/items").await, (200, "items".to_string()));
        assert_eq!(get(router, "/items/").await, (200, "items".to_string()));
    }

    #[tokio::test]
    async fn test_specific_routes_win_in_any_order() {
        let orders = [
            ["/me", "/me/:id", "/me/:id/name"],
            ["/me/:id/name", "/me/:id", "/me"],
            ["/me/:id", "/me/:id/name", "/me"],
        ];
        for order in orders {
            let mut table = RouteTable::new();
            for pattern in order {
                table.add(Method::GET, pattern, text(pattern), &[]).unwrap();
            }
            let router = table.compile().unwrap();
            assert_eq!(
                get(router.clone(), "/me/2/name").await,
                (200, "/me/:id/name".to_string())
            );
            assert_eq!(get(router.clone(), "/me/2").await, (200, "/me/:id".to_string()));
            assert_eq!(get(router, "/me").await, (200, "/me".to_string()));
        }
    }

    #[tokio::test]
    async fn test_method_mismatch_is_not_routed() {
        let mut table = RouteTable::new();
        table.add(Method::POST, "/items", text("created"), &[]).unwrap();
        let router = table.compile().unwrap();
        assert_eq!(send(router.clone(), Method::POST, "/items").await.0, 200);
        assert_eq!(send(router, Method::GET, "/items").await.0, 405);
    }
}
