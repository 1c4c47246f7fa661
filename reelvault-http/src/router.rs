//! Registration-time route table.
//!
//! Routes are appended during server construction and the table is read-only
//! afterwards, so concurrent sessions dispatch against it without locking.

use std::collections::HashMap;
use std::sync::Arc;

use crate::request::{Method, Request};
use crate::response::Outcome;

/// A route handler. Dispatch is synchronous: handlers compute an `Outcome`
/// and never write to the connection themselves.
pub type Handler = Arc<dyn Fn(&Request) -> Outcome + Send + Sync>;

#[derive(Default)]
pub struct Router {
    routes: HashMap<(Method, String), Handler>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for an exact `(method, path)` pair.
    pub fn register<F>(&mut self, method: Method, path: &str, handler: F)
    where
        F: Fn(&Request) -> Outcome + Send + Sync + 'static,
    {
        self.routes
            .insert((method, path.to_string()), Arc::new(handler));
    }

    /// Dispatch a request, falling back to the built-in not-found handler.
    ///
    /// A HEAD request with no handler of its own dispatches to the GET
    /// handler for the same path; the translator strips the body afterwards,
    /// so HEAD mirrors GET's status and headers.
    pub fn dispatch(&self, request: &Request) -> Outcome {
        let handler = self
            .lookup(request.method(), request.path())
            .or_else(|| match request.method() {
                Method::Head => self.lookup(Method::Get, request.path()),
                _ => None,
            });
        match handler {
            Some(handler) => handler(request),
            None => Outcome::NotFound(format!("Route {} is not found.", request.path())),
        }
    }

    fn lookup(&self, method: Method, path: &str) -> Option<&Handler> {
        self.routes.get(&(method, path.to_string()))
    }
}
