//! The immutable, ready-to-serve pipeline.

use std::sync::Arc;

use crate::context::Context;
use crate::middleware::{MiddlewareHandler, Next};
use crate::router::RouteTable;
use crate::{Request, Response};

/// Frozen middleware chain plus route table.
///
/// Produced once by [`Router::into_app`](crate::router::Router::into_app);
/// cloning is cheap and every connection task shares the same chain without
/// locking, since nothing can mutate it any more.
#[derive(Clone)]
pub struct App {
    middlewares: Arc<[MiddlewareHandler]>,
    routes: Arc<RouteTable>,
}

impl App {
    pub(crate) fn new(middlewares: Arc<[MiddlewareHandler]>, routes: Arc<RouteTable>) -> Self {
        Self {
            middlewares,
            routes,
        }
    }

    /// Runs `request` through the middleware chain and the route table.
    pub async fn handle(&self, request: Request) -> Response {
        let next = Next::new(Arc::clone(&self.middlewares), Arc::clone(&self.routes));
        next.run(Context::new(request)).await
    }

    pub fn middleware_len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }
}
