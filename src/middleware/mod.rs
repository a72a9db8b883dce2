//! Middleware pipeline: the onion around the route table.
//!
//! Each middleware receives the request [`Context`] and a [`Next`] cursor. It
//! may pass the request on, short-circuit with its own [`Response`], or
//! decorate the response coming back. Middleware attached first runs
//! outermost: it sees the request first and the response last. When the
//! chain is exhausted, [`Next::run`] dispatches to the route table.
//!
//! ## Core types
//!
//! - [`Middleware`]: trait implemented by all middleware.
//! - [`Next`]: cursor into the remaining chain.
//! - [`MiddlewareHandler`]: type-erased, cheaply-cloneable middleware function.
//! - [`from_middleware`] / [`from_fn`]: build a [`MiddlewareHandler`].
//! - [`MiddlewareRegistry`] and [`composer`]: priority-ordered registration
//!   performed once at startup.
//!
//! ## Built-in middleware
//!
//! - [`CorsMiddleware`]: CORS headers and preflight handling.
//! - [`StaticFilesMiddleware`]: files under a public root.
//! - [`RoutingMiddleware`]: route dispatch with `405`/`404` answers.

use std::{future::Future, pin::Pin, sync::Arc};

use crate::router::RouteTable;
use crate::{Response, context::Context};

pub mod composer;
pub mod cors;
pub mod registry;
pub mod routing;
pub mod static_files;

pub use composer::{attach, compose};
pub use cors::CorsMiddleware;
pub use registry::{DEFAULT_PRIORITY, MiddlewareEntry, MiddlewareRegistry};
pub use routing::RoutingMiddleware;
pub use static_files::StaticFilesMiddleware;

/// Boxed response future returned by every middleware.
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// A type-erased, reference-counted middleware function.
///
/// The [`Arc`] makes handlers cheap to clone so that [`Next`] can advance
/// through the chain without copying closures.
pub type MiddlewareHandler = Arc<dyn Fn(Context, Next) -> BoxFuture + Send + Sync + 'static>;

/// Converts a [`Middleware`] implementation into a [`MiddlewareHandler`].
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use webwire::middleware::{RoutingMiddleware, from_middleware};
///
/// let handler = from_middleware(Arc::new(RoutingMiddleware::new()));
/// ```
pub fn from_middleware<M>(middleware: Arc<M>) -> MiddlewareHandler
where
    M: Middleware + 'static,
{
    Arc::new(move |ctx: Context, next: Next| middleware.handle(ctx, next))
}

/// Wraps an async closure as a [`MiddlewareHandler`].
///
/// # Examples
///
/// ```rust
/// use webwire::middleware::{Next, from_fn};
///
/// let handler = from_fn(|ctx, next: Next| async move {
///     let mut response = next.run(ctx).await;
///     response.add_header("X-Powered-By", "webwire");
///     response
/// });
/// ```
pub fn from_fn<F, Fut>(f: F) -> MiddlewareHandler
where
    F: Fn(Context, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(move |ctx: Context, next: Next| -> BoxFuture { Box::pin(f(ctx, next)) })
}

/// A cursor into the remaining middleware chain for a single request.
///
/// `Next` is consumed by [`run`](Self::run), so a middleware can forward a
/// request at most once.
pub struct Next {
    middlewares: Arc<[MiddlewareHandler]>,
    routes: Arc<RouteTable>,
    // Index of the middleware invoked by the next `run`.
    index: usize,
}

impl Next {
    /// Creates a cursor positioned at the start of `middlewares`, ending in `routes`.
    pub fn new(middlewares: Arc<[MiddlewareHandler]>, routes: Arc<RouteTable>) -> Self {
        Self {
            middlewares,
            routes,
            index: 0,
        }
    }

    /// The finalized route table at the end of the chain.
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Invokes the next middleware, or dispatches to the route table once the
    /// chain is exhausted.
    pub async fn run(mut self, ctx: Context) -> Response {
        match self.middlewares.get(self.index).cloned() {
            Some(handler) => {
                self.index += 1;
                handler(ctx, self).await
            }
            None => self.routes.dispatch(ctx).await,
        }
    }
}

/// The core trait for all middleware.
///
/// Implementors may:
///
/// - **Pass through**: `next.run(ctx).await` unchanged.
/// - **Short-circuit**: return a [`Response`] without calling `next`.
/// - **Decorate**: call `next`, then modify the response.
///
/// Middleware is shared across tokio tasks, so implementations must be
/// `Send + Sync` and return a `Send` future.
pub trait Middleware: Send + Sync {
    fn handle(&self, ctx: Context, next: Next) -> BoxFuture;
}
