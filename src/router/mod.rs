//! Router assembly: route registration, finalization and middleware attachment.
//!
//! The [`Router`] is the mutable *assembly-phase* object. Its lifecycle is
//! strictly ordered:
//!
//! 1. [`Router::register_routes`] once per [`RouteProvider`];
//! 2. [`Router::inject_routes`] freezes the route table;
//! 3. [`Router::add_middleware`] attaches middleware in request order;
//! 4. [`Router::into_app`] yields the immutable [`App`] served by the listener.
//!
//! Calls out of that order fail with a [`RouterError`] instead of silently
//! producing a half-built pipeline.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::app::App;
use crate::middleware::MiddlewareHandler;

mod provider;
mod table;

pub use provider::RouteProvider;
pub use table::{Handler, IntoHandler, RouteError, RouteMatch, RouteTable};

/// Errors raised when the router is driven out of order or a provider fails.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("`{operation}` is not allowed after routes were injected")]
    Finalized { operation: &'static str },

    #[error("`{operation}` requires routes to be injected first")]
    NotFinalized { operation: &'static str },

    #[error("route provider `{provider}` failed: {source}")]
    Provider {
        provider: String,
        #[source]
        source: RouteError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Collecting,
    Injected,
}

/// Assembly-phase router.
///
/// # Examples
///
/// ```rust
/// use webwire::{Response, StatusCode};
/// use webwire::router::{RouteError, RouteTable, Router};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut router = Router::new();
/// router.register_routes(&|routes: &mut RouteTable| -> Result<(), RouteError> {
///     routes.get("/ping", |_ctx| async { Response::new(StatusCode::Ok) })?;
///     Ok(())
/// })?;
/// router.inject_routes()?;
///
/// let app = router.into_app()?;
/// assert_eq!(app.routes().len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct Router {
    routes: RouteTable,
    middleware: Vec<MiddlewareHandler>,
    phase: Phase,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: RouteTable::new(),
            middleware: Vec::new(),
            phase: Phase::Collecting,
        }
    }

    /// Lets `provider` register its routes.
    ///
    /// # Errors
    ///
    /// - [`RouterError::Finalized`] once [`inject_routes`](Self::inject_routes) ran.
    /// - [`RouterError::Provider`] if the provider fails; routes it added
    ///   before failing stay in the table, so the caller must abandon the router.
    pub fn register_routes(&mut self, provider: &dyn RouteProvider) -> Result<(), RouterError> {
        if self.phase == Phase::Injected {
            return Err(RouterError::Finalized {
                operation: "register_routes",
            });
        }

        let before = self.routes.len();
        provider
            .register(&mut self.routes)
            .map_err(|source| RouterError::Provider {
                provider: provider.name().to_owned(),
                source,
            })?;

        debug!(
            provider = provider.name(),
            routes = self.routes.len() - before,
            "route provider registered"
        );
        Ok(())
    }

    /// Freezes the route table. A second call is a no-op.
    pub fn inject_routes(&mut self) -> Result<(), RouterError> {
        if self.phase == Phase::Injected {
            debug!("routes already injected");
            return Ok(());
        }
        self.phase = Phase::Injected;
        debug!(routes = self.routes.len(), "routes injected");
        Ok(())
    }

    /// Appends `handler` to the middleware chain.
    ///
    /// Middleware attached first runs outermost.
    ///
    /// # Errors
    ///
    /// [`RouterError::NotFinalized`] before [`inject_routes`](Self::inject_routes).
    pub fn add_middleware(&mut self, handler: MiddlewareHandler) -> Result<(), RouterError> {
        if self.phase != Phase::Injected {
            return Err(RouterError::NotFinalized {
                operation: "add_middleware",
            });
        }
        self.middleware.push(handler);
        Ok(())
    }

    pub fn is_finalized(&self) -> bool {
        self.phase == Phase::Injected
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn middleware_len(&self) -> usize {
        self.middleware.len()
    }

    /// Produces the immutable [`App`].
    ///
    /// # Errors
    ///
    /// [`RouterError::NotFinalized`] before [`inject_routes`](Self::inject_routes).
    pub fn into_app(self) -> Result<App, RouterError> {
        if self.phase != Phase::Injected {
            return Err(RouterError::NotFinalized {
                operation: "into_app",
            });
        }
        Ok(App::new(
            Arc::from(self.middleware),
            Arc::new(self.routes),
        ))
    }
}
