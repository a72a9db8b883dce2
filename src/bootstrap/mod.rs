//! Startup wiring: configuration, route providers and middleware into a
//! served pipeline.
//!
//! [`Bootstrap::build`] performs, in order:
//!
//! 1. configuration normalization and validation;
//! 2. route registration for every provider, then route injection;
//! 3. registration of the built-in middleware (CORS and static files when
//!    enabled, routing always), followed by user middleware;
//! 4. priority composition, attachment and the switch to the immutable [`App`].
//!
//! [`Bootstrap::bind`] additionally loads the TLS certificate (if any) and
//! binds the listener. Any failure aborts startup with nothing listening.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::app::App;
use crate::config::{Config, ConfigError};
use crate::middleware::{
    CorsMiddleware, DEFAULT_PRIORITY, MiddlewareHandler, MiddlewareRegistry, RoutingMiddleware,
    StaticFilesMiddleware, attach, from_middleware,
};
use crate::router::{RouteProvider, Router, RouterError};
use crate::server::{Server, ServerError};

/// Fatal startup failures.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Router(#[from] RouterError),

    #[error(transparent)]
    Server(#[from] ServerError),
}

/// The middleware the bootstrap registers on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Cors,
    StaticFiles,
    Routing,
}

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Cors => "cors",
            Builtin::StaticFiles => "static",
            Builtin::Routing => "routing",
        }
    }
}

struct UserMiddleware {
    name: String,
    handler: MiddlewareHandler,
    priority: i32,
}

/// Builder collecting everything needed to start serving.
///
/// # Examples
///
/// ```rust
/// use webwire::{Bootstrap, Config, Response, StatusCode};
/// use webwire::router::{RouteError, RouteTable};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let app = Bootstrap::new(Config::default())
///     .route_provider(|routes: &mut RouteTable| -> Result<(), RouteError> {
///         routes.get("/health", |_ctx| async { Response::new(StatusCode::Ok) })?;
///         Ok(())
///     })
///     .build()?;
///
/// assert_eq!(app.routes().len(), 1);
/// assert_eq!(app.middleware_len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct Bootstrap {
    config: Config,
    providers: Vec<Box<dyn RouteProvider>>,
    middleware: Vec<UserMiddleware>,
    cors_priority: i32,
    static_priority: i32,
    routing_priority: i32,
}

impl Bootstrap {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            providers: Vec::new(),
            middleware: Vec::new(),
            cors_priority: DEFAULT_PRIORITY,
            static_priority: DEFAULT_PRIORITY,
            routing_priority: DEFAULT_PRIORITY,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Adds a route provider. Providers run in the order added.
    #[must_use]
    pub fn route_provider(mut self, provider: impl RouteProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Adds user middleware, registered after the built-ins.
    ///
    /// The routing middleware is terminal, so user middleware must have a
    /// lower priority than it (default `10`) to run at all.
    #[must_use]
    pub fn middleware(
        mut self,
        name: impl Into<String>,
        handler: MiddlewareHandler,
        priority: i32,
    ) -> Self {
        self.middleware.push(UserMiddleware {
            name: name.into(),
            handler,
            priority,
        });
        self
    }

    /// Overrides the priority of a built-in middleware.
    #[must_use]
    pub fn builtin_priority(mut self, builtin: Builtin, priority: i32) -> Self {
        match builtin {
            Builtin::Cors => self.cors_priority = priority,
            Builtin::StaticFiles => self.static_priority = priority,
            Builtin::Routing => self.routing_priority = priority,
        }
        self
    }

    /// Runs the composition and returns the immutable pipeline.
    ///
    /// The configuration is normalized first, so one assembled in code gets
    /// the same set semantics as one loaded from a file.
    pub fn build(mut self) -> Result<App, BootstrapError> {
        self.config.normalize();
        self.config.validate()?;

        let mut router = Router::new();
        for provider in &self.providers {
            router.register_routes(provider.as_ref())?;
        }
        router.inject_routes()?;

        let mut registry = MiddlewareRegistry::new();
        if self.config.cors.enabled {
            let cors = CorsMiddleware::from_config(&self.config.cors);
            registry.register_with_priority(
                Builtin::Cors.name(),
                from_middleware(Arc::new(cors)),
                self.cors_priority,
            );
        }
        if self.config.static_files.enabled {
            let statics = StaticFilesMiddleware::from_config(&self.config.static_files);
            registry.register_with_priority(
                Builtin::StaticFiles.name(),
                from_middleware(Arc::new(statics)),
                self.static_priority,
            );
        }
        registry.register_with_priority(
            Builtin::Routing.name(),
            from_middleware(Arc::new(RoutingMiddleware::new())),
            self.routing_priority,
        );

        for user in self.middleware {
            if user.priority >= self.routing_priority {
                warn!(
                    middleware = %user.name,
                    priority = user.priority,
                    routing_priority = self.routing_priority,
                    "middleware is ordered after routing and will never run"
                );
            }
            registry.register_with_priority(user.name, user.handler, user.priority);
        }

        let attached = attach(&mut router, registry.into_entries())?;
        let app = router.into_app()?;
        info!(
            routes = app.routes().len(),
            middleware = attached,
            "pipeline ready"
        );
        Ok(app)
    }

    /// Builds the pipeline, then loads TLS and binds the listener.
    pub async fn bind(self) -> Result<Service, BootstrapError> {
        let server_config = self.config.server.clone();
        let app = self.build()?;
        let server = Server::bind_with(&server_config).await?;
        Ok(Service { server, app })
    }
}

/// A bound listener paired with its pipeline.
pub struct Service {
    server: Server,
    app: App,
}

impl Service {
    pub fn local_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    pub fn is_tls(&self) -> bool {
        self.server.is_tls()
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    /// Serves until Ctrl-C or SIGTERM.
    pub async fn serve(self) -> Result<(), BootstrapError> {
        Ok(self.server.serve(self.app).await?)
    }

    /// Serves until `shutdown` resolves, then drains in-flight connections.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> Result<(), BootstrapError>
    where
        F: Future<Output = ()>,
    {
        Ok(self.server.serve_with_shutdown(self.app, shutdown).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::http::request::Request;
    use crate::middleware::{Next, from_fn};
    use crate::router::{RouteError, RouteTable};
    use crate::{Response, StatusCode};

    fn hello(routes: &mut RouteTable) -> Result<(), RouteError> {
        routes.get("/hello", |_ctx| async {
            Response::new(StatusCode::Ok).body("hi")
        })?;
        Ok(())
    }

    fn request(raw: &str) -> Request {
        Request::parse(raw.as_bytes()).unwrap().0
    }

    fn recorder(name: &'static str, log: Arc<Mutex<Vec<&'static str>>>) -> MiddlewareHandler {
        from_fn(move |ctx, next: Next| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(name);
                next.run(ctx).await
            }
        })
    }

    #[tokio::test]
    async fn defaults_attach_only_routing() {
        let app = Bootstrap::new(Config::default())
            .route_provider(hello)
            .build()
            .unwrap();
        assert_eq!(app.middleware_len(), 1);

        let res = app.handle(request("GET /hello HTTP/1.1\r\n\r\n")).await;
        assert_eq!(res.status(), 200);
        let res = app.handle(request("POST /hello HTTP/1.1\r\n\r\n")).await;
        assert_eq!(res.status(), 405);
        assert_eq!(res.headers().get("allow"), Some("GET, HEAD"));
    }

    #[tokio::test]
    async fn enabled_cors_wraps_routing() {
        let mut config = Config::default();
        config.cors.enabled = true;
        let app = Bootstrap::new(config)
            .route_provider(hello)
            .build()
            .unwrap();
        assert_eq!(app.middleware_len(), 2);

        let res = app
            .handle(request(
                "GET /hello HTTP/1.1\r\nOrigin: https://a.test\r\n\r\n",
            ))
            .await;
        assert_eq!(res.status(), 200);
        assert_eq!(
            res.headers().get("access-control-allow-origin"),
            Some("https://a.test")
        );
    }

    #[tokio::test]
    async fn user_middleware_ordered_by_priority() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let app = Bootstrap::new(Config::default())
            .route_provider(hello)
            .middleware("late", recorder("late", Arc::clone(&log)), 8)
            .middleware("early", recorder("early", Arc::clone(&log)), 1)
            .build()
            .unwrap();
        assert_eq!(app.middleware_len(), 3);

        app.handle(request("GET /hello HTTP/1.1\r\n\r\n")).await;
        assert_eq!(*log.lock().unwrap(), ["early", "late"]);
    }

    #[tokio::test]
    async fn middleware_behind_routing_never_runs() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let app = Bootstrap::new(Config::default())
            .route_provider(hello)
            .middleware("default", recorder("default", Arc::clone(&log)), DEFAULT_PRIORITY)
            .build()
            .unwrap();

        let res = app.handle(request("GET /hello HTTP/1.1\r\n\r\n")).await;
        assert_eq!(res.status(), 200);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn builtin_priority_can_be_raised() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let app = Bootstrap::new(Config::default())
            .route_provider(hello)
            .builtin_priority(Builtin::Routing, 100)
            .middleware("audit", recorder("audit", Arc::clone(&log)), DEFAULT_PRIORITY)
            .build()
            .unwrap();

        app.handle(request("GET /hello HTTP/1.1\r\n\r\n")).await;
        assert_eq!(*log.lock().unwrap(), ["audit"]);
    }

    #[tokio::test]
    async fn config_built_in_code_is_normalized() {
        let mut config = Config::default();
        config.cors.enabled = true;
        config.cors.allow.methods = vec!["get".into(), "GET".into(), "post".into()];
        config.cors.allow.headers = vec!["X-Token".into(), "x-token".into()];
        let app = Bootstrap::new(config)
            .route_provider(hello)
            .build()
            .unwrap();

        let res = app
            .handle(request(
                "OPTIONS /hello HTTP/1.1\r\nOrigin: https://a.test\r\n\r\n",
            ))
            .await;
        assert_eq!(res.status(), 204);
        assert_eq!(
            res.headers().get("access-control-allow-methods"),
            Some("GET, POST")
        );
        assert_eq!(
            res.headers().get("access-control-allow-headers"),
            Some("X-Token")
        );
    }

    #[test]
    fn invalid_config_aborts() {
        let mut config = Config::default();
        config.static_files.enabled = true;
        let err = Bootstrap::new(config).build().err().unwrap();
        assert!(matches!(err, BootstrapError::Config(ConfigError::Invalid(_))));
    }

    #[test]
    fn provider_failure_aborts() {
        let err = Bootstrap::new(Config::default())
            .route_provider(|_routes: &mut RouteTable| -> Result<(), RouteError> {
                Err(RouteError::provider("schema missing"))
            })
            .build()
            .err()
            .unwrap();
        assert!(matches!(
            err,
            BootstrapError::Router(RouterError::Provider { .. })
        ));
        assert!(err.to_string().contains("schema missing"));
    }

    #[test]
    fn builtin_names() {
        assert_eq!(Builtin::Cors.name(), "cors");
        assert_eq!(Builtin::StaticFiles.name(), "static");
        assert_eq!(Builtin::Routing.name(), "routing");
    }
}
