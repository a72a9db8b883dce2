//! Cross-Origin Resource Sharing: header injection and preflight
//! short-circuiting.

use crate::config::CorsConfig;
use crate::context::Context;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::{Method, Response, StatusCode};

/// CORS middleware built from the `[cors]` configuration section.
///
/// # Behavior
///
/// - Disabled, or no `Origin` header: the request passes through unmodified.
/// - Origin not in the allow-list: the request passes through undecorated.
/// - `OPTIONS` preflight: answered with `204 No Content` and the
///   `Access-Control-*` headers; downstream middleware is **not** called.
/// - Any other request runs downstream and gets the same headers appended.
/// - With credentials allowed, the request origin is echoed back instead of
///   `*` (browsers reject a wildcard on credentialed requests) and
///   `Access-Control-Allow-Credentials: true` is sent.
/// - A `Vary: Origin` header is added whenever a specific origin is echoed.
///
/// # Examples
///
/// ```rust
/// use webwire::middleware::CorsMiddleware;
///
/// let cors = CorsMiddleware::new()
///     .allow_origin("https://example.com")
///     .allow_method("PUT")
///     .allow_header("X-Request-ID");
/// assert!(cors.is_enabled());
/// ```
#[derive(Debug, Clone)]
pub struct CorsMiddleware {
    enabled: bool,
    allowed_origins: Vec<String>,
    allowed_methods: Vec<String>,
    allowed_headers: Vec<String>,
    allow_credentials: bool,
}

impl Default for CorsMiddleware {
    fn default() -> Self {
        Self::from_config(&CorsConfig {
            enabled: true,
            ..CorsConfig::default()
        })
    }
}

impl CorsMiddleware {
    /// Enabled middleware with the default allow policy: any origin, the
    /// default method and header sets, credentials allowed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the middleware from `[cors]`. `allow.origin` is either `*` or a
    /// comma-separated list of origins.
    pub fn from_config(config: &CorsConfig) -> Self {
        let allowed_origins = config
            .allow
            .origin
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_owned)
            .collect();

        Self {
            enabled: config.enabled,
            allowed_origins,
            allowed_methods: config.allow.methods.clone(),
            allowed_headers: config.allow.headers.clone(),
            allow_credentials: config.allow.credentials,
        }
    }

    /// Adds an allowed origin. A list containing `*` accepts every origin.
    #[must_use]
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        let origin = origin.into();
        self.allowed_origins.retain(|o| o != "*");
        self.allowed_origins.push(origin);
        self
    }

    #[must_use]
    pub fn allow_method(mut self, method: impl Into<String>) -> Self {
        self.allowed_methods.push(method.into());
        self
    }

    #[must_use]
    pub fn allow_header(mut self, header: impl Into<String>) -> Self {
        self.allowed_headers.push(header.into());
        self
    }

    #[must_use]
    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.allow_credentials = allow;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The `Access-Control-Allow-Origin` value for `origin`, or `None` when
    /// the origin is not allowed.
    fn allow_origin_for(&self, origin: &str) -> Option<String> {
        if self.allowed_origins.iter().any(|o| o == "*") {
            if self.allow_credentials {
                Some(origin.to_owned())
            } else {
                Some("*".to_owned())
            }
        } else if self.allowed_origins.iter().any(|o| o == origin) {
            Some(origin.to_owned())
        } else {
            None
        }
    }

    fn decorate(&self, response: &mut Response, allow_origin: &str) {
        response.add_header("Access-Control-Allow-Origin", allow_origin);
        response.add_header("Access-Control-Allow-Methods", self.allowed_methods.join(", "));
        response.add_header("Access-Control-Allow-Headers", self.allowed_headers.join(", "));
        if self.allow_credentials {
            response.add_header("Access-Control-Allow-Credentials", "true");
        }
        if allow_origin != "*" {
            response.headers_mut().append_token("Vary", "Origin");
        }
    }
}

impl Middleware for CorsMiddleware {
    fn handle(&self, ctx: Context, next: Next) -> BoxFuture {
        let policy = self.clone();

        Box::pin(async move {
            if !policy.enabled {
                return next.run(ctx).await;
            }

            let Some(origin) = ctx.request().headers().get("origin").map(str::to_owned) else {
                return next.run(ctx).await;
            };
            let Some(allow_origin) = policy.allow_origin_for(&origin) else {
                return next.run(ctx).await;
            };

            if ctx.request().method() == &Method::Options {
                let mut response = Response::new(StatusCode::NoContent);
                policy.decorate(&mut response, &allow_origin);
                response.add_header("Access-Control-Max-Age", "3600");
                return response;
            }

            let mut response = next.run(ctx).await;
            policy.decorate(&mut response, &allow_origin);
            response
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::CorsAllowConfig;
    use crate::http::request::Request;
    use crate::middleware::{MiddlewareHandler, from_middleware};
    use crate::router::RouteTable;

    fn routes() -> Arc<RouteTable> {
        let mut routes = RouteTable::new();
        routes
            .get("/api", |_ctx| async { Response::new(StatusCode::Ok).body("data") })
            .unwrap();
        Arc::new(routes)
    }

    async fn send(cors: CorsMiddleware, raw: &str) -> Response {
        let chain: Arc<[MiddlewareHandler]> = Arc::from(vec![from_middleware(Arc::new(cors))]);
        let request = Request::parse(raw.as_bytes()).unwrap().0;
        Next::new(chain, routes()).run(Context::new(request)).await
    }

    fn config(origin: &str, credentials: bool) -> CorsConfig {
        CorsConfig {
            enabled: true,
            allow: CorsAllowConfig {
                origin: origin.to_owned(),
                credentials,
                ..CorsAllowConfig::default()
            },
        }
    }

    #[tokio::test]
    async fn disabled_passes_through() {
        let cors = CorsMiddleware::from_config(&CorsConfig::default());
        let res = send(cors, "GET /api HTTP/1.1\r\nOrigin: https://a.test\r\n\r\n").await;
        assert_eq!(res.status(), 200);
        assert!(!res.headers().contains("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn request_without_origin_is_untouched() {
        let res = send(CorsMiddleware::new(), "GET /api HTTP/1.1\r\n\r\n").await;
        assert_eq!(res.status(), 200);
        assert!(!res.headers().contains("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn preflight_short_circuits_with_204() {
        let cors = CorsMiddleware::from_config(&config("*", false));
        let res = send(
            cors,
            "OPTIONS /api HTTP/1.1\r\nOrigin: https://a.test\r\n\r\n",
        )
        .await;

        assert_eq!(res.status(), 204);
        assert_eq!(res.headers().get("access-control-allow-origin"), Some("*"));
        assert_eq!(
            res.headers().get("access-control-allow-methods"),
            Some("GET, POST, PATCH, DELETE, OPTIONS")
        );
        assert_eq!(
            res.headers().get("access-control-allow-headers"),
            Some("Content-Type, Authorization, X-Requested-With")
        );
        assert_eq!(res.headers().get("access-control-max-age"), Some("3600"));
        assert!(!res.headers().contains("vary"));
        assert!(res.body_stream().is_empty());
    }

    #[tokio::test]
    async fn credentials_echo_the_origin() {
        let res = send(
            CorsMiddleware::new(),
            "GET /api HTTP/1.1\r\nOrigin: https://a.test\r\n\r\n",
        )
        .await;

        assert_eq!(res.status(), 200);
        assert_eq!(res.body_stream().as_bytes(), b"data");
        assert_eq!(
            res.headers().get("access-control-allow-origin"),
            Some("https://a.test")
        );
        assert_eq!(
            res.headers().get("access-control-allow-credentials"),
            Some("true")
        );
        assert_eq!(res.headers().get("vary"), Some("Origin"));
    }

    #[tokio::test]
    async fn allow_list_rejects_unlisted_origin() {
        let cors = CorsMiddleware::from_config(&config(
            "https://a.test, https://b.test",
            false,
        ));

        let listed = send(
            cors.clone(),
            "GET /api HTTP/1.1\r\nOrigin: https://b.test\r\n\r\n",
        )
        .await;
        assert_eq!(
            listed.headers().get("access-control-allow-origin"),
            Some("https://b.test")
        );
        assert_eq!(listed.headers().get("vary"), Some("Origin"));

        let unlisted = send(cors, "GET /api HTTP/1.1\r\nOrigin: https://evil.test\r\n\r\n").await;
        assert_eq!(unlisted.status(), 200);
        assert!(!unlisted.headers().contains("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn vary_joins_downstream_list() {
        let mut routes = RouteTable::new();
        routes
            .get("/asset", |_ctx| async {
                Response::new(StatusCode::Ok).header("Vary", "Accept-Encoding")
            })
            .unwrap();
        let chain: Arc<[MiddlewareHandler]> =
            Arc::from(vec![from_middleware(Arc::new(CorsMiddleware::new()))]);
        let request = Request::parse(b"GET /asset HTTP/1.1\r\nOrigin: https://a.test\r\n\r\n")
            .unwrap()
            .0;
        let res = Next::new(chain, Arc::new(routes))
            .run(Context::new(request))
            .await;

        assert_eq!(res.headers().get_all("vary").count(), 1);
        assert_eq!(res.headers().get("vary"), Some("Accept-Encoding, Origin"));
    }

    #[tokio::test]
    async fn builder_replaces_wildcard() {
        let cors = CorsMiddleware::new()
            .allow_origin("https://a.test")
            .allow_credentials(false);
        let res = send(cors, "GET /api HTTP/1.1\r\nOrigin: https://other.test\r\n\r\n").await;
        assert!(!res.headers().contains("access-control-allow-origin"));
    }
}
