//! Route table: URL patterns and methods mapped to handler functions.
//!
//! Three pattern styles are supported:
//!
//! | Pattern              | Example match              | Captured params                  |
//! |----------------------|----------------------------|----------------------------------|
//! | `/users`             | `/users`                   | *(none)*                         |
//! | `/users/:id`         | `/users/42`                | `id → "42"`                      |
//! | `/files/*`           | `/files/docs/readme.txt`   | `wildcard → "/docs/readme.txt"`  |
//!
//! Trailing slashes are normalized on both patterns and incoming paths.
//! Routes are matched in registration order; the first match wins.

use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

use crate::context::{Context, Parameters};
use crate::{Method, Response, StatusCode};

/// Type-erased async route handler.
pub type Handler =
    Arc<dyn Fn(Context) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync + 'static>;

/// Conversion trait for async handler functions.
///
/// Any `Fn(Context) -> impl Future<Output = Response> + Send` that is
/// `Send + Sync + 'static` implements it through the blanket impl below.
pub trait IntoHandler: Send + Sync + 'static {
    fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = Response> + Send>>;
}

impl<T, F> IntoHandler for T
where
    T: Fn(Context) -> F + Send + Sync + 'static,
    F: Future<Output = Response> + Send + 'static,
{
    fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        Box::pin((self)(ctx))
    }
}

/// Errors raised while filling a route table.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("invalid route pattern `{pattern}`: {reason}")]
    InvalidPattern {
        pattern: String,
        reason: &'static str,
    },

    #[error("{0}")]
    Provider(String),
}

impl RouteError {
    /// A failure reported by a route provider's own logic.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider(message.into())
    }
}

#[derive(Debug, Clone)]
enum Segment {
    Static(String),
    Parameter(String),
}

#[derive(Debug, Clone)]
enum Pattern {
    // `/users`
    Exact(String),
    // `/users/:id`
    Parameterized { segments: Vec<Segment> },
    // `/files/*`
    Wildcard(String),
}

fn trim_trailing_slash(path: &str) -> &str {
    match path.strip_suffix('/') {
        Some(trimmed) if !trimmed.is_empty() => trimmed,
        _ => path,
    }
}

impl Pattern {
    fn parse(pattern: &str) -> Result<Self, RouteError> {
        if !pattern.starts_with('/') {
            return Err(RouteError::InvalidPattern {
                pattern: pattern.to_owned(),
                reason: "must start with `/`",
            });
        }

        let pattern = trim_trailing_slash(pattern);

        if let Some(prefix) = pattern.strip_suffix("/*") {
            return Ok(Pattern::Wildcard(prefix.to_owned()));
        }

        if pattern.contains(':') {
            let mut segments = Vec::new();
            for raw in pattern.split('/').filter(|s| !s.is_empty()) {
                match raw.strip_prefix(':') {
                    Some("") => {
                        return Err(RouteError::InvalidPattern {
                            pattern: pattern.to_owned(),
                            reason: "parameter name must not be empty",
                        });
                    }
                    Some(name) => segments.push(Segment::Parameter(name.to_owned())),
                    None => segments.push(Segment::Static(raw.to_owned())),
                }
            }
            return Ok(Pattern::Parameterized { segments });
        }

        Ok(Pattern::Exact(pattern.to_owned()))
    }

    fn matches(&self, path: &str) -> Option<Parameters> {
        let path = trim_trailing_slash(path);

        match self {
            Pattern::Exact(p) => (p == path).then(Parameters::new),
            Pattern::Parameterized { segments } => {
                let path_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
                if segments.len() != path_segments.len() {
                    return None;
                }

                let mut params = Parameters::new();
                for (seg, path_seg) in segments.iter().zip(path_segments) {
                    match seg {
                        Segment::Static(s) if s != path_seg => return None,
                        Segment::Static(_) => {}
                        Segment::Parameter(name) => params.insert(name.as_str(), path_seg),
                    }
                }
                Some(params)
            }
            Pattern::Wildcard(prefix) => {
                let suffix = path.strip_prefix(prefix.as_str())?;
                if !suffix.is_empty() && !suffix.starts_with('/') {
                    return None;
                }
                let mut params = Parameters::new();
                params.insert("wildcard", suffix);
                Some(params)
            }
        }
    }
}

struct Route {
    method: Method,
    pattern: Pattern,
    handler: Handler,
}

/// Outcome of looking a request up in a [`RouteTable`].
pub enum RouteMatch {
    Found { handler: Handler, params: Parameters },
    /// The path exists, but only under the listed methods.
    MethodNotAllowed { allowed: Vec<Method> },
    NotFound,
}

/// Method + pattern → handler bindings contributed by route providers.
///
/// # Examples
///
/// ```rust
/// use webwire::{Response, StatusCode};
/// use webwire::router::{RouteError, RouteTable};
///
/// # fn main() -> Result<(), RouteError> {
/// let mut routes = RouteTable::new();
/// routes
///     .get("/devices", |_ctx| async { Response::new(StatusCode::Ok) })?
///     .post("/devices", |_ctx| async { Response::new(StatusCode::Created) })?;
/// assert_eq!(routes.len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, path: &str, handler: impl IntoHandler) -> Result<&mut Self, RouteError> {
        self.add(Method::Get, path, handler)
    }

    pub fn post(&mut self, path: &str, handler: impl IntoHandler) -> Result<&mut Self, RouteError> {
        self.add(Method::Post, path, handler)
    }

    pub fn put(&mut self, path: &str, handler: impl IntoHandler) -> Result<&mut Self, RouteError> {
        self.add(Method::Put, path, handler)
    }

    pub fn patch(&mut self, path: &str, handler: impl IntoHandler) -> Result<&mut Self, RouteError> {
        self.add(Method::Patch, path, handler)
    }

    pub fn delete(&mut self, path: &str, handler: impl IntoHandler) -> Result<&mut Self, RouteError> {
        self.add(Method::Delete, path, handler)
    }

    pub fn options(&mut self, path: &str, handler: impl IntoHandler) -> Result<&mut Self, RouteError> {
        self.add(Method::Options, path, handler)
    }

    pub fn head(&mut self, path: &str, handler: impl IntoHandler) -> Result<&mut Self, RouteError> {
        self.add(Method::Head, path, handler)
    }

    /// Registers `handler` for `method` requests matching `path`.
    ///
    /// # Errors
    ///
    /// [`RouteError::InvalidPattern`] if `path` does not start with `/` or
    /// declares an unnamed parameter.
    pub fn add(
        &mut self,
        method: Method,
        path: &str,
        handler: impl IntoHandler,
    ) -> Result<&mut Self, RouteError> {
        let pattern = Pattern::parse(path)?;
        let handler: Handler = Arc::new(move |ctx| handler.call(ctx));
        self.routes.push(Route {
            method,
            pattern,
            handler,
        });
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Looks up the first route matching `method` and `path`.
    pub fn find(&self, method: &Method, path: &str) -> RouteMatch {
        let mut allowed = Vec::new();

        for route in &self.routes {
            let Some(params) = route.pattern.matches(path) else {
                continue;
            };
            if &route.method == method {
                return RouteMatch::Found {
                    handler: Arc::clone(&route.handler),
                    params,
                };
            }
            if !allowed.contains(&route.method) {
                allowed.push(route.method.clone());
            }
        }

        if allowed.is_empty() {
            RouteMatch::NotFound
        } else {
            RouteMatch::MethodNotAllowed { allowed }
        }
    }

    /// Dispatches `ctx` to the matching handler, or answers `404 Not Found`.
    pub async fn dispatch(&self, mut ctx: Context) -> Response {
        let found = self.find(ctx.request().method(), ctx.request().path());
        match found {
            RouteMatch::Found { handler, params } => {
                ctx.set_params(params);
                handler(ctx).await
            }
            RouteMatch::MethodNotAllowed { .. } | RouteMatch::NotFound => {
                Response::new(StatusCode::NotFound)
            }
        }
    }
}
