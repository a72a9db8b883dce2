//! Terminal middleware dispatching to the finalized route table.

use crate::context::Context;
use crate::http::ResponseFactory;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::router::RouteMatch;
use crate::{Method, StatusCode};

/// Dispatches to the route table and answers misses itself.
///
/// - matching route: the handler's response;
/// - `HEAD` without a `HEAD` route: the `GET` route with its body dropped;
/// - path registered under other methods: `405` with an `Allow` header;
/// - otherwise `404`.
///
/// Never calls `next`, so anything attached after it does not run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoutingMiddleware {
    factory: ResponseFactory,
}

impl RoutingMiddleware {
    pub fn new() -> Self {
        Self::default()
    }
}

fn allow_header(mut allowed: Vec<Method>) -> String {
    if allowed.contains(&Method::Get) && !allowed.contains(&Method::Head) {
        allowed.push(Method::Head);
    }
    allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl Middleware for RoutingMiddleware {
    fn handle(&self, mut ctx: Context, next: Next) -> BoxFuture {
        let factory = self.factory;

        Box::pin(async move {
            let method = ctx.request().method().clone();
            let path = ctx.request().path().to_owned();
            let routes = next.routes();

            let mut found = routes.find(&method, &path);
            let mut strip_body = false;
            if method == Method::Head && !matches!(found, RouteMatch::Found { .. }) {
                if let get @ RouteMatch::Found { .. } = routes.find(&Method::Get, &path) {
                    found = get;
                    strip_body = true;
                }
            }

            match found {
                RouteMatch::Found { handler, params } => {
                    ctx.set_params(params);
                    let mut response = handler(ctx).await;
                    if strip_body {
                        let length = response.body_stream().len();
                        response.body_stream_mut().clear();
                        response
                            .headers_mut()
                            .set("Content-Length", length.to_string());
                    }
                    response
                }
                RouteMatch::MethodNotAllowed { allowed } => factory
                    .create_response(StatusCode::MethodNotAllowed.as_u16(), "")
                    .header("Allow", allow_header(allowed)),
                RouteMatch::NotFound => {
                    factory.create_response(StatusCode::NotFound.as_u16(), "")
                }
            }
        })
    }
}
