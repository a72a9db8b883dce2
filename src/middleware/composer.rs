//! Middleware composition: deterministic ordering and attachment to the router.
//!
//! Entries are ordered by `(priority, sequence)`. The sequence number is the
//! registration index assigned by the [`MiddlewareRegistry`](super::MiddlewareRegistry),
//! so equal priorities keep their registration order on every start.

use tracing::debug;

use super::MiddlewareEntry;
use crate::router::{Router, RouterError};

/// Sorts `entries` by priority ascending, ties broken by registration order.
///
/// # Examples
///
/// ```rust
/// use webwire::middleware::{MiddlewareRegistry, Next, compose, from_fn};
///
/// let mut registry = MiddlewareRegistry::new();
/// registry.register("a", from_fn(|ctx, next: Next| next.run(ctx)));
/// registry.register("b", from_fn(|ctx, next: Next| next.run(ctx)));
/// registry.register_with_priority("c", from_fn(|ctx, next: Next| next.run(ctx)), 5);
///
/// let names: Vec<_> = compose(registry.into_entries())
///     .iter()
///     .map(|e| e.name().to_owned())
///     .collect();
/// assert_eq!(names, ["c", "a", "b"]);
/// ```
pub fn compose(mut entries: Vec<MiddlewareEntry>) -> Vec<MiddlewareEntry> {
    entries.sort_by(|a, b| {
        a.priority()
            .cmp(&b.priority())
            .then_with(|| a.sequence().cmp(&b.sequence()))
    });
    entries
}

/// Composes `entries` and attaches them to `router` in the resulting order.
///
/// Returns the number of middleware attached. An empty list attaches
/// nothing and leaves the router serving routes directly.
///
/// # Errors
///
/// [`RouterError::NotFinalized`] if the router's routes were not injected yet.
pub fn attach(router: &mut Router, entries: Vec<MiddlewareEntry>) -> Result<usize, RouterError> {
    let ordered = compose(entries);
    let count = ordered.len();

    for (position, entry) in ordered.into_iter().enumerate() {
        debug!(
            middleware = entry.name(),
            priority = entry.priority(),
            position,
            "attaching middleware"
        );
        router.add_middleware(entry.into_handler())?;
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::http::request::Request;
    use crate::middleware::{MiddlewareHandler, MiddlewareRegistry, Next, from_fn};
    use crate::router::{RouteError, RouteTable};
    use crate::{Response, StatusCode};

    fn noop() -> MiddlewareHandler {
        from_fn(|ctx, next: Next| next.run(ctx))
    }

    fn names(entries: &[MiddlewareEntry]) -> Vec<&str> {
        entries.iter().map(MiddlewareEntry::name).collect()
    }

    fn request() -> Request {
        Request::parse(b"GET /status HTTP/1.1\r\n\r\n").unwrap().0
    }

    #[test]
    fn equal_priorities_keep_registration_order() {
        let mut registry = MiddlewareRegistry::new();
        registry.register_with_priority("A", noop(), 10);
        registry.register_with_priority("B", noop(), 10);
        registry.register_with_priority("C", noop(), 5);

        let ordered = compose(registry.into_entries());
        assert_eq!(names(&ordered), ["C", "A", "B"]);
    }

    #[test]
    fn distinct_priorities_sort_ascending() {
        let mut registry = MiddlewareRegistry::new();
        for (name, priority) in [("p30", 30), ("p-1", -1), ("p7", 7), ("p100", 100), ("p0", 0)] {
            registry.register_with_priority(name, noop(), priority);
        }

        let ordered = compose(registry.into_entries());
        let priorities: Vec<_> = ordered.iter().map(MiddlewareEntry::priority).collect();
        assert_eq!(priorities, [-1, 0, 7, 30, 100]);
    }

    #[test]
    fn many_ties_stay_stable() {
        let mut registry = MiddlewareRegistry::new();
        for i in 0..50 {
            registry.register_with_priority(format!("m{i}"), noop(), i % 3);
        }

        let ordered = compose(registry.into_entries());
        for pair in ordered.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(
                a.priority() < b.priority()
                    || (a.priority() == b.priority() && a.sequence() < b.sequence())
            );
        }
    }

    #[test]
    fn compose_empty_is_empty() {
        assert!(compose(Vec::new()).is_empty());
    }

    #[test]
    fn attach_requires_injected_routes() {
        let mut registry = MiddlewareRegistry::new();
        registry.register("early", noop());

        let mut router = Router::new();
        assert!(matches!(
            attach(&mut router, registry.into_entries()),
            Err(RouterError::NotFinalized { .. })
        ));
    }

    #[tokio::test]
    async fn attached_order_is_request_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let recorder = |name: &'static str| {
            let log = Arc::clone(&log);
            from_fn(move |ctx, next: Next| {
                log.lock().unwrap().push(name);
                next.run(ctx)
            })
        };

        let mut registry = MiddlewareRegistry::new();
        registry.register("A", recorder("A"));
        registry.register("B", recorder("B"));
        registry.register_with_priority("C", recorder("C"), 5);

        let mut router = Router::new();
        router
            .register_routes(&|routes: &mut RouteTable| -> Result<(), RouteError> {
                routes.get("/status", |_ctx| async { Response::new(StatusCode::Ok) })?;
                Ok(())
            })
            .unwrap();
        router.inject_routes().unwrap();
        assert_eq!(attach(&mut router, registry.into_entries()).unwrap(), 3);

        let app = router.into_app().unwrap();
        let response = app.handle(request()).await;
        assert_eq!(response.status(), 200);
        assert_eq!(*log.lock().unwrap(), ["C", "A", "B"]);
    }

    #[tokio::test]
    async fn no_middleware_still_routes() {
        let mut router = Router::new();
        router
            .register_routes(&|routes: &mut RouteTable| -> Result<(), RouteError> {
                routes.get("/status", |_ctx| async { Response::new(StatusCode::Ok) })?;
                Ok(())
            })
            .unwrap();
        router.inject_routes().unwrap();
        assert_eq!(attach(&mut router, Vec::new()).unwrap(), 0);

        let app = router.into_app().unwrap();
        assert_eq!(app.middleware_len(), 0);
        assert_eq!(app.handle(request()).await.status(), 200);
    }
}
