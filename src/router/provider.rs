//! Route providers: feature modules contributing routes to the router.

use super::table::{RouteError, RouteTable};

/// A capability that registers one or more routes into a [`RouteTable`].
///
/// Providers must own disjoint route spaces; the order in which providers
/// run is not part of the contract.
///
/// Plain closures implement the trait:
///
/// ```rust
/// use webwire::{Response, StatusCode};
/// use webwire::router::{RouteError, RouteProvider, RouteTable};
///
/// let devices = |routes: &mut RouteTable| -> Result<(), RouteError> {
///     routes.get("/devices", |_ctx| async { Response::new(StatusCode::Ok) })?;
///     Ok(())
/// };
///
/// let mut table = RouteTable::new();
/// devices.register(&mut table).unwrap();
/// assert_eq!(table.len(), 1);
/// ```
pub trait RouteProvider: Send + Sync {
    fn register(&self, routes: &mut RouteTable) -> Result<(), RouteError>;

    /// Name used in logs and errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<F> RouteProvider for F
where
    F: Fn(&mut RouteTable) -> Result<(), RouteError> + Send + Sync,
{
    fn register(&self, routes: &mut RouteTable) -> Result<(), RouteError> {
        self(routes)
    }
}
