//! Response factory used by the built-in middleware.

use super::{Response, StatusCode};

/// Builds [`Response`] values with an empty body stream at offset 0.
///
/// The factory does not validate the status code; any `u16` is accepted and
/// the reason text is stored verbatim.
///
/// # Examples
///
/// ```
/// use webwire::http::ResponseFactory;
///
/// let factory = ResponseFactory::new();
///
/// let ok = factory.create_default_response();
/// assert_eq!(ok.status(), 200);
///
/// let missing = factory.create_response(404, "Not Found");
/// assert_eq!(missing.reason(), "Not Found");
/// assert_eq!(missing.body_stream().position(), 0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseFactory;

impl ResponseFactory {
    pub fn new() -> Self {
        Self
    }

    /// Creates a response carrying `status` and `reason` with a fresh, empty body.
    pub fn create_response(&self, status: u16, reason: &str) -> Response {
        Response::with_status(status, reason)
    }

    /// `200` with an empty reason slot.
    pub fn create_default_response(&self) -> Response {
        self.create_response(StatusCode::Ok.as_u16(), "")
    }
}
