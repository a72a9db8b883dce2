//! HTTP/1.1 response value and its wire serialization.

use bytes::{BufMut, BytesMut};

use super::{Body, Headers, StatusCode};

/// An HTTP/1.1 response, ready to be serialized and sent.
///
/// The status is kept as a raw `u16` next to a free-form reason slot; when
/// the slot is empty the canonical phrase of a known [`StatusCode`] is used
/// on the wire.
///
/// # Examples
///
/// ```
/// use webwire::http::{Response, StatusCode};
///
/// let response = Response::new(StatusCode::Ok)
///     .header("Content-Type", "application/json")
///     .body(r#"{"status":"ok"}"#);
///
/// let bytes = response.into_bytes();
/// let text = std::str::from_utf8(&bytes).unwrap();
/// assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
/// assert!(text.contains("Content-Length: 15\r\n"));
/// ```
#[derive(Debug)]
pub struct Response {
    status: u16,
    reason: String,
    headers: Headers,
    body: Body,
    keep_alive: bool,
}

impl Response {
    /// Creates a response with the given status and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self::with_status(status.as_u16(), "")
    }

    /// Creates a response with any numeric status and reason text.
    pub fn with_status(status: u16, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
            headers: Headers::new(),
            body: Body::new(),
            keep_alive: true,
        }
    }

    /// Appends a response header. Multiple calls with the same name are additive.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Appends a header in place, for middleware decorating a downstream response.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name, value);
    }

    /// Replaces the body with `body`, cursor at offset 0.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Body::from_bytes(body.into().into_bytes());
        self
    }

    /// Replaces the body with raw bytes, cursor at offset 0.
    #[must_use]
    pub fn body_bytes(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Body::from_bytes(body);
        self
    }

    /// Controls whether `Connection: keep-alive` or `Connection: close` is written.
    #[must_use]
    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// The reason text stored at construction, possibly empty.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// The phrase written on the status line.
    pub fn reason_phrase(&self) -> &str {
        if !self.reason.is_empty() {
            return &self.reason;
        }
        StatusCode::from_u16(self.status)
            .map(StatusCode::canonical_reason)
            .unwrap_or("")
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn body_stream(&self) -> &Body {
        &self.body
    }

    pub fn body_stream_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Whether the connection stays open after this response.
    pub fn is_keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Serializes the response into HTTP/1.1 wire format.
    ///
    /// Adds `Content-Type: text/plain; charset=utf-8` when a non-empty body
    /// has no content type, `Connection`, and always `Content-Length`. A
    /// `Content-Length` set on a bodiless response (`HEAD`) is kept.
    pub fn into_bytes(mut self) -> BytesMut {
        let body = self.body.into_bytes();

        if !body.is_empty() && !self.headers.contains("content-type") {
            self.headers
                .insert("Content-Type", "text/plain; charset=utf-8");
        }

        let connection = if self.keep_alive {
            "keep-alive"
        } else {
            "close"
        };
        self.headers.set("Connection", connection);

        let declared = match self.headers.get("content-length") {
            Some(value) if body.is_empty() => Some(value.to_owned()),
            _ => None,
        };
        self.headers.remove("content-length");
        let content_length = declared.unwrap_or_else(|| body.len().to_string());

        let reason = if self.reason.is_empty() {
            StatusCode::from_u16(self.status)
                .map(StatusCode::canonical_reason)
                .unwrap_or("")
                .to_owned()
        } else {
            std::mem::take(&mut self.reason)
        };

        let estimated_size = 128 + self.headers.len() * 64 + body.len();
        let mut buf = BytesMut::with_capacity(estimated_size);

        buf.put(format!("HTTP/1.1 {} {}\r\n", self.status, reason).as_bytes());
        for (name, value) in self.headers.iter() {
            buf.put(format!("{name}: {value}\r\n").as_bytes());
        }
        buf.put(format!("Content-Length: {content_length}\r\n").as_bytes());
        buf.put(&b"\r\n"[..]);

        if !body.is_empty() {
            buf.put(body.as_slice());
        }

        buf
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::Ok)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn to_string(bytes: BytesMut) -> String {
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn simple_ok_response() {
        let r = Response::new(StatusCode::Ok).body("Hello");
        let s = to_string(r.into_bytes());
        assert!(s.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(s.contains("Content-Length: 5\r\n"));
        assert!(s.ends_with("\r\n\r\nHello"));
    }

    #[test]
    fn custom_reason_on_status_line() {
        let r = Response::with_status(299, "Mostly Fine");
        let s = to_string(r.into_bytes());
        assert!(s.starts_with("HTTP/1.1 299 Mostly Fine\r\n"));
    }

    #[test]
    fn unknown_status_without_reason() {
        let r = Response::with_status(299, "");
        assert_eq!(r.reason_phrase(), "");
        let s = to_string(r.into_bytes());
        assert!(s.starts_with("HTTP/1.1 299 \r\n"));
    }

    #[test]
    fn written_stream_is_serialized_whole() {
        let mut r = Response::new(StatusCode::Ok);
        r.body_stream_mut().write_all(b"streamed").unwrap();
        let s = to_string(r.into_bytes());
        assert!(s.contains("Content-Length: 8\r\n"));
        assert!(s.ends_with("streamed"));
    }

    #[test]
    fn no_body_no_content_type() {
        let r = Response::new(StatusCode::NoContent);
        let s = to_string(r.into_bytes());
        assert!(!s.contains("Content-Type"));
        assert!(s.contains("Content-Length: 0\r\n"));
    }

    #[test]
    fn connection_close() {
        let r = Response::new(StatusCode::Ok).keep_alive(false);
        let s = to_string(r.into_bytes());
        assert!(s.contains("Connection: close\r\n"));
    }

    #[test]
    fn head_response_keeps_declared_length() {
        let r = Response::new(StatusCode::Ok).header("Content-Length", "42");
        let s = to_string(r.into_bytes());
        assert!(s.contains("Content-Length: 42\r\n"));
        assert_eq!(s.matches("Content-Length").count(), 1);
    }

    #[test]
    fn body_overrides_stale_length() {
        let r = Response::new(StatusCode::Ok)
            .header("Content-Length", "42")
            .body("abc");
        let s = to_string(r.into_bytes());
        assert!(s.contains("Content-Length: 3\r\n"));
        assert!(!s.contains("42"));
    }
}
