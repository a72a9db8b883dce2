//! Per-request context handed through the middleware chain to route handlers.
//!
//! A [`Context`] owns the [`Request`] and the path [`Parameters`] filled in
//! by the route table. Handlers read both, and can decode a JSON body with
//! [`Context::json`].

use std::collections::HashMap;

use crate::Request;

/// Named path captures from the matched route (`:id`, `wildcard`).
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Parameters {
    map: HashMap<String, String>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.map.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Per-request state flowing through middleware into the route handler.
pub struct Context {
    request: Request,
    params: Parameters,
}

impl Context {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            params: Parameters::new(),
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// Installs the captures of the matched route.
    pub fn set_params(&mut self, params: Parameters) {
        self.params = params;
    }

    /// Deserializes the request body as JSON.
    pub fn json<T>(&self) -> Result<T, serde_json::Error>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_slice(self.request.body())
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    fn request(raw: &[u8]) -> Request {
        Request::parse(raw).unwrap().0
    }

    #[test]
    fn params_are_replaced_on_match() {
        let mut ctx = Context::new(request(b"GET /users/9 HTTP/1.1\r\n\r\n"));
        assert!(ctx.params().is_empty());

        let mut params = Parameters::new();
        params.insert("id", "9");
        ctx.set_params(params);
        assert_eq!(ctx.params().get("id"), Some("9"));
    }

    #[test]
    fn json_body_is_deserialized() {
        #[derive(Deserialize)]
        struct Device {
            name: String,
        }

        let ctx = Context::new(request(
            b"POST /devices HTTP/1.1\r\nContent-Length: 15\r\n\r\n{\"name\":\"lamp\"}",
        ));
        let device: Device = ctx.json().unwrap();
        assert_eq!(device.name, "lamp");
    }
}
