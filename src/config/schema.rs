//! Configuration schema.
//!
//! Every field has a default so that an empty file is a valid configuration.
//! Unknown keys are rejected.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root of the configuration tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,

    #[serde(rename = "static")]
    pub static_files: StaticFilesConfig,

    pub cors: CorsConfig,
}

/// `[server]`: where the listener binds and whether it speaks TLS.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub address: String,

    pub port: u16,

    /// PEM file holding the certificate chain and the private key.
    /// Plaintext when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_owned(),
            port: 8000,
            certificate: None,
        }
    }
}

impl ServerConfig {
    /// `address:port`, with IPv6 literals bracketed.
    pub fn socket_address(&self) -> String {
        if self.address.contains(':') && !self.address.starts_with('[') {
            format!("[{}]:{}", self.address, self.port)
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }
}

/// `[static]`: static file serving.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StaticFilesConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webroot: Option<PathBuf>,

    pub enabled: bool,
}

/// `[cors]`: cross-origin resource sharing policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    pub enabled: bool,

    pub allow: CorsAllowConfig,
}

/// `[cors.allow]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsAllowConfig {
    /// `*`, or a comma-separated list of origins.
    pub origin: String,

    pub methods: Vec<String>,

    pub credentials: bool,

    pub headers: Vec<String>,
}

impl Default for CorsAllowConfig {
    fn default() -> Self {
        Self {
            origin: "*".to_owned(),
            methods: ["GET", "POST", "PATCH", "DELETE", "OPTIONS"]
                .map(str::to_owned)
                .to_vec(),
            credentials: true,
            headers: ["Content-Type", "Authorization", "X-Requested-With"]
                .map(str::to_owned)
                .to_vec(),
        }
    }
}

impl Config {
    /// Treats the method and header lists as sets.
    ///
    /// Methods are upper-cased; duplicates (compared case-insensitively) are
    /// dropped keeping the first occurrence.
    pub fn normalize(&mut self) {
        let allow = &mut self.cors.allow;
        for method in &mut allow.methods {
            *method = method.trim().to_ascii_uppercase();
        }
        for header in &mut allow.headers {
            *header = header.trim().to_owned();
        }
        dedup_ignore_case(&mut allow.methods);
        dedup_ignore_case(&mut allow.headers);
    }
}

fn dedup_ignore_case(values: &mut Vec<String>) {
    let mut seen: Vec<String> = Vec::with_capacity(values.len());
    values.retain(|value| {
        let key = value.to_ascii_lowercase();
        if seen.contains(&key) {
            false
        } else {
            seen.push(key);
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_table() {
        let config = Config::default();
        assert_eq!(config.server.address, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.certificate, None);
        assert_eq!(config.static_files.webroot, None);
        assert!(!config.static_files.enabled);
        assert!(!config.cors.enabled);
        assert_eq!(config.cors.allow.origin, "*");
        assert_eq!(
            config.cors.allow.methods,
            ["GET", "POST", "PATCH", "DELETE", "OPTIONS"]
        );
        assert!(config.cors.allow.credentials);
        assert_eq!(
            config.cors.allow.headers,
            ["Content-Type", "Authorization", "X-Requested-With"]
        );
    }

    #[test]
    fn socket_address_brackets_ipv6() {
        let mut server = ServerConfig::default();
        assert_eq!(server.socket_address(), "127.0.0.1:8000");
        server.address = "::1".to_owned();
        assert_eq!(server.socket_address(), "[::1]:8000");
    }

    #[test]
    fn normalize_treats_lists_as_sets() {
        let mut config = Config::default();
        config.cors.allow.methods = vec!["get".into(), "GET".into(), " post ".into()];
        config.cors.allow.headers = vec!["X-Token".into(), "x-token".into(), "Accept".into()];
        config.normalize();
        assert_eq!(config.cors.allow.methods, ["GET", "POST"]);
        assert_eq!(config.cors.allow.headers, ["X-Token", "Accept"]);
    }
}
