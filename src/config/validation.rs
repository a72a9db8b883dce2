//! Semantic validation of a deserialized [`Config`].
//!
//! Serde covers syntax and types (a port outside `0..=65535` never gets
//! here). This pass checks what serde cannot and reports every issue at
//! once rather than stopping at the first.

use std::fmt;

use super::Config;
use crate::http::is_token;

/// One failed check, keyed by the dotted configuration path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub key: &'static str,
    pub message: String,
}

impl ValidationIssue {
    fn new(key: &'static str, message: impl Into<String>) -> Self {
        Self {
            key,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

/// Checks `config`, returning every issue found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    let server = &config.server;
    if server.address.trim().is_empty() {
        issues.push(ValidationIssue::new("server.address", "must not be empty"));
    } else if server.address.chars().any(char::is_whitespace) {
        issues.push(ValidationIssue::new(
            "server.address",
            format!("`{}` must not contain whitespace", server.address),
        ));
    }

    if let Some(certificate) = &server.certificate {
        if !certificate.is_file() {
            issues.push(ValidationIssue::new(
                "server.certificate",
                format!("{} is not a readable file", certificate.display()),
            ));
        }
    }

    let statics = &config.static_files;
    if statics.enabled {
        match &statics.webroot {
            None => issues.push(ValidationIssue::new(
                "static.webroot",
                "is required when static.enabled is true",
            )),
            Some(root) if !root.is_dir() => issues.push(ValidationIssue::new(
                "static.webroot",
                format!("{} is not a directory", root.display()),
            )),
            Some(_) => {}
        }
    }

    let allow = &config.cors.allow;
    if allow.origin.trim().is_empty() {
        issues.push(ValidationIssue::new("cors.allow.origin", "must not be empty"));
    }
    for method in &allow.methods {
        if !is_token(method) {
            issues.push(ValidationIssue::new(
                "cors.allow.methods",
                format!("`{method}` is not a valid HTTP method"),
            ));
        }
    }
    for header in &allow.headers {
        if !is_token(header) {
            issues.push(ValidationIssue::new(
                "cors.allow.headers",
                format!("`{header}` is not a valid header name"),
            ));
        }
    }

    if issues.is_empty() { Ok(()) } else { Err(issues) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate(&Config::default()), Ok(()));
    }

    #[test]
    fn every_issue_is_reported() {
        let mut config = Config::default();
        config.server.address = String::new();
        config.static_files.enabled = true;
        config.cors.allow.origin = " ".into();
        config.cors.allow.methods.push("NOT A METHOD".into());
        config.cors.allow.headers.push("Bad:Header".into());

        let keys: Vec<_> = validate(&config)
            .unwrap_err()
            .into_iter()
            .map(|issue| issue.key)
            .collect();
        assert_eq!(
            keys,
            [
                "server.address",
                "static.webroot",
                "cors.allow.origin",
                "cors.allow.methods",
                "cors.allow.headers",
            ]
        );
    }

    #[test]
    fn missing_certificate_file_is_reported() {
        let mut config = Config::default();
        config.server.certificate = Some("/nonexistent/webwire/cert.pem".into());
        let issues = validate(&config).unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].key, "server.certificate");
    }

    #[test]
    fn webroot_must_be_a_directory() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.static_files.enabled = true;
        config.static_files.webroot = Some(file.path().to_path_buf());
        let issues = validate(&config).unwrap_err();
        assert_eq!(issues[0].key, "static.webroot");
        assert!(issues[0].message.contains("not a directory"));
    }

    #[test]
    fn disabled_static_files_ignore_webroot() {
        let mut config = Config::default();
        config.static_files.webroot = Some("/nonexistent/webwire/public".into());
        assert_eq!(validate(&config), Ok(()));
    }

    #[test]
    fn issue_display_uses_dotted_key() {
        let issue = ValidationIssue::new("server.port", "out of range");
        assert_eq!(issue.to_string(), "server.port: out of range");
    }
}
