//! Configuration: schema, loading and validation.
//!
//! ```text
//! config file (TOML / JSON)
//!     → loader.rs     parse, normalize sets
//!     → validation.rs semantic checks, all issues at once
//!     → Config        immutable for the process lifetime
//! ```

use std::path::PathBuf;

use thiserror::Error;

mod loader;
mod schema;
mod validation;

pub use schema::{Config, CorsAllowConfig, CorsConfig, ServerConfig, StaticFilesConfig};
pub use validation::{ValidationIssue, validate};

/// Errors produced while loading or validating configuration. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot render configuration: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid configuration: {}", join_issues(.0))]
    Invalid(Vec<ValidationIssue>),
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
