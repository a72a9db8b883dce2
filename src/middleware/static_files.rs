//! Static file serving from a configured webroot.
//!
//! Only `GET` and `HEAD` are considered. A request that does not resolve to a
//! file under the webroot falls through to the next middleware, so routes
//! and files share one URL space with files taking precedence.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

use crate::config::StaticFilesConfig;
use crate::context::Context;
use crate::http::ResponseFactory;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::{Method, StatusCode};

/// Why a request path could not be served from the webroot.
#[derive(Debug, Error)]
pub enum StaticFileError {
    #[error("no file for `{path}`")]
    NotFound { path: String },

    #[error("`{path}` resolves outside the webroot")]
    OutsideRoot { path: String },

    #[error("cannot read static file: {0}")]
    Io(#[from] io::Error),
}

impl StaticFileError {
    /// `true` for the failures that fall through to the next middleware.
    pub fn is_fall_through(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::OutsideRoot { .. })
    }
}

fn classify(err: io::Error, request_path: &str) -> StaticFileError {
    match err.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory | io::ErrorKind::InvalidInput => {
            StaticFileError::NotFound {
                path: request_path.to_owned(),
            }
        }
        _ => StaticFileError::Io(err),
    }
}

/// Maps `request_path` to a file under `root`.
///
/// The path is percent-decoded, joined under `root` and canonicalized, which
/// resolves `..` components and symlinks. Anything that lands outside the
/// canonical root is refused. A directory resolves to its `index.html`.
pub async fn resolve(root: &Path, request_path: &str) -> Result<PathBuf, StaticFileError> {
    let not_found = || StaticFileError::NotFound {
        path: request_path.to_owned(),
    };

    let decoded = urlencoding::decode(request_path).map_err(|_| not_found())?;
    let relative = decoded.trim_start_matches('/');

    let root = fs::canonicalize(root)
        .await
        .map_err(|err| classify(err, request_path))?;
    let candidate = fs::canonicalize(root.join(relative))
        .await
        .map_err(|err| classify(err, request_path))?;

    if !candidate.starts_with(&root) {
        return Err(StaticFileError::OutsideRoot {
            path: request_path.to_owned(),
        });
    }

    let metadata = fs::metadata(&candidate)
        .await
        .map_err(|err| classify(err, request_path))?;
    if !metadata.is_dir() {
        return Ok(candidate);
    }

    let index = candidate.join("index.html");
    match fs::metadata(&index).await {
        Ok(meta) if meta.is_file() => Ok(index),
        Ok(_) => Err(not_found()),
        Err(err) => Err(classify(err, request_path)),
    }
}

/// Serves files below a webroot, falling through when nothing matches.
///
/// # Examples
///
/// ```rust,no_run
/// use webwire::middleware::StaticFilesMiddleware;
///
/// let statics = StaticFilesMiddleware::new("./public");
/// assert!(statics.is_enabled());
/// ```
#[derive(Debug, Clone)]
pub struct StaticFilesMiddleware {
    webroot: Option<PathBuf>,
    enabled: bool,
    factory: ResponseFactory,
}

impl StaticFilesMiddleware {
    /// Enabled middleware serving `webroot`.
    pub fn new(webroot: impl Into<PathBuf>) -> Self {
        Self {
            webroot: Some(webroot.into()),
            enabled: true,
            factory: ResponseFactory::new(),
        }
    }

    pub fn from_config(config: &StaticFilesConfig) -> Self {
        Self {
            webroot: config.webroot.clone(),
            enabled: config.enabled,
            factory: ResponseFactory::new(),
        }
    }

    /// Enabled and pointed at a webroot.
    pub fn is_enabled(&self) -> bool {
        self.enabled && self.webroot.is_some()
    }

    pub fn webroot(&self) -> Option<&Path> {
        self.webroot.as_deref()
    }
}

impl Middleware for StaticFilesMiddleware {
    fn handle(&self, ctx: Context, next: Next) -> BoxFuture {
        let webroot = self.webroot.clone().filter(|_| self.enabled);
        let factory = self.factory;

        Box::pin(async move {
            let Some(webroot) = webroot else {
                return next.run(ctx).await;
            };
            let method = ctx.request().method();
            if !method.is_read_only() {
                return next.run(ctx).await;
            }
            let is_head = method == &Method::Head;
            let request_path = ctx.request().path().to_owned();

            let served = match resolve(&webroot, &request_path).await {
                Ok(file) => fs::read(&file)
                    .await
                    .map(|contents| (file, contents))
                    .map_err(|err| classify(err, &request_path)),
                Err(err) => Err(err),
            };

            match served {
                Ok((file, contents)) => {
                    debug!(path = %request_path, file = %file.display(), "serving static file");
                    let content_type = mime_guess::from_path(&file).first_or_octet_stream();
                    let mut response = factory
                        .create_response(StatusCode::Ok.as_u16(), "")
                        .header("Content-Type", content_type.essence_str());
                    if is_head {
                        response.add_header("Content-Length", contents.len().to_string());
                    } else {
                        response = response.body_bytes(contents);
                    }
                    response
                }
                Err(err) if err.is_fall_through() => {
                    debug!(path = %request_path, reason = %err, "static file fall-through");
                    next.run(ctx).await
                }
                Err(err) => {
                    warn!(path = %request_path, error = %err, "static file read failed");
                    factory.create_response(StatusCode::InternalServerError.as_u16(), "")
                }
            }
        })
    }
}
