//! Async TCP listener using Tokio, with optional TLS.
//!
//! Accepts connections and feeds HTTP/1.1 requests through an [`App`].
//! Connections are persistent (keep-alive) unless the client says otherwise.
//! [`Server::serve_with_shutdown`] stops accepting when its shutdown future
//! resolves, tells open connections to close once their current request is
//! answered, and waits for them before returning.

use std::future::Future;
use std::net::SocketAddr;

use bytes::BytesMut;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, warn};

use crate::app::App;
use crate::config::ServerConfig;
use crate::http::{
    StatusCode,
    request::{Request, RequestError},
    response::Response,
};

mod tls;

pub use tls::load_acceptor;

/// Errors produced while starting the listener.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid certificate {}: {reason}", path.display())]
    Certificate {
        path: std::path::PathBuf,
        reason: String,
    },

    #[error("TLS configuration rejected: {0}")]
    Tls(#[from] tokio_rustls::rustls::Error),
}

/// Maximum size of a complete HTTP request we will buffer before rejecting it (8 MiB).
const MAX_REQUEST_SIZE: usize = 8 * 1024 * 1024;

/// Initial read buffer capacity per connection.
const INITIAL_BUF_SIZE: usize = 4096;

/// A bound listener, ready to serve an [`App`].
///
/// # Examples
///
/// ```rust,no_run
/// use webwire::{Bootstrap, Config, Server};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let app = Bootstrap::new(Config::default()).build()?;
///     let server = Server::bind("127.0.0.1:8080").await?;
///     server.serve(app).await?;
///     Ok(())
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    tls: Option<TlsAcceptor>,
}

impl Server {
    /// Binds a plaintext listener to `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound
    /// (e.g. port already in use, insufficient permissions).
    pub async fn bind(addr: impl AsRef<str>) -> Result<Self, ServerError> {
        let addr = addr.as_ref();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.to_owned(),
                source: e,
            })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
            tls: None,
        })
    }

    /// Binds according to `[server]`.
    ///
    /// The certificate is loaded before the socket is bound, so a TLS
    /// failure leaves nothing listening.
    pub async fn bind_with(config: &ServerConfig) -> Result<Self, ServerError> {
        let tls = config
            .certificate
            .as_deref()
            .map(load_acceptor)
            .transpose()?;

        let mut server = Self::bind(config.socket_address()).await?;
        server.tls = tls;
        Ok(server)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }

    /// Serves `app` until Ctrl-C or SIGTERM.
    pub async fn serve(self, app: App) -> Result<(), ServerError> {
        self.serve_with_shutdown(app, shutdown_signal()).await
    }

    /// Serves `app` until `shutdown` resolves, then drains in-flight
    /// connections.
    ///
    /// Connections idle between keep-alive requests are closed rather than
    /// waited on; a request already being handled still gets its response.
    pub async fn serve_with_shutdown<F>(self, app: App, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        info!(address = %self.local_addr, tls = self.tls.is_some(), "webwire listening");

        let mut tasks = JoinSet::new();
        let (stop_tx, stop_rx) = watch::channel(false);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown requested, draining connections");
                    break;
                }

                accepted = self.listener.accept() => {
                    let (stream, peer_addr) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            error!(error = %e, "failed to accept connection");
                            continue;
                        }
                    };

                    debug!(peer = %peer_addr, "connection accepted");
                    let app = app.clone();
                    let tls = self.tls.clone();
                    let mut stop = stop_rx.clone();

                    tasks.spawn(async move {
                        let result = match tls {
                            Some(acceptor) => {
                                let handshake = tokio::select! {
                                    accepted = acceptor.accept(stream) => accepted,
                                    _ = stop.changed() => return,
                                };
                                match handshake {
                                    Ok(stream) => handle_connection(stream, peer_addr, app, stop).await,
                                    Err(e) => {
                                        warn!(peer = %peer_addr, error = %e, "TLS handshake failed");
                                        return;
                                    }
                                }
                            }
                            None => handle_connection(stream, peer_addr, app, stop).await,
                        };
                        if let Err(e) = result {
                            warn!(peer = %peer_addr, error = %e, "connection closed with error");
                        }
                    });
                }

                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        // Receivers that already hung up are fine to ignore.
        let _ = stop_tx.send(true);
        while tasks.join_next().await.is_some() {}

        info!("webwire stopped");
        Ok(())
    }
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
///
/// If a handler cannot be installed, that signal is ignored rather than
/// triggering shutdown.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = sigterm => {}
    }
}

/// Handles a single connection over its lifetime.
///
/// HTTP/1.1 connections are persistent by default: one request per
/// iteration until the peer closes, signals `Connection: close`, or `stop`
/// changes while the connection waits for more bytes.
async fn handle_connection<S>(
    mut stream: S,
    peer_addr: SocketAddr,
    app: App,
    mut stop: watch::Receiver<bool>,
) -> Result<(), std::io::Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = BytesMut::with_capacity(INITIAL_BUF_SIZE);

    loop {
        let bytes_read = tokio::select! {
            read = stream.read_buf(&mut buf) => read?,
            _ = stop.changed() => {
                debug!(peer = %peer_addr, "server shutting down, closing connection");
                let _ = stream.shutdown().await;
                return Ok(());
            }
        };

        if bytes_read == 0 {
            debug!(peer = %peer_addr, "connection closed by peer");
            break;
        }

        if buf.len() > MAX_REQUEST_SIZE {
            warn!(peer = %peer_addr, "request too large, sending 413");
            let response = Response::new(StatusCode::PayloadTooLarge)
                .body("Request entity too large")
                .keep_alive(false);
            stream.write_all(&response.into_bytes()).await?;
            break;
        }

        // A single read may carry several pipelined requests.
        while !buf.is_empty() {
            let (request, body_offset) = match Request::parse(&buf) {
                Ok(pair) => pair,
                Err(RequestError::Incomplete) => break,
                Err(e) => {
                    warn!(peer = %peer_addr, error = %e, "bad request, sending 400");
                    let response = Response::new(StatusCode::BadRequest)
                        .body(format!("Bad Request: {e}"))
                        .keep_alive(false);
                    stream.write_all(&response.into_bytes()).await?;
                    stream.flush().await?;
                    return Ok(());
                }
            };

            let declared = request.content_length().unwrap_or(0);
            let total_needed = match body_offset.checked_add(declared) {
                Some(total) if total <= MAX_REQUEST_SIZE => total,
                _ => {
                    warn!(peer = %peer_addr, declared, "declared body too large, sending 413");
                    let response = Response::new(StatusCode::PayloadTooLarge)
                        .body("Request entity too large")
                        .keep_alive(false);
                    stream.write_all(&response.into_bytes()).await?;
                    stream.flush().await?;
                    return Ok(());
                }
            };
            if buf.len() < total_needed {
                break;
            }

            let keep_alive = request.is_keep_alive();
            let method = request.method().clone();
            let path = request.path().to_owned();

            let response = app.handle(request).await;
            let response = if keep_alive {
                response
            } else {
                response.keep_alive(false)
            };
            let close = !response.is_keep_alive();
            debug!(
                peer = %peer_addr,
                method = %method,
                path = %path,
                status = response.status(),
                "request handled"
            );

            stream.write_all(&response.into_bytes()).await?;
            stream.flush().await?;
            let _ = buf.split_to(total_needed);

            if close {
                debug!(peer = %peer_addr, "Connection: close, shutting down");
                stream.shutdown().await?;
                return Ok(());
            }
        }
    }

    Ok(())
}
