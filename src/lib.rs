//! # webwire
//!
//! A small async HTTP/1.1 server that assembles its request pipeline from
//! priority-ordered middleware and pluggable route providers.
//!
//! Startup runs once, single-threaded: configuration is validated, route
//! providers fill the route table, the table is frozen, and middleware is
//! attached in `(priority, registration order)` order. The result is an
//! immutable [`App`] shared by every connection.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use webwire::{Bootstrap, Config, Response, StatusCode};
//! use webwire::router::{RouteError, RouteTable};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = Bootstrap::new(Config::default())
//!         .route_provider(|routes: &mut RouteTable| -> Result<(), RouteError> {
//!             routes.get("/", |_ctx| async {
//!                 Response::new(StatusCode::Ok).body("Hello, World!")
//!             })?;
//!             Ok(())
//!         })
//!         .bind()
//!         .await?;
//!     println!("Listening on http://{}", service.local_addr());
//!     service.serve().await?;
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod bootstrap;
pub mod config;
pub mod context;
pub mod http;
pub mod middleware;
pub mod router;
pub mod server;

pub use app::App;
pub use bootstrap::{Bootstrap, BootstrapError, Builtin, Service};
pub use config::{Config, ConfigError};
pub use http::{Headers, Method, Request, Response, ResponseFactory, StatusCode};
pub use server::{Server, ServerError};
