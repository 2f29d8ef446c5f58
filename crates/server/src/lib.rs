//! vdigest server - HTTP API for the video digest pipeline
//!
//! Submitting a URL returns immediately with a request id; the digest is
//! produced asynchronously and polled for.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `POST /api/v1/digests` `{"youtubeUrl": "..."}` - `202 Accepted`,
//!   `Location` points at the by-request lookup, body `{"requestId": "..."}`
//! - `GET /api/v1/digests/{id}` - stored digest by internal id
//! - `GET /api/v1/digests?requestId=...` - stored digest by request id
//! - `GET /api/v1/digests/by-request/{request_id}` - same, as a path
//! - `GET /health`, `GET /ready` - liveness and readiness checks
//! - `GET /metrics` - Prometheus metrics
//!
//! Lookups answer `404` until the digest has been stored.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
