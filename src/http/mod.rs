//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (axum::serve)
//!     → request.rs (request ID assigned, trace span opened)
//!     → server.rs
//!         /favicon.ico, /, /health-check → answered inline
//!         everything else → timeout → image dispatcher
//!     → response.rs (header projection from the fetched image)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuidV4, RequestIdExt, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
