//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Image request:
//!     → timeouts.rs (race the spawned handler against the deadline)
//!     → handler response, or 504 when the deadline passes first
//! ```
//!
//! # Design Decisions
//! - Work is not cancelled at the deadline; a late fetch still fills the
//!   caches for the next request

pub mod timeouts;
