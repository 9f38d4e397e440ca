//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! ParsedRequest (remote URL, options, inbound headers)
//!     → access_control.rs (referrer, host whitelist, signature)
//!     → signature.rs (HMAC-SHA256 over the remote URL)
//!     → allow, or 403 with the denial reason
//! ```
//!
//! # Design Decisions
//! - Pure functions: no state, no I/O
//! - Fail closed: a malformed referrer or signature denies
//! - Whitelist and signature are alternatives, not both required

pub mod access_control;
pub mod signature;

pub use access_control::{allowed, AccessDenied, AccessPolicy};
