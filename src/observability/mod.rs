//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher, transports, route refresher:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and histograms)
//!
//! Consumers:
//!     → stdout
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID (`x-request-id`) is attached to the HTTP trace span
//! - Metric updates are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
