//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     mapping URL → refresher.rs (MappingSource::fetch, fatal on error)
//!     → remapper.rs (RouteRemapper::set)
//!
//! Every minute (background task):
//!     MappingSource::fetch → RouteRemapper::set, or log and keep old table
//!
//! Incoming request target
//!     → remapper.rs (snapshot, first prefix match rewrites the target)
//!     → rewritten target, or NotFound in exclusive mode
//! ```

pub mod refresher;
pub mod remapper;

pub use refresher::{MappingError, MappingRefresher, MappingSource};
pub use remapper::{RemapError, RouteMappingTable, RouteRemapper};
