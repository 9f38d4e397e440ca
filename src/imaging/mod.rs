//! Image request handling.
//!
//! # Data Flow
//! ```text
//! Inbound request path "/{options}/{remote_url}"
//!     → request.rs (resolve remote URL, split off options)
//!     → options.rs (parse the option list)
//!     → ParsedRequest, fetched as "remote_url#options"
//!
//! Transform (inside the transforming transport):
//!     origin bytes + Options
//!     → engine.rs (decode, crop, resize, rotate, flip, encode)
//! ```

pub mod engine;
pub mod options;
pub mod request;

pub use engine::{ImageTransformer, TransformEngine, TransformError};
pub use options::{Options, OutputFormat};
pub use request::{ParsedRequest, UrlError};
