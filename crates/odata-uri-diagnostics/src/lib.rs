//! Diagnostics for OData URI resolution
//!
//! This crate provides the error handling infrastructure shared by the schema
//! model, the literal codec, the path walker and the query option binder:
//! error codes, source locations, value-form diagnostics (carried by Bad and
//! Ambiguous schema elements) and the raised `UriError`.

mod error;
mod error_code;
mod span;

pub use error::*;
pub use error_code::*;
pub use span::*;

/// Result type for URI resolution
pub type Result<T> = std::result::Result<T, UriError>;
