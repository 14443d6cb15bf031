//! URL literal values and primitive coercion
//!
//! This crate reconciles literal text from URLs (key predicates, function
//! arguments, expression constants) with the primitive types of a schema:
//! - [`parse_literal`] / [`to_literal_text`]: the URL literal grammar
//! - [`from_literal_text`]: parse and convert to an expected type
//! - [`Coercer`]: numeric widening, temporal conversion, typed nulls

mod coercion;
mod text;
mod value;
mod version;

pub use coercion::*;
pub use text::*;
pub use value::*;
pub use version::*;
