//! Syntactic input of OData URI resolution
//!
//! This crate defines what the resolver consumes:
//! - [`RawPath`]: resource path segments with their parentheticals
//! - [`QueryToken`]: expression token trees for `$filter` and `$orderby`
//! - [`QueryOptionsToken`]: `$select`, `$expand` and the scalar options
//!
//! Lexing query option text into token trees is left to the caller; tests
//! build token trees directly.

mod operator;
mod options;
mod path;
mod token;

pub use operator::*;
pub use options::*;
pub use path::*;
pub use token::*;
