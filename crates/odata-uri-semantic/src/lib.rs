//! Semantic resolution of OData resource paths and query options
//!
//! This crate turns syntactic input into typed, validated structures:
//! - [`PathWalker`]: raw path segments to a typed [`ODataPath`]
//! - [`QueryBinder`]: query option tokens to [`BoundQueryOptions`]
//! - [`ResolverPolicy`]: pluggable name lookup shared by both
//!
//! Resolution is a pure computation over an immutable [`Schema`]; walkers
//! and binders are created per request and discarded afterwards.
//!
//! [`Schema`]: odata_uri_schema::Schema

pub mod binder;
pub mod expression;
pub mod functions;
pub mod limits;
pub mod path;
pub mod policy;
pub mod scope;
pub mod segment;
pub mod walker;

pub use binder::*;
pub use expression::*;
pub use functions::{FunctionSignature, FunctionTable, ResolvedOverload};
pub use limits::*;
pub use path::*;
pub use policy::*;
pub use scope::{RangeVariable, ScopeKind, ScopeManager};
pub use segment::*;
pub use walker::*;
