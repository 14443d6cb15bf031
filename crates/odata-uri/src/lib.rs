//! OData URI path and query option resolution for Rust
//!
//! This crate ties the resolution pipeline together:
//! - Splitting resource paths into raw segments
//! - Resolving segments against a schema into a typed path
//! - Binding `$filter`, `$orderby`, `$select`, `$expand` and the scalar
//!   options against the resolved target
//! - Literal parsing, conversion and formatting
//!
//! # Example
//!
//! ```
//! use odata_uri::{ParserSettings, QueryResolver, RawRequest};
//! use odata_uri::schema::SchemaBuilder;
//!
//! let schema = SchemaBuilder::new("Sales")
//!     .entity_type("Customer", |t| t.key_property("Id", "Edm.Int32"))
//!     .entity_set("Customers", "Sales.Customer")
//!     .build();
//!
//! let resolver = QueryResolver::new(&schema, ParserSettings::default());
//! let resolved = resolver.resolve(&RawRequest::parse("/Customers(1)").unwrap()).unwrap();
//! assert_eq!(resolved.path.to_uri(), "/Customers(1)");
//! ```

mod resolver;
mod settings;

// Re-export all public APIs from internal crates
pub use odata_uri_diagnostics as diagnostics;
pub use odata_uri_literal as literal;
pub use odata_uri_schema as schema;
pub use odata_uri_semantic as semantic;
pub use odata_uri_syntax as syntax;

// Convenience re-exports
pub use odata_uri_diagnostics::{Result, UriError};
pub use odata_uri_schema::Schema;
pub use odata_uri_semantic::{ODataPath, PathKind};
pub use odata_uri_syntax::{QueryOptionsToken, RawPath};
pub use resolver::{QueryResolver, RawRequest, ResolvedRequest};
pub use settings::ParserSettings;
