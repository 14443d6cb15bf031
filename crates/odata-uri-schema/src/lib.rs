//! Error-tolerant schema model for OData URI resolution
//!
//! The [`Schema`] is a read-only catalog of primitive, structured and enum
//! types, functions and actions, and the entity container. Lookups are
//! error-tolerant: a name that matches nothing yields a Bad element, a name
//! that matches several definitions yields an Ambiguous element, and both
//! carry the diagnostics that are raised only when a concrete definition is
//! actually required.
//!
//! ```
//! use odata_uri_schema::SchemaBuilder;
//!
//! let schema = SchemaBuilder::new("Sales")
//!     .entity_type("Customer", |t| t.key_property("Id", "Edm.Int32"))
//!     .entity_set("Customers", "Sales.Customer")
//!     .build();
//!
//! assert!(!schema.find_navigation_source("Customers", false).is_bad());
//! assert!(schema.find_type("Sales.Missing").is_bad());
//! ```

mod builder;
mod document;
mod navigation;
mod operation;
mod primitive;
mod schema;
mod types;

pub use builder::*;
pub use document::*;
pub use navigation::*;
pub use operation::*;
pub use primitive::*;
pub use schema::*;
pub use types::*;
