//! Shared fixtures for semantic resolution tests
//!
//! The `Sales` schema covers every shape the walker and binder handle:
//! inheritance, complex properties with navigation, containment, composite
//! and enum keys, open and media types, and overloaded operations.

#![allow(dead_code)]

use odata_uri_diagnostics::{ErrorCode, Result};
use odata_uri_schema::{Schema, SchemaBuilder};
use odata_uri_semantic::{
    BoundQueryOptions, DefaultResolver, ODataPath, PathWalker, QueryBinder, ResolverPolicy,
};
use odata_uri_syntax::{QueryOptionsToken, RawPath};

pub fn sales() -> Schema {
    SchemaBuilder::new("Sales")
        .enum_type("Level", |e| e.members(&["Bronze", "Silver", "Gold"]))
        .enum_type("Access", |e| e.flags().member("Read", 1).member("Write", 2))
        .complex_type("Address", |t| {
            t.property("Street", "Edm.String")
                .property("City", "Edm.String")
                .navigation("Country", "Sales.Country")
        })
        .entity_type("Customer", |t| {
            t.key_property("Id", "Edm.Int32")
                .property("Name", "Edm.String")
                .property("Level", "Sales.Level")
                .property("Address", "Sales.Address")
                .property("Tags", "Collection(Edm.String)")
                .navigation_with_partner("Orders", "Collection(Sales.Order)", "Customer")
        })
        .entity_type("VipCustomer", |t| {
            t.base("Sales.Customer")
                .property("Discount", "Edm.Decimal")
                .navigation("Manager", "Sales.Employee")
        })
        .entity_type("Employee", |t| {
            t.key_property("Id", "Edm.Int32").property("Name", "Edm.String")
        })
        .entity_type("Order", |t| {
            t.key_property("Id", "Edm.Int32")
                .required("Amount", "Edm.Decimal")
                .property("Placed", "Edm.DateTimeOffset")
                .property("Access", "Sales.Access")
                .navigation_with_partner("Customer", "Sales.Customer", "Orders")
                .contained("Lines", "Collection(Sales.OrderLine)")
        })
        .entity_type("OrderLine", |t| {
            t.key_property("LineNo", "Edm.Int32")
                .property("Quantity", "Edm.Int32")
                .navigation("Product", "Sales.Product")
        })
        .entity_type("Product", |t| {
            t.required("Category", "Edm.String")
                .required("Code", "Edm.Int32")
                .key(&["Category", "Code"])
                .property("Price", "Edm.Double")
        })
        .entity_type("Country", |t| {
            t.key_property("Code", "Edm.String").property("Name", "Edm.String")
        })
        .entity_type("Company", |t| {
            t.key_property("Id", "Edm.Int32")
                .property("Name", "Edm.String")
                .navigation("Ceo", "Sales.Employee")
                .navigation("Customers", "Collection(Sales.Customer)")
        })
        .entity_type("Bag", |t| t.key_property("Id", "Edm.Int32").open())
        .entity_type("Document", |t| {
            t.key_property("Id", "Edm.Guid").property("Title", "Edm.String").media()
        })
        .entity_type("Tier", |t| {
            t.key_property("Level", "Sales.Level").property("Threshold", "Edm.Decimal")
        })
        .function("TopOrders", |f| {
            f.bound_to("Sales.Customer")
                .required_parameter("count", "Edm.Int32")
                .returns("Collection(Sales.Order)")
                .entity_set_path("bindingParameter/Orders")
                .composable()
        })
        .function("Rank", |f| f.bound_to("Sales.Customer").returns("Edm.Int32"))
        .function("Describe", |f| f.bound_to("Sales.Customer").returns("Edm.String"))
        .function("Describe", |f| f.bound_to("Sales.VipCustomer").returns("Edm.String"))
        .function("MostValuable", |f| f.returns("Sales.Customer").composable())
        .function("Nearby", |f| {
            f.required_parameter("city", "Edm.String")
                .returns("Collection(Sales.Customer)")
        })
        .function("Nearby", |f| {
            f.required_parameter("lat", "Edm.Double")
                .required_parameter("lon", "Edm.Double")
                .returns("Collection(Sales.Customer)")
        })
        .action("Archive", |a| a.bound_to("Collection(Sales.Order)"))
        .action("Promote", |a| {
            a.bound_to("Sales.Customer")
                .parameter("level", "Sales.Level")
                .returns("Sales.VipCustomer")
        })
        .container("Default")
        .entity_set("Customers", "Sales.Customer")
        .entity_set("Orders", "Sales.Order")
        .entity_set("Employees", "Sales.Employee")
        .entity_set("Products", "Sales.Product")
        .entity_set("Countries", "Sales.Country")
        .entity_set("Bags", "Sales.Bag")
        .entity_set("Documents", "Sales.Document")
        .entity_set("Tiers", "Sales.Tier")
        .singleton("Company", "Sales.Company")
        .binding("Customers", "Orders", "Orders")
        .binding("Customers", "Address/Country", "Countries")
        .binding("Customers", "Sales.VipCustomer/Manager", "Employees")
        .binding("Orders", "Customer", "Customers")
        .binding("Company", "Ceo", "Employees")
        .binding("Company", "Customers", "Customers")
        .function_import("MostValuable", "Sales.MostValuable", Some("Customers"))
        .function_import("Nearby", "Sales.Nearby", Some("Default/Customers"))
        .build()
}

pub fn resolve(schema: &Schema, path: &str) -> Result<ODataPath> {
    resolve_with(schema, &DefaultResolver, path)
}

pub fn resolve_with(schema: &Schema, policy: &dyn ResolverPolicy, path: &str) -> Result<ODataPath> {
    let raw = RawPath::parse(path)?;
    PathWalker::new(schema, policy).walk(&raw)
}

pub fn error_code<T: std::fmt::Debug>(result: Result<T>) -> ErrorCode {
    result.expect_err("resolution should fail").code()
}

/// Resolve `path` and bind `options` against it with the default policy
pub fn bind(schema: &Schema, path: &str, options: &QueryOptionsToken) -> Result<BoundQueryOptions> {
    let path = resolve(schema, path)?;
    QueryBinder::new(schema, &DefaultResolver).bind_options(options, &path)
}
