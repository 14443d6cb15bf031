//! Schema lookup tests
//!
//! Covers the error-tolerant lookup contract:
//! - Bad placeholders for unknown names
//! - Ambiguous placeholders for duplicate and case-folded names
//! - Deferred errors raised only when a concrete definition is required
//! - Navigation targets through bindings and containment

use odata_uri_diagnostics::{OD0101, OD0102, OD0103, OD0110, OD0111, OD0112, OD0113, OD0202};
use odata_uri_schema::*;
use pretty_assertions::assert_eq;
use rstest::rstest;

fn sales() -> Schema {
    SchemaBuilder::new("Sales")
        .entity_type("Customer", |t| {
            t.key_property("Id", "Edm.Int32")
                .property("Name", "Edm.String")
                .property("Address", "Sales.Address")
                .navigation("Orders", "Collection(Sales.Order)")
        })
        .entity_type("Order", |t| {
            t.key_property("Id", "Edm.Int32")
                .contained("Lines", "Collection(Sales.OrderLine)")
        })
        .entity_type("OrderLine", |t| t.key_property("LineNo", "Edm.Int32"))
        .entity_type("Note", |t| t.property("Text", "Edm.String"))
        .complex_type("Address", |t| t.property("City", "Edm.String").property("city", "Edm.String"))
        .entity_type("Broken", |t| t.key_property("Id", "Sales.Missing"))
        .container("Default")
        .entity_set("Customers", "Sales.Customer")
        .entity_set("customers", "Sales.Customer")
        .entity_set("Orders", "Sales.Order")
        .binding("Customers", "Orders", "Orders")
        .binding("customers", "Orders", "Nowhere")
        .build()
}

#[rstest]
#[case("Sales.Customer", false)]
#[case("Edm.Guid", false)]
#[case("Collection(Edm.Int32)", false)]
#[case("Sales.Unknown", true)]
#[case("Collection(Sales.Unknown)", true)]
fn test_find_type_badness(#[case] name: &str, #[case] bad: bool) {
    assert_eq!(sales().find_type(name).is_bad(), bad);
}

#[test]
fn test_bad_type_raises_only_on_demand() {
    let schema = sales();
    let missing = schema.find_type("Sales.Unknown");
    assert_eq!(missing.errors()[0].code, OD0101);

    let err = missing.require_concrete().unwrap_err();
    assert_eq!(err.code(), OD0101);
}

#[test]
fn test_case_insensitive_navigation_source_is_ambiguous() {
    let schema = sales();
    assert!(!schema.find_navigation_source("Customers", false).is_bad());
    assert!(!schema.find_navigation_source("customers", false).is_bad());

    let folded = schema.find_navigation_source("CUSTOMERS", true);
    assert!(folded.is_bad());
    assert_eq!(folded.errors()[0].code, OD0112);
    assert_eq!(folded.errors()[0].context.as_deref(), Some("candidates: Customers, customers"));
    match folded {
        NavigationSource::Ambiguous(amb) => assert_eq!(amb.candidates.len(), 2),
        other => panic!("expected ambiguous source, got {other}"),
    }

    let missing = schema.find_navigation_source("Suppliers", true);
    assert_eq!(missing.errors()[0].code, OD0102);
}

#[test]
fn test_case_insensitive_property_is_ambiguous() {
    let schema = sales();
    let address = schema.find_type("Sales.Address");
    assert!(schema.find_property(&address, "City", false).is_found());

    let folded = schema.find_property(&address, "CITY", true);
    match folded {
        Lookup::Ambiguous(candidates, errors) => {
            assert_eq!(candidates.len(), 2);
            assert_eq!(errors[0].code, OD0113);
        }
        other => panic!("expected ambiguous property, got {other:?}"),
    }

    let missing = schema.find_property(&address, "Zip", false);
    assert_eq!(missing.errors()[0].code, OD0103);
}

#[test]
fn test_property_lookup_on_bad_type_propagates() {
    let schema = sales();
    let missing = schema.find_type("Sales.Unknown");
    let lookup = schema.find_property(&missing, "Name", false);
    assert_eq!(lookup.errors()[0].code, OD0101);
}

#[test]
fn test_key_properties() {
    let schema = sales();
    let customer = schema.find_type("Sales.Customer");
    let keys = schema.key_properties(&customer).unwrap();
    assert_eq!(keys[0].name, "Id");

    let note = schema.find_type("Sales.Note");
    assert_eq!(schema.key_properties(&note).unwrap_err().code(), OD0202);

    let broken = schema.find_type("Sales.Broken");
    assert_eq!(schema.key_properties(&broken).unwrap_err().code(), OD0101);
}

#[test]
fn test_navigation_targets() {
    let schema = sales();
    let customers = schema.find_navigation_source("Customers", false);
    let customer = schema.navigation_source_type(&customers);
    let orders = schema.find_property(&customer, "Orders", false).found().unwrap();
    let nav = orders.property.as_navigation().unwrap();

    let target = schema.find_navigation_target(&customers, nav, "Orders").unwrap();
    assert_eq!(target.kind(), NavigationSourceKind::EntitySet);

    // binding to an undeclared set is Bad, not absent
    let lower = schema.find_navigation_source("customers", false);
    let dangling = schema.find_navigation_target(&lower, nav, "Orders").unwrap();
    assert!(dangling.is_bad());

    // containment produces a contained set under the parent
    let order = schema.navigation_source_type(&target);
    let lines = schema.find_property(&order, "Lines", false).found().unwrap();
    let contained = schema
        .find_navigation_target(&target, lines.property.as_navigation().unwrap(), "Lines")
        .unwrap();
    assert_eq!(contained.kind(), NavigationSourceKind::Contained);
    assert_eq!(contained.to_string(), "Orders/Lines");
    assert_eq!(schema.navigation_source_type(&contained).name(), "OrderLine");
}

#[test]
fn test_unbound_navigation_has_no_target() {
    let schema = SchemaBuilder::new("N")
        .entity_type("A", |t| t.key_property("Id", "Edm.Int32").navigation("Next", "N.A"))
        .entity_set("As", "N.A")
        .build();
    let source = schema.find_navigation_source("As", false);
    let a = schema.find_type("N.A");
    let next = schema.find_property(&a, "Next", false).found().unwrap();
    assert!(schema
        .find_navigation_target(&source, next.property.as_navigation().unwrap(), "Next")
        .is_none());
}

#[test]
fn test_overloads_ranked_by_binding_distance() {
    let schema = SchemaBuilder::new("Shop")
        .entity_type("Item", |t| t.key_property("Id", "Edm.Int32"))
        .entity_type("Book", |t| t.base("Shop.Item"))
        .entity_type("Ebook", |t| t.base("Shop.Book"))
        .function("Describe", |f| f.bound_to("Shop.Item").returns("Edm.String"))
        .function("Describe", |f| f.bound_to("Shop.Book").returns("Edm.String"))
        .function("Describe", |f| f.returns("Edm.String"))
        .build();

    let ebook = schema.find_type("Shop.Ebook");
    let ranked = schema.find_operations("Shop.Describe", Some(&ebook));
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].binding_parameter().unwrap().type_expr.to_string(), "Shop.Book");

    let unbound = schema.find_operations("Shop.Describe", None);
    assert_eq!(unbound.len(), 1);
    assert!(!unbound[0].is_bound);

    assert_eq!(schema.find_operations_ignore_case("shop.describe", None).len(), 1);
    let simple = schema.find_operations_by_simple_name("Describe", Some(&ebook), false).unwrap();
    assert_eq!(simple.len(), 2);
}

#[test]
fn test_simple_name_shared_by_namespaces_is_ambiguous() {
    let schema = SchemaBuilder::new("A")
        .entity_type("T", |t| t.key_property("Id", "Edm.Int32"))
        .function("F", |f| f.bound_to("A.T").parameter("x", "Edm.Int32").returns("Edm.Int32"))
        .namespace("B")
        .function("F", |f| f.bound_to("A.T").parameter("y", "Edm.Int32").returns("Edm.Int32"))
        .function("G", |f| f.bound_to("A.T").returns("Edm.Int32"))
        .build();
    let t = schema.find_type("A.T");

    let err = schema.find_operations_by_simple_name("F", Some(&t), false).unwrap_err();
    assert_eq!(err.code(), OD0110);
    assert_eq!(err.to_diagnostic().context.as_deref(), Some("candidates: A, B"));
    assert!(schema.find_operations_by_simple_name("f", Some(&t), true).is_err());

    let unique = schema.find_operations_by_simple_name("G", Some(&t), false).unwrap();
    assert_eq!(unique[0].full_name(), "B.G");
    assert!(schema.find_operations_by_simple_name("H", Some(&t), false).unwrap().is_empty());
}

#[test]
fn test_duplicate_definitions_keep_all_candidates() {
    let schema = SchemaBuilder::new("Geo")
        .complex_type("Point", |t| t.property("X", "Edm.Double"))
        .complex_type("Point", |t| t.property("Lat", "Edm.Double"))
        .build();
    match schema.find_type("Geo.Point") {
        SchemaType::Ambiguous(amb) => {
            assert_eq!(amb.candidates.len(), 2);
            assert_eq!(amb.errors[0].code, OD0111);
        }
        other => panic!("expected ambiguous type, got {other}"),
    }
    assert_eq!(schema.find_type("Geo.Point").kind(), TypeKind::Complex);
}

#[test]
fn test_validate_reports_dangling_references() {
    let errors = sales().validate();
    let codes: Vec<_> = errors.iter().map(|d| d.code).collect();
    assert!(codes.contains(&OD0101));
    assert!(codes.contains(&OD0102));
}
