//! End-to-end request resolution against a schema loaded from JSON

use odata_uri::diagnostics::{ErrorCode, OD0103, OD0201, OD0500, OD0501, OD0102};
use odata_uri::semantic::SelectItem;
use odata_uri::syntax::{BinaryOperator, ExpandItemToken, OrderByToken, OrderDirection, QueryToken};
use odata_uri::{
    ParserSettings, PathKind, QueryOptionsToken, QueryResolver, RawRequest, ResolvedRequest, Schema,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn catalog() -> Schema {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/catalog.json");
    Schema::from_json_file(path).expect("catalog fixture loads")
}

fn resolve(settings: ParserSettings, path: &str, options: QueryOptionsToken) -> odata_uri::Result<ResolvedRequest> {
    let schema = catalog();
    let resolver = QueryResolver::new(&schema, settings);
    let request = RawRequest::parse(path)?.with_options(options);
    resolver.resolve(&request)
}

fn error_code(result: odata_uri::Result<ResolvedRequest>) -> ErrorCode {
    result.expect_err("request should fail").code()
}

#[rstest]
#[case("/Products", PathKind::Collection, Some("Products"))]
#[case("/Products(1)/Supplier", PathKind::Resource, Some("Suppliers"))]
#[case("/Suppliers(1)/Products/$count", PathKind::Count, None)]
#[case("/Products(1)/Catalog.Bundle/Items", PathKind::Collection, Some("Products"))]
#[case("/Products(1)/Reviews(2)", PathKind::Resource, Some("Reviews"))]
#[case("/Flagship/Supplier", PathKind::Resource, Some("Suppliers"))]
#[case("/Products(1)/Size/Width", PathKind::Resource, None)]
#[case("/Products/Catalog.Cheapest()", PathKind::Operation, Some("Products"))]
#[case("/Featured(category=Catalog.Category'Games')", PathKind::Operation, Some("Products"))]
fn test_paths_from_document(#[case] path: &str, #[case] kind: PathKind, #[case] source: Option<&str>) {
    let resolved = resolve(ParserSettings::default(), path, QueryOptionsToken::default()).unwrap();
    assert_eq!(resolved.path.kind(), kind);
    assert_eq!(resolved.path.target_navigation_source().map(|s| s.name()), source);
}

#[test]
fn test_canonical_uri_after_navigation() {
    let resolved = resolve(ParserSettings::default(), "/Suppliers(3)/Products(1)", QueryOptionsToken::default()).unwrap();
    assert_eq!(resolved.path.to_uri(), "/Suppliers(3)/Products(1)");
    assert_eq!(resolved.path.canonical_uri(), "/Products(1)");
}

#[test]
fn test_request_options() {
    let options = QueryOptionsToken::default()
        .filter(QueryToken::binary(
            BinaryOperator::GreaterThan,
            QueryToken::path("Price"),
            QueryToken::literal("10"),
        ))
        .order_by(OrderByToken::desc(QueryToken::path("Name")))
        .select("Name")
        .select("Size/Height")
        .expand(ExpandItemToken::parse("Supplier"))
        .top("20")
        .skip("40")
        .count("true")
        .search("chess");
    let resolved = resolve(ParserSettings::default(), "/Products", options).unwrap();

    assert!(resolved.filter.is_some());
    assert_eq!(resolved.order_by.len(), 1);
    assert_eq!(resolved.order_by[0].direction, OrderDirection::Descending);
    assert_eq!(resolved.select_expand.select.len(), 2);
    assert!(matches!(&resolved.select_expand.select[1], SelectItem::Path(p) if p.len() == 2));
    let supplier = &resolved.select_expand.expand[0];
    assert_eq!(supplier.target.as_ref().map(|t| t.name()), Some("Suppliers"));
    assert_eq!((resolved.top, resolved.skip, resolved.count), (Some(20), Some(40), Some(true)));
    assert_eq!(resolved.search.as_deref(), Some("chess"));
}

#[test]
fn test_settings_document_drives_resolution() {
    let settings = ParserSettings::from_json(r#"{"case_insensitive": true, "unqualified_operations": true}"#).unwrap();
    let resolved = resolve(settings, "/products/cheapest()/supplier", QueryOptionsToken::default()).unwrap();
    assert_eq!(resolved.path.to_uri(), "/Products/Catalog.Cheapest()/Supplier");

    let strict = resolve(ParserSettings::default(), "/products", QueryOptionsToken::default());
    assert_eq!(error_code(strict), OD0102);
}

#[test]
fn test_enum_as_string_setting() {
    let filter = QueryOptionsToken::default().filter(QueryToken::binary(
        BinaryOperator::Equal,
        QueryToken::path("Category"),
        QueryToken::literal("'Games'"),
    ));
    assert!(resolve(ParserSettings::default(), "/Products", filter.clone()).is_err());

    let settings = ParserSettings {
        enum_as_string: true,
        ..Default::default()
    };
    assert!(resolve(settings, "/Products", filter).is_ok());
}

#[rstest]
#[case("/Products(1,2)", QueryOptionsToken::default(), OD0201)]
#[case("/Products(1)/Colour", QueryOptionsToken::default(), OD0103)]
#[case("/Products", QueryOptionsToken::default().select("Colour"), OD0103)]
fn test_request_errors(#[case] path: &str, #[case] options: QueryOptionsToken, #[case] code: ErrorCode) {
    assert_eq!(error_code(resolve(ParserSettings::default(), path, options)), code);
}

#[test]
fn test_limits_from_settings() {
    let settings = ParserSettings {
        max_segments: 2,
        max_expand_depth: 1,
        ..Default::default()
    };
    let deep = resolve(settings.clone(), "/Suppliers(1)/Products(2)/Supplier", QueryOptionsToken::default());
    assert_eq!(error_code(deep), OD0500);

    let nested = ExpandItemToken::parse("Supplier")
        .with_options(QueryOptionsToken::default().expand(ExpandItemToken::parse("Products")));
    let expand = QueryOptionsToken::default().expand(nested);
    assert_eq!(error_code(resolve(settings, "/Products", expand)), OD0501);
}
