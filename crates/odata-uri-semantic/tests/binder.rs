//! Query option binding against resolved paths

mod common;

use common::*;
use odata_uri_diagnostics::*;
use odata_uri_literal::LiteralValue;
use odata_uri_schema::{PrimitiveKind, TypeReference};
use odata_uri_semantic::{
    BoundExpr, BoundQueryOptions, DefaultResolver, ExpandLevels, QueryBinder, ResolutionLimits,
    SelectItem, StringAsEnum,
};
use odata_uri_syntax::{
    BinaryOperator, ExpandItemToken, LambdaKind, OrderByToken, OrderDirection, QueryOptionsToken,
    QueryToken, UnaryOperator,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn lit(text: &str) -> QueryToken {
    QueryToken::literal(text)
}

fn path(name: &str) -> QueryToken {
    QueryToken::path(name)
}

fn eq(left: QueryToken, right: QueryToken) -> QueryToken {
    QueryToken::binary(BinaryOperator::Equal, left, right)
}

fn gt(left: QueryToken, right: QueryToken) -> QueryToken {
    QueryToken::binary(BinaryOperator::GreaterThan, left, right)
}

fn filter(token: QueryToken) -> QueryOptionsToken {
    QueryOptionsToken::default().filter(token)
}

fn bind_filter(path: &str, token: QueryToken) -> Result<BoundExpr> {
    let schema = sales();
    let bound = bind(&schema, path, &filter(token))?;
    Ok(bound.filter.expect("filter is bound"))
}

fn bind_limited(path: &str, options: &QueryOptionsToken, limits: ResolutionLimits) -> Result<BoundQueryOptions> {
    let schema = sales();
    let resolved = resolve(&schema, path)?;
    QueryBinder::new(&schema, &DefaultResolver)
        .with_limits(limits)
        .bind_options(options, &resolved)
}

// === $filter ===

#[test]
fn test_filter_comparison() {
    let expr = bind_filter("/Customers", eq(path("Name"), lit("'Ann'"))).unwrap();
    assert_eq!(expr.primitive_kind(), Some(PrimitiveKind::Boolean));
    let BoundExpr::Binary { left, .. } = &expr else {
        panic!("expected binary expression");
    };
    let BoundExpr::Property { property, .. } = left.as_ref() else {
        panic!("expected property");
    };
    assert_eq!(property.name(), "Name");
}

#[test]
fn test_filter_numeric_promotion_and_navigation() {
    assert!(bind_filter("/Orders", gt(path("Amount"), lit("10"))).is_ok());
    assert!(bind_filter("/Orders", gt(QueryToken::path_of(&["Customer", "Address", "City"]), lit("'A'"))).is_ok());
    assert!(bind_filter("/Customers(1)/Orders", gt(path("Amount"), lit("2.5"))).is_ok());
}

#[test]
fn test_filter_on_counted_collection() {
    assert!(bind_filter("/Customers/$count", eq(path("Name"), lit("'Ann'"))).is_ok());
}

#[rstest]
#[case("/Customers", path("Name"), OD0304)]
#[case("/Customers", gt(path("Name"), lit("1")), OD0303)]
#[case("/Customers", eq(path("Nope"), lit("1")), OD0103)]
#[case("/Customers", eq(path("$x"), lit("1")), OD0107)]
#[case("/Customers", eq(QueryToken::path_of(&["Orders", "Amount"]), lit("1")), OD0200)]
#[case("/Customers", eq(QueryToken::path_of(&["Name", "Length"]), lit("1")), OD0204)]
#[case("/Customers", eq(QueryToken::path_of(&["Sales.Order", "Amount"]), lit("1")), OD0203)]
#[case("/Customers(1)", eq(path("Name"), lit("'Ann'")), OD0200)]
fn test_filter_errors(#[case] uri: &str, #[case] token: QueryToken, #[case] code: ErrorCode) {
    assert_eq!(error_code(bind_filter(uri, token)), code);
}

#[test]
fn test_filter_type_cast_member() {
    let token = gt(QueryToken::path_of(&["Sales.VipCustomer", "Discount"]), lit("1"));
    let expr = bind_filter("/Customers", token).unwrap();
    let BoundExpr::Binary { left, .. } = &expr else {
        panic!("expected binary expression");
    };
    let BoundExpr::Property { source, .. } = left.as_ref() else {
        panic!("expected property");
    };
    assert!(matches!(source.as_ref(), BoundExpr::TypeCast { .. }));
}

#[test]
fn test_filter_open_type_member_is_dynamic() {
    let expr = bind_filter("/Bags", eq(path("Color"), lit("'red'"))).unwrap();
    let BoundExpr::Binary { left, .. } = &expr else {
        panic!("expected binary expression");
    };
    assert!(matches!(left.as_ref(), BoundExpr::DynamicProperty { name, .. } if name == "Color"));
}

#[test]
fn test_unary_operators() {
    let not = QueryToken::unary(UnaryOperator::Not, eq(path("Name"), lit("'a'")));
    assert!(bind_filter("/Customers", not).is_ok());

    let negate = gt(QueryToken::unary(UnaryOperator::Negate, path("Amount")), lit("0"));
    assert!(bind_filter("/Orders", negate).is_ok());

    let bad_not = QueryToken::unary(UnaryOperator::Not, path("Name"));
    assert_eq!(error_code(bind_filter("/Customers", bad_not)), OD0304);
    let bad_negate = eq(QueryToken::unary(UnaryOperator::Negate, path("Name")), lit("'a'"));
    assert_eq!(error_code(bind_filter("/Customers", bad_negate)), OD0303);
}

// === Lambdas and range variables ===

#[test]
fn test_lambda_variable_is_typed() {
    let token = path("Orders").any("o", gt(path("o").member("Amount"), lit("100")));
    let expr = bind_filter("/Customers", token).unwrap();
    let BoundExpr::Lambda {
        kind,
        variable,
        body: Some(body),
        ..
    } = &expr
    else {
        panic!("expected lambda");
    };
    assert_eq!(*kind, LambdaKind::Any);
    assert_eq!(variable.as_deref(), Some("o"));

    let BoundExpr::Binary { left, .. } = body.as_ref() else {
        panic!("expected binary body");
    };
    let BoundExpr::Property { source, .. } = left.as_ref() else {
        panic!("expected property");
    };
    let BoundExpr::RangeVariable { name, ty } = source.as_ref() else {
        panic!("expected range variable");
    };
    assert_eq!(name, "o");
    assert_eq!(ty.ty.full_name(), "Sales.Order");
}

#[test]
fn test_nested_lambda_sees_outer_variable() {
    let inner = QueryToken::binary(
        BinaryOperator::And,
        gt(path("l").member("Quantity"), lit("1")),
        gt(path("o").member("Amount"), lit("5")),
    );
    let token = path("Orders").any("o", path("o").member("Lines").all("l", inner));
    assert!(bind_filter("/Customers", token).is_ok());
}

#[test]
fn test_lambda_variable_out_of_scope() {
    let token = QueryToken::binary(
        BinaryOperator::And,
        path("Orders").any("o", gt(path("o").member("Amount"), lit("1"))),
        gt(path("o").member("Amount"), lit("1")),
    );
    // outside the lambda `o` reads as a property of the customer
    assert_eq!(error_code(bind_filter("/Customers", token)), OD0103);
}

#[test]
fn test_lambda_errors() {
    let on_single = path("Name").any("x", lit("true"));
    assert_eq!(error_code(bind_filter("/Customers", on_single)), OD0200);

    let not_boolean = path("Orders").any("o", path("o").member("Amount"));
    assert_eq!(error_code(bind_filter("/Customers", not_boolean)), OD0304);

    let bare_all = QueryToken::Lambda {
        kind: LambdaKind::All,
        parent: Box::new(path("Orders")),
        variable: None,
        body: None,
    };
    assert_eq!(error_code(bind_filter("/Customers", bare_all)), OD0403);

    let bare_any = QueryToken::Lambda {
        kind: LambdaKind::Any,
        parent: Box::new(path("Tags")),
        variable: None,
        body: None,
    };
    assert!(bind_filter("/Customers", bare_any).is_ok());
}

#[test]
fn test_lambda_depth_limit() {
    let token = path("Orders").any(
        "o",
        path("o").member("Lines").any("l", gt(path("l").member("Quantity"), lit("1"))),
    );
    let limits = ResolutionLimits {
        max_lambda_depth: 1,
        ..ResolutionLimits::default()
    };
    let result = bind_limited("/Customers", &filter(token.clone()), limits);
    assert_eq!(error_code(result), OD0503);
    assert!(bind_limited("/Customers", &filter(token), ResolutionLimits::default()).is_ok());
}

// === Functions ===

#[rstest]
#[case(QueryToken::call("contains", vec![path("Name"), lit("'a'")]))]
#[case(QueryToken::call("startswith", vec![QueryToken::path_of(&["Address", "City"]), lit("'Ber'")]))]
#[case(eq(QueryToken::call("length", vec![path("Name")]), lit("3")))]
#[case(eq(QueryToken::call("tolower", vec![path("Name")]), lit("'ann'")))]
#[case(eq(QueryToken::call("concat", vec![path("Name"), lit("null")]), lit("'x'")))]
fn test_builtin_functions(#[case] token: QueryToken) {
    assert!(bind_filter("/Customers", token).is_ok());
}

#[test]
fn test_date_and_math_functions() {
    let year = eq(QueryToken::call("year", vec![path("Placed")]), lit("2024"));
    assert!(bind_filter("/Orders", year).is_ok());

    let round = gt(QueryToken::call("round", vec![path("Amount")]), lit("10"));
    let expr = bind_filter("/Orders", round).unwrap();
    let BoundExpr::Binary { left, .. } = &expr else {
        panic!("expected binary expression");
    };
    assert_eq!(left.primitive_kind(), Some(PrimitiveKind::Decimal));
}

#[rstest]
#[case(QueryToken::call("contains", vec![path("Name"), lit("1")]), OD0404)]
#[case(QueryToken::call("contains", vec![path("Address"), lit("'a'")]), OD0303)]
#[case(QueryToken::call("nosuchfunction", vec![path("Name")]), OD0104)]
fn test_builtin_function_errors(#[case] token: QueryToken, #[case] code: ErrorCode) {
    assert_eq!(error_code(bind_filter("/Customers", token)), code);
}

#[test]
fn test_isof_and_cast() {
    let isof = QueryToken::call("isof", vec![path("Sales.VipCustomer")]);
    let expr = bind_filter("/Customers", isof).unwrap();
    let BoundExpr::Function { name, arguments, .. } = &expr else {
        panic!("expected function");
    };
    assert_eq!(name, "isof");
    assert_eq!(
        arguments[1],
        BoundExpr::Constant {
            value: LiteralValue::string("Sales.VipCustomer"),
            ty: Some(TypeReference::primitive(PrimitiveKind::String, false)),
        }
    );

    let cast = gt(
        QueryToken::call("cast", vec![path("Amount"), lit("'Edm.Double'")]),
        lit("1"),
    );
    assert!(bind_filter("/Orders", cast).is_ok());

    let unrelated = QueryToken::call("isof", vec![path("Sales.Order")]);
    assert_eq!(error_code(bind_filter("/Customers", unrelated)), OD0203);
}

#[test]
fn test_bound_schema_function_in_filter() {
    let rank = gt(QueryToken::path("$it").bound_call("Sales.Rank", vec![]), lit("3"));
    assert!(bind_filter("/Customers", rank).is_ok());

    let top = QueryToken::path("$it")
        .bound_call("Sales.TopOrders", vec![("count", lit("2"))])
        .any("o", gt(path("o").member("Amount"), lit("1")));
    assert!(bind_filter("/Customers", top).is_ok());

    let wrong_type = QueryToken::path("$it")
        .bound_call("Sales.TopOrders", vec![("count", lit("'x'"))])
        .any("o", lit("true"));
    assert_eq!(error_code(bind_filter("/Customers", wrong_type)), OD0303);

    let action = QueryToken::path("$it").bound_call("Sales.Promote", vec![]);
    assert_eq!(error_code(bind_filter("/Customers", action)), OD0104);
}

// === Enums, in and lists ===

#[test]
fn test_enum_comparisons() {
    assert!(bind_filter("/Customers", eq(path("Level"), lit("Sales.Level'Gold'"))).is_ok());
    let has = QueryToken::binary(BinaryOperator::Has, path("Access"), lit("Sales.Access'Read'"));
    assert!(bind_filter("/Orders", has).is_ok());
    assert_eq!(
        error_code(bind_filter("/Customers", eq(path("Level"), lit("Sales.Level'Platinum'")))),
        OD0106
    );
}

#[test]
fn test_string_as_enum_policy() {
    let schema = sales();
    let token = eq(path("Level"), lit("'Gold'"));
    assert_eq!(error_code(bind_filter("/Customers", token.clone())), OD0303);

    let policy = StringAsEnum(DefaultResolver);
    let resolved = resolve_with(&schema, &policy, "/Customers").unwrap();
    let bound = QueryBinder::new(&schema, &policy)
        .bind_options(&filter(token), &resolved)
        .unwrap();
    let Some(BoundExpr::Binary { right, .. }) = bound.filter else {
        panic!("expected binary filter");
    };
    assert!(matches!(
        right.as_ref(),
        BoundExpr::Constant {
            value: LiteralValue::Enum(_),
            ..
        }
    ));
}

#[test]
fn test_in_operator() {
    let list = QueryToken::List(vec![lit("'a'"), lit("'b'")]);
    assert!(bind_filter("/Customers", path("Name").is_in(list)).is_ok());

    let with_null = QueryToken::List(vec![lit("1"), lit("null"), lit("2")]);
    assert!(bind_filter("/Customers", path("Id").is_in(with_null)).is_ok());

    let mismatched = QueryToken::List(vec![lit("'a'"), lit("'b'")]);
    assert_eq!(error_code(bind_filter("/Customers", path("Id").is_in(mismatched))), OD0303);

    let mixed = QueryToken::List(vec![lit("1"), lit("'b'")]);
    assert_eq!(error_code(bind_filter("/Customers", path("Id").is_in(mixed))), OD0303);

    assert!(bind_filter("/Customers", lit("'x'").is_in(path("Tags"))).is_ok());
    assert_eq!(error_code(bind_filter("/Customers", path("Id").is_in(path("Name")))), OD0303);
}

#[test]
fn test_in_list_of_enum_member_strings() {
    let schema = sales();
    let list = QueryToken::List(vec![lit("'Gold'"), lit("'Silver'")]);
    let token = path("Level").is_in(list);
    assert_eq!(error_code(bind_filter("/Customers", token.clone())), OD0303);

    let policy = StringAsEnum(DefaultResolver);
    let resolved = resolve_with(&schema, &policy, "/Customers").unwrap();
    let bound = QueryBinder::new(&schema, &policy)
        .bind_options(&filter(token), &resolved)
        .unwrap();
    let Some(BoundExpr::In { right, .. }) = bound.filter else {
        panic!("expected in filter");
    };
    let BoundExpr::Collection { items, ty } = right.as_ref() else {
        panic!("expected list operand");
    };
    assert!(items
        .iter()
        .all(|item| matches!(item, BoundExpr::Constant { value: LiteralValue::Enum(_), .. })));
    assert_eq!(ty.ty.element_type().full_name(), "Sales.Level");

    let unknown = path("Level").is_in(QueryToken::List(vec![lit("'Gold'"), lit("'Platinum'")]));
    let err = QueryBinder::new(&schema, &policy)
        .bind_options(&filter(unknown), &resolved)
        .unwrap_err();
    assert_eq!(err.code(), OD0106);
}

// === $orderby ===

#[test]
fn test_order_by() {
    let schema = sales();
    let options = QueryOptionsToken::default()
        .order_by(OrderByToken::desc(path("Name")))
        .order_by(OrderByToken::asc(QueryToken::path_of(&["Address", "City"])));
    let bound = bind(&schema, "/Customers", &options).unwrap();
    assert_eq!(bound.order_by.len(), 2);
    assert_eq!(bound.order_by[0].direction, OrderDirection::Descending);
    assert_eq!(bound.order_by[1].direction, OrderDirection::Ascending);
}

#[rstest]
#[case("Address")]
#[case("Orders")]
#[case("Tags")]
fn test_order_by_rejects_non_scalar(#[case] name: &str) {
    let schema = sales();
    let options = QueryOptionsToken::default().order_by(OrderByToken::asc(path(name)));
    assert_eq!(error_code(bind(&schema, "/Customers", &options)), OD0303);
}

// === $select / $expand ===

#[test]
fn test_select_items() {
    let schema = sales();
    let options = QueryOptionsToken::default()
        .select("Name")
        .select("Address/City")
        .select("Sales.VipCustomer/Discount")
        .select("Sales.*")
        .select("Sales.Rank");
    let bound = bind(&schema, "/Customers", &options).unwrap();
    let select = &bound.select_expand.select;
    assert_eq!(select.len(), 5);
    assert!(matches!(&select[0], SelectItem::Path(p) if p.len() == 1));
    assert!(matches!(&select[1], SelectItem::Path(p) if p.len() == 2));
    assert!(matches!(&select[2], SelectItem::Path(p) if p.len() == 2));
    assert_eq!(
        select[3],
        SelectItem::AllOperations {
            namespace: "Sales".to_string()
        }
    );
    assert!(matches!(&select[4], SelectItem::Operation(ops) if ops.len() == 1));
    assert!(!bound.select_expand.all_selected());

    let all = bind(&schema, "/Customers(1)", &QueryOptionsToken::default().select("*")).unwrap();
    assert!(all.select_expand.all_selected());
}

#[rstest]
#[case("/Customers", "Nope", OD0103)]
#[case("/Customers", "Nope.*", OD0100)]
#[case("/Customers", "Sales.Nope", OD0104)]
#[case("/Customers", "Orders/Amount", OD0200)]
#[case("/Customers(1)/Name", "Length", OD0204)]
fn test_select_errors(#[case] path: &str, #[case] item: &str, #[case] code: ErrorCode) {
    let schema = sales();
    let options = QueryOptionsToken::default().select(item);
    assert_eq!(error_code(bind(&schema, path, &options)), code);
}

#[test]
fn test_expand_items() {
    let schema = sales();
    let options = QueryOptionsToken::default()
        .expand(ExpandItemToken::parse("Orders"))
        .expand(ExpandItemToken::parse("Address/Country"))
        .expand(ExpandItemToken::parse("Sales.VipCustomer/Manager/$ref"));
    let bound = bind(&schema, "/Customers", &options).unwrap();
    let expand = &bound.select_expand.expand;
    assert_eq!(expand.len(), 3);

    assert_eq!(expand[0].navigation.name, "Orders");
    assert_eq!(expand[0].ty.full_name(), "Collection(Sales.Order)");
    assert_eq!(expand[0].target.as_ref().map(|t| t.name()), Some("Orders"));
    assert_eq!(expand[1].target.as_ref().map(|t| t.name()), Some("Countries"));
    assert!(expand[2].is_ref);
    assert_eq!(expand[2].target.as_ref().map(|t| t.name()), Some("Employees"));
}

#[test]
fn test_expand_with_nested_options() {
    let schema = sales();
    let nested = QueryOptionsToken::default()
        .filter(gt(path("Amount"), lit("10")))
        .select("Amount")
        .top("3")
        .expand(ExpandItemToken::parse("Customer"));
    let options = QueryOptionsToken::default().expand(ExpandItemToken::parse("Orders").with_options(nested));
    let bound = bind(&schema, "/Customers", &options).unwrap();

    let orders = &bound.select_expand.expand[0];
    assert!(orders.options.filter.is_some());
    assert_eq!(orders.options.top, Some(3));
    assert_eq!(orders.options.select_expand.expand[0].navigation.name, "Customer");
    assert_eq!(
        orders.options.select_expand.expand[0].target.as_ref().map(|t| t.name()),
        Some("Customers")
    );
}

#[test]
fn test_expand_star_and_levels() {
    let schema = sales();
    let options = QueryOptionsToken::default().expand(ExpandItemToken::parse("*"));
    let bound = bind(&schema, "/Customers(1)/Sales.VipCustomer", &options).unwrap();
    let names: Vec<&str> = bound
        .select_expand
        .expand
        .iter()
        .map(|e| e.navigation.name.as_str())
        .collect();
    assert_eq!(names, vec!["Orders", "Manager"]);

    let levels = ExpandItemToken::parse("Orders").with_options(QueryOptionsToken::default().levels("max"));
    let bound = bind(&schema, "/Customers", &QueryOptionsToken::default().expand(levels)).unwrap();
    assert_eq!(bound.select_expand.expand[0].options.levels, Some(ExpandLevels::Max));
}

#[rstest]
#[case(ExpandItemToken::parse("Name"), OD0200)]
#[case(ExpandItemToken::parse("Nope"), OD0103)]
#[case(ExpandItemToken::parse("Orders/$ref").with_options(QueryOptionsToken::default().select("Amount")), OD0200)]
#[case(ExpandItemToken::parse("Orders").with_options(QueryOptionsToken::default().levels("0")), OD0006)]
#[case(ExpandItemToken::parse("Orders").with_options(QueryOptionsToken::default().select("Nope")), OD0103)]
fn test_expand_errors(#[case] item: ExpandItemToken, #[case] code: ErrorCode) {
    let schema = sales();
    let options = QueryOptionsToken::default().expand(item);
    assert_eq!(error_code(bind(&schema, "/Customers", &options)), code);
}

#[test]
fn test_expand_limits() {
    let nested = ExpandItemToken::parse("Orders")
        .with_options(QueryOptionsToken::default().expand(ExpandItemToken::parse("Customer")));
    let options = QueryOptionsToken::default().expand(nested);
    let shallow = ResolutionLimits {
        max_expand_depth: 1,
        ..ResolutionLimits::default()
    };
    assert_eq!(error_code(bind_limited("/Customers", &options, shallow)), OD0501);

    let few = ResolutionLimits {
        max_expand_count: 1,
        ..ResolutionLimits::default()
    };
    assert_eq!(error_code(bind_limited("/Customers", &options, few)), OD0502);
    assert!(bind_limited("/Customers", &options, ResolutionLimits::default()).is_ok());
}

// === Scalar options ===

#[test]
fn test_scalar_options() {
    let schema = sales();
    let options = QueryOptionsToken::default()
        .top("5")
        .skip("10")
        .count("true")
        .search(" blue ");
    let bound = bind(&schema, "/Customers", &options).unwrap();
    assert_eq!(bound.top, Some(5));
    assert_eq!(bound.skip, Some(10));
    assert_eq!(bound.count, Some(true));
    assert_eq!(bound.search.as_deref(), Some("blue"));
}

#[test]
fn test_no_options_bind_to_default() {
    let schema = sales();
    let bound = bind(&schema, "/$metadata", &QueryOptionsToken::default()).unwrap();
    assert_eq!(bound, BoundQueryOptions::default());
}

#[rstest]
#[case("/Customers", QueryOptionsToken::default().top("-1"), OD0006)]
#[case("/Customers", QueryOptionsToken::default().skip("many"), OD0006)]
#[case("/Customers", QueryOptionsToken::default().count("yes"), OD0004)]
#[case("/Customers", QueryOptionsToken::default().search("  "), OD0004)]
#[case("/Customers", QueryOptionsToken::default().levels("2"), OD0200)]
#[case("/Customers(1)", QueryOptionsToken::default().top("1"), OD0200)]
#[case("/Customers(1)", QueryOptionsToken::default().count("true"), OD0205)]
#[case("/$metadata", QueryOptionsToken::default().top("1"), OD0200)]
fn test_scalar_option_errors(#[case] path: &str, #[case] options: QueryOptionsToken, #[case] code: ErrorCode) {
    let schema = sales();
    assert_eq!(error_code(bind(&schema, path, &options)), code);
}
