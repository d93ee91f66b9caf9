use serde_json::json;
use stdfilter::{
    CompiledFilters, DispatchError, FieldRef, FilterDefinitions, FilterKey, FilterKind, FilterMap,
    FilterValue, OrderDirective,
};
use stdfilter_sql::{Join, JoinCatalog, SqlBuilderError, SqlQuery, SqlValue};

const BASE: &str = r#"SELECT "users".* FROM "users" AS "users""#;
const ROLE_JOIN: &str = r#" INNER JOIN "roles" AS "role" ON "users"."role_id" = "role"."id""#;

fn definitions() -> FilterDefinitions {
    FilterDefinitions::new()
        .with_atom_keys()
        .with_string_keys()
        .with_limit()
        .with_offset()
        .with_order_by()
        .with(FilterKind::EqualTo, ["address"])
        .with(FilterKind::EqualTo, [("username", "name")])
        .with(FilterKind::EqualTo, [("role_name", ("role", "name"))])
        .with(FilterKind::StringContains, ["bio"])
        .with(FilterKind::ListContainsAny, ["tags"])
        .with(FilterKind::GreaterOrEqual, [("since", "inserted_at")])
}

fn catalog() -> JoinCatalog {
    JoinCatalog::new().with_join(Join::inner(
        "roles",
        "role",
        FieldRef::new("users", "role_id"),
        "id",
    ))
}

fn filters() -> CompiledFilters<SqlQuery> {
    CompiledFilters::compile(&definitions(), "users", catalog().into_resolver())
        .expect("definitions compile")
}

#[test]
fn empty_filters_select_everything() {
    let built = filters()
        .apply(SqlQuery::new("users"), &FilterMap::new())
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(built.sql, BASE);
    assert!(built.params.is_empty());
}

#[test]
fn equal_to_binds_value() {
    let map = FilterMap::new().with(FilterKey::atom("address"), "Main St");
    let built = filters()
        .apply(SqlQuery::new("users"), &map)
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(built.sql, format!(r#"{BASE} WHERE ("users"."address" = $1)"#));
    assert_eq!(built.params, vec![SqlValue::Text("Main St".into())]);
}

#[test]
fn order_by_alias_joins_role_once() {
    let map = FilterMap::new()
        .with(FilterKey::atom("role_name"), "admin")
        .with(
            FilterKey::atom("order_by"),
            vec![
                FilterValue::from(OrderDirective::desc("role_name")),
                FilterValue::from("address"),
            ],
        );
    let built = filters()
        .apply(SqlQuery::new("users"), &map)
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(
        built.sql,
        format!(
            r#"{BASE}{ROLE_JOIN} WHERE ("role"."name" = $1) ORDER BY "role"."name" DESC, "users"."address" ASC"#
        )
    );
}

#[test]
fn json_request_renders_full_query() {
    let map = FilterMap::from_json(&json!({
        "bio": "rust",
        "tags": ["admin", "ops"],
        "order_by": [{"asc_nulls_last": ["role", "name"]}],
        "limit": 10,
        "offset": "20"
    }))
    .unwrap();
    let built = filters()
        .apply(SqlQuery::new("users"), &map)
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(
        built.sql,
        format!(
            r#"{BASE}{ROLE_JOIN} WHERE ("users"."bio" ILIKE $1) AND ("users"."tags" && $2) ORDER BY "role"."name" ASC NULLS LAST LIMIT 10 OFFSET 20"#
        )
    );
    assert_eq!(
        built.params,
        vec![
            SqlValue::Text("%rust%".into()),
            SqlValue::Array(vec![
                SqlValue::Text("admin".into()),
                SqlValue::Text("ops".into())
            ]),
        ]
    );
}

#[test]
fn scalar_for_contains_any_has_no_match() {
    let map = FilterMap::new().with(FilterKey::text("tags"), "admin");
    let err = filters().apply(SqlQuery::new("users"), &map).unwrap_err();
    assert!(matches!(err, DispatchError::NoMatch { .. }));
}

#[test]
fn unresolved_relation_fails_at_build() {
    let filters =
        CompiledFilters::<SqlQuery>::compile_without_resolver(&definitions(), "users").unwrap();
    let map = FilterMap::new().with(FilterKey::atom("role_name"), "admin");
    let query = filters.apply(SqlQuery::new("users"), &map).unwrap();
    assert!(matches!(
        query.build(),
        Err(SqlBuilderError::UnknownRelation { relation }) if relation == "role"
    ));
}

#[test]
fn invalid_column_surfaces_as_query_error() {
    let defs = FilterDefinitions::new()
        .with_atom_keys()
        .with(FilterKind::EqualTo, [("nickname", "nick name")]);
    let filters = CompiledFilters::compile(&defs, "users", catalog().into_resolver()).unwrap();
    let map = FilterMap::new().with(FilterKey::atom("nickname"), "x");

    let err = filters.apply(SqlQuery::new("users"), &map).unwrap_err();
    let DispatchError::Query(source) = err else {
        panic!("expected a query error, got {err:?}");
    };
    assert!(matches!(
        source.downcast_ref::<SqlBuilderError>(),
        Some(SqlBuilderError::InvalidIdentifier(_))
    ));
}

#[test]
fn count_query_shares_conditions() {
    let map = FilterMap::new()
        .with(FilterKey::atom("username"), "ada")
        .with(FilterKey::atom("limit"), 5);
    let query = filters().apply(SqlQuery::new("users"), &map).unwrap();
    let count = query.build_count().unwrap();
    assert_eq!(
        count.sql,
        r#"SELECT COUNT(*) AS total FROM "users" AS "users" WHERE ("users"."name" = $1)"#
    );
    assert_eq!(count.params, query.build().unwrap().params);
}
