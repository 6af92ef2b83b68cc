use rust_decimal::Decimal;
use sqlbuilder::{
    CursorExt, NumberedValues, ScrollMode, SqlBuilder, SqlError, Value, args, from_numbered, mask,
};
use sqlbuilder_mock::{GENERATED_VALUE, MockConnection, MockResultSet};
use std::collections::HashMap;

#[test]
fn get_list_skips_or_keeps_nulls() {
    let conn = MockConnection::new();
    conn.add_result_set(
        MockResultSet::new("names")
            .columns(["name"])
            .values([Value::from("a"), Value::Null, Value::from("b")]),
    );
    conn.add_result_set(
        MockResultSet::new("names again")
            .columns(["name"])
            .values([Value::from("a"), Value::Null, Value::from("b")]),
    );

    let mut sb = SqlBuilder::new("select name from people");
    let names = sb.get_list(&conn, |rs| rs.get_string("name")).unwrap();
    assert_eq!(names, vec!["a".to_string(), "b".to_string()]);

    let names = sb
        .get_list_with_nulls(&conn, |rs| rs.get_string(1))
        .unwrap();
    assert_eq!(
        names,
        vec![Some("a".to_string()), None, Some("b".to_string())]
    );
    assert_eq!(conn.invocations().statements_closed, 2);
    assert_eq!(conn.invocations().cursors_closed, 2);
}

fn pairs(tag: &str, rows: &[(Value, Value)]) -> MockResultSet {
    rows.iter().fold(
        MockResultSet::new(tag).columns(["k", "v"]),
        |rs, (k, v)| rs.row([k.clone(), v.clone()]),
    )
}

fn read_pair(rs: &mut dyn sqlbuilder::Cursor) -> sqlbuilder::SqlResult<Option<(Option<String>, Option<i64>)>> {
    let key = rs.get_string("k")?;
    let value: Option<i64> = rs.get("v")?;
    Ok(Some((key, value)))
}

#[test]
fn get_map_skips_or_keeps_null_values() {
    let conn = MockConnection::new();
    let rows = [
        (Value::from("a"), Value::from(1)),
        (Value::from("b"), Value::Null),
    ];
    conn.add_result_set(pairs("map", &rows));
    conn.add_result_set(pairs("map with nulls", &rows));

    let mut sb = SqlBuilder::new("select k, v from t");
    let map = sb.get_map(&conn, read_pair).unwrap();
    assert_eq!(map, HashMap::from([("a".to_string(), 1)]));

    let map = sb.get_map_with_nulls(&conn, read_pair).unwrap();
    assert_eq!(
        map,
        HashMap::from([("a".to_string(), Some(1)), ("b".to_string(), None)])
    );
}

#[test]
fn get_map_rejects_duplicate_and_null_keys() {
    let conn = MockConnection::new();
    conn.add_result_set(pairs(
        "duplicate",
        &[
            (Value::from("a"), Value::from(1)),
            (Value::from("a"), Value::from(2)),
        ],
    ));
    conn.add_result_set(pairs("null key", &[(Value::Null, Value::from(1))]));

    let mut sb = SqlBuilder::new("select k, v from t");
    let err = sb.get_map(&conn, read_pair).unwrap_err();
    assert!(matches!(err, SqlError::DuplicateMapKey(ref k) if k == "a"));
    assert!(err.is_consistency());

    let err = sb.get_map(&conn, read_pair).unwrap_err();
    assert!(matches!(err, SqlError::NullMapKey));
    assert_eq!(conn.invocations().statements_closed, 2);
}

#[test]
fn typed_getters_read_the_first_row() {
    let conn = MockConnection::new();
    conn.add_result_set(
        MockResultSet::new("employee")
            .columns(["id", "name", "salary"])
            .row([
                Value::from(7),
                Value::from("Alice"),
                Value::from(Decimal::new(12345, 2)),
            ])
            .row([Value::from(8), Value::from("Bob"), Value::Null]),
    );
    conn.add_result_set(MockResultSet::new("empty").columns(["id"]));

    let mut sb = SqlBuilder::new("select id, name, salary from employee");
    assert_eq!(
        sb.get_decimal(&conn, "SALARY", None).unwrap(),
        Some(Decimal::new(12345, 2))
    );
    assert_eq!(sb.get_int(&conn, 1, -1).unwrap(), -1);
}

#[test]
fn typed_getters_fall_back_to_default_without_rows() {
    let conn = MockConnection::new().without_generated_rows();
    let mut sb = SqlBuilder::new("select count(*) from t");
    assert_eq!(sb.get_int(&conn, 1, 7).unwrap(), 7);
    assert_eq!(sb.get_long(&conn, "n", -1).unwrap(), -1);
    assert_eq!(
        sb.get_string(&conn, 1, Some("none".to_string())).unwrap(),
        Some("none".to_string())
    );
    assert_eq!(sb.get_object(&conn, 1, Value::Null).unwrap(), Value::Null);
}

#[test]
fn unscripted_queries_get_a_generated_row() {
    let conn = MockConnection::new();
    let mut sb = SqlBuilder::new("select anything from anywhere");
    assert_eq!(sb.get_int(&conn, 3, 0).unwrap(), 42);
    assert_eq!(sb.get_long(&conn, "whatever", 0).unwrap(), GENERATED_VALUE);
    assert_eq!(sb.get_double(&conn, 1, 0.0).unwrap(), 42.0);
    assert_eq!(
        sb.get_string(&conn, "name", None).unwrap(),
        Some("42".to_string())
    );
    assert_eq!(conn.invocations().result_sets, 4);
}

#[test]
fn execute_returns_scripted_then_generated_counts() {
    let conn = MockConnection::new();
    conn.add_update_counts([3, 0]);

    let mut sb = SqlBuilder::with_args("delete from t where id in (?)", args![vec![1, 2, 3]]);
    assert_eq!(sb.execute(&conn).unwrap(), 3);
    assert_eq!(sb.execute(&conn).unwrap(), 0);
    assert_eq!(sb.execute(&conn).unwrap(), GENERATED_VALUE as u64);

    let statements = conn.statements();
    assert_eq!(statements.len(), 3);
    assert!(statements.iter().all(|s| s.closed));
    assert!(
        statements
            .iter()
            .all(|s| s.sql == "delete from t where id in (?,?,?)")
    );
    assert_eq!(sb.statement(), "delete from t where id in (?)");
}

#[test]
fn collections_expand_and_bind_in_order() {
    let conn = MockConnection::new();
    let mut sb = SqlBuilder::with_args(
        "select ${c} from ${t} where a in (?) and b = ? and d in (?)",
        args![vec![1, 2], "x", vec!["p", "q", "r"]],
    );
    sb.bind("c", "name").unwrap().bind("t", "employee").unwrap();
    sb.execute(&conn).unwrap();

    let stmt = conn.last_statement().unwrap();
    assert_eq!(
        stmt.sql,
        "select name from employee where a in (?,?) and b = ? and d in (?,?,?)"
    );
    assert_eq!(stmt.args, args![1, 2, "x", "p", "q", "r"]);
    assert_eq!(
        sb.statement(),
        "select name from employee where a in (?) and b = ? and d in (?)"
    );
}

#[test]
fn masked_arguments_bind_their_value() {
    let conn = MockConnection::new();
    let mut sb = SqlBuilder::with_args(
        "select name from user where secret = ? and public = ?",
        args![mask("oops!"), "ok"],
    );
    sb.execute(&conn).unwrap();
    assert_eq!(conn.last_statement().unwrap().args, args!["oops!", "ok"]);
    assert!(!sb.to_string().contains("oops!"));
}

#[test]
fn long_text_is_bound_as_a_stream() {
    let conn = MockConnection::new();
    let text = "x".repeat(10_000);
    let mut sb = SqlBuilder::with_args(
        "insert into docs (body, title) values (?, ?)",
        [Value::long_text(text.clone()), Value::from("title")],
    );
    sb.execute(&conn).unwrap();
    assert_eq!(
        conn.last_statement().unwrap().args,
        vec![Value::LongText(text), Value::from("title")]
    );
}

#[test]
fn options_reach_the_statement() {
    let conn = MockConnection::new();
    conn.add_result_set(MockResultSet::new("ids").columns(["id"]).values([1, 2, 3]));

    let mut sb = SqlBuilder::new("select id from t");
    sb.random_access().with_fetch_size(50).with_max_rows(2);
    let ids: Vec<i64> = sb.get_list(&conn, |rs| rs.get("id")).unwrap();
    assert_eq!(ids, vec![1, 2]);

    let stmt = conn.last_statement().unwrap();
    assert_eq!(stmt.scroll, ScrollMode::ScrollInsensitive);
    assert_eq!(stmt.fetch_size, Some(50));
    assert_eq!(stmt.max_rows, Some(2));

    let mut sb = SqlBuilder::new("select 1");
    sb.with_fetch_size(0);
    sb.execute(&conn).unwrap();
    assert_eq!(conn.last_statement().unwrap().fetch_size, None);
}

#[test]
fn get_single_maps_the_first_row() {
    let conn = MockConnection::new().without_generated_rows();
    conn.add_result_set(
        MockResultSet::new("names")
            .columns(["name"])
            .values(["first", "second"]),
    );
    conn.add_result_set(MockResultSet::new("null").columns(["name"]).values([Value::Null]));

    let mut sb = SqlBuilder::new("select name from t");
    assert_eq!(
        sb.get_single(&conn, |rs| rs.get_string(1)).unwrap(),
        Some("first".to_string())
    );
    assert_eq!(
        sb.get_single_or(&conn, |rs| rs.get_string(1), "fallback".to_string())
            .unwrap(),
        "fallback"
    );
    assert_eq!(sb.get_single(&conn, |rs| rs.get_string(1)).unwrap(), None);
}

#[test]
fn numbered_templates_execute_positionally() {
    let conn = MockConnection::new();
    let params = NumberedValues::new().param("1", "a,b").param("2", 9);
    let mut sb = from_numbered(
        "select n from t where k in (:1) and j = :2 and note <> ':2'",
        &params,
    );
    sb.execute(&conn).unwrap();

    let stmt = conn.last_statement().unwrap();
    assert_eq!(
        stmt.sql,
        "select n from t where k in (?,?) and j = ? and note <> ':2'"
    );
    assert_eq!(stmt.args, args!["a", "b", 9]);
}

#[test]
fn empty_collection_fails_before_prepare() {
    let conn = MockConnection::new();
    let mut sb = SqlBuilder::with_args("select * from t where id in (?)", [Value::List(Vec::new())]);
    let err = sb.execute(&conn).unwrap_err();
    assert!(matches!(err, SqlError::EmptyCollection));
    assert_eq!(conn.invocations().prepare, 0);
}
