use std::sync::{Arc, Mutex};

use asupersync::runtime::RuntimeBuilder;
use serde_json::json;
use sqlforge::prelude::*;
use sqlforge::{CastError, Param, ParameterKind, TypeConverter, types};

fn unwrap_outcome<T>(outcome: Outcome<T, Error>) -> T {
    match outcome {
        Outcome::Ok(v) => v,
        Outcome::Err(e) => panic!("unexpected error: {e}"),
        Outcome::Cancelled(r) => panic!("cancelled: {r:?}"),
        Outcome::Panicked(p) => panic!("panicked: {p:?}"),
    }
}

/// Records every statement and answers queries with canned rows.
struct MockConnection {
    statements: Mutex<Vec<(String, Vec<Param>)>>,
    rows: Vec<Row>,
}

impl MockConnection {
    fn new(rows: Vec<Row>) -> Self {
        Self {
            statements: Mutex::new(Vec::new()),
            rows,
        }
    }

    fn record(&self, sql: &str, params: &[Param]) {
        self.statements
            .lock()
            .expect("lock statements")
            .push((sql.to_string(), params.to_vec()));
    }

    fn statements(&self) -> Vec<(String, Vec<Param>)> {
        self.statements.lock().expect("lock statements").clone()
    }
}

impl Connection for MockConnection {
    fn query(
        &self,
        _cx: &Cx,
        sql: &str,
        params: &[Param],
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send {
        self.record(sql, params);
        let rows = self.rows.clone();
        async move { Outcome::Ok(rows) }
    }

    fn execute(
        &self,
        _cx: &Cx,
        sql: &str,
        params: &[Param],
    ) -> impl Future<Output = Outcome<u64, Error>> + Send {
        self.record(sql, params);
        async { Outcome::Ok(1) }
    }
}

fn columns() -> Vec<String> {
    vec!["id".to_string(), "published".to_string(), "created".to_string()]
}

#[test]
fn all_casts_bindings_and_result_rows() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MockConnection::new(vec![Row::new(
            columns(),
            vec![
                Value::Int(1),
                Value::Int(1),
                Value::Text("2024-01-02 03:04:05".to_string()),
            ],
        )]);

        let query = Query::new(Arc::new(Dialect::mysql()))
            .add_default_types([
                ("id", "integer"),
                ("published", "boolean"),
                ("created", "datetime"),
            ])
            .select(["id", "published", "created"])
            .from(["articles"])
            .where_(conditions! { "author_id" => 5, "published" => true });

        let rows = unwrap_outcome(query.all(&cx, &conn).await);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_by_name("published"), Some(&Value::Bool(true)));
        assert_eq!(
            rows[0].get_by_name("created"),
            Some(&Value::Timestamp(1_704_164_645_000_000))
        );

        let statements = conn.statements();
        assert_eq!(statements.len(), 1);
        let (sql, params) = &statements[0];
        assert_eq!(
            sql,
            "SELECT `id`, `published`, `created` FROM `articles` \
             WHERE `author_id` = ? AND `published` = ?"
        );
        assert_eq!(
            params,
            &vec![
                Param::new(Value::Int(5), ParameterKind::Int),
                Param::new(Value::Bool(true), ParameterKind::Bool),
            ]
        );
    });
}

#[test]
fn execute_runs_writes_with_null_parameters() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MockConnection::new(Vec::new());
        let update = Query::new(Arc::new(Dialect::postgres()))
            .update("articles")
            .set("body", Value::Null)
            .set_typed("views", 3, "integer")
            .where_(conditions! { "id" => 9 });

        let affected = unwrap_outcome(update.execute(&cx, &conn).await);
        assert_eq!(affected, 1);

        let statements = conn.statements();
        let (sql, params) = &statements[0];
        assert_eq!(
            sql,
            "UPDATE \"articles\" SET \"body\" = $1, \"views\" = $2 WHERE \"id\" = $3"
        );
        assert_eq!(params[0].kind, ParameterKind::Null);
        assert_eq!(params[1], Param::new(Value::Int(3), ParameterKind::Int));
    });
}

#[test]
fn cast_errors_stop_execution() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MockConnection::new(Vec::new());
        let insert = Query::new(Arc::new(Dialect::sqlite()))
            .insert(["created"])
            .into_table("events")
            .add_default_types([("created", "datetime")])
            .values([("created", "not a date")]);

        // Types are resolved when `insert()` declares the columns.
        assert!(matches!(insert.execute(&cx, &conn).await, Outcome::Ok(1)));

        let typed = Query::new(Arc::new(Dialect::sqlite()))
            .add_default_types([("created", "datetime")])
            .insert(["created"])
            .into_table("events")
            .values([("created", "not a date")]);
        match typed.execute(&cx, &conn).await {
            Outcome::Err(Error::Cast(e)) => assert_eq!(e.target_type, "datetime"),
            Outcome::Err(e) => panic!("expected cast error, got {e}"),
            _ => panic!("expected cast error"),
        }
        assert_eq!(conn.statements().len(), 1);
    });
}

#[test]
fn unknown_types_are_reported() {
    let registry = TypeRegistry::with_defaults();
    let query = Query::new(Arc::new(Dialect::mysql()))
        .from(["t"])
        .where_(Comparison::new("geo", "=", "POINT(1 2)").typed("geometry"));
    match query.prepare(&registry) {
        Err(Error::UnknownType(e)) => assert_eq!(e.name, "geometry"),
        other => panic!("expected unknown type, got {other:?}"),
    }
}

/// Money held as dollars in the domain and as integer cents on the wire.
#[derive(Debug)]
struct CentsType;

impl TypeConverter for CentsType {
    fn name(&self) -> &str {
        "cents"
    }

    fn parameter_kind(&self) -> ParameterKind {
        ParameterKind::Int
    }

    fn to_database(&self, value: &Value) -> sqlforge::Result<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Float(dollars) => Ok(Value::Int((dollars * 100.0).round() as i64)),
            Value::Int(dollars) => Ok(Value::Int(dollars * 100)),
            other => Err(CastError {
                value: other.clone(),
                target_type: "cents".to_string(),
                reason: None,
            }
            .into()),
        }
    }

    fn to_domain(&self, value: &Value) -> sqlforge::Result<Value> {
        match value {
            Value::Int(cents) => Ok(Value::Float(*cents as f64 / 100.0)),
            other => Ok(other.clone()),
        }
    }

    fn marshal(&self, input: &serde_json::Value) -> Value {
        match input {
            serde_json::Value::Number(n) => n.as_f64().map_or(Value::Null, Value::Float),
            serde_json::Value::String(s) => s.trim().parse().map_or(Value::Null, Value::Float),
            _ => Value::Null,
        }
    }
}

#[test]
fn custom_types_registered_globally_cast_parameters() {
    types::register("cents", Arc::new(CentsType));

    // Untrusted request input goes through marshal, never through to_database.
    let converter = types::get("cents").expect("registered converter");
    let price = converter.marshal(&json!("12.50"));
    assert_eq!(price, Value::Float(12.5));
    assert_eq!(converter.marshal(&json!({"not": "money"})), Value::Null);

    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MockConnection::new(Vec::new());
        let delete = Query::new(Arc::new(Dialect::sqlite()))
            .add_default_types([("price", "cents")])
            .delete("products")
            .where_(conditions! { "price >" => price });

        let affected = unwrap_outcome(delete.execute(&cx, &conn).await);
        assert_eq!(affected, 1);

        let statements = conn.statements();
        let (sql, params) = &statements[0];
        assert_eq!(sql, "DELETE FROM \"products\" WHERE \"price\" > ?");
        assert_eq!(params, &vec![Param::new(Value::Int(1250), ParameterKind::Int)]);
    });
}
