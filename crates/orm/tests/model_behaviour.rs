//! Model behaviour against an in-memory table
//!
//! `FakeTable` interprets the handful of statement shapes a model generates
//! so round trips can be checked without a database server.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use modelkit_orm::testing::{ExecutedStatement, MockExecutor};
use modelkit_orm::validation::{non_empty_string, validator};
use modelkit_orm::{
    query_fn, ColumnSet, ColumnSpec, Database, DatabaseValue, ForeignKeyOutcome, Model,
    ModelError, ModelOptions, OrmResult, QueryExecutor, Record, ValidationError,
};
use tokio_test::{assert_err, assert_ok};

#[derive(Default)]
struct FakeTable {
    rows: Vec<Record>,
    next_id: i64,
}

impl FakeTable {
    fn handle(&mut self, statement: &ExecutedStatement) -> Option<OrmResult<Vec<Record>>> {
        let sql = statement.sql.as_str();
        let params = &statement.params;
        if sql.starts_with("INSERT INTO") {
            Some(Ok(vec![self.insert(sql, params)]))
        } else if sql.starts_with("SELECT") && sql.contains(" FROM public.") {
            Some(Ok(self.select(sql, params)))
        } else if sql.starts_with("UPDATE") && sql.contains("COALESCE") {
            Some(Ok(self.update(sql, params).into_iter().collect()))
        } else if sql.starts_with("UPDATE") {
            // soft delete: SET <deleted_at>=$1 WHERE <pk>=$2
            let id = params[1].as_i64();
            for row in self.rows.iter_mut().filter(|r| id_of(r) == id) {
                row.insert("deleted_at", params[0].clone());
            }
            Some(Ok(Vec::new()))
        } else if sql.starts_with("DELETE FROM") {
            let id = params[0].as_i64();
            self.rows.retain(|r| id_of(r) != id);
            Some(Ok(Vec::new()))
        } else {
            None
        }
    }

    fn insert(&mut self, sql: &str, params: &[DatabaseValue]) -> Record {
        self.next_id += 1;
        let mut row = Record::new().with("id", self.next_id);
        for (column, value) in column_list(sql).into_iter().zip(params) {
            row.insert(column, value.clone());
        }
        self.rows.push(row.clone());
        row
    }

    fn select(&self, sql: &str, params: &[DatabaseValue]) -> Vec<Record> {
        let by_id = sql.contains("WHERE id=$1").then(|| params[0].as_i64());
        let live_only = sql.contains("deleted_at IS NULL");
        self.rows
            .iter()
            .filter(|r| by_id.map_or(true, |id| id_of(r) == id))
            .filter(|r| !live_only || r.get("deleted_at").map_or(true, DatabaseValue::is_null))
            .cloned()
            .collect()
    }

    fn update(&mut self, sql: &str, params: &[DatabaseValue]) -> Option<Record> {
        let id = params.last().and_then(DatabaseValue::as_i64);
        let row = self.rows.iter_mut().find(|r| id_of(r) == id)?;
        for (column, index) in assignments(sql) {
            let value = &params[index - 1];
            if !value.is_null() {
                row.insert(column, value.clone());
            }
        }
        Some(row.clone())
    }

    fn raw_row(&self, id: i64) -> Option<Record> {
        self.rows.iter().find(|r| id_of(r) == Some(id)).cloned()
    }
}

fn id_of(row: &Record) -> Option<i64> {
    row.get("id").and_then(DatabaseValue::as_i64)
}

fn column_list(sql: &str) -> Vec<String> {
    let start = sql.find('(').map_or(0, |i| i + 1);
    let end = sql.find(')').unwrap_or(sql.len());
    sql[start..end].split(", ").map(str::to_string).collect()
}

/// `(column, placeholder index)` for each SET assignment
fn assignments(sql: &str) -> Vec<(String, usize)> {
    let start = sql.find(" SET ").map_or(0, |i| i + 5);
    let end = sql.find(" WHERE ").unwrap_or(sql.len());
    sql[start..end]
        .split(',')
        .filter_map(|piece| {
            let (column, rhs) = piece.split_once('=')?;
            let digits: String = rhs
                .chars()
                .skip_while(|c| *c != '$')
                .skip(1)
                .take_while(char::is_ascii_digit)
                .collect();
            Some((column.trim().to_string(), digits.parse().ok()?))
        })
        .collect()
}

fn fake_database() -> (Database, MockExecutor, Arc<Mutex<FakeTable>>) {
    let table = Arc::new(Mutex::new(FakeTable::default()));
    let state = Arc::clone(&table);
    let mock = MockExecutor::new().with_handler(move |statement| {
        state.lock().ok()?.handle(statement)
    });
    (Database::new(Arc::new(mock.clone())), mock, table)
}

async fn users(db: &Database, options: ModelOptions) -> Arc<Model> {
    let model = db.model("users", options).unwrap();
    let columns = ColumnSet::new()
        .column(ColumnSpec::new("fullname", "fullname TEXT NOT NULL").validate_with(non_empty_string()))
        .column(ColumnSpec::new("age", "age INTEGER"));
    assert_ok!(model.define(columns).await.unwrap().await);
    model
}

#[tokio::test]
async fn create_then_find_by_id_returns_input() {
    let (db, _, _) = fake_database();
    let model = users(&db, ModelOptions::new().timestamps(true)).await;

    let created = model
        .create(Record::new().with("fullname", "Ada").with("age", 36i64))
        .await
        .unwrap()
        .unwrap();
    let id = created.get_as::<i64>("id").unwrap();
    let found = model.find_by_id(id).await.unwrap().unwrap();

    assert_eq!(found.get("fullname"), Some(&DatabaseValue::from("Ada")));
    assert_eq!(found.get("age"), Some(&DatabaseValue::Int64(36)));
    assert!(matches!(found.get("created_at"), Some(DatabaseValue::DateTime(_))));
}

#[tokio::test]
async fn missing_columns_are_stored_as_null() {
    let (db, _, table) = fake_database();
    let model = users(&db, ModelOptions::new()).await;

    model.create(Record::new().with("fullname", "Ada")).await.unwrap();
    let row = table.lock().unwrap().raw_row(1).unwrap();
    assert_eq!(row.get("age"), Some(&DatabaseValue::Null));
}

#[tokio::test]
async fn update_changes_only_given_columns() {
    let (db, _, _) = fake_database();
    let model = users(&db, ModelOptions::new().timestamps(true)).await;
    model
        .create(Record::new().with("fullname", "Ada").with("age", 36i64))
        .await
        .unwrap();

    let updated = model
        .update_by_id(1, Record::new().with("fullname", "Ada King"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.get("fullname"), Some(&DatabaseValue::from("Ada King")));

    let found = model.find_by_id(1).await.unwrap().unwrap();
    assert_eq!(found.get("fullname"), Some(&DatabaseValue::from("Ada King")));
    assert_eq!(found.get("age"), Some(&DatabaseValue::Int64(36)));

    assert!(model
        .update_by_id(42, Record::new().with("fullname", "Nobody"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn soft_deleted_rows_are_hidden_but_kept() {
    let (db, _, table) = fake_database();
    let model = users(&db, ModelOptions::new().timestamps(true).paranoid(true)).await;
    model.create(Record::new().with("fullname", "Ada")).await.unwrap();
    model.create(Record::new().with("fullname", "Grace")).await.unwrap();

    assert!(model.delete_by_id(1).await.unwrap());
    assert!(model.find_by_id(1).await.unwrap().is_none());
    assert_eq!(model.find_all().await.unwrap().len(), 1);

    let raw = table.lock().unwrap().raw_row(1).unwrap();
    assert!(matches!(raw.get("deleted_at"), Some(DatabaseValue::DateTime(_))));

    // already soft-deleted
    assert!(!model.delete_by_id(1).await.unwrap());
}

#[tokio::test]
async fn failing_validator_stops_before_later_columns_and_writes() {
    let (db, mock, _) = fake_database();
    let later_ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&later_ran);

    let model = db.model("users", ModelOptions::new()).unwrap();
    let columns = ColumnSet::new()
        .column(ColumnSpec::new("fullname", "fullname TEXT NOT NULL").validate_with(non_empty_string()))
        .column(ColumnSpec::new("age", "age INTEGER").validate_with(validator(move |_, _, _| {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        })));
    model.define(columns).await.unwrap().await.unwrap();
    mock.clear();

    let err = model.create(Record::new().with("age", 3i64)).await.unwrap_err();
    assert!(matches!(&err, ModelError::Validation(e) if e.field == "fullname"));
    assert_err!(model.update_by_id(1, Record::new().with("fullname", " ")).await);

    assert!(!later_ran.load(Ordering::SeqCst));
    assert!(mock.statements().is_empty());
}

#[tokio::test]
async fn deleting_a_missing_id_writes_nothing() {
    let (db, mock, _) = fake_database();
    let model = users(&db, ModelOptions::new()).await;
    mock.clear();

    assert!(!model.delete_by_id(7).await.unwrap());
    assert_eq!(mock.statements().len(), 1);
    assert!(mock.writes().is_empty());
}

#[tokio::test]
async fn users_scenario() {
    let (db, _, _) = fake_database();
    let model = db.model("users", ModelOptions::new().timestamps(true)).unwrap();
    model
        .define(ColumnSet::new().column(
            ColumnSpec::new("fullname", "fullname TEXT NOT NULL").validate_with(non_empty_string()),
        ))
        .await
        .unwrap()
        .await
        .unwrap();

    let created = model.create(Record::new().with("fullname", "Ali")).await.unwrap().unwrap();
    assert_eq!(created.get_as::<i64>("id").unwrap(), 1);
    assert_eq!(created.get_as::<String>("fullname").unwrap(), "Ali");
    assert!(created.has_value("created_at"));
    assert!(created.has_value("updated_at"));

    assert_eq!(model.find_by_id(1).await.unwrap(), Some(created.clone()));

    let updated = model
        .update_by_id(1, Record::new().with("fullname", "Ali Khan"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.get_as::<String>("fullname").unwrap(), "Ali Khan");
    let stamp = |row: &Record| match row.get("updated_at") {
        Some(DatabaseValue::DateTime(at)) => Some(*at),
        _ => None,
    };
    assert!(stamp(&updated).unwrap() >= stamp(&created).unwrap());

    assert!(model.delete_by_id(1).await.unwrap());
    assert!(model.find_by_id(1).await.unwrap().is_none());
}

#[tokio::test]
async fn define_twice_is_additive_noop() {
    let mock = MockExecutor::new();
    let live = ["id", "fullname", "age"]
        .iter()
        .map(|name| Record::new().with("column_name", *name))
        .collect();
    mock.when("information_schema.columns", live);
    let db = Database::new(Arc::new(mock.clone()));
    let model = db
        .model("users", ModelOptions::new().alter_on_define(true))
        .unwrap();

    for _ in 0..2 {
        let columns = ColumnSet::new()
            .column(ColumnSpec::new("fullname", "fullname TEXT NOT NULL"))
            .column(ColumnSpec::new("age", "age INTEGER"));
        let report = model.define(columns).await.unwrap().await.unwrap();
        assert!(!report.has_drift());
    }

    assert_eq!(mock.statements_containing("CREATE TABLE IF NOT EXISTS").len(), 2);
    assert!(mock.statements_containing("ALTER TABLE").is_empty());
    assert!(model.is_table_created());
}

#[tokio::test]
async fn adding_the_same_foreign_key_twice_is_a_noop() {
    let mock = MockExecutor::new();
    mock.when(
        "information_schema.columns",
        vec![Record::new().with("column_name", "user_id")],
    );
    let db = Database::new(Arc::new(mock.clone()));
    db.model("users", ModelOptions::new()).unwrap();
    let books = db.model("books", ModelOptions::new()).unwrap();

    let first = books.add_foreign_key("user_id", "users").unwrap().await.unwrap();
    assert_eq!(first, ForeignKeyOutcome::Created);

    mock.when(
        "information_schema.table_constraints",
        vec![Record::new().with("constraint_name", "books_user_id_fkey")],
    );
    let second = books.add_foreign_key("user_id", "users").unwrap().await.unwrap();
    assert_eq!(second, ForeignKeyOutcome::AlreadyExists);

    assert_eq!(mock.statements_containing("ADD CONSTRAINT").len(), 1);
}

#[tokio::test]
async fn custom_query_methods_use_the_shared_executor() {
    let (db, mock, _) = fake_database();
    let model = users(&db, ModelOptions::new()).await;
    model.create(Record::new().with("fullname", "Ada")).await.unwrap();

    model
        .add_query_method("adults", |executor| {
            query_fn(move |params| {
                let executor = Arc::clone(&executor);
                async move {
                    executor
                        .query("SELECT id, fullname, age FROM public.users WHERE age >= $1", &params)
                        .await
                }
            })
        })
        .unwrap();

    assert_eq!(model.query_method_names(), vec!["adults"]);
    let rows = model.call_query("adults", vec![DatabaseValue::from(18i64)]).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(mock.sql_log().iter().any(|sql| sql.contains("age >= $1")));

    assert!(matches!(
        model.call_query("children", Vec::new()).await,
        Err(ModelError::Configuration(_))
    ));
    assert!(matches!(
        model.add_query_method(" ", |executor| query_fn(move |_| {
            let executor = Arc::clone(&executor);
            async move { executor.query("SELECT 1", &[]).await }
        })),
        Err(ModelError::ParameterType { .. })
    ));
}

#[tokio::test]
async fn before_create_hook_can_reject_using_queries() {
    let (db, mock, _) = fake_database();
    let model = users(&db, ModelOptions::new()).await;
    model.create(Record::new().with("fullname", "Ada")).await.unwrap();

    model.before_create(|ctx: modelkit_orm::HookContext| async move {
        let name = ctx.values.get("fullname").cloned().unwrap_or(DatabaseValue::Null);
        let taken = ctx
            .executor
            .query("SELECT id, fullname, age FROM public.users", &[])
            .await?
            .into_iter()
            .any(|row| row.get("fullname") == Some(&name));
        if taken {
            return Err(ModelError::from(ValidationError::with_code(
                "fullname",
                "is already taken",
                "unique",
            )));
        }
        Ok::<(), ModelError>(())
    });

    mock.clear();
    let err = model.create(Record::new().with("fullname", "Ada")).await.unwrap_err();
    assert!(err.is_validation());
    assert!(mock.writes().is_empty());
    assert!(model.create(Record::new().with("fullname", "Grace")).await.unwrap().is_some());
}
