//! End-to-end run against a live PostgreSQL server.
//!
//! Set `TEST_DATABASE_URL` (or `DATABASE_URL`) to enable; the tests return
//! early otherwise. Tables get a random prefix and are dropped afterwards.

use modelkit_orm::validation::non_empty_string;
use modelkit_orm::{
    ColumnSet, ColumnSpec, Database, DatabaseValue, ForeignKeyOutcome, ModelOptions, PoolConfig,
    QueryExecutor, Record,
};

fn database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
}

fn table_prefix() -> String {
    format!("mk_{}_", &uuid::Uuid::new_v4().simple().to_string()[..8])
}

async fn connect() -> Option<Database> {
    let url = match database_url() {
        Some(url) => url,
        None => {
            eprintln!("TEST_DATABASE_URL not set; skipping PostgreSQL test");
            return None;
        }
    };
    let _ = tracing_subscriber::fmt().with_env_filter("modelkit_orm=debug").try_init();
    let config = PoolConfig {
        max_connections: 2,
        min_connections: 0,
        ..PoolConfig::default()
    };
    Some(Database::connect(&url, config).await.expect("connect to test database"))
}

async fn drop_tables(db: &Database, tables: &[String]) {
    for table in tables {
        let sql = format!("DROP TABLE IF EXISTS public.{} CASCADE", table);
        db.executor().execute(&sql, &[]).await.expect("drop test table");
    }
}

#[tokio::test]
async fn users_and_books_scenario() {
    let Some(db) = connect().await else { return };
    let prefix = table_prefix();

    let users = db
        .model("users", ModelOptions::new().table_prefix(&prefix).timestamps(true))
        .unwrap();
    users
        .define(ColumnSet::new().column(
            ColumnSpec::new("fullname", "fullname TEXT NOT NULL").validate_with(non_empty_string()),
        ))
        .await
        .unwrap()
        .await
        .unwrap();
    assert!(users.is_table_created());

    let created = users.create(Record::new().with("fullname", "Ali")).await.unwrap().unwrap();
    let id = created.get_as::<i64>("id").unwrap();
    assert_eq!(id, 1);
    assert_eq!(created.get_as::<String>("fullname").unwrap(), "Ali");
    assert!(created.has_value("created_at"));
    assert!(created.has_value("updated_at"));
    assert!(!created.has_value("deleted_at"));

    let found = users.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(found.get("fullname"), created.get("fullname"));

    let updated = users
        .update_by_id(id, Record::new().with("fullname", "Ali Khan"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.get_as::<String>("fullname").unwrap(), "Ali Khan");

    let books = db
        .model("books", ModelOptions::new().table_prefix(&prefix))
        .unwrap();
    books
        .define(
            ColumnSet::new()
                .column(ColumnSpec::new("title", "title TEXT NOT NULL"))
                .column(ColumnSpec::new("user_id", "user_id INTEGER")),
        )
        .await
        .unwrap()
        .await
        .unwrap();

    let first = db.add_foreign_key("books", "user_id", "users").unwrap().await.unwrap();
    let second = db.add_foreign_key("books", "user_id", "users").unwrap().await.unwrap();
    assert_eq!(first, ForeignKeyOutcome::Created);
    assert_eq!(second, ForeignKeyOutcome::AlreadyExists);

    let book = books
        .create(Record::new().with("title", "Dune").with("user_id", id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(book.get("user_id"), Some(&DatabaseValue::Int32(1)));
    assert!(book.get("title").is_some());
    books.delete_by_id(book.get_as::<i64>("id").unwrap()).await.unwrap();

    assert!(users.delete_by_id(id).await.unwrap());
    assert!(users.find_by_id(id).await.unwrap().is_none());
    assert!(!users.delete_by_id(id).await.unwrap());

    drop_tables(&db, &[books.table_name().to_string(), users.table_name().to_string()]).await;
}

#[tokio::test]
async fn soft_delete_keeps_the_row() {
    let Some(db) = connect().await else { return };
    let prefix = table_prefix();

    let notes = db
        .model(
            "notes",
            ModelOptions::new().table_prefix(&prefix).timestamps(true).paranoid(true),
        )
        .unwrap();
    notes
        .define(ColumnSet::new().column(ColumnSpec::new("body", "body TEXT")))
        .await
        .unwrap()
        .await
        .unwrap();

    notes.create(Record::new().with("body", "first")).await.unwrap();
    notes.create(Record::new()).await.unwrap();

    assert!(notes.delete_by_id(1).await.unwrap());
    assert!(notes.find_by_id(1).await.unwrap().is_none());
    assert_eq!(notes.find_all().await.unwrap().len(), 1);

    let raw = db
        .executor()
        .query(&format!("SELECT id FROM {} WHERE id = $1", notes.qualified_table()), &[DatabaseValue::Int64(1)])
        .await
        .unwrap();
    assert_eq!(raw.len(), 1);

    let missing_body = notes
        .find_all_where("body IS NULL", &[])
        .await
        .unwrap();
    assert_eq!(missing_body.len(), 1);

    drop_tables(&db, &[notes.table_name().to_string()]).await;
}

#[tokio::test]
async fn redefine_adds_missing_columns() {
    let Some(db) = connect().await else { return };
    let prefix = table_prefix();
    let options = ModelOptions::new().table_prefix(&prefix).alter_on_define(true);

    let tags = db.model("tags", options.clone()).unwrap();
    tags.define(ColumnSet::new().column(ColumnSpec::new("label", "label TEXT")))
        .await
        .unwrap()
        .await
        .unwrap();

    let tags = db.model("tags", options.timestamps(true)).unwrap();
    let report = tags
        .define(
            ColumnSet::new()
                .column(ColumnSpec::new("label", "label TEXT"))
                .column(ColumnSpec::new("weight", "weight INTEGER DEFAULT 0")),
        )
        .await
        .unwrap()
        .await
        .unwrap();
    assert!(report.altered);
    assert_eq!(report.missing_columns, vec!["weight"]);
    assert_eq!(report.missing_timestamps, vec!["created_at", "deleted_at", "updated_at"]);

    let again = tags
        .define(
            ColumnSet::new()
                .column(ColumnSpec::new("label", "label TEXT"))
                .column(ColumnSpec::new("weight", "weight INTEGER DEFAULT 0")),
        )
        .await
        .unwrap()
        .await
        .unwrap();
    assert!(!again.has_drift());

    drop_tables(&db, &[tags.table_name().to_string()]).await;
}
