//! # modelkit-orm: table-backed models over PostgreSQL
//!
//! Declare a model bound to a table, describe its columns with raw DDL
//! fragments and validators, and get generated CRUD statements, lifecycle
//! hooks, named custom queries, additive schema reconciliation and foreign
//! key management.
//!
//! ```no_run
//! use modelkit_orm::{ColumnSet, ColumnSpec, Database, ModelOptions, PoolConfig, Record};
//!
//! # async fn demo() -> modelkit_orm::OrmResult<()> {
//! let db = Database::connect("postgres://localhost/app", PoolConfig::default()).await?;
//! let users = db.model("users", ModelOptions::new().timestamps(true))?;
//! users
//!     .define(ColumnSet::new().column(ColumnSpec::new("fullname", "fullname TEXT NOT NULL")))
//!     .await?
//!     .await?;
//!
//! let created = users.create(Record::new().with("fullname", "Ada Lovelace")).await?;
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod config;
pub mod database;
pub mod error;
pub mod model;
pub mod pending;
pub mod record;
pub mod registry;
pub mod schema;
pub mod testing;
pub mod validation;

pub use backends::{DatabaseValue, PoolConfig, PostgresExecutor, QueryExecutor};
pub use config::{GlobalOptions, ModelConfig, ModelOptions, TimestampNames, Timestamps};
pub use database::Database;
pub use error::*;
pub use model::{query_fn, HookContext, HookKind, Model, ModelHook, QueryMethod};
pub use pending::PendingOperation;
pub use record::Record;
pub use registry::ModelRegistry;
pub use schema::{ColumnSet, ColumnSpec, ForeignKeyOutcome, ReconcileReport};
pub use validation::{ValidationError, Validator};
