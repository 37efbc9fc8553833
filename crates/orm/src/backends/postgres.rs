//! PostgreSQL Backend Implementation
//!
//! Implements the [`QueryExecutor`] contract on top of a sqlx connection pool.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::encode::IsNull;
use sqlx::postgres::types::Oid;
use sqlx::postgres::{PgArgumentBuffer, PgArguments, PgPoolOptions, PgRow, PgTypeInfo};
use sqlx::{Column, Pool, Postgres, Row, TypeInfo, ValueRef};

use super::core::*;
use crate::error::{OrmError, OrmResult};
use crate::record::Record;

/// PostgreSQL executor backed by a sqlx pool
#[derive(Debug, Clone)]
pub struct PostgresExecutor {
    pool: Arc<Pool<Postgres>>,
}

impl PostgresExecutor {
    /// Wrap an existing pool
    pub fn new(pool: Arc<Pool<Postgres>>) -> Self {
        Self { pool }
    }

    /// Create a connection pool from a database URL
    pub async fn connect(database_url: &str, config: PoolConfig) -> OrmResult<Self> {
        validate_database_url(database_url)?;

        tracing::debug!(
            "Creating database pool with config: max={}, min={}, timeout={}s, idle_timeout={:?}s, max_lifetime={:?}s, test_before_acquire={}",
            config.max_connections,
            config.min_connections,
            config.acquire_timeout_seconds,
            config.idle_timeout_seconds,
            config.max_lifetime_seconds,
            config.test_before_acquire
        );

        let mut options = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .test_before_acquire(config.test_before_acquire);

        if let Some(idle_timeout) = config.idle_timeout_seconds {
            options = options.idle_timeout(Duration::from_secs(idle_timeout));
        }

        if let Some(max_lifetime) = config.max_lifetime_seconds {
            options = options.max_lifetime(Duration::from_secs(max_lifetime));
        }

        let pool = options.connect(database_url).await.map_err(|e| {
            tracing::error!("Failed to create database pool: {}", e);
            OrmError::Connection(format!("Failed to create PostgreSQL pool: {}", e))
        })?;

        tracing::info!(
            "Database pool created with {} max connections",
            config.max_connections
        );
        Ok(Self::new(Arc::new(pool)))
    }

    /// Get the underlying pool
    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    /// Round-trip a trivial query and report how long it took
    pub async fn health_check(&self) -> OrmResult<Duration> {
        let start = Instant::now();

        sqlx::query("SELECT 1")
            .execute(&*self.pool)
            .await
            .map_err(|e| OrmError::Connection(format!("Health check failed: {}", e)))?;

        let duration = start.elapsed();
        tracing::debug!("Database health check passed in {:?}", duration);
        Ok(duration)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl QueryExecutor for PostgresExecutor {
    async fn query(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<Vec<Record>> {
        let mut query = sqlx::query(sql);

        for param in params {
            query = bind_database_value(query, param)?;
        }

        let rows = query
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| OrmError::Database(format!("Query fetch failed: {}", e)))?;

        rows.iter().map(row_to_record).collect()
    }

    async fn execute(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<u64> {
        let mut query = sqlx::query(sql);

        for param in params {
            query = bind_database_value(query, param)?;
        }

        let result = query
            .execute(&*self.pool)
            .await
            .map_err(|e| OrmError::Database(format!("Query execution failed: {}", e)))?;

        Ok(result.rows_affected())
    }
}

/// Check the URL scheme and that host and database name are present
pub fn validate_database_url(database_url: &str) -> OrmResult<()> {
    let parsed = url::Url::parse(database_url)
        .map_err(|e| OrmError::Connection(format!("Invalid database URL: {}", e)))?;

    if parsed.scheme() != "postgresql" && parsed.scheme() != "postgres" {
        return Err(OrmError::Connection(
            "Invalid PostgreSQL URL scheme".to_string(),
        ));
    }

    if parsed.host_str().is_none() {
        return Err(OrmError::Connection(
            "Missing host in database URL".to_string(),
        ));
    }

    if parsed.path().trim_start_matches('/').is_empty() {
        return Err(OrmError::Connection(
            "Missing database name in URL".to_string(),
        ));
    }

    Ok(())
}

/// NULL parameter whose type PostgreSQL infers from the statement
struct UntypedNull;

impl sqlx::Type<Postgres> for UntypedNull {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_oid(Oid(0))
    }
}

impl<'q> sqlx::Encode<'q, Postgres> for UntypedNull {
    fn encode_by_ref(&self, _buf: &mut PgArgumentBuffer) -> IsNull {
        IsNull::Yes
    }
}

/// Bind a DatabaseValue to a sqlx query
fn bind_database_value<'a>(
    query: sqlx::query::Query<'a, Postgres, PgArguments>,
    value: &DatabaseValue,
) -> OrmResult<sqlx::query::Query<'a, Postgres, PgArguments>> {
    match value {
        DatabaseValue::Null => Ok(query.bind(UntypedNull)),
        DatabaseValue::Bool(b) => Ok(query.bind(*b)),
        DatabaseValue::Int32(i) => Ok(query.bind(*i)),
        DatabaseValue::Int64(i) => Ok(query.bind(*i)),
        DatabaseValue::Float32(f) => Ok(query.bind(*f)),
        DatabaseValue::Float64(f) => Ok(query.bind(*f)),
        DatabaseValue::String(s) => Ok(query.bind(s.clone())),
        DatabaseValue::Bytes(b) => Ok(query.bind(b.clone())),
        DatabaseValue::Uuid(u) => Ok(query.bind(*u)),
        DatabaseValue::DateTime(dt) => Ok(query.bind(*dt)),
        DatabaseValue::Date(d) => Ok(query.bind(*d)),
        DatabaseValue::Time(t) => Ok(query.bind(*t)),
        DatabaseValue::Json(j) => Ok(query.bind(j.clone())),
        DatabaseValue::Array(_) => Err(OrmError::Database(
            "Array binding not yet implemented for PostgreSQL".to_string(),
        )),
    }
}

fn row_to_record(row: &PgRow) -> OrmResult<Record> {
    let mut record = Record::new();
    for (index, column) in row.columns().iter().enumerate() {
        record.insert(column.name(), postgres_value_to_database_value(row, index)?);
    }
    Ok(record)
}

/// Convert a PostgreSQL column value to DatabaseValue
fn postgres_value_to_database_value(row: &PgRow, index: usize) -> OrmResult<DatabaseValue> {
    let raw = row
        .try_get_raw(index)
        .map_err(|e| OrmError::Database(format!("Failed to read column {}: {}", index, e)))?;
    if raw.is_null() {
        return Ok(DatabaseValue::Null);
    }

    let column = &row.columns()[index];
    let type_name = column.type_info().name();

    fn decode_err(kind: &str, e: sqlx::Error) -> OrmError {
        OrmError::Database(format!("Failed to get {} value: {}", kind, e))
    }

    let value = match type_name {
        "BOOL" => DatabaseValue::Bool(row.try_get(index).map_err(|e| decode_err("bool", e))?),
        "INT2" => {
            let value: i16 = row.try_get(index).map_err(|e| decode_err("int16", e))?;
            DatabaseValue::Int32(i32::from(value))
        }
        "INT4" => DatabaseValue::Int32(row.try_get(index).map_err(|e| decode_err("int32", e))?),
        "INT8" => DatabaseValue::Int64(row.try_get(index).map_err(|e| decode_err("int64", e))?),
        "FLOAT4" => DatabaseValue::Float32(row.try_get(index).map_err(|e| decode_err("float32", e))?),
        "FLOAT8" => DatabaseValue::Float64(row.try_get(index).map_err(|e| decode_err("float64", e))?),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
            DatabaseValue::String(row.try_get(index).map_err(|e| decode_err("string", e))?)
        }
        "BYTEA" => DatabaseValue::Bytes(row.try_get(index).map_err(|e| decode_err("bytes", e))?),
        "UUID" => DatabaseValue::Uuid(row.try_get(index).map_err(|e| decode_err("UUID", e))?),
        "TIMESTAMPTZ" => {
            DatabaseValue::DateTime(row.try_get(index).map_err(|e| decode_err("datetime", e))?)
        }
        "TIMESTAMP" => {
            let value: chrono::NaiveDateTime =
                row.try_get(index).map_err(|e| decode_err("timestamp", e))?;
            DatabaseValue::DateTime(value.and_utc())
        }
        "DATE" => DatabaseValue::Date(row.try_get(index).map_err(|e| decode_err("date", e))?),
        "TIME" => DatabaseValue::Time(row.try_get(index).map_err(|e| decode_err("time", e))?),
        "JSON" | "JSONB" => {
            let value: JsonValue = row.try_get(index).map_err(|e| decode_err("JSON", e))?;
            DatabaseValue::Json(value)
        }
        _ => {
            // Fallback: try to get as string
            let value: String = row.try_get(index).map_err(|e| {
                OrmError::Database(format!(
                    "Failed to get value as string for unknown type '{}': {}",
                    type_name, e
                ))
            })?;
            DatabaseValue::String(value)
        }
    };
    Ok(value)
}
