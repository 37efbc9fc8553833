//! Database Backend Abstractions
//!
//! The model layer only talks to the database through [`QueryExecutor`].
//! [`PostgresExecutor`] is the sqlx-backed implementation.

pub mod core;
pub mod postgres;

// Re-export core traits and types
pub use core::*;
pub use postgres::PostgresExecutor;
