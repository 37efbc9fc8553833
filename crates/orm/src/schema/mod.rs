//! Column declarations, SQL compilation and live schema management

pub mod columns;
pub mod compiler;
pub mod ddl;
pub mod foreign_key;
pub mod reconciler;

pub use columns::{ColumnSet, ColumnSpec};
pub use compiler::{placeholder, CompiledSchema};
pub use ddl::{AlterTableBuilder, TableBuilder};
pub use foreign_key::{ensure_foreign_key, ForeignKeyOutcome, ForeignKeySpec};
pub use reconciler::{reconcile, ReconcileReport};
