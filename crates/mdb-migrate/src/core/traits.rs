//! Core traits for the copy engine.
//!
//! - [`Dialect`]: SQL syntax strategy for a destination backend
//! - [`SourceReader`]: Lists tables of a container file and streams their rows
//! - [`RowStream`]: Lazy, single-pass row sequence of one table
//! - [`TargetWriter`]: Transactional statement execution on the destination
//!
//! # Design Patterns
//!
//! - **Strategy**: `Dialect` provides interchangeable syntax rules per backend
//! - **Iterator with sentinel**: `RowStream::next_row` yields `Ok(None)` at the
//!   end of a table, distinct from any error

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

use super::schema::{LegacyType, Row, Table};
use super::value::SqlValue;

/// SQL syntax strategy for a destination backend.
///
/// Implementations are stateless; the `Backend` enum in the `drivers`
/// module dispatches to them statically.
pub trait Dialect: Send + Sync {
    /// Get the dialect identifier (e.g., "postgres", "mysql").
    fn name(&self) -> &str;

    /// Quote an identifier, doubling any embedded quote character.
    ///
    /// - MySQL: `` `identifier` ``
    /// - PostgreSQL, SQLite: `"identifier"`
    fn quote_ident(&self, name: &str) -> String;

    /// Destination column type for a legacy type.
    ///
    /// Returns `""` for legacy types the dialect has no mapping for.
    fn type_name(&self, data_type: LegacyType) -> &'static str;

    /// Get a parameter placeholder for the given 1-based index.
    ///
    /// - PostgreSQL: `$1`, `$2`, etc.
    /// - MySQL, SQLite: `?`
    fn param_placeholder(&self, index: usize) -> String;
}

/// Reads table metadata and rows from legacy container files.
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// List the tables of a container file, system tables included, in source order.
    async fn list_tables(&self, file: &Path) -> Result<Vec<Table>>;

    /// Open a lazy row sequence for one table.
    ///
    /// Rows are produced in source order with fields aligned to
    /// `table.columns`. The sequence is consumed once and never restarted.
    async fn read_rows(&self, file: &Path, table: &Table) -> Result<Box<dyn RowStream>>;
}

/// Lazy, finite, single-pass sequence of rows.
#[async_trait]
pub trait RowStream: Send {
    /// Fetch the next row.
    ///
    /// Returns `Ok(None)` once the table is exhausted. Any `Err` aborts the table.
    async fn next_row(&mut self) -> Result<Option<Row>>;
}

/// Executes statements on the destination inside an explicit transaction.
///
/// A writer owns a single session. At most one transaction is open at a
/// time: `begin` fails while one is already open, and statement execution
/// fails while none is.
#[async_trait]
pub trait TargetWriter: Send {
    /// Whether a transaction is currently open.
    fn in_transaction(&self) -> bool;

    /// Open a transaction.
    async fn begin(&mut self) -> Result<()>;

    /// Commit the open transaction.
    async fn commit(&mut self) -> Result<()>;

    /// Roll back the open transaction.
    async fn rollback(&mut self) -> Result<()>;

    /// Execute a statement without parameters (DDL).
    async fn execute(&mut self, sql: &str) -> Result<u64>;

    /// Prepare a parameterized statement for repeated execution.
    async fn prepare(&mut self, sql: &str) -> Result<()>;

    /// Execute a prepared statement with one row of parameters.
    async fn insert_row(&mut self, sql: &str, row: &[SqlValue]) -> Result<u64>;

    /// Get the database type identifier (e.g., "postgres", "sqlite").
    fn db_type(&self) -> &str;

    /// Close the underlying session.
    async fn close(&mut self);
}
