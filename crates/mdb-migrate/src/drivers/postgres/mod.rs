//! PostgreSQL database driver.
//!
//! - [`PostgresDialect`]: SQL syntax strategy
//! - [`PostgresWriter`]: Destination writer

mod dialect;
mod writer;

pub use dialect::PostgresDialect;
pub use writer::PostgresWriter;
