//! SQLite database driver.
//!
//! - [`SqliteDialect`]: SQL syntax strategy
//! - [`SqliteWriter`]: Destination writer
//!
//! # Connection String
//!
//! ```text
//! sqlite:///absolute/path.db?mode=rwc
//! sqlite://relative/path.db
//! ```

mod dialect;
mod writer;

pub use dialect::SqliteDialect;
pub use writer::SqliteWriter;
