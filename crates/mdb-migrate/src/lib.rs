//! # mdb-migrate
//!
//! Transactional copy of Microsoft Access tables into PostgreSQL, MySQL and
//! SQLite.
//!
//! For each table of each source file the engine creates the destination
//! table, then streams the rows through a prepared INSERT:
//!
//! - **Transaction scopes**: one transaction per run, per file, or per table
//! - **Halt on first error** with rollback of the innermost open transaction
//! - **Streaming** row copy with bounded memory
//! - **Re-encoding** of legacy text and binary values
//! - **Prompt cancellation** on SIGINT/SIGTERM
//!
//! ## Example
//!
//! ```rust,no_run
//! use mdb_migrate::{Config, CopyOptions, Orchestrator, ShutdownSignal};
//!
//! #[tokio::main]
//! async fn main() -> mdb_migrate::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let options = CopyOptions::from_config(&config)?;
//!     let shutdown = ShutdownSignal::new();
//!     shutdown.install()?;
//!
//!     let mut orchestrator = Orchestrator::connect(options, &shutdown.token()).await?;
//!     let stats = orchestrator.run(&shutdown.token()).await?;
//!     orchestrator.close().await;
//!     println!("Copied {} rows", stats.rows);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod encoding;
pub mod error;
pub mod orchestrator;
pub mod shutdown;
pub mod source;
pub mod transfer;

#[cfg(test)]
mod testing;

// Re-exports for convenient access
pub use config::{Config, CopyOptions, Destination, TransactionScope};
pub use crate::core::{
    Column, Dialect, LegacyType, Row, RowStream, SourceReader, SqlValue, Table, TargetWriter,
};
pub use drivers::Backend;
pub use encoding::EncodingSpec;
pub use error::{MigrateError, Result};
pub use orchestrator::{CopyStats, Orchestrator};
pub use shutdown::{cancellable, ShutdownSignal};
pub use source::MdbToolsReader;
