//! Core abstractions for the copy engine.
//!
//! - [`schema`]: Table, column, and legacy type metadata
//! - [`value`]: Tagged SQL values flowing from source to destination
//! - [`traits`]: Seams between the engine and its collaborators
//!
//! The engine only depends on these traits, so the coordinator and row
//! pipeline can be exercised against in-memory readers and writers.

pub mod schema;
pub mod traits;
pub mod value;

pub use schema::{Column, LegacyType, Row, Table};
pub use traits::{Dialect, RowStream, SourceReader, TargetWriter};
pub use value::SqlValue;
