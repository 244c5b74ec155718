//! Legacy container readers.
//!
//! The copy engine only sees the [`SourceReader`](crate::core::SourceReader)
//! trait. [`MdbToolsReader`] implements it on top of the mdbtools utilities.

mod mdbtools;

pub use mdbtools::MdbToolsReader;
