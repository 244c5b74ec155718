//! Configuration type definitions.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::uri::Destination;
use crate::encoding::EncodingSpec;
use crate::error::{MigrateError, Result};

/// Root configuration structure, as read from YAML or assembled by the CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Destination database URI (postgres://, mysql://, sqlite3://).
    #[serde(default)]
    pub destination: String,

    /// Legacy container files, copied in order.
    #[serde(default)]
    pub files: Vec<PathBuf>,

    /// Transaction granularity (default: full).
    #[serde(default)]
    pub transaction: TransactionScope,

    /// Encoding used to reinterpret Text/LongText values.
    #[serde(default)]
    pub text_encoding: Option<String>,

    /// Encoding used to reinterpret Binary/LongBinary values.
    #[serde(default)]
    pub blob_encoding: Option<String>,

    /// Emit CREATE TABLE IF NOT EXISTS.
    #[serde(default)]
    pub check_table: bool,

    /// Log every generated statement.
    #[serde(default)]
    pub log_query: bool,

    /// Directory holding the mdbtools programs (default: look them up on PATH).
    #[serde(default)]
    pub tools_dir: Option<PathBuf>,
}

/// How many copy units share one transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionScope {
    /// One transaction for the whole run.
    #[default]
    Full,
    /// One transaction per source file.
    File,
    /// One transaction per table.
    Table,
}

impl TransactionScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionScope::Full => "full",
            TransactionScope::File => "file",
            TransactionScope::Table => "table",
        }
    }
}

impl fmt::Display for TransactionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionScope {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "full" => Ok(TransactionScope::Full),
            "file" => Ok(TransactionScope::File),
            "table" => Ok(TransactionScope::Table),
            other => Err(MigrateError::Config(format!(
                "unknown transaction mode {:?}",
                other
            ))),
        }
    }
}

/// Resolved, immutable options for one run.
#[derive(Debug, Clone)]
pub struct CopyOptions {
    /// Destination backend and connection string.
    pub destination: Destination,
    /// Legacy container files, copied in order.
    pub files: Vec<PathBuf>,
    /// Transaction granularity.
    pub transaction: TransactionScope,
    /// Text and blob decoders.
    pub encoding: EncodingSpec,
    /// Emit CREATE TABLE IF NOT EXISTS.
    pub check_table: bool,
    /// Log every generated statement.
    pub log_query: bool,
    /// Directory holding the mdbtools programs.
    pub tools_dir: Option<PathBuf>,
}

impl CopyOptions {
    /// Validate a configuration and resolve it into run options.
    ///
    /// All configuration errors surface here, before any database activity.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let destination = Destination::parse(&config.destination)?;
        let encoding = EncodingSpec::from_names(
            config.text_encoding.as_deref(),
            config.blob_encoding.as_deref(),
        )?;

        Ok(Self {
            destination,
            files: config.files.clone(),
            transaction: config.transaction,
            encoding,
            check_table: config.check_table,
            log_query: config.log_query,
            tools_dir: config.tools_dir.clone(),
        })
    }
}
