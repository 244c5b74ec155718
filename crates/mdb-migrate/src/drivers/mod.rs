//! Destination database drivers.
//!
//! - [`postgres`]: PostgreSQL and compatible servers
//! - [`mysql`]: MySQL and MariaDB
//! - [`sqlite`]: SQLite files
//!
//! Each driver module provides a `Dialect` (syntax strategy) and a
//! `TargetWriter` (transactional session over SQLx).
//!
//! # Static dispatch
//!
//! [`Backend`] is a closed enum over the three dialects. It is selected once
//! from the destination URI and passed explicitly; each trait call becomes
//! a `match` instead of vtable dispatch.

pub mod mysql;
pub mod postgres;
pub mod sqlite;

pub use mysql::{MysqlDialect, MysqlWriter};
pub use postgres::{PostgresDialect, PostgresWriter};
pub use sqlite::{SqliteDialect, SqliteWriter};

use crate::core::schema::LegacyType;
use crate::core::traits::{Dialect, TargetWriter};
use crate::error::{MigrateError, Result};

/// Destination backend family.
#[derive(Debug, Clone)]
pub enum Backend {
    Postgres(PostgresDialect),
    Sqlite(SqliteDialect),
    Mysql(MysqlDialect),
}

impl Dialect for Backend {
    fn name(&self) -> &str {
        match self {
            Backend::Postgres(d) => d.name(),
            Backend::Sqlite(d) => d.name(),
            Backend::Mysql(d) => d.name(),
        }
    }

    fn quote_ident(&self, name: &str) -> String {
        match self {
            Backend::Postgres(d) => d.quote_ident(name),
            Backend::Sqlite(d) => d.quote_ident(name),
            Backend::Mysql(d) => d.quote_ident(name),
        }
    }

    fn type_name(&self, data_type: LegacyType) -> &'static str {
        match self {
            Backend::Postgres(d) => d.type_name(data_type),
            Backend::Sqlite(d) => d.type_name(data_type),
            Backend::Mysql(d) => d.type_name(data_type),
        }
    }

    fn param_placeholder(&self, index: usize) -> String {
        match self {
            Backend::Postgres(d) => d.param_placeholder(index),
            Backend::Sqlite(d) => d.param_placeholder(index),
            Backend::Mysql(d) => d.param_placeholder(index),
        }
    }
}

impl Backend {
    /// Select a backend from a destination URI scheme.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the scheme is not recognized.
    pub fn from_scheme(scheme: &str) -> Result<Self> {
        match scheme.to_lowercase().as_str() {
            "pg" | "postgres" | "postgresql" => Ok(Backend::Postgres(PostgresDialect::new())),
            "mysql" | "mariadb" => Ok(Backend::Mysql(MysqlDialect::new())),
            "sqlite" | "sqlite3" => Ok(Backend::Sqlite(SqliteDialect::new())),
            other => Err(MigrateError::Config(format!(
                "{:?} is not a supported database backend",
                other
            ))),
        }
    }

    /// Open the destination session for this backend.
    pub async fn connect(&self, dsn: &str) -> Result<Box<dyn TargetWriter>> {
        let writer: Box<dyn TargetWriter> = match self {
            Backend::Postgres(_) => Box::new(PostgresWriter::connect(dsn).await?),
            Backend::Sqlite(_) => Box::new(SqliteWriter::connect(dsn).await?),
            Backend::Mysql(_) => Box::new(MysqlWriter::connect(dsn).await?),
        };
        Ok(writer)
    }
}

/// Look up a legacy type in a dialect's type table; unmapped types yield `""`.
fn lookup_type(map: &[(LegacyType, &'static str)], data_type: LegacyType) -> &'static str {
    map.iter()
        .find(|(legacy, _)| *legacy == data_type)
        .map(|(_, name)| *name)
        .unwrap_or("")
}
