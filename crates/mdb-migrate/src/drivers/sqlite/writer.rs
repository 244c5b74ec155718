//! SQLite destination writer.
//!
//! Implements the `TargetWriter` trait on a single-connection SQLx pool.
//! SQLite has no decimal or UUID storage class, so those bind as text.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Executor, Sqlite, Transaction};
use tracing::{debug, info};

use crate::core::schema::LegacyType;
use crate::core::traits::TargetWriter;
use crate::core::value::SqlValue;
use crate::error::{MigrateError, Result};

/// SQLite destination writer.
pub struct SqliteWriter {
    pool: SqlitePool,
    tx: Option<Transaction<'static, Sqlite>>,
}

impl SqliteWriter {
    /// Open the destination file and verify the session.
    ///
    /// The file is created when missing unless the connection string
    /// carries an explicit `mode=` parameter.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let mut options = SqliteConnectOptions::from_str(dsn)
            .map_err(|e| MigrateError::connection(e, "parsing SQLite connection string"))?;
        if !dsn.contains("mode=") {
            options = options.create_if_missing(true);
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| MigrateError::connection(e, "opening SQLite destination"))?;

        // Test connection
        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(|e| MigrateError::connection(e, "testing SQLite destination connection"))?;

        info!("Opened SQLite destination");

        Ok(Self { pool, tx: None })
    }

    /// Get a clone of the underlying connection pool.
    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    fn tx(&mut self) -> Result<&mut Transaction<'static, Sqlite>> {
        self.tx
            .as_mut()
            .ok_or_else(|| MigrateError::Transaction("no open transaction".into()))
    }
}

#[async_trait]
impl TargetWriter for SqliteWriter {
    fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }

    async fn begin(&mut self) -> Result<()> {
        if self.tx.is_some() {
            return Err(MigrateError::Transaction(
                "a transaction is already open".into(),
            ));
        }
        self.tx = Some(self.pool.begin().await?);
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        // Commits are awaited to completion, never dropped midway
        let tx = self
            .tx
            .take()
            .ok_or_else(|| MigrateError::Transaction("commit without transaction".into()))?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| MigrateError::Transaction("rollback without transaction".into()))?;
        tx.rollback().await?;
        Ok(())
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        let tx = self.tx()?;
        let result = (&mut **tx).execute(sql).await?;
        Ok(result.rows_affected())
    }

    async fn prepare(&mut self, sql: &str) -> Result<()> {
        let tx = self.tx()?;
        (&mut **tx).prepare(sql).await?;
        debug!("Prepared statement: {}", sql);
        Ok(())
    }

    async fn insert_row(&mut self, sql: &str, row: &[SqlValue]) -> Result<u64> {
        let tx = self.tx()?;
        let mut query = sqlx::query(sql);
        for value in row {
            query = bind_value(query, value);
        }
        let result = query.execute(&mut **tx).await?;
        Ok(result.rows_affected())
    }

    fn db_type(&self) -> &str {
        "sqlite"
    }

    async fn close(&mut self) {
        self.tx = None;
        self.pool.close().await;
    }
}

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Bind a value using the SQLite storage class matching its legacy type.
fn bind_value<'q>(query: SqliteQuery<'q>, value: &'q SqlValue) -> SqliteQuery<'q> {
    match value {
        SqlValue::Null(data_type) => bind_null(query, *data_type),
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::Byte(v) => query.bind(i32::from(*v)),
        SqlValue::Int(v) => query.bind(i32::from(*v)),
        SqlValue::LongInt(v) => query.bind(*v),
        SqlValue::Money(v) | SqlValue::Numeric(v) => query.bind(v.to_string()),
        SqlValue::Float(v) => query.bind(f64::from(*v)),
        SqlValue::Double(v) => query.bind(*v),
        SqlValue::DateTime(v) => query.bind(*v),
        SqlValue::Binary(v) | SqlValue::LongBinary(v) => query.bind(v.as_slice()),
        SqlValue::Text(v) | SqlValue::LongText(v) | SqlValue::Unknown(v) => {
            query.bind(v.as_str())
        }
        SqlValue::Guid(v) => query.bind(v.hyphenated().to_string()),
    }
}

fn bind_null(query: SqliteQuery<'_>, data_type: LegacyType) -> SqliteQuery<'_> {
    match data_type {
        LegacyType::Bool => query.bind(None::<bool>),
        LegacyType::Byte | LegacyType::Int | LegacyType::LongInt => query.bind(None::<i32>),
        LegacyType::Float | LegacyType::Double => query.bind(None::<f64>),
        LegacyType::DateTime => query.bind(None::<NaiveDateTime>),
        LegacyType::Binary | LegacyType::LongBinary => query.bind(None::<Vec<u8>>),
        LegacyType::Money
        | LegacyType::Numeric
        | LegacyType::Text
        | LegacyType::LongText
        | LegacyType::Guid
        | LegacyType::Unknown(_) => query.bind(None::<String>),
    }
}
