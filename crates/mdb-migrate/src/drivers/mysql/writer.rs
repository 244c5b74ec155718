//! MySQL/MariaDB destination writer.
//!
//! Implements the `TargetWriter` trait on a single-connection SQLx pool.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sqlx::mysql::{MySqlArguments, MySqlPool, MySqlPoolOptions};
use sqlx::query::Query;
use sqlx::{Executor, MySql, Transaction};
use tracing::{debug, info};

use crate::core::schema::LegacyType;
use crate::core::traits::TargetWriter;
use crate::core::value::SqlValue;
use crate::error::{MigrateError, Result};

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// MySQL destination writer.
pub struct MysqlWriter {
    pool: MySqlPool,
    tx: Option<Transaction<'static, MySql>>,
}

impl MysqlWriter {
    /// Connect to the destination and verify the session.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .connect(dsn)
            .await
            .map_err(|e| MigrateError::connection(e, "connecting to MySQL destination"))?;

        // Test connection
        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(|e| MigrateError::connection(e, "testing MySQL destination connection"))?;

        info!("Connected to MySQL destination");

        Ok(Self { pool, tx: None })
    }

    fn tx(&mut self) -> Result<&mut Transaction<'static, MySql>> {
        self.tx
            .as_mut()
            .ok_or_else(|| MigrateError::Transaction("no open transaction".into()))
    }
}

#[async_trait]
impl TargetWriter for MysqlWriter {
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
        // Plain &str goes over the text protocol, which accepts any DDL
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
        "mysql"
    }

    async fn close(&mut self) {
        self.tx = None;
        self.pool.close().await;
    }
}

type MySqlQuery<'q> = Query<'q, MySql, MySqlArguments>;

/// Bind a value using the MySQL type matching its legacy type.
///
/// GUIDs are stored in TEXT columns, so they bind as hyphenated strings.
fn bind_value<'q>(query: MySqlQuery<'q>, value: &'q SqlValue) -> MySqlQuery<'q> {
    match value {
        SqlValue::Null(data_type) => bind_null(query, *data_type),
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::Byte(v) => query.bind(*v),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::LongInt(v) => query.bind(*v),
        SqlValue::Money(v) | SqlValue::Numeric(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::Double(v) => query.bind(*v),
        SqlValue::DateTime(v) => query.bind(*v),
        SqlValue::Binary(v) | SqlValue::LongBinary(v) => query.bind(v.as_slice()),
        SqlValue::Text(v) | SqlValue::LongText(v) | SqlValue::Unknown(v) => {
            query.bind(v.as_str())
        }
        SqlValue::Guid(v) => query.bind(v.hyphenated().to_string()),
    }
}

fn bind_null(query: MySqlQuery<'_>, data_type: LegacyType) -> MySqlQuery<'_> {
    match data_type {
        LegacyType::Bool => query.bind(None::<bool>),
        LegacyType::Byte => query.bind(None::<u8>),
        LegacyType::Int => query.bind(None::<i16>),
        LegacyType::LongInt => query.bind(None::<i32>),
        LegacyType::Money | LegacyType::Numeric => query.bind(None::<Decimal>),
        LegacyType::Float => query.bind(None::<f32>),
        LegacyType::Double => query.bind(None::<f64>),
        LegacyType::DateTime => query.bind(None::<NaiveDateTime>),
        LegacyType::Binary | LegacyType::LongBinary => query.bind(None::<Vec<u8>>),
        LegacyType::Text
        | LegacyType::LongText
        | LegacyType::Guid
        | LegacyType::Unknown(_) => query.bind(None::<String>),
    }
}
