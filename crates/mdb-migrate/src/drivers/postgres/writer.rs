//! PostgreSQL destination writer.
//!
//! Implements the `TargetWriter` trait on a single-connection SQLx pool.
//! The open transaction is held as a `'static` pool transaction so the
//! writer can own it across calls.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions};
use sqlx::query::Query;
use sqlx::{Executor, Postgres, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::schema::LegacyType;
use crate::core::traits::TargetWriter;
use crate::core::value::SqlValue;
use crate::error::{MigrateError, Result};

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// PostgreSQL destination writer.
pub struct PostgresWriter {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
}

impl PostgresWriter {
    /// Connect to the destination and verify the session.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .connect(dsn)
            .await
            .map_err(|e| MigrateError::connection(e, "connecting to PostgreSQL destination"))?;

        // Test connection
        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(|e| MigrateError::connection(e, "testing PostgreSQL destination connection"))?;

        info!("Connected to PostgreSQL destination");

        Ok(Self { pool, tx: None })
    }

    fn tx(&mut self) -> Result<&mut Transaction<'static, Postgres>> {
        self.tx
            .as_mut()
            .ok_or_else(|| MigrateError::Transaction("no open transaction".into()))
    }
}

#[async_trait]
impl TargetWriter for PostgresWriter {
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
        "postgres"
    }

    async fn close(&mut self) {
        self.tx = None;
        self.pool.close().await;
    }
}

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Bind a value using the PostgreSQL type matching its legacy type.
fn bind_value<'q>(query: PgQuery<'q>, value: &'q SqlValue) -> PgQuery<'q> {
    match value {
        SqlValue::Null(data_type) => bind_null(query, *data_type),
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::Byte(v) => query.bind(i16::from(*v)),
        SqlValue::Int(v) => query.bind(i32::from(*v)),
        SqlValue::LongInt(v) => query.bind(*v),
        SqlValue::Money(v) | SqlValue::Numeric(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::Double(v) => query.bind(*v),
        SqlValue::DateTime(v) => query.bind(*v),
        SqlValue::Binary(v) | SqlValue::LongBinary(v) => query.bind(v.as_slice()),
        SqlValue::Text(v) | SqlValue::LongText(v) | SqlValue::Unknown(v) => {
            query.bind(v.as_str())
        }
        SqlValue::Guid(v) => query.bind(*v),
    }
}

fn bind_null(query: PgQuery<'_>, data_type: LegacyType) -> PgQuery<'_> {
    match data_type {
        LegacyType::Bool => query.bind(None::<bool>),
        LegacyType::Byte => query.bind(None::<i16>),
        LegacyType::Int | LegacyType::LongInt => query.bind(None::<i32>),
        LegacyType::Money | LegacyType::Numeric => query.bind(None::<Decimal>),
        LegacyType::Float => query.bind(None::<f32>),
        LegacyType::Double => query.bind(None::<f64>),
        LegacyType::DateTime => query.bind(None::<NaiveDateTime>),
        LegacyType::Binary | LegacyType::LongBinary => query.bind(None::<Vec<u8>>),
        LegacyType::Text | LegacyType::LongText | LegacyType::Unknown(_) => {
            query.bind(None::<String>)
        }
        LegacyType::Guid => query.bind(None::<Uuid>),
    }
}
