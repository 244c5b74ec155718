//! Copy orchestrator - transaction scoping across files and tables.
//!
//! The orchestrator walks files, then tables, strictly in order. Where a
//! transaction is opened depends on the [`TransactionScope`]:
//!
//! - `full`: once, around the whole run
//! - `file`: once per source file
//! - `table`: once per table
//!
//! Whatever the scope, the first error rolls back the innermost open
//! transaction and halts the run. Nothing is skipped.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{CopyOptions, TransactionScope};
use crate::core::schema::Table;
use crate::core::traits::{Dialect, SourceReader, TargetWriter};
use crate::error::{MigrateError, Result};
use crate::shutdown::cancellable;
use crate::source::MdbToolsReader;
use crate::transfer::{create_table_sql, RowPipeline};

/// Copy orchestrator.
pub struct Orchestrator {
    options: CopyOptions,
    source: Arc<dyn SourceReader>,
    writer: Box<dyn TargetWriter>,
    stats: CopyStats,
}

/// Result of a copy run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CopyStats {
    /// When the run started.
    pub started_at: Option<DateTime<Utc>>,

    /// When the run finished.
    pub completed_at: Option<DateTime<Utc>>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Source files fully processed.
    pub files: usize,

    /// Tables created and filled.
    pub tables_copied: usize,

    /// System tables passed over.
    pub tables_skipped: usize,

    /// Rows inserted.
    pub rows: u64,
}

impl CopyStats {
    /// Serialize the stats as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| MigrateError::Config(format!("serializing stats: {}", e)))
    }
}

impl Orchestrator {
    /// Connect to the destination and pair it with the mdbtools reader.
    pub async fn connect(options: CopyOptions, cancel: &CancellationToken) -> Result<Self> {
        let destination = &options.destination;
        info!(
            "Connecting to {} destination {}",
            destination.backend.name(),
            destination.redacted()
        );
        let writer = cancellable(cancel, destination.backend.connect(&destination.dsn)).await?;
        let source = MdbToolsReader::for_options(&options);
        Ok(Self::with_parts(options, Arc::new(source), writer))
    }

    /// Build an orchestrator from an existing source and writer.
    pub fn with_parts(
        options: CopyOptions,
        source: Arc<dyn SourceReader>,
        writer: Box<dyn TargetWriter>,
    ) -> Self {
        Self {
            options,
            source,
            writer,
            stats: CopyStats::default(),
        }
    }

    /// Copy every file, halting on the first error.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<CopyStats> {
        let started_at = Utc::now();
        self.stats = CopyStats {
            started_at: Some(started_at),
            ..Default::default()
        };
        info!(
            "Copying {} file(s) to {} with {} transactions",
            self.options.files.len(),
            self.writer.db_type(),
            self.options.transaction
        );

        let full = self.options.transaction == TransactionScope::Full;
        if full {
            self.begin("", cancel).await?;
        }

        let files = self.options.files.clone();
        for file in &files {
            if let Err(e) = self.copy_file(file, cancel).await {
                if full {
                    self.rollback("").await;
                }
                return Err(e);
            }
        }

        if full {
            self.commit("", cancel).await?;
        }

        let completed_at = Utc::now();
        self.stats.completed_at = Some(completed_at);
        self.stats.duration_seconds =
            (completed_at - started_at).num_milliseconds() as f64 / 1000.0;

        info!(
            "Copied {} tables ({} rows) from {} file(s) in {:.1}s",
            self.stats.tables_copied, self.stats.rows, self.stats.files, self.stats.duration_seconds
        );
        Ok(self.stats.clone())
    }

    /// Close the destination session.
    pub async fn close(&mut self) {
        self.writer.close().await;
    }

    async fn copy_file(&mut self, file: &Path, cancel: &CancellationToken) -> Result<()> {
        let name = file.display().to_string();

        let owns_tx =
            self.options.transaction == TransactionScope::File && !self.writer.in_transaction();
        if owns_tx {
            self.begin(&name, cancel).await?;
        }

        if let Err(e) = self.copy_file_tables(file, cancel).await {
            if owns_tx {
                self.rollback(&name).await;
            }
            return Err(e);
        }

        if owns_tx {
            self.commit(&name, cancel).await?;
        }

        self.stats.files += 1;
        Ok(())
    }

    async fn copy_file_tables(&mut self, file: &Path, cancel: &CancellationToken) -> Result<()> {
        let tables = cancellable(cancel, self.source.list_tables(file)).await?;
        debug!("{}: {} tables", file.display(), tables.len());

        for table in &tables {
            self.copy_table(file, table, cancel).await?;
        }
        Ok(())
    }

    async fn copy_table(
        &mut self,
        file: &Path,
        table: &Table,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if table.is_system {
            debug!("{}: skipping system table", table.name);
            self.stats.tables_skipped += 1;
            return Ok(());
        }

        let label = format!("{}@{}", file.display(), table.name);

        let owns_tx = if self.writer.in_transaction() {
            false
        } else if self.options.transaction == TransactionScope::Table {
            self.begin(&label, cancel).await?;
            true
        } else {
            return Err(MigrateError::Transaction(format!(
                "could not make transaction for {}",
                label
            )));
        };

        let rows = match self.copy_table_contents(file, table, cancel).await {
            Ok(rows) => rows,
            Err(e) => {
                if owns_tx {
                    self.rollback(&label).await;
                }
                return Err(e);
            }
        };

        if owns_tx {
            self.commit(&label, cancel).await?;
        }

        info!("{}: copied {} rows", table.name, rows);
        self.stats.tables_copied += 1;
        self.stats.rows += rows;
        Ok(())
    }

    async fn copy_table_contents(
        &mut self,
        file: &Path,
        table: &Table,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let backend = &self.options.destination.backend;
        let ddl = create_table_sql(backend, table, self.options.check_table);
        if self.options.log_query {
            info!("{}", ddl);
        }
        cancellable(cancel, self.writer.execute(&ddl))
            .await
            .map_err(|e| e.schema_in(&table.name))?;

        let mut rows = cancellable(cancel, self.source.read_rows(file, table)).await?;

        let pipeline = RowPipeline {
            dialect: backend,
            encoding: &self.options.encoding,
            log_query: self.options.log_query,
        };
        pipeline
            .copy_rows(self.writer.as_mut(), table, rows.as_mut(), cancel)
            .await
    }

    async fn begin(&mut self, unit: &str, cancel: &CancellationToken) -> Result<()> {
        cancellable(cancel, self.writer.begin()).await?;
        info!("{}", scoped("begin", unit));
        Ok(())
    }

    /// Commit the open transaction, rolling it back if the commit never happens.
    ///
    /// Cancellation is checked before the commit starts. Once started, the
    /// commit runs to completion so the writer's transaction state stays exact.
    async fn commit(&mut self, unit: &str, cancel: &CancellationToken) -> Result<()> {
        let result = if cancel.is_cancelled() {
            Err(MigrateError::Cancelled)
        } else {
            self.writer.commit().await
        };
        match result {
            Ok(()) => {
                info!("{}", scoped("commit", unit));
                Ok(())
            }
            Err(e) => {
                self.rollback(unit).await;
                Err(e)
            }
        }
    }

    /// Roll back the open transaction, if any.
    ///
    /// Runs even after cancellation. A failed rollback is logged; the error
    /// that caused it is what the caller reports.
    async fn rollback(&mut self, unit: &str) {
        if !self.writer.in_transaction() {
            return;
        }
        let event = scoped("rollback", unit);
        match self.writer.rollback().await {
            Ok(()) => info!("{}", event),
            Err(e) => warn!("{} failed: {}", event, e),
        }
    }
}

/// Log line for a transaction event: `commit`, `commit a.mdb`, `commit a.mdb@Orders`.
fn scoped(action: &str, unit: &str) -> String {
    if unit.is_empty() {
        action.to_string()
    } else {
        format!("{} {}", action, unit)
    }
}
