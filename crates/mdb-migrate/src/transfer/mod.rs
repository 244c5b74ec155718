//! Schema and row transfer for a single table.
//!
//! The row pipeline prepares one INSERT statement per table and streams the
//! source rows through it one at a time. Rows are never batched or buffered:
//! each row is decoded, inserted, and dropped before the next one is read.

pub mod ddl;

pub use ddl::create_table_sql;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::core::schema::Table;
use crate::core::traits::{Dialect, RowStream, TargetWriter};
use crate::encoding::EncodingSpec;
use crate::error::{MigrateError, Result};
use crate::shutdown::cancellable;

/// Build the parameterized INSERT statement for `table`.
///
/// Column order matches [`create_table_sql`].
pub fn insert_sql(dialect: &dyn Dialect, table: &Table) -> String {
    let cols: Vec<String> = table
        .columns
        .iter()
        .map(|c| dialect.quote_ident(&c.name))
        .collect();
    let placeholders: Vec<String> = (1..=table.columns.len())
        .map(|i| dialect.param_placeholder(i))
        .collect();

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        dialect.quote_ident(&table.name),
        cols.join(", "),
        placeholders.join(", ")
    )
}

/// Per-table settings for [`RowPipeline::copy_rows`].
#[derive(Clone, Copy)]
pub struct RowPipeline<'a> {
    /// Syntax of the destination.
    pub dialect: &'a dyn Dialect,
    /// Text and blob decoders.
    pub encoding: &'a EncodingSpec,
    /// Log the generated INSERT statement.
    pub log_query: bool,
}

impl RowPipeline<'_> {
    /// Copy every row of `rows` into `table` on the writer's open transaction.
    ///
    /// Returns the number of rows inserted. The first failure from the source,
    /// the decoder, or the destination aborts the table.
    pub async fn copy_rows(
        &self,
        writer: &mut dyn TargetWriter,
        table: &Table,
        rows: &mut dyn RowStream,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let sql = insert_sql(self.dialect, table);
        if self.log_query {
            info!("{}", sql);
        }

        cancellable(cancel, writer.prepare(&sql))
            .await
            .map_err(|e| e.schema_in(&table.name))?;

        let mut count: u64 = 0;
        while let Some(row) = cancellable(cancel, rows.next_row()).await? {
            let row_num = count + 1;

            if row.len() != table.columns.len() {
                return Err(MigrateError::Row {
                    table: table.name.clone(),
                    message: format!(
                        "row {}: expected {} fields, got {}",
                        row_num,
                        table.columns.len(),
                        row.len()
                    ),
                });
            }

            let row = self.encoding.decode_row(row).map_err(|e| MigrateError::Row {
                table: table.name.clone(),
                message: format!(
                    "row {}: column {} is not valid {}",
                    row_num,
                    table.columns[e.index].name,
                    e.encoding
                ),
            })?;

            cancellable(cancel, writer.insert_row(&sql, &row))
                .await
                .map_err(|e| e.row_in(&table.name, row_num))?;
            count = row_num;
        }

        debug!("{}: inserted {} rows", table.name, count);
        Ok(count)
    }
}
