//! CREATE TABLE generation.

use crate::core::schema::Table;
use crate::core::traits::Dialect;

/// Build the CREATE TABLE statement for `table`.
///
/// Columns keep source order. A legacy type the dialect cannot map renders
/// as an empty type token; the destination then rejects the statement.
pub fn create_table_sql(dialect: &dyn Dialect, table: &Table, if_not_exists: bool) -> String {
    let col_defs: Vec<String> = table
        .columns
        .iter()
        .map(|c| {
            format!(
                "{} {}",
                dialect.quote_ident(&c.name),
                dialect.type_name(c.data_type)
            )
        })
        .collect();

    format!(
        "CREATE TABLE{} {} ({})",
        if if_not_exists { " IF NOT EXISTS" } else { "" },
        dialect.quote_ident(&table.name),
        col_defs.join(", ")
    )
}
