//! PostgreSQL SQL dialect (Strategy pattern).
//!
//! Provides PostgreSQL-specific identifier quoting, type names, and
//! parameter placeholders.

use crate::core::schema::LegacyType;
use crate::core::traits::Dialect;

use crate::drivers::lookup_type;

/// Legacy type to PostgreSQL column type.
const TYPE_MAP: &[(LegacyType, &str)] = &[
    (LegacyType::Bool, "BOOL"),
    (LegacyType::Byte, "SMALLINT"),
    (LegacyType::Int, "INTEGER"),
    (LegacyType::LongInt, "INTEGER"),
    (LegacyType::Money, "MONEY"),
    (LegacyType::Float, "REAL"),
    (LegacyType::Double, "DOUBLE"),
    (LegacyType::DateTime, "TIMESTAMP"),
    (LegacyType::Binary, "BYTEA"),
    (LegacyType::Text, "TEXT"),
    (LegacyType::LongBinary, "BYTEA"),
    (LegacyType::LongText, "TEXT"),
    (LegacyType::Guid, "UUID"),
    (LegacyType::Numeric, "NUMERIC"),
];

/// PostgreSQL dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Create a new PostgreSQL dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgres"
    }

    fn quote_ident(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn type_name(&self, data_type: LegacyType) -> &'static str {
        lookup_type(TYPE_MAP, data_type)
    }

    fn param_placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }
}
