//! SQLite SQL dialect (Strategy pattern).

use crate::core::schema::LegacyType;
use crate::core::traits::Dialect;

use crate::drivers::lookup_type;

/// Legacy type to SQLite declared column type.
const TYPE_MAP: &[(LegacyType, &str)] = &[
    (LegacyType::Bool, "BOOL"),
    (LegacyType::Byte, "BYTE"),
    (LegacyType::Int, "INTEGER"),
    (LegacyType::LongInt, "INTEGER"),
    (LegacyType::Money, "NUMERIC"),
    (LegacyType::Float, "REAL"),
    (LegacyType::Double, "REAL"),
    (LegacyType::DateTime, "DATETIME"),
    (LegacyType::Binary, "BLOB"),
    (LegacyType::Text, "TEXT"),
    (LegacyType::LongBinary, "BLOB"),
    (LegacyType::LongText, "TEXT"),
    (LegacyType::Guid, "TEXT"),
    (LegacyType::Numeric, "NUMERIC"),
];

/// SQLite dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Create a new SQLite dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn quote_ident(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn type_name(&self, data_type: LegacyType) -> &'static str {
        lookup_type(TYPE_MAP, data_type)
    }

    fn param_placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }
}
