//! MySQL/MariaDB SQL dialect (Strategy pattern).
//!
//! Provides MySQL-specific identifier quoting, type names, and
//! parameter placeholders.

use crate::core::schema::LegacyType;
use crate::core::traits::Dialect;

use crate::drivers::lookup_type;

/// Legacy type to MySQL column type.
const TYPE_MAP: &[(LegacyType, &str)] = &[
    (LegacyType::Bool, "BOOL"),
    (LegacyType::Byte, "TINYINT"),
    (LegacyType::Int, "INTEGER"),
    (LegacyType::LongInt, "INTEGER"),
    (LegacyType::Money, "NUMERIC"),
    (LegacyType::Float, "FLOAT"),
    (LegacyType::Double, "DOUBLE"),
    (LegacyType::DateTime, "DATETIME"),
    (LegacyType::Binary, "BLOB"),
    (LegacyType::Text, "TEXT"),
    (LegacyType::LongBinary, "BLOB"),
    (LegacyType::LongText, "TEXT"),
    (LegacyType::Guid, "TEXT"),
    (LegacyType::Numeric, "NUMERIC"),
];

/// MySQL/MariaDB dialect implementation.
///
/// Compatible with MySQL 5.7+, 8.0+, and MariaDB 10.2+.
#[derive(Debug, Clone, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    /// Create a new MySQL dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for MysqlDialect {
    fn name(&self) -> &str {
        "mysql"
    }

    fn quote_ident(&self, name: &str) -> String {
        // Backticks inside a name are escaped by doubling them
        format!("`{}`", name.replace('`', "``"))
    }

    fn type_name(&self, data_type: LegacyType) -> &'static str {
        lookup_type(TYPE_MAP, data_type)
    }

    fn param_placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }
}
