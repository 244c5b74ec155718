//! Table and column metadata as reported by the source container.

use std::fmt;

/// Column type tag of the legacy desktop database.
///
/// The fourteen named variants form the closed set every destination
/// dialect knows how to map. `Unknown` carries the raw type code of a
/// column kind the source could not classify; dialects have no mapping
/// for it and render an empty type token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegacyType {
    Bool,
    Byte,
    Int,
    LongInt,
    Money,
    Float,
    Double,
    DateTime,
    Binary,
    Text,
    LongBinary,
    LongText,
    Guid,
    Numeric,
    Unknown(u8),
}

impl LegacyType {
    /// Every mappable legacy type, in type-code order.
    pub const ALL: [LegacyType; 14] = [
        LegacyType::Bool,
        LegacyType::Byte,
        LegacyType::Int,
        LegacyType::LongInt,
        LegacyType::Money,
        LegacyType::Float,
        LegacyType::Double,
        LegacyType::DateTime,
        LegacyType::Binary,
        LegacyType::Text,
        LegacyType::LongBinary,
        LegacyType::LongText,
        LegacyType::Guid,
        LegacyType::Numeric,
    ];

    /// Classify an Access column type label (as printed by `mdb-schema ... access`).
    ///
    /// Labels of the form `Unknown 0x0d` keep their code; anything else
    /// unrecognised becomes `Unknown(0)`.
    pub fn from_access_name(label: &str) -> Self {
        match label.trim() {
            "Boolean" => LegacyType::Bool,
            "Byte" => LegacyType::Byte,
            "Integer" => LegacyType::Int,
            "Long Integer" => LegacyType::LongInt,
            "Currency" => LegacyType::Money,
            "Single" => LegacyType::Float,
            "Double" => LegacyType::Double,
            "DateTime" | "Date/Time" => LegacyType::DateTime,
            "Binary" => LegacyType::Binary,
            "Text" => LegacyType::Text,
            "OLE" => LegacyType::LongBinary,
            "Memo/Hyperlink" => LegacyType::LongText,
            "Replication ID" => LegacyType::Guid,
            "Numeric" => LegacyType::Numeric,
            other => {
                let code = other
                    .strip_prefix("Unknown 0x")
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                    .unwrap_or(0);
                LegacyType::Unknown(code)
            }
        }
    }
}

impl fmt::Display for LegacyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LegacyType::Bool => f.write_str("Bool"),
            LegacyType::Byte => f.write_str("Byte"),
            LegacyType::Int => f.write_str("Int"),
            LegacyType::LongInt => f.write_str("LongInt"),
            LegacyType::Money => f.write_str("Money"),
            LegacyType::Float => f.write_str("Float"),
            LegacyType::Double => f.write_str("Double"),
            LegacyType::DateTime => f.write_str("DateTime"),
            LegacyType::Binary => f.write_str("Binary"),
            LegacyType::Text => f.write_str("Text"),
            LegacyType::LongBinary => f.write_str("LongBinary"),
            LegacyType::LongText => f.write_str("LongText"),
            LegacyType::Guid => f.write_str("GUID"),
            LegacyType::Numeric => f.write_str("Numeric"),
            LegacyType::Unknown(code) => write!(f, "Unknown(0x{:02x})", code),
        }
    }
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Legacy type tag.
    pub data_type: LegacyType,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: LegacyType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Table metadata.
///
/// Column order is fixed by the source and is used unchanged for both
/// the CREATE TABLE and the INSERT column lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    /// Table name.
    pub name: String,
    /// Internal metadata table of the container; never copied.
    pub is_system: bool,
    /// Columns in source order.
    pub columns: Vec<Column>,
}

impl Table {
    /// Create a user table.
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            is_system: false,
            columns,
        }
    }

    /// Create a system table.
    pub fn system(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_system: true,
            columns: Vec::new(),
        }
    }

    /// Column names in source order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// One source row; values align 1:1 with [`Table::columns`].
pub type Row = Vec<super::value::SqlValue>;
