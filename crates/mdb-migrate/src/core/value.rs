//! SQL value types for source-to-destination transfer.
//!
//! Every value carries the legacy type it was read as, so downstream steps
//! (re-encoding, binding) dispatch on the variant instead of inspecting
//! runtime types.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::schema::LegacyType;

/// A single field value tagged with its legacy type.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL with the column's legacy type, so binders pick a matching parameter type.
    Null(LegacyType),

    /// Yes/No field.
    Bool(bool),

    /// Unsigned 8-bit integer.
    Byte(u8),

    /// 16-bit signed integer.
    Int(i16),

    /// 32-bit signed integer.
    LongInt(i32),

    /// Currency, fixed four decimal places.
    Money(Decimal),

    /// Single precision float.
    Float(f32),

    /// Double precision float.
    Double(f64),

    /// Date/time without zone.
    DateTime(NaiveDateTime),

    /// Fixed-size binary.
    Binary(Vec<u8>),

    /// Short text.
    Text(String),

    /// OLE object.
    LongBinary(Vec<u8>),

    /// Memo.
    LongText(String),

    /// Replication ID.
    Guid(Uuid),

    /// Exact numeric.
    Numeric(Decimal),

    /// Value of an unclassified column kind, kept as its textual form.
    Unknown(String),
}
