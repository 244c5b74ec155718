//! Optional re-encoding of legacy text and binary values.
//!
//! Legacy files frequently store text in a single-byte code page. An
//! [`EncodingSpec`] reinterprets the raw bytes of Text/LongText values with
//! a text decoder and of Binary/LongBinary values with a blob decoder.
//! NULLs and every other type pass through untouched.
//!
//! When a text decoder is set, the source hands text over as ISO-8859-1, one
//! char per legacy byte, so the bytes can be recovered before decoding. Text
//! holding chars above U+00FF was stored as Unicode and is left as is.

use std::borrow::Cow;
use std::fmt;

use encoding_rs::Encoding;
use oem_cp::code_table::{
    DECODING_TABLE_CP437, DECODING_TABLE_CP850, DECODING_TABLE_CP852, DECODING_TABLE_CP855,
    DECODING_TABLE_CP858, DECODING_TABLE_CP860, DECODING_TABLE_CP862, DECODING_TABLE_CP863,
    DECODING_TABLE_CP865,
};
use thiserror::Error;

use crate::core::schema::Row;
use crate::core::value::SqlValue;
use crate::error::{MigrateError, Result};

/// A character set that turns legacy bytes into text.
#[derive(Clone, Copy, PartialEq)]
pub enum Charset {
    /// An `encoding_rs` encoding.
    Whatwg(&'static Encoding),
    /// An ISO-8859 page: C1 controls at 0x80-0x9F, `upper` for everything else.
    Iso {
        name: &'static str,
        upper: &'static Encoding,
    },
    /// A DOS OEM code page; `table` covers 0x80-0xFF.
    Oem {
        name: &'static str,
        table: &'static [char; 128],
    },
}

impl Charset {
    pub fn name(&self) -> &'static str {
        match *self {
            Charset::Whatwg(enc) => enc.name(),
            Charset::Iso { name, .. } | Charset::Oem { name, .. } => name,
        }
    }

    /// Decode `bytes`, or `None` if they are malformed in this charset.
    ///
    /// Never inserts replacement characters.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match *self {
            Charset::Whatwg(enc) => enc
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(Cow::into_owned),
            Charset::Iso { upper, .. } => decode_iso(upper, bytes),
            Charset::Oem { table, .. } => Some(oem_cp::decode_string_complete_table(bytes, table)),
        }
    }
}

impl fmt::Debug for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Charset").field(&self.name()).finish()
    }
}

fn decode_iso(upper: &'static Encoding, bytes: &[u8]) -> Option<String> {
    let mut out = String::with_capacity(bytes.len());
    let mut start = 0;
    for (i, &b) in bytes.iter().enumerate() {
        if (0x80..0xa0).contains(&b) {
            out.push_str(&upper.decode_without_bom_handling_and_without_replacement(&bytes[start..i])?);
            out.push(char::from(b));
            start = i + 1;
        }
    }
    out.push_str(&upper.decode_without_bom_handling_and_without_replacement(&bytes[start..])?);
    Some(out)
}

struct Entry {
    charset: Charset,
    aliases: &'static [&'static str],
}

const fn whatwg(enc: &'static Encoding, aliases: &'static [&'static str]) -> Entry {
    Entry {
        charset: Charset::Whatwg(enc),
        aliases,
    }
}

const fn iso(name: &'static str, upper: &'static Encoding, aliases: &'static [&'static str]) -> Entry {
    Entry {
        charset: Charset::Iso { name, upper },
        aliases,
    }
}

const fn oem(name: &'static str, table: &'static [char; 128], aliases: &'static [&'static str]) -> Entry {
    Entry {
        charset: Charset::Oem { name, table },
        aliases,
    }
}

/// Encodings offered by `--encodings`, in display order.
///
/// Aliases cover the hyphenated `IBM-Code-Page-437` / `Windows-1252` style.
static CATALOGUE: &[Entry] = &[
    oem("IBM437", &DECODING_TABLE_CP437, &["IBM-Code-Page-437", "cp437"]),
    oem("IBM850", &DECODING_TABLE_CP850, &["IBM-Code-Page-850", "cp850"]),
    oem("IBM852", &DECODING_TABLE_CP852, &["IBM-Code-Page-852", "cp852"]),
    oem("IBM855", &DECODING_TABLE_CP855, &["IBM-Code-Page-855", "cp855"]),
    oem("IBM858", &DECODING_TABLE_CP858, &["IBM-Code-Page-858", "cp858"]),
    oem("IBM860", &DECODING_TABLE_CP860, &["IBM-Code-Page-860", "cp860"]),
    oem("IBM862", &DECODING_TABLE_CP862, &["IBM-Code-Page-862", "cp862"]),
    oem("IBM863", &DECODING_TABLE_CP863, &["IBM-Code-Page-863", "cp863"]),
    oem("IBM865", &DECODING_TABLE_CP865, &["IBM-Code-Page-865", "cp865"]),
    whatwg(encoding_rs::IBM866, &["IBM-Code-Page-866"]),
    iso("ISO-8859-1", encoding_rs::WINDOWS_1252, &["latin1", "iso8859-1"]),
    whatwg(encoding_rs::ISO_8859_2, &[]),
    whatwg(encoding_rs::ISO_8859_3, &[]),
    whatwg(encoding_rs::ISO_8859_4, &[]),
    whatwg(encoding_rs::ISO_8859_5, &[]),
    whatwg(encoding_rs::ISO_8859_6, &["ISO-8859-6E", "ISO-8859-6I"]),
    whatwg(encoding_rs::ISO_8859_7, &[]),
    whatwg(encoding_rs::ISO_8859_8, &["ISO-8859-8E"]),
    whatwg(encoding_rs::ISO_8859_8_I, &["ISO-8859-8I"]),
    iso("ISO-8859-9", encoding_rs::WINDOWS_1254, &["latin5", "iso8859-9"]),
    whatwg(encoding_rs::ISO_8859_10, &[]),
    whatwg(encoding_rs::ISO_8859_13, &[]),
    whatwg(encoding_rs::ISO_8859_14, &[]),
    whatwg(encoding_rs::ISO_8859_15, &[]),
    whatwg(encoding_rs::ISO_8859_16, &[]),
    whatwg(encoding_rs::KOI8_R, &[]),
    whatwg(encoding_rs::KOI8_U, &[]),
    whatwg(encoding_rs::MACINTOSH, &[]),
    whatwg(encoding_rs::X_MAC_CYRILLIC, &["Macintosh-Cyrillic"]),
    whatwg(encoding_rs::WINDOWS_874, &[]),
    whatwg(encoding_rs::WINDOWS_1250, &[]),
    whatwg(encoding_rs::WINDOWS_1251, &[]),
    whatwg(encoding_rs::WINDOWS_1252, &[]),
    whatwg(encoding_rs::WINDOWS_1253, &[]),
    whatwg(encoding_rs::WINDOWS_1254, &[]),
    whatwg(encoding_rs::WINDOWS_1255, &[]),
    whatwg(encoding_rs::WINDOWS_1256, &[]),
    whatwg(encoding_rs::WINDOWS_1257, &[]),
    whatwg(encoding_rs::WINDOWS_1258, &[]),
    whatwg(encoding_rs::X_USER_DEFINED, &[]),
    whatwg(encoding_rs::SHIFT_JIS, &[]),
    whatwg(encoding_rs::EUC_JP, &[]),
    whatwg(encoding_rs::ISO_2022_JP, &[]),
    whatwg(encoding_rs::EUC_KR, &[]),
    whatwg(encoding_rs::GBK, &[]),
    whatwg(encoding_rs::GB18030, &[]),
    whatwg(encoding_rs::BIG5, &[]),
    whatwg(encoding_rs::UTF_16LE, &[]),
    whatwg(encoding_rs::UTF_16BE, &[]),
    whatwg(encoding_rs::UTF_8, &[]),
];

/// All encodings that can be named on the command line.
pub fn available() -> impl Iterator<Item = Charset> {
    CATALOGUE.iter().map(|entry| entry.charset)
}

/// Resolve an encoding by name, ignoring case.
///
/// Catalogue names and aliases are tried first, then WHATWG labels such as
/// `cp1252`.
pub fn by_name(name: &str) -> Result<Charset> {
    let wanted = name.trim();
    CATALOGUE
        .iter()
        .find(|entry| {
            entry.charset.name().eq_ignore_ascii_case(wanted)
                || entry.aliases.iter().any(|a| a.eq_ignore_ascii_case(wanted))
        })
        .map(|entry| entry.charset)
        .or_else(|| {
            Encoding::for_label(wanted.as_bytes())
                .filter(|enc| *enc != encoding_rs::REPLACEMENT)
                .map(Charset::Whatwg)
        })
        .ok_or_else(|| MigrateError::Config(format!("encoding {:?} does not exist", name)))
}

/// A field that could not be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("field {index} is not valid {encoding}")]
pub struct DecodeError {
    /// Zero-based field index within the row.
    pub index: usize,
    /// Name of the encoding that rejected the bytes.
    pub encoding: &'static str,
}

/// Text and blob decoders chosen for the run.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodingSpec {
    /// Decoder for Text and LongText values.
    pub text: Option<Charset>,
    /// Decoder for Binary and LongBinary values.
    pub blob: Option<Charset>,
}

impl EncodingSpec {
    /// Resolve optional encoding names into decoders.
    pub fn from_names(text: Option<&str>, blob: Option<&str>) -> Result<Self> {
        Ok(Self {
            text: text.map(by_name).transpose()?,
            blob: blob.map(by_name).transpose()?,
        })
    }

    /// Whether any decoder is configured.
    pub fn is_active(&self) -> bool {
        self.text.is_some() || self.blob.is_some()
    }

    /// Re-encode every field of a row.
    ///
    /// The first field that fails to decode aborts the whole row.
    pub fn decode_row(&self, row: Row) -> std::result::Result<Row, DecodeError> {
        if !self.is_active() {
            return Ok(row);
        }
        row.into_iter()
            .enumerate()
            .map(|(index, value)| self.decode_value(value).map_err(|encoding| DecodeError { index, encoding }))
            .collect()
    }

    fn decode_value(&self, value: SqlValue) -> std::result::Result<SqlValue, &'static str> {
        match value {
            SqlValue::Text(s) => Ok(SqlValue::Text(decode_text(self.text, s)?)),
            SqlValue::LongText(s) => Ok(SqlValue::LongText(decode_text(self.text, s)?)),
            SqlValue::Binary(b) => Ok(SqlValue::Binary(decode_blob(self.blob, b)?)),
            SqlValue::LongBinary(b) => Ok(SqlValue::LongBinary(decode_blob(self.blob, b)?)),
            SqlValue::Null(_)
            | SqlValue::Bool(_)
            | SqlValue::Byte(_)
            | SqlValue::Int(_)
            | SqlValue::LongInt(_)
            | SqlValue::Money(_)
            | SqlValue::Float(_)
            | SqlValue::Double(_)
            | SqlValue::DateTime(_)
            | SqlValue::Guid(_)
            | SqlValue::Numeric(_)
            | SqlValue::Unknown(_) => Ok(value),
        }
    }
}

/// Decode the legacy bytes carried by `s`.
fn decode_text(charset: Option<Charset>, s: String) -> std::result::Result<String, &'static str> {
    let Some(charset) = charset else {
        return Ok(s);
    };
    match legacy_bytes(&s) {
        Some(bytes) => charset.decode(&bytes).ok_or(charset.name()),
        None => Ok(s),
    }
}

/// One byte per char, or `None` if `s` holds a char above U+00FF.
fn legacy_bytes(s: &str) -> Option<Vec<u8>> {
    s.chars().map(|c| u8::try_from(c).ok()).collect()
}

/// Decode `bytes`, yielding the UTF-8 bytes of the result.
fn decode_blob(charset: Option<Charset>, bytes: Vec<u8>) -> std::result::Result<Vec<u8>, &'static str> {
    match charset {
        None => Ok(bytes),
        Some(charset) => charset
            .decode(&bytes)
            .map(String::into_bytes)
            .ok_or(charset.name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::LegacyType;

    /// Text as the source hands it over: one ISO-8859-1 char per byte.
    fn latin1(bytes: &[u8]) -> String {
        bytes.iter().map(|&b| char::from(b)).collect()
    }

    #[test]
    fn test_by_name_ignores_case() {
        assert_eq!(by_name("WINDOWS-1252").unwrap(), Charset::Whatwg(encoding_rs::WINDOWS_1252));
        assert_eq!(by_name("koi8-r").unwrap(), Charset::Whatwg(encoding_rs::KOI8_R));
    }

    #[test]
    fn test_by_name_accepts_labels() {
        assert_eq!(by_name("cp1251").unwrap(), Charset::Whatwg(encoding_rs::WINDOWS_1251));
        assert_eq!(by_name("sjis").unwrap(), Charset::Whatwg(encoding_rs::SHIFT_JIS));
    }

    #[test]
    fn test_by_name_accepts_hyphenated_names() {
        let names = [
            "IBM-Code-Page-437",
            "IBM-Code-Page-850",
            "IBM-Code-Page-852",
            "IBM-Code-Page-855",
            "IBM-Code-Page-858",
            "IBM-Code-Page-860",
            "IBM-Code-Page-862",
            "IBM-Code-Page-863",
            "IBM-Code-Page-865",
            "IBM-Code-Page-866",
            "ISO-8859-1",
            "ISO-8859-2",
            "ISO-8859-3",
            "ISO-8859-4",
            "ISO-8859-5",
            "ISO-8859-6",
            "ISO-8859-6E",
            "ISO-8859-6I",
            "ISO-8859-7",
            "ISO-8859-8",
            "ISO-8859-8E",
            "ISO-8859-8I",
            "ISO-8859-9",
            "ISO-8859-10",
            "ISO-8859-13",
            "ISO-8859-14",
            "ISO-8859-15",
            "ISO-8859-16",
            "KOI8-R",
            "KOI8-U",
            "Macintosh",
            "Macintosh-Cyrillic",
            "Windows-874",
            "Windows-1250",
            "Windows-1251",
            "Windows-1252",
            "Windows-1253",
            "Windows-1254",
            "Windows-1255",
            "Windows-1256",
            "Windows-1257",
            "Windows-1258",
            "X-User-Defined",
        ];
        for name in names {
            assert!(by_name(name).is_ok(), "{} should resolve", name);
            assert!(by_name(&name.to_lowercase()).is_ok(), "{} should resolve", name);
        }
    }

    #[test]
    fn test_dos_code_pages() {
        let cp437 = by_name("cp437").unwrap();
        assert_eq!(cp437, by_name("IBM-Code-Page-437").unwrap());
        assert_eq!(cp437.name(), "IBM437");
        assert_eq!(cp437.decode(&[0xfb, 0xac, 0x3d, 0xab]).unwrap(), "√¼=½");

        let cp850 = by_name("IBM-Code-Page-850").unwrap();
        assert_eq!(cp850.decode(b"caf\x82").unwrap(), "café");

        assert_eq!(
            by_name("IBM-Code-Page-866").unwrap(),
            Charset::Whatwg(encoding_rs::IBM866)
        );
    }

    #[test]
    fn test_iso_8859_1_is_not_windows_1252() {
        let latin = by_name("ISO-8859-1").unwrap();
        assert_eq!(latin, by_name("latin1").unwrap());
        assert_eq!(latin.decode(&[0x80, 0xe9]).unwrap(), "\u{80}é");

        let windows = by_name("windows-1252").unwrap();
        assert_eq!(windows.decode(&[0x80, 0xe9]).unwrap(), "€é");
    }

    #[test]
    fn test_iso_8859_9_keeps_c1_controls() {
        let turkish = by_name("ISO-8859-9").unwrap();
        assert_eq!(turkish.decode(&[0x85, 0x41, 0xfd]).unwrap(), "\u{85}Aı");
    }

    #[test]
    fn test_by_name_unknown() {
        let err = by_name("klingon").unwrap_err();
        assert!(matches!(err, MigrateError::Config(_)));
        assert!(err.to_string().contains("klingon"));
    }

    #[test]
    fn test_replacement_label_is_rejected() {
        assert!(by_name("iso-2022-kr").is_err());
    }

    #[test]
    fn test_inactive_spec_passes_rows_through() {
        let spec = EncodingSpec::default();
        let row = vec![SqlValue::Text("é".into()), SqlValue::Binary(vec![0xff])];
        assert_eq!(spec.decode_row(row.clone()).unwrap(), row);
    }

    #[test]
    fn test_text_decoder_recovers_legacy_bytes() {
        let spec = EncodingSpec::from_names(Some("windows-1251"), None).unwrap();
        // "При" in windows-1251 is CF F0 E8
        let row = spec
            .decode_row(vec![
                SqlValue::Text(latin1(&[0xcf, 0xf0, 0xe8])),
                SqlValue::LongText("plain".into()),
            ])
            .unwrap();
        assert_eq!(row[0], SqlValue::Text("При".into()));
        assert_eq!(row[1], SqlValue::LongText("plain".into()));
    }

    #[test]
    fn test_unicode_text_is_left_alone() {
        let spec = EncodingSpec::from_names(Some("windows-1251"), None).unwrap();
        let row = spec.decode_row(vec![SqlValue::Text("При".into())]).unwrap();
        assert_eq!(row[0], SqlValue::Text("При".into()));
    }

    #[test]
    fn test_text_decode_failure() {
        let spec = EncodingSpec::from_names(Some("utf-8"), None).unwrap();
        let err = spec
            .decode_row(vec![SqlValue::Text(latin1(&[0x41, 0xff]))])
            .unwrap_err();
        assert_eq!(err.index, 0);
        assert_eq!(err.encoding, "UTF-8");
    }

    #[test]
    fn test_blob_uses_blob_decoder() {
        let spec = EncodingSpec::from_names(Some("utf-8"), Some("windows-1252")).unwrap();
        let row = spec
            .decode_row(vec![SqlValue::Binary(vec![0xe9]), SqlValue::LongBinary(vec![0x41])])
            .unwrap();
        assert_eq!(row[0], SqlValue::Binary("é".as_bytes().to_vec()));
        assert_eq!(row[1], SqlValue::LongBinary(vec![0x41]));
    }

    #[test]
    fn test_blob_without_blob_decoder_is_untouched() {
        // Only a text decoder: binary values must not go through it
        let spec = EncodingSpec::from_names(Some("utf-8"), None).unwrap();
        let row = spec.decode_row(vec![SqlValue::Binary(vec![0xff, 0xfe])]).unwrap();
        assert_eq!(row[0], SqlValue::Binary(vec![0xff, 0xfe]));
    }

    #[test]
    fn test_nulls_and_other_types_pass_through() {
        let spec = EncodingSpec::from_names(Some("windows-1252"), Some("utf-8")).unwrap();
        let row = vec![
            SqlValue::Null(LegacyType::Text),
            SqlValue::Null(LegacyType::LongBinary),
            SqlValue::LongInt(7),
            SqlValue::Unknown("é".into()),
        ];
        assert_eq!(spec.decode_row(row.clone()).unwrap(), row);
    }

    #[test]
    fn test_decode_failure_reports_field() {
        let spec = EncodingSpec::from_names(None, Some("utf-8")).unwrap();
        let err = spec
            .decode_row(vec![SqlValue::LongInt(1), SqlValue::Binary(vec![0xff, 0xfe])])
            .unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.encoding, "UTF-8");
    }

    #[test]
    fn test_available_names_resolve() {
        for charset in available() {
            assert_eq!(by_name(charset.name()).unwrap(), charset);
        }
    }
}
