//! Access reader backed by the mdbtools command-line suite.
//!
//! - `mdb-tables` lists user and system tables
//! - `mdb-schema` describes columns in Access type names
//! - `mdb-json` streams rows as one JSON object per line
//!
//! Rows are read from the child's stdout as they are produced, so memory
//! stays bounded by a single row regardless of table size.

use std::collections::{HashMap, HashSet};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use crate::config::CopyOptions;
use crate::core::schema::{Column, LegacyType, Row, Table};
use crate::core::traits::{RowStream, SourceReader};
use crate::core::value::SqlValue;
use crate::error::{MigrateError, Result};

/// Date format passed to `mdb-json -D`.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Timestamp format passed to `mdb-json -T`.
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Charset mdbtools uses to convert Jet3 text.
const JET3_CHARSET_VAR: &str = "MDB_JET3_CHARSET";

/// Reads Access files by running mdbtools.
#[derive(Debug, Clone, Default)]
pub struct MdbToolsReader {
    tools_dir: Option<PathBuf>,
    legacy_text: bool,
}

impl MdbToolsReader {
    /// Use mdbtools from `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use mdbtools installed in `dir`.
    pub fn with_tools_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            tools_dir: Some(dir.into()),
            ..Self::default()
        }
    }

    /// Reader for a run: tools from `options.tools_dir`, legacy text when a
    /// text decoder is configured.
    pub fn for_options(options: &CopyOptions) -> Self {
        let reader = match &options.tools_dir {
            Some(dir) => Self::with_tools_dir(dir),
            None => Self::new(),
        };
        reader.legacy_text(options.encoding.text.is_some())
    }

    /// Hand Jet3 text over as ISO-8859-1, one char per stored byte.
    ///
    /// Needed when a text decoder reinterprets the stored bytes. Jet4 text is
    /// stored as Unicode and is unaffected.
    pub fn legacy_text(mut self, enabled: bool) -> Self {
        self.legacy_text = enabled;
        self
    }

    fn command(&self, program: &str) -> Command {
        let program = match &self.tools_dir {
            Some(dir) => dir.join(program),
            None => PathBuf::from(program),
        };
        let mut cmd = Command::new(program);
        cmd.kill_on_drop(true);
        // Table names must read the same in mdb-tables and mdb-json
        if self.legacy_text {
            cmd.env(JET3_CHARSET_VAR, "ISO-8859-1");
        }
        cmd
    }

    /// Run a tool to completion and return its stdout.
    async fn output(&self, file: &Path, program: &str, args: &[&OsStr]) -> Result<String> {
        debug!("Running {} {:?}", program, args);
        let output = self
            .command(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| source_error(file, format!("running {}: {}", program, e)))?;

        if !output.status.success() {
            return Err(source_error(
                file,
                format!(
                    "{} {}: {}",
                    program,
                    exit_description(output.status),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn source_error(file: &Path, message: impl Into<String>) -> MigrateError {
    MigrateError::source(file.display().to_string(), message)
}

fn exit_description(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exited with status {}", code),
        None => "was terminated by a signal".to_string(),
    }
}

async fn ensure_readable(file: &Path) -> Result<()> {
    let meta = tokio::fs::metadata(file)
        .await
        .map_err(|e| source_error(file, format!("cannot open: {}", e)))?;
    if !meta.is_file() {
        return Err(source_error(file, "not a regular file"));
    }
    Ok(())
}

fn table_names(listing: &str) -> impl Iterator<Item = &str> {
    listing.lines().map(str::trim).filter(|l| !l.is_empty())
}

#[async_trait]
impl SourceReader for MdbToolsReader {
    async fn list_tables(&self, file: &Path) -> Result<Vec<Table>> {
        ensure_readable(file).await?;

        let user = self
            .output(file, "mdb-tables", &[OsStr::new("-1"), file.as_os_str()])
            .await?;
        let all = self
            .output(file, "mdb-tables", &[OsStr::new("-1"), OsStr::new("-S"), file.as_os_str()])
            .await?;
        let ddl = self
            .output(
                file,
                "mdb-schema",
                &[
                    OsStr::new("--no-indexes"),
                    OsStr::new("--no-relations"),
                    file.as_os_str(),
                    OsStr::new("access"),
                ],
            )
            .await?;

        let user: HashSet<&str> = table_names(&user).collect();
        let mut columns = parse_schema(&ddl);

        let mut tables = Vec::new();
        for name in table_names(&all) {
            if !user.contains(name) {
                tables.push(Table::system(name));
                continue;
            }
            let cols = columns
                .remove(name)
                .ok_or_else(|| source_error(file, format!("no schema for table {}", name)))?;
            tables.push(Table::new(name, cols));
        }

        debug!(
            "{}: {} tables ({} user)",
            file.display(),
            tables.len(),
            user.len()
        );
        Ok(tables)
    }

    async fn read_rows(&self, file: &Path, table: &Table) -> Result<Box<dyn RowStream>> {
        ensure_readable(file).await?;

        let mut child = self
            .command("mdb-json")
            .args(["-D", DATE_FORMAT, "-T", DATETIME_FORMAT])
            .arg(file)
            .arg(&table.name)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| source_error(file, format!("running mdb-json: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| source_error(file, "mdb-json stdout unavailable"))?;
        let stderr = child.stderr.take().map(|mut pipe| {
            tokio::spawn(async move {
                let mut buf = String::new();
                // Diagnostics only; a read failure leaves them empty
                let _ = pipe.read_to_string(&mut buf).await;
                buf
            })
        });

        Ok(Box::new(JsonRows {
            file: file.to_path_buf(),
            table: table.clone(),
            child,
            lines: BufReader::new(stdout).lines(),
            stderr,
            line: 0,
            done: false,
        }))
    }
}

/// Rows of one table, decoded from `mdb-json` output.
struct JsonRows {
    file: PathBuf,
    table: Table,
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
    stderr: Option<JoinHandle<String>>,
    line: u64,
    done: bool,
}

impl JsonRows {
    fn error(&self, message: impl std::fmt::Display) -> MigrateError {
        source_error(&self.file, format!("table {}: {}", self.table.name, message))
    }

    async fn finish(&mut self) -> Result<()> {
        self.done = true;
        let status = self.child.wait().await.map_err(|e| self.error(e))?;
        if status.success() {
            return Ok(());
        }
        let stderr = match self.stderr.take() {
            Some(handle) => handle.await.unwrap_or_default(),
            None => String::new(),
        };
        Err(self.error(format!(
            "mdb-json {}: {}",
            exit_description(status),
            stderr.trim()
        )))
    }
}

#[async_trait]
impl RowStream for JsonRows {
    async fn next_row(&mut self) -> Result<Option<Row>> {
        if self.done {
            return Ok(None);
        }
        loop {
            let line = self.lines.next_line().await.map_err(|e| self.error(e))?;
            let Some(line) = line else {
                self.finish().await?;
                return Ok(None);
            };
            self.line += 1;
            if line.trim().is_empty() {
                continue;
            }

            let object: Map<String, Value> = serde_json::from_str(&line)
                .map_err(|e| self.error(format!("line {}: {}", self.line, e)))?;
            let row = self
                .table
                .columns
                .iter()
                .map(|col| value_from_json(col.data_type, object.get(&col.name)))
                .collect::<std::result::Result<Row, String>>()
                .map_err(|e| self.error(format!("line {}: {}", self.line, e)))?;
            return Ok(Some(row));
        }
    }
}

/// Parse `mdb-schema ... access` output into columns per table.
///
/// ```text
/// CREATE TABLE [Customers]
///  (
///     [ID]            Long Integer,
///     [Name]          Text (100) NOT NULL,
///     [Photo]         OLE
/// );
/// ```
fn parse_schema(ddl: &str) -> HashMap<String, Vec<Column>> {
    let mut tables = HashMap::new();
    let mut current: Option<(String, Vec<Column>)> = None;

    for line in ddl.lines().map(str::trim) {
        if let Some(rest) = line.strip_prefix("CREATE TABLE ") {
            if let Some((name, cols)) = current.take() {
                tables.insert(name, cols);
            }
            current = Some((unbracket(rest).to_string(), Vec::new()));
            continue;
        }

        if line.starts_with(");") {
            if let Some((name, cols)) = current.take() {
                tables.insert(name, cols);
            }
            continue;
        }

        let (Some((_, cols)), Some(rest)) = (current.as_mut(), line.strip_prefix('[')) else {
            continue;
        };
        if let Some((name, type_part)) = rest.split_once(']') {
            cols.push(Column::new(name, LegacyType::from_access_name(access_type(type_part))));
        }
    }

    if let Some((name, cols)) = current {
        tables.insert(name, cols);
    }
    tables
}

fn unbracket(name: &str) -> &str {
    let name = name.trim();
    name.strip_prefix('[')
        .and_then(|n| n.strip_suffix(']'))
        .unwrap_or(name)
}

/// Reduce `Text (100) NOT NULL,` to `Text`.
fn access_type(raw: &str) -> &str {
    let mut label = raw.trim().trim_end_matches(',').trim_end();
    if let Some(stripped) = label.strip_suffix("NOT NULL") {
        label = stripped.trim_end();
    }
    if label.ends_with(')') {
        if let Some(open) = label.rfind('(') {
            label = label[..open].trim_end();
        }
    }
    label
}

/// Convert one JSON field into a value of the column's legacy type.
fn value_from_json(
    data_type: LegacyType,
    value: Option<&Value>,
) -> std::result::Result<SqlValue, String> {
    let value = match value {
        None | Some(Value::Null) => return Ok(SqlValue::Null(data_type)),
        Some(v) => v,
    };
    let mismatch = || format!("cannot read {} as {}", value, data_type);

    let converted = match data_type {
        LegacyType::Bool => match value {
            Value::Bool(b) => SqlValue::Bool(*b),
            Value::Number(n) => SqlValue::Bool(n.as_f64().ok_or_else(mismatch)? != 0.0),
            Value::String(s) => match s.as_str() {
                "1" | "true" | "TRUE" => SqlValue::Bool(true),
                "0" | "false" | "FALSE" => SqlValue::Bool(false),
                _ => return Err(mismatch()),
            },
            _ => return Err(mismatch()),
        },
        LegacyType::Byte => SqlValue::Byte(
            integer(value)
                .and_then(|n| u8::try_from(n).ok())
                .ok_or_else(mismatch)?,
        ),
        LegacyType::Int => SqlValue::Int(
            integer(value)
                .and_then(|n| i16::try_from(n).ok())
                .ok_or_else(mismatch)?,
        ),
        LegacyType::LongInt => SqlValue::LongInt(
            integer(value)
                .and_then(|n| i32::try_from(n).ok())
                .ok_or_else(mismatch)?,
        ),
        LegacyType::Money => SqlValue::Money(decimal(value).ok_or_else(mismatch)?),
        LegacyType::Numeric => SqlValue::Numeric(decimal(value).ok_or_else(mismatch)?),
        LegacyType::Float => SqlValue::Float(float(value).ok_or_else(mismatch)? as f32),
        LegacyType::Double => SqlValue::Double(float(value).ok_or_else(mismatch)?),
        LegacyType::DateTime => {
            let s = value.as_str().ok_or_else(mismatch)?;
            SqlValue::DateTime(datetime(s).ok_or_else(mismatch)?)
        }
        LegacyType::Binary => SqlValue::Binary(text(value).into_bytes()),
        LegacyType::LongBinary => SqlValue::LongBinary(text(value).into_bytes()),
        LegacyType::Text => SqlValue::Text(text(value)),
        LegacyType::LongText => SqlValue::LongText(text(value)),
        LegacyType::Guid => {
            let s = value.as_str().ok_or_else(mismatch)?;
            let s = s.trim().trim_start_matches('{').trim_end_matches('}');
            SqlValue::Guid(Uuid::parse_str(s).map_err(|_| mismatch())?)
        }
        LegacyType::Unknown(_) => SqlValue::Unknown(text(value)),
    };
    Ok(converted)
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn decimal(value: &Value) -> Option<Decimal> {
    let s = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&s)
        .or_else(|_| Decimal::from_scientific(&s))
        .ok()
}

fn datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
