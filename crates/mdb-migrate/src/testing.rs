//! In-memory source and destination used by the engine's unit tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::{CopyOptions, Destination, TransactionScope};
use crate::core::schema::{Row, Table};
use crate::core::traits::{RowStream, SourceReader, TargetWriter};
use crate::core::value::SqlValue;
use crate::encoding::EncodingSpec;
use crate::error::{MigrateError, Result};

/// Options for an in-memory run over `files`.
pub fn options(scope: TransactionScope, files: &[&str]) -> CopyOptions {
    CopyOptions {
        destination: Destination::parse("sqlite3:///tmp/memory.db").unwrap(),
        files: files.iter().map(PathBuf::from).collect(),
        transaction: scope,
        encoding: EncodingSpec::default(),
        check_table: false,
        log_query: false,
        tools_dir: None,
    }
}

/// First double-quoted identifier in a generated statement.
fn table_of(sql: &str) -> String {
    sql.split('"').nth(1).unwrap_or_default().to_string()
}

/// Writer activity, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Begin,
    Commit,
    Rollback,
    Execute(String),
    Prepare(String),
    Insert(String),
}

/// Observable state of a [`MemoryWriter`].
#[derive(Debug, Default)]
pub struct WriterState {
    pub events: Vec<Event>,
    /// Rows visible after commit, by table.
    pub committed: BTreeMap<String, Vec<Row>>,
    /// Rows written by the open transaction, by table.
    pub pending: BTreeMap<String, Vec<Row>>,
    /// Tables created by committed transactions.
    pub tables: Vec<String>,
    pending_tables: Vec<String>,
    in_tx: bool,
    fail_ddl: Option<String>,
    fail_insert: Option<(String, u64)>,
    commit_interrupt: Option<CancellationToken>,
    inserts: HashMap<String, u64>,
}

impl WriterState {
    /// Committed rows of `table`, or none.
    pub fn committed_rows(&self, table: &str) -> usize {
        self.committed.get(table).map_or(0, Vec::len)
    }

    pub fn count(&self, event: &Event) -> usize {
        self.events.iter().filter(|e| *e == event).count()
    }
}

/// Destination that keeps committed and pending rows in memory.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    state: Arc<Mutex<WriterState>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle for inspecting the writer after it has been moved.
    pub fn state(&self) -> Arc<Mutex<WriterState>> {
        Arc::clone(&self.state)
    }

    /// Fail the CREATE TABLE of `table`.
    pub fn fail_ddl(self, table: &str) -> Self {
        self.state.lock().unwrap().fail_ddl = Some(table.to_string());
        self
    }

    /// Cancel `token` while a commit is in flight, then let the commit finish.
    pub fn interrupt_commit(self, token: &CancellationToken) -> Self {
        self.state.lock().unwrap().commit_interrupt = Some(token.clone());
        self
    }

    /// Fail the `nth` insert (1-based) into `table`.
    pub fn fail_insert(self, table: &str, nth: u64) -> Self {
        self.state.lock().unwrap().fail_insert = Some((table.to_string(), nth));
        self
    }
}

fn require_tx(state: &WriterState) -> Result<()> {
    if state.in_tx {
        Ok(())
    } else {
        Err(MigrateError::Transaction("no open transaction".into()))
    }
}

#[async_trait]
impl TargetWriter for MemoryWriter {
    fn in_transaction(&self) -> bool {
        self.state.lock().unwrap().in_tx
    }

    async fn begin(&mut self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.in_tx {
            return Err(MigrateError::Transaction(
                "a transaction is already open".into(),
            ));
        }
        state.in_tx = true;
        state.events.push(Event::Begin);
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let interrupt = self.state.lock().unwrap().commit_interrupt.take();
        if let Some(token) = interrupt {
            token.cancel();
            tokio::task::yield_now().await;
        }

        let mut state = self.state.lock().unwrap();
        require_tx(&state)?;
        state.in_tx = false;
        state.events.push(Event::Commit);
        let pending = std::mem::take(&mut state.pending);
        for (table, rows) in pending {
            state.committed.entry(table).or_default().extend(rows);
        }
        let created = std::mem::take(&mut state.pending_tables);
        state.tables.extend(created);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        require_tx(&state)?;
        state.in_tx = false;
        state.events.push(Event::Rollback);
        state.pending.clear();
        state.pending_tables.clear();
        Ok(())
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        require_tx(&state)?;
        state.events.push(Event::Execute(sql.to_string()));
        let table = table_of(sql);
        if state.fail_ddl.as_deref() == Some(table.as_str()) {
            return Err(sqlx::Error::Protocol(format!("cannot create {}", table)).into());
        }
        state.pending_tables.push(table);
        Ok(0)
    }

    async fn prepare(&mut self, sql: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        require_tx(&state)?;
        state.events.push(Event::Prepare(sql.to_string()));
        Ok(())
    }

    async fn insert_row(&mut self, sql: &str, row: &[SqlValue]) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        require_tx(&state)?;
        let table = table_of(sql);
        state.events.push(Event::Insert(table.clone()));

        let seen = state.inserts.entry(table.clone()).or_insert(0);
        *seen += 1;
        let nth = *seen;
        if state.fail_insert.as_ref() == Some(&(table.clone(), nth)) {
            return Err(sqlx::Error::Protocol("constraint violation".into()).into());
        }

        state.pending.entry(table).or_default().push(row.to_vec());
        Ok(1)
    }

    fn db_type(&self) -> &str {
        "memory"
    }

    async fn close(&mut self) {}
}

/// Row stream over a fixed list, optionally failing after the last row.
pub struct VecRows {
    rows: VecDeque<Row>,
    error: Option<String>,
}

impl VecRows {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: rows.into(),
            error: None,
        }
    }

    /// Yield a source error once the rows are exhausted.
    pub fn then_fail(mut self, message: &str) -> Self {
        self.error = Some(message.to_string());
        self
    }
}

#[async_trait]
impl RowStream for VecRows {
    async fn next_row(&mut self) -> Result<Option<Row>> {
        match self.rows.pop_front() {
            Some(row) => Ok(Some(row)),
            None => match self.error.take() {
                Some(message) => Err(MigrateError::source("memory", message)),
                None => Ok(None),
            },
        }
    }
}

type RowHook = Arc<dyn Fn(&str, usize) + Send + Sync>;

/// Source backed by in-memory tables, keyed by file name.
#[derive(Default)]
pub struct MemorySource {
    files: HashMap<PathBuf, Vec<(Table, Vec<Row>)>>,
    failures: HashMap<(PathBuf, String), String>,
    opened: Arc<Mutex<Vec<PathBuf>>>,
    on_row: Option<RowHook>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file and its tables, in source order.
    pub fn file(mut self, name: &str, tables: Vec<(Table, Vec<Row>)>) -> Self {
        self.files.insert(PathBuf::from(name), tables);
        self
    }

    /// Make the row stream of `table` in `file` fail after its rows.
    pub fn fail_rows(mut self, file: &str, table: &str, message: &str) -> Self {
        self.failures
            .insert((PathBuf::from(file), table.to_string()), message.to_string());
        self
    }

    /// Call `hook(table, n)` as the `n`th row (1-based) of a table is produced.
    pub fn on_row(mut self, hook: impl Fn(&str, usize) + Send + Sync + 'static) -> Self {
        self.on_row = Some(Arc::new(hook));
        self
    }

    /// Files whose tables were listed, in order.
    pub fn opened(&self) -> Arc<Mutex<Vec<PathBuf>>> {
        Arc::clone(&self.opened)
    }
}

#[async_trait]
impl SourceReader for MemorySource {
    async fn list_tables(&self, file: &Path) -> Result<Vec<Table>> {
        self.opened.lock().unwrap().push(file.to_path_buf());
        let tables = self
            .files
            .get(file)
            .ok_or_else(|| MigrateError::source(file.display().to_string(), "no such file"))?;
        Ok(tables.iter().map(|(table, _)| table.clone()).collect())
    }

    async fn read_rows(&self, file: &Path, table: &Table) -> Result<Box<dyn RowStream>> {
        let rows = self
            .files
            .get(file)
            .and_then(|tables| tables.iter().find(|(t, _)| t.name == table.name))
            .map(|(_, rows)| rows.clone())
            .ok_or_else(|| MigrateError::source(file.display().to_string(), "no such table"))?;

        let mut stream = VecRows::new(rows);
        if let Some(message) = self.failures.get(&(file.to_path_buf(), table.name.clone())) {
            stream = stream.then_fail(message);
        }

        Ok(Box::new(HookedRows {
            inner: stream,
            table: table.name.clone(),
            produced: 0,
            hook: self.on_row.clone(),
        }))
    }
}

struct HookedRows {
    inner: VecRows,
    table: String,
    produced: usize,
    hook: Option<RowHook>,
}

#[async_trait]
impl RowStream for HookedRows {
    async fn next_row(&mut self) -> Result<Option<Row>> {
        let row = self.inner.next_row().await?;
        if row.is_some() {
            self.produced += 1;
            if let Some(hook) = &self.hook {
                hook(&self.table, self.produced);
            }
        }
        Ok(row)
    }
}
