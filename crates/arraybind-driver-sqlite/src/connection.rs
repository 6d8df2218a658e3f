//! SQLite connection implementation

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use arraybind_core::{
    ArrayBindCommand, ArrayBinder, ArraybindError, ColumnMeta, Connection, QueryResult, Result,
    Row, StatementResult, Transaction, Value,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{
    Connection as RusqliteConnection, ErrorCode, InterruptHandle, OpenFlags, params_from_iter,
};

/// rusqlite's busy timeout, restored after a budgeted array bind
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const ARRAY_SAVEPOINT: &str = "arraybind_array";

/// SQLite connection wrapper
pub struct SqliteConnection {
    conn: Arc<Mutex<RusqliteConnection>>,
    interrupt_handle: Arc<InterruptHandle>,
    closed: Arc<AtomicBool>,
}

impl SqliteConnection {
    /// Open a SQLite database
    pub fn open(path: &str) -> Result<Self> {
        tracing::info!(path = %path, "opening SQLite database");
        let expanded_path = Self::expand_path(path)?;

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = if path == ":memory:" {
            RusqliteConnection::open_in_memory().map_err(|e| {
                ArraybindError::Connection(format!("Failed to open in-memory database: {}", e))
            })?
        } else {
            if !expanded_path.starts_with("file:") {
                let file_path = std::path::Path::new(&expanded_path);
                if let Some(parent) = file_path.parent()
                    && !parent.exists()
                {
                    return Err(ArraybindError::Connection(format!(
                        "Parent directory does not exist: {}",
                        parent.display()
                    )));
                }
            }

            RusqliteConnection::open_with_flags(&expanded_path, flags).map_err(|e| {
                ArraybindError::Connection(format!(
                    "Failed to open SQLite database at '{}': {}",
                    expanded_path, e
                ))
            })?
        };

        conn.pragma_update(None, "foreign_keys", "ON").map_err(|e| {
            ArraybindError::Connection(format!("Failed to enable foreign keys: {}", e))
        })?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| ArraybindError::Connection(format!("Failed to set journal mode: {}", e)))?;
        conn.pragma_update(None, "synchronous", "NORMAL").map_err(|e| {
            ArraybindError::Connection(format!("Failed to set synchronous mode: {}", e))
        })?;

        // Usable from any thread to cancel a running statement
        let interrupt_handle = Arc::new(conn.get_interrupt_handle());

        tracing::info!(path = %expanded_path, "SQLite database connection established");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            interrupt_handle,
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Expand `~/` and make relative paths absolute
    fn expand_path(path: &str) -> Result<String> {
        if path == ":memory:" || path.starts_with("file:") {
            return Ok(path.to_string());
        }

        let expanded = if let Some(rest) = path.strip_prefix("~/") {
            match std::env::var_os("HOME") {
                Some(home) => std::path::PathBuf::from(home)
                    .join(rest)
                    .to_string_lossy()
                    .to_string(),
                None => {
                    return Err(ArraybindError::Configuration(
                        "Unable to determine HOME directory".into(),
                    ));
                }
            }
        } else if path.starts_with('~') {
            return Err(ArraybindError::Configuration(
                "User-specific home directories (~user) are not supported".into(),
            ));
        } else {
            path.to_string()
        };

        let path_buf = std::path::PathBuf::from(&expanded);
        if path_buf.is_relative() {
            Ok(std::env::current_dir()?
                .join(path_buf)
                .to_string_lossy()
                .to_string())
        } else {
            Ok(expanded)
        }
    }

    /// Run a script of several statements without parameters
    pub async fn execute_batch(&self, sql: &str) -> Result<()> {
        self.ensure_open()?;
        tracing::debug!("executing SQL batch");
        let conn = self.conn.lock();
        conn.execute_batch(sql)
            .map_err(|e| ArraybindError::Query(format!("Failed to execute batch: {}", e)))
    }

    fn ensure_open(&self) -> Result<()> {
        ensure_open(&self.closed)
    }
}

fn ensure_open(closed: &AtomicBool) -> Result<()> {
    if closed.load(Ordering::Acquire) {
        return Err(ArraybindError::Connection("Connection is closed".into()));
    }
    Ok(())
}

#[async_trait]
impl ArrayBinder for SqliteConnection {
    #[tracing::instrument(skip(self, command), fields(sql_preview = %command.sql().chars().take(100).collect::<String>(), rows = command.bind_count()))]
    async fn execute_array(&self, command: &ArrayBindCommand) -> Result<StatementResult> {
        self.ensure_open()?;
        execute_array_blocking(&self.conn, &self.interrupt_handle, command).await
    }
}

#[async_trait]
impl Connection for SqliteConnection {
    fn driver_name(&self) -> &str {
        "sqlite"
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        self.ensure_open()?;
        let conn = self.conn.lock();
        run_execute(&conn, sql, params)
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.ensure_open()?;
        let conn = self.conn.lock();
        run_query(&conn, sql, params)
    }

    async fn begin_transaction(&self) -> Result<Box<dyn Transaction>> {
        self.ensure_open()?;
        tracing::debug!("beginning SQLite transaction");
        {
            let conn = self.conn.lock();
            // DEFERRED takes the write lock on the first write.
            conn.execute_batch("BEGIN DEFERRED").map_err(|e| {
                ArraybindError::Query(format!("Failed to begin transaction: {}", e))
            })?;
        }
        tracing::debug!("SQLite transaction started");
        Ok(Box::new(SqliteTransaction {
            conn: Arc::clone(&self.conn),
            interrupt_handle: Arc::clone(&self.interrupt_handle),
            closed: Arc::clone(&self.closed),
            committed: false,
            rolled_back: false,
        }))
    }

    async fn close(&self) -> Result<()> {
        tracing::info!("closing SQLite connection");
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// SQLite transaction wrapper.
///
/// Issues raw `BEGIN DEFERRED` / `COMMIT` / `ROLLBACK` so it can share the
/// connection mutex with its parent.
pub struct SqliteTransaction {
    conn: Arc<Mutex<RusqliteConnection>>,
    interrupt_handle: Arc<InterruptHandle>,
    closed: Arc<AtomicBool>,
    committed: bool,
    rolled_back: bool,
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        if !self.committed && !self.rolled_back {
            tracing::warn!(
                "SQLite transaction dropped without commit or rollback, issuing automatic rollback"
            );
            let conn = self.conn.lock();
            if let Err(e) = conn.execute_batch("ROLLBACK") {
                tracing::error!(error = %e, "automatic rollback on drop failed");
            }
        }
    }
}

#[async_trait]
impl ArrayBinder for SqliteTransaction {
    async fn execute_array(&self, command: &ArrayBindCommand) -> Result<StatementResult> {
        tracing::debug!(
            sql_preview = %command.sql().chars().take(100).collect::<String>(),
            rows = command.bind_count(),
            "executing array bind in SQLite transaction"
        );
        ensure_open(&self.closed)?;
        execute_array_blocking(&self.conn, &self.interrupt_handle, command).await
    }
}

#[async_trait]
impl Transaction for SqliteTransaction {
    async fn commit(mut self: Box<Self>) -> Result<()> {
        tracing::debug!("committing SQLite transaction");

        if self.rolled_back {
            return Err(ArraybindError::Query("Transaction already rolled back".into()));
        }
        if self.committed {
            return Err(ArraybindError::Query("Transaction already committed".into()));
        }
        ensure_open(&self.closed)?;

        {
            let conn = self.conn.lock();
            conn.execute_batch("COMMIT").map_err(|e| {
                ArraybindError::Query(format!("Failed to commit transaction: {}", e))
            })?;
        }

        self.committed = true;
        tracing::debug!("SQLite transaction committed successfully");
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<()> {
        tracing::debug!("rolling back SQLite transaction");

        if self.committed {
            return Err(ArraybindError::Query("Transaction already committed".into()));
        }
        if self.rolled_back {
            return Ok(());
        }

        {
            let conn = self.conn.lock();
            conn.execute_batch("ROLLBACK").map_err(|e| {
                ArraybindError::Query(format!("Failed to rollback transaction: {}", e))
            })?;
        }

        self.rolled_back = true;
        tracing::debug!("SQLite transaction rolled back successfully");
        Ok(())
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        tracing::debug!(sql_preview = %sql.chars().take(100).collect::<String>(), "executing query in SQLite transaction");
        ensure_open(&self.closed)?;
        let conn = self.conn.lock();
        run_query(&conn, sql, params)
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        tracing::debug!(sql_preview = %sql.chars().take(100).collect::<String>(), "executing statement in SQLite transaction");
        ensure_open(&self.closed)?;
        let conn = self.conn.lock();
        run_execute(&conn, sql, params)
    }
}

fn run_execute(conn: &RusqliteConnection, sql: &str, params: &[Value]) -> Result<StatementResult> {
    let start_time = Instant::now();
    let rusqlite_params = values_to_rusqlite(params);

    let rows_affected = conn
        .execute(sql, params_from_iter(rusqlite_params.iter()))
        .map_err(|e| ArraybindError::Query(format!("Failed to execute statement: {}", e)))?;

    tracing::debug!(affected_rows = rows_affected, "statement executed");
    Ok(StatementResult {
        affected_rows: rows_affected as u64,
        execution_time_ms: start_time.elapsed().as_millis() as u64,
    })
}

fn run_query(conn: &RusqliteConnection, sql: &str, params: &[Value]) -> Result<QueryResult> {
    let start_time = Instant::now();
    let rusqlite_params = values_to_rusqlite(params);

    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| ArraybindError::Query(format!("Failed to prepare query: {}", e)))?;

    let mut column_names: Vec<String> = Vec::with_capacity(stmt.column_count());
    let mut columns: Vec<ColumnMeta> = Vec::with_capacity(stmt.column_count());
    for (idx, col) in stmt.columns().iter().enumerate() {
        let name = col.name().to_string();
        // Declared type from CREATE TABLE, when the column maps to one
        let data_type = col.decl_type().unwrap_or("DYNAMIC").to_string();
        column_names.push(name.clone());
        columns.push(ColumnMeta {
            name,
            data_type,
            nullable: true,
            ordinal: idx,
        });
    }

    let mut rows = Vec::new();
    let mut query_rows = stmt
        .query(params_from_iter(rusqlite_params.iter()))
        .map_err(|e| ArraybindError::Query(format!("Failed to execute query: {}", e)))?;

    while let Some(row) = query_rows
        .next()
        .map_err(|e| ArraybindError::Query(format!("Failed to fetch row: {}", e)))?
    {
        let mut values = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            values.push(rusqlite_to_value(row, i)?);
        }
        rows.push(Row::new(column_names.clone(), values));
    }

    let execution_time_ms = start_time.elapsed().as_millis() as u64;
    tracing::debug!(
        row_count = rows.len(),
        execution_time_ms = execution_time_ms,
        "query executed successfully"
    );
    Ok(QueryResult {
        id: uuid::Uuid::new_v4(),
        columns,
        rows,
        affected_rows: 0,
        execution_time_ms,
    })
}

/// Interrupts the statement in flight if the caller stops waiting for it.
struct InterruptOnDrop<'a> {
    handle: &'a InterruptHandle,
    armed: bool,
}

impl Drop for InterruptOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!("array bind abandoned, interrupting SQLite");
            self.handle.interrupt();
        }
    }
}

/// Runs the array bind on the blocking pool so a locked database cannot stall
/// the runtime. When the command carries a timeout the statement is
/// interrupted once it elapses.
async fn execute_array_blocking(
    conn: &Arc<Mutex<RusqliteConnection>>,
    interrupt_handle: &InterruptHandle,
    command: &ArrayBindCommand,
) -> Result<StatementResult> {
    let conn = Arc::clone(conn);
    let owned = command.clone();
    let mut task = tokio::task::spawn_blocking(move || {
        let conn = conn.lock();
        run_array(&conn, &owned)
    });
    let mut guard = InterruptOnDrop {
        handle: interrupt_handle,
        armed: true,
    };

    let joined = match command.timeout() {
        Some(limit) => match tokio::time::timeout(limit, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                interrupt_handle.interrupt();
                // Wait for the savepoint to be rolled back before reporting.
                let late = (&mut task).await;
                guard.armed = false;
                return match late {
                    Ok(Ok(result)) => Ok(result),
                    _ => Err(ArraybindError::Timeout(format!(
                        "array execution exceeded {:?}",
                        limit
                    ))),
                };
            }
        },
        None => task.await,
    };
    guard.armed = false;

    joined.map_err(|e| ArraybindError::Driver(format!("Array bind task failed: {}", e)))?
}

/// Runs an array-bind command as one prepared statement stepped once per row.
///
/// Placeholders are rewritten to `?1..?N` by occurrence so repeated names stay
/// separate parameters. All rows run inside one savepoint: either every row is
/// applied or none is.
fn run_array(conn: &RusqliteConnection, command: &ArrayBindCommand) -> Result<StatementResult> {
    let start_time = Instant::now();

    if let Some(limit) = command.timeout() {
        conn.busy_timeout(limit)
            .map_err(|e| ArraybindError::Driver(format!("Failed to set busy timeout: {}", e)))?;
    }

    let outcome = run_array_in_savepoint(conn, command, start_time);

    if command.timeout().is_some()
        && let Err(e) = conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)
    {
        tracing::warn!(error = %e, "failed to restore busy timeout");
    }

    let affected_rows = outcome?;
    let execution_time_ms = start_time.elapsed().as_millis() as u64;
    tracing::debug!(
        rows = command.bind_count(),
        affected_rows,
        execution_time_ms,
        "array bind executed"
    );
    Ok(StatementResult {
        affected_rows,
        execution_time_ms,
    })
}

fn run_array_in_savepoint(
    conn: &RusqliteConnection,
    command: &ArrayBindCommand,
    start_time: Instant,
) -> Result<u64> {
    conn.execute_batch(&format!("SAVEPOINT {}", ARRAY_SAVEPOINT))
        .map_err(|e| ArraybindError::Query(format!("Failed to open array savepoint: {}", e)))?;

    let outcome = step_rows(conn, command, start_time).and_then(|affected| {
        conn.execute_batch(&format!("RELEASE {}", ARRAY_SAVEPOINT))
            .map(|_| affected)
            .map_err(|e| {
                ArraybindError::Query(format!("Failed to release array savepoint: {}", e))
            })
    });

    if outcome.is_err() {
        let undo = format!(
            "ROLLBACK TO {savepoint}; RELEASE {savepoint}",
            savepoint = ARRAY_SAVEPOINT
        );
        if let Err(e) = conn.execute_batch(&undo) {
            tracing::warn!(error = %e, "failed to roll back array savepoint");
        }
    }
    outcome
}

fn step_rows(
    conn: &RusqliteConnection,
    command: &ArrayBindCommand,
    start_time: Instant,
) -> Result<u64> {
    let sql = command.positional_sql(|ordinal| format!("?{}", ordinal + 1));
    let timed_out = |row: usize| {
        ArraybindError::Timeout(format!(
            "array execution exceeded {:?} after {} of {} rows",
            command.timeout().unwrap_or_default(),
            row,
            command.bind_count()
        ))
    };
    let past_deadline = || {
        command
            .timeout()
            .is_some_and(|limit| start_time.elapsed() >= limit)
    };

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| ArraybindError::Query(format!("Failed to prepare array statement: {}", e)))?;

    if stmt.parameter_count() != command.arrays().len() {
        return Err(ArraybindError::Bind(format!(
            "statement expects {} parameters but {} arrays were bound",
            stmt.parameter_count(),
            command.arrays().len()
        )));
    }

    let mut affected_rows = 0u64;
    for row in 0..command.bind_count() {
        if past_deadline() {
            return Err(timed_out(row));
        }

        for (idx, cell) in command.row(row).enumerate() {
            let value = cell.map_or(rusqlite::types::Value::Null, value_to_rusqlite);
            stmt.raw_bind_parameter(idx + 1, value).map_err(|e| {
                ArraybindError::Bind(format!(
                    "Failed to bind parameter {} of row {}: {}",
                    idx + 1,
                    row,
                    e
                ))
            })?;
        }

        match stmt.raw_execute() {
            Ok(changed) => affected_rows += changed as u64,
            Err(e) if e.sqlite_error_code() == Some(ErrorCode::OperationInterrupted) => {
                return Err(timed_out(row));
            }
            Err(e)
                if e.sqlite_error_code() == Some(ErrorCode::DatabaseBusy) && past_deadline() =>
            {
                return Err(timed_out(row));
            }
            Err(e) => {
                return Err(ArraybindError::Query(format!(
                    "Failed to execute array row {}: {}",
                    row, e
                )));
            }
        }
    }
    Ok(affected_rows)
}

/// Convert our Value types to rusqlite-compatible types
fn values_to_rusqlite(values: &[Value]) -> Vec<rusqlite::types::Value> {
    values.iter().map(value_to_rusqlite).collect()
}

pub(crate) fn value_to_rusqlite(value: &Value) -> rusqlite::types::Value {
    use rusqlite::types::Value as SqlValue;

    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Int8(i) => SqlValue::Integer(*i as i64),
        Value::Int16(i) => SqlValue::Integer(*i as i64),
        Value::Int32(i) => SqlValue::Integer(*i as i64),
        Value::Int64(i) => SqlValue::Integer(*i),
        Value::UInt8(i) => SqlValue::Integer(*i as i64),
        Value::UInt16(i) => SqlValue::Integer(*i as i64),
        Value::UInt32(i) => SqlValue::Integer(*i as i64),
        // SQLite integers are signed 64-bit
        Value::UInt64(i) => match i64::try_from(*i) {
            Ok(v) => SqlValue::Integer(v),
            Err(_) => SqlValue::Text(i.to_string()),
        },
        Value::Float32(f) => SqlValue::Real(*f as f64),
        Value::Float64(f) => SqlValue::Real(*f),
        Value::Decimal(d) => SqlValue::Text(d.clone()),
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Bytes(b) => SqlValue::Blob(b.clone()),
        Value::Date(d) => SqlValue::Text(d.to_string()),
        Value::DateTime(dt) => SqlValue::Text(dt.to_string()),
        Value::DateTimeUtc(dt) => SqlValue::Text(dt.to_rfc3339()),
        Value::Json(j) => SqlValue::Text(j.to_string()),
        Value::Uuid(u) => SqlValue::Text(u.to_string()),
    }
}

/// Convert rusqlite row value to our Value type
fn rusqlite_to_value(row: &rusqlite::Row, idx: usize) -> Result<Value> {
    use rusqlite::types::ValueRef;

    let value_ref = row
        .get_ref(idx)
        .map_err(|e| ArraybindError::Query(e.to_string()))?;

    let value = match value_ref {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int64(i),
        ValueRef::Real(f) => Value::Float64(f),
        ValueRef::Text(s) => Value::String(String::from_utf8_lossy(s).to_string()),
        // Untyped columns may hold text as a blob
        ValueRef::Blob(b) => match std::str::from_utf8(b) {
            Ok(s) => Value::String(s.to_string()),
            Err(_) => Value::Bytes(b.to_vec()),
        },
    };

    Ok(value)
}
