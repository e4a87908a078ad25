//! SQLite backing store
//!
//! ## Layout
//!
//! One database file holds every named set. Each set is a table
//! `"set_<hex of name>" (k BLOB NOT NULL UNIQUE, v BLOB NOT NULL)`. SQLite
//! compares identifiers without ASCII case, so the raw name is never used
//! as one. Keys and payloads are always bound parameters.
//!
//! ## Connections
//!
//! - One writer connection behind a mutex. Every write runs in a
//!   `BEGIN IMMEDIATE` transaction.
//! - A pool of reader connections, opened on demand and returned after use.
//!
//! ## Cancellation
//!
//! While a connection is in use, a progress handler polls the caller's
//! `CancelToken` every `progress_interval` VM steps. A fired token makes
//! SQLite abort the statement with `SQLITE_INTERRUPT`, reported as
//! `Error::Cancelled`.

use std::fs;
use std::io;
use std::os::raw::c_int;
use std::path::{Path, PathBuf};

use bigset_core::{CancelToken, Error, Result, SetBackend, SetName, SetTxn, WritePolicy};
use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use tempfile::TempPath;
use tracing::{debug, info};

use crate::config::{StoreConfig, MAX_PAGE_SIZE};

/// Statements kept prepared per connection
const STATEMENT_CACHE_CAPACITY: usize = 64;

/// Where the database file lives and whether it outlives the store
#[derive(Debug)]
pub enum BackingFile {
    /// Caller-chosen path; never deleted
    Persistent(PathBuf),
    /// Temporary file; deleted on close or drop
    Ephemeral(TempPath),
}

impl BackingFile {
    /// A persistent file at `path`
    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        BackingFile::Persistent(path.into())
    }

    /// A fresh temporary file in the system temp directory
    pub fn ephemeral() -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("bigset")
            .suffix(".sqlite")
            .tempfile()?;
        Ok(BackingFile::Ephemeral(file.into_temp_path()))
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        match self {
            BackingFile::Persistent(path) => path,
            BackingFile::Ephemeral(temp) => &**temp,
        }
    }

    /// Whether the file survives close
    pub fn is_persistent(&self) -> bool {
        matches!(self, BackingFile::Persistent(_))
    }

    /// Delete the file if it is ephemeral
    fn release(self) -> Result<()> {
        match self {
            BackingFile::Persistent(_) => Ok(()),
            BackingFile::Ephemeral(temp) => {
                let path = temp.to_path_buf();
                temp.close()?;
                // WAL sidecars are normally removed by the last connection
                for suffix in ["-wal", "-shm"] {
                    let mut sidecar = path.clone().into_os_string();
                    sidecar.push(suffix);
                    match fs::remove_file(&sidecar) {
                        Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e.into()),
                        _ => {}
                    }
                }
                Ok(())
            }
        }
    }
}

/// Attach call context to rusqlite errors
trait StorageContext<T> {
    fn storage_context<C, F>(self, context: F) -> Result<T>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T> StorageContext<T> for rusqlite::Result<T> {
    fn storage_context<C, F>(self, context: F) -> Result<T>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|e| map_sqlite_error(e, context().into()))
    }
}

fn map_sqlite_error(e: rusqlite::Error, context: String) -> Error {
    if let rusqlite::Error::SqliteFailure(ref failure, _) = e {
        if failure.code == ErrorCode::OperationInterrupted {
            return Error::Cancelled;
        }
    }
    Error::storage(context, e)
}

/// Poll `cancel` from inside running statements
fn arm(conn: &Connection, cancel: &CancelToken, interval: c_int) {
    let token = cancel.clone();
    conn.progress_handler(interval, Some(move || token.should_cancel()));
}

fn disarm(conn: &Connection) {
    conn.progress_handler(0, None::<fn() -> bool>);
}

fn open_connection(path: &Path, config: &StoreConfig) -> Result<Connection> {
    let conn = Connection::open(path)
        .storage_context(|| format!("open '{}'", path.display()))?;
    conn.busy_timeout(config.busy_timeout())
        .storage_context(|| "set busy timeout")?;
    let mode: String = conn
        .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
        .storage_context(|| "set journal_mode")?;
    if !mode.eq_ignore_ascii_case("wal") {
        debug!(target: "bigset::storage", journal_mode = %mode, "WAL journal mode unavailable");
    }
    conn.pragma_update(None, "synchronous", config.synchronous_mode()?.as_pragma())
        .storage_context(|| "set synchronous")?;
    conn.set_prepared_statement_cache_capacity(STATEMENT_CACHE_CAPACITY);
    Ok(conn)
}

fn table_exists_on(conn: &Connection, name: &SetName) -> Result<bool> {
    let found = conn
        .prepare_cached("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")
        .and_then(|mut stmt| stmt.query_row([name.table_name()], |_| Ok(())).optional())
        .storage_context(|| format!("look up table of '{}'", name))?;
    Ok(found.is_some())
}

/// SQLite implementation of the backing-store contract
///
/// # Example
///
/// ```ignore
/// use bigset_storage::{BackingFile, SqliteBackend, StoreConfig};
///
/// let backend = SqliteBackend::open(BackingFile::ephemeral()?, StoreConfig::default())?;
/// ```
pub struct SqliteBackend {
    config: StoreConfig,
    writer: Mutex<Connection>,
    readers: Mutex<Vec<Connection>>,
    // Declared last: connections must be closed before an ephemeral file is removed.
    file: BackingFile,
}

impl SqliteBackend {
    /// Open (or create) the database file
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the file cannot be opened.
    pub fn open(file: BackingFile, config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let writer = open_connection(file.path(), &config)?;
        info!(
            target: "bigset::storage",
            path = %file.path().display(),
            persistent = file.is_persistent(),
            "Opened backing store"
        );
        Ok(Self {
            config,
            writer: Mutex::new(writer),
            readers: Mutex::new(Vec::new()),
            file,
        })
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Whether the file survives close
    pub fn is_persistent(&self) -> bool {
        self.file.is_persistent()
    }

    /// Active configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Close every connection and delete an ephemeral file
    pub fn close(self) -> Result<()> {
        let SqliteBackend {
            writer,
            readers,
            file,
            ..
        } = self;
        for conn in readers.into_inner() {
            conn.close()
                .map_err(|(_, e)| map_sqlite_error(e, "close reader".into()))?;
        }
        writer
            .into_inner()
            .close()
            .map_err(|(_, e)| map_sqlite_error(e, "close writer".into()))?;
        let path = file.path().to_path_buf();
        let persistent = file.is_persistent();
        file.release()?;
        info!(
            target: "bigset::storage",
            path = %path.display(),
            persistent,
            "Closed backing store"
        );
        Ok(())
    }

    fn progress_interval(&self) -> c_int {
        // validate() bounds it to i32::MAX
        self.config.progress_interval as c_int
    }

    /// Run `f` on a pooled reader connection
    fn with_reader<R>(
        &self,
        cancel: &CancelToken,
        f: impl FnOnce(&Connection) -> Result<R>,
    ) -> Result<R> {
        cancel.check()?;
        let pooled = self.readers.lock().pop();
        let conn = match pooled {
            Some(conn) => conn,
            None => open_connection(self.file.path(), &self.config)?,
        };
        arm(&conn, cancel, self.progress_interval());
        let result = f(&conn);
        disarm(&conn);
        self.readers.lock().push(conn);
        result
    }
}

impl SetBackend for SqliteBackend {
    fn write<R, F>(&self, cancel: &CancelToken, f: F) -> Result<R>
    where
        F: FnOnce(&mut dyn SetTxn) -> Result<R>,
    {
        cancel.check()?;
        let mut conn = self.writer.lock();
        run_write(&mut conn, cancel, self.progress_interval(), f)
    }

    fn table_exists(&self, cancel: &CancelToken, name: &SetName) -> Result<bool> {
        self.with_reader(cancel, |conn| table_exists_on(conn, name))
    }

    fn count(&self, cancel: &CancelToken, name: &SetName) -> Result<u64> {
        self.with_reader(cancel, |conn| {
            let sql = format!("SELECT COUNT(*) FROM {}", name.table_ident());
            let n: i64 = conn
                .query_row(&sql, [], |row| row.get(0))
                .storage_context(|| format!("count '{}'", name))?;
            Ok(n as u64)
        })
    }

    fn lookup(&self, cancel: &CancelToken, name: &SetName, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.with_reader(cancel, |conn| {
            let sql = format!("SELECT v FROM {} WHERE k = ?1", name.table_ident());
            conn.prepare_cached(&sql)
                .and_then(|mut stmt| stmt.query_row([key], |row| row.get(0)).optional())
                .storage_context(|| format!("lookup in '{}'", name))
        })
    }

    fn scan(
        &self,
        cancel: &CancelToken,
        name: &SetName,
        visit: &mut dyn FnMut(&[u8]) -> Result<()>,
    ) -> Result<u64> {
        self.with_reader(cancel, |conn| {
            let context = || format!("scan '{}'", name);
            let sql = format!("SELECT v FROM {}", name.table_ident());
            let mut stmt = conn.prepare(&sql).storage_context(context)?;
            let mut rows = stmt.query([]).storage_context(context)?;
            let mut visited = 0u64;
            while let Some(row) = rows.next().storage_context(context)? {
                let value = row.get_ref(0).storage_context(context)?;
                let payload = value.as_blob().map_err(|e| Error::storage(context(), e))?;
                visit(payload)?;
                visited += 1;
            }
            Ok(visited)
        })
    }

    fn scan_page(
        &self,
        cancel: &CancelToken,
        name: &SetName,
        after: i64,
        limit: usize,
    ) -> Result<Vec<(i64, Vec<u8>)>> {
        self.with_reader(cancel, |conn| {
            let context = || format!("page through '{}'", name);
            let sql = format!(
                "SELECT rowid, v FROM {} WHERE rowid > ?1 ORDER BY rowid LIMIT ?2",
                name.table_ident()
            );
            let bound = i64::try_from(limit).map_err(|_| {
                Error::invalid_config(format!("page limit {} is out of range", limit))
            })?;
            let mut stmt = conn.prepare_cached(&sql).storage_context(context)?;
            let rows = stmt
                .query_map(params![after, bound], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?))
                })
                .storage_context(context)?;
            let mut page = Vec::with_capacity(limit.min(MAX_PAGE_SIZE));
            for row in rows {
                page.push(row.storage_context(context)?);
            }
            Ok(page)
        })
    }
}

fn run_write<R, F>(conn: &mut Connection, cancel: &CancelToken, interval: c_int, f: F) -> Result<R>
where
    F: FnOnce(&mut dyn SetTxn) -> Result<R>,
{
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .storage_context(|| "begin transaction")?;
    arm(&tx, cancel, interval);
    let outcome = {
        let mut txn = SqliteTxn { conn: &*tx };
        f(&mut txn)
    };
    // COMMIT and ROLLBACK must not be interrupted
    disarm(&tx);
    // Dropping `tx` without commit rolls back
    let value = outcome?;
    tx.commit().storage_context(|| "commit transaction")?;
    Ok(value)
}

/// Statements bound to one open write transaction
struct SqliteTxn<'a> {
    conn: &'a Connection,
}

impl SqliteTxn<'_> {
    fn execute_cached<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
        context: impl FnOnce() -> String,
    ) -> Result<u64> {
        let affected = self
            .conn
            .prepare_cached(sql)
            .and_then(|mut stmt| stmt.execute(params))
            .storage_context(context)?;
        Ok(affected as u64)
    }
}

impl SetTxn for SqliteTxn<'_> {
    fn create_table(&mut self, name: &SetName) -> Result<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (k BLOB NOT NULL UNIQUE, v BLOB NOT NULL)",
            name.table_ident()
        );
        self.conn
            .execute(&sql, [])
            .storage_context(|| format!("create '{}'", name))?;
        Ok(())
    }

    fn table_exists(&mut self, name: &SetName) -> Result<bool> {
        table_exists_on(self.conn, name)
    }

    fn write_row(
        &mut self,
        name: &SetName,
        policy: WritePolicy,
        key: &[u8],
        payload: &[u8],
    ) -> Result<u64> {
        let table = name.table_ident();
        let sql = match policy {
            WritePolicy::InsertOrIgnore => format!(
                "INSERT INTO {} (k, v) VALUES (?1, ?2) ON CONFLICT (k) DO NOTHING",
                table
            ),
            WritePolicy::Upsert => format!(
                "INSERT INTO {} (k, v) VALUES (?1, ?2) ON CONFLICT (k) DO UPDATE SET v = excluded.v",
                table
            ),
            WritePolicy::UpdateExisting => format!("UPDATE {} SET v = ?2 WHERE k = ?1", table),
        };
        self.execute_cached(&sql, params![key, payload], || {
            format!("write {:?} into '{}'", policy, name)
        })
    }

    fn delete_row(&mut self, name: &SetName, key: &[u8]) -> Result<u64> {
        let sql = format!("DELETE FROM {} WHERE k = ?1", name.table_ident());
        self.execute_cached(&sql, [key], || format!("delete from '{}'", name))
    }

    fn insert_from(&mut self, target: &SetName, source: &SetName) -> Result<u64> {
        // WHERE true keeps ON CONFLICT from parsing as a join constraint
        let sql = format!(
            "INSERT INTO {} (k, v) SELECT k, v FROM {} WHERE true ON CONFLICT (k) DO NOTHING",
            target.table_ident(),
            source.table_ident()
        );
        self.execute_cached(&sql, [], || {
            format!("union '{}' into '{}'", source, target)
        })
    }

    fn insert_intersection(&mut self, target: &SetName, sources: &[SetName]) -> Result<u64> {
        let Some((first, rest)) = sources.split_first() else {
            return Ok(0);
        };
        // Aliases keep a source listed twice unambiguous
        let mut sql = format!(
            "INSERT INTO {} (k, v) SELECT s0.k, s0.v FROM {} AS s0",
            target.table_ident(),
            first.table_ident()
        );
        for (i, source) in rest.iter().enumerate() {
            let alias = i + 1;
            sql.push_str(&format!(
                " JOIN {} AS s{alias} ON s{alias}.k = s0.k",
                source.table_ident()
            ));
        }
        sql.push_str(" WHERE true ON CONFLICT (k) DO NOTHING");
        self.execute_cached(&sql, [], || format!("intersect into '{}'", target))
    }

    fn delete_matching(&mut self, target: &SetName, source: &SetName) -> Result<u64> {
        let sql = format!(
            "DELETE FROM {} WHERE k IN (SELECT k FROM {})",
            target.table_ident(),
            source.table_ident()
        );
        self.execute_cached(&sql, [], || {
            format!("subtract '{}' from '{}'", source, target)
        })
    }
}
