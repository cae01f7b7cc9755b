/// Connection Management Module
///
/// This module provides the connection handle: open/close lifecycle,
/// one-shot execute and query helpers, and online backup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::OpenFlags;
use tracing::{debug, warn};

use crate::config::ConnectionConfig;
use crate::core::db::cursor::Cursor;
use crate::core::db::ffi;
use crate::core::db::statement::Statement;
use crate::core::db::value::Params;
use crate::core::{Error, ErrorKind, Result};

/// Path that opens a private in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

/// An exclusively owned handle to one database.
///
/// The handle is closed by [`Connection::close`] or when the value is dropped.
/// Every [`Statement`] and [`Cursor`] borrows the connection, so it cannot be
/// closed or dropped while one of them is alive.
#[derive(Debug, Default)]
pub struct Connection {
    /// Active engine connection (None if closed)
    inner: Option<rusqlite::Connection>,
    /// Path of the open database (None for in-memory databases)
    path: Option<PathBuf>,
}

impl Connection {
    /// Creates a connection that is not yet open.
    pub fn new() -> Self {
        Connection::default()
    }

    /// Opens or creates the database at `path` with default settings.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the database file, or ":memory:" for an in-memory database
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::Open` if the engine cannot open or create the file.
    ///
    /// # Examples
    ///
    /// ```
    /// # use thinsqlite::Connection;
    /// let conn = Connection::open(":memory:")?;
    /// assert!(conn.is_open());
    /// # Ok::<_, thinsqlite::Error>(())
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Connection::open_with_config(path, &ConnectionConfig::default())
    }

    /// Opens the database at `path` applying the given configuration.
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: &ConnectionConfig) -> Result<Self> {
        let mut conn = Connection::new();
        conn.reopen_with_config(path, config)?;
        Ok(conn)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Connection::open(MEMORY_PATH)
    }

    /// Closes any open handle, then opens `path` with default settings.
    pub fn reopen<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.reopen_with_config(path, &ConnectionConfig::default())
    }

    /// Closes any open handle, then opens `path` with `config`.
    pub fn reopen_with_config<P: AsRef<Path>>(
        &mut self,
        path: P,
        config: &ConnectionConfig,
    ) -> Result<()> {
        config.validate()?;
        self.close()?;

        let path = path.as_ref();
        let conn = rusqlite::Connection::open_with_flags(path, open_flags(config))
            .map_err(|e| Error::from_rusqlite(ErrorKind::Open, e))?;
        apply_settings(&conn, config)?;

        debug!("Opened database at {:?}", path);
        self.inner = Some(conn);
        self.path = if path == Path::new(MEMORY_PATH) {
            None
        } else {
            Some(path.to_path_buf())
        };
        Ok(())
    }

    /// Closes the connection. Closing a closed connection is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::Close` if the engine refuses to close; the handle is
    /// kept open in that case so the call can be retried.
    pub fn close(&mut self) -> Result<()> {
        let Some(conn) = self.inner.take() else {
            return Ok(());
        };
        match conn.close() {
            Ok(()) => {
                debug!("Closed database {:?}", self.path);
                self.path = None;
                Ok(())
            }
            Err((conn, e)) => {
                self.inner = Some(conn);
                Err(Error::from_rusqlite(ErrorKind::Close, e))
            }
        }
    }

    /// Checks if the connection holds an open handle.
    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    /// Path of the open database file, `None` when closed or in memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn handle(&self) -> Result<&rusqlite::Connection> {
        self.inner.as_ref().ok_or_else(Error::closed)
    }

    /// Compiles `command` into a reusable statement.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::Prepare` with the engine's detail if the command
    /// cannot be compiled, `ErrorKind::Usage` if the connection is closed.
    pub fn prepare(&self, command: &str) -> Result<Statement<'_>> {
        Statement::prepare(self.handle()?, command)
    }

    /// Prepares `command`, binds `params` and runs it to completion,
    /// discarding any result rows.
    ///
    /// Returns the number of rows changed by the command.
    #[doc(alias = "statement")]
    pub fn execute<P: Params>(&self, command: &str, params: P) -> Result<usize> {
        let mut statement = self.prepare(command)?;
        statement.bind_all(params)?;
        while statement.evaluate()? {}
        Ok(ffi::changes(self.handle()?))
    }

    /// Prepares `command`, binds `params` and returns a cursor owning the
    /// statement. No row is fetched until [`Cursor::next`] is called.
    pub fn query<P: Params>(&self, command: &str, params: P) -> Result<Cursor<'_, '_>> {
        let mut statement = self.prepare(command)?;
        statement.bind_all(params)?;
        Ok(statement.into_cursor())
    }

    /// Copies the whole database into the file at `target`, replacing its
    /// contents.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::Backup` if any backup phase fails, or the open
    /// error of the target file.
    pub fn backup<P: AsRef<Path>>(&self, target: P) -> Result<()> {
        let mut destination = Connection::open(target.as_ref())?;
        self.backup_into(&mut destination)?;
        destination.close()
    }

    /// Copies the whole database into another open connection.
    pub fn backup_into(&self, target: &mut Connection) -> Result<()> {
        let source = self.handle()?;
        let destination = target.inner.as_mut().ok_or_else(Error::closed)?;
        debug!("Backing up {:?} into {:?}", self.path, target.path);
        ffi::backup(source, destination)
    }

    /// Rowid of the most recent successful insert.
    pub fn last_insert_rowid(&self) -> Result<i64> {
        Ok(self.handle()?.last_insert_rowid())
    }

    /// Rows changed by the most recently completed statement.
    pub fn changes(&self) -> Result<usize> {
        Ok(ffi::changes(self.handle()?))
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Suppressed error while closing database: {}", e);
        }
    }
}

fn open_flags(config: &ConnectionConfig) -> OpenFlags {
    let mut flags = OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    if config.read_only {
        flags |= OpenFlags::SQLITE_OPEN_READ_ONLY;
    } else {
        flags |= OpenFlags::SQLITE_OPEN_READ_WRITE;
        if config.create {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }
    }
    flags
}

fn apply_settings(conn: &rusqlite::Connection, config: &ConnectionConfig) -> Result<()> {
    if let Some(ms) = config.busy_timeout_ms {
        conn.busy_timeout(Duration::from_millis(ms))
            .map_err(|e| Error::from_rusqlite(ErrorKind::Open, e))?;
    }

    let mut pragmas = String::new();
    if let Some(enabled) = config.foreign_keys {
        pragmas.push_str(if enabled {
            "PRAGMA foreign_keys = ON;"
        } else {
            "PRAGMA foreign_keys = OFF;"
        });
    }
    if let Some(mode) = &config.journal_mode {
        pragmas.push_str(&format!("PRAGMA journal_mode = {};", mode));
    }
    if !pragmas.is_empty() {
        conn.execute_batch(&pragmas)
            .map_err(|e| Error::from_rusqlite(ErrorKind::Open, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_and_close() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert!(conn.is_open());
        assert_eq!(conn.path(), None);

        conn.close().unwrap();
        assert!(!conn.is_open());

        // closing twice is harmless
        conn.close().unwrap();
    }

    #[test]
    fn test_open_error_handling() {
        let result = Connection::open("/nonexistent/path/database.db");
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Open);
        assert_eq!(err.primary_code(), Some(rusqlite::ffi::SQLITE_CANTOPEN));
    }

    #[test]
    fn test_closed_connection_is_usage_error() {
        let conn = Connection::new();
        let err = conn.execute("SELECT 1", ()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert_eq!(err.code(), Some(ffi::SQLITE_MISUSE));
        assert!(conn.prepare("SELECT 1").is_err());
    }

    #[test]
    fn test_reopen_after_close() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("first.db");
        let second = dir.path().join("second.db");

        let mut conn = Connection::open(&first).unwrap();
        assert_eq!(conn.path(), Some(first.as_path()));
        conn.execute("CREATE TABLE t (x INTEGER)", ()).unwrap();

        conn.reopen(&second).unwrap();
        assert_eq!(conn.path(), Some(second.as_path()));
        assert!(conn.prepare("SELECT x FROM t").is_err());

        conn.close().unwrap();
        conn.reopen(&first).unwrap();
        assert!(conn.prepare("SELECT x FROM t").is_ok());
    }

    #[test]
    fn test_execute_reports_changes() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE t (x INTEGER)", ()).unwrap();
        conn.execute("INSERT INTO t VALUES (?)", (1,)).unwrap();
        conn.execute("INSERT INTO t VALUES (?)", (2,)).unwrap();
        assert_eq!(conn.last_insert_rowid().unwrap(), 2);

        let changed = conn.execute("UPDATE t SET x = x + 1", ()).unwrap();
        assert_eq!(changed, 2);
        assert_eq!(conn.changes().unwrap(), 2);
    }

    #[test]
    fn test_execute_discards_rows() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(conn.execute("SELECT 1 UNION ALL SELECT 2", ()).is_ok());
    }

    #[test]
    fn test_read_only_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ro.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute("CREATE TABLE t (x INTEGER)", ()).unwrap();
        }

        let config = ConnectionConfig {
            read_only: true,
            ..ConnectionConfig::default()
        };
        let conn = Connection::open_with_config(&path, &config).unwrap();
        let err = conn.execute("INSERT INTO t VALUES (1)", ()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Step);
    }

    #[test]
    fn test_no_create_config() {
        let dir = tempdir().unwrap();
        let config = ConnectionConfig {
            create: false,
            ..ConnectionConfig::default()
        };
        let err = Connection::open_with_config(dir.path().join("absent.db"), &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Open);
    }

    #[test]
    fn test_pragmas_applied() {
        let config = ConnectionConfig {
            foreign_keys: Some(true),
            busy_timeout_ms: Some(250),
            ..ConnectionConfig::default()
        };
        let conn = Connection::open_with_config(MEMORY_PATH, &config).unwrap();
        let mut rows = conn.query("PRAGMA foreign_keys", ()).unwrap();
        assert!(rows.next().unwrap());
        assert_eq!(rows.get::<i64>(0).unwrap(), 1);
    }

    #[test]
    fn test_backup_into_connection() {
        let source = Connection::open_in_memory().unwrap();
        source.execute("CREATE TABLE t (x TEXT)", ()).unwrap();
        source.execute("INSERT INTO t VALUES (?)", ("copied",)).unwrap();

        let mut target = Connection::open_in_memory().unwrap();
        source.backup_into(&mut target).unwrap();

        let mut rows = target.query("SELECT x FROM t", ()).unwrap();
        assert!(rows.next().unwrap());
        assert_eq!(rows.get::<String>(0).unwrap(), "copied");
    }

    #[test]
    fn test_backup_into_closed_target() {
        let source = Connection::open_in_memory().unwrap();
        let mut target = Connection::new();
        let err = source.backup_into(&mut target).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }
}
