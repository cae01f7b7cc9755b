/// Statement Module
///
/// A compiled, parameterized command tied to the connection that created it.
/// The `'conn` lifetime guarantees the connection outlives the statement.

use tracing::{debug, trace};

use crate::core::db::cursor::Cursor;
use crate::core::db::ffi::RawStatement;
use crate::core::db::value::{Bind, NoBlob, Params};
use crate::core::Result;

/// A prepared statement. Dropping it finalizes the compiled form.
pub struct Statement<'conn> {
    pub(crate) raw: RawStatement<'conn>,
    sql: String,
}

impl<'conn> Statement<'conn> {
    pub(crate) fn prepare(conn: &'conn rusqlite::Connection, sql: &str) -> Result<Self> {
        let raw = RawStatement::prepare(conn, sql).map_err(|e| {
            debug!("Failed to prepare {:?}: {}", sql, e);
            e
        })?;
        trace!("Prepared {:?}", sql);
        Ok(Statement {
            raw,
            sql: sql.to_string(),
        })
    }

    /// The command text this statement was compiled from.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Binds one value at a 1-based position.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::Bind` when the engine rejects the value or the
    /// position is out of range.
    pub fn bind<T: Bind + ?Sized>(&mut self, position: usize, value: &T) -> Result<()> {
        value.bind_to(self, position)
    }

    /// Binds borrowed bytes without copying them.
    ///
    /// The bytes must live at least as long as the connection, so the engine
    /// may read them at any step until the statement is finalized.
    pub fn bind_zero_copy(&mut self, position: usize, blob: NoBlob<'conn>) -> Result<()> {
        self.raw.bind_blob_static(position, blob.data())
    }

    /// Resets the statement, clears all bindings and binds `params` from
    /// position 1 in order.
    ///
    /// # Examples
    ///
    /// ```
    /// # use thinsqlite::Connection;
    /// let conn = Connection::open_in_memory()?;
    /// let mut stmt = conn.prepare("SELECT ?, ?")?;
    /// stmt.bind_all(("text", 42))?;
    /// assert!(stmt.evaluate()?);
    /// # Ok::<_, thinsqlite::Error>(())
    /// ```
    pub fn bind_all<P: Params>(&mut self, params: P) -> Result<()> {
        self.reset();
        self.clear_bindings();
        params.bind_params(self)
    }

    /// Executes one step.
    ///
    /// Returns `true` when a row is available and `false` when execution
    /// completed; in the latter case the statement is reset so it can run
    /// again.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::Step` for any status other than row or done.
    pub fn evaluate(&mut self) -> Result<bool> {
        let has_row = self.raw.step()?;
        if !has_row {
            self.raw.reset();
        }
        Ok(has_row)
    }

    /// Discards the cursor position; compiled form and bindings are kept.
    pub fn reset(&mut self) {
        self.raw.reset();
    }

    /// Sets every parameter back to NULL.
    pub fn clear_bindings(&mut self) {
        self.raw.clear_bindings();
    }

    /// Number of positional parameters in the command.
    pub fn parameter_count(&self) -> usize {
        self.raw.parameter_count()
    }

    /// Number of columns the command produces per row.
    pub fn column_count(&self) -> usize {
        self.raw.column_count()
    }

    pub fn column_name(&self, index: usize) -> Option<String> {
        self.raw.column_name(index)
    }

    /// A cursor that borrows this statement and resets it when dropped.
    ///
    /// The statement is also reset when the cursor is created, so rows
    /// already stepped with [`Statement::evaluate`] are walked again from
    /// the first one.
    pub fn cursor(&mut self) -> Cursor<'_, 'conn> {
        Cursor::borrowing(self)
    }

    /// A cursor that takes ownership and finalizes the statement when dropped.
    ///
    /// Like [`Statement::cursor`], it starts from the first row.
    pub fn into_cursor(self) -> Cursor<'conn, 'conn> {
        Cursor::owning(self)
    }
}

impl std::fmt::Debug for Statement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement").field("sql", &self.sql).finish()
    }
}
