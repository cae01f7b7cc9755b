/// Cursor Module
///
/// The row-advancing view over a statement's execution. A cursor either owns
/// its statement (finalizing it on drop) or borrows one that is owned
/// elsewhere (only resetting it on drop). The mode is fixed when the cursor
/// is constructed.

use tracing::trace;

use crate::core::db::statement::Statement;
use crate::core::db::value::{Column, Value};
use crate::core::{Error, ErrorKind, Result};

/// Whether a cursor finalizes its statement when dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// The cursor owns the statement and finalizes it.
    Owned,
    /// The statement is owned elsewhere; the cursor only resets it.
    Borrowed,
}

enum Handle<'s, 'conn> {
    Owned(Statement<'conn>),
    Borrowed(&'s mut Statement<'conn>),
}

/// Row cursor over a prepared statement.
///
/// Iterate with [`Cursor::next`], then read columns of the current row by
/// index with [`Cursor::get`] or in order with [`Cursor::read`].
///
/// ```
/// # use thinsqlite::Connection;
/// let conn = Connection::open_in_memory()?;
/// let mut rows = conn.query("SELECT 1, 'one' UNION ALL SELECT 2, 'two'", ())?;
/// while rows.next()? {
///     let n: i64 = rows.read()?;
///     let name: String = rows.read()?;
///     println!("{} {}", n, name);
/// }
/// # Ok::<_, thinsqlite::Error>(())
/// ```
pub struct Cursor<'s, 'conn> {
    handle: Handle<'s, 'conn>,
    column: usize,
    has_row: bool,
    exhausted: bool,
}

impl<'s, 'conn> Cursor<'s, 'conn> {
    /// Takes ownership of `statement`; it is finalized when the cursor drops.
    pub fn owning(statement: Statement<'conn>) -> Self {
        Cursor::with_handle(Handle::Owned(statement))
    }

    /// Borrows `statement`; dropping the cursor resets but never finalizes it.
    pub fn borrowing(statement: &'s mut Statement<'conn>) -> Self {
        Cursor::with_handle(Handle::Borrowed(statement))
    }

    /// The statement is reset first, so the cursor always starts before the
    /// first row. Bindings are kept.
    fn with_handle(handle: Handle<'s, 'conn>) -> Self {
        let mut cursor = Cursor {
            handle,
            column: 0,
            has_row: false,
            exhausted: false,
        };
        cursor.statement_mut().reset();
        cursor
    }

    pub fn ownership(&self) -> Ownership {
        match self.handle {
            Handle::Owned(_) => Ownership::Owned,
            Handle::Borrowed(_) => Ownership::Borrowed,
        }
    }

    pub fn statement(&self) -> &Statement<'conn> {
        match &self.handle {
            Handle::Owned(statement) => statement,
            Handle::Borrowed(statement) => statement,
        }
    }

    fn statement_mut(&mut self) -> &mut Statement<'conn> {
        match &mut self.handle {
            Handle::Owned(statement) => statement,
            Handle::Borrowed(statement) => statement,
        }
    }

    /// Advances to the next row.
    ///
    /// Returns `false` once the rows are exhausted and keeps returning `false`
    /// until [`Cursor::rewind`] is called.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::Step` for engine failures other than exhaustion.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<bool> {
        self.column = 0;
        if self.exhausted {
            return Ok(false);
        }
        match self.statement_mut().evaluate() {
            Ok(true) => {
                self.has_row = true;
                Ok(true)
            }
            Ok(false) => {
                self.has_row = false;
                self.exhausted = true;
                Ok(false)
            }
            Err(e) => {
                self.has_row = false;
                Err(e)
            }
        }
    }

    /// Whether a row is currently available for reading.
    pub fn has_row(&self) -> bool {
        self.has_row
    }

    /// Resets the statement so the result set can be walked again.
    pub fn rewind(&mut self) {
        self.statement_mut().reset();
        self.column = 0;
        self.has_row = false;
        self.exhausted = false;
    }

    /// Number of columns the current row exposes.
    ///
    /// Without an active row the statement is probed: reset, one step, count,
    /// reset. The probe leaves the cursor where it was, so an empty result
    /// reports 0 and a later [`Cursor::next`] behaves as if it never ran.
    pub fn column_count(&mut self) -> Result<usize> {
        if self.has_row {
            return Ok(self.statement().raw.data_count());
        }

        let statement = self.statement_mut();
        statement.reset();
        let probe = statement.raw.step();
        let count = statement.raw.data_count();
        statement.reset();
        trace!("Probed column count {} for {:?}", count, statement.sql());
        probe.map(|_| count)
    }

    pub fn column_name(&self, index: usize) -> Option<String> {
        self.statement().column_name(index)
    }

    fn check_column(&self, index: usize) -> Result<()> {
        if !self.has_row {
            return Err(Error::new(ErrorKind::Usage, "no active row to read from"));
        }
        let available = self.statement().raw.data_count();
        if index >= available {
            return Err(Error::new(
                ErrorKind::Usage,
                format!(
                    "column index {} out of range for row with {} columns",
                    index, available
                ),
            ));
        }
        Ok(())
    }

    /// Reads column `index` (0-based) of the current row.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::Usage` when no row is active or the index is past
    /// the last column, `ErrorKind::Conversion` for invalid UTF-8 text.
    pub fn get<T: Column>(&self, index: usize) -> Result<T> {
        self.check_column(index)?;
        T::read(self.statement(), index)
    }

    /// Reads the next column of the current row and moves the read offset.
    pub fn read<T: Column>(&mut self) -> Result<T> {
        let value = self.get(self.column)?;
        self.column += 1;
        Ok(value)
    }

    /// Reads column `index` as a dynamically typed [`Value`].
    pub fn get_value(&self, index: usize) -> Result<Value> {
        self.get(index)
    }
}

impl std::fmt::Debug for Cursor<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("statement", self.statement())
            .field("ownership", &self.ownership())
            .field("has_row", &self.has_row)
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

impl Drop for Cursor<'_, '_> {
    fn drop(&mut self) {
        if let Handle::Borrowed(statement) = &mut self.handle {
            statement.reset();
        }
    }
}
