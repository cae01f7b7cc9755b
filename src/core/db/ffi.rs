//! Raw engine boundary.
//!
//! All `unsafe` code of the crate lives in this module. [`RawStatement`] owns a
//! `sqlite3_stmt` pointer and finalizes it when dropped; the remaining helpers
//! translate status codes and run online backups between two open handles.
//! Everything above this module is safe Rust.

use std::ffi::{c_char, c_int, c_void, CStr};
use std::marker::PhantomData;
use std::ptr::{self, NonNull};

use rusqlite::ffi;
use tracing::trace;

use crate::core::{Error, ErrorKind, Result};

pub(crate) use rusqlite::ffi::{
    SQLITE_BLOB, SQLITE_DONE, SQLITE_FLOAT, SQLITE_INTEGER, SQLITE_MISUSE, SQLITE_NULL, SQLITE_OK,
    SQLITE_ROW, SQLITE_TEXT, SQLITE_TOOBIG,
};

const MAIN_DB: &[u8] = b"main\0";

/// Returns the engine's status string for `code` (`sqlite3_errstr`).
pub(crate) fn status_text(code: c_int) -> String {
    // SAFETY: sqlite3_errstr returns a pointer to a static string for any code.
    unsafe { cstr_to_string(ffi::sqlite3_errstr(code)) }
}

/// Builds an error from the connection's extended code and last message.
fn handle_error(kind: ErrorKind, db: *mut ffi::sqlite3) -> Error {
    // SAFETY: `db` is a live handle owned by a rusqlite connection.
    let (code, detail) = unsafe {
        (
            ffi::sqlite3_extended_errcode(db),
            cstr_to_string(ffi::sqlite3_errmsg(db)),
        )
    };
    Error::with_detail(kind, code, &detail)
}

unsafe fn cstr_to_string(p: *const c_char) -> String {
    if p.is_null() {
        return String::new();
    }
    CStr::from_ptr(p).to_string_lossy().into_owned()
}

fn to_c_int(kind: ErrorKind, value: usize) -> Result<c_int> {
    c_int::try_from(value).map_err(|_| Error::from_code(kind, SQLITE_TOOBIG))
}

/// Number of rows changed by the most recent statement on `conn`.
pub(crate) fn changes(conn: &rusqlite::Connection) -> usize {
    // SAFETY: the handle stays valid for the lifetime of `conn`.
    let count = unsafe { ffi::sqlite3_changes(conn.handle()) };
    usize::try_from(count).unwrap_or(0)
}

/// Copies the whole `main` database of `src` into `dst` in a single step.
///
/// Init, step and finish are all checked; the backup handle is always
/// finished, even when the step fails.
pub(crate) fn backup(src: &rusqlite::Connection, dst: &mut rusqlite::Connection) -> Result<()> {
    // SAFETY: both handles are live; `dst` is borrowed mutably so nothing else
    // uses it while the backup runs.
    unsafe {
        let src_db = src.handle();
        let dst_db = dst.handle();
        let name = MAIN_DB.as_ptr().cast::<c_char>();

        let backup = ffi::sqlite3_backup_init(dst_db, name, src_db, name);
        if backup.is_null() {
            return Err(handle_error(ErrorKind::Backup, dst_db));
        }

        let step = ffi::sqlite3_backup_step(backup, -1);
        let finish = ffi::sqlite3_backup_finish(backup);
        trace!("backup step returned {}, finish returned {}", step, finish);

        if step != SQLITE_DONE {
            return Err(Error::from_code(ErrorKind::Backup, step));
        }
        if finish != SQLITE_OK {
            return Err(handle_error(ErrorKind::Backup, dst_db));
        }
    }
    Ok(())
}

/// Whether `rest` holds nothing but whitespace, comments and semicolons.
fn is_blank_sql(mut rest: &[u8]) -> bool {
    loop {
        match rest {
            [] => return true,
            [b, tail @ ..] if b.is_ascii_whitespace() || *b == b';' => rest = tail,
            [b'-', b'-', tail @ ..] => {
                let end = tail.iter().position(|&b| b == b'\n').map_or(tail.len(), |i| i + 1);
                rest = &tail[end..];
            }
            [b'/', b'*', tail @ ..] => {
                // An unterminated block comment runs to the end of input.
                let end = tail
                    .windows(2)
                    .position(|w| w == b"*/")
                    .map_or(tail.len(), |i| i + 2);
                rest = &tail[end..];
            }
            _ => return false,
        }
    }
}

/// An owned `sqlite3_stmt` tied to the connection that compiled it.
pub(crate) struct RawStatement<'conn> {
    ptr: NonNull<ffi::sqlite3_stmt>,
    db: *mut ffi::sqlite3,
    _conn: PhantomData<&'conn rusqlite::Connection>,
}

impl<'conn> RawStatement<'conn> {
    /// Compiles `sql` on `conn`.
    ///
    /// Only one statement is accepted. Text after it other than whitespace,
    /// comments and semicolons fails with `SQLITE_MISUSE`.
    pub(crate) fn prepare(conn: &'conn rusqlite::Connection, sql: &str) -> Result<Self> {
        let len = to_c_int(ErrorKind::Prepare, sql.len())?;
        let mut stmt = ptr::null_mut();
        let mut tail: *const c_char = ptr::null();
        // SAFETY: the handle is live for 'conn and `sql` is valid for `len` bytes.
        let (db, rc) = unsafe {
            let db = conn.handle();
            let rc = ffi::sqlite3_prepare_v2(
                db,
                sql.as_ptr().cast::<c_char>(),
                len,
                &mut stmt,
                &mut tail,
            );
            (db, rc)
        };

        if rc != SQLITE_OK {
            return Err(handle_error(ErrorKind::Prepare, db));
        }

        let Some(ptr) = NonNull::new(stmt) else {
            return Err(Error::with_detail(
                ErrorKind::Prepare,
                SQLITE_MISUSE,
                "command contains no SQL",
            ));
        };
        let statement = RawStatement {
            ptr,
            db,
            _conn: PhantomData,
        };

        let consumed = if tail.is_null() {
            sql.len()
        } else {
            (tail as usize).saturating_sub(sql.as_ptr() as usize)
        };
        let rest = sql.as_bytes().get(consumed..).unwrap_or_default();
        if !is_blank_sql(rest) {
            return Err(Error::with_detail(
                ErrorKind::Prepare,
                SQLITE_MISUSE,
                "multiple statements in command",
            ));
        }
        Ok(statement)
    }

    fn check_bind(&self, rc: c_int) -> Result<()> {
        if rc == SQLITE_OK {
            Ok(())
        } else {
            Err(Error::from_code(ErrorKind::Bind, rc))
        }
    }

    pub(crate) fn bind_int(&mut self, index: usize, value: i32) -> Result<()> {
        let index = to_c_int(ErrorKind::Bind, index)?;
        // SAFETY: the statement pointer is live until drop.
        let rc = unsafe { ffi::sqlite3_bind_int(self.ptr.as_ptr(), index, value) };
        self.check_bind(rc)
    }

    pub(crate) fn bind_int64(&mut self, index: usize, value: i64) -> Result<()> {
        let index = to_c_int(ErrorKind::Bind, index)?;
        // SAFETY: the statement pointer is live until drop.
        let rc = unsafe { ffi::sqlite3_bind_int64(self.ptr.as_ptr(), index, value) };
        self.check_bind(rc)
    }

    pub(crate) fn bind_double(&mut self, index: usize, value: f64) -> Result<()> {
        let index = to_c_int(ErrorKind::Bind, index)?;
        // SAFETY: the statement pointer is live until drop.
        let rc = unsafe { ffi::sqlite3_bind_double(self.ptr.as_ptr(), index, value) };
        self.check_bind(rc)
    }

    pub(crate) fn bind_null(&mut self, index: usize) -> Result<()> {
        let index = to_c_int(ErrorKind::Bind, index)?;
        // SAFETY: the statement pointer is live until drop.
        let rc = unsafe { ffi::sqlite3_bind_null(self.ptr.as_ptr(), index) };
        self.check_bind(rc)
    }

    /// Binds text; the engine takes its own copy.
    pub(crate) fn bind_text(&mut self, index: usize, value: &str) -> Result<()> {
        let index = to_c_int(ErrorKind::Bind, index)?;
        let len = to_c_int(ErrorKind::Bind, value.len())?;
        // SAFETY: SQLITE_TRANSIENT makes the engine copy the bytes before returning.
        let rc = unsafe {
            ffi::sqlite3_bind_text(
                self.ptr.as_ptr(),
                index,
                value.as_ptr().cast::<c_char>(),
                len,
                ffi::SQLITE_TRANSIENT(),
            )
        };
        self.check_bind(rc)
    }

    /// Binds bytes; the engine takes its own copy.
    pub(crate) fn bind_blob(&mut self, index: usize, value: &[u8]) -> Result<()> {
        let index = to_c_int(ErrorKind::Bind, index)?;
        let len = to_c_int(ErrorKind::Bind, value.len())?;
        // SAFETY: SQLITE_TRANSIENT makes the engine copy the bytes before returning.
        let rc = unsafe {
            ffi::sqlite3_bind_blob(
                self.ptr.as_ptr(),
                index,
                value.as_ptr().cast::<c_void>(),
                len,
                ffi::SQLITE_TRANSIENT(),
            )
        };
        self.check_bind(rc)
    }

    /// Binds bytes without copying them.
    ///
    /// The bytes outlive the connection, and therefore this statement, so the
    /// engine may keep the pointer until it is finalized.
    pub(crate) fn bind_blob_static(&mut self, index: usize, value: &'conn [u8]) -> Result<()> {
        let index = to_c_int(ErrorKind::Bind, index)?;
        let len = to_c_int(ErrorKind::Bind, value.len())?;
        // SAFETY: `value` lives for 'conn, which outlives this statement.
        let rc = unsafe {
            ffi::sqlite3_bind_blob(
                self.ptr.as_ptr(),
                index,
                value.as_ptr().cast::<c_void>(),
                len,
                ffi::SQLITE_STATIC(),
            )
        };
        self.check_bind(rc)
    }

    /// Executes one step, returning `true` for a row and `false` when done.
    pub(crate) fn step(&mut self) -> Result<bool> {
        // SAFETY: the statement pointer is live until drop.
        let rc = unsafe { ffi::sqlite3_step(self.ptr.as_ptr()) };
        match rc {
            SQLITE_ROW => Ok(true),
            SQLITE_DONE => Ok(false),
            _ => Err(handle_error(ErrorKind::Step, self.db)),
        }
    }

    /// Rewinds the statement; bindings are kept.
    ///
    /// The return code of `sqlite3_reset` repeats the last step error, which
    /// has already been reported, so it is only traced.
    pub(crate) fn reset(&mut self) {
        // SAFETY: the statement pointer is live until drop.
        let rc = unsafe { ffi::sqlite3_reset(self.ptr.as_ptr()) };
        if rc != SQLITE_OK {
            trace!("sqlite3_reset returned {}", rc);
        }
    }

    pub(crate) fn clear_bindings(&mut self) {
        // SAFETY: the statement pointer is live until drop.
        unsafe {
            ffi::sqlite3_clear_bindings(self.ptr.as_ptr());
        }
    }

    pub(crate) fn parameter_count(&self) -> usize {
        // SAFETY: the statement pointer is live until drop.
        let count = unsafe { ffi::sqlite3_bind_parameter_count(self.ptr.as_ptr()) };
        usize::try_from(count).unwrap_or(0)
    }

    /// Number of columns in the compiled result set.
    pub(crate) fn column_count(&self) -> usize {
        // SAFETY: the statement pointer is live until drop.
        let count = unsafe { ffi::sqlite3_column_count(self.ptr.as_ptr()) };
        usize::try_from(count).unwrap_or(0)
    }

    /// Number of columns in the current row, 0 when no row is active.
    pub(crate) fn data_count(&self) -> usize {
        // SAFETY: the statement pointer is live until drop.
        let count = unsafe { ffi::sqlite3_data_count(self.ptr.as_ptr()) };
        usize::try_from(count).unwrap_or(0)
    }

    pub(crate) fn column_name(&self, index: usize) -> Option<String> {
        let index = c_int::try_from(index).ok()?;
        // SAFETY: the returned pointer is valid until the statement is finalized
        // or the name is requested again; it is copied immediately.
        let name = unsafe { ffi::sqlite3_column_name(self.ptr.as_ptr(), index) };
        if name.is_null() {
            None
        } else {
            // SAFETY: non-null, NUL terminated string owned by the engine.
            Some(unsafe { cstr_to_string(name) })
        }
    }

    /// Fundamental type code of a column in the current row.
    pub(crate) fn column_type(&self, index: usize) -> c_int {
        let index = c_int::try_from(index).unwrap_or(c_int::MAX);
        // SAFETY: out of range indices are answered with SQLITE_NULL.
        unsafe { ffi::sqlite3_column_type(self.ptr.as_ptr(), index) }
    }

    pub(crate) fn column_int64(&self, index: usize) -> i64 {
        let index = c_int::try_from(index).unwrap_or(c_int::MAX);
        // SAFETY: the statement pointer is live until drop.
        unsafe { ffi::sqlite3_column_int64(self.ptr.as_ptr(), index) }
    }

    pub(crate) fn column_double(&self, index: usize) -> f64 {
        let index = c_int::try_from(index).unwrap_or(c_int::MAX);
        // SAFETY: the statement pointer is live until drop.
        unsafe { ffi::sqlite3_column_double(self.ptr.as_ptr(), index) }
    }

    /// Raw text bytes of a column. NULL and empty text both yield an empty slice.
    pub(crate) fn column_text(&self, index: usize) -> &[u8] {
        let index = c_int::try_from(index).unwrap_or(c_int::MAX);
        // SAFETY: sqlite3_column_bytes must follow sqlite3_column_text; the
        // pointer stays valid until the next step, reset or finalize, all of
        // which need `&mut self`.
        unsafe {
            let text = ffi::sqlite3_column_text(self.ptr.as_ptr(), index);
            if text.is_null() {
                return &[];
            }
            let len = usize::try_from(ffi::sqlite3_column_bytes(self.ptr.as_ptr(), index))
                .unwrap_or(0);
            std::slice::from_raw_parts(text, len)
        }
    }

    /// Raw bytes of a column. NULL and zero-length blobs both yield an empty slice.
    pub(crate) fn column_blob(&self, index: usize) -> &[u8] {
        let index = c_int::try_from(index).unwrap_or(c_int::MAX);
        // SAFETY: see `column_text`.
        unsafe {
            let blob = ffi::sqlite3_column_blob(self.ptr.as_ptr(), index);
            if blob.is_null() {
                return &[];
            }
            let len = usize::try_from(ffi::sqlite3_column_bytes(self.ptr.as_ptr(), index))
                .unwrap_or(0);
            std::slice::from_raw_parts(blob.cast::<u8>(), len)
        }
    }
}

impl Drop for RawStatement<'_> {
    fn drop(&mut self) {
        // SAFETY: the pointer is finalized exactly once, here.
        let rc = unsafe { ffi::sqlite3_finalize(self.ptr.as_ptr()) };
        if rc != SQLITE_OK {
            trace!("sqlite3_finalize returned {}", rc);
        }
    }
}
