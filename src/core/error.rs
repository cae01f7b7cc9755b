/// Error Module
///
/// This module defines the single error type surfaced by every fallible
/// operation of the crate. Each error carries a human readable message, the
/// category of the failing operation and, when the engine reported one, the
/// numeric SQLite status code.
use std::fmt;
use thiserror::Error;

use crate::core::db::ffi;

/// Category of the operation that failed.
///
/// Row exhaustion is never an error; it is reported as `false` by the
/// stepping methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Opening or creating a database failed (bad path, permissions, busy file)
    Open,
    /// Closing a connection failed (for example unfinalized statements)
    Close,
    /// The command text could not be compiled
    Prepare,
    /// The engine rejected a bound parameter
    Bind,
    /// Stepping a statement failed (constraint violation, locked database, ...)
    Step,
    /// Any phase of an online backup failed
    Backup,
    /// The API was used incorrectly (closed connection, missing row, bad column)
    Usage,
    /// A column value could not be converted into the requested Rust type
    Conversion,
    /// Configuration loading and validation errors
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Open => "open",
            ErrorKind::Close => "close",
            ErrorKind::Prepare => "prepare",
            ErrorKind::Bind => "bind",
            ErrorKind::Step => "step",
            ErrorKind::Backup => "backup",
            ErrorKind::Usage => "usage",
            ErrorKind::Conversion => "conversion",
            ErrorKind::Config => "config",
        };
        f.write_str(name)
    }
}

/// Uniform error type for all database operations.
///
/// The message of engine failures is formed as `"<status string>: <detail>"`,
/// where the status string comes from `sqlite3_errstr` and the detail is the
/// connection's last error message.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct Error {
    kind: ErrorKind,
    code: Option<i32>,
    message: String,
}

impl Error {
    /// Creates an error that did not originate from an engine status code.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error {
            kind,
            code: None,
            message: message.into(),
        }
    }

    /// Creates an error from an engine status code alone.
    ///
    /// The message is the engine's status string for `code`.
    pub fn from_code(kind: ErrorKind, code: i32) -> Self {
        Error {
            kind,
            code: Some(code),
            message: ffi::status_text(code),
        }
    }

    /// Creates an error from a status code plus connection specific detail.
    pub fn with_detail(kind: ErrorKind, code: i32, detail: &str) -> Self {
        let status = ffi::status_text(code);
        let message = if detail.is_empty() {
            status
        } else {
            format!("{}: {}", status, detail)
        };
        Error {
            kind,
            code: Some(code),
            message,
        }
    }

    /// Usage error raised when an operation needs an open connection.
    pub(crate) fn closed() -> Self {
        Error {
            kind: ErrorKind::Usage,
            code: Some(ffi::SQLITE_MISUSE),
            message: "connection is not open".to_string(),
        }
    }

    /// Converts a `rusqlite` error, keeping the engine code when present.
    pub fn from_rusqlite(kind: ErrorKind, err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(failure, detail) => Error::with_detail(
                kind,
                failure.extended_code,
                detail.as_deref().unwrap_or_default(),
            ),
            other => Error::new(kind, other.to_string()),
        }
    }

    /// The category of the failed operation.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The engine status code (extended where available), if any.
    pub fn code(&self) -> Option<i32> {
        self.code
    }

    /// The primary result code, i.e. the low byte of the extended code.
    pub fn primary_code(&self) -> Option<i32> {
        self.code.map(|code| code & 0xff)
    }

    /// The human readable message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::new(ErrorKind::Config, err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::new(ErrorKind::Config, err.to_string())
    }
}

/// Type alias for Result to use the crate's `Error` as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::ffi as sys;

    #[test]
    fn test_error_display() {
        let err = Error::new(ErrorKind::Usage, "no active row");
        assert_eq!(err.to_string(), "no active row");
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert_eq!(err.code(), None);
    }

    #[test]
    fn test_error_from_code_uses_status_string() {
        let err = Error::from_code(ErrorKind::Bind, sys::SQLITE_RANGE);
        assert_eq!(err.code(), Some(sys::SQLITE_RANGE));
        assert!(err.message().contains("out of range"), "{}", err);
    }

    #[test]
    fn test_error_with_detail() {
        let err = Error::with_detail(ErrorKind::Prepare, sys::SQLITE_ERROR, "no such table: t");
        assert_eq!(err.to_string(), "SQL logic error: no such table: t");

        let bare = Error::with_detail(ErrorKind::Prepare, sys::SQLITE_ERROR, "");
        assert_eq!(bare.to_string(), "SQL logic error");
    }

    #[test]
    fn test_primary_code_masks_extended_code() {
        let err = Error::from_code(ErrorKind::Step, sys::SQLITE_CONSTRAINT_UNIQUE);
        assert_eq!(err.primary_code(), Some(sys::SQLITE_CONSTRAINT));
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert_eq!(err.kind(), ErrorKind::Config);

        let toml_err = toml::from_str::<toml::Value>("= broken").unwrap_err();
        let err: Error = toml_err.into();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_rusqlite_conversion_keeps_code() {
        let failure = rusqlite::Error::SqliteFailure(
            sys::Error::new(sys::SQLITE_CANTOPEN),
            Some("unable to open database file".to_string()),
        );
        let err = Error::from_rusqlite(ErrorKind::Open, failure);
        assert_eq!(err.kind(), ErrorKind::Open);
        assert_eq!(err.code(), Some(sys::SQLITE_CANTOPEN));
        assert!(err.message().ends_with(": unable to open database file"));

        let other = Error::from_rusqlite(ErrorKind::Step, rusqlite::Error::ExecuteReturnedResults);
        assert_eq!(other.code(), None);
    }
}
