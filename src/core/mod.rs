/// Core Module
///
/// This module contains the access layer itself: connections, prepared
/// statements, row cursors, value conversion and the shared error type.

pub mod db;
pub mod error;
#[cfg(feature = "status-flags")]
pub mod status;

// Re-export commonly used types for convenience
pub use db::{
    Blob, Bind, Column, ColumnType, Connection, Cursor, NoBlob, Ownership, Params, Statement,
    Value, MEMORY_PATH,
};
pub use error::{Error, ErrorKind, Result};
#[cfg(feature = "status-flags")]
pub use status::StatusExt;
