/// Database Module
///
/// The access layer is split into focused submodules:
/// - **Connection Management** (`connection.rs`): open/close lifecycle, one-shot helpers, backup
/// - **Statements** (`statement.rs`): compiled commands and positional binding
/// - **Cursors** (`cursor.rs`): row advancing and typed column extraction
/// - **Values** (`value.rs`): blobs, dynamic values and the `Bind`/`Column` traits
///
/// All engine calls go through `ffi.rs`, the only module containing `unsafe` code.
///
/// ## Lifetimes
///
/// Statements and cursors borrow the connection that created them, so a
/// connection always outlives everything derived from it.
pub mod connection;
pub mod cursor;
pub(crate) mod ffi;
pub mod statement;
pub mod value;

pub use connection::{Connection, MEMORY_PATH};
pub use cursor::{Cursor, Ownership};
pub use statement::Statement;
pub use value::{Bind, Blob, Column, ColumnType, NoBlob, Params, Value};
