//! A thin, resource-safe access layer over SQLite.
//!
//! [`Connection`] owns a database handle, [`Statement`] a compiled command and
//! [`Cursor`] walks the rows of an executing statement. Parameters are bound by
//! position through the [`Bind`] trait and columns are extracted through the
//! [`Column`] trait; every engine resource is released when its owner drops.
//!
//! ```
//! use thinsqlite::Connection;
//!
//! let conn = Connection::open_in_memory()?;
//! conn.execute("CREATE TABLE example (textData TEXT, intData INTEGER)", ())?;
//! conn.execute("INSERT INTO example VALUES (?, ?)", ("Hello world", 1))?;
//!
//! let mut rows = conn.query("SELECT textData, intData FROM example", ())?;
//! while rows.next()? {
//!     assert_eq!(rows.get::<String>(0)?, "Hello world");
//!     assert_eq!(rows.get::<i32>(1)?, 1);
//! }
//! # Ok::<_, thinsqlite::Error>(())
//! ```

// Core infrastructure modules
pub mod config;
pub mod core;

pub use crate::config::{load_config, Config, ConnectionConfig};
pub use crate::core::*;

/// Version string of the linked SQLite library.
pub fn sqlite_version() -> &'static str {
    rusqlite::version()
}
