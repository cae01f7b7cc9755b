/// Boolean status contract.
///
/// Enabled by the `status-flags` feature. Callers that prefer success flags
/// over propagated errors turn any fallible call into a `bool`; the error is
/// logged and suppressed.
use tracing::error;

use crate::core::Result;

pub trait StatusExt {
    /// `true` on success. Failures are logged at error level and dropped.
    fn succeeded(self) -> bool;
}

impl<T> StatusExt for Result<T> {
    fn succeeded(self) -> bool {
        match self {
            Ok(_) => true,
            Err(e) => {
                error!("{} failed: {}", e.kind(), e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Connection;

    #[test]
    fn test_flags_instead_of_errors() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(conn.execute("CREATE TABLE t (x INTEGER)", ()).succeeded());
        assert!(!conn.execute("SELECCT x FROM t", ()).succeeded());
        assert!(!Connection::open("/nonexistent/dir/db.sqlite").succeeded());
    }
}
