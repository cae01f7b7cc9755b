//! Property-based tests for binding and extraction
//!
//! These tests verify, through property-based testing, that:
//! - Every supported scalar survives a bind/store/read round-trip
//! - Cursors report exactly as many rows as the result set holds
//! - Malformed commands fail at prepare time

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use thinsqlite::{Bind, Blob, Column, Connection, ErrorKind};

    // Test infrastructure

    /// Stores `value` in a single-row table without type affinity and reads it back
    fn round_trip<T: Bind + Column>(value: &T) -> T {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE cell (v)", ()).unwrap();

        let mut insert = conn.prepare("INSERT INTO cell (v) VALUES (?)").unwrap();
        insert.bind(1, value).unwrap();
        assert!(!insert.evaluate().unwrap());
        drop(insert);

        let mut rows = conn.query("SELECT v FROM cell", ()).unwrap();
        assert!(rows.next().unwrap());
        let read = rows.get::<T>(0).unwrap();
        assert!(!rows.next().unwrap());
        read
    }

    fn arb_finite_f64() -> impl Strategy<Value = f64> {
        any::<f64>().prop_filter("finite", |v| v.is_finite())
    }

    fn arb_finite_f32() -> impl Strategy<Value = f32> {
        any::<f32>().prop_filter("finite", |v| v.is_finite())
    }

    // Property tests

    proptest! {
        #[test]
        fn prop_i32_round_trip(value in any::<i32>()) {
            prop_assert_eq!(round_trip(&value), value);
        }

        #[test]
        fn prop_i64_round_trip(value in any::<i64>()) {
            prop_assert_eq!(round_trip(&value), value);
        }

        #[test]
        fn prop_f64_round_trip(value in arb_finite_f64()) {
            prop_assert_eq!(round_trip(&value), value);
        }

        /// f32 is widened to double on bind and narrowed on read, which is lossless
        #[test]
        fn prop_f32_round_trip(value in arb_finite_f32()) {
            prop_assert_eq!(round_trip(&value), value);
        }

        #[test]
        fn prop_text_round_trip(value in "\\PC{0,64}") {
            prop_assert_eq!(round_trip(&value), value);
        }

        #[test]
        fn prop_blob_round_trip(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
            let blob = Blob::from(bytes.clone());
            prop_assert_eq!(round_trip(&blob).into_vec(), bytes);
        }

        /// next() is true exactly once per row, then stays false
        #[test]
        fn prop_next_matches_row_count(row_count in 0usize..40) {
            let conn = Connection::open_in_memory().unwrap();
            conn.execute("CREATE TABLE seq (n INTEGER)", ()).unwrap();
            let mut insert = conn.prepare("INSERT INTO seq (n) VALUES (?)").unwrap();
            for n in 0..row_count {
                insert.bind_all((n as i64,)).unwrap();
                insert.evaluate().unwrap();
            }
            drop(insert);

            let mut rows = conn.query("SELECT n FROM seq ORDER BY n", ()).unwrap();
            let mut seen = 0usize;
            while rows.next().unwrap() {
                prop_assert_eq!(rows.read::<i64>().unwrap(), seen as i64);
                seen += 1;
            }
            prop_assert_eq!(seen, row_count);
            prop_assert!(!rows.next().unwrap());
        }

        /// Garbage in front of a valid command never compiles
        #[test]
        fn prop_malformed_command_fails_at_prepare(prefix in "[A-Z]{3,8}X") {
            let conn = Connection::open_in_memory().unwrap();
            let err = conn.query(&format!("{} 1", prefix), ()).unwrap_err();
            prop_assert_eq!(err.kind(), ErrorKind::Prepare);
            prop_assert!(err.to_string().contains("SQL logic error"), "{}", err);
        }
    }

    #[test]
    fn test_empty_values_round_trip() {
        assert_eq!(round_trip(&String::new()), "");
        assert!(round_trip(&Blob::new(&[])).is_empty());
    }
}
