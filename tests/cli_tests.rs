//! Tests for the demo binary.

#[cfg(test)]
mod tests {
    use assert_cmd::Command;
    use tempfile::tempdir;
    use thinsqlite::Connection;

    #[test]
    fn test_demo_writes_and_backs_up() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("example.db");
        let backup = dir.path().join("backup.db");

        let output = Command::cargo_bin("thinsqlite")
            .unwrap()
            .arg(&db)
            .arg(&backup)
            .output()
            .unwrap();
        assert!(output.status.success());

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("1 Hello world 1 1.23"), "{}", stdout);
        assert!(stdout.contains("syntax error"), "{}", stdout);

        let copy = Connection::open(&backup).unwrap();
        let mut rows = copy.query("SELECT COUNT(*) FROM example", ()).unwrap();
        assert!(rows.next().unwrap());
        assert_eq!(rows.get::<i64>(0).unwrap(), 1);
    }

    #[test]
    fn test_demo_reports_open_failure() {
        Command::cargo_bin("thinsqlite")
            .unwrap()
            .arg("/nonexistent/dir/example.db")
            .assert()
            .failure();
    }
}
