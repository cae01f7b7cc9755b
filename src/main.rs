use thinsqlite::config::{default_config_path, load_config};
use thinsqlite::{Connection, ConnectionConfig, Result};
use tracing::{info, warn};

fn main() {
    // Initialize the logging system using tracing subscriber
    tracing_subscriber::fmt::init();

    info!("Starting thinsqlite demo (SQLite {})...", thinsqlite::sqlite_version());

    let args: Vec<String> = std::env::args().collect();
    let db_path = args.get(1).map(String::as_str).unwrap_or("example.db");
    let backup_path = args.get(2).map(String::as_str).unwrap_or("backup.db");

    if let Err(e) = run(db_path, backup_path) {
        eprintln!("Demo failed: {}", e);
        std::process::exit(1);
    }
}

fn connection_config() -> ConnectionConfig {
    let Some(path) = default_config_path().filter(|p| p.exists()) else {
        return ConnectionConfig::default();
    };
    match load_config(&path) {
        Ok(config) => config.connection,
        Err(e) => {
            warn!("Ignoring config at {:?}: {}", path, e);
            ConnectionConfig::default()
        }
    }
}

fn run(db_path: &str, backup_path: &str) -> Result<()> {
    let connection = Connection::open_with_config(db_path, &connection_config())?;

    connection.execute(
        "CREATE TABLE IF NOT EXISTS example (\
         id INTEGER PRIMARY KEY AUTOINCREMENT, \
         textData TEXT, \
         intData INTEGER, \
         floatData REAL)",
        (),
    )?;

    connection.execute(
        "INSERT INTO example (textData, intData, floatData) VALUES (?, ?, ?)",
        ("Hello world", 1, 1.23),
    )?;

    let mut rows = connection.query("SELECT * FROM example", ())?;
    while rows.next()? {
        println!(
            "{} {} {} {}",
            rows.get::<i32>(0)?,
            rows.get::<String>(1)?,
            rows.get::<i32>(2)?,
            rows.get::<f32>(3)?
        );
    }
    drop(rows);

    // Deliberate mistake
    if let Err(e) = connection.query("SELECCT textData FROM example", ()) {
        println!("{}", e);
    }

    connection.backup(backup_path)?;
    println!("Backed up {} to {}", db_path, backup_path);
    Ok(())
}
