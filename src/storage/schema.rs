//! Database schema definitions
//!
//! `words` holds the harvested headword inventory, `lema` one row per
//! (queried word x sense), and `runs` a ledger of harvest/enrich runs.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track harvest and enrich runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    mode TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Headword inventory from the alphabet index
CREATE TABLE IF NOT EXISTS words (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kata TEXT NOT NULL UNIQUE
);

-- Enriched senses, one row per queried word and sense
CREATE TABLE IF NOT EXISTS lema (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kata TEXT NOT NULL,
    lema TEXT NOT NULL,
    kelas_kata TEXT NOT NULL,
    keterangan TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_lema_kata ON lema(kata);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
