//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{EnrichedRecord, InsertOutcome, RunMode, RunRecord, RunStatus};
use crate::HarvestError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const RUN_COLUMNS: &str = "id, mode, started_at, finished_at, config_hash, status";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(HarvestError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        let conn = Connection::open(path)?;

        // Many small writer transactions from concurrent workers
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        mode: RunMode::from_db_string(&row.get::<_, String>(1)?).unwrap_or(RunMode::Enrich),
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        config_hash: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(RunStatus::Running),
    })
}

fn lema_exists_on(conn: &Connection, word: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT 1 FROM lema WHERE kata = ?1 LIMIT 1",
        params![word],
        |_| Ok(()),
    )
    .optional()
    .map(|hit| hit.is_some())
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, mode: RunMode, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (mode, started_at, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                mode.to_db_string(),
                now,
                config_hash,
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let sql = format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS);
        self.conn
            .query_row(&sql, params![run_id], run_from_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn latest_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>> {
        let sql = format!("SELECT {} FROM runs ORDER BY id DESC LIMIT ?1", RUN_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let runs = stmt
            .query_map(params![limit as i64], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }

    // ===== Enrichment =====

    fn lema_exists(&self, word: &str) -> StorageResult<bool> {
        Ok(lema_exists_on(&self.conn, word)?)
    }

    fn insert_lemas(
        &mut self,
        word: &str,
        records: &[EnrichedRecord],
    ) -> StorageResult<InsertOutcome> {
        if records.is_empty() {
            return Ok(InsertOutcome::Inserted(0));
        }

        let tx = self.conn.transaction()?;
        if lema_exists_on(&tx, word)? {
            return Ok(InsertOutcome::AlreadyPresent);
        }

        {
            let mut stmt = tx.prepare(
                "INSERT INTO lema (kata, lema, kelas_kata, keterangan) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for record in records {
                stmt.execute(params![
                    word,
                    record.lemma,
                    record.word_class,
                    record.gloss
                ])?;
            }
        }

        tx.commit()?;
        Ok(InsertOutcome::Inserted(records.len()))
    }

    // ===== Headwords =====

    fn insert_words(&mut self, words: &[String]) -> StorageResult<usize> {
        if words.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare("INSERT OR IGNORE INTO words (kata) VALUES (?1)")?;
            for word in words {
                inserted += stmt.execute(params![word])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    fn all_words(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT kata FROM words ORDER BY id")?;
        let words = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(words)
    }

    // ===== Statistics =====

    fn count_words(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM words", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_lemas(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM lema", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_enriched_words(&self) -> StorageResult<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(DISTINCT kata) FROM lema", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(word: &str, class: &str, gloss: &str) -> EnrichedRecord {
        EnrichedRecord {
            queried_word: word.to_string(),
            lemma: word.to_string(),
            word_class: class.to_string(),
            gloss: gloss.to_string(),
        }
    }

    #[test]
    fn test_create_in_memory() {
        let storage = SqliteStorage::open_in_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_open_on_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kbbi.db");
        {
            let mut storage = SqliteStorage::new(&path).unwrap();
            storage.insert_words(&["abad".to_string()]).unwrap();
        }
        let storage = SqliteStorage::new(&path).unwrap();
        assert_eq!(storage.all_words().unwrap(), vec!["abad".to_string()]);
    }

    #[test]
    fn test_run_lifecycle() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        let run_id = storage.create_run(RunMode::Enrich, "abc123").unwrap();
        assert!(run_id > 0);

        let run = storage.get_run(run_id).unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.mode, RunMode::Enrich);
        assert!(run.finished_at.is_none());

        storage.finish_run(run_id, RunStatus::Halted).unwrap();
        let run = storage.get_run(run_id).unwrap();
        assert_eq!(run.status, RunStatus::Halted);
        assert!(run.finished_at.is_some());

        assert!(matches!(
            storage.finish_run(999, RunStatus::Completed),
            Err(StorageError::RunNotFound(999))
        ));
    }

    #[test]
    fn test_latest_runs_newest_first() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        let first = storage.create_run(RunMode::Harvest, "h").unwrap();
        let second = storage.create_run(RunMode::Enrich, "h").unwrap();

        let runs = storage.latest_runs(5).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].id, second);
        assert_eq!(runs[1].id, first);
        assert_eq!(storage.latest_runs(1).unwrap().len(), 1);
    }

    #[test]
    fn test_insert_lemas_writes_every_sense() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        let rows = vec![
            record("rumah", "n[nomina]", "bangunan untuk tempat tinggal"),
            record("rumah", "v[verba]", "berumah"),
        ];

        assert!(!storage.lema_exists("rumah").unwrap());
        let outcome = storage.insert_lemas("rumah", &rows).unwrap();
        assert_eq!(outcome, InsertOutcome::Inserted(2));
        assert!(storage.lema_exists("rumah").unwrap());
        assert_eq!(storage.count_lemas().unwrap(), 2);
        assert_eq!(storage.count_enriched_words().unwrap(), 1);
    }

    #[test]
    fn test_insert_lemas_second_time_is_noop() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        let rows = vec![record("air", "n[nomina]", "cairan jernih")];

        storage.insert_lemas("air", &rows).unwrap();
        let outcome = storage.insert_lemas("air", &rows).unwrap();

        assert_eq!(outcome, InsertOutcome::AlreadyPresent);
        assert_eq!(storage.count_lemas().unwrap(), 1);
    }

    #[test]
    fn test_lema_exists_is_exact_match() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        storage
            .insert_lemas("Jawa", &[record("Jawa", "n[nomina]", "pulau")])
            .unwrap();

        assert!(storage.lema_exists("Jawa").unwrap());
        assert!(!storage.lema_exists("jawa").unwrap());
        assert!(!storage.lema_exists("Jaw").unwrap());
    }

    #[test]
    fn test_insert_words_ignores_duplicates() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        let page = vec!["abad".to_string(), "abadi".to_string()];

        assert_eq!(storage.insert_words(&page).unwrap(), 2);
        assert_eq!(storage.insert_words(&page).unwrap(), 0);

        let more = vec!["abadi".to_string(), "abah".to_string()];
        assert_eq!(storage.insert_words(&more).unwrap(), 1);

        assert_eq!(
            storage.all_words().unwrap(),
            vec!["abad".to_string(), "abadi".to_string(), "abah".to_string()]
        );
        assert_eq!(storage.count_words().unwrap(), 3);
    }
}
