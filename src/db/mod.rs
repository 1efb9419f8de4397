// Results store — one row per analysis run, plus that run's GroupStat and
// ComparisonResult tables, so runs under different topic mappings can be
// compared after the fact.
//
// rusqlite is built with the "bundled" feature, so no system SQLite is
// needed. PARLSENT_DB_PATH picks the file (default ./parlsent.db).

pub mod models;
pub mod queries;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

/// Create the results store if needed and bring its schema up to date.
///
/// `parlsent init` calls this, as does `parlsent run` unless `--no-save`
/// is given. Missing parent directories are created.
pub fn initialize(db_path: &str) -> Result<Connection> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create directory for results store: {db_path}")
            })?;
        }
    }
    connect(db_path)
}

/// Open a results store that `parlsent init` already created. Used by the
/// read-only commands (`history`, `status`), which should not leave an
/// empty database behind on a typo'd path.
pub fn open(db_path: &str) -> Result<Connection> {
    if !Path::new(db_path).exists() {
        anyhow::bail!("Database not found at {db_path}. Run `parlsent init` first.");
    }
    connect(db_path)
}

fn connect(db_path: &str) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open results store at {db_path}"))?;

    conn.pragma_update(None, "journal_mode", "WAL")?;
    // group_stats and comparisons cascade with their run
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // Stores written before a migration get it on first open
    schema::create_tables(&conn)?;

    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_creates_parent_dirs_and_open_reuses_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("results.db");
        let path = path.to_str().unwrap();

        let conn = initialize(path).unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
        drop(conn);

        let conn = open(path).unwrap();
        assert_eq!(schema::table_count(&conn).unwrap(), 4);
    }
}
