// Database schema — table creation and migrations.
//
// We use a simple version-based migration approach: a `schema_version` table
// tracks which migrations have run, and each migration is a function that
// executes SQL statements.
//
// Column names in group_stats and comparisons are part of the output
// contract consumed by the reporting stage. Add columns, never rename.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Create all tables if they don't exist yet.
///
/// Idempotent, so it runs on every startup.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- Tracks schema version for future migrations
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- One row per analysis run
        CREATE TABLE IF NOT EXISTS runs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            mapping_version TEXT NOT NULL,     -- topic mapping the run was computed under
            test_kind TEXT NOT NULL,           -- mann-whitney / welch / chi-square
            correction TEXT NOT NULL,          -- holm / bonferroni / benjamini-hochberg
            faction_a INTEGER NOT NULL,        -- numeric party code
            faction_b INTEGER NOT NULL,
            by_year INTEGER NOT NULL DEFAULT 0,
            merged_records INTEGER NOT NULL,
            config_json TEXT NOT NULL,         -- full AnalysisConfig, mapping included
            merge_report_json TEXT NOT NULL,
            consolidation_report_json TEXT NOT NULL
        );

        -- Descriptive statistics (Aggregator output)
        CREATE TABLE IF NOT EXISTS group_stats (
            run_id INTEGER NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
            faction_id INTEGER,                -- NULL when not a grouping key
            topic TEXT,
            year INTEGER,
            n INTEGER NOT NULL,
            mean_sentiment REAL,               -- NULL for empty groups
            variance REAL,
            low_confidence INTEGER NOT NULL
        );

        -- Pairwise faction comparisons (Comparator output)
        CREATE TABLE IF NOT EXISTS comparisons (
            run_id INTEGER NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
            topic TEXT NOT NULL,
            year INTEGER,                      -- NULL for all-time comparisons
            faction_a INTEGER NOT NULL,
            faction_b INTEGER NOT NULL,
            n_a INTEGER NOT NULL,
            n_b INTEGER NOT NULL,
            mean_a REAL,
            mean_b REAL,
            mean_diff REAL,
            test_kind TEXT NOT NULL,
            status TEXT NOT NULL,              -- tested / insufficient_sample / undefined
            statistic REAL,                    -- NULL unless tested
            p_value REAL,
            adjusted_p_value REAL,
            significant INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_group_stats_run
            ON group_stats(run_id);

        CREATE INDEX IF NOT EXISTS idx_comparisons_run
            ON comparisons(run_id);
        ",
    )
    .context("Failed to create database tables")?;

    // Record initial schema version if not already set
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [1],
    )?;

    // Migration v2: free-text note on runs (`parlsent run --note ...`),
    // used to label runs made while revising the topic mapping.
    run_migration(conn, 2, |c| c.execute_batch("ALTER TABLE runs ADD COLUMN note TEXT;"))?;

    Ok(())
}

/// Run a migration if it hasn't been applied yet.
/// The migration function receives the connection and should execute its SQL.
fn run_migration<F>(conn: &Connection, version: i64, migrate: F) -> Result<()>
where
    F: FnOnce(&Connection) -> rusqlite::Result<()>,
{
    let already_applied: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM schema_version WHERE version = ?1",
        [version],
        |row| row.get(0),
    )?;

    if !already_applied {
        migrate(conn).with_context(|| format!("Migration v{version} failed"))?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [version],
        )?;
    }

    Ok(())
}

/// Count the number of user-created tables in the database.
pub fn table_count(conn: &Connection) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}
