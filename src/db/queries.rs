// Database queries — storing and reading back analysis runs.
//
// Every database interaction goes through this module. This keeps SQL
// contained in one place and gives the rest of the app clean Rust interfaces.

use anyhow::{Context, Result};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::models::RunSummary;
use crate::models::{
    ComparisonOutcome, ComparisonResult, CorrectedTest, FactionId, GroupStat,
};
use crate::pipeline::run::AnalysisOutput;
use crate::stats::significance::TestKind;

// --- Runs ---

/// Store a complete run (header, group stats, comparisons) in one
/// transaction. Returns the new run id.
pub fn save_run(conn: &Connection, output: &AnalysisOutput, note: Option<&str>) -> Result<i64> {
    let config_json = serde_json::to_string(&output.config)?;
    let merge_json = serde_json::to_string(&output.merge_report)?;
    let consolidation_json = serde_json::to_string(&output.consolidation_report)?;

    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT INTO runs (mapping_version, test_kind, correction, faction_a, faction_b,
                           by_year, merged_records, config_json, merge_report_json,
                           consolidation_report_json, note)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            output.mapping_version,
            output.config.test.as_str(),
            output.config.correction.as_str(),
            output.request.faction_a.0,
            output.request.faction_b.0,
            output.request.by_year,
            output.merged_records as i64,
            config_json,
            merge_json,
            consolidation_json,
            note,
        ],
    )?;
    let run_id = tx.last_insert_rowid();

    {
        let mut stmt = tx.prepare(
            "INSERT INTO group_stats (run_id, faction_id, topic, year, n, mean_sentiment,
                                      variance, low_confidence)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for stat in &output.group_stats {
            stmt.execute(params![
                run_id,
                stat.faction_id.map(|f| f.0),
                stat.topic,
                stat.year,
                stat.n as i64,
                stat.mean_sentiment,
                stat.variance,
                stat.low_confidence,
            ])?;
        }
    }

    {
        let mut stmt = tx.prepare(
            "INSERT INTO comparisons (run_id, topic, year, faction_a, faction_b, n_a, n_b,
                                      mean_a, mean_b, mean_diff, test_kind, status,
                                      statistic, p_value, adjusted_p_value, significant)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        )?;
        for cmp in &output.comparisons {
            let test = cmp.outcome.test();
            stmt.execute(params![
                run_id,
                cmp.topic,
                cmp.year,
                cmp.faction_a.0,
                cmp.faction_b.0,
                cmp.n_a as i64,
                cmp.n_b as i64,
                cmp.mean_a,
                cmp.mean_b,
                cmp.mean_diff,
                cmp.test_kind.as_str(),
                cmp.outcome.as_str(),
                test.map(|t| t.statistic()),
                test.map(|t| t.p_value()),
                test.map(|t| t.adjusted_p_value()),
                test.map(|t| t.significant()),
            ])?;
        }
    }

    tx.commit().context("Failed to commit analysis run")?;
    Ok(run_id)
}

const RUN_COLUMNS: &str = "r.id, r.created_at, r.mapping_version, r.test_kind, r.correction,
    r.faction_a, r.faction_b, r.by_year, r.merged_records, r.note,
    r.merge_report_json, r.consolidation_report_json,
    (SELECT COUNT(*) FROM comparisons c WHERE c.run_id = r.id AND c.status = 'tested'),
    (SELECT COUNT(*) FROM comparisons c WHERE c.run_id = r.id AND c.significant = 1)";

/// Most recent runs first.
pub fn list_runs(conn: &Connection, limit: u32) -> Result<Vec<RunSummary>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RUN_COLUMNS} FROM runs r ORDER BY r.id DESC LIMIT ?1"
    ))?;
    let rows = stmt.query_map(params![limit], row_to_run)?;

    let mut runs = Vec::new();
    for row in rows {
        runs.push(row?);
    }
    Ok(runs)
}

pub fn get_run(conn: &Connection, run_id: i64) -> Result<Option<RunSummary>> {
    let mut stmt = conn.prepare(&format!("SELECT {RUN_COLUMNS} FROM runs r WHERE r.id = ?1"))?;
    let run = stmt.query_row(params![run_id], row_to_run).optional()?;
    Ok(run)
}

pub fn get_latest_run(conn: &Connection) -> Result<Option<RunSummary>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RUN_COLUMNS} FROM runs r ORDER BY r.id DESC LIMIT 1"
    ))?;
    let run = stmt.query_row([], row_to_run).optional()?;
    Ok(run)
}

pub fn run_count(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?;
    Ok(count)
}

fn row_to_run(row: &Row<'_>) -> rusqlite::Result<RunSummary> {
    let merge_json: String = row.get(10)?;
    let consolidation_json: String = row.get(11)?;
    let merged_records: i64 = row.get(8)?;
    let tested: i64 = row.get(12)?;
    let significant: i64 = row.get(13)?;

    Ok(RunSummary {
        id: row.get(0)?,
        created_at: row.get(1)?,
        mapping_version: row.get(2)?,
        test_kind: row.get(3)?,
        correction: row.get(4)?,
        faction_a: FactionId(row.get(5)?),
        faction_b: FactionId(row.get(6)?),
        by_year: row.get(7)?,
        merged_records: merged_records as usize,
        note: row.get(9)?,
        merge_report: serde_json::from_str(&merge_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(10, Type::Text, Box::new(e)))?,
        consolidation_report: serde_json::from_str(&consolidation_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(11, Type::Text, Box::new(e)))?,
        tested: tested as usize,
        significant: significant as usize,
    })
}

// --- Group stats ---

/// Group statistics of one run, in the order they were computed.
pub fn get_group_stats(conn: &Connection, run_id: i64) -> Result<Vec<GroupStat>> {
    let mut stmt = conn.prepare(
        "SELECT faction_id, topic, year, n, mean_sentiment, variance, low_confidence
         FROM group_stats WHERE run_id = ?1 ORDER BY rowid",
    )?;
    let rows = stmt.query_map(params![run_id], |row| {
        let faction: Option<i32> = row.get(0)?;
        let n: i64 = row.get(3)?;
        Ok(GroupStat {
            faction_id: faction.map(FactionId),
            topic: row.get(1)?,
            year: row.get(2)?,
            n: n as usize,
            mean_sentiment: row.get(4)?,
            variance: row.get(5)?,
            low_confidence: row.get(6)?,
        })
    })?;

    let mut stats = Vec::new();
    for row in rows {
        stats.push(row?);
    }
    Ok(stats)
}

// --- Comparisons ---

/// Comparisons of one run, in the order they were reported.
pub fn get_comparisons(conn: &Connection, run_id: i64) -> Result<Vec<ComparisonResult>> {
    let mut stmt = conn.prepare(
        "SELECT topic, year, faction_a, faction_b, n_a, n_b, mean_a, mean_b, mean_diff,
                test_kind, status, statistic, p_value, adjusted_p_value, significant
         FROM comparisons WHERE run_id = ?1 ORDER BY rowid",
    )?;
    let rows = stmt.query_map(params![run_id], row_to_comparison)?;

    let mut comparisons = Vec::new();
    for row in rows {
        comparisons.push(row?);
    }
    Ok(comparisons)
}

fn row_to_comparison(row: &Row<'_>) -> rusqlite::Result<ComparisonResult> {
    let test_kind: String = row.get(9)?;
    let test_kind: TestKind = test_kind
        .parse()
        .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(9, Type::Text, e.into()))?;

    let status: String = row.get(10)?;
    let outcome = match status.as_str() {
        "tested" => ComparisonOutcome::Tested(CorrectedTest::from_stored(
            row.get(11)?,
            row.get(12)?,
            row.get(13)?,
            row.get(14)?,
        )),
        "insufficient_sample" => ComparisonOutcome::InsufficientSample,
        "undefined" => ComparisonOutcome::Undefined,
        other => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                10,
                Type::Text,
                format!("unknown comparison status '{other}'").into(),
            ))
        }
    };

    let n_a: i64 = row.get(4)?;
    let n_b: i64 = row.get(5)?;
    Ok(ComparisonResult {
        topic: row.get(0)?,
        year: row.get(1)?,
        faction_a: FactionId(row.get(2)?),
        faction_b: FactionId(row.get(3)?),
        n_a: n_a as usize,
        n_b: n_b as usize,
        mean_a: row.get(6)?,
        mean_b: row.get(7)?,
        mean_diff: row.get(8)?,
        test_kind,
        outcome,
    })
}
