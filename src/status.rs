// System status display — inputs, results DB size, stored runs.

use anyhow::Result;
use std::path::Path;

use crate::config::Config;
use crate::db;
use crate::db::queries;

/// Display system status to the terminal.
pub fn show(config: &Config) -> Result<()> {
    // Inputs
    for (label, path) in [
        ("Speeches", &config.speeches_path),
        ("Topics", &config.topics_path),
        ("Sentiment", &config.sentiment_path),
    ] {
        match path {
            Some(p) if p.exists() => println!("{label}: {} ({})", p.display(), file_size(p)),
            Some(p) => println!("{label}: {} (missing)", p.display()),
            None => println!("{label}: not configured"),
        }
    }

    match &config.mapping_path {
        Some(p) => println!("Mapping: {}", p.display()),
        None => println!(
            "Mapping: built-in {}",
            config.analysis.mapping.version()
        ),
    }

    let db_path = &config.db_path;
    if !Path::new(db_path).exists() {
        println!("Database: not initialized");
        println!("\nRun `parlsent init` to set up the database.");
        return Ok(());
    }
    println!("Database: {} ({})", db_path, file_size(Path::new(db_path)));

    let conn = db::open(db_path)?;
    println!("Stored runs: {}", queries::run_count(&conn)?);

    match queries::get_latest_run(&conn)? {
        Some(run) => {
            println!(
                "Latest run: #{} at {} ({} records, {}/{} significant, mapping {})",
                run.id,
                run.created_at,
                run.merged_records,
                run.significant,
                run.tested,
                run.mapping_version
            );
        }
        None => {
            println!("Latest run: none");
            println!("  Run `parlsent run` to analyze and store results");
        }
    }

    Ok(())
}

fn file_size(path: &Path) -> String {
    std::fs::metadata(path)
        .map(|m| format_bytes(m.len()))
        .unwrap_or_else(|_| "unknown".to_string())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
