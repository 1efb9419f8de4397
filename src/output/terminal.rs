// Colored terminal output for sample accounting and results tables.
//
// This module handles all terminal-specific formatting: colors and tables.
// The main.rs command handlers delegate here.

use colored::Colorize;

use super::{format_optional, format_p_value, truncate_chars};
use crate::db::models::RunSummary;
use crate::models::{ComparisonOutcome, ComparisonResult, FactionId, GroupStat};
use crate::pipeline::consolidate::ConsolidationReport;
use crate::pipeline::merge::MergeReport;
use crate::topics::mapping::TopicMapping;

const TOPIC_WIDTH: usize = 30;

/// Display the merge step's sample accounting.
pub fn display_merge_report(report: &MergeReport) {
    println!("\n{}", "=== Merge ===".bold());
    println!(
        "  Inputs: {} speeches, {} topic assignments, {} sentiment scores",
        report.speeches_in, report.topics_in, report.sentiments_in
    );
    println!("  Distinct document ids: {}", report.union_ids);
    println!("  Survivors: {}", report.survivors.to_string().green());

    let excluded = report.exclusions.nonzero();
    if excluded.is_empty() {
        println!("  Excluded: none");
    } else {
        println!("  Excluded: {}", report.exclusions.total().to_string().yellow());
        for (reason, count) in excluded {
            println!("    {:<30} {:>8}", reason.as_str().dimmed(), count);
        }
    }

    if !report.is_conserved() {
        println!(
            "  {} survivors + exclusions != distinct ids",
            "!!".red().bold()
        );
    }
}

/// Display the consolidation step's sample accounting.
pub fn display_consolidation_report(report: &ConsolidationReport) {
    println!(
        "\n{}",
        format!("=== Topic consolidation ({}) ===", report.mapping_version).bold()
    );
    println!("  Input: {}", report.input);
    println!("  Kept: {}", report.kept.to_string().green());
    println!("  Dropped topic: {}", report.dropped_topic);
    for (raw, count) in &report.dropped_by_raw_topic {
        println!("    raw topic {:<3} {:>8}", raw, count.to_string().dimmed());
    }
    if report.input > 0 && report.kept == 0 {
        println!(
            "  {} every record was dropped by the mapping",
            "!".bright_red()
        );
    }
}

/// Display descriptive statistics, one row per group.
pub fn display_group_stats(stats: &[GroupStat]) {
    if stats.is_empty() {
        println!("No groups to display.");
        return;
    }

    println!(
        "\n{}",
        format!("=== Sentiment by group ({} groups) ===", stats.len()).bold()
    );
    println!();
    println!(
        "  {:<10} {:<w$} {:>6} {:>7} {:>7} {:>8}",
        "Faction".dimmed(),
        "Topic".dimmed(),
        "Year".dimmed(),
        "n".dimmed(),
        "Mean".dimmed(),
        "Var".dimmed(),
        w = TOPIC_WIDTH + 3,
    );
    println!("  {}", "-".repeat(TOPIC_WIDTH + 46).dimmed());

    let mut low = 0;
    for stat in stats {
        let faction = stat
            .faction_id
            .map(|f| f.to_string())
            .unwrap_or_else(|| "*".to_string());
        let topic = stat
            .topic
            .as_deref()
            .map(|t| truncate_chars(t, TOPIC_WIDTH))
            .unwrap_or_else(|| "*".to_string());
        let year = stat
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "*".to_string());

        let line = format!(
            "  {:<10} {:<w$} {:>6} {:>7} {:>7} {:>8}",
            faction,
            topic,
            year,
            stat.n,
            format_optional(stat.mean_sentiment, 3),
            format_optional(stat.variance, 3),
            w = TOPIC_WIDTH + 3,
        );
        if stat.low_confidence {
            low += 1;
            println!("{}", line.dimmed());
        } else {
            println!("{line}");
        }
    }

    println!();
    if low > 0 {
        println!(
            "  {} {} groups below the minimum size (dimmed)",
            "~".yellow(),
            low
        );
    }
}

/// Display pairwise comparisons, most significant first.
pub fn display_comparisons(results: &[ComparisonResult]) {
    let Some(first) = results.first() else {
        println!("No comparisons to display.");
        return;
    };

    println!(
        "\n{}",
        format!(
            "=== {} vs {} ({}) ===",
            first.faction_a, first.faction_b, first.test_kind
        )
        .bold()
    );
    println!();
    println!(
        "  {:<w$} {:>6} {:>6} {:>6} {:>7} {:>9} {:>8} {:>8}",
        "Topic".dimmed(),
        "Year".dimmed(),
        "n_a".dimmed(),
        "n_b".dimmed(),
        "Diff".dimmed(),
        "Stat".dimmed(),
        "p".dimmed(),
        "p_adj".dimmed(),
        w = TOPIC_WIDTH + 3,
    );
    println!("  {}", "-".repeat(TOPIC_WIDTH + 60).dimmed());

    for r in results {
        let topic = truncate_chars(&r.topic, TOPIC_WIDTH);
        let year = r.year.map(|y| y.to_string()).unwrap_or_else(|| "all".to_string());
        let prefix = format!(
            "  {:<w$} {:>6} {:>6} {:>6} {:>7}",
            topic,
            year,
            r.n_a,
            r.n_b,
            format_optional(r.mean_diff, 3),
            w = TOPIC_WIDTH + 3,
        );

        match &r.outcome {
            ComparisonOutcome::Tested(test) => {
                let adjusted = format!("{:>8}", format_p_value(test.adjusted_p_value()));
                let adjusted = if test.significant() {
                    adjusted.red().bold()
                } else {
                    adjusted.normal()
                };
                println!(
                    "{} {:>9.3} {:>8} {}",
                    prefix,
                    test.statistic(),
                    format_p_value(test.p_value()),
                    adjusted
                );
            }
            other => println!("{} {}", prefix, format!("{:>26}", other.as_str()).dimmed()),
        }
    }

    println!();

    let tested = results.iter().filter(|r| r.outcome.test().is_some()).count();
    let significant = results
        .iter()
        .filter_map(|r| r.outcome.test())
        .filter(|t| t.significant())
        .count();
    println!(
        "  {} of {} tested comparisons significant after correction",
        significant, tested
    );
    if tested < results.len() {
        println!(
            "  {} {} cells without a test result",
            "~".yellow(),
            results.len() - tested
        );
    }
}

/// Display a topic mapping table.
pub fn display_mapping(mapping: &TopicMapping) {
    println!(
        "\n{}",
        format!("=== Topic mapping {} ===", mapping.version()).bold()
    );
    println!();
    for (raw, label) in mapping.entries() {
        match label {
            Some(label) => println!("  {:>3}  {}", raw, label),
            None => println!("  {:>3}  {}", raw, "DROPPED".dimmed()),
        }
    }
    println!();
    println!(
        "  {} curated topics",
        mapping.curated_labels().len().to_string().bold()
    );
}

/// Display stored runs, newest first.
pub fn display_run_history(runs: &[RunSummary]) {
    if runs.is_empty() {
        println!("No runs stored yet. Run `parlsent run` first.");
        return;
    }

    println!("\n{}", format!("=== Runs ({}) ===", runs.len()).bold());
    println!();
    println!(
        "  {:>4}  {:<19}  {:<24} {:<22} {:>8}  {:>9}",
        "Id".dimmed(),
        "Created".dimmed(),
        "Mapping".dimmed(),
        "Comparison".dimmed(),
        "Records".dimmed(),
        "Sig/Test".dimmed(),
    );
    println!("  {}", "-".repeat(96).dimmed());

    for run in runs {
        let pair = format!(
            "{} vs {}",
            faction_label(run.faction_a),
            faction_label(run.faction_b)
        );
        println!(
            "  {:>4}  {:<19}  {:<24} {:<22} {:>8}  {:>9}",
            run.id,
            run.created_at,
            truncate_chars(&run.mapping_version, 21),
            pair,
            run.merged_records,
            format!("{}/{}", run.significant, run.tested),
        );
        if let Some(note) = &run.note {
            println!("        {}", note.dimmed());
        }
    }
    println!();
}

fn faction_label(faction: FactionId) -> String {
    match faction.name() {
        Some(name) => name.to_string(),
        None => faction.0.to_string(),
    }
}
