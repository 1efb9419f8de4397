// Comparator — faction A vs faction B per curated topic (and year).
//
// Steps:
//   1. Partition records into (topic, year) cells, splitting each cell into
//      faction A's and faction B's sentiment.
//   2. Run the configured two-sample test in every cell.
//   3. Correct all computed p-values of the run as one family.
//   4. Sort by adjusted p-value, untested cells last.
//
// Cells where a test cannot run are kept in the output with a distinct
// outcome so the report shows what was not tested and why. They are not
// part of the correction family.

use std::collections::{BTreeMap, BTreeSet};

use tracing::info;

use super::correction::adjust;
use super::significance::{run_test, TestOutcome};
use super::summarize;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::models::{
    ComparisonOutcome, ComparisonResult, CorrectedTest, FactionId, MergedRecord,
    SentimentCategory,
};

type Cell = (String, Option<i32>);

#[derive(Default)]
struct Split {
    a: Vec<SentimentCategory>,
    b: Vec<SentimentCategory>,
}

/// Compare two factions on every curated topic, optionally per year.
pub fn compare(
    records: &[MergedRecord],
    faction_a: FactionId,
    faction_b: FactionId,
    by_year: bool,
    config: &AnalysisConfig,
) -> Result<Vec<ComparisonResult>, AnalysisError> {
    if faction_a == faction_b {
        return Err(AnalysisError::InvalidConfig(format!(
            "cannot compare {faction_a} with itself"
        )));
    }

    let relevant: Vec<&MergedRecord> = records
        .iter()
        .filter(|r| r.faction_id == faction_a || r.faction_id == faction_b)
        .collect();

    let mut topics: BTreeSet<String> = config
        .mapping
        .curated_labels()
        .into_iter()
        .map(str::to_string)
        .collect();
    topics.extend(relevant.iter().map(|r| r.topic.clone()));

    let years: Vec<Option<i32>> = if by_year {
        let observed: BTreeSet<i32> = relevant.iter().map(|r| r.year).collect();
        observed.into_iter().map(Some).collect()
    } else {
        vec![None]
    };

    let mut cells: BTreeMap<Cell, Split> = BTreeMap::new();
    for topic in &topics {
        for year in &years {
            cells.insert((topic.clone(), *year), Split::default());
        }
    }
    for record in relevant {
        let key = (record.topic.clone(), by_year.then_some(record.year));
        let split = cells.entry(key).or_default();
        if record.faction_id == faction_a {
            split.a.push(record.sentiment);
        } else {
            split.b.push(record.sentiment);
        }
    }

    let tested: Vec<(Cell, Split, TestOutcome)> = cells
        .into_iter()
        .map(|(cell, split)| {
            let outcome = run_test(config.test, &split.a, &split.b);
            (cell, split, outcome)
        })
        .collect();

    // The correction family is every computed test of this run.
    let family: Vec<f64> = tested
        .iter()
        .filter_map(|(_, _, outcome)| match outcome {
            TestOutcome::Computed(raw) => Some(raw.p_value),
            _ => None,
        })
        .collect();
    let mut adjusted = adjust(&family, config.correction).into_iter();

    let mut results: Vec<ComparisonResult> = tested
        .into_iter()
        .map(|((topic, year), split, outcome)| {
            let values_a: Vec<f64> = split.a.iter().map(SentimentCategory::as_f64).collect();
            let values_b: Vec<f64> = split.b.iter().map(SentimentCategory::as_f64).collect();
            let (sa, sb) = (summarize(&values_a), summarize(&values_b));

            let outcome = match outcome {
                TestOutcome::Computed(raw) => {
                    // One adjusted value per computed test, in the same order
                    let adjusted_p = adjusted.next().unwrap_or(1.0);
                    ComparisonOutcome::Tested(CorrectedTest::new(
                        raw.statistic,
                        raw.p_value,
                        adjusted_p,
                        config.alpha,
                    ))
                }
                TestOutcome::InsufficientSample => ComparisonOutcome::InsufficientSample,
                TestOutcome::Undefined => ComparisonOutcome::Undefined,
            };

            ComparisonResult {
                topic,
                year,
                faction_a,
                faction_b,
                n_a: sa.n,
                n_b: sb.n,
                mean_a: sa.mean,
                mean_b: sb.mean,
                mean_diff: sa.mean.zip(sb.mean).map(|(a, b)| a - b),
                test_kind: config.test,
                outcome,
            }
        })
        .collect();

    sort_for_report(&mut results);

    info!(
        faction_a = %faction_a,
        faction_b = %faction_b,
        test = %config.test,
        correction = %config.correction,
        cells = results.len(),
        tested = family.len(),
        significant = results
            .iter()
            .filter(|r| r.outcome.test().is_some_and(CorrectedTest::significant))
            .count(),
        "Compared factions"
    );

    Ok(results)
}

/// Adjusted p ascending, untested cells last, ties by topic then year.
fn sort_for_report(results: &mut [ComparisonResult]) {
    results.sort_by(|x, y| {
        let px = x.outcome.test().map(CorrectedTest::adjusted_p_value);
        let py = y.outcome.test().map(CorrectedTest::adjusted_p_value);
        let by_p = match (px, py) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        };
        by_p.then_with(|| x.topic.cmp(&y.topic))
            .then_with(|| x.year.cmp(&y.year))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, faction: FactionId, topic: &str, year: i32, s: i64) -> MergedRecord {
        MergedRecord {
            id: id.into(),
            faction_id: faction,
            year,
            topic: topic.to_string(),
            sentiment: SentimentCategory::from_value(s).unwrap(),
        }
    }

    #[test]
    fn test_same_faction_is_rejected() {
        let config = AnalysisConfig::default();
        assert!(compare(&[], FactionId::SPD, FactionId::SPD, false, &config).is_err());
    }

    #[test]
    fn test_every_curated_topic_is_reported() {
        let config = AnalysisConfig::default();
        let results = compare(&[], FactionId::CDU, FactionId::SPD, false, &config).unwrap();
        assert_eq!(results.len(), 8);
        assert!(results
            .iter()
            .all(|r| r.outcome == ComparisonOutcome::InsufficientSample));
        assert!(results.iter().all(|r| r.mean_diff.is_none()));
    }

    #[test]
    fn test_tested_results_sort_before_untested() {
        let config = AnalysisConfig::default();
        let topic = "Wirtschaft & Arbeitsmarkt";
        let mut records = Vec::new();
        for i in 0..4 {
            records.push(record(i, FactionId::CDU, topic, 2010, 1));
            records.push(record(100 + i, FactionId::SPD, topic, 2010, (i % 2) as i64));
        }
        let results = compare(&records, FactionId::CDU, FactionId::SPD, false, &config).unwrap();
        assert_eq!(results[0].topic, topic);
        assert!(results[0].outcome.test().is_some());
        assert!(results[1..].iter().all(|r| r.outcome.test().is_none()));
    }

    #[test]
    fn test_by_year_splits_cells() {
        let config = AnalysisConfig::default();
        let topic = "Wirtschaft & Arbeitsmarkt";
        let records = vec![
            record(1, FactionId::CDU, topic, 2010, 1),
            record(2, FactionId::SPD, topic, 2011, -1),
        ];
        let results = compare(&records, FactionId::CDU, FactionId::SPD, true, &config).unwrap();
        // 8 topics x 2 observed years
        assert_eq!(results.len(), 16);
        let cell_2010 = results
            .iter()
            .find(|r| r.topic == topic && r.year == Some(2010))
            .unwrap();
        assert_eq!((cell_2010.n_a, cell_2010.n_b), (1, 0));
    }

    #[test]
    fn test_other_factions_are_ignored() {
        let config = AnalysisConfig::default();
        let topic = "Wirtschaft & Arbeitsmarkt";
        let records = vec![record(1, FactionId(13), topic, 2010, 1)];
        let results = compare(&records, FactionId::CDU, FactionId::SPD, false, &config).unwrap();
        let cell = results.iter().find(|r| r.topic == topic).unwrap();
        assert_eq!((cell.n_a, cell.n_b), (0, 0));
    }
}
