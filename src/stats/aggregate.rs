// Aggregator — descriptive sentiment statistics per (faction, topic, year).
//
// The output grid is the full cross product of the requested key domains,
// not just the groups that happen to have records. A faction that never
// spoke on a topic shows up as n = 0 with no mean, which is different from
// a faction whose speeches average out to neutral.

use std::collections::{BTreeMap, BTreeSet};

use tracing::info;

use super::summarize;
use crate::config::AnalysisConfig;
use crate::models::{FactionId, GroupStat, GroupingKeys, MergedRecord};

type GroupKey = (Option<FactionId>, Option<String>, Option<i32>);

/// Group records by the requested keys and summarize each group.
///
/// Domains: configured factions plus any present in the records, the
/// mapping's curated labels plus any present, and the years observed in the
/// records. Output is sorted by (faction, topic, year).
pub fn aggregate(
    records: &[MergedRecord],
    keys: GroupingKeys,
    config: &AnalysisConfig,
) -> Vec<GroupStat> {
    let factions: Vec<Option<FactionId>> = if keys.faction {
        let mut domain: BTreeSet<FactionId> = config.factions.clone();
        domain.extend(records.iter().map(|r| r.faction_id));
        domain.into_iter().map(Some).collect()
    } else {
        vec![None]
    };

    let topics: Vec<Option<String>> = if keys.topic {
        let mut domain: BTreeSet<String> = config
            .mapping
            .curated_labels()
            .into_iter()
            .map(str::to_string)
            .collect();
        domain.extend(records.iter().map(|r| r.topic.clone()));
        domain.into_iter().map(Some).collect()
    } else {
        vec![None]
    };

    let years: Vec<Option<i32>> = if keys.year {
        let domain: BTreeSet<i32> = records.iter().map(|r| r.year).collect();
        domain.into_iter().map(Some).collect()
    } else {
        vec![None]
    };

    let mut groups: BTreeMap<GroupKey, Vec<f64>> = BTreeMap::new();
    for faction in &factions {
        for topic in &topics {
            for year in &years {
                groups.insert((*faction, topic.clone(), *year), Vec::new());
            }
        }
    }

    for record in records {
        let key = (
            keys.faction.then_some(record.faction_id),
            keys.topic.then(|| record.topic.clone()),
            keys.year.then_some(record.year),
        );
        groups.entry(key).or_default().push(record.sentiment.as_f64());
    }

    let stats: Vec<GroupStat> = groups
        .into_iter()
        .map(|((faction_id, topic, year), values)| {
            let summary = summarize(&values);
            GroupStat {
                faction_id,
                topic,
                year,
                n: summary.n,
                mean_sentiment: summary.mean,
                variance: summary.variance,
                low_confidence: summary.n < config.min_group_size,
            }
        })
        .collect();

    info!(
        keys = %keys,
        groups = stats.len(),
        empty = stats.iter().filter(|s| s.n == 0).count(),
        low_confidence = stats.iter().filter(|s| s.low_confidence).count(),
        "Aggregated sentiment"
    );

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SentimentCategory;

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
    fn test_mean_and_variance_per_group() {
        let config = AnalysisConfig::default();
        let label = "Haushalt & Finanzpolitik";
        let records = vec![
            record(1, FactionId::SPD, label, 2010, 1),
            record(2, FactionId::SPD, label, 2010, -1),
            record(3, FactionId::SPD, label, 2010, 0),
        ];
        let stats = aggregate(&records, GroupingKeys::FACTION_TOPIC, &config);
        let spd = stats
            .iter()
            .find(|s| s.faction_id == Some(FactionId::SPD) && s.topic.as_deref() == Some(label))
            .unwrap();
        assert_eq!(spd.n, 3);
        assert!((spd.mean_sentiment.unwrap() - 0.0).abs() < 1e-12);
        assert!((spd.variance.unwrap() - 1.0).abs() < 1e-12);
        assert!(spd.low_confidence, "3 < default minimum of 5");
    }

    #[test]
    fn test_full_grid_includes_empty_groups() {
        let config = AnalysisConfig::default();
        let records = vec![record(1, FactionId::CDU, "Haushalt & Finanzpolitik", 2005, 1)];
        let stats = aggregate(&records, GroupingKeys::FACTION_TOPIC, &config);
        // 2 factions x 8 curated labels
        assert_eq!(stats.len(), 16);
        let empty: Vec<&GroupStat> = stats.iter().filter(|s| s.n == 0).collect();
        assert_eq!(empty.len(), 15);
        for s in empty {
            assert!(s.mean_sentiment.is_none());
            assert!(s.variance.is_none());
            assert!(s.low_confidence);
        }
    }

    #[test]
    fn test_omitted_keys_are_none() {
        let config = AnalysisConfig::default();
        let records = vec![
            record(1, FactionId::CDU, "Haushalt & Finanzpolitik", 2005, 1),
            record(2, FactionId::SPD, "Wirtschaft & Arbeitsmarkt", 2006, -1),
        ];
        let keys = GroupingKeys {
            faction: false,
            topic: false,
            year: true,
        };
        let stats = aggregate(&records, keys, &config);
        assert_eq!(stats.len(), 2);
        assert!(stats.iter().all(|s| s.faction_id.is_none() && s.topic.is_none()));
        assert_eq!(stats[0].year, Some(2005));
        assert_eq!(stats[1].year, Some(2006));
    }

    #[test]
    fn test_no_keys_gives_one_overall_group() {
        let config = AnalysisConfig::default();
        let records = vec![
            record(1, FactionId::CDU, "Haushalt & Finanzpolitik", 2005, 1),
            record(2, FactionId::SPD, "Wirtschaft & Arbeitsmarkt", 2006, 1),
        ];
        let keys = GroupingKeys {
            faction: false,
            topic: false,
            year: false,
        };
        let stats = aggregate(&records, keys, &config);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].n, 2);
        assert_eq!(stats[0].mean_sentiment, Some(1.0));
    }
}
