// Topic Filter/Consolidator — applies the curated topic mapping.
//
// The whole input is checked against the mapping before anything is
// produced: one unmapped raw id means the mapping was authored against a
// different topic model run, and treating those documents as dropped
// would lose data without anyone noticing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::AnalysisError;
use crate::models::{JoinedRecord, MergedRecord};
use crate::topics::mapping::{MappedTopic, TopicMapping};

/// Sample accounting for the consolidation step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationReport {
    pub mapping_version: String,
    pub input: usize,
    pub kept: usize,
    /// Records whose raw topic maps to DROPPED
    pub dropped_topic: usize,
    /// Dropped records per raw topic id
    pub dropped_by_raw_topic: BTreeMap<u32, usize>,
}

#[derive(Debug, Clone)]
pub struct Consolidated {
    pub records: Vec<MergedRecord>,
    pub report: ConsolidationReport,
}

/// Map every record's raw topic onto the curated taxonomy.
pub fn consolidate(
    records: &[JoinedRecord],
    mapping: &TopicMapping,
) -> Result<Consolidated, AnalysisError> {
    mapping.check_raw_ids(records.iter().map(|r| r.raw_topic_id))?;

    let mut kept = Vec::with_capacity(records.len());
    let mut dropped_by_raw_topic: BTreeMap<u32, usize> = BTreeMap::new();

    for record in records {
        match mapping.resolve(record.raw_topic_id) {
            MappedTopic::Curated(label) => kept.push(MergedRecord {
                id: record.id.clone(),
                faction_id: record.faction_id,
                year: record.year,
                topic: label.to_string(),
                sentiment: record.sentiment,
            }),
            MappedTopic::Dropped => {
                *dropped_by_raw_topic.entry(record.raw_topic_id).or_insert(0) += 1;
            }
            // Ruled out by the check above
            MappedTopic::Unmapped => {}
        }
    }

    let report = ConsolidationReport {
        mapping_version: mapping.version().to_string(),
        input: records.len(),
        kept: kept.len(),
        dropped_topic: dropped_by_raw_topic.values().sum(),
        dropped_by_raw_topic,
    };

    info!(
        mapping = %report.mapping_version,
        input = report.input,
        kept = report.kept,
        dropped = report.dropped_topic,
        "Consolidated topics"
    );
    if report.input > 0 && report.kept == 0 {
        warn!("Every record was dropped by the topic mapping");
    }

    Ok(Consolidated {
        records: kept,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FactionId, SentimentCategory};

    fn joined(id: u64, raw: u32) -> JoinedRecord {
        JoinedRecord {
            id: id.into(),
            faction_id: FactionId::CDU,
            year: 2010,
            raw_topic_id: raw,
            sentiment: SentimentCategory::Neutral,
        }
    }

    fn mapping() -> TopicMapping {
        TopicMapping::new(
            "test-v1",
            BTreeMap::from([(1, Some("Economy".to_string())), (2, None)]),
        )
        .unwrap()
    }

    #[test]
    fn test_maps_and_drops() {
        let out = consolidate(&[joined(1, 1), joined(2, 2), joined(3, 1)], &mapping()).unwrap();
        assert_eq!(out.records.len(), 2);
        assert!(out.records.iter().all(|r| r.topic == "Economy"));
        assert_eq!(out.report.dropped_topic, 1);
        assert_eq!(out.report.dropped_by_raw_topic[&2], 1);
        assert_eq!(out.report.mapping_version, "test-v1");
    }

    #[test]
    fn test_unmapped_fails_before_output() {
        let err = consolidate(&[joined(1, 1), joined(2, 7), joined(3, 9)], &mapping()).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::UnmappedTopic {
                raw_topic_ids: vec![7, 9],
                version: "test-v1".to_string(),
            }
        );
    }

    #[test]
    fn test_empty_input() {
        let out = consolidate(&[], &mapping()).unwrap();
        assert!(out.records.is_empty());
        assert_eq!(out.report.input, 0);
    }
}
