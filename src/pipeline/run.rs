// Full analysis run: load inputs, merge, consolidate, aggregate, compare.
//
// Every stage after loading is a pure function of the materialized inputs
// and the AnalysisConfig, so two runs over the same snapshots produce the
// same output.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::consolidate::{consolidate, ConsolidationReport};
use super::merge::{merge, MergeReport};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::models::{
    ComparisonResult, FactionId, GroupStat, GroupingKeys, MergedRecord, SentimentScore,
    SpeechRecord, TopicAssignment,
};
use crate::sentiment::traits::SentimentScoreProvider;
use crate::speeches::store::SpeechSource;
use crate::stats::aggregate::aggregate;
use crate::stats::compare::compare;
use crate::topics::traits::TopicAssignmentProvider;

/// The three upstream snapshots, fully loaded.
#[derive(Debug, Clone, Default)]
pub struct AnalysisInputs {
    pub speeches: Vec<SpeechRecord>,
    pub topics: Vec<TopicAssignment>,
    pub sentiments: Vec<SentimentScore>,
}

impl AnalysisInputs {
    /// Load all three sources.
    pub fn collect(
        speeches: &dyn SpeechSource,
        topics: &dyn TopicAssignmentProvider,
        sentiments: &dyn SentimentScoreProvider,
    ) -> Result<Self> {
        Ok(Self {
            speeches: Self::collect_speeches(speeches)?,
            topics: Self::collect_topics(topics)?,
            sentiments: Self::collect_sentiments(sentiments)?,
        })
    }

    pub fn collect_speeches(source: &dyn SpeechSource) -> Result<Vec<SpeechRecord>> {
        source
            .speeches()
            .with_context(|| format!("Failed to load speeches from {}", source.describe()))
    }

    pub fn collect_topics(source: &dyn TopicAssignmentProvider) -> Result<Vec<TopicAssignment>> {
        source.assignments().with_context(|| {
            format!("Failed to load topic assignments from {}", source.describe())
        })
    }

    pub fn collect_sentiments(
        source: &dyn SentimentScoreProvider,
    ) -> Result<Vec<SentimentScore>> {
        source.scores().with_context(|| {
            format!("Failed to load sentiment scores from {}", source.describe())
        })
    }
}

/// Records ready for analysis plus the accounting of how they got there.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub records: Vec<MergedRecord>,
    pub merge_report: MergeReport,
    pub consolidation_report: ConsolidationReport,
}

impl Prepared {
    /// Every document in the input union is either analyzed, excluded by
    /// the merge, or dropped by the mapping.
    pub fn is_conserved(&self) -> bool {
        self.records.len()
            + self.merge_report.exclusions.total()
            + self.consolidation_report.dropped_topic
            == self.merge_report.union_ids
    }
}

/// Validate the config, then merge and consolidate.
///
/// Every raw topic id in the topic assignments must be covered by the
/// mapping, including ids on documents the merge later excludes.
pub fn prepare(inputs: &AnalysisInputs, config: &AnalysisConfig) -> Result<Prepared, AnalysisError> {
    config.validate()?;
    config
        .mapping
        .check_raw_ids(inputs.topics.iter().map(|t| t.raw_topic_id))?;
    let merged = merge(&inputs.speeches, &inputs.topics, &inputs.sentiments, config);
    let consolidated = consolidate(&merged.records, &config.mapping)?;
    Ok(Prepared {
        records: consolidated.records,
        merge_report: merged.report,
        consolidation_report: consolidated.report,
    })
}

/// Which factions to compare and how to slice the results.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    pub faction_a: FactionId,
    pub faction_b: FactionId,
    /// Compare per (topic, year) instead of per topic
    pub by_year: bool,
    /// Keys for the descriptive statistics table
    pub grouping: GroupingKeys,
}

impl Default for RunRequest {
    fn default() -> Self {
        Self {
            faction_a: FactionId::CDU,
            faction_b: FactionId::SPD,
            by_year: false,
            grouping: GroupingKeys::FACTION_TOPIC_YEAR,
        }
    }
}

/// Everything one run produces, in its output-contract form.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutput {
    pub mapping_version: String,
    pub config: AnalysisConfig,
    pub request: RunRequest,
    pub merged_records: usize,
    pub merge_report: MergeReport,
    pub consolidation_report: ConsolidationReport,
    pub group_stats: Vec<GroupStat>,
    pub comparisons: Vec<ComparisonResult>,
}

/// Run the whole pipeline.
pub fn run(
    inputs: &AnalysisInputs,
    config: &AnalysisConfig,
    request: &RunRequest,
) -> Result<AnalysisOutput, AnalysisError> {
    let prepared = prepare(inputs, config)?;
    let group_stats = aggregate(&prepared.records, request.grouping, config);
    let comparisons = compare(
        &prepared.records,
        request.faction_a,
        request.faction_b,
        request.by_year,
        config,
    )?;

    info!(
        mapping = %config.mapping.version(),
        records = prepared.records.len(),
        groups = group_stats.len(),
        comparisons = comparisons.len(),
        "Analysis run complete"
    );

    Ok(AnalysisOutput {
        mapping_version: config.mapping.version().to_string(),
        config: config.clone(),
        request: *request,
        merged_records: prepared.records.len(),
        merge_report: prepared.merge_report,
        consolidation_report: prepared.consolidation_report,
        group_stats,
        comparisons,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_prepare_rejects_invalid_config() {
        let config = AnalysisConfig {
            year_min: 2020,
            year_max: 2000,
            ..AnalysisConfig::default()
        };
        let err = prepare(&AnalysisInputs::default(), &config).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidConfig(_)));
    }

    #[test]
    fn test_collect_from_in_memory_sources() {
        let speeches = vec![SpeechRecord {
            id: 1u64.into(),
            faction_id: FactionId::SPD,
            date: NaiveDate::from_ymd_opt(2015, 1, 20).unwrap(),
            text: None,
        }];
        let topics = vec![TopicAssignment {
            id: 1u64.into(),
            raw_topic_id: 1,
            probabilities: None,
        }];
        let sentiments = vec![SentimentScore::new(1u64, 1)];
        let inputs = AnalysisInputs::collect(&speeches, &topics, &sentiments).unwrap();
        let prepared = prepare(&inputs, &AnalysisConfig::default()).unwrap();
        assert_eq!(prepared.records.len(), 1);
        assert!(prepared.is_conserved());
    }
}
