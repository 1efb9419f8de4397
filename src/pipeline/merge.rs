// Merge Engine — inner join of speeches, topic assignments and sentiment
// scores on document id.
//
// A document missing from any source is excluded, never filled in with a
// default: imputing a topic or a sentiment would bias the comparison.
// Every excluded document is counted under exactly one reason so that
//
//   survivors + excluded == |union of ids across the three sources|
//
// holds for every input. The report is the first thing to read after a
// run; a join that silently loses half the sample looks fine otherwise.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AnalysisConfig;
use crate::models::{
    DocumentId, JoinedRecord, SentimentScore, SpeechRecord, TopicAssignment,
};

/// Why a document did not make it through the merge, in the order the
/// checks are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionReason {
    /// The id occurs more than once in at least one source
    DuplicateId,
    MissingSpeech,
    MissingTopic,
    MissingSentiment,
    FactionOutOfScope,
    YearOutOfWindow,
    /// Sentiment value outside {-1, 0, 1}
    InvalidSentiment,
    /// Probability vector out of range, wrong length, or not summing to 1
    InvalidTopicProbabilities,
}

impl ExclusionReason {
    pub const ALL: [ExclusionReason; 8] = [
        ExclusionReason::DuplicateId,
        ExclusionReason::MissingSpeech,
        ExclusionReason::MissingTopic,
        ExclusionReason::MissingSentiment,
        ExclusionReason::FactionOutOfScope,
        ExclusionReason::YearOutOfWindow,
        ExclusionReason::InvalidSentiment,
        ExclusionReason::InvalidTopicProbabilities,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExclusionReason::DuplicateId => "duplicate_id",
            ExclusionReason::MissingSpeech => "missing_speech",
            ExclusionReason::MissingTopic => "missing_topic",
            ExclusionReason::MissingSentiment => "missing_sentiment",
            ExclusionReason::FactionOutOfScope => "faction_out_of_scope",
            ExclusionReason::YearOutOfWindow => "year_out_of_window",
            ExclusionReason::InvalidSentiment => "invalid_sentiment",
            ExclusionReason::InvalidTopicProbabilities => "invalid_topic_probabilities",
        }
    }
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exclusion counts by reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusions {
    pub duplicate_id: usize,
    pub missing_speech: usize,
    pub missing_topic: usize,
    pub missing_sentiment: usize,
    pub faction_out_of_scope: usize,
    pub year_out_of_window: usize,
    pub invalid_sentiment: usize,
    pub invalid_topic_probabilities: usize,
}

impl Exclusions {
    pub fn count(&self, reason: ExclusionReason) -> usize {
        match reason {
            ExclusionReason::DuplicateId => self.duplicate_id,
            ExclusionReason::MissingSpeech => self.missing_speech,
            ExclusionReason::MissingTopic => self.missing_topic,
            ExclusionReason::MissingSentiment => self.missing_sentiment,
            ExclusionReason::FactionOutOfScope => self.faction_out_of_scope,
            ExclusionReason::YearOutOfWindow => self.year_out_of_window,
            ExclusionReason::InvalidSentiment => self.invalid_sentiment,
            ExclusionReason::InvalidTopicProbabilities => self.invalid_topic_probabilities,
        }
    }

    fn record(&mut self, reason: ExclusionReason) {
        let slot = match reason {
            ExclusionReason::DuplicateId => &mut self.duplicate_id,
            ExclusionReason::MissingSpeech => &mut self.missing_speech,
            ExclusionReason::MissingTopic => &mut self.missing_topic,
            ExclusionReason::MissingSentiment => &mut self.missing_sentiment,
            ExclusionReason::FactionOutOfScope => &mut self.faction_out_of_scope,
            ExclusionReason::YearOutOfWindow => &mut self.year_out_of_window,
            ExclusionReason::InvalidSentiment => &mut self.invalid_sentiment,
            ExclusionReason::InvalidTopicProbabilities => &mut self.invalid_topic_probabilities,
        };
        *slot += 1;
    }

    pub fn total(&self) -> usize {
        ExclusionReason::ALL.iter().map(|r| self.count(*r)).sum()
    }

    /// Non-zero reasons, in check order.
    pub fn nonzero(&self) -> Vec<(ExclusionReason, usize)> {
        ExclusionReason::ALL
            .iter()
            .map(|r| (*r, self.count(*r)))
            .filter(|(_, n)| *n > 0)
            .collect()
    }
}

/// Sample accounting for one merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    pub speeches_in: usize,
    pub topics_in: usize,
    pub sentiments_in: usize,
    /// Distinct document ids across all three sources
    pub union_ids: usize,
    pub survivors: usize,
    pub exclusions: Exclusions,
}

impl MergeReport {
    /// Every document in the union is either a survivor or excluded once.
    pub fn is_conserved(&self) -> bool {
        self.survivors + self.exclusions.total() == self.union_ids
    }
}

#[derive(Debug, Clone)]
pub struct MergeOutput {
    /// Surviving documents, sorted by id
    pub records: Vec<JoinedRecord>,
    pub report: MergeReport,
}

/// Index a source by id, remembering ids that occur more than once.
fn index_by_id<'a, T>(
    items: &'a [T],
    id_of: impl Fn(&T) -> &DocumentId,
    duplicates: &mut BTreeSet<&'a DocumentId>,
) -> BTreeMap<&'a DocumentId, &'a T> {
    let mut index = BTreeMap::new();
    for item in items {
        let id = id_of(item);
        if index.insert(id, item).is_some() {
            duplicates.insert(id);
        }
    }
    index
}

/// Join the three sources. Pure and deterministic.
pub fn merge(
    speeches: &[SpeechRecord],
    topics: &[TopicAssignment],
    sentiments: &[SentimentScore],
    config: &AnalysisConfig,
) -> MergeOutput {
    let mut duplicates = BTreeSet::new();
    let speech_index = index_by_id(speeches, |s| &s.id, &mut duplicates);
    let topic_index = index_by_id(topics, |t| &t.id, &mut duplicates);
    let sentiment_index = index_by_id(sentiments, |s| &s.id, &mut duplicates);

    let union: BTreeSet<&DocumentId> = speech_index
        .keys()
        .chain(topic_index.keys())
        .chain(sentiment_index.keys())
        .copied()
        .collect();

    let mut exclusions = Exclusions::default();
    let mut records = Vec::new();

    for id in &union {
        match join_one(
            id,
            &duplicates,
            &speech_index,
            &topic_index,
            &sentiment_index,
            config,
        ) {
            Ok(record) => records.push(record),
            Err(reason) => exclusions.record(reason),
        }
    }

    let report = MergeReport {
        speeches_in: speeches.len(),
        topics_in: topics.len(),
        sentiments_in: sentiments.len(),
        union_ids: union.len(),
        survivors: records.len(),
        exclusions,
    };
    debug_assert!(report.is_conserved());

    info!(
        speeches = report.speeches_in,
        topics = report.topics_in,
        sentiments = report.sentiments_in,
        union = report.union_ids,
        survivors = report.survivors,
        excluded = report.exclusions.total(),
        "Merged inputs"
    );
    if report.exclusions.duplicate_id > 0 {
        warn!(
            count = report.exclusions.duplicate_id,
            "Documents with duplicate ids were excluded"
        );
    }

    MergeOutput { records, report }
}

fn join_one(
    id: &DocumentId,
    duplicates: &BTreeSet<&DocumentId>,
    speeches: &BTreeMap<&DocumentId, &SpeechRecord>,
    topics: &BTreeMap<&DocumentId, &TopicAssignment>,
    sentiments: &BTreeMap<&DocumentId, &SentimentScore>,
    config: &AnalysisConfig,
) -> Result<JoinedRecord, ExclusionReason> {
    if duplicates.contains(id) {
        return Err(ExclusionReason::DuplicateId);
    }
    let speech = speeches.get(id).ok_or(ExclusionReason::MissingSpeech)?;
    let topic = topics.get(id).ok_or(ExclusionReason::MissingTopic)?;
    // A null score is no score
    let score = sentiments
        .get(id)
        .and_then(|s| s.category.as_ref())
        .ok_or(ExclusionReason::MissingSentiment)?;

    if !config.factions.contains(&speech.faction_id) {
        return Err(ExclusionReason::FactionOutOfScope);
    }
    let year = speech.year();
    if !config.year_in_window(year) {
        return Err(ExclusionReason::YearOutOfWindow);
    }
    let sentiment = score
        .category()
        .ok_or(ExclusionReason::InvalidSentiment)?;
    if let Some(probabilities) = &topic.probabilities {
        if !probabilities_well_formed(probabilities, config) {
            return Err(ExclusionReason::InvalidTopicProbabilities);
        }
    }

    Ok(JoinedRecord {
        id: id.clone(),
        faction_id: speech.faction_id,
        year,
        raw_topic_id: topic.raw_topic_id,
        sentiment,
    })
}

/// A topic-probability vector is well formed when every entry is in
/// [0, 1], the entries sum to 1 within tolerance, and (when the raw topic
/// count is configured) it has one entry per raw topic.
fn probabilities_well_formed(probabilities: &[f64], config: &AnalysisConfig) -> bool {
    if probabilities.is_empty() {
        return false;
    }
    if let Some(k) = config.raw_topic_count {
        if probabilities.len() != k {
            return false;
        }
    }
    if !probabilities
        .iter()
        .all(|p| p.is_finite() && (0.0..=1.0).contains(p))
    {
        return false;
    }
    let sum: f64 = probabilities.iter().sum();
    (sum - 1.0).abs() <= config.probability_tolerance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FactionId, SentimentCategory, SentimentValue};
    use chrono::NaiveDate;

    fn speech(id: u64, faction: FactionId, year: i32) -> SpeechRecord {
        SpeechRecord {
            id: id.into(),
            faction_id: faction,
            date: NaiveDate::from_ymd_opt(year, 6, 1).unwrap(),
            text: None,
        }
    }

    fn topic(id: u64, raw: u32) -> TopicAssignment {
        TopicAssignment {
            id: id.into(),
            raw_topic_id: raw,
            probabilities: None,
        }
    }

    fn score(id: u64, category: i64) -> SentimentScore {
        SentimentScore::new(id, category)
    }

    #[test]
    fn test_each_reason_is_counted_once() {
        let config = AnalysisConfig::default();
        let speeches = vec![
            speech(1, FactionId::SPD, 2010), // survives
            speech(2, FactionId(13), 2010),  // faction out of scope
            speech(3, FactionId::CDU, 1995), // year out of window
            speech(4, FactionId::CDU, 2010), // invalid sentiment
            speech(5, FactionId::CDU, 2010), // missing topic
        ];
        let topics = vec![topic(1, 1), topic(2, 1), topic(3, 1), topic(4, 1), topic(6, 1)];
        let sentiments = vec![score(1, 1), score(2, 0), score(3, -1), score(4, 5), score(5, 1)];

        let out = merge(&speeches, &topics, &sentiments, &config);
        let ex = &out.report.exclusions;
        assert_eq!(out.records.len(), 1);
        assert_eq!(ex.faction_out_of_scope, 1);
        assert_eq!(ex.year_out_of_window, 1);
        assert_eq!(ex.invalid_sentiment, 1);
        assert_eq!(ex.missing_topic, 1);
        // doc 6 only has a topic assignment
        assert_eq!(ex.missing_speech, 1);
        assert_eq!(out.report.union_ids, 6);
        assert!(out.report.is_conserved());
    }

    #[test]
    fn test_missing_from_two_sources_counts_first_reason() {
        let config = AnalysisConfig::default();
        let out = merge(&[speech(1, FactionId::SPD, 2010)], &[], &[], &config);
        assert_eq!(out.report.exclusions.missing_topic, 1);
        assert_eq!(out.report.exclusions.missing_sentiment, 0);
    }

    #[test]
    fn test_null_and_fractional_scores_are_excluded_not_fatal() {
        let config = AnalysisConfig::default();
        let speeches: Vec<_> = (1..=3).map(|i| speech(i, FactionId::SPD, 2010)).collect();
        let topics: Vec<_> = (1..=3).map(|i| topic(i, 1)).collect();
        let sentiments = vec![
            score(1, 1),
            SentimentScore { id: 2u64.into(), category: None },
            SentimentScore { id: 3u64.into(), category: Some(SentimentValue::Float(0.5)) },
        ];
        let out = merge(&speeches, &topics, &sentiments, &config);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.report.exclusions.missing_sentiment, 1);
        assert_eq!(out.report.exclusions.invalid_sentiment, 1);
        assert!(out.report.is_conserved());
    }

    #[test]
    fn test_integral_float_score_is_accepted() {
        let config = AnalysisConfig::default();
        let sentiments = vec![SentimentScore {
            id: 1u64.into(),
            category: Some(SentimentValue::Float(-1.0)),
        }];
        let out = merge(&[speech(1, FactionId::SPD, 2010)], &[topic(1, 1)], &sentiments, &config);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].sentiment, SentimentCategory::Negative);
    }

    #[test]
    fn test_duplicate_ids_are_excluded() {
        let config = AnalysisConfig::default();
        let speeches = vec![speech(1, FactionId::SPD, 2010), speech(2, FactionId::SPD, 2010)];
        let topics = vec![topic(1, 1), topic(2, 1)];
        let sentiments = vec![score(1, 1), score(2, 1), score(2, -1)];
        let out = merge(&speeches, &topics, &sentiments, &config);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.report.exclusions.duplicate_id, 1);
        assert!(out.report.is_conserved());
    }

    #[test]
    fn test_probability_vector_validation() {
        let config = AnalysisConfig::default();
        let mut good = vec![0.0; 15];
        good[1] = 0.7;
        good[3] = 0.3;
        let mut short = vec![0.5; 2];
        short[1] = 0.5;
        let mut bad_sum = vec![0.0; 15];
        bad_sum[1] = 0.5;

        assert!(probabilities_well_formed(&good, &config));
        assert!(!probabilities_well_formed(&short, &config));
        assert!(!probabilities_well_formed(&bad_sum, &config));
        assert!(!probabilities_well_formed(&[], &config));
    }

    #[test]
    fn test_output_sorted_by_id() {
        let config = AnalysisConfig::default();
        let ids = [10u64, 2, 33, 1];
        let speeches: Vec<_> = ids.iter().map(|i| speech(*i, FactionId::CDU, 2012)).collect();
        let topics: Vec<_> = ids.iter().map(|i| topic(*i, 1)).collect();
        let sentiments: Vec<_> = ids.iter().map(|i| score(*i, 0)).collect();
        let out = merge(&speeches, &topics, &sentiments, &config);
        let order: Vec<&str> = out.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(order, vec!["1", "2", "10", "33"]);
    }
}
