// Unit tests for the merge engine and topic consolidation.
//
// All inputs are built in memory; no files or database involved.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use parlsent::config::AnalysisConfig;
use parlsent::error::AnalysisError;
use parlsent::models::{FactionId, SentimentScore, SpeechRecord, TopicAssignment};
use parlsent::pipeline::consolidate::consolidate;
use parlsent::pipeline::merge::{merge, ExclusionReason};
use parlsent::topics::mapping::TopicMapping;

fn speech(id: u64, faction: FactionId, year: i32) -> SpeechRecord {
    SpeechRecord {
        id: id.into(),
        faction_id: faction,
        date: NaiveDate::from_ymd_opt(year, 3, 1).unwrap(),
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

fn sentiment(id: u64, value: i64) -> SentimentScore {
    SentimentScore::new(id, value)
}

fn small_mapping() -> TopicMapping {
    TopicMapping::new(
        "test-v1",
        BTreeMap::from([(1, Some("Economy".to_string())), (2, None)]),
    )
    .unwrap()
}

fn config_with(mapping: TopicMapping) -> AnalysisConfig {
    AnalysisConfig {
        raw_topic_count: None,
        mapping,
        ..AnalysisConfig::default()
    }
}

// ============================================================
// Join behavior
// ============================================================

#[test]
fn document_missing_sentiment_is_excluded() {
    let speeches = vec![
        speech(1, FactionId::CDU, 2010),
        speech(2, FactionId::SPD, 2010),
        speech(3, FactionId::SPD, 2010),
    ];
    let topics = vec![topic(1, 1), topic(2, 1), topic(3, 1)];
    let sentiments = vec![sentiment(1, 1), sentiment(2, -1)];

    let out = merge(&speeches, &topics, &sentiments, &AnalysisConfig::default());

    let ids: Vec<&str> = out.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);
    assert_eq!(out.report.exclusions.missing_sentiment, 1);
    assert_eq!(out.report.exclusions.total(), 1);
    assert!(out.report.is_conserved());
}

#[test]
fn each_document_is_counted_under_one_reason() {
    let speeches = vec![
        speech(1, FactionId::CDU, 2010), // survives
        speech(2, FactionId::CDU, 2010), // duplicate in speeches
        speech(2, FactionId::CDU, 2011),
        speech(4, FactionId(3), 2010),  // Greens, out of scope
        speech(5, FactionId::SPD, 1995), // before the window
        speech(6, FactionId::SPD, 2010), // sentiment 2
        speech(7, FactionId::SPD, 2010), // bad probabilities
        speech(8, FactionId::SPD, 2010), // no topic
        speech(9, FactionId::SPD, 2010), // no sentiment
    ];

    let mut topics: Vec<TopicAssignment> = [1, 2, 4, 5, 6, 9, 10]
        .iter()
        .map(|id| topic(*id, 1))
        .collect();
    topics.push(TopicAssignment {
        id: 7u64.into(),
        raw_topic_id: 1,
        probabilities: Some(vec![0.7, 0.7]),
    });
    let sentiments: Vec<SentimentScore> = [1, 2, 4, 5, 7, 8, 10]
        .iter()
        .map(|id| sentiment(*id, 0))
        .chain([sentiment(6, 2)])
        .collect();

    let out = merge(&speeches, &topics, &sentiments, &AnalysisConfig::default());
    let ex = &out.report.exclusions;

    assert_eq!(out.records.len(), 1);
    assert_eq!(ex.duplicate_id, 1);
    assert_eq!(ex.faction_out_of_scope, 1);
    assert_eq!(ex.year_out_of_window, 1);
    assert_eq!(ex.invalid_sentiment, 1);
    assert_eq!(ex.invalid_topic_probabilities, 1);
    assert_eq!(ex.missing_topic, 1);
    assert_eq!(ex.missing_sentiment, 1);
    // id 10 has a topic and a sentiment but no speech
    assert_eq!(ex.missing_speech, 1);

    assert_eq!(out.report.union_ids, 9);
    assert!(out.report.is_conserved());
}

#[test]
fn duplicate_outranks_missing() {
    // id 1 is duplicated in topics and has no sentiment at all
    let speeches = vec![speech(1, FactionId::CDU, 2010)];
    let topics = vec![topic(1, 1), topic(1, 2)];
    let out = merge(&speeches, &topics, &[], &AnalysisConfig::default());
    assert_eq!(out.report.exclusions.count(ExclusionReason::DuplicateId), 1);
    assert_eq!(out.report.exclusions.count(ExclusionReason::MissingSentiment), 0);
}

#[test]
fn merge_is_independent_of_input_order() {
    let speeches = vec![
        speech(3, FactionId::SPD, 2012),
        speech(1, FactionId::CDU, 2010),
        speech(2, FactionId::SPD, 2011),
    ];
    let topics = vec![topic(2, 1), topic(3, 1), topic(1, 1)];
    let sentiments = vec![sentiment(1, 1), sentiment(3, 0), sentiment(2, -1)];

    let mut reversed_speeches = speeches.clone();
    reversed_speeches.reverse();
    let mut reversed_topics = topics.clone();
    reversed_topics.reverse();

    let config = AnalysisConfig::default();
    let a = merge(&speeches, &topics, &sentiments, &config);
    let b = merge(&reversed_speeches, &reversed_topics, &sentiments, &config);
    assert_eq!(a.records, b.records);
    assert_eq!(a.report, b.report);
}

#[test]
fn empty_inputs_produce_empty_report() {
    let out = merge(&[], &[], &[], &AnalysisConfig::default());
    assert!(out.records.is_empty());
    assert_eq!(out.report.union_ids, 0);
    assert!(out.report.exclusions.nonzero().is_empty());
}

#[test]
fn probabilities_within_tolerance_are_accepted() {
    let config = AnalysisConfig {
        raw_topic_count: Some(3),
        mapping: TopicMapping::new(
            "three",
            BTreeMap::from([
                (0, Some("A".to_string())),
                (1, Some("B".to_string())),
                (2, None),
            ]),
        )
        .unwrap(),
        ..AnalysisConfig::default()
    };
    let topics = vec![
        TopicAssignment {
            id: 1u64.into(),
            raw_topic_id: 1,
            probabilities: Some(vec![0.2, 0.795, 0.0]),
        },
        // Wrong length for three raw topics
        TopicAssignment {
            id: 2u64.into(),
            raw_topic_id: 1,
            probabilities: Some(vec![0.5, 0.5]),
        },
    ];
    let speeches = vec![speech(1, FactionId::CDU, 2010), speech(2, FactionId::CDU, 2010)];
    let sentiments = vec![sentiment(1, 0), sentiment(2, 0)];

    let out = merge(&speeches, &topics, &sentiments, &config);
    assert_eq!(out.records.len(), 1);
    assert_eq!(out.report.exclusions.invalid_topic_probabilities, 1);
}

// ============================================================
// Consolidation
// ============================================================

#[test]
fn dropped_topic_empties_the_sample() {
    let config = config_with(small_mapping());
    let speeches = vec![speech(1, FactionId::CDU, 2010), speech(2, FactionId::SPD, 2011)];
    let topics = vec![topic(1, 2), topic(2, 2)];
    let sentiments = vec![sentiment(1, 1), sentiment(2, 0)];

    let merged = merge(&speeches, &topics, &sentiments, &config);
    assert_eq!(merged.records.len(), 2);

    let out = consolidate(&merged.records, &config.mapping).unwrap();
    assert!(out.records.is_empty());
    assert_eq!(out.report.dropped_topic, 2);
    assert_eq!(out.report.input, 2);
}

#[test]
fn unmapped_raw_topic_is_fatal() {
    let config = config_with(small_mapping());
    let speeches = vec![speech(1, FactionId::CDU, 2010), speech(2, FactionId::SPD, 2011)];
    let topics = vec![topic(1, 1), topic(2, 5)];
    let sentiments = vec![sentiment(1, 1), sentiment(2, 0)];

    let merged = merge(&speeches, &topics, &sentiments, &config);
    let err = consolidate(&merged.records, &config.mapping).unwrap_err();
    match err {
        AnalysisError::UnmappedTopic {
            raw_topic_ids,
            version,
        } => {
            assert_eq!(raw_topic_ids, vec![5]);
            assert_eq!(version, "test-v1");
        }
        other => panic!("expected UnmappedTopic, got {other:?}"),
    }
}

#[test]
fn default_mapping_keeps_eight_curated_topics() {
    let mapping = TopicMapping::bundestag_default();
    assert_eq!(mapping.curated_labels().len(), 8);
    assert!(mapping.check_coverage(15).is_ok());
}
