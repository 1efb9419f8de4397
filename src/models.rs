// Data models — the records that flow through the analysis pipeline.
//
// Input records mirror the three upstream batch outputs (speeches, topic
// assignments, sentiment scores). Derived records are produced by the
// pipeline stages and serialize with stable snake_case field names so
// downstream reports can rely on them across runs.

use std::cmp::Ordering;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::stats::significance::TestKind;

/// Stable document identifier shared by all three inputs.
///
/// Upstream tables use either numeric or string ids, so both are accepted
/// when reading and normalized to a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Numeric ids sort numerically ("2" before "10"), everything else
// lexically. Ties between equal numbers fall back to the string so the
// ordering stays consistent with Eq ("01" vs "1").
impl Ord for DocumentId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0.parse::<u64>(), other.0.parse::<u64>()) {
            (Ok(a), Ok(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for DocumentId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => DocumentId(s),
            RawId::Number(n) => DocumentId(n.to_string()),
        })
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        DocumentId(s.to_string())
    }
}

impl From<u64> for DocumentId {
    fn from(n: u64) -> Self {
        DocumentId(n.to_string())
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Numeric party code as used by the Bundestag speech corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactionId(pub i32);

impl FactionId {
    pub const CDU: FactionId = FactionId(4);
    pub const SPD: FactionId = FactionId(23);

    /// Party name for the known corpus codes, if any.
    pub fn name(&self) -> Option<&'static str> {
        match self.0 {
            -1 => Some("Non-MP"),
            3 => Some("Greens"),
            4 => Some("CDU/CSU"),
            6 => Some("Left"),
            7 => Some("DP"),
            13 => Some("FDP"),
            14 => Some("Zentrum"),
            23 => Some("SPD"),
            _ => None,
        }
    }
}

impl fmt::Display for FactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "faction {}", self.0),
        }
    }
}

/// One speech (or paragraph segment) from the speech store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechRecord {
    pub id: DocumentId,
    #[serde(alias = "faction_id")]
    pub faction_id: FactionId,
    pub date: NaiveDate,
    /// Opaque reference to the speech text; never inspected here.
    #[serde(default)]
    pub text: Option<String>,
}

impl SpeechRecord {
    pub fn year(&self) -> i32 {
        self.date.year()
    }
}

/// Raw topic model output for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicAssignment {
    pub id: DocumentId,
    #[serde(rename = "topic", alias = "rawTopicId", alias = "raw_topic_id")]
    pub raw_topic_id: u32,
    #[serde(default)]
    pub probabilities: Option<Vec<f64>>,
}

/// Raw sentiment classifier output for one document.
///
/// `category` is kept as whatever the classifier export wrote; the merge
/// step decides whether it is one of the three valid categories. A `null`
/// or absent value reads as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub id: DocumentId,
    #[serde(rename = "sentiment", alias = "category", default)]
    pub category: Option<SentimentValue>,
}

impl SentimentScore {
    pub fn new(id: impl Into<DocumentId>, value: impl Into<SentimentValue>) -> Self {
        Self {
            id: id.into(),
            category: Some(value.into()),
        }
    }
}

/// A raw sentiment value as it appears in the export.
///
/// Dataframe exports write integer columns with gaps as floats (`1.0`), so
/// integral floats are accepted. Everything else is kept so it can be
/// counted as invalid instead of failing the load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SentimentValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl SentimentValue {
    /// The category this value denotes, if it is one of {-1, 0, 1}.
    pub fn category(&self) -> Option<SentimentCategory> {
        match self {
            SentimentValue::Integer(v) => SentimentCategory::from_value(*v),
            SentimentValue::Float(f) if f.fract() == 0.0 && f.abs() <= 1.0 => {
                SentimentCategory::from_value(*f as i64)
            }
            SentimentValue::Float(_) | SentimentValue::Text(_) => None,
        }
    }
}

impl From<i64> for SentimentValue {
    fn from(v: i64) -> Self {
        SentimentValue::Integer(v)
    }
}

/// Three-valued sentiment label.
///
/// Means and variances treat the ordinal scale {-1, 0, +1} as interval.
/// That is a simplification for descriptive statistics only; the default
/// significance test is rank-based and does not depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SentimentCategory {
    Negative,
    Neutral,
    Positive,
}

impl SentimentCategory {
    pub const ALL: [SentimentCategory; 3] = [
        SentimentCategory::Negative,
        SentimentCategory::Neutral,
        SentimentCategory::Positive,
    ];

    /// Parse a raw classifier value. Anything outside {-1, 0, 1} is rejected.
    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            -1 => Some(SentimentCategory::Negative),
            0 => Some(SentimentCategory::Neutral),
            1 => Some(SentimentCategory::Positive),
            _ => None,
        }
    }

    pub fn value(&self) -> i8 {
        match self {
            SentimentCategory::Negative => -1,
            SentimentCategory::Neutral => 0,
            SentimentCategory::Positive => 1,
        }
    }

    pub fn as_f64(&self) -> f64 {
        f64::from(self.value())
    }

    /// Column index in a category contingency table.
    pub fn index(&self) -> usize {
        (self.value() + 1) as usize
    }
}

impl Serialize for SentimentCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.value())
    }
}

/// A document that survived the join and validation but has not been
/// mapped onto the curated topic taxonomy yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedRecord {
    pub id: DocumentId,
    pub faction_id: FactionId,
    pub year: i32,
    pub raw_topic_id: u32,
    pub sentiment: SentimentCategory,
}

/// The per-document analytic unit after join, validation and consolidation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRecord {
    pub id: DocumentId,
    pub faction_id: FactionId,
    pub year: i32,
    pub topic: String,
    pub sentiment: SentimentCategory,
}

/// Which keys the aggregator groups by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingKeys {
    pub faction: bool,
    pub topic: bool,
    pub year: bool,
}

impl GroupingKeys {
    pub const FACTION_TOPIC: GroupingKeys = GroupingKeys {
        faction: true,
        topic: true,
        year: false,
    };
    pub const FACTION_TOPIC_YEAR: GroupingKeys = GroupingKeys {
        faction: true,
        topic: true,
        year: true,
    };
}

impl std::str::FromStr for GroupingKeys {
    type Err = String;

    /// Parse a comma-separated key list, e.g. `faction,topic,year`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut keys = GroupingKeys {
            faction: false,
            topic: false,
            year: false,
        };
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part {
                "faction" | "party" => keys.faction = true,
                "topic" => keys.topic = true,
                "year" => keys.year = true,
                other => return Err(format!("unknown grouping key '{other}'")),
            }
        }
        Ok(keys)
    }
}

impl fmt::Display for GroupingKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.faction {
            parts.push("faction");
        }
        if self.topic {
            parts.push("topic");
        }
        if self.year {
            parts.push("year");
        }
        if parts.is_empty() {
            f.write_str("(all)")
        } else {
            f.write_str(&parts.join(","))
        }
    }
}

/// Descriptive statistics for one (faction, topic, year) cell.
///
/// Keys that were not requested are `None`. Mean and variance are `None`
/// for empty groups rather than a misleading 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStat {
    pub faction_id: Option<FactionId>,
    pub topic: Option<String>,
    pub year: Option<i32>,
    pub n: usize,
    pub mean_sentiment: Option<f64>,
    pub variance: Option<f64>,
    /// Set when `n` is below the configured minimum group size.
    pub low_confidence: bool,
}

/// A significance test result that has been through multiple-comparison
/// correction. Raw and adjusted p-values only ever exist together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrectedTest {
    statistic: f64,
    p_value: f64,
    adjusted_p_value: f64,
    significant: bool,
}

impl CorrectedTest {
    pub(crate) fn new(statistic: f64, p_value: f64, adjusted_p_value: f64, alpha: f64) -> Self {
        // Rounding in the correction must never push the adjusted value
        // below the raw one.
        let adjusted_p_value = adjusted_p_value.max(p_value).min(1.0);
        Self {
            statistic,
            p_value,
            adjusted_p_value,
            significant: adjusted_p_value < alpha,
        }
    }

    /// Rebuild a result read back from the results store.
    pub(crate) fn from_stored(
        statistic: f64,
        p_value: f64,
        adjusted_p_value: f64,
        significant: bool,
    ) -> Self {
        Self {
            statistic,
            p_value,
            adjusted_p_value,
            significant,
        }
    }

    pub fn statistic(&self) -> f64 {
        self.statistic
    }

    pub fn p_value(&self) -> f64 {
        self.p_value
    }

    pub fn adjusted_p_value(&self) -> f64 {
        self.adjusted_p_value
    }

    pub fn significant(&self) -> bool {
        self.significant
    }
}

/// What came out of comparing two factions on one topic (and year).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ComparisonOutcome {
    Tested(CorrectedTest),
    /// One side has fewer than two observations.
    InsufficientSample,
    /// The pooled sample has no variation, so no test statistic exists.
    Undefined,
}

impl ComparisonOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOutcome::Tested(_) => "tested",
            ComparisonOutcome::InsufficientSample => "insufficient_sample",
            ComparisonOutcome::Undefined => "undefined",
        }
    }

    pub fn test(&self) -> Option<&CorrectedTest> {
        match self {
            ComparisonOutcome::Tested(t) => Some(t),
            _ => None,
        }
    }
}

/// Faction A vs faction B on one curated topic, optionally within one year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub topic: String,
    pub year: Option<i32>,
    pub faction_a: FactionId,
    pub faction_b: FactionId,
    pub n_a: usize,
    pub n_b: usize,
    pub mean_a: Option<f64>,
    pub mean_b: Option<f64>,
    /// `mean_a - mean_b`, when both sides have data.
    pub mean_diff: Option<f64>,
    pub test_kind: TestKind,
    #[serde(flatten)]
    pub outcome: ComparisonOutcome,
}
