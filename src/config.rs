use std::collections::BTreeSet;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::models::FactionId;
use crate::stats::correction::Correction;
use crate::stats::significance::TestKind;
use crate::topics::mapping::TopicMapping;

/// Everything a pipeline stage needs to know about the analysis.
///
/// Passed explicitly into every stage. Serialized with each stored run so a
/// result can be reproduced from its config alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Factions kept by the merge step
    pub factions: BTreeSet<FactionId>,
    /// First year of the analysis window (inclusive)
    pub year_min: i32,
    /// Last year of the analysis window (inclusive)
    pub year_max: i32,
    /// Significance level applied to adjusted p-values
    pub alpha: f64,
    /// Groups smaller than this are flagged low-confidence
    pub min_group_size: usize,
    pub test: TestKind,
    pub correction: Correction,
    /// Number of raw topics the topic model emits. When set, the mapping
    /// must cover every id in `0..raw_topic_count`.
    pub raw_topic_count: Option<usize>,
    /// Allowed deviation of a topic-probability vector's sum from 1.0
    pub probability_tolerance: f64,
    pub mapping: TopicMapping,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            factions: BTreeSet::from([FactionId::CDU, FactionId::SPD]),
            year_min: 2000,
            year_max: 2021,
            alpha: 0.05,
            min_group_size: 5,
            test: TestKind::MannWhitney,
            correction: Correction::Holm,
            raw_topic_count: Some(15),
            probability_tolerance: 0.01,
            mapping: TopicMapping::bundestag_default(),
        }
    }
}

impl AnalysisConfig {
    /// Check the config before any stage runs.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.factions.is_empty() {
            return Err(AnalysisError::InvalidConfig(
                "at least one faction must be in scope".to_string(),
            ));
        }
        if self.year_min > self.year_max {
            return Err(AnalysisError::InvalidConfig(format!(
                "year window is empty ({} > {})",
                self.year_min, self.year_max
            )));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "alpha must be in (0, 1), got {}",
                self.alpha
            )));
        }
        if !(self.probability_tolerance >= 0.0 && self.probability_tolerance < 1.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "probability tolerance must be in [0, 1), got {}",
                self.probability_tolerance
            )));
        }
        self.mapping.validate()?;
        if let Some(k) = self.raw_topic_count {
            self.mapping.check_coverage(k)?;
        }
        Ok(())
    }

    pub fn year_in_window(&self, year: i32) -> bool {
        (self.year_min..=self.year_max).contains(&year)
    }
}

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded automatically at startup via dotenvy. Input
/// paths are optional here so commands like `init` and `status` work
/// without them; commands that read inputs call `require_inputs` first.
pub struct Config {
    pub speeches_path: Option<PathBuf>,
    pub topics_path: Option<PathBuf>,
    pub sentiment_path: Option<PathBuf>,
    /// Topic mapping JSON; the built-in default is used when unset
    pub mapping_path: Option<PathBuf>,
    pub db_path: String,
    pub analysis: AnalysisConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        let defaults = AnalysisConfig::default();

        let mapping_path = env_path("PARLSENT_MAPPING");
        let mapping = match &mapping_path {
            Some(path) => TopicMapping::load(path)?,
            None => defaults.mapping.clone(),
        };

        let factions = match env::var("PARLSENT_FACTIONS") {
            Ok(raw) => parse_factions(&raw)?,
            Err(_) => defaults.factions.clone(),
        };

        let raw_topic_count = match env::var("PARLSENT_RAW_TOPICS").as_deref() {
            // "0" or "none" disables the coverage check
            Ok("0") | Ok("none") => None,
            Ok(raw) => Some(
                raw.parse()
                    .with_context(|| format!("PARLSENT_RAW_TOPICS is not a number: {raw}"))?,
            ),
            Err(_) => defaults.raw_topic_count,
        };

        let analysis = AnalysisConfig {
            factions,
            year_min: env_parse("PARLSENT_YEAR_MIN", defaults.year_min)?,
            year_max: env_parse("PARLSENT_YEAR_MAX", defaults.year_max)?,
            alpha: env_parse("PARLSENT_ALPHA", defaults.alpha)?,
            min_group_size: env_parse("PARLSENT_MIN_GROUP_SIZE", defaults.min_group_size)?,
            test: env_parse("PARLSENT_TEST", defaults.test)?,
            correction: env_parse("PARLSENT_CORRECTION", defaults.correction)?,
            raw_topic_count,
            probability_tolerance: env_parse(
                "PARLSENT_PROBABILITY_TOLERANCE",
                defaults.probability_tolerance,
            )?,
            mapping,
        };

        Ok(Self {
            speeches_path: env_path("PARLSENT_SPEECHES"),
            topics_path: env_path("PARLSENT_TOPICS"),
            sentiment_path: env_path("PARLSENT_SENTIMENT"),
            mapping_path,
            db_path: env::var("PARLSENT_DB_PATH").unwrap_or_else(|_| "./parlsent.db".to_string()),
            analysis,
        })
    }

    /// Check that all three input paths are configured.
    /// Call this before any operation that runs the merge.
    pub fn require_inputs(&self) -> Result<(&PathBuf, &PathBuf, &PathBuf)> {
        match (&self.speeches_path, &self.topics_path, &self.sentiment_path) {
            (Some(s), Some(t), Some(p)) => Ok((s, t, p)),
            _ => anyhow::bail!(
                "Input files not configured. Set PARLSENT_SPEECHES, PARLSENT_TOPICS and\n\
                 PARLSENT_SENTIMENT in your .env file (JSON Lines exports of the speech\n\
                 store, topic model and sentiment classifier)."
            ),
        }
    }

    /// Validate the analysis settings, with a hint on where they came from.
    pub fn require_valid_analysis(&self) -> Result<()> {
        self.analysis.validate().with_context(|| match &self.mapping_path {
            Some(path) => format!("Check your PARLSENT_* settings and {}", path.display()),
            None => "Check your PARLSENT_* settings".to_string(),
        })
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} has an invalid value '{raw}': {e}")),
        Err(_) => Ok(default),
    }
}

/// Parse a comma-separated list of numeric party codes, e.g. `4,23`.
pub fn parse_factions(raw: &str) -> Result<BTreeSet<FactionId>> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            p.parse::<i32>()
                .map(FactionId)
                .with_context(|| format!("Invalid faction code '{p}' in PARLSENT_FACTIONS"))
        })
        .collect()
}
