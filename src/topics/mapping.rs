// TopicMapping — the hand-curated table from raw topic-model ids to the
// analysis taxonomy.
//
// The table is data, not code: it is loaded from JSON (or the built-in
// default), versioned, and stored alongside every run so a reported finding
// can always be traced back to the exact curation it was computed under.
//
// JSON shape:
//
//   { "version": "bundestag-15to8-v1",
//     "topics": { "1": "Economy", "2": null, ... } }
//
// A `null` label is the DROPPED sentinel. A raw id with no entry at all is
// an authoring mistake and is reported as `UnmappedTopic`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// How one raw topic id resolves under a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappedTopic<'a> {
    Curated(&'a str),
    Dropped,
    Unmapped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicMapping {
    version: String,
    topics: BTreeMap<u32, Option<String>>,
}

impl TopicMapping {
    /// Build a mapping and check its structural invariants.
    pub fn new(
        version: impl Into<String>,
        topics: BTreeMap<u32, Option<String>>,
    ) -> Result<Self, AnalysisError> {
        let mapping = Self {
            version: version.into(),
            topics,
        };
        mapping.validate()?;
        Ok(mapping)
    }

    /// Parse a mapping from its JSON form.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mapping: TopicMapping =
            serde_json::from_str(json).context("Failed to parse topic mapping JSON")?;
        mapping.validate()?;
        Ok(mapping)
    }

    /// Load a mapping file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read topic mapping {}", path.display()))?;
        Self::from_json_str(&json)
            .with_context(|| format!("Invalid topic mapping {}", path.display()))
    }

    /// The curation used for the Bundestag CDU/CSU vs SPD study: fifteen raw
    /// topics reduced to eight. Topic 14 duplicates topic 4 and shares its
    /// label; procedural and control topics are dropped.
    pub fn bundestag_default() -> Self {
        let curated: [(u32, &str); 9] = [
            (1, "Wirtschaft & Arbeitsmarkt"),
            (3, "Staat, Verwaltung & öff. Leistungen"),
            (4, "Gesetzgebung & Verfassungsfragen"),
            (6, "Bildung, Forschung & Zukunftspolitik"),
            (8, "Sozial-, Familien- & Gesellschaftspolitik"),
            (9, "Europapolitik, Energie & Klima"),
            (11, "Außen-, Sicherheits- & Menschenrechtspolitik"),
            (13, "Haushalt & Finanzpolitik"),
            (14, "Gesetzgebung & Verfassungsfragen"),
        ];
        let dropped: [u32; 6] = [0, 2, 5, 7, 10, 12];

        let mut topics: BTreeMap<u32, Option<String>> = curated
            .iter()
            .map(|(id, label)| (*id, Some(label.to_string())))
            .collect();
        for id in dropped {
            topics.insert(id, None);
        }

        Self {
            version: "bundestag-15to8-v1".to_string(),
            topics,
        }
    }

    /// Structural invariants: a version is set, there is at least one
    /// curated label, and no label is blank.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.version.trim().is_empty() {
            return Err(AnalysisError::InvalidMapping(
                "mapping version must not be empty".to_string(),
            ));
        }
        for (id, label) in &self.topics {
            if let Some(label) = label {
                if label.trim().is_empty() {
                    return Err(AnalysisError::InvalidMapping(format!(
                        "raw topic {id} has a blank label (use null to drop it)"
                    )));
                }
            }
        }
        if self.curated_labels().is_empty() {
            return Err(AnalysisError::InvalidMapping(
                "mapping drops every topic".to_string(),
            ));
        }
        Ok(())
    }

    /// Fail fast if the mapping does not cover every id the topic model can
    /// emit (`0..raw_topic_count`).
    pub fn check_coverage(&self, raw_topic_count: usize) -> Result<(), AnalysisError> {
        let missing: Vec<u32> = (0..raw_topic_count as u32)
            .filter(|id| !self.topics.contains_key(id))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AnalysisError::UnmappedTopic {
                raw_topic_ids: missing,
                version: self.version.clone(),
            })
        }
    }

    /// Fail if any of the given raw ids has no mapping entry. All offending
    /// ids are reported, sorted.
    pub fn check_raw_ids(
        &self,
        raw_topic_ids: impl IntoIterator<Item = u32>,
    ) -> Result<(), AnalysisError> {
        let unmapped: BTreeSet<u32> = raw_topic_ids
            .into_iter()
            .filter(|id| !self.topics.contains_key(id))
            .collect();
        if unmapped.is_empty() {
            Ok(())
        } else {
            Err(AnalysisError::UnmappedTopic {
                raw_topic_ids: unmapped.into_iter().collect(),
                version: self.version.clone(),
            })
        }
    }

    pub fn resolve(&self, raw_topic_id: u32) -> MappedTopic<'_> {
        match self.topics.get(&raw_topic_id) {
            Some(Some(label)) => MappedTopic::Curated(label),
            Some(None) => MappedTopic::Dropped,
            None => MappedTopic::Unmapped,
        }
    }

    /// The fixed set of curated labels, sorted.
    pub fn curated_labels(&self) -> BTreeSet<&str> {
        self.topics.values().flatten().map(String::as_str).collect()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// All entries in raw-id order. `None` means dropped.
    pub fn entries(&self) -> impl Iterator<Item = (u32, Option<&str>)> {
        self.topics.iter().map(|(id, label)| (*id, label.as_deref()))
    }
}

impl Default for TopicMapping {
    fn default() -> Self {
        Self::bundestag_default()
    }
}
