// SpeechSource trait and the JSON Lines store.
//
// Speech records are produced by the sampling step upstream (CDU/CSU and
// SPD speeches, optionally split into paragraph segments). The store never
// looks at the text; it only carries the id, faction and date through.

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use crate::jsonl;
use crate::models::SpeechRecord;

/// Source of speech records.
pub trait SpeechSource {
    fn describe(&self) -> String;

    fn speeches(&self) -> Result<Vec<SpeechRecord>>;
}

impl SpeechSource for Vec<SpeechRecord> {
    fn describe(&self) -> String {
        format!("in-memory ({} speeches)", self.len())
    }

    fn speeches(&self) -> Result<Vec<SpeechRecord>> {
        Ok(self.clone())
    }
}

/// Speeches exported as JSON Lines:
/// `{"id": 1842, "factionId": 23, "date": "2009-11-10", "text": "..."}`
pub struct JsonlSpeechStore {
    pub path: PathBuf,
}

impl JsonlSpeechStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SpeechSource for JsonlSpeechStore {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn speeches(&self) -> Result<Vec<SpeechRecord>> {
        let records: Vec<SpeechRecord> = jsonl::read_records(&self.path)?;
        info!(
            path = %self.path.display(),
            count = records.len(),
            "Loaded speech records"
        );
        Ok(records)
    }
}
