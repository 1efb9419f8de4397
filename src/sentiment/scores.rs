// JSON Lines sentiment scores: {"id": 1842, "sentiment": -1}

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use super::traits::SentimentScoreProvider;
use crate::jsonl;
use crate::models::SentimentScore;

pub struct JsonlSentimentScores {
    pub path: PathBuf,
}

impl JsonlSentimentScores {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SentimentScoreProvider for JsonlSentimentScores {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn scores(&self) -> Result<Vec<SentimentScore>> {
        let records: Vec<SentimentScore> = jsonl::read_records(&self.path)?;
        info!(
            path = %self.path.display(),
            count = records.len(),
            "Loaded sentiment scores"
        );
        Ok(records)
    }
}
