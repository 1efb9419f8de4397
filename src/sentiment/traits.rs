// Sentiment score provider trait.
//
// Like the topic provider, this hides where the classifier output lives.
// Scores arrive as raw integers; validating them against the three
// categories is the merge step's job, so a provider never filters.

use anyhow::Result;

use crate::models::SentimentScore;

/// Source of per-document sentiment scores.
pub trait SentimentScoreProvider {
    fn describe(&self) -> String;

    /// Load every score. Order is not significant.
    fn scores(&self) -> Result<Vec<SentimentScore>>;
}

impl SentimentScoreProvider for Vec<SentimentScore> {
    fn describe(&self) -> String {
        format!("in-memory ({} scores)", self.len())
    }

    fn scores(&self) -> Result<Vec<SentimentScore>> {
        Ok(self.clone())
    }
}
