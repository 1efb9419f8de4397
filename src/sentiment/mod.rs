// Sentiment scores — the seam to the external sentiment classifier.

pub mod scores;
pub mod traits;
