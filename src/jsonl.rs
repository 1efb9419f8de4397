// JSON Lines reader shared by the three input providers.
//
// Each upstream batch job writes one JSON object per line. Blank lines are
// skipped; a malformed line is an error that names the file and line so
// the broken upstream output can be found.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

/// Read every record from a JSON Lines file.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    read_records_from(BufReader::new(file), &path.display().to_string())
}

/// Read every record from any buffered reader. `source` is only used in
/// error messages.
pub fn read_records_from<T: DeserializeOwned, R: BufRead>(
    reader: R,
    source: &str,
) -> Result<Vec<T>> {
    let mut records = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {source} line {}", i + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record = serde_json::from_str(trimmed)
            .with_context(|| format!("Malformed record in {source} line {}", i + 1))?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SentimentScore, SentimentValue};

    #[test]
    fn test_reads_records_and_skips_blank_lines() {
        let input = "{\"id\": 1, \"sentiment\": 1}\n\n{\"id\": \"2\", \"sentiment\": -1}\n";
        let scores: Vec<SentimentScore> = read_records_from(input.as_bytes(), "test").unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[1].category, Some(SentimentValue::Integer(-1)));
    }

    #[test]
    fn test_malformed_line_names_location() {
        let input = "{\"id\": 1, \"sentiment\": 1}\nnot json\n";
        let err = read_records_from::<SentimentScore, _>(input.as_bytes(), "scores.jsonl")
            .unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("scores.jsonl line 2"), "got: {msg}");
    }

    #[test]
    fn test_null_and_fractional_sentiment_still_load() {
        let input = "{\"id\": 1, \"sentiment\": null}\n{\"id\": 2, \"sentiment\": 0.5}\n{\"id\": 3}\n";
        let scores: Vec<SentimentScore> = read_records_from(input.as_bytes(), "test").unwrap();
        assert_eq!(scores[0].category, None);
        assert_eq!(scores[1].category, Some(SentimentValue::Float(0.5)));
        assert_eq!(scores[2].category, None);
    }
}
