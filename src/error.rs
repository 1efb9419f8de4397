// Domain errors that callers need to tell apart.
//
// Join and validation problems never show up here: they are recovered by
// excluding the document and counting it in the merge report. These
// variants are the fatal configuration errors.

/// Fatal analysis errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    /// The topic model produced raw topic ids the mapping does not cover.
    #[error(
        "Unmapped topic id(s) {} in topic mapping '{version}'. \
         Add them to the mapping (use null to drop a topic).",
        join_ids(.raw_topic_ids)
    )]
    UnmappedTopic {
        raw_topic_ids: Vec<u32>,
        version: String,
    },

    #[error("Invalid topic mapping: {0}")]
    InvalidMapping(String),

    #[error("Invalid analysis config: {0}")]
    InvalidConfig(String),
}

fn join_ids(ids: &[u32]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmapped_topic_message_names_ids() {
        let err = AnalysisError::UnmappedTopic {
            raw_topic_ids: vec![15, 16],
            version: "v1".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("15, 16"), "got: {msg}");
        assert!(msg.contains("'v1'"), "got: {msg}");
    }
}
