// JSON Lines topic assignments, as exported by the topic-model notebook.
//
//   {"id": 1842, "topic": 9, "probabilities": [0.01, ...]}

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use super::traits::TopicAssignmentProvider;
use crate::jsonl;
use crate::models::TopicAssignment;

pub struct JsonlTopicAssignments {
    pub path: PathBuf,
}

impl JsonlTopicAssignments {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TopicAssignmentProvider for JsonlTopicAssignments {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn assignments(&self) -> Result<Vec<TopicAssignment>> {
        let records: Vec<TopicAssignment> = jsonl::read_records(&self.path)?;
        info!(
            path = %self.path.display(),
            count = records.len(),
            "Loaded topic assignments"
        );
        Ok(records)
    }
}
