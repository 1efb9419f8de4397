// Topic assignment provider trait — the seam to the external topic model.
//
// The topic model runs as its own batch job. The pipeline only needs its
// finished output, so any source that can hand back one assignment per
// document plugs in here: a JSON Lines export, an in-memory table in tests,
// or a future database reader.

use anyhow::Result;

use crate::models::TopicAssignment;

/// Source of per-document raw topic assignments.
pub trait TopicAssignmentProvider {
    /// Human-readable description of where the assignments come from.
    fn describe(&self) -> String;

    /// Load every assignment. Order is not significant.
    fn assignments(&self) -> Result<Vec<TopicAssignment>>;
}

impl TopicAssignmentProvider for Vec<TopicAssignment> {
    fn describe(&self) -> String {
        format!("in-memory ({} assignments)", self.len())
    }

    fn assignments(&self) -> Result<Vec<TopicAssignment>> {
        Ok(self.clone())
    }
}
