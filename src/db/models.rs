// Data models — Rust structs that map to database rows.
//
// GroupStat and ComparisonResult rows reuse the pipeline types directly;
// only the run header needs its own struct.

use serde::{Deserialize, Serialize};

use crate::models::FactionId;
use crate::pipeline::consolidate::ConsolidationReport;
use crate::pipeline::merge::MergeReport;

/// One stored analysis run, as listed by `parlsent history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: i64,
    pub created_at: String,
    pub mapping_version: String,
    pub test_kind: String,
    pub correction: String,
    pub faction_a: FactionId,
    pub faction_b: FactionId,
    pub by_year: bool,
    pub merged_records: usize,
    pub note: Option<String>,
    pub merge_report: MergeReport,
    pub consolidation_report: ConsolidationReport,
    /// Comparisons that produced a test result
    pub tested: usize,
    /// Tested comparisons significant after correction
    pub significant: usize,
}
