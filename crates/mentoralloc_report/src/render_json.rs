//! Serializes the four output tables to canonical JSON bytes: sorted
//! object keys, no trailing newline, same encoding
//! `mentoralloc_io::canonical_json` uses for policy and batch digests,
//! so every artifact this engine writes is byte-identical across runs
//! by the same rule.

use mentoralloc_io::canonical_json::to_canonical_json_bytes;
use mentoralloc_pipeline::driver::BatchOutcome;
use mentoralloc_pipeline::summary::BatchSummary;

use crate::structure::{self, AssignmentRow, LogRow, SummaryTable, TraceRow};
use crate::ReportError;

/// The three per-student tables for one completed batch. Kept
/// together since all three are always derived from the same
/// `BatchOutcome` in one pass.
pub struct StudentTables {
    pub assignments: Vec<AssignmentRow>,
    pub trace: Vec<TraceRow>,
    pub log: Vec<LogRow>,
}

pub fn build_student_tables(outcome: &BatchOutcome) -> StudentTables {
    StudentTables {
        assignments: structure::build_assignments(outcome),
        trace: structure::build_trace(outcome),
        log: structure::build_log(outcome),
    }
}

/// Render any of this crate's table types to canonical JSON bytes.
pub fn render_canonical<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, ReportError> {
    let json = serde_json::to_value(value).map_err(|e| ReportError::Serialize(e.to_string()))?;
    Ok(to_canonical_json_bytes(&json))
}

pub fn render_assignments(outcome: &BatchOutcome) -> Result<Vec<u8>, ReportError> {
    render_canonical(&structure::build_assignments(outcome))
}

pub fn render_trace(outcome: &BatchOutcome) -> Result<Vec<u8>, ReportError> {
    render_canonical(&structure::build_trace(outcome))
}

pub fn render_log(outcome: &BatchOutcome) -> Result<Vec<u8>, ReportError> {
    render_canonical(&structure::build_log(outcome))
}

pub fn render_summary(summary: &BatchSummary) -> Result<Vec<u8>, ReportError> {
    render_canonical(&structure::build_summary(summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mentoralloc_core::entities::{Mentor, MentorState, MentorStatus};
    use mentoralloc_core::natural_key::MentorSortKey;
    use mentoralloc_core::policy::{AllocationChannel, StageName};
    use mentoralloc_core::tokens::{MentorId, StudentId};
    use mentoralloc_core::trace::{
        AllocationOutcome, HistoryStatus, SelectionReason, StageResult, TraceRecord,
    };
    use std::collections::BTreeSet;

    fn mentor() -> Mentor {
        Mentor {
            mentor_id: MentorId::new("M-1"),
            mentor_sort_key: MentorSortKey::for_mentor_id(&MentorId::new("M-1")),
            capacity: 2,
            allocations_new: 1,
            mentor_status: MentorStatus::Active,
            join_keys: [1; 6],
            bound_school_codes: BTreeSet::new(),
            has_school_constraint: false,
            restriction: None,
        }
    }

    fn outcome() -> BatchOutcome {
        let trace = TraceRecord {
            row_index: 0,
            student_id: StudentId::new("S-1"),
            stages: StageName::FIXED_ORDER
                .iter()
                .map(|&name| StageResult { name, before_count: 1, after_count: 1, drop_reason: None })
                .collect(),
            allocation_channel: AllocationChannel::Generic,
            history_status: HistoryStatus::NewCandidate,
            dedupe_reason: None,
        };
        let result = AllocationOutcome::Success {
            mentor_id: MentorId::new("M-1"),
            occupancy_ratio_before: 0.0,
            occupancy_ratio_after: 0.5,
            capacity_before: 2,
            capacity_after: 1,
            selection_reason: SelectionReason::MinOccupancyRatio,
            tie_breakers: vec![],
        };
        BatchOutcome {
            per_student: vec![(trace, result)],
            mentors: vec![mentor()],
            final_states: vec![MentorState { declared_capacity: 2, remaining_capacity: 1, allocations_new: 1 }],
            incomplete: false,
        }
    }

    #[test]
    fn assignments_render_as_sorted_canonical_json() {
        let bytes = render_assignments(&outcome()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with('['));
        assert!(text.contains("\"mentor_id\":\"M-1\""));
        assert!(!text.ends_with('\n'));
    }

    #[test]
    fn trace_render_contains_eight_stages() {
        let bytes = render_trace(&outcome()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value[0]["stages"].as_array().unwrap().len(), 8);
    }

    #[test]
    fn log_render_has_one_row() {
        let bytes = render_log(&outcome()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 1);
    }

    #[test]
    fn summary_render_round_trips() {
        let summary = mentoralloc_pipeline::summary::summarize(&outcome());
        let bytes = render_summary(&summary).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["success_count"], 1);
    }
}
