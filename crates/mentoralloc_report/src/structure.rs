//! The four output-table row shapes and the pure mapping functions that
//! build them from a completed `BatchOutcome`/`BatchSummary`. No I/O,
//! no recomputation — every value here was already decided by
//! `mentoralloc_pipeline`; this module only reshapes it for display.

use serde::Serialize;

use mentoralloc_core::policy::{AllocationChannel, StageName};
use mentoralloc_core::tokens::{MentorId, StudentId};
use mentoralloc_core::trace::{AllocationOutcome, ErrorKind, SelectionReason, TraceRecord};

use mentoralloc_pipeline::driver::BatchOutcome;
use mentoralloc_pipeline::summary::{BatchSummary, StageSurvivalHistogram};

/// One row of the assignments table: present only for students who
/// ended up with a mentor, fresh or historical. `occupancy_ratio_*`,
/// `capacity_*`, and `selection_reason` are `None` for a history
/// diversion, since no mentor state was mutated on its account.
#[derive(Clone, Debug, Serialize)]
pub struct AssignmentRow {
    pub row_index: usize,
    pub student_id: StudentId,
    pub mentor_id: MentorId,
    pub occupancy_ratio_before: Option<f64>,
    pub occupancy_ratio_after: Option<f64>,
    pub capacity_before: Option<u32>,
    pub capacity_after: Option<u32>,
    pub allocation_channel: AllocationChannel,
    pub selection_reason: Option<SelectionReason>,
}

/// One declared eligibility stage within a student's trace row.
#[derive(Clone, Debug, Serialize)]
pub struct TraceStageRow {
    pub stage_name: StageName,
    pub before_count: usize,
    pub after_count: usize,
    pub drop_reason: Option<String>,
}

/// The full eight-stage trace for one student.
#[derive(Clone, Debug, Serialize)]
pub struct TraceRow {
    pub row_index: usize,
    pub student_id: StudentId,
    pub stages: Vec<TraceStageRow>,
    pub history_status: mentoralloc_core::trace::HistoryStatus,
    pub dedupe_reason: Option<String>,
}

/// One row of the log table: every processed student gets exactly one,
/// regardless of outcome.
#[derive(Clone, Debug, Serialize)]
pub struct LogRow {
    pub row_index: usize,
    pub student_id: StudentId,
    pub status: &'static str,
    pub error_kind: Option<ErrorKind>,
    pub detailed_reason: Option<String>,
    pub suggested_actions: Vec<String>,
    pub candidate_count: usize,
    pub allocation_channel: AllocationChannel,
}

/// The rendered summary table — a thin, serializable mirror of
/// `BatchSummary`.
#[derive(Clone, Debug, Serialize)]
pub struct SummaryTable {
    pub total_students: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub skipped_history_count: usize,
    pub by_channel: std::collections::BTreeMap<String, usize>,
    pub stage_survival: Vec<StageSurvivalHistogram>,
    pub same_history_mentor_ratio: Option<f64>,
    pub incomplete: bool,
}

pub fn build_assignments(outcome: &BatchOutcome) -> Vec<AssignmentRow> {
    outcome
        .per_student
        .iter()
        .filter_map(|(trace, result)| assignment_row(trace, result))
        .collect()
}

fn assignment_row(trace: &TraceRecord, result: &AllocationOutcome) -> Option<AssignmentRow> {
    match result {
        AllocationOutcome::Success {
            mentor_id,
            occupancy_ratio_before,
            occupancy_ratio_after,
            capacity_before,
            capacity_after,
            selection_reason,
            ..
        } => Some(AssignmentRow {
            row_index: trace.row_index,
            student_id: trace.student_id.clone(),
            mentor_id: mentor_id.clone(),
            occupancy_ratio_before: Some(*occupancy_ratio_before),
            occupancy_ratio_after: Some(*occupancy_ratio_after),
            capacity_before: Some(*capacity_before),
            capacity_after: Some(*capacity_after),
            allocation_channel: trace.allocation_channel,
            selection_reason: Some(*selection_reason),
        }),
        AllocationOutcome::SkippedHistory { history_mentor_id, .. } => Some(AssignmentRow {
            row_index: trace.row_index,
            student_id: trace.student_id.clone(),
            mentor_id: history_mentor_id.clone(),
            occupancy_ratio_before: None,
            occupancy_ratio_after: None,
            capacity_before: None,
            capacity_after: None,
            allocation_channel: trace.allocation_channel,
            selection_reason: None,
        }),
        AllocationOutcome::Failed { .. } => None,
    }
}

pub fn build_trace(outcome: &BatchOutcome) -> Vec<TraceRow> {
    outcome
        .per_student
        .iter()
        .map(|(trace, _)| TraceRow {
            row_index: trace.row_index,
            student_id: trace.student_id.clone(),
            stages: trace
                .stages
                .iter()
                .map(|s| TraceStageRow {
                    stage_name: s.name,
                    before_count: s.before_count,
                    after_count: s.after_count,
                    drop_reason: s.drop_reason.clone(),
                })
                .collect(),
            history_status: trace.history_status,
            dedupe_reason: trace.dedupe_reason.clone(),
        })
        .collect()
}

pub fn build_log(outcome: &BatchOutcome) -> Vec<LogRow> {
    outcome.per_student.iter().map(|(trace, result)| log_row(trace, result)).collect()
}

fn log_row(trace: &TraceRecord, result: &AllocationOutcome) -> LogRow {
    let candidate_count = trace.stages.last().map(|s| s.after_count).unwrap_or(0);

    let (status, error_kind, detailed_reason, suggested_actions) = match result {
        AllocationOutcome::Success { .. } => ("success", None, None, Vec::new()),
        AllocationOutcome::SkippedHistory { .. } => ("skipped_history", None, None, Vec::new()),
        AllocationOutcome::Failed { error_kind, detailed_reason, suggested_actions } => {
            ("failed", Some(*error_kind), Some(detailed_reason.clone()), suggested_actions.clone())
        }
    };

    LogRow {
        row_index: trace.row_index,
        student_id: trace.student_id.clone(),
        status,
        error_kind,
        detailed_reason,
        suggested_actions,
        candidate_count,
        allocation_channel: trace.allocation_channel,
    }
}

pub fn build_summary(summary: &BatchSummary) -> SummaryTable {
    SummaryTable {
        total_students: summary.total_students,
        success_count: summary.success_count,
        failed_count: summary.failed_count,
        skipped_history_count: summary.skipped_history_count,
        by_channel: summary.by_channel.clone(),
        stage_survival: summary.stage_survival.clone(),
        same_history_mentor_ratio: summary.same_history_mentor_ratio,
        incomplete: summary.incomplete,
    }
}
