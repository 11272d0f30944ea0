//! The batch driver: one pass over students in input order, keeping a
//! single mutable `MentorState` table coherent for the whole batch.
//!
//! Per student: history dedupe → channel routing → the eight-stage
//! eligibility chain → rank and commit. No suspension points; the only
//! interruption mechanisms are a cooperative cancellation check and a
//! pure progress-reporter callback, both polled between students
//! (spec §5).

use mentoralloc_core::entities::{HistorySnapshot, Mentor, MentorState, Student};
use mentoralloc_core::normalize::split_school_tokens;
use mentoralloc_core::policy::{AllocationChannel, InvalidCenterPolicy, PolicyConfig, StageName};
use mentoralloc_core::tokens::StudentId;
use mentoralloc_core::trace::{AllocationOutcome, ErrorKind, HistoryStatus, StageResult, TraceRecord};

use mentoralloc_algo::eligibility::{self, ChainOutcome};
use mentoralloc_algo::{channel, rank};

use mentoralloc_io::input_tables::StudentRowError;

use crate::dedupe;
use crate::load::Batch;
use crate::validate;
use crate::PipelineError;

/// A pure, non-blocking progress callback: `(percent, message)`. Never
/// stored in core state, never invoked with a core lock held.
pub type ProgressFn<'a> = dyn Fn(u8, &str) + 'a;

/// A pure, non-blocking cancellation poll, checked between students.
pub type CancelFn<'a> = dyn Fn() -> bool + 'a;

/// Optional hooks a caller may supply for one `run_batch` call.
#[derive(Default)]
pub struct BatchControl<'a> {
    pub progress: Option<&'a ProgressFn<'a>>,
    pub cancel_requested: Option<&'a CancelFn<'a>>,
    /// Caller-supplied opaque label correlating this batch's log lines
    /// across a multi-batch caller. Never generated internally — doing
    /// so would pull a source of non-determinism into the driver.
    pub batch_label: Option<String>,
}

/// Everything the driver produced for one batch: per-student results
/// in input order, plus the mentor pool and its final mutable state
/// (for `mentoralloc_report` and the post-batch sanity check).
#[derive(Debug)]
pub struct BatchOutcome {
    pub per_student: Vec<(TraceRecord, AllocationOutcome)>,
    pub mentors: Vec<Mentor>,
    pub final_states: Vec<MentorState>,
    pub incomplete: bool,
}

/// Run the full batch: dedupe, route, filter, rank, and commit every
/// student in `batch.students`, in order.
pub fn run_batch(batch: &Batch, control: &BatchControl) -> Result<BatchOutcome, PipelineError> {
    let span_label = control
        .batch_label
        .clone()
        .or_else(|| batch.policy_digest.as_ref().map(|d| d.chars().take(12).collect()));
    let _span = tracing::info_span!("batch", label = span_label.as_deref().unwrap_or("unlabeled")).entered();

    let candidates = eligibility::prefilter_mentor_pool(&batch.mentors);
    let mut states: Vec<MentorState> = batch.mentors.iter().map(MentorState::from_mentor).collect();

    let total = batch.students.len();
    let mut per_student = Vec::with_capacity(total);

    for (i, student_result) in batch.students.iter().enumerate() {
        if let Some(cancel) = control.cancel_requested {
            if cancel() {
                tracing::warn!(processed = i, total, "batch cancelled");
                return Err(PipelineError::Cancelled {
                    processed: i,
                    total,
                    partial: Box::new(BatchOutcome {
                        per_student,
                        mentors: batch.mentors.clone(),
                        final_states: states,
                        incomplete: true,
                    }),
                });
            }
        }

        let (trace, outcome) = match student_result {
            Err(row_err) => row_error_outcome(row_err),
            Ok(student) => match allocate_one(student, &batch.policy, &batch.mentors, &mut states, &candidates, &batch.history)
            {
                StepOutcome::Recorded(trace, outcome) => (trace, outcome),
                StepOutcome::CapacityUnderflow { mentor_id } => {
                    return Err(PipelineError::CapacityUnderflow { mentor_id, row_index: student.row_index })
                }
            },
        };

        tracing::debug!(
            row_index = trace.row_index,
            student_id = %trace.student_id,
            history_status = ?trace.history_status,
            "student processed"
        );

        per_student.push((trace, outcome));

        if let Some(progress) = control.progress {
            let percent = if total == 0 { 100 } else { (((i + 1) * 100) / total) as u8 };
            progress(percent, "allocating");
        }
    }

    validate::validate_batch_outcome(&batch.mentors, &states, &per_student)
        .map_err(PipelineError::InternalError)?;

    let success_count = per_student
        .iter()
        .filter(|(_, o)| matches!(o, AllocationOutcome::Success { .. }))
        .count();
    tracing::info!(total, success_count, "batch complete");

    Ok(BatchOutcome { per_student, mentors: batch.mentors.clone(), final_states: states, incomplete: false })
}

enum StepOutcome {
    Recorded(TraceRecord, AllocationOutcome),
    CapacityUnderflow { mentor_id: String },
}

fn row_error_outcome(err: &StudentRowError) -> (TraceRecord, AllocationOutcome) {
    let trace = TraceRecord {
        row_index: err.row_index,
        student_id: StudentId::new(err.student_id.clone()),
        stages: placeholder_stages(),
        allocation_channel: AllocationChannel::Generic,
        history_status: HistoryStatus::NewCandidate,
        dedupe_reason: None,
    };
    let outcome = AllocationOutcome::Failed {
        error_kind: ErrorKind::JoinKeyDataMissing,
        detailed_reason: err.to_string(),
        suggested_actions: suggested_actions_for(ErrorKind::JoinKeyDataMissing),
    };
    (trace, outcome)
}

fn allocate_one(
    student: &Student,
    policy: &PolicyConfig,
    mentors: &[Mentor],
    states: &mut [MentorState],
    candidates: &[usize],
    history: &HistorySnapshot,
) -> StepOutcome {
    let school_tokens = split_school_tokens(student.school_code.as_deref().unwrap_or(""));
    let channel_tag = channel::route(student, &school_tokens, &policy.allocation_channels);
    let dedupe_outcome = dedupe::dedupe_student(student, history);

    if dedupe_outcome.history_status == HistoryStatus::AlreadyAllocated {
        let trace = TraceRecord {
            row_index: student.row_index,
            student_id: student.student_id.clone(),
            stages: placeholder_stages(),
            allocation_channel: channel_tag,
            history_status: HistoryStatus::AlreadyAllocated,
            dedupe_reason: dedupe_outcome.dedupe_reason,
        };
        let outcome = AllocationOutcome::SkippedHistory {
            history_mentor_id: dedupe_outcome.history_mentor_id.expect("already_allocated always carries a history row"),
            history_center_code: dedupe_outcome.history_center_code.expect("already_allocated always carries a history row"),
        };
        return StepOutcome::Recorded(trace, outcome);
    }

    let center_key_index = 4;
    let mut working_student = student.clone();
    if working_student.join_keys[center_key_index] < 0 {
        match policy.invalid_center_policy {
            InvalidCenterPolicy::Wildcard => {
                tracing::warn!(
                    row_index = student.row_index,
                    student_id = %student.student_id,
                    "invalid center value downgraded to wildcard"
                );
                working_student.join_keys[center_key_index] = 0;
            }
            InvalidCenterPolicy::Fail => {
                let trace = TraceRecord {
                    row_index: student.row_index,
                    student_id: student.student_id.clone(),
                    stages: placeholder_stages(),
                    allocation_channel: channel_tag,
                    history_status: HistoryStatus::NewCandidate,
                    dedupe_reason: None,
                };
                let outcome = AllocationOutcome::Failed {
                    error_kind: ErrorKind::InvalidCenter,
                    detailed_reason: "center value is negative and the policy requires a hard failure".to_string(),
                    suggested_actions: suggested_actions_for(ErrorKind::InvalidCenter),
                };
                return StepOutcome::Recorded(trace, outcome);
            }
        }
    }

    let chain = eligibility::run_chain(&working_student, &school_tokens, channel_tag, policy, mentors, states, candidates);

    if chain.survivors.is_empty() {
        let (error_kind, detailed_reason) = classify_chain_failure(&chain);
        let trace = TraceRecord {
            row_index: student.row_index,
            student_id: student.student_id.clone(),
            stages: chain.stages,
            allocation_channel: channel_tag,
            history_status: HistoryStatus::NewCandidate,
            dedupe_reason: None,
        };
        let outcome = AllocationOutcome::Failed {
            error_kind,
            detailed_reason,
            suggested_actions: suggested_actions_for(error_kind),
        };
        return StepOutcome::Recorded(trace, outcome);
    }

    let ranked = rank::rank_survivors(mentors, states, &chain.survivors);
    let selection = rank::select_winner(mentors, states, &ranked).expect("ranked is non-empty");

    match rank::commit(states, selection.mentor_index) {
        Ok((occupancy_ratio_before, occupancy_ratio_after, capacity_before, capacity_after)) => {
            let trace = TraceRecord {
                row_index: student.row_index,
                student_id: student.student_id.clone(),
                stages: chain.stages,
                allocation_channel: channel_tag,
                history_status: HistoryStatus::NewCandidate,
                dedupe_reason: None,
            };
            let outcome = AllocationOutcome::Success {
                mentor_id: mentors[selection.mentor_index].mentor_id.clone(),
                occupancy_ratio_before,
                occupancy_ratio_after,
                capacity_before,
                capacity_after,
                selection_reason: selection.selection_reason,
                tie_breakers: selection.tie_breakers.into_iter().take(5).collect(),
            };
            StepOutcome::Recorded(trace, outcome)
        }
        Err(()) => StepOutcome::CapacityUnderflow { mentor_id: mentors[selection.mentor_index].mentor_id.to_string() },
    }
}

fn placeholder_stages() -> Vec<StageResult> {
    StageName::FIXED_ORDER.iter().map(|&name| StageResult { name, before_count: 0, after_count: 0, drop_reason: None }).collect()
}

/// Classify an empty-survivor chain by the last non-trivial stage that
/// dropped candidates (spec §4.6): `capacity_gate` eliminating the
/// last candidate is `CAPACITY_FULL`, anything else is
/// `ELIGIBILITY_NO_MATCH`.
fn classify_chain_failure(chain: &ChainOutcome) -> (ErrorKind, String) {
    match chain.stages.iter().find(|s| s.drop_reason.is_some()) {
        Some(stage) if stage.name == StageName::CapacityGate => {
            (ErrorKind::CapacityFull, stage.drop_reason.clone().unwrap())
        }
        Some(stage) => (ErrorKind::EligibilityNoMatch, stage.drop_reason.clone().unwrap()),
        None => (ErrorKind::EligibilityNoMatch, "no eligible mentors remained".to_string()),
    }
}

fn suggested_actions_for(kind: ErrorKind) -> Vec<String> {
    match kind {
        ErrorKind::JoinKeyDataMissing => {
            vec!["fill in the missing join-key column for this row and resubmit".to_string()]
        }
        ErrorKind::EligibilityNoMatch => {
            vec!["review this student's join-key values against the active mentor pool".to_string()]
        }
        ErrorKind::CapacityFull => vec![
            "increase capacity for a mentor in this student's channel".to_string(),
            "review whether an earlier student exhausted the only eligible mentor".to_string(),
        ],
        ErrorKind::InvalidCenter => vec!["correct the student's center column".to_string()],
    }
}
