//! History deduplication: tags each student `already_allocated` or
//! `new_candidate` against a read-only prior-allocation snapshot.
//!
//! Pure, idempotent, deterministic: run it twice over the same
//! `(Student, HistorySnapshot)` pair and it partitions identically.
//! Already-allocated students never reach the allocation loop, so no
//! mentor state is ever mutated on their account (invariant I4).

use mentoralloc_core::entities::HistorySnapshot;
use mentoralloc_core::entities::Student;
use mentoralloc_core::tokens::MentorId;
use mentoralloc_core::trace::HistoryStatus;

const DEDUPE_REASON_PRIOR_ALLOCATION: &str = "prior_allocation";

/// The result of checking one student against the history snapshot.
pub struct DedupeOutcome {
    pub history_status: HistoryStatus,
    pub dedupe_reason: Option<String>,
    pub history_mentor_id: Option<MentorId>,
    pub history_center_code: Option<i64>,
}

/// Check `student` against `history`. A student with no normalized
/// national code can never match a history row and is always
/// `new_candidate`.
pub fn dedupe_student(student: &Student, history: &HistorySnapshot) -> DedupeOutcome {
    let record = student.national_code_normalized.as_ref().and_then(|code| history.lookup(code));

    match record {
        Some(record) => DedupeOutcome {
            history_status: HistoryStatus::AlreadyAllocated,
            dedupe_reason: Some(DEDUPE_REASON_PRIOR_ALLOCATION.to_string()),
            history_mentor_id: Some(record.mentor_id.clone()),
            history_center_code: Some(record.center_code),
        },
        None => DedupeOutcome {
            history_status: HistoryStatus::NewCandidate,
            dedupe_reason: None,
            history_mentor_id: None,
            history_center_code: None,
        },
    }
}
