//! Post-batch sanity check: confirms the committed `MentorState` table
//! is internally consistent with the recorded outcomes before the
//! batch is handed to the caller (spec §4.7). A failure here means the
//! driver's own bookkeeping drifted from what the ranker committed —
//! never a user-correctable input problem, hence `PipelineError::InternalError`.

use mentoralloc_core::entities::{Mentor, MentorState};
use mentoralloc_core::trace::{AllocationOutcome, TraceRecord};

/// Check that every mentor's final state matches what the recorded
/// outcomes imply: `allocations_new` equals the declared value plus
/// the number of successes that landed on that mentor, and remaining
/// capacity never went negative (captured structurally by `u32`, but
/// checked against `declared_capacity` here for a coherent account).
pub fn validate_batch_outcome(
    mentors: &[Mentor],
    states: &[MentorState],
    per_student: &[(TraceRecord, AllocationOutcome)],
) -> Result<(), String> {
    if mentors.len() != states.len() {
        return Err(format!("mentor/state length mismatch: {} mentors, {} states", mentors.len(), states.len()));
    }

    let mut committed_per_mentor = vec![0u32; mentors.len()];
    for (_, outcome) in per_student {
        if let AllocationOutcome::Success { mentor_id, .. } = outcome {
            let index = mentors
                .iter()
                .position(|m| &m.mentor_id == mentor_id)
                .ok_or_else(|| format!("recorded success for unknown mentor '{mentor_id}'"))?;
            committed_per_mentor[index] += 1;
        }
    }

    let total_success = per_student.iter().filter(|(_, o)| matches!(o, AllocationOutcome::Success { .. })).count();
    let total_committed: u32 = committed_per_mentor.iter().sum();
    if total_committed as usize != total_success {
        return Err(format!(
            "success count mismatch: {total_success} recorded successes, {total_committed} committed allocations"
        ));
    }

    for (index, mentor) in mentors.iter().enumerate() {
        let state = &states[index];
        let expected_allocations = mentor.allocations_new + committed_per_mentor[index];
        if state.allocations_new != expected_allocations {
            return Err(format!(
                "mentor '{}': expected {expected_allocations} total allocations, state has {}",
                mentor.mentor_id, state.allocations_new
            ));
        }
        if state.remaining_capacity > state.declared_capacity {
            return Err(format!(
                "mentor '{}': remaining_capacity {} exceeds declared_capacity {}",
                mentor.mentor_id, state.remaining_capacity, state.declared_capacity
            ));
        }
        if state.allocations_new > state.declared_capacity {
            return Err(format!(
                "mentor '{}': allocations_new {} exceeds declared_capacity {}",
                mentor.mentor_id, state.allocations_new, state.declared_capacity
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mentoralloc_core::entities::MentorStatus;
    use mentoralloc_core::natural_key::MentorSortKey;
    use mentoralloc_core::policy::AllocationChannel;
    use mentoralloc_core::tokens::{MentorId, StudentId};
    use mentoralloc_core::trace::{HistoryStatus, SelectionReason};
    use std::collections::BTreeSet;

    fn mentor(id: &str, capacity: u32, allocations_new: u32) -> Mentor {
        Mentor {
            mentor_id: MentorId::new(id),
            mentor_sort_key: MentorSortKey::for_mentor_id(&MentorId::new(id)),
            capacity,
            allocations_new,
            mentor_status: MentorStatus::Active,
            join_keys: [1; 6],
            bound_school_codes: BTreeSet::new(),
            has_school_constraint: false,
            restriction: None,
        }
    }

    fn success_record(row_index: usize, mentor_id: &str) -> (TraceRecord, AllocationOutcome) {
        let trace = TraceRecord {
            row_index,
            student_id: StudentId::new(format!("S-{row_index}")),
            stages: vec![],
            allocation_channel: AllocationChannel::Generic,
            history_status: HistoryStatus::NewCandidate,
            dedupe_reason: None,
        };
        let outcome = AllocationOutcome::Success {
            mentor_id: MentorId::new(mentor_id),
            occupancy_ratio_before: 0.0,
            occupancy_ratio_after: 0.5,
            capacity_before: 2,
            capacity_after: 1,
            selection_reason: SelectionReason::MinOccupancyRatio,
            tie_breakers: vec![],
        };
        (trace, outcome)
    }

    #[test]
    fn consistent_batch_passes() {
        let mentors = vec![mentor("M-1", 2, 0)];
        let states = vec![MentorState { declared_capacity: 2, remaining_capacity: 1, allocations_new: 1 }];
        let per_student = vec![success_record(0, "M-1")];
        assert!(validate_batch_outcome(&mentors, &states, &per_student).is_ok());
    }

    #[test]
    fn allocation_count_mismatch_is_rejected() {
        let mentors = vec![mentor("M-1", 2, 0)];
        let states = vec![MentorState { declared_capacity: 2, remaining_capacity: 2, allocations_new: 0 }];
        let per_student = vec![success_record(0, "M-1")];
        assert!(validate_batch_outcome(&mentors, &states, &per_student).is_err());
    }

    #[test]
    fn remaining_capacity_above_declared_is_rejected() {
        let mentors = vec![mentor("M-1", 2, 0)];
        let states = vec![MentorState { declared_capacity: 2, remaining_capacity: 3, allocations_new: 0 }];
        assert!(validate_batch_outcome(&mentors, &states, &[]).is_err());
    }

    #[test]
    fn success_referencing_unknown_mentor_is_rejected() {
        let mentors = vec![mentor("M-1", 2, 0)];
        let states = vec![MentorState { declared_capacity: 2, remaining_capacity: 1, allocations_new: 1 }];
        let per_student = vec![success_record(0, "M-2")];
        assert!(validate_batch_outcome(&mentors, &states, &per_student).is_err());
    }
}
