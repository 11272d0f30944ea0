//! The eligibility filter chain: eight fixed stages run in order against
//! a pre-filtered mentor pool, producing a `StageResult` per stage and
//! the surviving mentor indices.
//!
//! The first six stages (`Type`, `Group`, `Gender`, `GraduationStatus`,
//! `Center`, `Finance`) correspond positionally to
//! `PolicyConfig::join_keys[0..6]`: stage *i* compares against join-key
//! index *i*. `School` and `CapacityGate` are not join-key driven; they
//! consult `SchoolBinding` and live mentor capacity respectively.

use mentoralloc_core::prelude::{
    AllocationChannel, Mentor, MentorState, PolicyConfig, SchoolBindingMode, StageKind, StageName, StageResult,
    Student,
};

/// Remove `FROZEN` mentors from the pool entirely. `RESTRICTED_*`
/// mentors remain, but when their mentor row declared a `restriction`
/// column for a given join key, `Mentor::effective_join_key` intersects
/// it with that mentor's declared value during the chain below.
pub fn prefilter_mentor_pool(mentors: &[Mentor]) -> Vec<usize> {
    mentors
        .iter()
        .enumerate()
        .filter(|(_, m)| !m.mentor_status.is_frozen())
        .map(|(i, _)| i)
        .collect()
}

/// Result of running the full chain for one student against one
/// pre-filtered pool: the per-stage trace (always eight entries, one
/// per `StageName::FIXED_ORDER` slot, even when the student dropped out
/// early) and the indices of mentors still standing at the end.
pub struct ChainOutcome {
    pub stages: Vec<StageResult>,
    pub survivors: Vec<usize>,
}

/// Run the eligibility chain for `student` against the pre-filtered
/// pool `candidates` (indices into `mentors`/`states`). `channel` is
/// the student's already-routed allocation channel — the `type` stage
/// (spec §4.5 stage 1) consults it to pick `school_statuses` over
/// `normal_statuses` when restricting the student's value.
pub fn run_chain(
    student: &Student,
    school_tokens: &[String],
    channel: AllocationChannel,
    policy: &PolicyConfig,
    mentors: &[Mentor],
    states: &[MentorState],
    candidates: &[usize],
) -> ChainOutcome {
    let mut survivors: Vec<usize> = candidates.to_vec();
    let mut stages = Vec::with_capacity(StageName::FIXED_ORDER.len());

    for (stage_pos, stage_name) in StageName::FIXED_ORDER.iter().enumerate() {
        let before_count = survivors.len();
        let descriptor = &policy.trace_stages[stage_pos];

        if before_count == 0 {
            // Student already eliminated: stage still appears in the
            // trace with zero before/after and no new drop reason.
            stages.push(StageResult {
                name: *stage_name,
                before_count: 0,
                after_count: 0,
                drop_reason: None,
            });
            continue;
        }

        survivors = match stage_name {
            StageName::Type => filter_type_stage(student, mentors, policy, channel, descriptor.kind, &survivors),
            StageName::School => filter_school(student, school_tokens, policy, mentors, &survivors),
            StageName::CapacityGate => filter_capacity_gate(states, &survivors),
            _ => filter_join_key_stage(student, mentors, stage_pos, descriptor.kind, &survivors),
        };

        let after_count = survivors.len();
        stages.push(StageResult {
            name: *stage_name,
            before_count,
            after_count,
            drop_reason: if after_count == 0 { Some(descriptor.drop_reason.clone()) } else { None },
        });
    }

    ChainOutcome { stages, survivors }
}

fn filter_join_key_stage(
    student: &Student,
    mentors: &[Mentor],
    key_index: usize,
    kind: StageKind,
    candidates: &[usize],
) -> Vec<usize> {
    let student_value = student.join_keys[key_index];
    candidates
        .iter()
        .copied()
        .filter(|&idx| {
            let mentor = &mentors[idx];
            match mentor.effective_join_key(key_index) {
                None => false,
                Some(mentor_value) => match kind {
                    StageKind::ExactInt => mentor_value == student_value,
                    StageKind::Membership => mentor_value == 0 || mentor_value == student_value,
                    StageKind::WildcardAware => student_value == 0 || mentor_value == student_value,
                    StageKind::CapacityGate => true,
                },
            }
        })
        .collect()
}

/// Stage 1 (`type`): the base equality check against join-key index 0,
/// plus the additional restriction spec §4.5 describes as "restricted
/// by `normal_statuses` vs `school_statuses`" — the student's value at
/// that join key must also belong to the status set matching its
/// routed channel. An empty status set is read as "no restriction
/// declared" rather than "nothing is allowed".
fn filter_type_stage(
    student: &Student,
    mentors: &[Mentor],
    policy: &PolicyConfig,
    channel: AllocationChannel,
    kind: StageKind,
    candidates: &[usize],
) -> Vec<usize> {
    let allowed_statuses = if channel == AllocationChannel::School {
        &policy.school_statuses
    } else {
        &policy.normal_statuses
    };
    if !allowed_statuses.is_empty() && !allowed_statuses.contains(&student.join_keys[0]) {
        return Vec::new();
    }
    filter_join_key_stage(student, mentors, 0, kind, candidates)
}

fn filter_school(
    student: &Student,
    school_tokens: &[String],
    policy: &PolicyConfig,
    mentors: &[Mentor],
    candidates: &[usize],
) -> Vec<usize> {
    if policy.school_binding.mode == SchoolBindingMode::Global {
        return candidates.to_vec();
    }

    let student_is_wildcard =
        school_tokens.is_empty() || school_tokens.iter().all(|t| policy.school_binding.empty_tokens.contains(t));

    candidates
        .iter()
        .copied()
        .filter(|&idx| {
            let mentor = &mentors[idx];
            if !mentor.has_school_constraint {
                return true;
            }
            if policy.school_binding.zero_as_wildcard && mentor.bound_school_codes.is_empty() {
                return true;
            }
            if student_is_wildcard {
                return false;
            }
            school_tokens.iter().any(|t| mentor.bound_school_codes.contains(t))
        })
        .collect()
}

fn filter_capacity_gate(states: &[MentorState], candidates: &[usize]) -> Vec<usize> {
    candidates.iter().copied().filter(|&idx| states[idx].remaining_capacity > 0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mentoralloc_core::prelude::{
        InvalidCenterPolicy, JOIN_KEY_COUNT, MentorId, MentorStatus, RankingRule, SchoolBinding, TraceStageDescriptor,
    };
    use std::collections::BTreeSet;

    fn descriptor(name: StageName, kind: StageKind) -> TraceStageDescriptor {
        TraceStageDescriptor {
            name,
            source_column: name.as_str().to_string(),
            kind,
            drop_reason: format!("no_match_{}", name.as_str()),
        }
    }

    fn policy(school_mode: SchoolBindingMode) -> PolicyConfig {
        PolicyConfig {
            version: "1".into(),
            join_keys: [
                "type".into(),
                "group".into(),
                "gender".into(),
                "graduation_status".into(),
                "center".into(),
                "finance".into(),
            ],
            normal_statuses: BTreeSet::new(),
            school_statuses: BTreeSet::new(),
            ranking_rules: RankingRule::FIXED_SEQUENCE,
            trace_stages: [
                descriptor(StageName::Type, StageKind::ExactInt),
                descriptor(StageName::Group, StageKind::Membership),
                descriptor(StageName::Gender, StageKind::ExactInt),
                descriptor(StageName::GraduationStatus, StageKind::ExactInt),
                descriptor(StageName::Center, StageKind::WildcardAware),
                descriptor(StageName::Finance, StageKind::ExactInt),
                descriptor(StageName::School, StageKind::WildcardAware),
                descriptor(StageName::CapacityGate, StageKind::CapacityGate),
            ],
            allocation_channels: Vec::new(),
            school_binding: SchoolBinding {
                mode: school_mode,
                empty_tokens: BTreeSet::new(),
                zero_as_wildcard: true,
            },
            invalid_center_policy: InvalidCenterPolicy::Wildcard,
        }
    }

    fn mentor(id: &str, join_keys: [i64; JOIN_KEY_COUNT], status: MentorStatus) -> Mentor {
        Mentor {
            mentor_id: MentorId::new(id),
            mentor_sort_key: mentoralloc_core::prelude::MentorSortKey::for_mentor_id(&MentorId::new(id)),
            capacity: 2,
            allocations_new: 0,
            mentor_status: status,
            join_keys,
            bound_school_codes: BTreeSet::new(),
            has_school_constraint: false,
            restriction: None,
        }
    }

    fn student(join_keys: [i64; JOIN_KEY_COUNT]) -> Student {
        Student { student_id: "S-1".into(), national_code_normalized: None, join_keys, school_code: None, row_index: 0 }
    }

    #[test]
    fn frozen_mentor_excluded_before_stage_one() {
        let mentors = vec![mentor("M-1", [1; JOIN_KEY_COUNT], MentorStatus::Frozen)];
        assert_eq!(prefilter_mentor_pool(&mentors), Vec::<usize>::new());
    }

    #[test]
    fn exact_match_survives_all_stages() {
        let p = policy(SchoolBindingMode::Global);
        let mentors = vec![mentor("M-1", [1, 1, 1, 1, 1, 1], MentorStatus::Active)];
        let states: Vec<MentorState> = mentors.iter().map(MentorState::from_mentor).collect();
        let candidates = prefilter_mentor_pool(&mentors);
        let outcome = run_chain(&student([1, 1, 1, 1, 1, 1]), &[], AllocationChannel::Generic, &p, &mentors, &states, &candidates);
        assert_eq!(outcome.survivors, vec![0]);
        assert_eq!(outcome.stages.len(), 8);
        assert!(outcome.stages.iter().all(|s| s.drop_reason.is_none()));
    }

    #[test]
    fn mismatch_at_gender_drops_with_reason_and_later_stages_still_recorded() {
        let p = policy(SchoolBindingMode::Global);
        let mentors = vec![mentor("M-1", [1, 1, 2, 1, 1, 1], MentorStatus::Active)];
        let states: Vec<MentorState> = mentors.iter().map(MentorState::from_mentor).collect();
        let candidates = prefilter_mentor_pool(&mentors);
        let outcome = run_chain(&student([1, 1, 1, 1, 1, 1]), &[], AllocationChannel::Generic, &p, &mentors, &states, &candidates);
        assert!(outcome.survivors.is_empty());
        assert_eq!(outcome.stages.len(), 8);
        assert_eq!(outcome.stages[2].name, StageName::Gender);
        assert!(outcome.stages[2].drop_reason.is_some());
        // Stages after the elimination point are still emitted, empty.
        assert_eq!(outcome.stages[7].before_count, 0);
    }

    #[test]
    fn membership_kind_treats_zero_as_mentor_wildcard() {
        let p = policy(SchoolBindingMode::Global);
        let mentors = vec![mentor("M-1", [1, 0, 1, 1, 1, 1], MentorStatus::Active)];
        let states: Vec<MentorState> = mentors.iter().map(MentorState::from_mentor).collect();
        let candidates = prefilter_mentor_pool(&mentors);
        let outcome = run_chain(&student([1, 5, 1, 1, 1, 1]), &[], AllocationChannel::Generic, &p, &mentors, &states, &candidates);
        assert_eq!(outcome.survivors, vec![0]);
    }

    #[test]
    fn capacity_gate_excludes_exhausted_mentor() {
        let p = policy(SchoolBindingMode::Global);
        let mut m = mentor("M-1", [1, 1, 1, 1, 1, 1], MentorStatus::Active);
        m.capacity = 1;
        m.allocations_new = 1;
        let mentors = vec![m];
        let states: Vec<MentorState> = mentors.iter().map(MentorState::from_mentor).collect();
        let candidates = prefilter_mentor_pool(&mentors);
        let outcome = run_chain(&student([1, 1, 1, 1, 1, 1]), &[], AllocationChannel::Generic, &p, &mentors, &states, &candidates);
        assert!(outcome.survivors.is_empty());
        assert_eq!(outcome.stages.last().unwrap().name, StageName::CapacityGate);
    }

    #[test]
    fn restricted_mentor_intersection_applied_during_stage() {
        let p = policy(SchoolBindingMode::Global);
        let mut m = mentor("M-1", [1, 1, 1, 1, 1, 1], MentorStatus::Restricted("profile-a".into()));
        let mut overrides = mentoralloc_core::prelude::RestrictionOverrides::new();
        overrides.insert(0, BTreeSet::from([9]));
        m.restriction = Some(overrides);
        let mentors = vec![m];
        let states: Vec<MentorState> = mentors.iter().map(MentorState::from_mentor).collect();
        let candidates = prefilter_mentor_pool(&mentors);
        let outcome = run_chain(&student([1, 1, 1, 1, 1, 1]), &[], AllocationChannel::Generic, &p, &mentors, &states, &candidates);
        assert!(outcome.survivors.is_empty());
        assert_eq!(outcome.stages[0].name, StageName::Type);
        assert!(outcome.stages[0].drop_reason.is_some());
    }

    #[test]
    fn type_stage_restricts_by_normal_statuses_outside_school_channel() {
        let mut p = policy(SchoolBindingMode::Global);
        p.normal_statuses = BTreeSet::from([1, 2]);
        p.school_statuses = BTreeSet::from([9]);
        let mentors = vec![mentor("M-1", [1, 1, 1, 1, 1, 1], MentorStatus::Active)];
        let states: Vec<MentorState> = mentors.iter().map(MentorState::from_mentor).collect();
        let candidates = prefilter_mentor_pool(&mentors);

        // Student's type value (1) is in normal_statuses: survives.
        let outcome =
            run_chain(&student([1, 1, 1, 1, 1, 1]), &[], AllocationChannel::Generic, &p, &mentors, &states, &candidates);
        assert_eq!(outcome.survivors, vec![0]);

        // Same student value, but only school_statuses (which excludes 1)
        // applies on the SCHOOL channel: dropped at stage 1.
        let outcome =
            run_chain(&student([1, 1, 1, 1, 1, 1]), &[], AllocationChannel::School, &p, &mentors, &states, &candidates);
        assert!(outcome.survivors.is_empty());
        assert_eq!(outcome.stages[0].name, StageName::Type);
        assert!(outcome.stages[0].drop_reason.is_some());
    }

    #[test]
    fn type_stage_status_restriction_is_a_noop_when_sets_are_empty() {
        let p = policy(SchoolBindingMode::Global);
        let mentors = vec![mentor("M-1", [1, 1, 1, 1, 1, 1], MentorStatus::Active)];
        let states: Vec<MentorState> = mentors.iter().map(MentorState::from_mentor).collect();
        let candidates = prefilter_mentor_pool(&mentors);
        let outcome =
            run_chain(&student([1, 1, 1, 1, 1, 1]), &[], AllocationChannel::School, &p, &mentors, &states, &candidates);
        assert_eq!(outcome.survivors, vec![0]);
    }
}
