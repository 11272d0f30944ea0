//! Allocation-channel routing.
//!
//! A channel router maps a student to one of `SCHOOL`, `GOLESTAN`,
//! `SADRA`, or `GENERIC` by testing `PolicyConfig::allocation_channels`
//! in declared order and taking the first matching rule's tag. A
//! student matching no rule falls back to `GENERIC` — this fallback is
//! the router's own behavior, distinct from a policy-declared `Always`
//! predicate used as an explicit catch-all rule.

use mentoralloc_core::prelude::{AllocationChannel, ChannelPredicate, ChannelRule, Student};

/// Route `student` to its allocation channel using `rules`, in
/// declared order. Evaluating predicates is pure and does not consult
/// mentor state.
pub fn route(student: &Student, school_tokens: &[String], rules: &[ChannelRule]) -> AllocationChannel {
    for rule in rules {
        if predicate_matches(&rule.predicate, student, school_tokens) {
            return rule.tag;
        }
    }
    AllocationChannel::Generic
}

fn predicate_matches(predicate: &ChannelPredicate, student: &Student, school_tokens: &[String]) -> bool {
    match predicate {
        ChannelPredicate::JoinKeyEquals { key_index, value } => {
            student.join_keys.get(*key_index).map(|v| v == value).unwrap_or(false)
        }
        ChannelPredicate::JoinKeyIn { key_index, values } => student
            .join_keys
            .get(*key_index)
            .map(|v| values.contains(v))
            .unwrap_or(false),
        ChannelPredicate::HasSchoolCode => !school_tokens.is_empty(),
        ChannelPredicate::Not(inner) => !predicate_matches(inner, student, school_tokens),
        ChannelPredicate::All(inner) => inner.iter().all(|p| predicate_matches(p, student, school_tokens)),
        ChannelPredicate::Any(inner) => inner.iter().any(|p| predicate_matches(p, student, school_tokens)),
        ChannelPredicate::Always => true,
    }
}
