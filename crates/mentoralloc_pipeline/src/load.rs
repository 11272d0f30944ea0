//! Assembles one batch's worth of inputs: the validated policy and the
//! three input tables, ready for the driver.
//!
//! Parsing itself lives in `mentoralloc_io`; this module is the single
//! place that turns "policy text + three JSON row arrays" into a
//! `Batch`, classifying failures the way the CLI's exit codes expect
//! (policy-invalid vs input-invalid are distinguished by `PipelineError`).

use mentoralloc_core::entities::{HistorySnapshot, Mentor};
use mentoralloc_core::policy::PolicyConfig;

use mentoralloc_io::input_tables::{RawHistoryRow, RawMentorRow, RawStudentRow, StudentRowError};

use crate::PipelineError;

/// One batch's inputs: an immutable policy plus the three input
/// tables. `students` keeps a per-row `Result` so a single malformed
/// student row never aborts the rest of the batch (spec §7).
pub struct Batch {
    pub policy: PolicyConfig,
    pub policy_digest: Option<String>,
    pub students: Vec<Result<mentoralloc_core::entities::Student, StudentRowError>>,
    pub mentors: Vec<Mentor>,
    pub history: HistorySnapshot,
}

/// Build a `Batch` from an already-parsed policy and already-deserialized
/// raw rows. Mentor and history rows are batch-aborting on failure (a
/// malformed mentor pool can leave silent capacity gaps); student rows
/// are per-row and never abort.
pub fn load_batch(
    policy: PolicyConfig,
    policy_digest: Option<String>,
    student_rows: &[RawStudentRow],
    mentor_rows: &[RawMentorRow],
    history_rows: &[RawHistoryRow],
) -> Result<Batch, PipelineError> {
    let students = mentoralloc_io::input_tables::parse_student_rows(student_rows, &policy);
    let mentors = mentoralloc_io::input_tables::parse_mentor_rows(mentor_rows, &policy)
        .map_err(|e| PipelineError::InputInvalid(format!("mentor pool: {e}")))?;
    let history = mentoralloc_io::input_tables::parse_history_rows(history_rows);

    Ok(Batch { policy, policy_digest, students, mentors, history })
}

/// Convenience entry point for callers (the CLI) that hold raw JSON
/// text rather than already-deserialized rows: parses and validates
/// the policy, deserializes the three row arrays, and builds the batch.
#[cfg(feature = "serde")]
pub fn load_batch_from_json(
    policy_json: &str,
    students_json: &str,
    pool_json: &str,
    history_json: &str,
) -> Result<Batch, PipelineError> {
    let (policy, policy_digest) = mentoralloc_io::policy_loader::load_policy_str(policy_json)?;

    let student_rows: Vec<RawStudentRow> =
        serde_json::from_str(students_json).map_err(|e| PipelineError::InputInvalid(format!("students: {e}")))?;
    let mentor_rows: Vec<RawMentorRow> =
        serde_json::from_str(pool_json).map_err(|e| PipelineError::InputInvalid(format!("mentor pool: {e}")))?;
    let history_rows: Vec<RawHistoryRow> =
        serde_json::from_str(history_json).map_err(|e| PipelineError::InputInvalid(format!("history: {e}")))?;

    load_batch(policy, Some(policy_digest), &student_rows, &mentor_rows, &history_rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mentoralloc_core::policy::{
        AllocationChannel, ChannelPredicate, ChannelRule, InvalidCenterPolicy, RankingRule, SchoolBinding,
        SchoolBindingMode, StageKind, StageName, TraceStageDescriptor,
    };
    use std::collections::BTreeSet;

    fn descriptor(name: StageName, source_column: &str, kind: StageKind) -> TraceStageDescriptor {
        TraceStageDescriptor { name, source_column: source_column.to_string(), kind, drop_reason: "x".into() }
    }

    fn policy() -> PolicyConfig {
        PolicyConfig {
            version: "1.0".into(),
            join_keys: ["group".into(), "group".into(), "gender".into(), "grad".into(), "center".into(), "finance".into()],
            normal_statuses: BTreeSet::new(),
            school_statuses: BTreeSet::new(),
            ranking_rules: RankingRule::FIXED_SEQUENCE,
            trace_stages: [
                descriptor(StageName::Type, "group", StageKind::ExactInt),
                descriptor(StageName::Group, "group", StageKind::Membership),
                descriptor(StageName::Gender, "gender", StageKind::ExactInt),
                descriptor(StageName::GraduationStatus, "grad", StageKind::ExactInt),
                descriptor(StageName::Center, "center", StageKind::WildcardAware),
                descriptor(StageName::Finance, "finance", StageKind::ExactInt),
                descriptor(StageName::School, "school", StageKind::WildcardAware),
                descriptor(StageName::CapacityGate, "capacity", StageKind::CapacityGate),
            ],
            allocation_channels: vec![ChannelRule { predicate: ChannelPredicate::Always, tag: AllocationChannel::Generic }],
            school_binding: SchoolBinding { mode: SchoolBindingMode::Global, empty_tokens: BTreeSet::new(), zero_as_wildcard: true },
            invalid_center_policy: InvalidCenterPolicy::Wildcard,
        }
    }

    #[test]
    fn loads_a_well_formed_batch() {
        let students: Vec<RawStudentRow> = serde_json::from_str(
            r#"[{"student_id":"S-1","group":1,"gender":1,"grad":1,"center":0,"finance":1}]"#,
        )
        .unwrap();
        let mentors: Vec<RawMentorRow> = serde_json::from_str(
            r#"[{"mentor_id":"M-1","capacity":2,"mentor_status":"ACTIVE","group":1,"gender":1,"grad":1,"center":1,"finance":1}]"#,
        )
        .unwrap();
        let history: Vec<RawHistoryRow> = serde_json::from_str("[]").unwrap();

        let batch = load_batch(policy(), None, &students, &mentors, &history).unwrap();
        assert_eq!(batch.students.len(), 1);
        assert!(batch.students[0].is_ok());
        assert_eq!(batch.mentors.len(), 1);
    }

    #[test]
    fn malformed_mentor_row_is_input_invalid() {
        let students: Vec<RawStudentRow> = serde_json::from_str("[]").unwrap();
        let mentors: Vec<RawMentorRow> = serde_json::from_str(
            r#"[{"mentor_id":"  ","capacity":2,"mentor_status":"ACTIVE","group":1,"gender":1,"grad":1,"center":1,"finance":1}]"#,
        )
        .unwrap();
        let history: Vec<RawHistoryRow> = serde_json::from_str("[]").unwrap();

        let err = load_batch(policy(), None, &students, &mentors, &history).unwrap_err();
        assert!(matches!(err, PipelineError::InputInvalid(_)));
    }

    #[test]
    fn a_bad_student_row_does_not_abort_the_batch() {
        let students: Vec<RawStudentRow> = serde_json::from_str(
            r#"[{"student_id":"S-1","gender":1,"grad":1,"center":0,"finance":1},
                {"student_id":"S-2","group":1,"gender":1,"grad":1,"center":0,"finance":1}]"#,
        )
        .unwrap();
        let mentors: Vec<RawMentorRow> = serde_json::from_str("[]").unwrap();
        let history: Vec<RawHistoryRow> = serde_json::from_str("[]").unwrap();

        let batch = load_batch(policy(), None, &students, &mentors, &history).unwrap();
        assert!(batch.students[0].is_err());
        assert!(batch.students[1].is_ok());
    }
}
