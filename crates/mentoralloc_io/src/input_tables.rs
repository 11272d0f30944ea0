//! Parses raw JSON input-table rows into the typed domain entities
//! `mentoralloc_core::entities` defines.
//!
//! The six join-key columns are named by the policy, not by this
//! crate, so a raw row is deserialized as an identifier plus an open
//! column map (`#[serde(flatten)]`) and resolved against
//! `PolicyConfig::join_keys` at parse time — the same "raw wire row →
//! typed domain struct by declared field name" shape the loader uses
//! for every table.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use serde_json::Value;

use mentoralloc_core::entities::{HistoryRecord, HistorySnapshot, Mentor, MentorStatus, RestrictionOverrides, Student};
use mentoralloc_core::errors::CoreError;
use mentoralloc_core::natural_key::MentorSortKey;
use mentoralloc_core::normalize::{fold_digits_and_letters, normalize_identifier, normalize_national_code, split_school_tokens};
use mentoralloc_core::policy::{PolicyConfig, JOIN_KEY_COUNT};
use mentoralloc_core::tokens::{MentorId, NationalCode, StudentId};

use crate::IoError;

/// One raw student row, in input order.
#[derive(Clone, Debug, Deserialize)]
pub struct RawStudentRow {
    pub student_id: String,
    #[serde(default)]
    pub national_code: Option<String>,
    #[serde(default)]
    pub school_code: Option<String>,
    #[serde(flatten)]
    pub columns: BTreeMap<String, Value>,
}

/// One raw mentor-pool row.
#[derive(Clone, Debug, Deserialize)]
pub struct RawMentorRow {
    pub mentor_id: String,
    pub capacity: u32,
    #[serde(default)]
    pub allocations_new: u32,
    pub mentor_status: String,
    #[serde(default)]
    pub bound_school_codes: Option<String>,
    /// Per-join-key allowed-value lists for a `RESTRICTED_*` mentor,
    /// keyed by the policy's join-key column name. Ignored for
    /// `ACTIVE`/`FROZEN` mentors. A join key the map omits is left
    /// unrestricted.
    #[serde(default)]
    pub restriction: Option<BTreeMap<String, Vec<i64>>>,
    #[serde(flatten)]
    pub columns: BTreeMap<String, Value>,
}

/// One raw history-snapshot row.
#[derive(Clone, Debug, Deserialize)]
pub struct RawHistoryRow {
    pub national_code_normalized: String,
    pub mentor_id: String,
    pub center_code: i64,
    pub last_allocation_date: String,
}

fn value_to_join_key_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Coerce one join-key cell to an integer. Unlike
/// `mentoralloc_core::normalize::coerce_join_key_int`, the key name
/// here is policy data read at run time rather than a compile-time
/// `&'static str`, so the error it raises owns its key string.
fn coerce_join_key_value(raw: Option<&Value>, key_name: &str, row_index: usize) -> Result<i64, IoError> {
    let text = raw.and_then(value_to_join_key_text).unwrap_or_default();
    let folded = fold_digits_and_letters(text.trim());
    folded.parse::<i64>().map_err(|_| IoError::JoinKeyDataMissing { row_index, key: key_name.to_string() })
}

fn join_keys_from_columns(
    columns: &BTreeMap<String, Value>,
    policy_join_keys: &[String; JOIN_KEY_COUNT],
    row_index: usize,
) -> Result<[i64; JOIN_KEY_COUNT], IoError> {
    let mut out = [0i64; JOIN_KEY_COUNT];
    for (i, name) in policy_join_keys.iter().enumerate() {
        out[i] = coerce_join_key_value(columns.get(name), name, row_index)?;
    }
    Ok(out)
}

/// A student row that failed to parse: the row is still identified by
/// position and (when present) its raw `student_id`, so the batch
/// driver can record a per-student `JoinKeyDataMissing` failure
/// without aborting the rest of the batch (spec §7: this error kind is
/// per-student, not fatal).
#[derive(Clone, Debug)]
pub struct StudentRowError {
    pub row_index: usize,
    pub student_id: String,
    pub error: IoError,
}

impl std::fmt::Display for StudentRowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row {} ('{}'): {}", self.row_index, self.student_id, self.error)
    }
}

impl std::error::Error for StudentRowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Parse the students table against the policy's declared join-key
/// names. One result per input row, in input order; a row that fails
/// to coerce does not prevent the remaining rows from parsing.
pub fn parse_student_rows(rows: &[RawStudentRow], policy: &PolicyConfig) -> Vec<Result<Student, StudentRowError>> {
    rows.iter()
        .enumerate()
        .map(|(row_index, row)| parse_one_student_row(row_index, row, policy))
        .collect()
}

fn parse_one_student_row(
    row_index: usize,
    row: &RawStudentRow,
    policy: &PolicyConfig,
) -> Result<Student, StudentRowError> {
    let wrap = |error: IoError| StudentRowError { row_index, student_id: row.student_id.clone(), error };

    if row.student_id.trim().is_empty() {
        return Err(wrap(IoError::Core(CoreError::EmptyStudentId)));
    }
    let join_keys = join_keys_from_columns(&row.columns, &policy.join_keys, row_index).map_err(wrap)?;
    let national_code_normalized =
        row.national_code.as_deref().map(normalize_national_code).filter(|s| !s.is_empty()).map(NationalCode::new);
    Ok(Student {
        student_id: StudentId::new(normalize_identifier(&row.student_id)),
        national_code_normalized,
        join_keys,
        school_code: row.school_code.clone(),
        row_index,
    })
}

fn parse_mentor_status(raw: &str) -> MentorStatus {
    match raw {
        "ACTIVE" => MentorStatus::Active,
        "FROZEN" => MentorStatus::Frozen,
        other => {
            let profile = other.strip_prefix("RESTRICTED_").unwrap_or(other);
            MentorStatus::Restricted(profile.to_string())
        }
    }
}

/// Resolve a raw row's `restriction` column-name map into the
/// index-keyed `RestrictionOverrides` `Mentor::effective_join_key`
/// consults. `None`/absent stays `None` — only a `RESTRICTED_*` row
/// that actually declares the column carries an override.
fn restriction_overrides_from_row(
    raw: Option<&BTreeMap<String, Vec<i64>>>,
    policy: &PolicyConfig,
    row_index: usize,
) -> Result<Option<RestrictionOverrides>, IoError> {
    let Some(raw) = raw else { return Ok(None) };
    let mut overrides = RestrictionOverrides::new();
    for (column, allowed) in raw {
        let key_index = policy
            .join_key_index(column)
            .ok_or_else(|| IoError::RestrictionColumnUnknown { row_index, column: column.clone() })?;
        overrides.insert(key_index, allowed.iter().copied().collect());
    }
    Ok(Some(overrides))
}

/// Parse the mentor pool table.
///
/// A `RESTRICTED_*` mentor's `restriction` column (§named per
/// join-key column, each mapping to its allowed-value list) is
/// resolved into a `RestrictionOverrides` keyed by join-key index;
/// `Mentor::effective_join_key` then intersects it against that
/// mentor's declared join-key values before stage 1 of the eligibility
/// chain runs. An `ACTIVE`/`FROZEN` row's `restriction` column, if
/// present, is parsed the same way but has no effect, since
/// `effective_join_key` only consults it for a `Restricted` mentor.
pub fn parse_mentor_rows(rows: &[RawMentorRow], policy: &PolicyConfig) -> Result<Vec<Mentor>, IoError> {
    rows.iter()
        .enumerate()
        .map(|(row_index, row)| {
            if row.mentor_id.trim().is_empty() {
                return Err(IoError::Core(CoreError::EmptyMentorId));
            }
            let mentor_id = MentorId::new(normalize_identifier(&row.mentor_id));
            let join_keys = join_keys_from_columns(&row.columns, &policy.join_keys, row_index)?;
            let bound_school_codes: BTreeSet<String> = row
                .bound_school_codes
                .as_deref()
                .map(split_school_tokens)
                .unwrap_or_default()
                .into_iter()
                .collect();
            let restriction = restriction_overrides_from_row(row.restriction.as_ref(), policy, row_index)?;
            Ok(Mentor {
                mentor_sort_key: MentorSortKey::for_mentor_id(&mentor_id),
                mentor_id,
                capacity: row.capacity,
                allocations_new: row.allocations_new,
                mentor_status: parse_mentor_status(&row.mentor_status),
                join_keys,
                has_school_constraint: !bound_school_codes.is_empty(),
                bound_school_codes,
                restriction,
            })
        })
        .collect()
}

/// Parse the history snapshot, keyed by normalized national code. A
/// later row for the same code overwrites an earlier one; the input
/// table is expected to already be deduplicated upstream.
pub fn parse_history_rows(rows: &[RawHistoryRow]) -> HistorySnapshot {
    let mut by_national_code = BTreeMap::new();
    for row in rows {
        let code = NationalCode::new(normalize_national_code(&row.national_code_normalized));
        by_national_code.insert(
            code,
            HistoryRecord {
                mentor_id: MentorId::new(normalize_identifier(&row.mentor_id)),
                center_code: row.center_code,
                last_allocation_date: row.last_allocation_date.clone(),
            },
        );
    }
    HistorySnapshot { by_national_code }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mentoralloc_core::policy::{
        AllocationChannel, ChannelPredicate, ChannelRule, InvalidCenterPolicy, RankingRule, SchoolBinding,
        SchoolBindingMode, StageKind, StageName, TraceStageDescriptor,
    };

    fn descriptor(name: StageName, source_column: &str, kind: StageKind) -> TraceStageDescriptor {
        TraceStageDescriptor { name, source_column: source_column.to_string(), kind, drop_reason: "x".into() }
    }

    fn policy() -> PolicyConfig {
        PolicyConfig {
            version: "1.0".into(),
            join_keys: ["group_code".into(), "group_code".into(), "gender".into(), "grad".into(), "center".into(), "finance".into()],
            normal_statuses: BTreeSet::new(),
            school_statuses: BTreeSet::new(),
            ranking_rules: RankingRule::FIXED_SEQUENCE,
            trace_stages: [
                descriptor(StageName::Type, "group_code", StageKind::ExactInt),
                descriptor(StageName::Group, "group_code", StageKind::Membership),
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
    fn parses_student_join_keys_by_policy_declared_name() {
        let raw: Vec<RawStudentRow> = serde_json::from_str(
            r#"[{"student_id":"S-1","national_code":"123-456","group_code":1,"gender":2,"grad":1,"center":0,"finance":1}]"#,
        )
        .unwrap();
        let students = parse_student_rows(&raw, &policy());
        assert_eq!(students.len(), 1);
        let student = students[0].as_ref().unwrap();
        assert_eq!(student.join_keys, [1, 1, 2, 1, 0, 1]);
        assert_eq!(student.national_code_normalized.as_ref().unwrap().as_str(), "123456");
    }

    #[test]
    fn missing_join_key_column_is_reported_with_row_index_and_does_not_abort_other_rows() {
        let raw: Vec<RawStudentRow> = serde_json::from_str(
            r#"[{"student_id":"S-1","gender":2,"grad":1,"center":0,"finance":1},
                {"student_id":"S-2","group_code":1,"gender":2,"grad":1,"center":0,"finance":1}]"#,
        )
        .unwrap();
        let results = parse_student_rows(&raw, &policy());
        let err = results[0].as_ref().unwrap_err();
        assert_eq!(err.row_index, 0);
        assert_eq!(err.student_id, "S-1");
        assert!(matches!(&err.error, IoError::JoinKeyDataMissing { row_index: 0, key } if key == "group_code"));
        assert!(results[1].is_ok());
    }

    #[test]
    fn parses_restricted_mentor_status_profile() {
        let raw: Vec<RawMentorRow> = serde_json::from_str(
            r#"[{"mentor_id":"M-1","capacity":5,"mentor_status":"RESTRICTED_profile_a","group_code":1,"gender":1,"grad":1,"center":1,"finance":1}]"#,
        )
        .unwrap();
        let mentors = parse_mentor_rows(&raw, &policy()).unwrap();
        assert_eq!(mentors[0].mentor_status, MentorStatus::Restricted("profile_a".into()));
        assert!(mentors[0].restriction.is_none());
    }

    #[test]
    fn restricted_mentor_row_carries_its_declared_column_overrides() {
        let raw: Vec<RawMentorRow> = serde_json::from_str(
            r#"[{"mentor_id":"M-1","capacity":5,"mentor_status":"RESTRICTED_profile_a",
                "restriction":{"center":[1,2]},
                "group_code":1,"gender":1,"grad":1,"center":1,"finance":1}]"#,
        )
        .unwrap();
        let mentors = parse_mentor_rows(&raw, &policy()).unwrap();
        let center_index = policy().join_key_index("center").unwrap();
        let overrides = mentors[0].restriction.as_ref().unwrap();
        assert_eq!(overrides.get(&center_index).unwrap(), &BTreeSet::from([1, 2]));
    }

    #[test]
    fn restriction_column_not_in_policy_join_keys_is_rejected() {
        let raw: Vec<RawMentorRow> = serde_json::from_str(
            r#"[{"mentor_id":"M-1","capacity":5,"mentor_status":"RESTRICTED_profile_a",
                "restriction":{"not_a_join_key":[1]},
                "group_code":1,"gender":1,"grad":1,"center":1,"finance":1}]"#,
        )
        .unwrap();
        let err = parse_mentor_rows(&raw, &policy()).unwrap_err();
        assert!(matches!(err, IoError::RestrictionColumnUnknown { row_index: 0, column } if column == "not_a_join_key"));
    }

    #[test]
    fn splits_bound_school_codes_into_a_set() {
        let raw: Vec<RawMentorRow> = serde_json::from_str(
            r#"[{"mentor_id":"M-1","capacity":5,"mentor_status":"ACTIVE","bound_school_codes":"101; 202","group_code":1,"gender":1,"grad":1,"center":1,"finance":1}]"#,
        )
        .unwrap();
        let mentors = parse_mentor_rows(&raw, &policy()).unwrap();
        assert!(mentors[0].has_school_constraint);
        assert!(mentors[0].bound_school_codes.contains("101"));
        assert!(mentors[0].bound_school_codes.contains("202"));
    }

    #[test]
    fn history_rows_key_by_normalized_national_code() {
        let raw: Vec<RawHistoryRow> = serde_json::from_str(
            r#"[{"national_code_normalized":"123 456","mentor_id":"M-1","center_code":7,"last_allocation_date":"2025-01-01"}]"#,
        )
        .unwrap();
        let snapshot = parse_history_rows(&raw);
        let code = NationalCode::new("123456");
        assert_eq!(snapshot.lookup(&code).unwrap().center_code, 7);
    }

    #[test]
    fn empty_student_id_is_rejected() {
        let raw: Vec<RawStudentRow> =
            serde_json::from_str(r#"[{"student_id":"  ","group_code":1,"gender":1,"grad":1,"center":1,"finance":1}]"#).unwrap();
        let results = parse_student_rows(&raw, &policy());
        assert!(matches!(&results[0].as_ref().unwrap_err().error, IoError::Core(CoreError::EmptyStudentId)));
    }
}
