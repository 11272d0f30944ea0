//! `PolicyConfig` and its nested domains.
//!
//! These are pure data types with no validation logic attached — the
//! loader that parses and validates a policy file lives in
//! `mentoralloc_io::policy_loader` and returns one of these. Keeping
//! the type here (rather than in the I/O crate) lets `mentoralloc_algo`
//! and `mentoralloc_pipeline` depend on the policy shape without
//! depending on `mentoralloc_io`'s parsing machinery.

use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The three ranking rules, in the exact order the policy must declare
/// them.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RankingRule {
    MinOccupancyRatio,
    MinAllocationsNew,
    MinMentorId,
}

impl RankingRule {
    pub const FIXED_SEQUENCE: [RankingRule; 3] = [
        RankingRule::MinOccupancyRatio,
        RankingRule::MinAllocationsNew,
        RankingRule::MinMentorId,
    ];
}

/// The eight fixed eligibility stage names, in declared order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StageName {
    Type,
    Group,
    Gender,
    GraduationStatus,
    Center,
    Finance,
    School,
    CapacityGate,
}

impl StageName {
    pub const FIXED_ORDER: [StageName; 8] = [
        StageName::Type,
        StageName::Group,
        StageName::Gender,
        StageName::GraduationStatus,
        StageName::Center,
        StageName::Finance,
        StageName::School,
        StageName::CapacityGate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::Type => "type",
            StageName::Group => "group",
            StageName::Gender => "gender",
            StageName::GraduationStatus => "graduation_status",
            StageName::Center => "center",
            StageName::Finance => "finance",
            StageName::School => "school",
            StageName::CapacityGate => "capacity_gate",
        }
    }
}

/// Comparison mode a stage uses against its source column.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StageKind {
    ExactInt,
    Membership,
    WildcardAware,
    CapacityGate,
}

/// One declared trace stage.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceStageDescriptor {
    pub name: StageName,
    pub source_column: String,
    pub kind: StageKind,
    pub drop_reason: String,
}

/// One of the four allocation-channel tags.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum AllocationChannel {
    School,
    Golestan,
    Sadra,
    Generic,
}

impl AllocationChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationChannel::School => "SCHOOL",
            AllocationChannel::Golestan => "GOLESTAN",
            AllocationChannel::Sadra => "SADRA",
            AllocationChannel::Generic => "GENERIC",
        }
    }
}

/// A predicate over a student's join-key values and/or school
/// membership, used to route a candidate to an allocation channel.
/// Predicates are policy data, not code: the router never hardcodes a
/// center or school.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case", tag = "op", content = "args"))]
pub enum ChannelPredicate {
    /// The join key at `key_index` (0-based, into `PolicyConfig::join_keys`) equals `value`.
    JoinKeyEquals { key_index: usize, value: i64 },
    /// The join key at `key_index` is one of `values`.
    JoinKeyIn { key_index: usize, values: Vec<i64> },
    /// The student carries at least one non-empty school-code token.
    HasSchoolCode,
    /// Negation of a nested predicate.
    Not(Box<ChannelPredicate>),
    /// Conjunction: all nested predicates must hold.
    All(Vec<ChannelPredicate>),
    /// Disjunction: at least one nested predicate must hold.
    Any(Vec<ChannelPredicate>),
    /// Matches every student (used as a policy-declared fallback rule,
    /// distinct from the router's own unconditional `GENERIC` default).
    Always,
}

/// One `allocation_channels` rule: first matching predicate wins.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelRule {
    pub predicate: ChannelPredicate,
    pub tag: AllocationChannel,
}

/// School-binding mode.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SchoolBindingMode {
    Global,
    Restricted,
}

/// Policy for how mentor school bindings and student school tokens
/// reconcile.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SchoolBinding {
    pub mode: SchoolBindingMode,
    pub empty_tokens: BTreeSet<String>,
    pub zero_as_wildcard: bool,
}

/// How `INVALID_CENTER` is handled when a student's center value is out
/// of the declared range. Kept as an explicit, policy-configurable
/// flag rather than a hardcoded choice.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum InvalidCenterPolicy {
    /// Downgrade to the wildcard (center stage becomes a no-op).
    Wildcard,
    /// Fail the student with `INVALID_CENTER`.
    Fail,
}

/// The six fixed join-key names, in declared order.
pub const JOIN_KEY_COUNT: usize = 6;

/// Immutable, validated policy.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PolicyConfig {
    pub version: String,
    pub join_keys: [String; JOIN_KEY_COUNT],
    /// Allowed `type` (join-key 0) values for a student routed to a
    /// non-`SCHOOL` channel; empty means no restriction is declared.
    pub normal_statuses: BTreeSet<i64>,
    /// Allowed `type` values for a student routed to the `SCHOOL`
    /// channel; empty means no restriction is declared.
    pub school_statuses: BTreeSet<i64>,
    pub ranking_rules: [RankingRule; 3],
    pub trace_stages: [TraceStageDescriptor; 8],
    pub allocation_channels: Vec<ChannelRule>,
    pub school_binding: SchoolBinding,
    pub invalid_center_policy: InvalidCenterPolicy,
}

impl PolicyConfig {
    /// Index of a join key by name, used by channel predicates and
    /// stage descriptors that reference a column by position.
    pub fn join_key_index(&self, name: &str) -> Option<usize> {
        self.join_keys.iter().position(|k| k == name)
    }
}
