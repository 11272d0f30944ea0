//! Per-student trace and outcome records, and the per-student error
//! taxonomy.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::policy::StageName;
use crate::tokens::{MentorId, StudentId};

/// Whether a student was diverted by the history deduplicator.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum HistoryStatus {
    AlreadyAllocated,
    NewCandidate,
}

/// One eligibility-chain stage's before/after counters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StageResult {
    pub name: StageName,
    pub before_count: usize,
    pub after_count: usize,
    pub drop_reason: Option<String>,
}

/// Full per-student trace, covering every eligibility stage regardless
/// of where the student dropped out.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceRecord {
    pub row_index: usize,
    pub student_id: StudentId,
    pub stages: Vec<StageResult>,
    pub allocation_channel: crate::policy::AllocationChannel,
    pub history_status: HistoryStatus,
    pub dedupe_reason: Option<String>,
}

/// Why a specific mentor was chosen among the tied-or-not survivors.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SelectionReason {
    MinOccupancyRatio,
    TieBrokenByAllocationsNew,
    TieBrokenByMentorId,
}

/// Kind of failure for a per-student outcome. Distinct from the
/// batch-aborting kinds, which are surfaced as `PipelineError` in
/// `mentoralloc_pipeline`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum ErrorKind {
    JoinKeyDataMissing,
    EligibilityNoMatch,
    CapacityFull,
    InvalidCenter,
}

/// A mentor id plus its ranking-key snapshot, for the `tie_breakers` preview.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TieBreakerEntry {
    pub mentor_id: MentorId,
    pub occupancy_ratio: f64,
    pub allocations_new: u32,
}

/// One student's allocation result.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "status", rename_all = "snake_case"))]
pub enum AllocationOutcome {
    Success {
        mentor_id: MentorId,
        occupancy_ratio_before: f64,
        occupancy_ratio_after: f64,
        capacity_before: u32,
        capacity_after: u32,
        selection_reason: SelectionReason,
        tie_breakers: Vec<TieBreakerEntry>,
    },
    Failed {
        error_kind: ErrorKind,
        detailed_reason: String,
        suggested_actions: Vec<String>,
    },
    /// A student whose national code was already in the history
    /// snapshot. No mentor state is mutated for this student. Kept as
    /// its own outcome variant — rather than folded into
    /// `Success`/`Failed` — so the caller cannot mistake it for a
    /// fresh commit.
    SkippedHistory {
        history_mentor_id: MentorId,
        history_center_code: i64,
    },
}
