//! mentoralloc_core — Core types, natural-sort ordering, and
//! normalization helpers for the mentor allocation engine.
//!
//! This crate is **I/O-free** and touches no wall clock or randomness,
//! per the engine's determinism mandate. It defines the stable types
//! shared across `mentoralloc_io`, `mentoralloc_algo`,
//! `mentoralloc_pipeline`, `mentoralloc_report`, and `mentoralloc_cli`:
//!
//! - `tokens`: `StudentId`, `MentorId`, `NationalCode` newtypes
//! - `natural_key`: the `mentor_sort_key` decomposition and comparator
//! - `normalize`: digit/letter folding, join-key coercion, school tokens
//! - `policy`: `PolicyConfig` and its nested domains
//! - `entities`: `Student`, `Mentor`, `MentorState`, `HistorySnapshot`
//! - `trace`: `TraceRecord`, `AllocationOutcome`, and the error taxonomy
//! - `determinism`: epsilon-tolerant float comparison for ranking

#![forbid(unsafe_code)]

pub mod determinism;
pub mod entities;
pub mod errors;
pub mod natural_key;
pub mod normalize;
pub mod policy;
pub mod tokens;
pub mod trace;

pub mod prelude {
    pub use crate::determinism::{compare_occupancy_ratio, OCCUPANCY_RATIO_EPSILON};
    pub use crate::entities::{
        HistoryRecord, HistorySnapshot, Mentor, MentorState, MentorStatus, RestrictionOverrides,
        Student,
    };
    pub use crate::errors::CoreError;
    pub use crate::natural_key::MentorSortKey;
    pub use crate::normalize::{
        coerce_join_key_int, fold_digits_and_letters, normalize_identifier,
        normalize_national_code, split_school_tokens,
    };
    pub use crate::policy::{
        AllocationChannel, ChannelPredicate, ChannelRule, InvalidCenterPolicy, PolicyConfig,
        RankingRule, SchoolBinding, SchoolBindingMode, StageKind, StageName, TraceStageDescriptor,
        JOIN_KEY_COUNT,
    };
    pub use crate::tokens::{MentorId, NationalCode, StudentId};
    pub use crate::trace::{
        AllocationOutcome, ErrorKind, HistoryStatus, SelectionReason, StageResult, TieBreakerEntry,
        TraceRecord,
    };
}
