//! Student, Mentor, MentorState, and HistorySnapshot.
//!
//! Students and mentors are immutable once constructed — there is no
//! in-place mutation of input tables. The only mutable state in a
//! batch run is `MentorState`, owned by the batch driver.

use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::natural_key::MentorSortKey;
use crate::policy::JOIN_KEY_COUNT;
use crate::tokens::{MentorId, NationalCode, StudentId};

/// A single applicant row, already normalized.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Student {
    pub student_id: StudentId,
    pub national_code_normalized: Option<NationalCode>,
    /// The six join-key values, integer-coerced, in policy-declared order.
    pub join_keys: [i64; JOIN_KEY_COUNT],
    /// Raw, possibly multi-valued school-code field (split on `, ; |` downstream).
    pub school_code: Option<String>,
    /// Position of this student in the original input batch (0-based).
    pub row_index: usize,
}

/// Mentor lifecycle tag. `RESTRICTED_*` is modeled as a named
/// restriction profile rather than a closed enum, since the policy
/// declares restriction shapes, not this crate.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum MentorStatus {
    Active,
    Frozen,
    Restricted(String),
}

impl MentorStatus {
    pub fn is_frozen(&self) -> bool {
        matches!(self, MentorStatus::Frozen)
    }
}

/// A restriction that intersects a `RESTRICTED_*` mentor's eligibility
/// columns before the eligibility chain runs (the mentor pool
/// pre-filter). Maps a join-key index (into `PolicyConfig::join_keys`)
/// to the set of values that restriction still allows for this mentor.
pub type RestrictionOverrides = BTreeMap<usize, BTreeSet<i64>>;

/// Immutable mentor record. `capacity` and `allocations_new` here are
/// the *declared* starting values; the batch driver tracks the live,
/// mutable view in `MentorState`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Mentor {
    pub mentor_id: MentorId,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub mentor_sort_key: MentorSortKey,
    pub capacity: u32,
    pub allocations_new: u32,
    pub mentor_status: MentorStatus,
    /// The six eligibility fields, in policy-declared join-key order.
    pub join_keys: [i64; JOIN_KEY_COUNT],
    pub bound_school_codes: BTreeSet<String>,
    pub has_school_constraint: bool,
    pub restriction: Option<RestrictionOverrides>,
}

impl Mentor {
    /// `allocations_new / capacity`, with `0/0` treated as `0`.
    pub fn occupancy_ratio(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.allocations_new as f64 / self.capacity as f64
        }
    }

    /// The effective eligibility value for `key_index`, after applying
    /// any `RESTRICTED_*` intersection. Returns `None` when a
    /// restriction exists for this column but the mentor's own value is
    /// not inside it — i.e. the mentor cannot pass this column at all.
    pub fn effective_join_key(&self, key_index: usize) -> Option<i64> {
        let value = self.join_keys[key_index];
        match &self.restriction {
            Some(overrides) => match overrides.get(&key_index) {
                Some(allowed) if !allowed.contains(&value) => None,
                _ => Some(value),
            },
            None => Some(value),
        }
    }
}

/// Mutable per-mentor state tracked across a batch. Owned exclusively
/// by the batch driver; never shared.
#[derive(Clone, Debug, PartialEq)]
pub struct MentorState {
    pub declared_capacity: u32,
    pub remaining_capacity: u32,
    pub allocations_new: u32,
}

impl MentorState {
    pub fn from_mentor(mentor: &Mentor) -> Self {
        MentorState {
            declared_capacity: mentor.capacity,
            remaining_capacity: mentor.capacity.saturating_sub(mentor.allocations_new),
            allocations_new: mentor.allocations_new,
        }
    }

    /// `allocations_new / declared_capacity`, with `0/0` treated as `0`.
    pub fn occupancy_ratio(&self) -> f64 {
        if self.declared_capacity == 0 {
            0.0
        } else {
            self.allocations_new as f64 / self.declared_capacity as f64
        }
    }

    /// Commit one allocation: decrement remaining capacity, increment
    /// allocations. Returns `Err(())` if this would drive
    /// `remaining_capacity` negative — the caller maps that to
    /// `CAPACITY_UNDERFLOW`.
    pub fn commit_one(&mut self) -> Result<(), ()> {
        if self.remaining_capacity == 0 {
            return Err(());
        }
        self.remaining_capacity -= 1;
        self.allocations_new += 1;
        Ok(())
    }
}

/// One row of prior-allocation history.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct HistoryRecord {
    pub mentor_id: MentorId,
    pub center_code: i64,
    pub last_allocation_date: String,
}

/// Read-only prior-allocation snapshot, keyed by normalized national
/// code. Owned by the caller; the engine only reads it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HistorySnapshot {
    pub by_national_code: BTreeMap<NationalCode, HistoryRecord>,
}

impl HistorySnapshot {
    pub fn lookup(&self, code: &NationalCode) -> Option<&HistoryRecord> {
        self.by_national_code.get(code)
    }
}
