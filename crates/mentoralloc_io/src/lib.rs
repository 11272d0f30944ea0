//! mentoralloc_io — the only crate in the workspace allowed to touch a
//! filesystem.
//!
//! It parses and validates the declarative policy file into an
//! immutable `mentoralloc_core::policy::PolicyConfig`, parses the three
//! input tables (students, mentor pool, history snapshot) into the
//! typed entities `mentoralloc_core::entities` defines, and provides
//! canonical-JSON encoding plus SHA-256 digests used to fingerprint a
//! policy and a batch.
//!
//! - `policy_loader`: parse + hand-validate a policy document
//! - `input_tables`: raw JSON rows → `Student` / `Mentor` / `HistorySnapshot`
//! - `canonical_json`: deterministic, key-sorted JSON encoding
//! - `hasher`: SHA-256 hex digests, including over canonical JSON

#![forbid(unsafe_code)]

use thiserror::Error;

/// Unified error for every fallible operation this crate performs.
#[derive(Debug, Error)]
pub enum IoError {
    /// Filesystem / path errors (open, read, rename, fsync, ...).
    #[error("io error: {0}")]
    Path(String),

    /// JSON parse or encode failure.
    #[error("json error: {0}")]
    Json(String),

    /// Hashing-related errors (feature disabled, unreadable source).
    #[error("hash error: {0}")]
    Hash(String),

    /// The policy document failed `policy_loader` validation. Fatal:
    /// the caller aborts the run before any allocation (spec §4.1, §7
    /// `PolicyInvalid`).
    #[error("policy invalid: {0}")]
    PolicyInvalid(String),

    /// A student or mentor row could not be coerced: one of the six
    /// join-key columns was missing or not integer-parsable.
    #[error("row {row_index}: join key '{key}' is missing or not an integer")]
    JoinKeyDataMissing { row_index: usize, key: String },

    /// A row was missing a required identifier column (`student_id`,
    /// `mentor_id`, ...).
    #[error("row {row_index}: missing required column '{column}'")]
    RequiredColumnMissing { row_index: usize, column: &'static str },

    /// A `RESTRICTED_*` mentor row's `restriction` map named a column
    /// the policy does not declare as a join key.
    #[error("row {row_index}: restriction column '{column}' is not a declared join key")]
    RestrictionColumnUnknown { row_index: usize, column: String },

    /// Wraps a `mentoralloc_core` construction error (e.g. an empty id)
    /// surfaced while building a typed entity from a raw row.
    #[error(transparent)]
    Core(#[from] mentoralloc_core::errors::CoreError),
}

pub type IoResult<T> = Result<T, IoError>;

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Path(e.to_string())
    }
}

#[cfg(feature = "serde")]
impl From<serde_json::Error> for IoError {
    fn from(e: serde_json::Error) -> Self {
        IoError::Json(e.to_string())
    }
}

pub mod canonical_json;
pub mod hasher;
pub mod input_tables;
pub mod policy_loader;

pub mod prelude {
    pub use crate::{IoError, IoResult};

    pub use crate::canonical_json::{to_canonical_json_bytes, write_canonical_file};
    #[cfg(feature = "hash")]
    pub use crate::hasher::{batch_digest, policy_digest, sha256_canonical, sha256_hex};
    pub use crate::input_tables::{
        parse_history_rows, parse_mentor_rows, parse_student_rows, RawHistoryRow, RawMentorRow, RawStudentRow,
        StudentRowError,
    };
    pub use crate::policy_loader::{load_policy_str, validate_policy};
}
