//! mentoralloc_pipeline — the single-threaded batch driver.
//!
//! Iterates students in input order, keeping one mutable
//! `MentorState` table coherent across the whole batch: history dedupe
//! → channel routing → the eight-stage eligibility chain → rank and
//! commit. No suspension points, no threads — a cooperative
//! cancellation hook and a pure progress-reporter callback are the
//! only interruption mechanisms, both polled between students.

#![forbid(unsafe_code)]

use thiserror::Error;

pub mod dedupe;
pub mod driver;
pub mod load;
pub mod summary;
pub mod validate;

/// Batch-aborting errors. Distinct from
/// `mentoralloc_core::trace::ErrorKind`, which covers per-student
/// failures that are captured in that student's outcome and never
/// stop the batch.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The policy document failed validation.
    #[error("policy invalid: {0}")]
    PolicyInvalid(String),

    /// An input table (mentor pool or history snapshot) could not be
    /// parsed at all. A single bad *student* row is per-student
    /// (`ErrorKind::JoinKeyDataMissing`) and never reaches here.
    #[error("input invalid: {0}")]
    InputInvalid(String),

    /// A commit attempt would have driven a mentor's remaining
    /// capacity negative. The eligibility chain's `capacity_gate`
    /// stage should make this unreachable; its occurrence means the
    /// chain let an exhausted mentor survive to the ranker.
    #[error("capacity underflow committing mentor '{mentor_id}' for row {row_index}")]
    CapacityUnderflow { mentor_id: String, row_index: usize },

    /// The post-batch sanity check failed.
    #[error("internal error: {0}")]
    InternalError(String),

    /// `cancel_requested` returned true. `partial` carries every
    /// outcome committed before the cancellation point.
    #[error("batch cancelled after {processed} of {total} students")]
    Cancelled { processed: usize, total: usize, partial: Box<driver::BatchOutcome> },
}

impl From<mentoralloc_io::IoError> for PipelineError {
    fn from(e: mentoralloc_io::IoError) -> Self {
        match e {
            mentoralloc_io::IoError::PolicyInvalid(msg) => PipelineError::PolicyInvalid(msg),
            other => PipelineError::InputInvalid(other.to_string()),
        }
    }
}

pub mod prelude {
    pub use crate::dedupe::{dedupe_student, DedupeOutcome};
    pub use crate::driver::{run_batch, BatchControl, BatchOutcome, ProgressFn};
    pub use crate::load::{load_batch, Batch};
    pub use crate::summary::{BatchSummary, StageSurvivalHistogram};
    pub use crate::validate::validate_batch_outcome;
    pub use crate::PipelineError;
}
