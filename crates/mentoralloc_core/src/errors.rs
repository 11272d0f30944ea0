//! Minimal error set for core-domain parsing & normalization.

use thiserror::Error;

/// Errors raised while coercing or normalizing raw input values into
/// typed `Student`/`Mentor` fields. Never raised by I/O — this crate
/// touches no filesystem or network.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum CoreError {
    #[error("join key '{key}' is not an integer at row {row_index}")]
    JoinKeyNotInteger { key: &'static str, row_index: usize },

    #[error("mentor id is empty")]
    EmptyMentorId,

    #[error("student id is empty")]
    EmptyStudentId,
}
