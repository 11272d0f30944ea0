//! mentoralloc_report — pure, offline renderers for the four canonical
//! output tables (spec §6): assignments, trace, log, summary.
//!
//! This crate reads only the already-computed `BatchOutcome`/
//! `BatchSummary` produced by `mentoralloc_pipeline`; it never
//! recomputes an allocation decision, touches the filesystem, or adds
//! randomness. Output bytes are canonical JSON, matching the same
//! sorted-key, no-trailing-newline encoding `mentoralloc_io` uses for
//! policy and batch digests.

#![forbid(unsafe_code)]

pub mod render_json;
pub mod structure;

/// Failures specific to rendering. Serialization of these row types is
/// infallible in practice (no floats that can be non-finite survive
/// this far, no recursive cycles), but the error is kept explicit
/// rather than panicking on a future field addition that breaks that
/// assumption.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to serialize report table: {0}")]
    Serialize(String),
}

pub mod prelude {
    pub use crate::render_json::{
        build_student_tables, render_assignments, render_log, render_summary, render_trace,
        StudentTables,
    };
    pub use crate::structure::{AssignmentRow, LogRow, SummaryTable, TraceRow, TraceStageRow};
    pub use crate::ReportError;
}
