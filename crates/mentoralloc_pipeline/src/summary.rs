//! Rolls a completed `BatchOutcome` up into aggregate counts: totals by
//! outcome kind, per-channel breakdowns, and per-stage survival
//! histograms, for the `Summary` output table (spec §6).

use std::collections::BTreeMap;

use mentoralloc_core::policy::{AllocationChannel, StageName};
use mentoralloc_core::trace::{AllocationOutcome, TraceRecord};

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::driver::BatchOutcome;

/// Survivor counts for one eligibility stage, aggregated across every
/// student who reached it (i.e. whose `before_count` was nonzero).
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct StageSurvivalHistogram {
    pub stage: &'static str,
    pub students_entering: usize,
    pub students_surviving: usize,
}

/// Aggregate counters for one completed batch.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct BatchSummary {
    pub total_students: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub skipped_history_count: usize,
    pub by_channel: BTreeMap<String, usize>,
    pub stage_survival: Vec<StageSurvivalHistogram>,
    /// Fraction of resolved placements (success + skipped_history) whose
    /// mentor came from the history snapshot rather than a fresh
    /// ranking decision. `None` when no placement was resolved at all.
    pub same_history_mentor_ratio: Option<f64>,
    pub incomplete: bool,
}

pub fn summarize(outcome: &BatchOutcome) -> BatchSummary {
    let total_students = outcome.per_student.len();
    let mut success_count = 0usize;
    let mut failed_count = 0usize;
    let mut skipped_history_count = 0usize;
    let mut by_channel: BTreeMap<String, usize> = BTreeMap::new();
    let mut stage_survival: BTreeMap<StageName, StageSurvivalHistogram> = StageName::FIXED_ORDER
        .iter()
        .map(|&name| (name, StageSurvivalHistogram { stage: name.as_str(), students_entering: 0, students_surviving: 0 }))
        .collect();

    for (trace, result) in &outcome.per_student {
        tally_outcome(result, &mut success_count, &mut failed_count, &mut skipped_history_count);
        tally_channel(trace, &mut by_channel);
        tally_stages(trace, &mut stage_survival);
    }

    let resolved = success_count + skipped_history_count;
    let same_history_mentor_ratio =
        if resolved == 0 { None } else { Some(skipped_history_count as f64 / resolved as f64) };

    BatchSummary {
        total_students,
        success_count,
        failed_count,
        skipped_history_count,
        by_channel,
        stage_survival: StageName::FIXED_ORDER.iter().map(|name| stage_survival.remove(name).unwrap()).collect(),
        same_history_mentor_ratio,
        incomplete: outcome.incomplete,
    }
}

fn tally_outcome(
    result: &AllocationOutcome,
    success_count: &mut usize,
    failed_count: &mut usize,
    skipped_history_count: &mut usize,
) {
    match result {
        AllocationOutcome::Success { .. } => *success_count += 1,
        AllocationOutcome::Failed { .. } => *failed_count += 1,
        AllocationOutcome::SkippedHistory { .. } => *skipped_history_count += 1,
    }
}

fn tally_channel(trace: &TraceRecord, by_channel: &mut BTreeMap<String, usize>) {
    *by_channel.entry(channel_label(trace.allocation_channel).to_string()).or_insert(0) += 1;
}

fn channel_label(channel: AllocationChannel) -> &'static str {
    channel.as_str()
}

fn tally_stages(trace: &TraceRecord, stage_survival: &mut BTreeMap<StageName, StageSurvivalHistogram>) {
    for stage in &trace.stages {
        if stage.before_count == 0 {
            continue;
        }
        let entry = stage_survival.get_mut(&stage.name).expect("every declared stage has a histogram slot");
        entry.students_entering += 1;
        if stage.after_count > 0 {
            entry.students_surviving += 1;
        }
    }
}
