//! The ranker and committer: orders eligible mentors by the fixed
//! ranking sequence (occupancy ratio, then allocations_new, then
//! natural mentor id), picks a winner, and commits one allocation unit
//! against the winner's live `MentorState`.

use std::cmp::Ordering;

use mentoralloc_core::prelude::{compare_occupancy_ratio, Mentor, MentorState, SelectionReason, TieBreakerEntry};

/// Stable-sort the surviving mentor indices by the fixed ranking
/// sequence. Ties within `OCCUPANCY_RATIO_EPSILON` fall through to
/// `allocations_new`, then to the natural mentor-id order.
pub fn rank_survivors(mentors: &[Mentor], states: &[MentorState], survivors: &[usize]) -> Vec<usize> {
    let mut ranked = survivors.to_vec();
    ranked.sort_by(|&a, &b| {
        compare_occupancy_ratio(states[a].occupancy_ratio(), states[b].occupancy_ratio())
            .then_with(|| states[a].allocations_new.cmp(&states[b].allocations_new))
            .then_with(|| mentors[a].mentor_sort_key.cmp(&mentors[b].mentor_sort_key))
    });
    ranked
}

/// The chosen mentor, why it won, and a preview of the other mentors it
/// was tied with on occupancy ratio (possibly just itself).
pub struct SelectionOutcome {
    pub mentor_index: usize,
    pub selection_reason: SelectionReason,
    pub tie_breakers: Vec<TieBreakerEntry>,
}

/// Pick the winner from an already-ranked survivor list. Returns
/// `None` if `ranked` is empty — the caller maps that to
/// `ELIGIBILITY_NO_MATCH`.
pub fn select_winner(mentors: &[Mentor], states: &[MentorState], ranked: &[usize]) -> Option<SelectionOutcome> {
    let winner = *ranked.first()?;
    let winner_occupancy = states[winner].occupancy_ratio();

    let tied_on_occupancy: Vec<usize> = ranked
        .iter()
        .copied()
        .take_while(|&idx| compare_occupancy_ratio(states[idx].occupancy_ratio(), winner_occupancy) == Ordering::Equal)
        .collect();

    let selection_reason = if tied_on_occupancy.len() <= 1 {
        SelectionReason::MinOccupancyRatio
    } else {
        let winner_allocations = states[winner].allocations_new;
        let tied_on_allocations =
            tied_on_occupancy.iter().filter(|&&idx| states[idx].allocations_new == winner_allocations).count();
        if tied_on_allocations <= 1 {
            SelectionReason::TieBrokenByAllocationsNew
        } else {
            SelectionReason::TieBrokenByMentorId
        }
    };

    let tie_breakers = tied_on_occupancy
        .iter()
        .map(|&idx| TieBreakerEntry {
            mentor_id: mentors[idx].mentor_id.clone(),
            occupancy_ratio: states[idx].occupancy_ratio(),
            allocations_new: states[idx].allocations_new,
        })
        .collect();

    Some(SelectionOutcome { mentor_index: winner, selection_reason, tie_breakers })
}

/// Commit one allocation against `states[mentor_index]`, returning
/// `(occupancy_before, occupancy_after, capacity_before, capacity_after)`
/// on success. `capacity_*` here is remaining capacity, not declared
/// capacity. `Err(())` means the caller's eligibility chain let a
/// capacity-exhausted mentor through — a `CAPACITY_UNDERFLOW` bug.
pub fn commit(states: &mut [MentorState], mentor_index: usize) -> Result<(f64, f64, u32, u32), ()> {
    let occupancy_before = states[mentor_index].occupancy_ratio();
    let capacity_before = states[mentor_index].remaining_capacity;
    states[mentor_index].commit_one()?;
    let occupancy_after = states[mentor_index].occupancy_ratio();
    let capacity_after = states[mentor_index].remaining_capacity;
    Ok((occupancy_before, occupancy_after, capacity_before, capacity_after))
}
