//! Determinism helpers: epsilon-tolerant float comparison.

use std::cmp::Ordering;

/// Equality epsilon for `occupancy_ratio` comparisons.
pub const OCCUPANCY_RATIO_EPSILON: f64 = 1e-9;

/// Compare two floats for the ranking comparator's primary key, treating
/// values within `OCCUPANCY_RATIO_EPSILON` of each other as equal so the
/// secondary/tertiary keys decide ties. The comparator built on top of
/// this must remain total and stable.
pub fn compare_occupancy_ratio(a: f64, b: f64) -> Ordering {
    let diff = a - b;
    if diff.abs() <= OCCUPANCY_RATIO_EPSILON {
        Ordering::Equal
    } else if diff < 0.0 {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_epsilon_is_equal() {
        assert_eq!(compare_occupancy_ratio(0.5, 0.5 + 1e-10), Ordering::Equal);
    }

    #[test]
    fn outside_epsilon_is_ordered() {
        assert_eq!(compare_occupancy_ratio(0.1, 0.2), Ordering::Less);
        assert_eq!(compare_occupancy_ratio(0.2, 0.1), Ordering::Greater);
    }
}
