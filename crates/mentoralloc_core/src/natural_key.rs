//! Natural-order decomposition and comparison for `mentor_id`.
//!
//! Decomposition rule: the longest non-digit prefix followed by a
//! trailing run of ASCII digits. Strings with no trailing digit run get
//! `(whole_string, 0, whole_string)`. Ordering is lexicographic on the
//! prefix, then numeric on the digit run, then raw-string lexicographic
//! as the final tiebreaker (so `EMP-010 < EMP-10` even though both
//! decode to the numeric value 10).

use std::cmp::Ordering;

use crate::tokens::MentorId;

/// `(prefix, numeric_value_of_trailing_digits, original_normalized_string)`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MentorSortKey {
    pub prefix: String,
    pub numeric: u128,
    pub raw: String,
}

impl MentorSortKey {
    /// Build the natural-sort key for an already-normalized mentor id.
    pub fn from_normalized(normalized: &str) -> Self {
        let bytes = normalized.as_bytes();
        let mut split = bytes.len();
        while split > 0 && bytes[split - 1].is_ascii_digit() {
            split -= 1;
        }

        if split == bytes.len() {
            // No trailing digit run at all.
            return MentorSortKey {
                prefix: normalized.to_string(),
                numeric: 0,
                raw: normalized.to_string(),
            };
        }

        let prefix = &normalized[..split];
        let digits = &normalized[split..];
        let numeric = digits.parse::<u128>().unwrap_or(u128::MAX);

        MentorSortKey {
            prefix: prefix.to_string(),
            numeric,
            raw: normalized.to_string(),
        }
    }

    pub fn for_mentor_id(id: &MentorId) -> Self {
        Self::from_normalized(id.as_str())
    }
}

impl Ord for MentorSortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.prefix
            .cmp(&other.prefix)
            .then_with(|| self.numeric.cmp(&other.numeric))
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for MentorSortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> MentorSortKey {
        MentorSortKey::from_normalized(s)
    }

    #[test]
    fn natural_sort_property() {
        // P-1 < P-2 < P-10
        let mut v = vec![key("P-10"), key("P-1"), key("P-2")];
        v.sort();
        let raws: Vec<&str> = v.iter().map(|k| k.raw.as_str()).collect();
        assert_eq!(raws, vec!["P-1", "P-2", "P-10"]);
    }

    #[test]
    fn zero_padded_tiebreak_is_raw_lexicographic() {
        // EMP-10 and EMP-010 share numeric value 10; tie broken by raw
        // string, so EMP-010 < EMP-10.
        let mut v = vec![key("EMP-10"), key("EMP-010")];
        v.sort();
        let raws: Vec<&str> = v.iter().map(|k| k.raw.as_str()).collect();
        assert_eq!(raws, vec!["EMP-010", "EMP-10"]);
    }

    #[test]
    fn emp2_precedes_both() {
        let mut v = vec![key("EMP-10"), key("EMP-2"), key("EMP-010")];
        v.sort();
        let raws: Vec<&str> = v.iter().map(|k| k.raw.as_str()).collect();
        assert_eq!(raws, vec!["EMP-2", "EMP-010", "EMP-10"]);
    }

    #[test]
    fn no_trailing_digits_whole_string_key() {
        let k = key("ALPHA");
        assert_eq!(k.prefix, "ALPHA");
        assert_eq!(k.numeric, 0);
        assert_eq!(k.raw, "ALPHA");
    }

    #[test]
    fn s1_scenario_tie_break_by_natural_id() {
        let mut v = vec![key("EMP-10"), key("EMP-2"), key("EMP-010")];
        v.sort();
        assert_eq!(v[0].raw, "EMP-2");
    }

    proptest::proptest! {
        #[test]
        fn total_order_is_antisymmetric(a in "[A-Z]{1,4}-[0-9]{1,5}", b in "[A-Z]{1,4}-[0-9]{1,5}") {
            let ka = key(&a);
            let kb = key(&b);
            let fwd = ka.cmp(&kb);
            let bwd = kb.cmp(&ka);
            proptest::prop_assert_eq!(fwd, bwd.reverse());
        }
    }
}
