use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Gap between consecutive keys when appending or renumbering.
pub const KEY_STEP: f64 = 1000.0;

/// Order key of a row or field. Display order is ascending key.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortKey(f64);

impl SortKey {
    pub const FIRST: SortKey = SortKey(KEY_STEP);

    pub fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Key for an item appended after everything currently in scope.
    pub fn after_max<I>(keys: I) -> Self
    where
        I: IntoIterator<Item = SortKey>,
    {
        let max = keys.into_iter().map(|k| k.0).fold(0.0_f64, f64::max);
        Self(max + KEY_STEP)
    }

    /// Key of the `index`-th item (0-based) after a full renumbering.
    pub fn nth(index: usize) -> Self {
        Self((index as f64 + 1.0) * KEY_STEP)
    }
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0).is_eq()
    }
}

impl Eq for SortKey {}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compute the key for an item dropped between `left` and `right`.
///
/// - no neighbors: `1000`
/// - first position: `right / 2`
/// - last position: `left + 1000`
/// - otherwise the midpoint
///
/// Total over its domain. Whether the result actually separates the
/// neighbors is checked with [`fits_between`].
pub fn allocate_key(left: Option<SortKey>, right: Option<SortKey>) -> SortKey {
    match (left, right) {
        (None, None) => SortKey::FIRST,
        (None, Some(r)) => SortKey(r.0 / 2.0),
        (Some(l), None) => SortKey(l.0 + KEY_STEP),
        (Some(l), Some(r)) => SortKey((l.0 + r.0) / 2.0),
    }
}

/// True when `key` is finite and strictly between the present neighbors.
pub fn fits_between(key: SortKey, left: Option<SortKey>, right: Option<SortKey>) -> bool {
    key.0.is_finite()
        && left.is_none_or(|l| l.0 < key.0)
        && right.is_none_or(|r| key.0 < r.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn k(v: f64) -> SortKey {
        SortKey::new(v)
    }

    #[test]
    fn allocation_rules() {
        assert_eq!(allocate_key(None, None), k(1000.0));
        assert_eq!(allocate_key(None, Some(k(2000.0))), k(1000.0));
        assert_eq!(allocate_key(Some(k(1000.0)), None), k(2000.0));
        assert_eq!(allocate_key(Some(k(1000.0)), Some(k(3000.0))), k(2000.0));
    }

    #[test]
    fn allocated_keys_fit_in_normal_ranges() {
        let cases = [
            (None, None),
            (None, Some(k(2000.0))),
            (Some(k(1000.0)), None),
            (Some(k(1000.0)), Some(k(1001.0))),
            (Some(k(-50.0)), Some(k(-10.0))),
        ];
        for (l, r) in cases {
            assert!(fits_between(allocate_key(l, r), l, r), "{l:?} {r:?}");
        }
    }

    #[test]
    fn head_insert_before_zero_does_not_fit() {
        let right = Some(k(0.0));
        let key = allocate_key(None, right);
        assert!(!fits_between(key, None, right));
    }

    #[test]
    fn repeated_midpoints_eventually_exhaust() {
        let left = k(1000.0);
        let mut right = k(2000.0);
        let mut exhausted = false;
        for _ in 0..200 {
            let key = allocate_key(Some(left), Some(right));
            if !fits_between(key, Some(left), Some(right)) {
                exhausted = true;
                break;
            }
            right = key;
        }
        assert!(exhausted, "f64 midpoints should run out within 200 halvings");
    }

    #[test]
    fn after_max_of_empty_is_first() {
        assert_eq!(SortKey::after_max(std::iter::empty()), SortKey::FIRST);
        assert_eq!(SortKey::after_max([k(500.0), k(3000.0)]), k(4000.0));
    }

    #[test]
    fn nth_keys_are_spaced() {
        assert_eq!(SortKey::nth(0), k(1000.0));
        assert_eq!(SortKey::nth(4), k(5000.0));
    }
}
