use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A vector clock mapping participant identifier to a monotonic counter.
///
/// A missing entry reads as zero; this lets two clocks with different
/// support sets (one has never heard of a participant the other has)
/// still compare correctly.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VectorClock {
    #[serde(flatten)]
    entries: HashMap<String, u64>,
}

impl VectorClock {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Read the counter for `participant`, or zero if unseen.
    pub fn get(&self, participant: &str) -> u64 {
        *self.entries.get(participant).unwrap_or(&0)
    }

    /// Bump the counter for `participant` by one and return the new value.
    pub fn increment(&mut self, participant: &str) -> u64 {
        let entry = self.entries.entry(participant.to_string()).or_insert(0);
        *entry += 1;
        *entry
    }

    /// Record `participant` in the clock's support set at zero, without
    /// treating it as a causal event. A no-op if the entry already exists.
    pub fn ensure_participant(&mut self, participant: &str) {
        self.entries.entry(participant.to_string()).or_insert(0);
    }

    /// Componentwise max with `other`, mutating `self` in place.
    pub fn merge(&mut self, other: &VectorClock) {
        for (participant, &value) in other.entries.iter() {
            let entry = self.entries.entry(participant.clone()).or_insert(0);
            if value > *entry {
                *entry = value;
            }
        }
    }

    /// `self ≤ other` componentwise, with strict inequality on at least
    /// one participant. Missing entries on either side read as zero.
    pub fn happens_before(&self, other: &VectorClock) -> bool {
        let mut strictly_less = false;
        for participant in self.participants_union(other) {
            let a = self.get(&participant);
            let b = other.get(&participant);
            if a > b {
                return false;
            }
            if a < b {
                strictly_less = true;
            }
        }
        strictly_less
    }

    /// Neither happens-before the other, and the clocks are not equal.
    pub fn concurrent(&self, other: &VectorClock) -> bool {
        !self.happens_before(other) && !other.happens_before(self) && self != other
    }

    /// `self ≤ other` componentwise, allowing equality (i.e. `other`
    /// already causally knows everything `self` does).
    pub fn happens_before_or_equal(&self, other: &VectorClock) -> bool {
        self.participants_union(other)
            .iter()
            .all(|participant| self.get(participant) <= other.get(participant))
    }

    fn participants_union(&self, other: &VectorClock) -> Vec<String> {
        let mut seen: Vec<String> = self.entries.keys().cloned().collect();
        for participant in other.entries.keys() {
            if !seen.contains(participant) {
                seen.push(participant.clone());
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_entries_read_as_zero() {
        let mut a = VectorClock::new();
        a.increment("u1");
        let b = VectorClock::new();
        assert_eq!(b.get("u1"), 0);
        assert!(b.happens_before(&a));
        assert!(!a.happens_before(&b));
    }

    #[test]
    fn empty_clocks_are_equal_not_concurrent() {
        let a = VectorClock::new();
        let b = VectorClock::new();
        assert_eq!(a, b);
        assert!(!a.concurrent(&b));
        assert!(!a.happens_before(&b));
    }

    #[test]
    fn identical_clocks_are_not_concurrent() {
        let mut a = VectorClock::new();
        a.increment("u1");
        a.increment("u2");
        let b = a.clone();
        assert!(!a.concurrent(&b));
        assert!(!a.happens_before(&b));
        assert!(!b.happens_before(&a));
    }

    #[test]
    fn single_participant_clocks_totally_ordered() {
        let mut a = VectorClock::new();
        let mut b = VectorClock::new();
        a.increment("u1");
        b.increment("u1");
        b.increment("u1");
        assert!(a.happens_before(&b));
        assert!(!b.happens_before(&a));
        assert!(!a.concurrent(&b));
    }

    #[test]
    fn differing_support_sizes_can_be_concurrent() {
        let mut a = VectorClock::new();
        a.increment("u1");
        let mut b = VectorClock::new();
        b.increment("u2");
        assert!(a.concurrent(&b));
    }

    #[test]
    fn merge_is_componentwise_max() {
        let mut a = VectorClock::new();
        a.increment("u1");
        a.increment("u1");
        let mut b = VectorClock::new();
        b.increment("u1");
        b.increment("u2");
        b.increment("u2");

        a.merge(&b);
        assert_eq!(a.get("u1"), 2);
        assert_eq!(a.get("u2"), 2);
    }

    #[test]
    fn ensure_participant_does_not_count_as_an_event() {
        let mut a = VectorClock::new();
        a.ensure_participant("u1");
        assert_eq!(a.get("u1"), 0);
        assert!(!a.happens_before(&VectorClock::new()));
    }

    #[test]
    fn happens_before_or_equal_allows_exact_match() {
        let mut a = VectorClock::new();
        a.increment("u1");
        let b = a.clone();
        assert!(a.happens_before_or_equal(&b));
        assert!(b.happens_before_or_equal(&a));
    }
}
