//! An incremental index from values to the variable positions that can still
//! take them.
//!
//! Density estimation repeatedly asks "which variables can be assigned this
//! value?". Scanning the whole constraint for every value makes the
//! estimation cubic in the constraint size; this index answers the question
//! in time proportional to the actual number of compatible variables. The
//! host keeps it current by reporting every narrowing event through
//! [`ValueIndex::on_domain_narrowed`], exactly once and exactly for the
//! values that left the domain.

use im::OrdSet;

use crate::domain::IntDomain;

/// Maps each value in a constraint's initial span to the set of variable
/// positions whose current domain contains it.
///
/// Backed by persistent sets: `clone` is a structural copy, so each search
/// node forks its own consistent index and divergent branches never observe
/// each other's removals.
#[derive(Debug, Clone)]
pub struct ValueIndex {
    offset: i64,
    candidates: Vec<OrdSet<usize>>,
    live: OrdSet<usize>,
}

impl ValueIndex {
    /// Builds the index from the constraint's current domains, one entry per
    /// position for every value the domain holds.
    pub fn build(domains: &[&IntDomain]) -> Self {
        assert!(!domains.is_empty());
        let offset = domains.iter().map(|d| d.min()).min().expect("at least one domain");
        let max = domains.iter().map(|d| d.max()).max().expect("at least one domain");
        let span = (max - offset + 1) as usize;

        let mut candidates = vec![OrdSet::new(); span];
        for (position, domain) in domains.iter().enumerate() {
            for value in domain.iter() {
                let _ = candidates[(value - offset) as usize].insert(position);
            }
        }
        Self {
            offset,
            candidates,
            live: (0..domains.len()).collect(),
        }
    }

    /// The variable positions whose domain currently contains `value`.
    pub fn get(&self, value: i64) -> &OrdSet<usize> {
        &self.candidates[self.slot(value)]
    }

    /// Records that `removed` values just left the domain of the variable at
    /// `position`. Must be called synchronously with the narrowing, once per
    /// event, covering exactly the values that left the domain.
    pub fn on_domain_narrowed(&mut self, position: usize, removed: &[i64]) {
        for &value in removed {
            let slot = self.slot(value);
            let _ = self.candidates[slot].remove(&position);
        }
    }

    /// Drops the bookkeeping for a variable that has been assigned. Its
    /// remaining entry (the assigned value) stays in place; the index only
    /// stops expecting further narrowing events for it.
    pub fn retire(&mut self, position: usize) {
        let _ = self.live.remove(&position);
    }

    /// `true` once every variable has been retired; the index no longer
    /// receives events and no longer needs to be consulted.
    pub fn is_inert(&self) -> bool {
        self.live.is_empty()
    }

    fn slot(&self, value: i64) -> usize {
        let slot = value - self.offset;
        assert!(
            slot >= 0 && (slot as usize) < self.candidates.len(),
            "value {value} outside the indexed span"
        );
        slot as usize
    }
}
