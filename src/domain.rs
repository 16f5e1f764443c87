//! Integer variables and their domains.
//!
//! The brancher never owns problem variables; it reads and narrows them
//! through a [`DomainStore`] that the host search passes into every call.
//! Domains are backed by persistent ordered sets, so cloning a store for a
//! new search node is cheap and two nodes never observe each other's
//! narrowings.

use im::{HashMap, OrdSet};

use crate::error::{Error, Result};

pub type VariableId = u32;

/// The domain of a single integer variable: a non-empty set of admissible
/// values that only ever shrinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntDomain(OrdSet<i64>);

impl IntDomain {
    /// Creates a domain from an explicit value set.
    pub fn new(values: OrdSet<i64>) -> Self {
        Self(values)
    }

    /// Creates a domain holding every value in `min..=max`.
    pub fn range(min: i64, max: i64) -> Self {
        Self((min..=max).collect())
    }

    /// Returns the number of admissible values.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` once exactly one value remains.
    pub fn is_assigned(&self) -> bool {
        self.0.len() == 1
    }

    /// If the variable is assigned, returns its value.
    pub fn value(&self) -> Option<i64> {
        if self.is_assigned() {
            self.0.get_min().copied()
        } else {
            None
        }
    }

    /// The smallest admissible value.
    pub fn min(&self) -> i64 {
        *self.0.get_min().expect("domains are never empty")
    }

    /// The largest admissible value.
    pub fn max(&self) -> i64 {
        *self.0.get_max().expect("domains are never empty")
    }

    pub fn contains(&self, value: i64) -> bool {
        self.0.contains(&value)
    }

    /// Iterates over the remaining values in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.0.iter().copied()
    }

    fn remove(&mut self, value: i64) -> bool {
        self.0.remove(&value).is_some()
    }
}

/// The per-branch domain state: one [`IntDomain`] per variable.
///
/// Backed by a persistent map, so `clone` forks the state for an independent
/// search node. Narrowing operations report exactly which values left the
/// domain, so the caller can forward them to the brancher's notification
/// surface.
#[derive(Debug, Clone, Default)]
pub struct DomainStore {
    domains: HashMap<VariableId, IntDomain>,
}

impl DomainStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a variable with its initial domain.
    pub fn insert(&mut self, variable: VariableId, domain: IntDomain) {
        assert!(!domain.is_empty(), "variable ?{variable} registered with an empty domain");
        let _ = self.domains.insert(variable, domain);
    }

    /// Looks up a variable's domain. Unknown variables are a programming
    /// error, not a runtime condition.
    pub fn domain(&self, variable: VariableId) -> &IntDomain {
        self.domains
            .get(&variable)
            .unwrap_or_else(|| panic!("unknown variable ?{variable}"))
    }

    fn domain_mut(&mut self, variable: VariableId) -> &mut IntDomain {
        self.domains
            .get_mut(&variable)
            .unwrap_or_else(|| panic!("unknown variable ?{variable}"))
    }

    pub fn is_assigned(&self, variable: VariableId) -> bool {
        self.domain(variable).is_assigned()
    }

    /// If `variable` is assigned, returns its value.
    pub fn value(&self, variable: VariableId) -> Option<i64> {
        self.domain(variable).value()
    }

    /// Narrows `variable` to exactly `{value}` and returns the values that
    /// were removed. Fails with [`Error::DomainWipeout`] if `value` is not
    /// admissible; the domain is left untouched in that case.
    pub fn restrict_to(&mut self, variable: VariableId, value: i64) -> Result<Vec<i64>> {
        let domain = self.domain_mut(variable);
        if !domain.contains(value) {
            return Err(Error::DomainWipeout { variable });
        }
        let removed: Vec<i64> = domain.iter().filter(|&v| v != value).collect();
        domain.0 = OrdSet::unit(value);
        Ok(removed)
    }

    /// Removes `value` from `variable`'s domain and returns the removed
    /// values (empty if `value` was already gone). Fails with
    /// [`Error::DomainWipeout`] if `value` was the last remaining value.
    pub fn exclude(&mut self, variable: VariableId, value: i64) -> Result<Vec<i64>> {
        let domain = self.domain_mut(variable);
        if !domain.contains(value) {
            return Ok(Vec::new());
        }
        if domain.is_assigned() {
            return Err(Error::DomainWipeout { variable });
        }
        let _ = domain.remove(value);
        Ok(vec![value])
    }

    /// The number of registered variables.
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}
