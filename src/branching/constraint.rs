use std::sync::Arc;

use crate::branching::bounds::BoundTables;
use crate::branching::brancher::Branch;
use crate::branching::density::Candidate;
use crate::branching::preference::DensityPreference;
use crate::domain::{DomainStore, VariableId};
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct ConstraintDescriptor {
    pub name: String,
    pub description: String,
}

/// A constraint that can estimate solution densities for its (variable,
/// value) pairs and take part in counting-based branching.
///
/// Only all-different exists today; the brancher works purely through this
/// trait, so further constraint kinds can join without disturbing it.
pub trait CountingConstraint: std::fmt::Debug {
    /// The constraint's variables, in their fixed construction order.
    /// Positions reported in candidates index into this slice.
    fn variables(&self) -> &[VariableId];

    fn descriptor(&self) -> ConstraintDescriptor;

    /// Installs the factor tables shared by every constraint of the
    /// brancher. The first call wins; later calls are no-ops.
    fn install_tables(&mut self, tables: Arc<BoundTables>);

    /// Runs one density estimation over the current domains and returns the
    /// constraint's best (position, value, density) candidate under
    /// `preference`. Calling this when [`Self::all_assigned`] holds is a
    /// contract violation.
    fn best_density(&mut self, store: &DomainStore, preference: &dyn DensityPreference)
        -> Candidate;

    /// Reports that `removed` values just left `variable`'s domain. Called
    /// synchronously by the brancher for its own commits and forwarded from
    /// the host's propagation; ignored for variables outside the constraint.
    fn on_domain_narrowed(&mut self, variable: VariableId, removed: &[i64]);

    /// Reports that `variable` has been assigned.
    fn on_assigned(&mut self, variable: VariableId);

    fn clone_box(&self) -> Box<dyn CountingConstraint>;

    /// Applies one branch of a decision to this constraint's variable at
    /// `pos`: [`Branch::Assign`] narrows the domain to exactly `value`,
    /// [`Branch::Exclude`] removes it. Keeps the constraint's own state
    /// consistent and returns the removed values so the caller can notify
    /// every other constraint sharing the variable. A wipeout fails the
    /// branch.
    fn commit(
        &mut self,
        store: &mut DomainStore,
        pos: usize,
        value: i64,
        branch: Branch,
    ) -> Result<Vec<i64>> {
        let variable = self.variables()[pos];
        let removed = match branch {
            Branch::Assign => store.restrict_to(variable, value)?,
            Branch::Exclude => store.exclude(variable, value)?,
        };
        if !removed.is_empty() {
            self.on_domain_narrowed(variable, &removed);
        }
        if store.is_assigned(variable) {
            self.on_assigned(variable);
        }
        Ok(removed)
    }

    fn all_assigned(&self, store: &DomainStore) -> bool {
        self.variables().iter().all(|&v| store.is_assigned(v))
    }

    /// The smallest value in any of the constraint's domains.
    fn min_dom_value(&self, store: &DomainStore) -> i64 {
        self.variables()
            .iter()
            .map(|&v| store.domain(v).min())
            .min()
            .expect("constraints have at least one variable")
    }

    /// The largest value in any of the constraint's domains.
    fn max_dom_value(&self, store: &DomainStore) -> i64 {
        self.variables()
            .iter()
            .map(|&v| store.domain(v).max())
            .max()
            .expect("constraints have at least one variable")
    }
}

impl Clone for Box<dyn CountingConstraint> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
