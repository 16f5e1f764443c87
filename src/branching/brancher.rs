//! The brancher that coordinates every counting constraint of a search.
//!
//! At each node the host asks [`CountingBrancher::status`] whether work
//! remains, then [`CountingBrancher::choice`] for the globally best
//! (variable, value) pair over all constraints, and finally commits the
//! decision on two child nodes: once as an assignment and once as an
//! exclusion.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::branching::bounds::BoundTables;
use crate::branching::constraint::{ConstraintDescriptor, CountingConstraint};
use crate::branching::density::Candidate;
use crate::branching::preference::DensityPreference;
use crate::domain::{DomainStore, VariableId};
use crate::error::{Error, Result};

/// A branching decision: assign or exclude `value` for the variable at
/// `pos` within constraint `constraint`.
///
/// Serializes exactly, so the host can archive the decision at a node and
/// replay the path later without recomputing densities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub constraint: usize,
    pub pos: usize,
    pub value: i64,
}

impl Decision {
    /// Archives the decision for later replay via
    /// [`CountingBrancher::choice_from_archive`].
    pub fn archive(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// The two children of a binary choice point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    /// Narrow the variable's domain to exactly the decided value.
    Assign,
    /// Remove the decided value, leaving the rest of the domain untouched.
    Exclude,
}

/// Owns every counting constraint sharing one branching decision.
///
/// Construction sizes the factor tables once for all constraints to share;
/// `clone` forks the brancher for an independent search node, aliasing the
/// immutable tables and deep-copying all per-branch constraint state.
#[derive(Debug, Clone)]
pub struct CountingBrancher {
    constraints: Vec<Box<dyn CountingConstraint>>,
    preference: Arc<dyn DensityPreference>,
    tables: Arc<BoundTables>,
}

impl CountingBrancher {
    /// Builds the brancher over `constraints`, sizing the shared factor
    /// tables to the largest variable count and domain span among them.
    pub fn new(
        mut constraints: Vec<Box<dyn CountingConstraint>>,
        store: &DomainStore,
        preference: Arc<dyn DensityPreference>,
    ) -> Self {
        assert!(!constraints.is_empty(), "brancher posted without constraints");

        let mut variable_count = 0;
        let mut largest_span = 0;
        for constraint in &constraints {
            let span = constraint.max_dom_value(store) - constraint.min_dom_value(store) + 1;
            largest_span = largest_span.max(span as usize);
            variable_count = variable_count.max(constraint.variables().len());
        }

        let tables = Arc::new(BoundTables::new(variable_count, largest_span));
        for constraint in &mut constraints {
            constraint.install_tables(Arc::clone(&tables));
        }
        debug!(
            constraints = constraints.len(),
            variable_count, largest_span, "sized shared bound tables"
        );

        Self {
            constraints,
            preference,
            tables,
        }
    }

    /// Whether any constraint still has an unassigned variable. `false` is
    /// the terminal condition for this brancher.
    pub fn status(&self, store: &DomainStore) -> bool {
        self.constraints.iter().any(|c| !c.all_assigned(store))
    }

    /// Estimates densities for every constraint with unassigned variables
    /// and returns the globally best decision. On exact ties the candidate
    /// from the earliest constraint wins.
    ///
    /// Calling this when [`Self::status`] is `false` is a contract
    /// violation.
    pub fn choice(&mut self, store: &DomainStore) -> Decision {
        assert!(
            self.status(store),
            "choice requested but every variable is assigned"
        );

        let preference = Arc::clone(&self.preference);
        let mut best: Option<(usize, Candidate)> = None;
        for (index, constraint) in self.constraints.iter_mut().enumerate() {
            if constraint.all_assigned(store) {
                continue;
            }
            let candidate = constraint.best_density(store, preference.as_ref());
            let is_better = match &best {
                None => true,
                Some((_, incumbent)) => preference.better(candidate.density, incumbent.density),
            };
            if is_better {
                best = Some((index, candidate));
            }
        }

        let (constraint, candidate) = best.expect("status guaranteed an unassigned constraint");
        debug!(
            constraint,
            pos = candidate.pos,
            value = candidate.value,
            density = candidate.density,
            "branching decision"
        );
        Decision {
            constraint,
            pos: candidate.pos,
            value: candidate.value,
        }
    }

    /// Reconstructs a previously archived [`Decision`] for path replay,
    /// without recomputing any densities.
    pub fn choice_from_archive(&self, archive: &[u8]) -> Result<Decision> {
        let decision: Decision = serde_json::from_slice(archive)?;
        let count = self.constraints.len();
        if decision.constraint >= count {
            return Err(Error::UnknownConstraint {
                index: decision.constraint,
                count,
            });
        }
        let arity = self.constraints[decision.constraint].variables().len();
        if decision.pos >= arity {
            return Err(Error::UnknownPosition {
                pos: decision.pos,
                arity,
            });
        }
        Ok(decision)
    }

    /// Applies `decision` to the domains. [`Branch::Assign`] narrows the
    /// variable to exactly the decided value; [`Branch::Exclude`] removes
    /// it. Either may fail the branch with [`Error::DomainWipeout`], which
    /// the host answers by backtracking. Successful narrowings are
    /// broadcast to every other constraint sharing the variable.
    pub fn commit(
        &mut self,
        store: &mut DomainStore,
        decision: Decision,
        branch: Branch,
    ) -> Result<()> {
        let variable = self.decided_variable(decision);
        let removed = self.constraints[decision.constraint].commit(
            store,
            decision.pos,
            decision.value,
            branch,
        )?;
        debug!(
            %variable,
            choice = %self.describe(decision, branch),
            removed = removed.len(),
            "committed decision"
        );
        // The committing constraint already updated itself; the narrowing
        // still has to reach the other constraints that contain the
        // variable.
        for (index, constraint) in self.constraints.iter_mut().enumerate() {
            if index == decision.constraint {
                continue;
            }
            if !removed.is_empty() {
                constraint.on_domain_narrowed(variable, &removed);
            }
            if store.is_assigned(variable) {
                constraint.on_assigned(variable);
            }
        }
        Ok(())
    }

    /// Human-readable rendering of a decision, e.g. `x[3] = 5` for the
    /// assignment branch and `x[3] != 5` for the exclusion branch.
    pub fn describe(&self, decision: Decision, branch: Branch) -> String {
        match branch {
            Branch::Assign => format!("x[{}] = {}", decision.pos, decision.value),
            Branch::Exclude => format!("x[{}] != {}", decision.pos, decision.value),
        }
    }

    /// Forwards a host narrowing event to every constraint that contains
    /// `variable`. Must be called synchronously, once per narrowing event,
    /// before the next density estimation.
    pub fn on_domain_narrowed(&mut self, variable: VariableId, removed: &[i64]) {
        for constraint in &mut self.constraints {
            constraint.on_domain_narrowed(variable, removed);
        }
    }

    /// Forwards an assignment event to every constraint that contains
    /// `variable`.
    pub fn on_assigned(&mut self, variable: VariableId) {
        for constraint in &mut self.constraints {
            constraint.on_assigned(variable);
        }
    }

    /// The posted constraints, in posting order.
    pub fn constraints(&self) -> &[Box<dyn CountingConstraint>] {
        &self.constraints
    }

    pub fn descriptors(&self) -> Vec<ConstraintDescriptor> {
        self.constraints.iter().map(|c| c.descriptor()).collect()
    }

    /// The shared factor tables, mainly useful for diagnostics.
    pub fn tables(&self) -> &BoundTables {
        &self.tables
    }

    fn decided_variable(&self, decision: Decision) -> VariableId {
        self.constraints[decision.constraint].variables()[decision.pos]
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::branching::all_different::AllDifferent;
    use crate::branching::preference::{MaxDensity, MinDensity};
    use crate::domain::IntDomain;

    use super::*;

    fn store_with(domains: &[(VariableId, &[i64])]) -> DomainStore {
        let mut store = DomainStore::new();
        for (var, values) in domains {
            store.insert(*var, IntDomain::new(values.iter().copied().collect()));
        }
        store
    }

    fn single_constraint_brancher(
        store: &DomainStore,
        vars: Vec<VariableId>,
    ) -> CountingBrancher {
        CountingBrancher::new(
            vec![Box::new(AllDifferent::with_index(vars, store))],
            store,
            Arc::new(MaxDensity),
        )
    }

    /// Two constraints with different best densities: the pairs of the
    /// two-variable constraint score 1/2, those of the three-variable
    /// constraint 1/3.
    fn two_constraint_setup() -> (CountingBrancher, DomainStore) {
        let store = store_with(&[
            (0, &[0, 1]),
            (1, &[0, 1]),
            (2, &[0, 1, 2]),
            (3, &[0, 1, 2]),
            (4, &[0, 1, 2]),
        ]);
        let constraints: Vec<Box<dyn CountingConstraint>> = vec![
            Box::new(AllDifferent::with_index(vec![0, 1], &store)),
            Box::new(AllDifferent::with_index(vec![2, 3, 4], &store)),
        ];
        let brancher = CountingBrancher::new(constraints, &store, Arc::new(MaxDensity));
        (brancher, store)
    }

    #[test]
    fn status_follows_the_domains() {
        let mut store = store_with(&[(0, &[0, 1]), (1, &[0, 1])]);
        let brancher = single_constraint_brancher(&store, vec![0, 1]);

        assert!(brancher.status(&store));
        store.restrict_to(0, 0).unwrap();
        store.restrict_to(1, 1).unwrap();
        assert!(!brancher.status(&store));
    }

    #[test]
    fn higher_preference_picks_the_denser_constraint() {
        let (mut brancher, store) = two_constraint_setup();
        let decision = brancher.choice(&store);
        assert_eq!(decision.constraint, 0);
    }

    #[test]
    fn lower_preference_picks_the_sparser_constraint() {
        let store = store_with(&[
            (0, &[0, 1]),
            (1, &[0, 1]),
            (2, &[0, 1, 2]),
            (3, &[0, 1, 2]),
            (4, &[0, 1, 2]),
        ]);
        let constraints: Vec<Box<dyn CountingConstraint>> = vec![
            Box::new(AllDifferent::with_index(vec![0, 1], &store)),
            Box::new(AllDifferent::with_index(vec![2, 3, 4], &store)),
        ];
        let mut brancher = CountingBrancher::new(constraints, &store, Arc::new(MinDensity));
        let decision = brancher.choice(&store);
        assert_eq!(decision.constraint, 1);
    }

    #[test]
    fn assigned_constraints_are_skipped() {
        let store = store_with(&[(0, &[0]), (1, &[1]), (2, &[0, 1]), (3, &[0, 1])]);
        let constraints: Vec<Box<dyn CountingConstraint>> = vec![
            Box::new(AllDifferent::with_index(vec![0, 1], &store)),
            Box::new(AllDifferent::with_index(vec![2, 3], &store)),
        ];
        let mut brancher = CountingBrancher::new(constraints, &store, Arc::new(MaxDensity));
        let decision = brancher.choice(&store);
        assert_eq!(decision.constraint, 1);
    }

    #[test]
    fn commit_assign_narrows_to_the_single_value() {
        let mut store = store_with(&[(0, &[3, 5, 7]), (1, &[3, 5, 7]), (2, &[3, 5, 7])]);
        let mut brancher = single_constraint_brancher(&store, vec![0, 1, 2]);

        let decision = Decision { constraint: 0, pos: 1, value: 5 };
        brancher.commit(&mut store, decision, Branch::Assign).unwrap();

        assert_eq!(store.value(1), Some(5));
        assert_eq!(store.domain(0).iter().collect::<Vec<_>>(), vec![3, 5, 7]);
        assert_eq!(store.domain(2).iter().collect::<Vec<_>>(), vec![3, 5, 7]);
    }

    #[test]
    fn commit_exclude_removes_only_the_value() {
        let mut store = store_with(&[(0, &[3, 5, 7]), (1, &[3, 5, 7]), (2, &[3, 5, 7])]);
        let mut brancher = single_constraint_brancher(&store, vec![0, 1, 2]);

        let decision = Decision { constraint: 0, pos: 1, value: 5 };
        brancher.commit(&mut store, decision, Branch::Exclude).unwrap();

        assert_eq!(store.domain(1).iter().collect::<Vec<_>>(), vec![3, 7]);
        assert_eq!(store.domain(0).iter().collect::<Vec<_>>(), vec![3, 5, 7]);
        assert_eq!(store.domain(2).iter().collect::<Vec<_>>(), vec![3, 5, 7]);
    }

    #[test]
    fn excluding_the_last_value_fails_the_branch() {
        let mut store = store_with(&[(0, &[5]), (1, &[3, 5])]);
        let mut brancher = single_constraint_brancher(&store, vec![0, 1]);

        let decision = Decision { constraint: 0, pos: 0, value: 5 };
        let err = brancher.commit(&mut store, decision, Branch::Exclude).unwrap_err();
        assert!(matches!(err, Error::DomainWipeout { variable: 0 }));
    }

    #[test]
    fn decisions_round_trip_through_the_archive() {
        let (mut brancher, store) = two_constraint_setup();
        let decision = brancher.choice(&store);
        let archive = decision.archive().unwrap();
        let replayed = brancher.choice_from_archive(&archive).unwrap();
        assert_eq!(replayed, decision);
    }

    #[test]
    fn archives_for_unknown_constraints_are_rejected() {
        let (brancher, _store) = two_constraint_setup();
        let bogus = Decision { constraint: 9, pos: 0, value: 0 }.archive().unwrap();
        let err = brancher.choice_from_archive(&bogus).unwrap_err();
        assert!(matches!(err, Error::UnknownConstraint { index: 9, count: 2 }));

        let bogus = Decision { constraint: 1, pos: 7, value: 0 }.archive().unwrap();
        let err = brancher.choice_from_archive(&bogus).unwrap_err();
        assert!(matches!(err, Error::UnknownPosition { pos: 7, arity: 3 }));

        assert!(brancher.choice_from_archive(b"not json").is_err());
    }

    #[test]
    fn describe_renders_both_branches() {
        let (brancher, _store) = two_constraint_setup();
        let decision = Decision { constraint: 0, pos: 1, value: 4 };
        assert_eq!(brancher.describe(decision, Branch::Assign), "x[1] = 4");
        assert_eq!(brancher.describe(decision, Branch::Exclude), "x[1] != 4");
    }

    #[test]
    fn forked_branchers_explore_independently() {
        let mut store = store_with(&[(0, &[0, 1, 2]), (1, &[0, 1, 2]), (2, &[0, 1, 2])]);
        let mut brancher = single_constraint_brancher(&store, vec![0, 1, 2]);
        let decision = brancher.choice(&store);

        let mut left = brancher.clone();
        let mut left_store = store.clone();
        left.commit(&mut left_store, decision, Branch::Assign).unwrap();

        brancher.commit(&mut store, decision, Branch::Exclude).unwrap();

        // The assign child fixed the variable; the exclude child kept two
        // values. Neither observes the other's narrowing.
        let variable = brancher.constraints()[0].variables()[decision.pos];
        assert_eq!(left_store.domain(variable).len(), 1);
        assert_eq!(store.domain(variable).len(), 2);

        // Prune the assigned value from the peers, as the host's
        // propagation would, then both children keep branching on their
        // own state.
        for var in [0u32, 1, 2] {
            if var != variable {
                let removed = left_store.exclude(var, decision.value).unwrap();
                left.on_domain_narrowed(var, &removed);
            }
        }
        assert!(left.status(&left_store));
        let _ = left.choice(&left_store);
        assert!(brancher.status(&store));
        let _ = brancher.choice(&store);
    }
}
