use std::sync::Arc;

use crate::branching::bounds::BoundTables;
use crate::branching::constraint::{ConstraintDescriptor, CountingConstraint};
use crate::branching::density::{Candidate, DensityEstimator, DensityMatrix};
use crate::branching::index::ValueIndex;
use crate::branching::preference::DensityPreference;
use crate::domain::{DomainStore, VariableId};

/// The all-different counting constraint: estimates, for every remaining
/// (variable, value) pair, the share of value permutations that assign the
/// value to the variable.
///
/// Cloning forks the per-branch state (the value index and the scratch
/// matrix) while sharing the immutable factor tables.
#[derive(Debug, Clone)]
pub struct AllDifferent {
    vars: Vec<VariableId>,
    index: Option<ValueIndex>,
    tables: Option<Arc<BoundTables>>,
    matrix: DensityMatrix,
}

impl AllDifferent {
    /// Creates the constraint without a value index; estimation falls back
    /// to scanning all variables for every value.
    pub fn new(vars: Vec<VariableId>) -> Self {
        assert!(!vars.is_empty(), "all-different needs at least one variable");
        Self {
            vars,
            index: None,
            tables: None,
            matrix: DensityMatrix::default(),
        }
    }

    /// Creates the constraint with a [`ValueIndex`] built from the current
    /// domains in `store`. The index stays consistent as long as every
    /// narrowing event reaches [`CountingConstraint::on_domain_narrowed`].
    pub fn with_index(vars: Vec<VariableId>, store: &DomainStore) -> Self {
        let mut constraint = Self::new(vars);
        let domains: Vec<_> = constraint.vars.iter().map(|&v| store.domain(v)).collect();
        constraint.index = Some(ValueIndex::build(&domains));
        constraint
    }

    fn position(&self, variable: VariableId) -> Option<usize> {
        self.vars.iter().position(|&v| v == variable)
    }
}

impl CountingConstraint for AllDifferent {
    fn variables(&self) -> &[VariableId] {
        &self.vars
    }

    fn descriptor(&self) -> ConstraintDescriptor {
        let vars_str = self
            .vars
            .iter()
            .map(|v| format!("?{}", v))
            .collect::<Vec<_>>()
            .join(", ");
        ConstraintDescriptor {
            name: "AllDifferent".to_string(),
            description: format!("AllDifferent({})", vars_str),
        }
    }

    fn install_tables(&mut self, tables: Arc<BoundTables>) {
        if self.tables.is_none() {
            self.tables = Some(tables);
        }
    }

    fn best_density(
        &mut self,
        store: &DomainStore,
        preference: &dyn DensityPreference,
    ) -> Candidate {
        let tables = self
            .tables
            .as_deref()
            .expect("factor tables are installed before the first estimation");
        DensityEstimator::new(tables, self.index.as_ref()).best_candidate(
            &self.vars,
            store,
            &mut self.matrix,
            preference,
        )
    }

    fn on_domain_narrowed(&mut self, variable: VariableId, removed: &[i64]) {
        if let (Some(pos), Some(index)) = (self.position(variable), self.index.as_mut()) {
            index.on_domain_narrowed(pos, removed);
        }
    }

    fn on_assigned(&mut self, variable: VariableId) {
        if let (Some(pos), Some(index)) = (self.position(variable), self.index.as_mut()) {
            index.retire(pos);
        }
    }

    fn clone_box(&self) -> Box<dyn CountingConstraint> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use im::OrdSet;
    use pretty_assertions::assert_eq;

    use crate::branching::brancher::Branch;
    use crate::branching::preference::MaxDensity;
    use crate::domain::IntDomain;

    use super::*;

    fn store_with(domains: &[(VariableId, &[i64])]) -> DomainStore {
        let mut store = DomainStore::new();
        for (var, values) in domains {
            store.insert(*var, IntDomain::new(values.iter().copied().collect()));
        }
        store
    }

    #[test]
    fn descriptor_lists_the_variables() {
        let constraint = AllDifferent::new(vec![4, 7]);
        let descriptor = constraint.descriptor();
        assert_eq!(descriptor.name, "AllDifferent");
        assert_eq!(descriptor.description, "AllDifferent(?4, ?7)");
    }

    #[test]
    fn install_tables_keeps_the_first_tables() {
        let mut constraint = AllDifferent::new(vec![0, 1]);
        let first = Arc::new(BoundTables::new(4, 8));
        let second = Arc::new(BoundTables::new(2, 2));
        constraint.install_tables(Arc::clone(&first));
        constraint.install_tables(second);
        assert!(constraint.tables.as_ref().unwrap().covers(4, 8));
    }

    #[test]
    fn narrowing_notifications_keep_the_index_consistent() {
        let mut store = store_with(&[(0, &[0, 1, 2]), (1, &[0, 1, 2]), (2, &[0, 1, 2])]);
        let mut constraint = AllDifferent::with_index(vec![0, 1, 2], &store);

        let removed = store.restrict_to(1, 2).unwrap();
        constraint.on_domain_narrowed(1, &removed);
        constraint.on_assigned(1);
        // Notifications for foreign variables are ignored.
        constraint.on_domain_narrowed(9, &[0]);

        let index = constraint.index.as_ref().unwrap();
        assert_eq!(index.get(0).iter().copied().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(index.get(1).iter().copied().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(index.get(2).iter().copied().collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn best_density_reflects_narrowed_domains() {
        let mut store = store_with(&[(0, &[0, 1, 2]), (1, &[0, 1, 2]), (2, &[0, 1, 2])]);
        let mut constraint = AllDifferent::with_index(vec![0, 1, 2], &store);
        constraint.install_tables(Arc::new(BoundTables::new(3, 3)));

        // Assign variable 1 and prune its value from the peers, as the
        // host's propagation would.
        for var in [0, 2] {
            let removed = store.exclude(var, 2).unwrap();
            constraint.on_domain_narrowed(var, &removed);
        }
        let removed = store.restrict_to(1, 2).unwrap();
        constraint.on_domain_narrowed(1, &removed);
        constraint.on_assigned(1);

        let best = constraint.best_density(&store, &MaxDensity);
        // Two variables over {0, 1}: every remaining pair has density 1/2.
        assert_ne!(best.pos, 1);
        assert!((best.density - 0.5).abs() < 1e-9);
    }

    #[test]
    fn commit_keeps_the_constraint_consistent() {
        let mut store = store_with(&[(0, &[0, 1]), (1, &[0, 1])]);
        let mut constraint = AllDifferent::with_index(vec![0, 1], &store);

        let removed = constraint.commit(&mut store, 0, 1, Branch::Assign).unwrap();
        assert_eq!(removed, vec![0]);
        assert_eq!(store.value(0), Some(1));

        let index = constraint.index.as_ref().unwrap();
        assert_eq!(index.get(0).iter().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(index.get(1).iter().copied().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn clones_fork_their_index() {
        let mut store = store_with(&[(0, &[0, 1]), (1, &[0, 1])]);
        let mut original = AllDifferent::with_index(vec![0, 1], &store);
        let forked = original.clone_box();

        let removed = store.exclude(0, 1).unwrap();
        original.on_domain_narrowed(0, &removed);

        let original_index = original.index.as_ref().unwrap();
        assert_eq!(original_index.get(1).iter().copied().collect::<Vec<_>>(), vec![1]);
        // Downcast-free check: the fork still sees both candidates through
        // its own estimation, because its index was not touched.
        let mut forked = forked;
        forked.install_tables(Arc::new(BoundTables::new(2, 2)));
        let fork_store = store_with(&[(0, &[0, 1]), (1, &[0, 1])]);
        let best = forked.best_density(&fork_store, &MaxDensity);
        assert!((best.density - 0.5).abs() < 1e-9);
    }

    #[test]
    #[should_panic(expected = "at least one variable")]
    fn empty_variable_list_is_rejected() {
        let _ = AllDifferent::new(Vec::new());
    }

    #[test]
    fn singleton_constraint_normalizes_over_its_values() {
        let store = store_with(&[(0, &[3, 4])]);
        let mut constraint = AllDifferent::new(vec![0]);
        constraint.install_tables(Arc::new(BoundTables::new(1, 2)));
        let best = constraint.best_density(&store, &MaxDensity);
        assert_eq!(best.pos, 0);
        assert!((best.density - 0.5).abs() < 1e-9);
    }

    #[test]
    fn all_assigned_tracks_the_store() {
        let mut store = DomainStore::new();
        store.insert(0, IntDomain::new(OrdSet::unit(1)));
        store.insert(1, IntDomain::new([1, 2].into_iter().collect()));
        let constraint = AllDifferent::new(vec![0, 1]);
        assert!(!constraint.all_assigned(&store));
        store.restrict_to(1, 2).unwrap();
        assert!(constraint.all_assigned(&store));
    }
}
