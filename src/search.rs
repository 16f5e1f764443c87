//! A minimal depth-first driver around the brancher.
//!
//! Real deployments embed [`CountingBrancher`] in their own search engine;
//! this driver exists so the demo binary and the end-to-end tests can run a
//! complete search without one. It performs binary branching (assign on the
//! left child, exclude on the right) and the forward checking all-different
//! needs for correctness: once a variable is assigned, its value is removed
//! from every peer in the same constraint, with each removal routed through
//! the brancher's notification surface.

use tracing::trace;

use crate::branching::{Branch, CountingBrancher};
use crate::domain::DomainStore;
use crate::stats::SearchStats;

/// Runs a depth-first search from the given state and returns the first
/// solution found, or `None` if the subtree is exhausted.
pub fn solve(
    brancher: &CountingBrancher,
    store: &DomainStore,
    stats: &mut SearchStats,
) -> Option<DomainStore> {
    let mut brancher = brancher.clone();
    let mut store = store.clone();
    if forward_check(&mut brancher, &mut store, stats).is_err() {
        stats.failures += 1;
        return None;
    }
    search(brancher, store, stats)
}

fn search(
    mut brancher: CountingBrancher,
    store: DomainStore,
    stats: &mut SearchStats,
) -> Option<DomainStore> {
    stats.nodes_visited += 1;
    if !brancher.status(&store) {
        return Some(store);
    }

    // One decision per node, committed on both children.
    let decision = brancher.choice(&store);
    stats.record_choice(decision.constraint);

    for branch in [Branch::Assign, Branch::Exclude] {
        trace!(branch = %brancher.describe(decision, branch), "descending");
        let mut child_brancher = brancher.clone();
        let mut child_store = store.clone();

        let feasible = child_brancher
            .commit(&mut child_store, decision, branch)
            .and_then(|()| forward_check(&mut child_brancher, &mut child_store, stats))
            .is_ok();
        if feasible {
            if let Some(solution) = search(child_brancher, child_store, stats) {
                return Some(solution);
            }
        } else {
            stats.failures += 1;
        }
        stats.backtracks += 1;
    }

    None
}

/// Removes every assigned value from its peers in the same constraint until
/// no domain changes, reporting each removal to the brancher. Fails with the
/// wipeout of the first variable that runs out of values.
fn forward_check(
    brancher: &mut CountingBrancher,
    store: &mut DomainStore,
    stats: &mut SearchStats,
) -> crate::error::Result<()> {
    loop {
        let mut changed = false;
        for index in 0..brancher.constraints().len() {
            let vars = brancher.constraints()[index].variables().to_vec();
            for &assigned in &vars {
                let Some(value) = store.value(assigned) else {
                    continue;
                };
                for &peer in &vars {
                    if peer == assigned || !store.domain(peer).contains(value) {
                        continue;
                    }
                    let removed = store.exclude(peer, value)?;
                    brancher.on_domain_narrowed(peer, &removed);
                    if store.is_assigned(peer) {
                        brancher.on_assigned(peer);
                    }
                    stats.record_pruning(index);
                    changed = true;
                }
            }
        }
        if !changed {
            return Ok(());
        }
    }
}
