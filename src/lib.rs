//! Census implements counting-based search: branching heuristics that
//! estimate, for every remaining (variable, value) pair of a family of
//! all-different constraints, how likely the pair is to appear in a
//! solution, and branch on the most promising one.
//!
//! The densities come from upper bounds on the permanent of the
//! variable-value adjacency matrix (Minc-Brégman and Liang-Bai), following
//! "Counting-Based Search: Branching Heuristics for Constraint Satisfaction
//! Problems" by Pesant, Quimper and Zanarini. The crate is a branching
//! module, not a solver: it plugs into a host search engine that owns
//! propagation and backtracking.
//!
//! # Core Concepts
//!
//! - **[`DomainStore`]**: the per-branch domain state, one shrinking value
//!   set per variable, cheap to fork thanks to persistent data structures.
//! - **[`CountingConstraint`]**: a constraint that can score its (variable,
//!   value) pairs. [`AllDifferent`] is the provided implementation, with an
//!   optional incremental value index.
//! - **[`CountingBrancher`]**: owns every counting constraint of a search,
//!   sizes the shared bound tables once, and turns per-constraint candidates
//!   into one global [`Decision`] that is committed as an assignment or an
//!   exclusion.
//!
//! # Example: Branching on a 3-Variable Permutation
//!
//! ```
//! use std::sync::Arc;
//!
//! use census::branching::{
//!     AllDifferent, Branch, CountingBrancher, CountingConstraint, MaxDensity,
//! };
//! use census::domain::{DomainStore, IntDomain};
//!
//! // Three variables, each ranging over {0, 1, 2}, all different.
//! let mut store = DomainStore::new();
//! for var in 0..3 {
//!     store.insert(var, IntDomain::range(0, 2));
//! }
//! let constraints: Vec<Box<dyn CountingConstraint>> =
//!     vec![Box::new(AllDifferent::with_index(vec![0, 1, 2], &store))];
//!
//! let mut brancher = CountingBrancher::new(constraints, &store, Arc::new(MaxDensity));
//! assert!(brancher.status(&store));
//!
//! // Every pair is equally likely here, so the first one wins the tie.
//! let decision = brancher.choice(&store);
//! assert_eq!(brancher.describe(decision, Branch::Assign), "x[0] = 0");
//!
//! brancher.commit(&mut store, decision, Branch::Assign).unwrap();
//! assert!(store.is_assigned(0));
//! ```

pub mod branching;
pub mod domain;
pub mod error;
pub mod search;
pub mod stats;
