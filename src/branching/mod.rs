//! Counting-based branching: estimate how likely each (variable, value)
//! pair is to appear in a solution, and branch on the best pair.
//!
//! The moving parts, leaves first: [`bounds`] holds the precomputed
//! permanent-bound factor tables shared by every constraint; [`index`] keeps
//! an incremental value-to-variables mapping; [`density`] turns both into
//! normalized solution densities for one constraint; [`brancher`] owns all
//! constraints and reduces their local candidates to one global
//! [`Decision`].

pub mod all_different;
pub mod bounds;
pub mod brancher;
pub mod constraint;
pub mod density;
pub mod index;
pub mod preference;

pub use all_different::AllDifferent;
pub use bounds::BoundTables;
pub use brancher::{Branch, CountingBrancher, Decision};
pub use constraint::{ConstraintDescriptor, CountingConstraint};
pub use density::{Candidate, DensityEstimator, DensityMatrix};
pub use index::ValueIndex;
pub use preference::{DensityPreference, MaxDensity, MinDensity};
