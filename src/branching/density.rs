//! Solution-density estimation for one all-different constraint.
//!
//! For every remaining (variable, value) pair the estimator approximates the
//! share of solutions to the constraint that contain the assignment, using
//! upper bounds on the permanent of the variable-value adjacency matrix. The
//! implementation follows "Counting-Based Search: Branching Heuristics for
//! Constraint Satisfaction Problems" by Pesant, Quimper and Zanarini.

use crate::branching::bounds::BoundTables;
use crate::branching::index::ValueIndex;
use crate::branching::preference::DensityPreference;
use crate::domain::{DomainStore, VariableId};

/// A (position, value) pair together with its estimated solution density,
/// the local winner of one constraint's estimation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Position of the variable within its constraint.
    pub pos: usize,
    pub value: i64,
    pub density: f64,
}

/// The running pair of permanent upper bounds for a constraint, updated
/// multiplicatively as domains are (hypothetically) resized.
#[derive(Debug, Clone, Copy)]
struct UpperBound {
    minc: f64,
    liang_bai: f64,
}

impl UpperBound {
    fn unit() -> Self {
        Self { minc: 1.0, liang_bai: 1.0 }
    }

    fn include(&mut self, tables: &BoundTables, position: usize, domain_size: usize) {
        self.minc *= tables.minc(domain_size);
        self.liang_bai *= tables.liang_bai(position, domain_size);
    }

    /// Replaces the contribution of the variable at `position` as if its
    /// domain went from `old_size` to `new_size` values.
    fn resize(&mut self, tables: &BoundTables, position: usize, old_size: usize, new_size: usize) {
        self.minc *= tables.minc(new_size) / tables.minc(old_size);
        self.liang_bai *= tables.liang_bai(position, new_size) / tables.liang_bai(position, old_size);
    }

    /// The tighter of the two bounds. Liang-Bai bounds the squared
    /// permanent, hence the square root.
    fn tightest(&self) -> f64 {
        self.minc.min(self.liang_bai.sqrt())
    }
}

/// Reusable scratch buffer of scores, one row per variable and one column
/// per value in the constraint's current span.
///
/// [`DensityMatrix::prepare`] clears and resizes it at the start of every
/// estimation; nothing carries over between computations. Reuse is only
/// sound because estimations are strictly sequential per branch.
#[derive(Debug, Clone, Default)]
pub struct DensityMatrix {
    rows: usize,
    span: usize,
    offset: i64,
    scores: Vec<f64>,
}

impl DensityMatrix {
    pub fn prepare(&mut self, rows: usize, offset: i64, span: usize) {
        self.rows = rows;
        self.span = span;
        self.offset = offset;
        self.scores.clear();
        self.scores.resize(rows * span, 0.0);
    }

    pub fn get(&self, pos: usize, value: i64) -> f64 {
        self.scores[self.slot(pos, value)]
    }

    fn set(&mut self, pos: usize, value: i64, score: f64) {
        let slot = self.slot(pos, value);
        self.scores[slot] = score;
    }

    fn slot(&self, pos: usize, value: i64) -> usize {
        assert!(pos < self.rows, "position {pos} outside the matrix");
        let column = value - self.offset;
        assert!(
            column >= 0 && (column as usize) < self.span,
            "value {value} outside the matrix span"
        );
        pos * self.span + column as usize
    }
}

/// One density estimation pass over a constraint's variables.
///
/// With a [`ValueIndex`] the inner loop touches only the variables actually
/// compatible with the value under consideration; without one it falls back
/// to scanning the whole constraint, which makes the full estimation cubic
/// in the constraint size.
#[derive(Debug)]
pub struct DensityEstimator<'a> {
    tables: &'a BoundTables,
    index: Option<&'a ValueIndex>,
}

impl<'a> DensityEstimator<'a> {
    pub fn new(tables: &'a BoundTables, index: Option<&'a ValueIndex>) -> Self {
        Self { tables, index }
    }

    /// Scores every remaining (variable, value) pair, normalizes the scores
    /// of each unassigned variable to sum to one, and returns the best pair
    /// under `preference` (first found wins exact ties).
    ///
    /// Expects domains that are all-different-consistent, the state the
    /// host's propagation fixpoint leaves behind: an assigned variable's
    /// value no longer appears in any peer domain. Calling this with every
    /// variable assigned is a contract violation.
    pub fn best_candidate(
        &self,
        variables: &[VariableId],
        store: &DomainStore,
        matrix: &mut DensityMatrix,
        preference: &dyn DensityPreference,
    ) -> Candidate {
        let domains: Vec<_> = variables.iter().map(|&v| store.domain(v)).collect();
        assert!(
            domains.iter().any(|d| !d.is_assigned()),
            "density requested for a fully assigned constraint"
        );

        let offset = domains.iter().map(|d| d.min()).min().expect("at least one variable");
        let max = domains.iter().map(|d| d.max()).max().expect("at least one variable");
        matrix.prepare(domains.len(), offset, (max - offset + 1) as usize);

        // Upper bounds over the whole constraint; assigned variables
        // contribute their singleton domain.
        let mut whole = UpperBound::unit();
        for (position, domain) in domains.iter().enumerate() {
            whole.include(self.tables, position, domain.len());
        }

        let mut best: Option<Candidate> = None;
        for (i, domain) in domains.iter().enumerate() {
            if let Some(value) = domain.value() {
                // Deterministic: the assigned value has density one and is
                // never a branching candidate.
                matrix.set(i, value, 1.0);
                continue;
            }

            let mut var_bound = whole;
            var_bound.resize(self.tables, i, domain.len(), 1);

            let mut normalization = 0.0;
            for value in domain.iter() {
                let mut local = var_bound;
                match self.index {
                    Some(index) => {
                        for &j in index.get(value) {
                            if j != i {
                                let size = domains[j].len();
                                local.resize(self.tables, j, size, size - 1);
                            }
                        }
                    }
                    None => {
                        for (j, other) in domains.iter().enumerate() {
                            if j != i && other.contains(value) {
                                local.resize(self.tables, j, other.len(), other.len() - 1);
                            }
                        }
                    }
                }
                let score = local.tightest();
                matrix.set(i, value, score);
                normalization += score;
            }

            for value in domain.iter() {
                let density = matrix.get(i, value) / normalization;
                matrix.set(i, value, density);
                let is_better = match &best {
                    None => true,
                    Some(incumbent) => preference.better(density, incumbent.density),
                };
                if is_better {
                    best = Some(Candidate { pos: i, value, density });
                }
            }
        }

        best.expect("an unassigned variable yields at least one candidate")
    }
}
