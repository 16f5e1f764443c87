//! Precomputed factor tables for the Minc-Brégman and Liang-Bai upper bounds
//! on the permanent of the variable-value adjacency matrix.
//!
//! Both tables are sized once per solving session to the maxima over every
//! constraint sharing the brancher, then shared read-only (via `Arc`) by all
//! of them. Queries beyond the sized range are programming errors.

/// Factors for the Minc-Brégman permanent upper bound: entry `n` holds the
/// n-th root of `n!`.
#[derive(Debug, Clone)]
pub struct MincFactors {
    factors: Vec<f64>,
}

impl MincFactors {
    pub fn new(largest_domain_size: usize) -> Self {
        assert!(largest_domain_size >= 1);
        let mut factors = Vec::with_capacity(largest_domain_size);
        let mut factorial = 1.0;
        for n in 1..=largest_domain_size {
            factorial *= n as f64;
            factors.push(factorial.powf(1.0 / n as f64));
        }
        Self { factors }
    }

    /// The factor for a domain of `domain_size` values.
    pub fn get(&self, domain_size: usize) -> f64 {
        assert!(
            domain_size >= 1 && domain_size <= self.factors.len(),
            "domain size {domain_size} outside the precomputed range 1..={}",
            self.factors.len()
        );
        self.factors[domain_size - 1]
    }

    pub fn largest_domain_size(&self) -> usize {
        self.factors.len()
    }
}

/// Factors for the Liang-Bai permanent upper bound, per (variable position,
/// domain size) pair. For 1-based position `i` and size `j` the factor is
/// `q * (j - q + 1)` with `q = min(ceil(i/2), ceil((j+1)/2))`.
#[derive(Debug, Clone)]
pub struct LiangBaiFactors {
    factors: Vec<f64>,
    variable_count: usize,
    largest_domain_size: usize,
}

impl LiangBaiFactors {
    pub fn new(variable_count: usize, largest_domain_size: usize) -> Self {
        assert!(variable_count >= 1 && largest_domain_size >= 1);
        let mut factors = Vec::with_capacity(variable_count * largest_domain_size);
        for i in 1..=variable_count {
            let b = (i as f64 / 2.0).ceil();
            for j in 1..=largest_domain_size {
                let a = ((j + 1) as f64 / 2.0).ceil();
                let q = a.min(b);
                factors.push(q * (j as f64 - q + 1.0));
            }
        }
        Self {
            factors,
            variable_count,
            largest_domain_size,
        }
    }

    /// The factor for the variable at 0-based `position` within its
    /// constraint, with a domain of `domain_size` values.
    pub fn get(&self, position: usize, domain_size: usize) -> f64 {
        assert!(
            position < self.variable_count,
            "position {position} outside the precomputed range 0..{}",
            self.variable_count
        );
        assert!(
            domain_size >= 1 && domain_size <= self.largest_domain_size,
            "domain size {domain_size} outside the precomputed range 1..={}",
            self.largest_domain_size
        );
        self.factors[position * self.largest_domain_size + (domain_size - 1)]
    }

    pub fn variable_count(&self) -> usize {
        self.variable_count
    }
}

/// Both factor tables, computed once per session and shared by every
/// constraint of a brancher. Immutable after construction, so clones of the
/// search node can alias it freely.
#[derive(Debug)]
pub struct BoundTables {
    minc: MincFactors,
    liang_bai: LiangBaiFactors,
}

impl BoundTables {
    /// Sizes both tables for `variable_count` variables and domains spanning
    /// at most `largest_domain_size` values, the maxima over all constraints
    /// that will share the tables.
    pub fn new(variable_count: usize, largest_domain_size: usize) -> Self {
        Self {
            minc: MincFactors::new(largest_domain_size),
            liang_bai: LiangBaiFactors::new(variable_count, largest_domain_size),
        }
    }

    pub fn minc(&self, domain_size: usize) -> f64 {
        self.minc.get(domain_size)
    }

    pub fn liang_bai(&self, position: usize, domain_size: usize) -> f64 {
        self.liang_bai.get(position, domain_size)
    }

    /// Whether these tables are large enough for a constraint of
    /// `variable_count` variables spanning `largest_domain_size` values.
    pub fn covers(&self, variable_count: usize, largest_domain_size: usize) -> bool {
        variable_count <= self.liang_bai.variable_count()
            && largest_domain_size <= self.minc.largest_domain_size()
    }
}
