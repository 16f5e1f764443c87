//! Solves a Latin square with counting-based branching and prints the
//! square together with the search statistics.
//!
//! The rows and columns are overlapping all-different constraints, so the
//! demo exercises the whole surface: shared bound tables, per-constraint
//! value indexes, cross-constraint narrowing notifications and the global
//! choice protocol.

use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use census::branching::{
    AllDifferent, CountingBrancher, CountingConstraint, DensityPreference, MaxDensity, MinDensity,
};
use census::domain::{DomainStore, IntDomain, VariableId};
use census::search;
use census::stats::{render_stats_table, SearchStats};

#[derive(Debug, Parser)]
#[command(name = "latin", about = "Solve a Latin square with counting-based branching")]
struct Args {
    /// Side length of the square.
    #[arg(default_value_t = 5)]
    order: usize,

    /// Which density the brancher should chase.
    #[arg(long, value_enum, default_value = "max")]
    prefer: Prefer,

    /// Estimate densities by scanning instead of the incremental value
    /// index.
    #[arg(long)]
    no_index: bool,

    /// Print per-constraint statistics after the search.
    #[arg(long)]
    stats: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Prefer {
    /// Branch towards the most promising assignment.
    Max,
    /// Fail-first: branch on the least promising assignment.
    Min,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let n = args.order;
    assert!(n >= 1, "the square needs at least one cell");

    let mut store = DomainStore::new();
    for cell in 0..(n * n) as VariableId {
        store.insert(cell, IntDomain::range(0, n as i64 - 1));
    }

    let mut constraints: Vec<Box<dyn CountingConstraint>> = Vec::new();
    for row in 0..n {
        let vars: Vec<VariableId> = (0..n).map(|col| (row * n + col) as VariableId).collect();
        constraints.push(build_constraint(vars, &store, args.no_index));
    }
    for col in 0..n {
        let vars: Vec<VariableId> = (0..n).map(|row| (row * n + col) as VariableId).collect();
        constraints.push(build_constraint(vars, &store, args.no_index));
    }

    let preference: Arc<dyn DensityPreference> = match args.prefer {
        Prefer::Max => Arc::new(MaxDensity),
        Prefer::Min => Arc::new(MinDensity),
    };
    let brancher = CountingBrancher::new(constraints, &store, preference);

    let mut stats = SearchStats::default();
    let started = Instant::now();
    let solution = search::solve(&brancher, &store, &mut stats);
    let elapsed = started.elapsed();

    match solution {
        Some(solution) => {
            for row in 0..n {
                let line: Vec<String> = (0..n)
                    .map(|col| {
                        let cell = (row * n + col) as VariableId;
                        solution.value(cell).expect("solved cells are assigned").to_string()
                    })
                    .collect();
                println!("{}", line.join(" "));
            }
        }
        None => println!("no solution"),
    }

    println!(
        "\n{} nodes, {} failures, {} backtracks in {:.2?}",
        stats.nodes_visited, stats.failures, stats.backtracks, elapsed
    );
    if args.stats {
        println!("{}", render_stats_table(&stats, &brancher.descriptors()));
    }
}

fn build_constraint(
    vars: Vec<VariableId>,
    store: &DomainStore,
    no_index: bool,
) -> Box<dyn CountingConstraint> {
    if no_index {
        Box::new(AllDifferent::new(vars))
    } else {
        Box::new(AllDifferent::with_index(vars, store))
    }
}
