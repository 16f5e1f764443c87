use std::collections::HashMap;

use prettytable::{Cell, Row, Table};

use crate::branching::ConstraintDescriptor;

#[derive(Debug, Clone, Default)]
pub struct PerConstraintStats {
    /// How many branching decisions this constraint won.
    pub choices_won: u64,
    /// Values removed from its variables during propagation.
    pub prunings: u64,
}

/// Counters accumulated over one search run.
#[derive(Debug, Clone, Default)]
pub struct SearchStats {
    pub nodes_visited: u64,
    pub failures: u64,
    pub backtracks: u64,
    pub constraint_stats: HashMap<usize, PerConstraintStats>,
}

impl SearchStats {
    pub fn record_choice(&mut self, constraint: usize) {
        self.constraint_stats.entry(constraint).or_default().choices_won += 1;
    }

    pub fn record_pruning(&mut self, constraint: usize) {
        self.constraint_stats.entry(constraint).or_default().prunings += 1;
    }
}

pub fn render_stats_table(stats: &SearchStats, descriptors: &[ConstraintDescriptor]) -> String {
    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("Constraint Type"),
        Cell::new("ID"),
        Cell::new("Description"),
        Cell::new("Choices Won"),
        Cell::new("Prunings"),
    ]));

    for (id, descriptor) in descriptors.iter().enumerate() {
        let constraint_stats = stats.constraint_stats.get(&id).cloned().unwrap_or_default();
        table.add_row(Row::new(vec![
            Cell::new(&descriptor.name),
            Cell::new(&id.to_string()),
            Cell::new(&descriptor.description),
            Cell::new(&constraint_stats.choices_won.to_string()),
            Cell::new(&constraint_stats.prunings.to_string()),
        ]));
    }

    table.to_string()
}
