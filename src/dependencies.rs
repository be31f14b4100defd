//! Dependency graph between cells.
//!
//! Edges run from a precedent (a referenced cell) to its dependents (the
//! cells whose text references it). Cells are identified by their flat grid
//! index. The graph may contain cycles; the recalculation pass detects them.

use std::collections::BTreeSet;

/// For every cell, the set of cells that reference it.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    dependents: Vec<BTreeSet<usize>>,
}

impl DependencyGraph {
    /// A graph with one empty entry per cell.
    pub fn new(cell_count: usize) -> Self {
        Self {
            dependents: vec![BTreeSet::new(); cell_count],
        }
    }

    /// Cells referencing `precedent`, in ascending index order.
    pub fn dependents(&self, precedent: usize) -> impl DoubleEndedIterator<Item = usize> + '_ {
        self.dependents
            .get(precedent)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    pub fn has_edge(&self, precedent: usize, dependent: usize) -> bool {
        self.dependents
            .get(precedent)
            .is_some_and(|set| set.contains(&dependent))
    }

    /// Record that `dependent` references `precedent`.
    pub fn add(&mut self, precedent: usize, dependent: usize) {
        if let Some(set) = self.dependents.get_mut(precedent) {
            set.insert(dependent);
        }
    }

    /// Forget that `dependent` references `precedent`.
    pub fn remove(&mut self, precedent: usize, dependent: usize) {
        if let Some(set) = self.dependents.get_mut(precedent) {
            set.remove(&dependent);
        }
    }

    /// Move `dependent` from the precedents named in `old` to those named in
    /// `new`. Names shared by both sets are left alone; names `resolve` cannot
    /// place on the grid are skipped.
    pub fn update<F>(
        &mut self,
        dependent: usize,
        old: &BTreeSet<String>,
        new: &BTreeSet<String>,
        resolve: F,
    ) where
        F: Fn(&str) -> Option<usize>,
    {
        for name in new.difference(old) {
            if let Some(precedent) = resolve(name) {
                self.add(precedent, dependent);
            }
        }
        for name in old.difference(new) {
            if let Some(precedent) = resolve(name) {
                self.remove(precedent, dependent);
            }
        }
    }

    /// Number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.dependents.iter().map(BTreeSet::len).sum()
    }
}
