use rand::Rng;
use std::ops::Range;

const NOT_IN_POOL: usize = usize::MAX;

/// Tracks which positions a search has already examined.
///
/// Unvisited positions are kept in a swap-remove pool so a uniform random
/// unvisited position is drawn in O(1). Capacity is fixed at construction.
#[derive(Debug, Clone)]
pub struct VisitRegistry {
    visited: Vec<bool>,
    pool: Vec<usize>,
    /// Index of each position in `pool`, or `NOT_IN_POOL`.
    slots: Vec<usize>,
    /// `(position, slot)` of every mark since the last rollback; scratch only.
    journal: Option<Vec<(usize, usize)>>,
}

impl VisitRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            visited: vec![false; capacity],
            pool: (0..capacity).collect(),
            slots: (0..capacity).collect(),
            journal: None,
        }
    }

    /// A registry reused across candidates: [`rollback`](Self::rollback)
    /// restores the fresh state in time proportional to the marks made.
    pub(crate) fn scratch(capacity: usize) -> Self {
        Self {
            journal: Some(Vec::new()),
            ..Self::new(capacity)
        }
    }

    pub fn capacity(&self) -> usize {
        self.visited.len()
    }

    pub fn unvisited_count(&self) -> usize {
        self.pool.len()
    }

    pub fn visited_count(&self) -> usize {
        self.capacity() - self.unvisited_count()
    }

    /// Positions outside the registry count as unvisited.
    #[inline]
    pub fn is_visited(&self, position: usize) -> bool {
        self.visited.get(position).copied().unwrap_or(false)
    }

    /// True if any position of `range` has been visited.
    pub fn any_visited(&self, range: Range<usize>) -> bool {
        let end = range.end.min(self.capacity());
        let start = range.start.min(end);
        self.visited[start..end].iter().any(|&v| v)
    }

    /// Marks one position; out-of-range positions are ignored.
    pub fn mark(&mut self, position: usize) {
        if position >= self.capacity() || self.visited[position] {
            return;
        }
        self.visited[position] = true;

        let slot = self.slots[position];
        let last = self.pool.len() - 1;
        self.pool.swap(slot, last);
        self.slots[self.pool[slot]] = slot;
        self.pool.pop();
        self.slots[position] = NOT_IN_POOL;
        if let Some(journal) = &mut self.journal {
            journal.push((position, slot));
        }
    }

    /// Marks `range` highest position first, which leaves the pool exactly as
    /// in a fresh registry of capacity `range.start`.
    pub(crate) fn mark_tail(&mut self, range: Range<usize>) {
        for position in range.rev() {
            self.mark(position);
        }
    }

    /// Undoes every journaled mark in reverse order. Pool order, and with it
    /// the sequence of random draws, is the same as after construction.
    pub(crate) fn rollback(&mut self) {
        let Some(journal) = self.journal.as_mut() else {
            return;
        };
        while let Some((position, slot)) = journal.pop() {
            self.visited[position] = false;
            let last = self.pool.len();
            self.pool.push(position);
            self.pool.swap(slot, last);
            self.slots[self.pool[last]] = last;
            self.slots[position] = slot;
        }
    }

    pub fn mark_range(&mut self, range: Range<usize>) {
        for position in range {
            self.mark(position);
        }
    }

    /// A uniformly drawn unvisited position, or `None` once every position
    /// has been visited. The position is not marked.
    pub fn random_unvisited<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<usize> {
        if self.pool.is_empty() {
            return None;
        }
        Some(self.pool[rng.gen_range(0..self.pool.len())])
    }

    /// Iterates over visited positions in increasing order.
    pub fn visited_positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.visited
            .iter()
            .enumerate()
            .filter_map(|(idx, &v)| v.then_some(idx))
    }
}
