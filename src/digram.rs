use crate::engine::GrammarEngine;
use crate::symbol::DigramKey;
use slotmap::DefaultKey;
use std::collections::hash_map::Entry;
use std::hash::Hash;

impl<T: Hash + Eq + Clone> GrammarEngine<T> {
    // ========================================================================
    // Digram index
    // ========================================================================

    /// Returns the index key of the digram starting at `first`, or `None` when
    /// either side is a rule sentinel.
    #[inline]
    pub(crate) fn digram_key(&self, first: DefaultKey) -> Option<DigramKey> {
        let second = self.symbols[first].next?;
        let a = self.symbols[first].symbol.id()?;
        let b = self.symbols[second].symbol.id()?;
        Some((a, b))
    }

    /// Finds an existing digram or adds it to the index.
    ///
    /// Returns `Some(key)` of the earlier occurrence when a non-overlapping
    /// repeat exists, `None` otherwise (including when the digram was just
    /// registered).
    pub(crate) fn find_and_add_digram(&mut self, first: DefaultKey) -> Option<DefaultKey> {
        let key = self.digram_key(first)?;
        let second = self.symbols[first].next?;

        match self.digram_index.entry(key) {
            Entry::Vacant(e) => {
                e.insert(first);
                None
            }
            Entry::Occupied(mut e) => {
                let other_first = *e.get();

                if other_first == first {
                    return None;
                }

                // An entry that no longer describes a live occurrence of this
                // digram is replaced by the current location.
                let live = self.symbols.contains_key(other_first)
                    && self.symbols[other_first].next.is_some();
                if !live {
                    e.insert(first);
                    return None;
                }
                let other_second = self.symbols[other_first]
                    .next
                    .expect("checked above");
                let same = self.symbols[other_first].symbol.id() == Some(key.0)
                    && self.symbols[other_second].symbol.id() == Some(key.1);
                if !same {
                    e.insert(first);
                    return None;
                }

                // Overlapping occurrences such as the two `aa` in `aaa`.
                if other_second == first || other_first == second {
                    return None;
                }

                Some(other_first)
            }
        }
    }

    /// Removes a digram from the index if it points to the given location.
    ///
    /// Only removes if the index entry points to exactly this location,
    /// preventing removal of duplicate digrams at different locations.
    #[inline]
    pub(crate) fn remove_digram_from_index(&mut self, first: DefaultKey) {
        let Some(key) = self.digram_key(first) else {
            return;
        };

        if let Entry::Occupied(e) = self.digram_index.entry(key) {
            if *e.get() == first {
                e.remove();
            }
        }
    }

    // ========================================================================
    // Linkage
    // ========================================================================

    /// Links `left -> right`, dropping the digram `left` used to start.
    ///
    /// Breaking a link inside a run of three equal symbols re-registers the
    /// surviving overlapped digram, which was never indexed on its own.
    pub(crate) fn join(&mut self, left: DefaultKey, right: DefaultKey) {
        if self.symbols[left].next.is_some() {
            self.remove_digram_from_index(left);

            if let (Some(rp), Some(rn)) = (self.symbols[right].prev, self.symbols[right].next) {
                if self.same_run(rp, right, rn) {
                    if let Some(key) = self.digram_key(right) {
                        self.digram_index.insert(key, right);
                    }
                }
            }

            if let (Some(lp), Some(ln)) = (self.symbols[left].prev, self.symbols[left].next) {
                if self.same_run(lp, left, ln) {
                    if let Some(key) = self.digram_key(lp) {
                        self.digram_index.insert(key, lp);
                    }
                }
            }
        }

        self.symbols[left].next = Some(right);
        self.symbols[right].prev = Some(left);
    }

    /// Inserts the detached node `node` directly after `at`.
    pub(crate) fn insert_after(&mut self, at: DefaultKey, node: DefaultKey) {
        let after = self.symbols[at]
            .next
            .expect("insertion point must not be a rule tail");
        self.join(node, after);
        self.join(at, node);
    }

    /// Unlinks and frees a body symbol, releasing its rule reference.
    pub(crate) fn remove_symbol(&mut self, key: DefaultKey) {
        let prev = self.symbols[key].prev.expect("body symbol has a predecessor");
        let next = self.symbols[key].next.expect("body symbol has a successor");

        self.join(prev, next);
        self.remove_digram_from_index(key);
        self.decrement_if_rule(key);
        self.symbols.remove(key);
    }

    fn same_run(&self, a: DefaultKey, b: DefaultKey, c: DefaultKey) -> bool {
        match (
            self.symbols[a].symbol.id(),
            self.symbols[b].symbol.id(),
            self.symbols[c].symbol.id(),
        ) {
            (Some(x), Some(y), Some(z)) => x == y && y == z,
            _ => false,
        }
    }
}
