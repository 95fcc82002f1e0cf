use crate::engine::GrammarEngine;
use crate::symbol::{Symbol, SymbolNode};
use slotmap::DefaultKey;
use std::hash::Hash;

impl<T: Hash + Eq + Clone> GrammarEngine<T> {
    /// Core algorithm: called when the link starting at `first` is new.
    ///
    /// Registers the digram, or resolves a repeat by reusing or creating a
    /// rule. Returns true when a substitution happened.
    pub(crate) fn check(&mut self, first: DefaultKey) -> bool {
        let Some(match_key) = self.find_and_add_digram(first) else {
            return false;
        };

        if let Some(rule_head) = self.get_complete_rule(match_key) {
            // The repeat is the whole body of an existing rule.
            let new_ref = self.substitute(first, rule_head);
            self.enforce_utility(rule_head);
            self.check_new_links(new_ref);
        } else {
            let rule_head = self.create_rule(first);
            let loc1 = self.substitute(match_key, rule_head);
            let loc2 = self.substitute(first, rule_head);

            let rule_first = self.symbols[rule_head]
                .next
                .expect("new rule has a body");
            if let Some(key) = self.digram_key(rule_first) {
                self.digram_index.insert(key, rule_first);
            }

            self.enforce_utility(rule_head);
            self.check_new_links(loc1);
            self.check_new_links(loc2);
        }
        true
    }

    /// Checks if a digram is a complete rule (surrounded by RuleHead and RuleTail).
    ///
    /// Returns Some(RuleHead key) if the digram forms a complete rule.
    #[inline]
    pub(crate) fn get_complete_rule(&self, first: DefaultKey) -> Option<DefaultKey> {
        let second = self.symbols[first].next?;

        let prev = self.symbols[first].prev?;
        // Rule 0 is never reused as a repeat: its body is the growing stream.
        let Symbol::RuleHead { rule_id, tail, .. } = self.symbols[prev].symbol else {
            return None;
        };
        if rule_id == 0 {
            return None;
        }

        let after_second = self.symbols[second].next?;
        (tail == after_second).then_some(prev)
    }

    /// Creates a detached rule whose body copies the digram at `first`.
    fn create_rule(&mut self, first: DefaultKey) -> DefaultKey {
        let second = self.symbols[first]
            .next
            .expect("digram first should have next");

        let first_symbol = self.symbols[first].symbol.clone_symbol();
        let second_symbol = self.symbols[second].symbol.clone_symbol();

        let rule_id = self.id_gen.get();
        let (head_key, tail_key) = self.new_rule_frame(rule_id);

        let rule_first = self.symbols.insert(SymbolNode::new(first_symbol));
        let rule_second = self.symbols.insert(SymbolNode::new(second_symbol));

        // Link rule structure: head -> first -> second -> tail
        self.symbols[head_key].next = Some(rule_first);
        self.symbols[rule_first].prev = Some(head_key);
        self.symbols[rule_first].next = Some(rule_second);
        self.symbols[rule_second].prev = Some(rule_first);
        self.symbols[rule_second].next = Some(tail_key);
        self.symbols[tail_key].prev = Some(rule_second);

        self.increment_if_rule(rule_first);
        self.increment_if_rule(rule_second);

        tracing::trace!(rule_id, "rule created");
        head_key
    }

    /// Allocates an empty head/tail pair and registers it under `rule_id`.
    pub(crate) fn new_rule_frame(&mut self, rule_id: u32) -> (DefaultKey, DefaultKey) {
        let tail_key = self.symbols.insert(SymbolNode::new(Symbol::RuleTail));
        let head_key = self.symbols.insert(SymbolNode::new(Symbol::RuleHead {
            rule_id,
            count: 0,
            tail: tail_key,
        }));
        self.symbols[head_key].next = Some(tail_key);
        self.symbols[tail_key].prev = Some(head_key);
        self.rule_index.insert(rule_id, head_key);
        (head_key, tail_key)
    }

    /// Replaces the digram at `first` with a reference to the rule at `rule_head`.
    ///
    /// Returns the key of the newly inserted RuleRef. New links are not checked
    /// here; callers do that once every edit of the current step is in place.
    pub(crate) fn substitute(&mut self, first: DefaultKey, rule_head: DefaultKey) -> DefaultKey {
        debug_assert!(
            self.symbols[rule_head].symbol.is_head(),
            "rule_head must be a RuleHead"
        );

        let before = self.symbols[first]
            .prev
            .expect("digram first has a predecessor");
        let second = self.symbols[first]
            .next
            .expect("first should have next in digram");

        self.remove_symbol(first);
        self.remove_symbol(second);

        let Symbol::RuleHead { rule_id, .. } = self.symbols[rule_head].symbol else {
            unreachable!();
        };
        let new_ref = self
            .symbols
            .insert(SymbolNode::new(Symbol::RuleRef { rule_id }));
        self.insert_after(before, new_ref);
        self.increment_rule_count(rule_head);

        new_ref
    }

    /// Inlines any rule referenced from `rule_head`'s body that is now used
    /// only once (rule utility).
    fn enforce_utility(&mut self, rule_head: DefaultKey) {
        let Some(first) = self.symbols[rule_head].next else {
            return;
        };
        let second = self.symbols[first].next;

        self.expand_rule_if_necessary(first);
        if let Some(second) = second {
            self.expand_rule_if_necessary(second);
        }
    }

    /// Expands a rule inline if it's only used once (rule utility constraint).
    pub(crate) fn expand_rule_if_necessary(&mut self, potential_rule: DefaultKey) {
        if !self.symbols.contains_key(potential_rule) {
            return;
        }
        let Symbol::RuleRef { rule_id } = self.symbols[potential_rule].symbol else {
            return;
        };
        let Some(&rule_head) = self.rule_index.get(&rule_id) else {
            return;
        };

        let (count, rule_tail) = match self.symbols[rule_head].symbol {
            Symbol::RuleHead { count, tail, .. } => (count, tail),
            _ => unreachable!(),
        };
        debug_assert!(count > 0, "Rule count should never be 0");

        if count != 1 {
            return;
        }

        let rule_first = self.symbols[rule_head]
            .next
            .expect("RuleHead should have next");
        let rule_last = self.symbols[rule_tail]
            .prev
            .expect("RuleTail should have prev");

        let before_rule = self.symbols[potential_rule]
            .prev
            .expect("rule reference has a predecessor");
        let after_rule = self.symbols[potential_rule]
            .next
            .expect("rule reference has a successor");

        self.remove_digram_from_index(potential_rule);

        self.rule_index.remove(&rule_id);
        self.id_gen.retire(rule_id);

        // Splice the body in place of the reference.
        self.join(before_rule, rule_first);
        self.join(rule_last, after_rule);

        self.symbols.remove(rule_head);
        self.symbols.remove(rule_tail);
        self.symbols.remove(potential_rule);

        tracing::trace!(rule_id, "rule inlined");

        if !self.symbols[before_rule].symbol.is_head() {
            self.check(before_rule);
        }

        if self.symbols.contains_key(rule_last) {
            if let Some(after) = self.symbols[rule_last].next {
                if !self.symbols[after].symbol.is_tail() {
                    self.check(rule_last);
                }
            }
        }
    }

    /// Checks the two links around a freshly inserted RuleRef.
    #[inline]
    pub(crate) fn check_new_links(&mut self, rule_key: DefaultKey) {
        if !self.symbols.contains_key(rule_key) {
            return;
        }

        if let Some(prev) = self.symbols[rule_key].prev {
            if !self.symbols[prev].symbol.is_head() {
                self.check(prev);
            }
        }

        // The reference itself may have been folded into another rule.
        if !self.symbols.contains_key(rule_key) {
            return;
        }

        if let Some(next) = self.symbols[rule_key].next {
            if !self.symbols[next].symbol.is_tail() {
                self.check(rule_key);
            }
        }
    }

    // ========================================================================
    // Reference counts
    // ========================================================================

    /// Increments the count of a rule if the symbol is a RuleRef.
    #[inline]
    pub(crate) fn increment_if_rule(&mut self, key: DefaultKey) {
        if let Symbol::RuleRef { rule_id } = self.symbols[key].symbol {
            if let Some(&head_key) = self.rule_index.get(&rule_id) {
                self.increment_rule_count(head_key);
            }
        }
    }

    /// Decrements the count of a rule if the symbol is a RuleRef.
    #[inline]
    pub(crate) fn decrement_if_rule(&mut self, key: DefaultKey) {
        if let Symbol::RuleRef { rule_id } = self.symbols[key].symbol {
            if let Some(&head_key) = self.rule_index.get(&rule_id) {
                self.decrement_rule_count(head_key);
            }
        }
    }

    #[inline]
    fn increment_rule_count(&mut self, head_key: DefaultKey) {
        if let Symbol::RuleHead { count, .. } = &mut self.symbols[head_key].symbol {
            *count += 1;
        }
    }

    #[inline]
    fn decrement_rule_count(&mut self, head_key: DefaultKey) {
        if let Symbol::RuleHead { count, .. } = &mut self.symbols[head_key].symbol {
            assert!(*count > 0, "Cannot decrement count below 0");
            *count -= 1;
        }
    }

    /// Reference count of the rule whose head is `head_key`.
    pub(crate) fn rule_count(&self, head_key: DefaultKey) -> u32 {
        match self.symbols[head_key].symbol {
            Symbol::RuleHead { count, .. } => count,
            _ => 0,
        }
    }
}
