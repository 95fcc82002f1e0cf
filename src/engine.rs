use crate::error::{Error, Result};
use crate::grammar::{Grammar, GrammarSymbol, RuleParts};
use crate::id_gen::IdGenerator;
use crate::symbol::{DigramKey, Symbol, SymbolNode};
use ahash::AHashMap as HashMap;
use slotmap::{DefaultKey, SlotMap};
use std::hash::Hash;

/// Online grammar induction engine (Sequitur).
///
/// Maintains a context-free grammar over the symbols ingested so far while
/// enforcing two constraints between ingested symbols:
/// 1. Digram Uniqueness: No digram appears more than once
/// 2. Rule Utility: Every rule except rule 0 is used at least twice
///
/// Symbols and rule frames live in a slot-map arena; every cross reference is
/// a key into it. All state belongs to the instance, so independent engines
/// can run side by side.
pub struct GrammarEngine<T> {
    /// Storage for all symbols using generational indices
    pub(crate) symbols: SlotMap<DefaultKey, SymbolNode>,

    /// Maps digrams to the location of their registered occurrence
    pub(crate) digram_index: HashMap<DigramKey, DefaultKey>,

    /// Maps rule IDs to their RuleHead keys
    pub(crate) rule_index: HashMap<u32, DefaultKey>,

    pub(crate) id_gen: IdGenerator,

    /// Interned terminal values, indexed by `Symbol::Value`
    values: Vec<T>,
    value_ids: HashMap<T, u32>,

    /// Key to the RuleHead of Rule 0 (main sequence)
    pub(crate) top_head: DefaultKey,

    /// Key to the RuleTail of Rule 0 (main sequence)
    pub(crate) sequence_end: DefaultKey,

    /// Number of values added
    length: usize,
}

impl<T: Hash + Eq + Clone> GrammarEngine<T> {
    /// Creates a new empty engine.
    ///
    /// Initializes with Rule 0 (the main sequence).
    pub fn new() -> Self {
        let mut engine = Self {
            symbols: SlotMap::new(),
            digram_index: HashMap::default(),
            rule_index: HashMap::default(),
            id_gen: IdGenerator::new(),
            values: Vec::new(),
            value_ids: HashMap::default(),
            top_head: DefaultKey::default(),
            sequence_end: DefaultKey::default(),
            length: 0,
        };
        engine.install_top_rule();
        engine
    }

    fn install_top_rule(&mut self) {
        let rule_id = self.id_gen.get();
        assert_eq!(rule_id, 0, "First rule should have ID 0");
        let (head, tail) = self.new_rule_frame(rule_id);
        self.top_head = head;
        self.sequence_end = tail;
    }

    /// Starts a new induction run.
    ///
    /// Drops every symbol, rule, digram and interned value in one step and
    /// restarts rule numbering, leaving the engine as if just constructed.
    pub fn clear(&mut self) {
        self.symbols.clear();
        self.digram_index.clear();
        self.rule_index.clear();
        self.id_gen.reset();
        self.values.clear();
        self.value_ids.clear();
        self.length = 0;
        self.install_top_rule();
    }

    /// Appends a value to rule 0 and restores both grammar constraints.
    pub fn ingest(&mut self, value: T) {
        let value_id = self.intern(value);
        let new_key = self
            .symbols
            .insert(SymbolNode::new(Symbol::Value(value_id)));

        let last = self.symbols[self.sequence_end]
            .prev
            .expect("rule 0 tail always has a predecessor");
        self.insert_after(last, new_key);
        self.length += 1;

        if !self.symbols[last].symbol.is_head() {
            self.check(last);
        }
    }

    /// Ingests every value of `iter` in order.
    pub fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.ingest(value);
        }
    }

    fn intern(&mut self, value: T) -> u32 {
        if let Some(&id) = self.value_ids.get(&value) {
            return id;
        }
        let id = self.values.len() as u32;
        self.values.push(value.clone());
        self.value_ids.insert(value, id);
        id
    }

    pub(crate) fn value(&self, id: u32) -> &T {
        &self.values[id as usize]
    }

    /// Returns the number of values ingested.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Returns true if no values have been ingested.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Number of live rules, rule 0 included.
    pub fn rule_count_total(&self) -> usize {
        self.rule_index.len()
    }

    /// Returns compression statistics.
    pub fn stats(&self) -> CompressionStats {
        let mut total_symbols = 0;

        for &head_key in self.rule_index.values() {
            let mut current = self.symbols[head_key].next;
            while let Some(key) = current {
                if self.symbols[key].symbol.is_tail() {
                    break;
                }
                total_symbols += 1;
                current = self.symbols[key].next;
            }
        }

        CompressionStats {
            input_length: self.length,
            grammar_symbols: total_symbols,
            num_rules: self.rule_index.len(),
            retired_rules: self.id_gen.retired(),
        }
    }

    /// Body symbols of the rule headed by `head`, in order.
    pub(crate) fn body_keys(&self, head: DefaultKey) -> Vec<DefaultKey> {
        let mut keys = Vec::new();
        let mut current = self.symbols[head].next;
        while let Some(key) = current {
            if self.symbols[key].symbol.is_tail() {
                break;
            }
            keys.push(key);
            current = self.symbols[key].next;
        }
        keys
    }

    /// Audits the grammar: rule utility, reference counts and digram
    /// uniqueness. Overlapping repeats inside a run (`a a a`) count once.
    pub fn check_invariants(&self) -> Result<()> {
        let mut references: HashMap<u32, u32> = HashMap::default();
        let mut digrams: HashMap<DigramKey, (u32, usize)> = HashMap::default();

        for (&rule_id, &head) in self.rule_index.iter() {
            let body = self.body_keys(head);
            if rule_id != 0 && body.len() < 2 {
                return Err(Error::invariant(format!(
                    "rule {rule_id} has a body of {} symbols",
                    body.len()
                )));
            }

            for (idx, &key) in body.iter().enumerate() {
                if let Symbol::RuleRef { rule_id: child } = self.symbols[key].symbol {
                    *references.entry(child).or_insert(0) += 1;
                }
                let Some(digram) = self.digram_key(key) else {
                    continue;
                };
                match digrams.get(&digram) {
                    None => {
                        digrams.insert(digram, (rule_id, idx));
                    }
                    Some(&(seen_rule, seen_idx)) => {
                        let overlapping = seen_rule == rule_id && idx - seen_idx < 2;
                        if !overlapping {
                            return Err(Error::invariant(format!(
                                "digram {digram:?} repeats in rules {seen_rule} and {rule_id}"
                            )));
                        }
                    }
                }
            }
        }

        for (&rule_id, &head) in self.rule_index.iter() {
            let count = self.rule_count(head);
            let found = references.get(&rule_id).copied().unwrap_or(0);
            if count != found {
                return Err(Error::invariant(format!(
                    "rule {rule_id} records {count} uses but {found} references exist"
                )));
            }
            if rule_id != 0 && count < 2 {
                return Err(Error::invariant(format!(
                    "rule {rule_id} is used {count} time(s)"
                )));
            }
        }

        for &child in references.keys() {
            if !self.rule_index.contains_key(&child) {
                return Err(Error::invariant(format!(
                    "reference to deleted rule {child}"
                )));
            }
        }

        Ok(())
    }

    /// Occurrence starts of every rule in the expansion of rule 0, as indices
    /// into the ingested stream.
    fn collect_occurrences(&self) -> HashMap<u32, Vec<usize>> {
        let mut occurrences: HashMap<u32, Vec<usize>> = HashMap::default();
        let mut cursor = 0usize;
        let mut stack: Vec<DefaultKey> = Vec::new();
        let mut current = self.symbols[self.top_head].next;

        while let Some(key) = current {
            current = match self.symbols[key].symbol {
                Symbol::Value(_) => {
                    cursor += 1;
                    self.symbols[key].next
                }
                Symbol::RuleRef { rule_id } => {
                    occurrences.entry(rule_id).or_default().push(cursor);
                    stack.push(key);
                    let head = *self
                        .rule_index
                        .get(&rule_id)
                        .expect("referenced rule exists");
                    self.symbols[head].next
                }
                Symbol::RuleTail => stack.pop().and_then(|parent| self.symbols[parent].next),
                Symbol::RuleHead { .. } => self.symbols[key].next,
            };
        }

        occurrences
    }

    /// Snapshot of the grammar induced from everything ingested so far.
    ///
    /// Fails with [`Error::InvariantViolation`] instead of returning a grammar
    /// from a corrupted engine.
    pub fn grammar(&self) -> Result<Grammar<T>> {
        self.check_invariants()?;

        let mut occurrences = self.collect_occurrences();
        let mut ids: Vec<u32> = self.rule_index.keys().copied().collect();
        ids.sort_unstable();

        let rules = ids
            .into_iter()
            .map(|rule_id| {
                let head = *self.rule_index.get(&rule_id).expect("listed rule exists");
                let body = self
                    .body_keys(head)
                    .into_iter()
                    .map(|key| match self.symbols[key].symbol {
                        Symbol::Value(v) => GrammarSymbol::Terminal(v),
                        Symbol::RuleRef { rule_id } => GrammarSymbol::NonTerminal(rule_id),
                        _ => unreachable!("body_keys stops at sentinels"),
                    })
                    .collect();
                let occurrences = if rule_id == 0 {
                    vec![0]
                } else {
                    occurrences.remove(&rule_id).unwrap_or_default()
                };
                RuleParts {
                    id: rule_id,
                    body,
                    use_count: self.rule_count(head),
                    occurrences,
                }
            })
            .collect();

        let grammar = Grammar::from_parts(rules, self.values.clone(), self.length);
        tracing::debug!(
            rules = grammar.len(),
            input_len = self.length,
            ids_issued = self.id_gen.issued(),
            "grammar snapshot taken"
        );
        Ok(grammar)
    }

    /// Consumes the engine and returns the final grammar.
    pub fn finish(self) -> Result<Grammar<T>> {
        self.grammar()
    }
}

/// Statistics about the compression.
#[derive(Debug, Clone, Copy)]
pub struct CompressionStats {
    /// Number of input symbols added
    pub input_length: usize,
    /// Total symbols in the grammar
    pub grammar_symbols: usize,
    /// Number of live rules
    pub num_rules: usize,
    /// Rules created and later inlined away
    pub retired_rules: usize,
}

impl CompressionStats {
    /// Returns the compression ratio as a percentage.
    pub fn compression_ratio(&self) -> f64 {
        if self.input_length == 0 {
            0.0
        } else {
            (self.grammar_symbols as f64 / self.input_length as f64) * 100.0
        }
    }
}

impl<T: Hash + Eq + Clone> Default for GrammarEngine<T> {
    fn default() -> Self {
        Self::new()
    }
}
