use crate::engine::GrammarEngine;
use crate::symbol::Symbol;
use slotmap::DefaultKey;
use std::hash::Hash;

/// Iterator that reconstructs the ingested sequence by expanding rules.
///
/// Uses a stack of rule references to return to after a body is exhausted.
pub struct ExpandIter<'a, T> {
    engine: &'a GrammarEngine<T>,
    current: Option<DefaultKey>,
    stack: Vec<DefaultKey>,
}

impl<'a, T: Hash + Eq + Clone> ExpandIter<'a, T> {
    pub(crate) fn new(engine: &'a GrammarEngine<T>) -> Self {
        let mut stack = Vec::new();
        let start = engine.symbols[engine.top_head].next;
        let current = start.and_then(|key| Self::resolve_forward(engine, key, &mut stack));

        Self {
            engine,
            current,
            stack,
        }
    }

    /// Walks forward from `key` to the next terminal, descending into rule
    /// bodies and climbing out of finished ones.
    fn resolve_forward(
        engine: &GrammarEngine<T>,
        mut key: DefaultKey,
        stack: &mut Vec<DefaultKey>,
    ) -> Option<DefaultKey> {
        loop {
            key = match engine.symbols[key].symbol {
                Symbol::Value(_) => return Some(key),
                Symbol::RuleRef { rule_id } => {
                    stack.push(key);
                    let rule_head = *engine.rule_index.get(&rule_id)?;
                    engine.symbols[rule_head].next?
                }
                Symbol::RuleHead { .. } => engine.symbols[key].next?,
                Symbol::RuleTail => {
                    let parent = stack.pop()?;
                    engine.symbols[parent].next?
                }
            };
        }
    }
}

impl<'a, T: Hash + Eq + Clone> Iterator for ExpandIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let current_key = self.current?;

        let value = match self.engine.symbols[current_key].symbol {
            Symbol::Value(v) => self.engine.value(v),
            _ => unreachable!("resolve_forward should only return Value symbols"),
        };

        self.current = self.engine.symbols[current_key]
            .next
            .and_then(|next| Self::resolve_forward(self.engine, next, &mut self.stack));

        Some(value)
    }
}

impl<T: Hash + Eq + Clone> GrammarEngine<T> {
    /// Returns an iterator over the expansion of rule 0.
    pub fn iter(&self) -> ExpandIter<'_, T> {
        ExpandIter::new(self)
    }
}

impl<'a, T: Hash + Eq + Clone> IntoIterator for &'a GrammarEngine<T> {
    type Item = &'a T;
    type IntoIter = ExpandIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
