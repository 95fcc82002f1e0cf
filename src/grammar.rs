//! The rule table handed out once induction is done.
//!
//! A [`Grammar`] is an immutable snapshot: rules ordered by id, each with its
//! body, reference count, occurrence starts in the original stream, yield and
//! level. It is what [`map_intervals`](crate::map_intervals) consumes.

use crate::engine::GrammarEngine;
use crate::error::Result;
use crate::sax::SymbolStream;
use ahash::AHashMap as HashMap;
use std::fmt::{self, Display};

/// One symbol of a rule body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrammarSymbol {
    /// Index into [`Grammar::terminal`].
    Terminal(u32),
    /// Reference to another rule by id.
    NonTerminal(u32),
}

/// Raw rule data collected from the engine before derived fields are computed.
pub(crate) struct RuleParts {
    pub id: u32,
    pub body: Vec<GrammarSymbol>,
    pub use_count: u32,
    pub occurrences: Vec<usize>,
}

/// A rule of the final grammar.
#[derive(Debug, Clone)]
pub struct GrammarRule {
    /// Rule id; 0 is the top-level rule.
    pub id: u32,
    /// Right-hand side.
    pub body: Vec<GrammarSymbol>,
    /// Number of references to this rule from rule bodies (0 for rule 0).
    pub use_count: u32,
    /// Start index in the symbol stream of every occurrence of the rule's
    /// expansion, in stream order.
    pub occurrences: Vec<usize>,
    /// Number of terminals in the full expansion.
    pub yield_len: usize,
    /// 1 + the deepest level among referenced rules; terminals are level 0.
    pub level: usize,
}

/// Rule table produced by [`GrammarEngine::grammar`].
#[derive(Debug, Clone)]
pub struct Grammar<T> {
    rules: Vec<GrammarRule>,
    terminals: Vec<T>,
    input_len: usize,
}

impl<T> Grammar<T> {
    pub(crate) fn from_parts(parts: Vec<RuleParts>, terminals: Vec<T>, input_len: usize) -> Self {
        let bodies: HashMap<u32, &[GrammarSymbol]> =
            parts.iter().map(|p| (p.id, p.body.as_slice())).collect();
        let mut derived: HashMap<u32, (usize, usize)> = HashMap::default();
        for part in &parts {
            derive(part.id, &bodies, &mut derived);
        }

        let rules = parts
            .into_iter()
            .map(|part| {
                let (yield_len, level) = derived.get(&part.id).copied().unwrap_or((0, 0));
                GrammarRule {
                    id: part.id,
                    body: part.body,
                    use_count: part.use_count,
                    occurrences: part.occurrences,
                    yield_len,
                    level,
                }
            })
            .collect();

        Self {
            rules,
            terminals,
            input_len,
        }
    }

    /// Rules ordered by id; rule 0 comes first.
    pub fn rules(&self) -> &[GrammarRule] {
        &self.rules
    }

    /// Looks a rule up by id.
    pub fn rule(&self, id: u32) -> Option<&GrammarRule> {
        self.rules
            .binary_search_by_key(&id, |r| r.id)
            .ok()
            .map(|idx| &self.rules[idx])
    }

    /// Number of rules, rule 0 included.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Length of the symbol stream the grammar was induced from.
    pub fn input_len(&self) -> usize {
        self.input_len
    }

    pub fn terminal(&self, id: u32) -> &T {
        &self.terminals[id as usize]
    }

    /// Fully expands a rule down to terminals.
    pub fn expand(&self, id: u32) -> Vec<&T> {
        let mut out = Vec::new();
        if let Some(rule) = self.rule(id) {
            out.reserve(rule.yield_len);
            self.expand_into(rule, &mut out);
        }
        out
    }

    fn expand_into<'a>(&'a self, rule: &GrammarRule, out: &mut Vec<&'a T>) {
        for symbol in &rule.body {
            match *symbol {
                GrammarSymbol::Terminal(t) => out.push(self.terminal(t)),
                GrammarSymbol::NonTerminal(child) => {
                    let child = self.rule(child).expect("grammar references live rules");
                    self.expand_into(child, out);
                }
            }
        }
    }
}

impl<T: Display> Grammar<T> {
    /// Body rendered with `R<id>` for rule references, e.g. `R1 c`.
    pub fn rule_string(&self, id: u32) -> String {
        let Some(rule) = self.rule(id) else {
            return String::new();
        };
        let parts: Vec<String> = rule
            .body
            .iter()
            .map(|symbol| match *symbol {
                GrammarSymbol::Terminal(t) => self.terminal(t).to_string(),
                GrammarSymbol::NonTerminal(r) => format!("R{r}"),
            })
            .collect();
        parts.join(" ")
    }

    /// Expansion rendered as space-separated terminals, e.g. `a b c`.
    pub fn expanded_string(&self, id: u32) -> String {
        let parts: Vec<String> = self.expand(id).iter().map(|t| t.to_string()).collect();
        parts.join(" ")
    }
}

impl<T: Display> Display for Grammar<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in &self.rules {
            writeln!(f, "R{} -> {}", rule.id, self.rule_string(rule.id))?;
        }
        Ok(())
    }
}

/// Computes (yield, level) for `id`, memoized.
fn derive(
    id: u32,
    bodies: &HashMap<u32, &[GrammarSymbol]>,
    memo: &mut HashMap<u32, (usize, usize)>,
) -> (usize, usize) {
    if let Some(&done) = memo.get(&id) {
        return done;
    }
    let mut yield_len = 0;
    let mut child_level = 0;
    for symbol in bodies.get(&id).copied().unwrap_or(&[]) {
        match *symbol {
            GrammarSymbol::Terminal(_) => yield_len += 1,
            GrammarSymbol::NonTerminal(child) => {
                let (y, l) = derive(child, bodies, memo);
                yield_len += y;
                child_level = child_level.max(l);
            }
        }
    }
    let result = (yield_len, child_level + 1);
    memo.insert(id, result);
    result
}

/// Induces a grammar over the words of a symbol stream.
pub fn induce(stream: &SymbolStream) -> Result<Grammar<String>> {
    let mut engine = GrammarEngine::new();
    engine.extend(stream.words().iter().map(|w| w.word.clone()));
    let grammar = engine.finish()?;
    tracing::info!(
        rules = grammar.len(),
        input_len = grammar.input_len(),
        "grammar induced"
    );
    Ok(grammar)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sax::SymbolStream;

    fn grammar_of(text: &str) -> Grammar<String> {
        let stream = SymbolStream::from_tokens(text.split_whitespace());
        induce(&stream).unwrap()
    }

    #[test]
    fn test_literature_example() {
        let grammar = grammar_of("a b a b c a b c");

        // S -> R1 R2 R2, R1 -> a b, R2 -> R1 c
        assert_eq!(grammar.len(), 3);
        assert_eq!(grammar.rule_string(0), "R1 R2 R2");
        assert_eq!(grammar.rule_string(1), "a b");
        assert_eq!(grammar.rule_string(2), "R1 c");
        assert_eq!(grammar.expanded_string(2), "a b c");
        assert_eq!(grammar.expanded_string(0), "a b a b c a b c");
    }

    #[test]
    fn test_literature_example_statistics() {
        let grammar = grammar_of("a b a b c a b c");
        let r1 = grammar.rule(1).unwrap();
        let r2 = grammar.rule(2).unwrap();

        assert_eq!(r1.use_count, 2);
        assert_eq!(r1.occurrences, vec![0, 2, 5]);
        assert_eq!(r1.yield_len, 2);
        assert_eq!(r1.level, 1);

        assert_eq!(r2.use_count, 2);
        assert_eq!(r2.occurrences, vec![2, 5]);
        assert_eq!(r2.yield_len, 3);
        assert_eq!(r2.level, 2);

        let top = grammar.rule(0).unwrap();
        assert_eq!(top.yield_len, 8);
        assert_eq!(top.level, 3);
        assert_eq!(top.occurrences, vec![0]);
    }

    #[test]
    fn test_occurrences_expand_to_stream_slices() {
        let text = "x y z x y z q x y z x y q q";
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let grammar = grammar_of(text);

        for rule in grammar.rules().iter().filter(|r| r.id != 0) {
            let expansion: Vec<&str> = grammar.expand(rule.id).iter().map(|s| s.as_str()).collect();
            for &start in &rule.occurrences {
                assert_eq!(&tokens[start..start + rule.yield_len], expansion.as_slice());
            }
        }
    }

    #[test]
    fn test_missing_rule() {
        let grammar = grammar_of("a b c");
        assert!(grammar.rule(7).is_none());
        assert!(grammar.expand(7).is_empty());
        assert_eq!(grammar.rule_string(7), "");
    }

    #[test]
    fn test_display_lists_rules() {
        let grammar = grammar_of("a b a b");
        let text = grammar.to_string();
        assert_eq!(text, "R0 -> R1 R1\nR1 -> a b\n");
    }
}
