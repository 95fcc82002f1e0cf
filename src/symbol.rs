use slotmap::DefaultKey;

/// Symbol types in the induced grammar.
///
/// Terminals are stored as interned ids so symbols stay `Copy` and digram keys
/// can be compared exactly.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Symbol {
    /// A terminal symbol: index into the engine's interned values.
    Value(u32),

    /// A reference to a rule (non-terminal).
    RuleRef { rule_id: u32 },

    /// Marks the beginning of a rule body. `count` is the number of
    /// `RuleRef`s pointing at this rule.
    RuleHead {
        rule_id: u32,
        count: u32,
        tail: DefaultKey,
    },

    /// Marks the end of a rule body.
    RuleTail,
}

/// Identity of a symbol as seen by the digram index.
///
/// Sentinels have no identity and never take part in a digram.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub(crate) enum SymbolId {
    Terminal(u32),
    Rule(u32),
}

/// Key of the digram index: two adjacent symbol identities.
pub(crate) type DigramKey = (SymbolId, SymbolId);

impl Symbol {
    pub(crate) fn id(&self) -> Option<SymbolId> {
        match *self {
            Symbol::Value(v) => Some(SymbolId::Terminal(v)),
            Symbol::RuleRef { rule_id } => Some(SymbolId::Rule(rule_id)),
            Symbol::RuleHead { .. } | Symbol::RuleTail => None,
        }
    }

    /// Copies a body symbol into a freshly created rule.
    ///
    /// Sentinels are never copied; callers only pass digram members.
    pub(crate) fn clone_symbol(&self) -> Symbol {
        debug_assert!(self.id().is_some(), "sentinels are not rule content");
        *self
    }

    #[inline(always)]
    pub(crate) fn is_head(&self) -> bool {
        matches!(self, Symbol::RuleHead { .. })
    }

    #[inline(always)]
    pub(crate) fn is_tail(&self) -> bool {
        matches!(self, Symbol::RuleTail)
    }
}

/// A node in the doubly-linked list of symbols.
#[derive(Debug)]
pub(crate) struct SymbolNode {
    pub symbol: Symbol,
    pub prev: Option<DefaultKey>,
    pub next: Option<DefaultKey>,
}

impl SymbolNode {
    pub(crate) fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            prev: None,
            next: None,
        }
    }
}
