//! Indexes of SAX words to the window positions that produced them.

use ahash::AHashMap as HashMap;

/// Which index backs the classic search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WordIndexKind {
    /// Fixed-depth trie keyed on letters.
    #[default]
    Trie,
    Hash,
}

/// Word → positions lookup used to order classic search candidates.
pub(crate) trait WordIndex {
    fn insert(&mut self, word: &str, position: usize);

    /// Positions that produced `word`, in insertion order.
    fn occurrences(&self, word: &str) -> &[usize];

    /// Position lists of every distinct word.
    fn buckets(&self) -> Vec<&[usize]>;
}

pub(crate) fn build_index(kind: WordIndexKind, words: &[String]) -> Box<dyn WordIndex> {
    let mut index: Box<dyn WordIndex> = match kind {
        WordIndexKind::Trie => Box::new(WordTrie::default()),
        WordIndexKind::Hash => Box::new(WordTable::default()),
    };
    for (position, word) in words.iter().enumerate() {
        index.insert(word, position);
    }
    index
}

/// Candidate positions ordered rarest word first; words of equal frequency
/// are ordered by their first position, positions within a word ascending.
pub(crate) fn rarest_first(index: &dyn WordIndex) -> Vec<usize> {
    let mut buckets = index.buckets();
    buckets.sort_by_key(|positions| (positions.len(), positions.first().copied()));
    buckets.into_iter().flatten().copied().collect()
}

#[derive(Debug, Default)]
struct TrieNode {
    /// Children keyed by letter, kept sorted.
    children: Vec<(u8, usize)>,
    positions: Vec<usize>,
}

/// Arena-backed trie; node 0 is the root and leaves hold positions.
#[derive(Debug)]
pub(crate) struct WordTrie {
    nodes: Vec<TrieNode>,
}

impl Default for WordTrie {
    fn default() -> Self {
        Self {
            nodes: vec![TrieNode::default()],
        }
    }
}

impl WordTrie {
    fn child(&self, node: usize, letter: u8) -> Option<usize> {
        let children = &self.nodes[node].children;
        children
            .binary_search_by_key(&letter, |&(l, _)| l)
            .ok()
            .map(|idx| children[idx].1)
    }

    fn find(&self, word: &str) -> Option<usize> {
        word.bytes()
            .try_fold(0, |node, letter| self.child(node, letter))
    }
}

impl WordIndex for WordTrie {
    fn insert(&mut self, word: &str, position: usize) {
        let mut node = 0;
        for letter in word.bytes() {
            node = match self.nodes[node]
                .children
                .binary_search_by_key(&letter, |&(l, _)| l)
            {
                Ok(idx) => self.nodes[node].children[idx].1,
                Err(idx) => {
                    let next = self.nodes.len();
                    self.nodes.push(TrieNode::default());
                    self.nodes[node].children.insert(idx, (letter, next));
                    next
                }
            };
        }
        self.nodes[node].positions.push(position);
    }

    fn occurrences(&self, word: &str) -> &[usize] {
        self.find(word)
            .map(|node| self.nodes[node].positions.as_slice())
            .unwrap_or(&[])
    }

    fn buckets(&self) -> Vec<&[usize]> {
        self.nodes
            .iter()
            .filter(|n| !n.positions.is_empty())
            .map(|n| n.positions.as_slice())
            .collect()
    }
}

/// Hash-map index.
#[derive(Debug, Default)]
pub(crate) struct WordTable {
    table: HashMap<String, Vec<usize>>,
}

impl WordIndex for WordTable {
    fn insert(&mut self, word: &str, position: usize) {
        self.table.entry(word.to_owned()).or_default().push(position);
    }

    fn occurrences(&self, word: &str) -> &[usize] {
        self.table.get(word).map(Vec::as_slice).unwrap_or(&[])
    }

    fn buckets(&self) -> Vec<&[usize]> {
        self.table.values().map(Vec::as_slice).collect()
    }
}
