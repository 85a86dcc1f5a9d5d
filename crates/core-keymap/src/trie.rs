// -------------------------------------------------------------------------------------------------
// Key trie: shared by the user map tables and the built-in binding tables.
// -------------------------------------------------------------------------------------------------
// Nodes live in a flat arena for cache locality; each edge is one keystroke. Removal prunes
// branches that no longer lead to a terminal so `Prefix` answers stay exact. Pruned nodes are
// left orphaned in the arena until the next `clear`.
// -------------------------------------------------------------------------------------------------

use core_events::{KeySequence, KeyStroke};
use smallvec::SmallVec;
use tracing::trace;

#[derive(Debug, Clone)]
struct Edge {
    key: KeyStroke,
    next: usize,
}

#[derive(Debug, Clone)]
struct Node<V> {
    terminal: Option<V>,
    edges: SmallVec<[Edge; 4]>,
}

impl<V> Node<V> {
    fn new() -> Self {
        Self {
            terminal: None,
            edges: SmallVec::new(),
        }
    }

    fn child(&self, key: &KeyStroke) -> Option<usize> {
        self.edges.iter().find(|e| e.key == *key).map(|e| e.next)
    }
}

/// Outcome of matching a candidate sequence against a trie.
#[derive(Debug, PartialEq, Eq)]
pub enum TrieMatch<'a, V> {
    /// The whole candidate is a terminal. `ambiguous` is set when longer
    /// terminals also extend it.
    Exact { value: &'a V, ambiguous: bool },
    /// The candidate is a strict prefix of at least one terminal.
    Prefix,
    None,
}

#[derive(Debug, Clone)]
pub struct KeyTrie<V> {
    nodes: Vec<Node<V>>,
    len: usize,
}

impl<V> Default for KeyTrie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> KeyTrie<V> {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new()],
            len: 0,
        }
    }

    pub fn build<I>(specs: I) -> Self
    where
        I: IntoIterator<Item = (KeySequence, V)>,
    {
        let mut trie = Self::new();
        for (keys, value) in specs {
            if trie.insert(&keys, value).is_some() {
                // Later definition overrides earlier.
                trace!(target: "input.map", keys = %keys, "terminal_override");
            }
        }
        trie
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert or overwrite; returns the displaced value. Empty sequences are
    /// never stored.
    pub fn insert(&mut self, keys: &[KeyStroke], value: V) -> Option<V> {
        if keys.is_empty() {
            return None;
        }
        let mut cur = 0usize;
        for key in keys {
            cur = match self.nodes[cur].child(key) {
                Some(next) => next,
                None => {
                    let new_idx = self.nodes.len();
                    self.nodes.push(Node::new());
                    self.nodes[cur].edges.push(Edge {
                        key: *key,
                        next: new_idx,
                    });
                    new_idx
                }
            };
        }
        let prev = self.nodes[cur].terminal.replace(value);
        if prev.is_none() {
            self.len += 1;
        }
        prev
    }

    pub fn remove(&mut self, keys: &[KeyStroke]) -> Option<V> {
        let mut path: SmallVec<[usize; 8]> = SmallVec::new();
        let mut cur = 0usize;
        path.push(cur);
        for key in keys {
            cur = self.nodes[cur].child(key)?;
            path.push(cur);
        }
        let removed = self.nodes[cur].terminal.take()?;
        self.len -= 1;
        // Prune dead branches bottom-up.
        for depth in (1..path.len()).rev() {
            let node = path[depth];
            if self.nodes[node].terminal.is_some() || !self.nodes[node].edges.is_empty() {
                break;
            }
            let parent = path[depth - 1];
            self.nodes[parent].edges.retain(|e| e.next != node);
        }
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.nodes.push(Node::new());
        self.len = 0;
    }

    fn walk(&self, keys: &[KeyStroke]) -> Option<usize> {
        let mut node_idx = 0usize;
        for (i, key) in keys.iter().enumerate() {
            node_idx = self.nodes[node_idx].child(key)?;
            trace!(target: "input.map", step = i, key = %key, node = node_idx, "advance");
        }
        Some(node_idx)
    }

    pub fn get(&self, keys: &[KeyStroke]) -> Option<&V> {
        self.walk(keys)
            .and_then(|idx| self.nodes[idx].terminal.as_ref())
    }

    pub fn resolve(&self, keys: &[KeyStroke]) -> TrieMatch<'_, V> {
        let Some(idx) = self.walk(keys) else {
            return TrieMatch::None;
        };
        let node = &self.nodes[idx];
        match &node.terminal {
            Some(value) if !keys.is_empty() => TrieMatch::Exact {
                value,
                ambiguous: !node.edges.is_empty(),
            },
            _ if !node.edges.is_empty() => TrieMatch::Prefix,
            _ => TrieMatch::None,
        }
    }

    /// Longest terminal that is a strict prefix of `keys`, as
    /// `(consumed, value)`.
    pub fn longest_strict_prefix(&self, keys: &[KeyStroke]) -> Option<(usize, &V)> {
        let mut node_idx = 0usize;
        let mut last_terminal = None;
        for (i, key) in keys.iter().enumerate().take(keys.len().saturating_sub(1)) {
            let Some(next) = self.nodes[node_idx].child(key) else {
                break;
            };
            node_idx = next;
            if let Some(value) = &self.nodes[node_idx].terminal {
                last_terminal = Some((i + 1, value));
            }
        }
        last_terminal
    }

    /// All stored `(sequence, value)` pairs, depth-first in insertion order of edges.
    pub fn entries(&self) -> Vec<(KeySequence, &V)> {
        let mut out = Vec::with_capacity(self.len);
        let mut stack: Vec<(usize, KeySequence)> = vec![(0, KeySequence::new())];
        while let Some((idx, prefix)) = stack.pop() {
            let node = &self.nodes[idx];
            if let Some(value) = &node.terminal {
                out.push((prefix.clone(), value));
            }
            for edge in node.edges.iter().rev() {
                let mut next = prefix.clone();
                next.push(edge.key);
                stack.push((edge.next, next));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn seq(text: &str) -> KeySequence {
        KeySequence::parse(text).unwrap()
    }

    #[test]
    fn single_key_match() {
        let trie = KeyTrie::build([(seq("w"), 1)]);
        assert_eq!(
            trie.resolve(&seq("w")),
            TrieMatch::Exact {
                value: &1,
                ambiguous: false
            }
        );
    }

    #[test]
    fn prefix_for_partial_sequence() {
        let trie = KeyTrie::build([(seq("gr"), 1)]);
        assert_eq!(trie.resolve(&seq("g")), TrieMatch::Prefix);
        assert_eq!(trie.resolve(&seq("gg")), TrieMatch::None);
        assert_eq!(trie.resolve(&seq("x")), TrieMatch::None);
    }

    #[test]
    fn exact_with_longer_extension_is_ambiguous() {
        let trie = KeyTrie::build([(seq("d"), 1), (seq("dx"), 2)]);
        assert_eq!(
            trie.resolve(&seq("d")),
            TrieMatch::Exact {
                value: &1,
                ambiguous: true
            }
        );
    }

    #[test]
    fn later_insert_overrides() {
        let mut trie = KeyTrie::new();
        assert_eq!(trie.insert(&seq("dd"), 1), None);
        assert_eq!(trie.insert(&seq("dd"), 2), Some(1));
        assert_eq!(trie.get(&seq("dd")), Some(&2));
        assert_eq!(trie.len(), 1);
    }

    #[test]
    fn remove_prunes_dead_prefixes() {
        let mut trie = KeyTrie::build([(seq("abc"), 1), (seq("x"), 2)]);
        assert_eq!(trie.resolve(&seq("ab")), TrieMatch::Prefix);
        assert_eq!(trie.remove(&seq("abc")), Some(1));
        assert_eq!(trie.resolve(&seq("a")), TrieMatch::None);
        assert_eq!(trie.resolve(&seq("ab")), TrieMatch::None);
        assert_eq!(trie.len(), 1);
        assert_eq!(trie.remove(&seq("abc")), None);
    }

    #[test]
    fn remove_keeps_shared_branch() {
        let mut trie = KeyTrie::build([(seq("ab"), 1), (seq("ac"), 2)]);
        trie.remove(&seq("ab"));
        assert_eq!(trie.resolve(&seq("a")), TrieMatch::Prefix);
        assert_eq!(trie.get(&seq("ac")), Some(&2));
    }

    #[test]
    fn longest_strict_prefix_skips_full_match() {
        let trie = KeyTrie::build([(seq("j"), 1), (seq("jk"), 2), (seq("jkl"), 3)]);
        assert_eq!(trie.longest_strict_prefix(&seq("jkl")), Some((2, &2)));
        assert_eq!(trie.longest_strict_prefix(&seq("jkx")), Some((2, &2)));
        assert_eq!(trie.longest_strict_prefix(&seq("j")), None);
        assert_eq!(trie.longest_strict_prefix(&seq("xj")), None);
    }

    #[test]
    fn entries_lists_everything() {
        let trie = KeyTrie::build([(seq("b"), 2), (seq("a"), 1), (seq("ab"), 3)]);
        let mut got: Vec<(String, i32)> = trie
            .entries()
            .into_iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();
        got.sort();
        assert_eq!(
            got,
            vec![("a".into(), 1), ("ab".into(), 3), ("b".into(), 2)]
        );
    }
}
