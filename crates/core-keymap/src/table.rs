//! Mode-scoped map table: one trie per [`ModeScope`], held in a fixed array.
//!
//! Lookup for an active [`Mode`] consults that mode's table first and falls
//! back to the `All` table only when the mode table knows nothing about the
//! candidate (no exact match and no longer entry sharing the prefix). Mode
//! bindings therefore shadow `All` bindings, never the reverse.

use core_events::{KeySequence, KeyStroke};
use tracing::{debug, warn};

use crate::scope::{Mode, ModeScope};
use crate::trie::{KeyTrie, TrieMatch};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    pub source: KeySequence,
    pub target: KeySequence,
    /// `:map` (true) re-examines the target for further mappings;
    /// `:noremap` (false) replays it literally.
    pub recursive: bool,
    pub scope: ModeScope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    Exact(&'a MapEntry),
    /// One or more longer entries share this prefix.
    Prefix,
    None,
}

#[derive(Debug, Clone, Default)]
pub struct MapTable {
    tables: [KeyTrie<MapEntry>; ModeScope::COUNT],
}

impl MapTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or silently overwrite the entry for `source` in `scope`.
    /// Returns the entry it replaced, if any. An empty `source` names no
    /// key and is ignored (nothing stored, `None` returned); callers that
    /// need to report it check `source.is_empty()` first.
    pub fn define(
        &mut self,
        scope: ModeScope,
        source: KeySequence,
        target: KeySequence,
        recursive: bool,
    ) -> Option<MapEntry> {
        if source.is_empty() {
            warn!(target: "keymap.table", scope = ?scope, "define_empty_source_ignored");
            return None;
        }
        debug!(
            target: "keymap.table",
            scope = ?scope,
            source = %source,
            target_keys = %target,
            recursive,
            "define"
        );
        let keys = source.clone();
        let entry = MapEntry {
            source,
            target,
            recursive,
            scope,
        };
        self.tables[scope.index()].insert(&keys, entry)
    }

    pub fn remove(&mut self, scope: ModeScope, source: &[KeyStroke]) -> Option<MapEntry> {
        let removed = self.tables[scope.index()].remove(source);
        debug!(
            target: "keymap.table",
            scope = ?scope,
            found = removed.is_some(),
            "remove"
        );
        removed
    }

    pub fn clear(&mut self, scope: ModeScope) {
        let table = &mut self.tables[scope.index()];
        debug!(target: "keymap.table", scope = ?scope, dropped = table.len(), "clear");
        table.clear();
    }

    pub fn is_empty(&self, scope: ModeScope) -> bool {
        self.tables[scope.index()].is_empty()
    }

    pub fn len(&self, scope: ModeScope) -> usize {
        self.tables[scope.index()].len()
    }

    /// Lookup within exactly one scope, without fallback.
    pub fn lookup_scope(&self, scope: ModeScope, candidate: &[KeyStroke]) -> Lookup<'_> {
        match self.tables[scope.index()].resolve(candidate) {
            TrieMatch::Exact { value, ambiguous } => {
                if ambiguous {
                    // Exact wins immediately; longer entries become unreachable via this prefix.
                    debug!(target: "keymap.table", scope = ?scope, source = %value.source, "exact_shadows_longer");
                }
                Lookup::Exact(value)
            }
            TrieMatch::Prefix => Lookup::Prefix,
            TrieMatch::None => Lookup::None,
        }
    }

    /// Lookup for an active mode, falling back to the `All` scope when the
    /// mode's own table yields no match of any kind.
    pub fn lookup(&self, mode: Mode, candidate: &[KeyStroke]) -> Lookup<'_> {
        match self.lookup_scope(mode.into(), candidate) {
            Lookup::None if ModeScope::all_covers(mode) => {
                self.lookup_scope(ModeScope::All, candidate)
            }
            found => found,
        }
    }

    /// Longest strict prefix of `candidate` that resolves to an entry for
    /// `mode` (with the same fallback rule as [`MapTable::lookup`]).
    pub fn longest_strict_prefix(
        &self,
        mode: Mode,
        candidate: &[KeyStroke],
    ) -> Option<(usize, &MapEntry)> {
        (1..candidate.len())
            .rev()
            .find_map(|len| match self.lookup(mode, &candidate[..len]) {
                Lookup::Exact(entry) => Some((len, entry)),
                _ => None,
            })
    }

    /// Entries of one scope ordered by source notation.
    pub fn entries(&self, scope: ModeScope) -> Vec<&MapEntry> {
        let mut out: Vec<&MapEntry> = self.tables[scope.index()]
            .entries()
            .into_iter()
            .map(|(_, entry)| entry)
            .collect();
        out.sort_by_cached_key(|e| e.source.to_string());
        out
    }
}
