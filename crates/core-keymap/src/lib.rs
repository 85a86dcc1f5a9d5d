//! core-keymap: mode-scoped remap tables and prefix context.
//!
//! Design principles:
//! - Pure and deterministic: a lookup depends only on the table contents and
//!   the candidate sequence; the engine re-reads tables on every keystroke.
//! - One compressed trie per scope, addressed through a fixed array keyed by
//!   [`ModeScope`], so mode shadowing and `All` fallback are explicit.
//! - Ambiguity surfaced as [`Lookup::Prefix`] when the candidate is a strict
//!   prefix of one or more sources and not a source itself.
//! - No side effects: logging only (`keymap.table` at DEBUG, `input.map`
//!   traversal at TRACE).

pub mod context;
pub mod scope;
pub mod table;
pub mod trie;

pub use context::{DEFAULT_MAX_COUNT, PendingContext, is_register_name};
pub use scope::{Mode, ModeScope};
pub use table::{Lookup, MapEntry, MapTable};
pub use trie::{KeyTrie, TrieMatch};
