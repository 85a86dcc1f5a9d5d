use core_events::{KeyNotationError, KeySequence};
use thiserror::Error;

/// Rejected `:map`-family command text. The map table is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapDefinitionSyntaxError {
    #[error("not a mapping command: {0}")]
    UnknownCommand(String),
    #[error(":{command}: missing key sequence")]
    MissingSource { command: String },
    #[error(":{command}: missing target for {keys}")]
    MissingTarget { command: String, keys: String },
    #[error(":{command}: trailing characters: {extra}")]
    TrailingCharacters { command: String, extra: String },
    #[error(":{command}: no such mapping: {keys}")]
    NoSuchMapping { command: String, keys: String },
    #[error(transparent)]
    Notation(#[from] KeyNotationError),
}

/// Recursive expansion revisited a source already being expanded (or the
/// expansion chain outgrew the configured depth backstop).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("recursive mapping loop on {sequence} (chain: {})", display_chain(.chain))]
pub struct RecursiveMapLoopError {
    pub sequence: KeySequence,
    /// Sources being expanded when the loop was detected, outermost first.
    pub chain: Vec<KeySequence>,
    pub depth_exceeded: bool,
}

fn display_chain(chain: &[KeySequence]) -> String {
    chain
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemapError {
    #[error(transparent)]
    Loop(#[from] RecursiveMapLoopError),
    #[error(transparent)]
    Definition(#[from] MapDefinitionSyntaxError),
    #[error(transparent)]
    Notation(#[from] KeyNotationError),
}
