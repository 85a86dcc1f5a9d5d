//! core-actions: key remapping engine.
//!
//! Keys flow through two layers. The [`Engine`] matches them against the
//! user's `:map` tables (expanding, backtracking, detecting loops) and hands
//! whatever survives, key by key, to a [`CommandState`] that composes counts,
//! registers and operators into [`Resolved`] commands using a host-supplied
//! [`CommandLookup`]. [`VimBindings`] is a ready-made lookup with the usual vi
//! vocabulary.

pub mod binding;
pub mod builtin;
pub mod composer;
pub mod engine;
pub mod error;
pub mod ex;
pub mod observer;

pub use binding::{Binding, CommandLookup};
pub use builtin::{
    Action, EditKind, ModeChange, MotionKind, OperatorKind, TextObjectKind, VimBindings,
};
pub use composer::{CommandState, Composed, MapContext, Resolved};
pub use engine::{
    DEFAULT_MAX_MAP_DEPTH, Engine, EngineOptions, FeedResult, Outcome, PendingState,
};
pub use error::{MapDefinitionSyntaxError, RecursiveMapLoopError, RemapError};
pub use ex::{CommandParser, ExOutcome, ParsedCommand};
pub use observer::EngineObserver;
