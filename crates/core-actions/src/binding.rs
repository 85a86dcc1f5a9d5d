//! Collaborator seam between the remap engine and a host's command vocabulary.
//!
//! The engine owns counts, registers, operator pending state and map
//! expansion. It asks a [`CommandLookup`] only one question: what do these
//! literal keys mean in this mode?

use std::fmt;

use core_events::KeyStroke;
use core_keymap::Mode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding<C> {
    /// Complete command. `then` is the mode entered once it runs (`None`
    /// keeps the current mode).
    Command { command: C, then: Option<Mode> },
    /// Operator awaiting a motion or text object. `then` is the mode entered
    /// after the composed command (`None` returns to Normal).
    Operator { command: C, then: Option<Mode> },
    /// Built-in multi-key command continues (`g` before `gg`).
    Prefix,
    /// Next key is a literal argument (`f`, `t`, `m`, `i` in a text object)
    /// and must never be remapped.
    Argument,
    None,
}

pub trait CommandLookup {
    type Command: Clone + fmt::Debug;

    fn lookup(&self, mode: Mode, keys: &[KeyStroke]) -> Binding<Self::Command>;
}

impl<T: CommandLookup + ?Sized> CommandLookup for &T {
    type Command = T::Command;

    fn lookup(&self, mode: Mode, keys: &[KeyStroke]) -> Binding<Self::Command> {
        (**self).lookup(mode, keys)
    }
}
