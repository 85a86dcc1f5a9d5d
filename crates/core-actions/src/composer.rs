//! Command composition: literal keys in, resolved commands out.
//!
//! [`CommandState`] sits below the remap layer. It accumulates the count and
//! register prefixes in a [`PendingContext`], tracks operator-pending state,
//! and walks built-in multi-key commands through the [`CommandLookup`].
//! It also tells the remap layer which map table (if any) applies to the next
//! key: keys that complete a built-in prefix, a literal argument or a register
//! name are never remapped.

use core_events::{KeySequence, KeyStroke};
use core_keymap::{Mode, PendingContext};
use tracing::{debug, trace};

use crate::binding::{Binding, CommandLookup};

/// Command produced by one complete key sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Composed<C> {
    Single(C),
    Apply { operator: C, motion: C },
    /// Doubled operator (`dd`, `gqq`, `gUU`).
    Linewise { operator: C },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<C> {
    pub command: Composed<C>,
    pub count: Option<u32>,
    pub register: Option<char>,
    /// Mode in effect after the command.
    pub mode: Mode,
    /// Every key that fed this command, virtual ones included.
    pub keys: KeySequence,
}

impl<C> Resolved<C> {
    pub fn count_or_one(&self) -> u32 {
        self.count.unwrap_or(1)
    }
}

/// Which map table applies to the next key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapContext {
    Table(Mode),
    Literal,
}

#[derive(Debug)]
pub(crate) enum Step<C> {
    Continue,
    Cancelled,
    Resolved(Resolved<C>),
    NoMatch(KeySequence),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Stage {
    Start,
    Builtin(KeySequence),
    Argument(KeySequence),
}

#[derive(Debug, Clone)]
struct PendingOperator<C> {
    command: C,
    keys: KeySequence,
    then: Option<Mode>,
}

#[derive(Debug, Clone)]
pub struct CommandState<C> {
    mode: Mode,
    stage: Stage,
    ctx: PendingContext,
    operator: Option<PendingOperator<C>>,
    keys: KeySequence,
}

impl<C: Clone + std::fmt::Debug> CommandState<C> {
    pub fn new(mode: Mode, max_count: u32) -> Self {
        Self {
            mode,
            stage: Stage::Start,
            ctx: PendingContext::with_max_count(max_count),
            operator: None,
            keys: KeySequence::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Host-driven mode switch; discards any partial command.
    pub fn set_mode(&mut self, mode: Mode) {
        self.reset();
        self.mode = mode;
    }

    pub fn is_idle(&self) -> bool {
        self.stage == Stage::Start && self.operator.is_none() && self.ctx.is_idle()
    }

    pub fn map_context(&self) -> MapContext {
        if self.ctx.awaiting_register || self.stage != Stage::Start {
            MapContext::Literal
        } else {
            MapContext::Table(self.mode)
        }
    }

    /// Count digits and the register prefix belong to the parser, not the
    /// map tables, while a command is being started.
    pub fn claims_prefix(&self, key: &KeyStroke) -> bool {
        if self.mode == Mode::Insert || self.map_context() == MapContext::Literal {
            return false;
        }
        match key.plain_char() {
            Some(c) if self.ctx.accepts_count_digit(c) => true,
            Some('"') => self.accepts_register_prefix(),
            _ => false,
        }
    }

    fn accepts_register_prefix(&self) -> bool {
        self.operator.is_none() && matches!(self.mode, Mode::Normal | Mode::Visual)
    }

    /// Close the count segment typed so far; used before a mapping replays
    /// its target.
    pub fn seal_count(&mut self) {
        self.ctx.seal_count();
    }

    /// Drop the partial command and return to the mode's idle state.
    pub fn cancel(&mut self) {
        let from = self.mode;
        self.reset();
        self.mode = from.idle();
        debug!(target: "input.context", from = %from, to = %self.mode, "cancel_pending");
    }

    fn reset(&mut self) {
        self.stage = Stage::Start;
        self.ctx.reset_transient();
        self.operator = None;
        self.keys.clear();
    }

    pub(crate) fn feed<L>(&mut self, key: KeyStroke, lookup: &L) -> Step<C>
    where
        L: CommandLookup<Command = C> + ?Sized,
    {
        if key.is_esc() && !self.is_idle() {
            self.cancel();
            return Step::Cancelled;
        }
        self.keys.push(key);

        if self.ctx.awaiting_register {
            return match key.plain_char() {
                Some(c) if self.ctx.set_register(c) => Step::Continue,
                _ => self.no_match(),
            };
        }

        let candidate = match std::mem::replace(&mut self.stage, Stage::Start) {
            Stage::Start => {
                if self.mode != Mode::Insert
                    && let Some(c) = key.plain_char()
                {
                    if self.ctx.accepts_count_digit(c) {
                        self.ctx.push_count_digit(c);
                        return Step::Continue;
                    }
                    if c == '"' && self.accepts_register_prefix() {
                        self.ctx.begin_register();
                        return Step::Continue;
                    }
                }
                KeySequence::from_keys(&[key])
            }
            Stage::Builtin(mut keys) | Stage::Argument(mut keys) => {
                keys.push(key);
                keys
            }
        };

        if let Some(op) = &self.operator
            && is_linewise_repeat(&op.keys, &candidate)
        {
            return self.finish_linewise();
        }

        match lookup.lookup(self.mode, &candidate) {
            Binding::Prefix => {
                trace!(target: "input.context", keys = %candidate, "builtin_prefix");
                self.stage = Stage::Builtin(candidate);
                Step::Continue
            }
            Binding::Argument => {
                trace!(target: "input.context", keys = %candidate, "awaiting_argument");
                self.stage = Stage::Argument(candidate);
                Step::Continue
            }
            Binding::Operator { command, then } if self.operator.is_none() => {
                self.ctx.seal_count();
                debug!(target: "input.context", operator = ?command, keys = %candidate, "operator_pending");
                self.operator = Some(PendingOperator {
                    command,
                    keys: candidate,
                    then,
                });
                self.mode = Mode::OperatorPending;
                Step::Continue
            }
            Binding::Command { command, then } => self.finish(command, then),
            Binding::Operator { .. } | Binding::None => self.no_match(),
        }
    }

    fn finish(&mut self, command: C, then: Option<Mode>) -> Step<C> {
        let (command, mode) = match self.operator.take() {
            Some(op) => (
                Composed::Apply {
                    operator: op.command,
                    motion: command,
                },
                op.then.unwrap_or(Mode::Normal),
            ),
            None => (Composed::Single(command), then.unwrap_or(self.mode)),
        };
        self.complete(command, mode)
    }

    fn finish_linewise(&mut self) -> Step<C> {
        let Some(op) = self.operator.take() else {
            return self.no_match();
        };
        let mode = op.then.unwrap_or(Mode::Normal);
        self.complete(
            Composed::Linewise {
                operator: op.command,
            },
            mode,
        )
    }

    fn complete(&mut self, command: Composed<C>, mode: Mode) -> Step<C> {
        let resolved = Resolved {
            command,
            count: self.ctx.take_count(),
            register: self.ctx.take_register(),
            mode,
            keys: std::mem::take(&mut self.keys),
        };
        self.reset();
        self.mode = mode;
        debug!(
            target: "input.context",
            command = ?resolved.command,
            count = ?resolved.count,
            register = ?resolved.register,
            mode = %mode,
            "resolved"
        );
        Step::Resolved(resolved)
    }

    fn no_match(&mut self) -> Step<C> {
        let keys = std::mem::take(&mut self.keys);
        debug!(target: "input.context", keys = %keys, mode = %self.mode, "no_match");
        let from = self.mode;
        self.reset();
        self.mode = from.idle();
        Step::NoMatch(keys)
    }
}

/// `dd` repeats the whole operator; `gqq` / `gUU` repeat its last key.
fn is_linewise_repeat(operator: &[KeyStroke], keys: &[KeyStroke]) -> bool {
    if operator == keys {
        return true;
    }
    matches!(
        (operator.split_last(), keys),
        (Some((last, rest)), [only]) if !rest.is_empty() && last == only
    )
}
