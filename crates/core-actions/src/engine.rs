// -------------------------------------------------------------------------------------------------
// Engine: remap resolution in front of command composition
// -------------------------------------------------------------------------------------------------
// Every keystroke enters a FIFO queue. A queued key is either remappable (user input or a `:map`
// target) or literal (a `:noremap` target). Remappable keys collect in a pending buffer that is
// matched against the map table for the parser's current context:
//   Prefix  -> keep waiting
//   Exact   -> replace the buffer by the entry's target, pushed to the front of the queue
//   None    -> backtrack: expand the longest strict prefix that is a source, or hand the first
//              key to the parser literally; the rest of the buffer is requeued in front
// Literal keys and keys the parser claims (count digits, `"`, built-in prefix continuations,
// literal arguments) bypass the tables. Recursive targets carry an expansion id so a source
// already being expanded on the same chain is detected as a loop.
//
// A feed is one cycle. Outcomes and mode transitions of a cycle are buffered and only published
// (to the caller and to observers) once it completes without error.
// -------------------------------------------------------------------------------------------------

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use core_config::Config;
use core_events::{KeySequence, KeyStroke};
use core_keymap::{DEFAULT_MAX_COUNT, Lookup, MapEntry, MapTable, Mode};
use tracing::{debug, trace, warn};

use crate::binding::CommandLookup;
use crate::composer::{CommandState, MapContext, Resolved, Step};
use crate::error::{MapDefinitionSyntaxError, RecursiveMapLoopError, RemapError};
use crate::ex::{self, ExOutcome};
use crate::observer::EngineObserver;

pub const DEFAULT_MAX_MAP_DEPTH: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// How long an unresolved map prefix may wait; `None` waits forever.
    pub timeout: Option<Duration>,
    pub max_count: u32,
    pub max_map_depth: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_millis(1000)),
            max_count: DEFAULT_MAX_COUNT,
            max_map_depth: DEFAULT_MAX_MAP_DEPTH,
        }
    }
}

impl EngineOptions {
    pub fn from_config(config: &Config) -> Self {
        let input = &config.file.input;
        Self {
            timeout: config.timeout(),
            max_count: input.max_count,
            max_map_depth: input.maxmapdepth,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<C> {
    Resolved(Resolved<C>),
    /// Keys with neither a mapping nor a built-in meaning; dropped.
    NoMatch(KeySequence),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingState {
    Idle,
    /// A partial command or map prefix is waiting. `deadline` is set while
    /// map keys are buffered and a timeout is configured.
    AwaitingMore { deadline: Option<Instant> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedResult<C> {
    pub outcomes: Vec<Outcome<C>>,
    pub pending: PendingState,
    pub mode: Mode,
}

#[derive(Debug, Clone, Copy)]
struct QueuedKey {
    key: KeyStroke,
    remap: bool,
    /// Recursive expansion this key was produced by.
    origin: Option<usize>,
}

impl QueuedKey {
    fn typed(key: KeyStroke) -> Self {
        Self {
            key,
            remap: true,
            origin: None,
        }
    }
}

#[derive(Debug, Clone)]
struct Expansion {
    source: KeySequence,
    parent: Option<usize>,
}

enum Event<C> {
    ModeChanged { from: Mode, to: Mode },
    Outcome(Outcome<C>),
}

struct Cycle<C> {
    events: Vec<Event<C>>,
}

impl<C> Default for Cycle<C> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

pub struct Engine<L: CommandLookup> {
    lookup: L,
    table: MapTable,
    state: CommandState<L::Command>,
    buffer: Vec<QueuedKey>,
    queue: VecDeque<QueuedKey>,
    expansions: Vec<Expansion>,
    pending_since: Option<Instant>,
    options: EngineOptions,
    observers: Vec<Box<dyn EngineObserver<L::Command>>>,
}

impl<L: CommandLookup> Engine<L> {
    pub fn new(lookup: L) -> Self {
        Self::with_options(lookup, EngineOptions::default())
    }

    pub fn with_options(lookup: L, options: EngineOptions) -> Self {
        Self {
            lookup,
            table: MapTable::new(),
            state: CommandState::new(Mode::Normal, options.max_count),
            buffer: Vec::new(),
            queue: VecDeque::new(),
            expansions: Vec::new(),
            pending_since: None,
            options,
            observers: Vec::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.state.mode()
    }

    /// Host-driven mode switch. Pending keys and partial commands are dropped.
    pub fn set_mode(&mut self, mode: Mode) {
        let from = self.state.mode();
        self.clear_pending();
        self.state.set_mode(mode);
        if from != mode {
            for obs in &self.observers {
                obs.on_mode_change(from, mode);
            }
        }
    }

    pub fn table(&self) -> &MapTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut MapTable {
        &mut self.table
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn add_observer<O>(&mut self, observer: O)
    where
        O: EngineObserver<L::Command> + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    pub fn execute_ex(&mut self, line: &str) -> Result<ExOutcome, MapDefinitionSyntaxError> {
        ex::execute(&mut self.table, line)
    }

    pub fn pending(&self) -> PendingState {
        if !self.buffer.is_empty() {
            let deadline = match (self.options.timeout, self.pending_since) {
                (Some(timeout), Some(since)) => Some(since + timeout),
                _ => None,
            };
            PendingState::AwaitingMore { deadline }
        } else if !self.state.is_idle() {
            PendingState::AwaitingMore { deadline: None }
        } else {
            PendingState::Idle
        }
    }

    pub fn feed(&mut self, key: KeyStroke) -> Result<FeedResult<L::Command>, RecursiveMapLoopError> {
        self.feed_at(key, Instant::now())
    }

    /// Feed with an explicit clock, used to stamp the pending deadline.
    pub fn feed_at(
        &mut self,
        key: KeyStroke,
        now: Instant,
    ) -> Result<FeedResult<L::Command>, RecursiveMapLoopError> {
        trace!(target: "input.remap", key = %key, mode = %self.state.mode(), "feed");
        let start_mode = self.state.mode();
        let mut cycle = Cycle::default();
        self.queue.push_back(QueuedKey::typed(key));
        let result = self.drain(&mut cycle);
        self.finish_cycle(cycle, start_mode, now, result)
    }

    /// Feed keys one at a time, concatenating outcomes. Stops at the first
    /// error; cycles of the keys before it have already committed.
    pub fn feed_all(
        &mut self,
        keys: &[KeyStroke],
    ) -> Result<FeedResult<L::Command>, RecursiveMapLoopError> {
        let mut outcomes = Vec::new();
        for key in keys {
            outcomes.extend(self.feed(*key)?.outcomes);
        }
        Ok(FeedResult {
            outcomes,
            pending: self.pending(),
            mode: self.state.mode(),
        })
    }

    /// Parse key notation and feed it.
    pub fn feed_notation(&mut self, text: &str) -> Result<FeedResult<L::Command>, RemapError> {
        let keys = KeySequence::parse(text)?;
        Ok(self.feed_all(&keys)?)
    }

    /// Resolve the pending buffer as if no further key will extend it
    /// (input ended or the timeout elapsed).
    pub fn flush(&mut self) -> Result<FeedResult<L::Command>, RecursiveMapLoopError> {
        self.flush_at(Instant::now())
    }

    pub fn flush_at(
        &mut self,
        now: Instant,
    ) -> Result<FeedResult<L::Command>, RecursiveMapLoopError> {
        if !self.buffer.is_empty() {
            debug!(target: "input.remap", pending = self.buffer.len(), "flush");
        }
        let start_mode = self.state.mode();
        let mut cycle = Cycle::default();
        let result = self.flush_cycle(&mut cycle);
        self.finish_cycle(cycle, start_mode, now, result)
    }

    /// Flush if the pending deadline has passed at `now`.
    pub fn poll_timeout(
        &mut self,
        now: Instant,
    ) -> Result<Option<FeedResult<L::Command>>, RecursiveMapLoopError> {
        match self.pending() {
            PendingState::AwaitingMore {
                deadline: Some(deadline),
            } if now >= deadline => self.flush_at(now).map(Some),
            _ => Ok(None),
        }
    }

    /// ESC-equivalent: drop buffered keys and any partial command.
    pub fn cancel(&mut self) {
        let from = self.state.mode();
        self.clear_pending();
        self.state.cancel();
        let to = self.state.mode();
        if from != to {
            for obs in &self.observers {
                obs.on_mode_change(from, to);
            }
        }
    }

    fn clear_pending(&mut self) {
        self.buffer.clear();
        self.queue.clear();
        self.expansions.clear();
        self.pending_since = None;
    }

    fn finish_cycle(
        &mut self,
        cycle: Cycle<L::Command>,
        start_mode: Mode,
        now: Instant,
        result: Result<(), RecursiveMapLoopError>,
    ) -> Result<FeedResult<L::Command>, RecursiveMapLoopError> {
        if let Err(err) = result {
            warn!(
                target: "input.remap",
                sequence = %err.sequence,
                depth = err.chain.len(),
                depth_exceeded = err.depth_exceeded,
                "map_loop_abort"
            );
            self.clear_pending();
            let restored = start_mode.idle();
            self.state.set_mode(restored);
            if restored != start_mode {
                for obs in &self.observers {
                    obs.on_mode_change(start_mode, restored);
                }
            }
            return Err(err);
        }
        if self.buffer.is_empty() {
            self.expansions.clear();
            self.pending_since = None;
        } else if self.pending_since.is_none() {
            self.pending_since = Some(now);
        }
        let mut outcomes = Vec::new();
        for event in cycle.events {
            match event {
                Event::ModeChanged { from, to } => {
                    for obs in &self.observers {
                        obs.on_mode_change(from, to);
                    }
                }
                Event::Outcome(outcome) => {
                    for obs in &self.observers {
                        obs.on_outcome(&outcome);
                    }
                    outcomes.push(outcome);
                }
            }
        }
        Ok(FeedResult {
            outcomes,
            pending: self.pending(),
            mode: self.state.mode(),
        })
    }

    fn drain(&mut self, cycle: &mut Cycle<L::Command>) -> Result<(), RecursiveMapLoopError> {
        while let Some(item) = self.queue.pop_front() {
            self.process(item, cycle)?;
        }
        Ok(())
    }

    fn flush_cycle(&mut self, cycle: &mut Cycle<L::Command>) -> Result<(), RecursiveMapLoopError> {
        while !self.buffer.is_empty() {
            self.resolve_terminated(cycle)?;
            self.drain(cycle)?;
        }
        Ok(())
    }

    fn process(
        &mut self,
        item: QueuedKey,
        cycle: &mut Cycle<L::Command>,
    ) -> Result<(), RecursiveMapLoopError> {
        let context = self.state.map_context();
        let table_mode = match context {
            MapContext::Table(mode) if item.remap => Some(mode),
            _ => None,
        };
        let Some(mode) = table_mode else {
            if !self.buffer.is_empty() {
                // Buffered keys come first; settle them, then retry this key.
                self.queue.push_front(item);
                return self.resolve_terminated(cycle);
            }
            self.deliver(item, cycle);
            return Ok(());
        };

        if self.buffer.is_empty() && self.state.claims_prefix(&item.key) {
            self.deliver(item, cycle);
            return Ok(());
        }

        self.buffer.push(item);
        let candidate = self.buffered_keys();
        match self.table.lookup(mode, &candidate) {
            Lookup::Prefix => {
                trace!(target: "input.remap", pending = %candidate, "await_more");
                Ok(())
            }
            Lookup::Exact(entry) => {
                let entry = entry.clone();
                let consumed = std::mem::take(&mut self.buffer);
                self.expand(&entry, &consumed)
            }
            Lookup::None if item.key.is_esc() && self.buffer.len() > 1 => {
                // ESC abandons the unresolved prefix, then acts on its own.
                self.buffer.pop();
                debug!(target: "input.remap", dropped = %self.buffered_keys(), "escape_drops_pending");
                self.buffer.clear();
                self.deliver(item, cycle);
                Ok(())
            }
            Lookup::None => self.backtrack(mode, cycle),
        }
    }

    /// Settle the whole buffer knowing no later key will extend it.
    fn resolve_terminated(
        &mut self,
        cycle: &mut Cycle<L::Command>,
    ) -> Result<(), RecursiveMapLoopError> {
        let MapContext::Table(mode) = self.state.map_context() else {
            // Buffered keys always entered under a table context; hand them over as typed.
            let items = std::mem::take(&mut self.buffer);
            self.requeue_front(items);
            return Ok(());
        };
        let candidate = self.buffered_keys();
        if let Lookup::Exact(entry) = self.table.lookup(mode, &candidate) {
            let entry = entry.clone();
            let consumed = std::mem::take(&mut self.buffer);
            return self.expand(&entry, &consumed);
        }
        self.backtrack(mode, cycle)
    }

    fn backtrack(
        &mut self,
        mode: Mode,
        cycle: &mut Cycle<L::Command>,
    ) -> Result<(), RecursiveMapLoopError> {
        let candidate = self.buffered_keys();
        if let Some((len, entry)) = self.table.longest_strict_prefix(mode, &candidate) {
            let entry = entry.clone();
            let rest = self.buffer.split_off(len);
            let consumed = std::mem::take(&mut self.buffer);
            debug!(
                target: "input.remap",
                source = %entry.source,
                requeued = rest.len(),
                "backtrack_prefix"
            );
            self.requeue_front(rest);
            return self.expand(&entry, &consumed);
        }
        let mut items = std::mem::take(&mut self.buffer);
        if items.is_empty() {
            return Ok(());
        }
        let first = items.remove(0);
        if !items.is_empty() {
            debug!(
                target: "input.remap",
                literal = %first.key,
                requeued = items.len(),
                "backtrack_literal"
            );
        }
        self.requeue_front(items);
        self.deliver(first, cycle);
        Ok(())
    }

    fn expand(
        &mut self,
        entry: &MapEntry,
        consumed: &[QueuedKey],
    ) -> Result<(), RecursiveMapLoopError> {
        // A match completed by typed input starts a new chain.
        let parent = if consumed.iter().any(|k| k.origin.is_none()) {
            None
        } else {
            consumed.iter().find_map(|k| k.origin)
        };
        let chain = self.chain(parent);
        if chain.contains(&entry.source) {
            return Err(RecursiveMapLoopError {
                sequence: entry.source.clone(),
                chain,
                depth_exceeded: false,
            });
        }
        if chain.len() >= self.options.max_map_depth {
            return Err(RecursiveMapLoopError {
                sequence: entry.source.clone(),
                chain,
                depth_exceeded: true,
            });
        }

        self.state.seal_count();
        let origin = if entry.recursive {
            self.expansions.push(Expansion {
                source: entry.source.clone(),
                parent,
            });
            Some(self.expansions.len() - 1)
        } else {
            None
        };
        debug!(
            target: "input.remap",
            source = %entry.source,
            target_keys = %entry.target,
            recursive = entry.recursive,
            depth = chain.len() + 1,
            "remap_expand"
        );
        // A target starting with its own source replays that head literally (`:map n nzz`).
        let literal_head = if entry.recursive && entry.target.starts_with(&entry.source) {
            entry.source.len()
        } else {
            0
        };
        for (idx, key) in entry.target.iter().enumerate().rev() {
            self.queue.push_front(QueuedKey {
                key: key.to_virtual(),
                remap: entry.recursive && idx >= literal_head,
                origin,
            });
        }
        Ok(())
    }

    /// Sources on the expansion chain ending at `origin`, outermost first.
    fn chain(&self, origin: Option<usize>) -> Vec<KeySequence> {
        let mut out = Vec::new();
        let mut cur = origin;
        while let Some(idx) = cur {
            let Some(exp) = self.expansions.get(idx) else {
                break;
            };
            out.push(exp.source.clone());
            cur = exp.parent;
        }
        out.reverse();
        out
    }

    fn deliver(&mut self, item: QueuedKey, cycle: &mut Cycle<L::Command>) {
        let from = self.state.mode();
        let step = self.state.feed(item.key, &self.lookup);
        let to = self.state.mode();
        if from != to {
            debug!(target: "input.context", from = %from, to = %to, "mode_change");
            cycle.events.push(Event::ModeChanged { from, to });
        }
        match step {
            Step::Continue | Step::Cancelled => {}
            Step::Resolved(resolved) => cycle.events.push(Event::Outcome(Outcome::Resolved(resolved))),
            Step::NoMatch(keys) => cycle.events.push(Event::Outcome(Outcome::NoMatch(keys))),
        }
    }

    fn requeue_front(&mut self, items: Vec<QueuedKey>) {
        for item in items.into_iter().rev() {
            self.queue.push_front(item);
        }
    }

    fn buffered_keys(&self) -> KeySequence {
        self.buffer.iter().map(|k| k.key).collect()
    }
}
