//! Reference vi command vocabulary ([`VimBindings`]).
//!
//! Hosts with their own command model implement [`CommandLookup`] directly;
//! this table exists so the engine can be driven end to end (tests, the
//! `ox-remap` binary) with the usual Normal / Visual / Operator-pending /
//! Insert meanings.

use core_events::{KeySequence, KeyStroke, SpecialKey};
use core_keymap::{KeyTrie, Mode, TrieMatch};

use crate::binding::{Binding, CommandLookup};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotionKind {
    Left,
    Right,
    Up,
    Down,
    WordForward,
    WordBackward,
    WordEnd,
    BigWordForward,
    BigWordBackward,
    BigWordEnd,
    LineStart,
    FirstNonBlank,
    LineEnd,
    FileStart,
    FileEnd,
    MatchPair,
    ScreenTop,
    ScreenMiddle,
    ScreenBottom,
    DisplayDown,
    DisplayUp,
    PageHalfDown,
    PageHalfUp,
    FindForward(char),
    FindBackward(char),
    TillForward(char),
    TillBackward(char),
    MarkExact(char),
    MarkLine(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    Delete,
    Yank,
    Change,
    ShiftRight,
    ShiftLeft,
    ToggleCase,
    Lowercase,
    Uppercase,
    Format,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextObjectKind {
    Inner(char),
    Around(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditKind {
    DeleteUnder,
    DeleteLeft,
    DeleteToLineEnd,
    ChangeToLineEnd,
    Substitute,
    SubstituteLine,
    JoinLines,
    ToggleCaseChar,
    Replace(char),
    PasteAfter,
    PasteBefore,
    Undo,
    Redo,
    RepeatLast,
    InsertGrapheme(char),
    InsertNewline,
    Backspace,
    DeleteWordBack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeChange {
    EnterInsert,
    Append,
    InsertLineStart,
    AppendLineEnd,
    OpenBelow,
    OpenAbove,
    EnterVisualChar,
    EnterVisualLine,
    LeaveInsert,
    LeaveVisual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Motion(MotionKind),
    Operator(OperatorKind),
    TextObject(TextObjectKind),
    /// Operator applied directly to the Visual selection.
    VisualOperator(OperatorKind),
    VisualSwapEnds,
    Edit(EditKind),
    ModeChange(ModeChange),
    SetMark(char),
    CommandLine,
}

#[derive(Debug, Clone)]
enum Entry {
    Fixed(Binding<Action>),
    /// Literal-argument prefix; the next plain character completes it.
    Argument {
        build: fn(char) -> Action,
        then: Option<Mode>,
    },
}

const MODE_TABLES: usize = 4;

fn table_index(mode: Mode) -> usize {
    match mode {
        Mode::Normal => 0,
        Mode::Visual => 1,
        Mode::OperatorPending => 2,
        Mode::Insert => 3,
    }
}

#[derive(Debug, Clone)]
pub struct VimBindings {
    tables: [KeyTrie<Entry>; MODE_TABLES],
}

impl Default for VimBindings {
    fn default() -> Self {
        Self::new()
    }
}

fn keys(text: &str) -> KeySequence {
    text.chars().map(KeyStroke::char).collect()
}

fn special(key: SpecialKey) -> KeySequence {
    KeySequence::from_keys(&[KeyStroke::special(key)])
}

fn command(action: Action) -> Entry {
    Entry::Fixed(Binding::Command {
        command: action,
        then: None,
    })
}

fn command_then(action: Action, mode: Mode) -> Entry {
    Entry::Fixed(Binding::Command {
        command: action,
        then: Some(mode),
    })
}

fn motion_specs() -> Vec<(KeySequence, Entry)> {
    use MotionKind::*;
    let mut specs: Vec<(KeySequence, Entry)> = [
        ("h", Left),
        ("l", Right),
        ("k", Up),
        ("j", Down),
        ("w", WordForward),
        ("b", WordBackward),
        ("e", WordEnd),
        ("W", BigWordForward),
        ("B", BigWordBackward),
        ("E", BigWordEnd),
        ("0", LineStart),
        ("^", FirstNonBlank),
        ("$", LineEnd),
        ("gg", FileStart),
        ("G", FileEnd),
        ("%", MatchPair),
        ("H", ScreenTop),
        ("M", ScreenMiddle),
        ("L", ScreenBottom),
        ("gj", DisplayDown),
        ("gk", DisplayUp),
    ]
    .into_iter()
    .map(|(k, m)| (keys(k), command(Action::Motion(m))))
    .collect();
    specs.extend([
        (special(SpecialKey::ArrowLeft), command(Action::Motion(Left))),
        (special(SpecialKey::ArrowRight), command(Action::Motion(Right))),
        (special(SpecialKey::ArrowUp), command(Action::Motion(Up))),
        (special(SpecialKey::ArrowDown), command(Action::Motion(Down))),
        (
            KeySequence::from_keys(&[KeyStroke::ctrl('d')]),
            command(Action::Motion(PageHalfDown)),
        ),
        (
            KeySequence::from_keys(&[KeyStroke::ctrl('u')]),
            command(Action::Motion(PageHalfUp)),
        ),
    ]);
    let arguments: [(&str, fn(char) -> Action); 6] = [
        ("f", |c| Action::Motion(FindForward(c))),
        ("F", |c| Action::Motion(FindBackward(c))),
        ("t", |c| Action::Motion(TillForward(c))),
        ("T", |c| Action::Motion(TillBackward(c))),
        ("`", |c| Action::Motion(MarkExact(c))),
        ("'", |c| Action::Motion(MarkLine(c))),
    ];
    specs.extend(
        arguments
            .into_iter()
            .map(|(k, build)| (keys(k), Entry::Argument { build, then: None })),
    );
    specs
}

fn text_object_specs() -> Vec<(KeySequence, Entry)> {
    vec![
        (
            keys("i"),
            Entry::Argument {
                build: |c| Action::TextObject(TextObjectKind::Inner(c)),
                then: None,
            },
        ),
        (
            keys("a"),
            Entry::Argument {
                build: |c| Action::TextObject(TextObjectKind::Around(c)),
                then: None,
            },
        ),
    ]
}

fn operator_keys() -> [(&'static str, OperatorKind); 9] {
    use OperatorKind::*;
    [
        ("d", Delete),
        ("y", Yank),
        ("c", Change),
        (">", ShiftRight),
        ("<", ShiftLeft),
        ("g~", ToggleCase),
        ("gu", Lowercase),
        ("gU", Uppercase),
        ("gq", Format),
    ]
}

fn normal_specs() -> Vec<(KeySequence, Entry)> {
    use EditKind::*;
    use ModeChange::*;
    let mut specs = motion_specs();
    specs.extend(operator_keys().into_iter().map(|(k, op)| {
        let then = matches!(op, OperatorKind::Change).then_some(Mode::Insert);
        (
            keys(k),
            Entry::Fixed(Binding::Operator {
                command: Action::Operator(op),
                then,
            }),
        )
    }));
    specs.extend(
        [
            ("x", DeleteUnder),
            ("X", DeleteLeft),
            ("D", DeleteToLineEnd),
            ("J", JoinLines),
            ("~", ToggleCaseChar),
            ("p", PasteAfter),
            ("P", PasteBefore),
            ("u", Undo),
            (".", RepeatLast),
        ]
        .into_iter()
        .map(|(k, e)| (keys(k), command(Action::Edit(e)))),
    );
    specs.push((
        KeySequence::from_keys(&[KeyStroke::ctrl('r')]),
        command(Action::Edit(Redo)),
    ));
    specs.extend(
        [("C", ChangeToLineEnd), ("s", Substitute), ("S", SubstituteLine)]
            .into_iter()
            .map(|(k, e)| (keys(k), command_then(Action::Edit(e), Mode::Insert))),
    );
    specs.extend(
        [
            ("i", EnterInsert),
            ("a", Append),
            ("I", InsertLineStart),
            ("A", AppendLineEnd),
            ("o", OpenBelow),
            ("O", OpenAbove),
        ]
        .into_iter()
        .map(|(k, m)| (keys(k), command_then(Action::ModeChange(m), Mode::Insert))),
    );
    specs.extend([
        (
            keys("v"),
            command_then(Action::ModeChange(EnterVisualChar), Mode::Visual),
        ),
        (
            keys("V"),
            command_then(Action::ModeChange(EnterVisualLine), Mode::Visual),
        ),
        (keys(":"), command(Action::CommandLine)),
        (
            keys("r"),
            Entry::Argument {
                build: |c| Action::Edit(Replace(c)),
                then: None,
            },
        ),
        (
            keys("m"),
            Entry::Argument {
                build: Action::SetMark,
                then: None,
            },
        ),
    ]);
    specs
}

fn visual_specs() -> Vec<(KeySequence, Entry)> {
    use OperatorKind::*;
    let mut specs = motion_specs();
    specs.extend(text_object_specs());
    specs.extend(
        [
            ("d", Delete),
            ("x", Delete),
            ("y", Yank),
            ("c", Change),
            (">", ShiftRight),
            ("<", ShiftLeft),
            ("~", ToggleCase),
            ("u", Lowercase),
            ("U", Uppercase),
            ("gq", Format),
        ]
        .into_iter()
        .map(|(k, op)| {
            let then = if matches!(op, Change) {
                Mode::Insert
            } else {
                Mode::Normal
            };
            (keys(k), command_then(Action::VisualOperator(op), then))
        }),
    );
    specs.extend([
        (keys("o"), command(Action::VisualSwapEnds)),
        (keys(":"), command(Action::CommandLine)),
        (
            keys("v"),
            command_then(Action::ModeChange(ModeChange::LeaveVisual), Mode::Normal),
        ),
        (
            special(SpecialKey::Esc),
            command_then(Action::ModeChange(ModeChange::LeaveVisual), Mode::Normal),
        ),
    ]);
    specs
}

fn operator_pending_specs() -> Vec<(KeySequence, Entry)> {
    let mut specs = motion_specs();
    specs.extend(text_object_specs());
    specs
}

fn insert_specs() -> Vec<(KeySequence, Entry)> {
    use EditKind::*;
    vec![
        (
            special(SpecialKey::Esc),
            command_then(Action::ModeChange(ModeChange::LeaveInsert), Mode::Normal),
        ),
        (special(SpecialKey::Return), command(Action::Edit(InsertNewline))),
        (special(SpecialKey::Backspace), command(Action::Edit(Backspace))),
        (
            special(SpecialKey::Tab),
            command(Action::Edit(InsertGrapheme('\t'))),
        ),
        (
            KeySequence::from_keys(&[KeyStroke::ctrl('w')]),
            command(Action::Edit(DeleteWordBack)),
        ),
    ]
}

impl VimBindings {
    pub fn new() -> Self {
        Self {
            tables: [
                KeyTrie::build(normal_specs()),
                KeyTrie::build(visual_specs()),
                KeyTrie::build(operator_pending_specs()),
                KeyTrie::build(insert_specs()),
            ],
        }
    }
}

impl CommandLookup for VimBindings {
    type Command = Action;

    fn lookup(&self, mode: Mode, keys: &[KeyStroke]) -> Binding<Action> {
        let table = &self.tables[table_index(mode)];
        match table.resolve(keys) {
            TrieMatch::Exact {
                value: Entry::Fixed(binding),
                ..
            } => binding.clone(),
            TrieMatch::Exact {
                value: Entry::Argument { .. },
                ..
            } => Binding::Argument,
            TrieMatch::Prefix => Binding::Prefix,
            TrieMatch::None => {
                let Some((last, head)) = keys.split_last() else {
                    return Binding::None;
                };
                if let Some(Entry::Argument { build, then }) = table.get(head)
                    && let Some(c) = last.plain_char()
                {
                    return Binding::Command {
                        command: build(c),
                        then: *then,
                    };
                }
                // Insert mode: any unmodified character not bound above is text.
                if mode == Mode::Insert
                    && head.is_empty()
                    && let Some(c) = last.plain_char()
                {
                    return Binding::Command {
                        command: Action::Edit(EditKind::InsertGrapheme(c)),
                        then: None,
                    };
                }
                Binding::None
            }
        }
    }
}
