#![allow(dead_code)] // Shared across integration tests; each test binary uses a subset of helpers.

use core_actions::{
    Action, Composed, EditKind, Engine, ModeChange, MotionKind, OperatorKind, Outcome, Resolved,
    TextObjectKind, VimBindings,
};

pub fn engine(ex_commands: &[&str]) -> Engine<VimBindings> {
    let mut engine = Engine::new(VimBindings::new());
    for line in ex_commands {
        engine
            .execute_ex(line)
            .unwrap_or_else(|e| panic!("{line}: {e}"));
    }
    engine
}

/// Feed `keys` (key notation) and flush whatever is still pending.
pub fn run(engine: &mut Engine<VimBindings>, keys: &str) -> Vec<Outcome<Action>> {
    let mut outcomes = engine.feed_notation(keys).expect("feed").outcomes;
    outcomes.extend(engine.flush().expect("flush").outcomes);
    outcomes
}

pub fn resolved(outcomes: Vec<Outcome<Action>>) -> Vec<Resolved<Action>> {
    outcomes
        .into_iter()
        .map(|o| match o {
            Outcome::Resolved(r) => r,
            Outcome::NoMatch(keys) => panic!("unexpected no-match for {keys}"),
        })
        .collect()
}

/// Run `keys` expecting exactly one resolved command.
pub fn single(engine: &mut Engine<VimBindings>, keys: &str) -> Resolved<Action> {
    let mut all = resolved(run(engine, keys));
    assert_eq!(all.len(), 1, "{keys}: expected one command, got {all:?}");
    all.remove(0)
}

pub fn commands(engine: &mut Engine<VimBindings>, keys: &str) -> Vec<Composed<Action>> {
    resolved(run(engine, keys))
        .into_iter()
        .map(|r| r.command)
        .collect()
}

pub fn motion(kind: MotionKind) -> Composed<Action> {
    Composed::Single(Action::Motion(kind))
}

pub fn edit(kind: EditKind) -> Composed<Action> {
    Composed::Single(Action::Edit(kind))
}

pub fn mode_change(kind: ModeChange) -> Composed<Action> {
    Composed::Single(Action::ModeChange(kind))
}

pub fn text(c: char) -> Composed<Action> {
    edit(EditKind::InsertGrapheme(c))
}

pub fn apply(op: OperatorKind, kind: MotionKind) -> Composed<Action> {
    Composed::Apply {
        operator: Action::Operator(op),
        motion: Action::Motion(kind),
    }
}

pub fn apply_object(op: OperatorKind, object: TextObjectKind) -> Composed<Action> {
    Composed::Apply {
        operator: Action::Operator(op),
        motion: Action::TextObject(object),
    }
}

pub fn linewise(op: OperatorKind) -> Composed<Action> {
    Composed::Linewise {
        operator: Action::Operator(op),
    }
}
