//! Pending-buffer behaviour: backtracking, flush, escape and timeouts.

mod common;

use std::time::{Duration, Instant};

use common::*;
use core_actions::{EditKind, ModeChange, MotionKind, Outcome, PendingState};
use core_events::{KeySequence, KeyStroke, SpecialKey};
use core_keymap::Mode;
use pretty_assertions::assert_eq;

#[test]
fn insert_sanity_without_maps() {
    let mut e = engine(&[]);
    assert_eq!(
        commands(&mut e, "aya<Esc>"),
        vec![
            mode_change(ModeChange::Append),
            text('y'),
            text('a'),
            mode_change(ModeChange::LeaveInsert),
        ]
    );
    assert_eq!(e.mode(), Mode::Normal);
}

#[test]
fn jj_leaves_insert_only_once_mapped() {
    let mut e = engine(&[]);
    let typed = commands(&mut e, "ijkjjlh<Esc>");
    assert_eq!(typed.len(), 8);
    assert_eq!(e.mode(), Mode::Normal);

    e.execute_ex(":inoremap jj <Esc>").unwrap();
    let outcomes = run(&mut e, "ijkjjlh<Esc>");
    let (last, rest) = outcomes.split_last().unwrap();
    assert_eq!(
        resolved(rest.to_vec())
            .into_iter()
            .map(|r| r.command)
            .collect::<Vec<_>>(),
        vec![
            mode_change(ModeChange::EnterInsert),
            text('j'),
            text('k'),
            mode_change(ModeChange::LeaveInsert),
            motion(MotionKind::Right),
            motion(MotionKind::Left),
        ]
    );
    // Escape in idle Normal mode has no meaning of its own.
    assert_eq!(
        last,
        &Outcome::NoMatch(KeySequence::from_keys(&[KeyStroke::special(SpecialKey::Esc)]))
    );
}

#[test]
fn failed_jj_lets_kk_match_by_backtracking() {
    let mut e = engine(&[":inoremap jj <Esc>"]);
    assert_eq!(
        commands(&mut e, "ijkklhjjlh"),
        vec![
            mode_change(ModeChange::EnterInsert),
            text('j'),
            text('k'),
            text('k'),
            text('l'),
            text('h'),
            mode_change(ModeChange::LeaveInsert),
            motion(MotionKind::Right),
            motion(MotionKind::Left),
        ]
    );

    e.execute_ex(":inoremap kk <Esc>").unwrap();
    let outcomes = run(&mut e, "ijkklh");
    assert_eq!(
        resolved(outcomes)
            .into_iter()
            .map(|r| r.command)
            .collect::<Vec<_>>(),
        vec![
            mode_change(ModeChange::EnterInsert),
            text('j'),
            mode_change(ModeChange::LeaveInsert),
            motion(MotionKind::Right),
            motion(MotionKind::Left),
        ]
    );
}

#[test]
fn exact_match_shadows_longer_mapping() {
    let mut e = engine(&[":inoremap j J", ":inoremap jk K"]);
    e.set_mode(Mode::Insert);
    assert_eq!(commands(&mut e, "jk"), vec![text('J'), text('k')]);
}

#[test]
fn backtracking_expands_mapping_defined_while_pending() {
    let mut e = engine(&[":inoremap jk K"]);
    e.set_mode(Mode::Insert);
    e.feed(KeyStroke::char('j')).unwrap();
    e.execute_ex(":inoremap j J").unwrap();
    assert_eq!(commands(&mut e, "x"), vec![text('J'), text('x')]);
}

#[test]
fn exact_match_dispatches_without_waiting() {
    let mut e = engine(&[":inoremap j J", ":inoremap jk K"]);
    e.set_mode(Mode::Insert);
    let res = e.feed(KeyStroke::char('j')).unwrap();
    assert_eq!(res.outcomes.len(), 1);
    assert_eq!(res.pending, PendingState::Idle);
}

#[test]
fn virtual_flag_marks_replayed_keys() {
    let mut e = engine(&[":inoremap jj <Esc>"]);
    e.set_mode(Mode::Insert);
    let r = single(&mut e, "jj");
    assert_eq!(r.command, mode_change(ModeChange::LeaveInsert));
    assert_eq!(r.keys.len(), 1);
    assert!(r.keys[0].is_virtual());
    let r = single(&mut e, "i");
    assert!(!r.keys[0].is_virtual());
}

#[test]
fn flush_resolves_pending_prefix_literally() {
    let mut e = engine(&[":nnoremap gr G"]);
    let res = e.feed(KeyStroke::char('g')).unwrap();
    assert!(res.outcomes.is_empty());
    assert!(matches!(res.pending, PendingState::AwaitingMore { .. }));
    // `g` alone is an unfinished built-in: still pending after the flush.
    let res = e.flush().unwrap();
    assert!(res.outcomes.is_empty());
    assert_eq!(res.pending, PendingState::AwaitingMore { deadline: None });
    let res = e.feed(KeyStroke::char('g')).unwrap();
    assert_eq!(
        resolved(res.outcomes)
            .into_iter()
            .map(|r| r.command)
            .collect::<Vec<_>>(),
        vec![motion(MotionKind::FileStart)]
    );
}

#[test]
fn timeout_flushes_through_poll() {
    let mut e = engine(&[":imap jj <Esc>"]);
    e.set_mode(Mode::Insert);
    let t0 = Instant::now();
    e.feed_at(KeyStroke::char('j'), t0).unwrap();
    assert!(e.poll_timeout(t0 + Duration::from_millis(999)).unwrap().is_none());
    let res = e
        .poll_timeout(t0 + Duration::from_millis(1000))
        .unwrap()
        .expect("deadline passed");
    assert_eq!(
        resolved(res.outcomes)
            .into_iter()
            .map(|r| r.command)
            .collect::<Vec<_>>(),
        vec![text('j')]
    );
    assert_eq!(e.mode(), Mode::Insert);
}

#[test]
fn escape_drops_pending_prefix_then_leaves_insert() {
    let mut e = engine(&[":inoremap jj <Esc>"]);
    e.set_mode(Mode::Insert);
    assert_eq!(
        commands(&mut e, "j<Esc>"),
        vec![mode_change(ModeChange::LeaveInsert)]
    );
    assert_eq!(e.mode(), Mode::Normal);
}

#[test]
fn escape_cancels_partial_command() {
    let mut e = engine(&[":nnoremap gr G"]);
    let res = e.feed_notation("2d3").unwrap();
    assert!(res.outcomes.is_empty());
    assert_eq!(res.mode, Mode::OperatorPending);
    let res = e.feed(KeyStroke::special(SpecialKey::Esc)).unwrap();
    assert!(res.outcomes.is_empty());
    assert_eq!(res.mode, Mode::Normal);
    assert_eq!(res.pending, PendingState::Idle);

    let res = e.feed_notation("2g<Esc>").unwrap();
    assert!(res.outcomes.is_empty());
    assert_eq!(res.pending, PendingState::Idle);
    // Nothing leaks into the next command.
    let r = single(&mut e, "j");
    assert_eq!((r.command, r.count), (motion(MotionKind::Down), None));
}

#[test]
fn cancel_is_escape_equivalent() {
    let mut e = engine(&[":nnoremap gr G"]);
    e.feed_notation("3\"ag").unwrap();
    e.cancel();
    assert_eq!(e.pending(), PendingState::Idle);
    let r = single(&mut e, "x");
    assert_eq!(r.command, edit(EditKind::DeleteUnder));
    assert_eq!((r.count, r.register), (None, None));
}

#[test]
fn unknown_keys_reported_and_dropped() {
    let mut e = engine(&[]);
    let outcomes = run(&mut e, "dQj");
    assert_eq!(outcomes.len(), 2);
    assert_eq!(
        outcomes[0],
        Outcome::NoMatch(KeySequence::parse("dQ").unwrap())
    );
    assert_eq!(e.mode(), Mode::Normal);
}

#[test]
fn table_edits_apply_to_next_keystroke() {
    let mut e = engine(&[":inoremap jk <Esc>"]);
    e.set_mode(Mode::Insert);
    e.feed(KeyStroke::char('j')).unwrap();
    e.execute_ex(":iunmap jk").unwrap();
    assert_eq!(commands(&mut e, "k"), vec![text('j'), text('k')]);
}
