use core_keymap::Mode;

use crate::engine::Outcome;

/// Notified after a keystroke cycle commits. A cycle that fails with a
/// mapping loop is rolled back and produces no notifications.
pub trait EngineObserver<C> {
    fn on_mode_change(&self, _from: Mode, _to: Mode) {}
    fn on_outcome(&self, _outcome: &Outcome<C>) {}
}
