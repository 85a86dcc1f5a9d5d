use std::fmt;

/// Active editing mode of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    Normal,
    Visual,
    /// Operator typed, awaiting a motion or text object.
    OperatorPending,
    Insert,
}

impl Mode {
    /// Mode the engine falls back to when pending input is cancelled.
    pub fn idle(self) -> Mode {
        match self {
            Mode::OperatorPending => Mode::Normal,
            other => other,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Normal => "normal",
            Mode::Visual => "visual",
            Mode::OperatorPending => "operator-pending",
            Mode::Insert => "insert",
        })
    }
}

/// Scope a mapping is defined in. `All` is the `:map` / `:noremap` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeScope {
    Normal,
    Visual,
    OperatorPending,
    Insert,
    All,
}

impl ModeScope {
    pub const COUNT: usize = 5;

    pub const SCOPES: [ModeScope; Self::COUNT] = [
        ModeScope::Normal,
        ModeScope::Visual,
        ModeScope::OperatorPending,
        ModeScope::Insert,
        ModeScope::All,
    ];

    pub(crate) const fn index(self) -> usize {
        match self {
            ModeScope::Normal => 0,
            ModeScope::Visual => 1,
            ModeScope::OperatorPending => 2,
            ModeScope::Insert => 3,
            ModeScope::All => 4,
        }
    }

    /// Whether the `All` table acts as fallback for `mode`. Insert mode is
    /// excluded, as with vi's `:map`.
    pub fn all_covers(mode: Mode) -> bool {
        !matches!(mode, Mode::Insert)
    }

    /// One-letter tag used when listing mappings (`n`, `v`, `o`, `i`, blank).
    pub fn tag(self) -> char {
        match self {
            ModeScope::Normal => 'n',
            ModeScope::Visual => 'v',
            ModeScope::OperatorPending => 'o',
            ModeScope::Insert => 'i',
            ModeScope::All => ' ',
        }
    }
}

impl From<Mode> for ModeScope {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Normal => ModeScope::Normal,
            Mode::Visual => ModeScope::Visual,
            Mode::OperatorPending => ModeScope::OperatorPending,
            Mode::Insert => ModeScope::Insert,
        }
    }
}
