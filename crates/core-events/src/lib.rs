//! Core key types for the remap engine.
//!
//! A [`KeyStroke`] is one logical input event: either a printable character
//! or a named special key, plus a modifier mask. Keystrokes synthesized by
//! replaying a mapping are flagged *virtual*; the flag travels with the key
//! but never participates in equality or hashing, so a replayed `j` matches a
//! typed `j` everywhere a map table or binding trie compares keys.
//!
//! [`KeySequence`] is the ordered container used both as map-table keys and
//! as pending-input buffers. Angle-bracket notation (`<CR>`, `<C-w>`, `<LT>`)
//! lives in [`notation`].

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::str::FromStr;

use smallvec::SmallVec;
use thiserror::Error;

pub mod notation;

pub use notation::KeyNotationError;

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const CONTROL = 0b0000_0001;
        const SHIFT   = 0b0000_0010;
        const COMMAND = 0b0000_0100;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialKey {
    Return,
    Esc,
    Backspace,
    Tab,
    Delete,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    F(u8),
}

/// Logical identity of a keystroke, without modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyToken {
    Char(char),
    Special(SpecialKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidKeyStrokeError {
    #[error("keystroke needs either a character or a special key")]
    Empty,
    #[error("keystroke cannot carry both character {character:?} and special key {special:?}")]
    Ambiguous { character: char, special: SpecialKey },
}

/// One input event. Immutable once constructed; [`KeyStroke::to_virtual`]
/// returns a marked copy instead of mutating.
#[derive(Debug, Clone, Copy)]
pub struct KeyStroke {
    token: KeyToken,
    mods: Modifiers,
    is_virtual: bool,
}

impl KeyStroke {
    /// Checked constructor: exactly one of `character` / `special` must be set.
    pub fn new(
        character: Option<char>,
        special: Option<SpecialKey>,
        mods: Modifiers,
    ) -> Result<Self, InvalidKeyStrokeError> {
        let token = match (character, special) {
            (Some(c), None) => KeyToken::Char(c),
            (None, Some(k)) => KeyToken::Special(k),
            (None, None) => return Err(InvalidKeyStrokeError::Empty),
            (Some(character), Some(special)) => {
                return Err(InvalidKeyStrokeError::Ambiguous { character, special });
            }
        };
        Ok(Self::from_token(token, mods))
    }

    pub const fn char(c: char) -> Self {
        Self {
            token: KeyToken::Char(c),
            mods: Modifiers::empty(),
            is_virtual: false,
        }
    }

    pub const fn special(key: SpecialKey) -> Self {
        Self {
            token: KeyToken::Special(key),
            mods: Modifiers::empty(),
            is_virtual: false,
        }
    }

    pub const fn ctrl(c: char) -> Self {
        Self::from_token(KeyToken::Char(c), Modifiers::CONTROL)
    }

    /// Control chords are case-insensitive: `<C-W>` and `<C-w>` are one key,
    /// stored with the lowercase character.
    pub const fn from_token(token: KeyToken, mods: Modifiers) -> Self {
        let token = match token {
            KeyToken::Char(c) if mods.contains(Modifiers::CONTROL) => {
                KeyToken::Char(c.to_ascii_lowercase())
            }
            other => other,
        };
        Self {
            token,
            mods,
            is_virtual: false,
        }
    }

    pub fn token(&self) -> KeyToken {
        self.token
    }

    pub fn character(&self) -> Option<char> {
        match self.token {
            KeyToken::Char(c) => Some(c),
            KeyToken::Special(_) => None,
        }
    }

    pub fn special_key(&self) -> Option<SpecialKey> {
        match self.token {
            KeyToken::Special(k) => Some(k),
            KeyToken::Char(_) => None,
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        self.mods
    }

    pub fn is_virtual(&self) -> bool {
        self.is_virtual
    }

    /// Copy of this keystroke marked as synthesized by a mapping replay.
    pub fn to_virtual(self) -> Self {
        Self {
            is_virtual: true,
            ..self
        }
    }

    /// Plain (unmodified) character, if any. Used for count digits, register
    /// names and literal arguments, all of which ignore modified keys.
    pub fn plain_char(&self) -> Option<char> {
        match self.token {
            KeyToken::Char(c) if self.mods.is_empty() => Some(c),
            _ => None,
        }
    }

    pub fn is_esc(&self) -> bool {
        matches!(self.token, KeyToken::Special(SpecialKey::Esc)) && self.mods.is_empty()
    }
}

impl PartialEq for KeyStroke {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token && self.mods == other.mods
    }
}

impl Eq for KeyStroke {}

impl Hash for KeyStroke {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.token.hash(state);
        self.mods.hash(state);
    }
}

impl fmt::Display for KeyStroke {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        notation::write_key(&mut out, self);
        f.write_str(&out)
    }
}

/// Ordered keystrokes; insertion order is the literal typing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeySequence(SmallVec<[KeyStroke; 8]>);

impl KeySequence {
    pub fn new() -> Self {
        Self(SmallVec::new())
    }

    pub fn from_keys(keys: &[KeyStroke]) -> Self {
        Self(SmallVec::from_slice(keys))
    }

    /// Parse angle-bracket notation (`"\"_d$"`, `"<LT>ESC<GT>"`).
    pub fn parse(text: &str) -> Result<Self, KeyNotationError> {
        notation::parse(text)
    }

    pub fn push(&mut self, key: KeyStroke) {
        self.0.push(key);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn as_slice(&self) -> &[KeyStroke] {
        &self.0
    }

    /// Copy with every keystroke marked virtual.
    pub fn to_virtual(&self) -> Self {
        self.0.iter().map(|k| k.to_virtual()).collect()
    }
}

impl Deref for KeySequence {
    type Target = [KeyStroke];

    fn deref(&self) -> &[KeyStroke] {
        &self.0
    }
}

impl FromIterator<KeyStroke> for KeySequence {
    fn from_iter<I: IntoIterator<Item = KeyStroke>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for KeySequence {
    type Item = KeyStroke;
    type IntoIter = smallvec::IntoIter<[KeyStroke; 8]>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a KeySequence {
    type Item = &'a KeyStroke;
    type IntoIter = std::slice::Iter<'a, KeyStroke>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Extend<KeyStroke> for KeySequence {
    fn extend<I: IntoIterator<Item = KeyStroke>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl FromStr for KeySequence {
    type Err = KeyNotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        notation::parse(s)
    }
}

impl fmt::Display for KeySequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&notation::format(self))
    }
}
