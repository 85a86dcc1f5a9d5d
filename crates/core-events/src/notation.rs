//! Angle-bracket key notation used by map definitions.
//!
//! Plain characters stand for themselves. `<name>` decodes a named key,
//! optionally prefixed by modifiers (`C-` control, `S-` shift, `D-`/`M-`
//! command): `<CR>`, `<Esc>`, `<C-w>`, `<S-Tab>`. `<LT>` and `<GT>` spell
//! literal angle brackets. A `<` that does not open a well-formed bracket
//! (no closing `>`, or whitespace / another `<` before it) is a literal `<`,
//! so `<<` and `a < b` parse as written.

use thiserror::Error;

use crate::{KeySequence, KeyStroke, KeyToken, Modifiers, SpecialKey};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyNotationError {
    #[error("unknown key name <{name}>")]
    UnknownKeyName { name: String },
}

const CHAR_NAMES: &[(&str, char)] = &[
    ("space", ' '),
    ("lt", '<'),
    ("gt", '>'),
    ("bar", '|'),
    ("bslash", '\\'),
];

const SPECIAL_NAMES: &[(&str, SpecialKey)] = &[
    ("cr", SpecialKey::Return),
    ("return", SpecialKey::Return),
    ("enter", SpecialKey::Return),
    ("esc", SpecialKey::Esc),
    ("bs", SpecialKey::Backspace),
    ("backspace", SpecialKey::Backspace),
    ("tab", SpecialKey::Tab),
    ("del", SpecialKey::Delete),
    ("delete", SpecialKey::Delete),
    ("ins", SpecialKey::Insert),
    ("insert", SpecialKey::Insert),
    ("home", SpecialKey::Home),
    ("end", SpecialKey::End),
    ("pageup", SpecialKey::PageUp),
    ("pagedown", SpecialKey::PageDown),
    ("up", SpecialKey::ArrowUp),
    ("down", SpecialKey::ArrowDown),
    ("left", SpecialKey::ArrowLeft),
    ("right", SpecialKey::ArrowRight),
];

pub fn parse(text: &str) -> Result<KeySequence, KeyNotationError> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = KeySequence::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '<'
            && let Some(close) = bracket_close(&chars, i)
        {
            let inner: String = chars[i + 1..close].iter().collect();
            out.push(parse_bracketed(&inner)?);
            i = close + 1;
            continue;
        }
        out.push(KeyStroke::char(c));
        i += 1;
    }
    Ok(out)
}

/// Index of the `>` closing a bracket opened at `open`, if well formed.
fn bracket_close(chars: &[char], open: usize) -> Option<usize> {
    let mut j = open + 1;
    while j < chars.len() {
        match chars[j] {
            '>' if j > open + 1 => return Some(j),
            '>' | '<' => return None,
            c if c.is_whitespace() => return None,
            _ => j += 1,
        }
    }
    None
}

fn parse_bracketed(inner: &str) -> Result<KeyStroke, KeyNotationError> {
    let unknown = || KeyNotationError::UnknownKeyName {
        name: inner.to_string(),
    };
    let mut mods = Modifiers::empty();
    let mut rest = inner;
    loop {
        let mut it = rest.chars();
        let (Some(m), Some('-')) = (it.next(), it.next()) else {
            break;
        };
        if it.as_str().is_empty() {
            break;
        }
        mods |= match m.to_ascii_lowercase() {
            'c' => Modifiers::CONTROL,
            's' => Modifiers::SHIFT,
            'd' | 'm' => Modifiers::COMMAND,
            _ => return Err(unknown()),
        };
        rest = it.as_str();
    }

    let mut rest_chars = rest.chars();
    if let (Some(c), None) = (rest_chars.next(), rest_chars.next()) {
        // `<x>` alone is not a key name; with modifiers it names a chord.
        if mods.is_empty() {
            return Err(unknown());
        }
        return Ok(KeyStroke::from_token(KeyToken::Char(c), mods));
    }

    let lower = rest.to_ascii_lowercase();
    if let Some(&(_, c)) = CHAR_NAMES.iter().find(|(n, _)| *n == lower) {
        return Ok(KeyStroke::from_token(KeyToken::Char(c), mods));
    }
    if let Some(&(_, k)) = SPECIAL_NAMES.iter().find(|(n, _)| *n == lower) {
        return Ok(KeyStroke::from_token(KeyToken::Special(k), mods));
    }
    if let Some(num) = lower.strip_prefix('f')
        && let Ok(n) = num.parse::<u8>()
        && (1..=12).contains(&n)
    {
        return Ok(KeyStroke::from_token(KeyToken::Special(SpecialKey::F(n)), mods));
    }
    Err(unknown())
}

/// Canonical notation for a sequence; `parse(&format(s)) == s`.
pub fn format(seq: &[KeyStroke]) -> String {
    let mut out = String::new();
    for key in seq {
        write_key(&mut out, key);
    }
    out
}

pub(crate) fn write_key(out: &mut String, key: &KeyStroke) {
    let mods = key.modifiers();
    match key.token() {
        KeyToken::Char(c) if mods.is_empty() => match c {
            '<' => out.push_str("<LT>"),
            ' ' => out.push_str("<Space>"),
            c => out.push(c),
        },
        token => {
            out.push('<');
            if mods.contains(Modifiers::CONTROL) {
                out.push_str("C-");
            }
            if mods.contains(Modifiers::SHIFT) {
                out.push_str("S-");
            }
            if mods.contains(Modifiers::COMMAND) {
                out.push_str("D-");
            }
            match token {
                KeyToken::Char('<') => out.push_str("LT"),
                KeyToken::Char('>') => out.push_str("GT"),
                KeyToken::Char(' ') => out.push_str("Space"),
                KeyToken::Char(c) => out.push(c),
                KeyToken::Special(k) => out.push_str(&special_name(k)),
            }
            out.push('>');
        }
    }
}

fn special_name(key: SpecialKey) -> String {
    match key {
        SpecialKey::Return => "CR".into(),
        SpecialKey::Esc => "Esc".into(),
        SpecialKey::Backspace => "BS".into(),
        SpecialKey::Tab => "Tab".into(),
        SpecialKey::Delete => "Del".into(),
        SpecialKey::Insert => "Insert".into(),
        SpecialKey::Home => "Home".into(),
        SpecialKey::End => "End".into(),
        SpecialKey::PageUp => "PageUp".into(),
        SpecialKey::PageDown => "PageDown".into(),
        SpecialKey::ArrowUp => "Up".into(),
        SpecialKey::ArrowDown => "Down".into(),
        SpecialKey::ArrowLeft => "Left".into(),
        SpecialKey::ArrowRight => "Right".into(),
        SpecialKey::F(n) => format!("F{n}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn keys(text: &str) -> Vec<KeyStroke> {
        parse(text).unwrap().to_vec()
    }

    #[test]
    fn plain_characters_map_one_to_one() {
        assert_eq!(
            keys("\"_d$"),
            vec![
                KeyStroke::char('"'),
                KeyStroke::char('_'),
                KeyStroke::char('d'),
                KeyStroke::char('$'),
            ]
        );
    }

    #[test]
    fn named_keys_are_case_insensitive() {
        assert_eq!(keys("<CR>"), vec![KeyStroke::special(SpecialKey::Return)]);
        assert_eq!(keys("<esc>"), vec![KeyStroke::special(SpecialKey::Esc)]);
        assert_eq!(keys("<Esc>"), keys("<ESC>"));
        assert_eq!(keys("<F5>"), vec![KeyStroke::special(SpecialKey::F(5))]);
    }

    #[test]
    fn lt_and_gt_decode_to_brackets() {
        // The command-line text `<LT>ESC<GT>` types the six characters `<ESC>`.
        assert_eq!(format(&keys("<LT>ESC<GT>")), "<LT>ESC>");
        let typed: String = keys("<LT>ESC<GT>")
            .iter()
            .filter_map(|k| k.character())
            .collect();
        assert_eq!(typed, "<ESC>");
    }

    #[test]
    fn modifier_chords() {
        assert_eq!(keys("<C-w>"), vec![KeyStroke::ctrl('w')]);
        assert_eq!(keys("<C-W>"), vec![KeyStroke::ctrl('w')]);
        let shift_tab = KeyStroke::new(None, Some(SpecialKey::Tab), Modifiers::SHIFT).unwrap();
        assert_eq!(keys("<S-Tab>"), vec![shift_tab]);
        let cmd_v = KeyStroke::new(Some('v'), None, Modifiers::COMMAND).unwrap();
        assert_eq!(keys("<D-v>"), vec![cmd_v]);
        assert_eq!(keys("<M-v>"), vec![cmd_v]);
    }

    #[test]
    fn unclosed_bracket_is_literal() {
        assert_eq!(keys("<<"), vec![KeyStroke::char('<'), KeyStroke::char('<')]);
        assert_eq!(
            keys("< x>"),
            vec![
                KeyStroke::char('<'),
                KeyStroke::char(' '),
                KeyStroke::char('x'),
                KeyStroke::char('>'),
            ]
        );
        assert_eq!(keys("<>"), vec![KeyStroke::char('<'), KeyStroke::char('>')]);
    }

    #[test]
    fn unknown_name_is_an_error() {
        assert_eq!(
            parse("a<Bogus>"),
            Err(KeyNotationError::UnknownKeyName {
                name: "Bogus".into()
            })
        );
        assert!(parse("<x>").is_err());
        assert!(parse("<Q-x>").is_err());
    }

    #[test]
    fn format_round_trips() {
        for text in ["gg", "<C-w>j", "<LT>a", "a<Space>b", "<CR><Esc><F12>", "<C-GT>"] {
            let seq = parse(text).unwrap();
            assert_eq!(parse(&format(&seq)).unwrap(), seq, "round trip of {text}");
        }
        assert_eq!(format(&parse("<cr>").unwrap()), "<CR>");
    }

    #[test]
    fn constructed_control_chord_round_trips() {
        let upper = KeyStroke::new(Some('W'), None, Modifiers::CONTROL).unwrap();
        assert_eq!(upper, KeyStroke::ctrl('w'));
        assert_eq!(format(&[upper]), "<C-w>");
        let seq = KeySequence::from_keys(&[upper, KeyStroke::ctrl('J')]);
        assert_eq!(parse(&format(&seq)).unwrap(), seq);
        // Without CONTROL the case is significant.
        let cmd = KeyStroke::new(Some('V'), None, Modifiers::COMMAND).unwrap();
        assert_eq!(format(&[cmd]), "<D-V>");
        assert_eq!(parse("<D-V>").unwrap().as_slice(), &[cmd]);
    }
}
