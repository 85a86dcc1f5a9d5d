//! `:map`-family command line parsing.
//!
//! Converts one command line (leading ':' optional) into a [`ParsedCommand`].
//! Pure classification: key notation is decoded here so a malformed line is
//! rejected before anything touches the map table.
//!
//! Command names accept vi-style abbreviations: any prefix of the full name
//! at least as long as its registered minimum (`nn` for `nnoremap`, `mapc`
//! for `mapclear`).

use core_events::KeySequence;
use core_keymap::ModeScope;

use crate::error::MapDefinitionSyntaxError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCommand {
    Map {
        scope: ModeScope,
        recursive: bool,
        source: KeySequence,
        target: KeySequence,
    },
    Unmap {
        scope: ModeScope,
        source: KeySequence,
    },
    MapClear(ModeScope),
    List(ModeScope),
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Map { recursive: bool },
    Unmap,
    MapClear,
}

struct CommandName {
    name: &'static str,
    min_len: usize,
    scope: ModeScope,
    kind: Kind,
}

const fn cmd(name: &'static str, min_len: usize, scope: ModeScope, kind: Kind) -> CommandName {
    CommandName {
        name,
        min_len,
        scope,
        kind,
    }
}

const REC: Kind = Kind::Map { recursive: true };
const NOREC: Kind = Kind::Map { recursive: false };

const COMMANDS: &[CommandName] = &[
    cmd("map", 3, ModeScope::All, REC),
    cmd("noremap", 2, ModeScope::All, NOREC),
    cmd("nmap", 2, ModeScope::Normal, REC),
    cmd("nnoremap", 2, ModeScope::Normal, NOREC),
    cmd("vmap", 2, ModeScope::Visual, REC),
    cmd("vnoremap", 2, ModeScope::Visual, NOREC),
    cmd("omap", 2, ModeScope::OperatorPending, REC),
    cmd("onoremap", 3, ModeScope::OperatorPending, NOREC),
    cmd("imap", 2, ModeScope::Insert, REC),
    cmd("inoremap", 3, ModeScope::Insert, NOREC),
    cmd("mapclear", 4, ModeScope::All, Kind::MapClear),
    cmd("nmapclear", 5, ModeScope::Normal, Kind::MapClear),
    cmd("vmapclear", 5, ModeScope::Visual, Kind::MapClear),
    cmd("omapclear", 5, ModeScope::OperatorPending, Kind::MapClear),
    cmd("imapclear", 5, ModeScope::Insert, Kind::MapClear),
    cmd("unmap", 3, ModeScope::All, Kind::Unmap),
    cmd("nunmap", 3, ModeScope::Normal, Kind::Unmap),
    cmd("vunmap", 2, ModeScope::Visual, Kind::Unmap),
    cmd("ounmap", 2, ModeScope::OperatorPending, Kind::Unmap),
    cmd("iunmap", 2, ModeScope::Insert, Kind::Unmap),
];

fn resolve_name(name: &str) -> Option<&'static CommandName> {
    if name.is_empty() {
        return None;
    }
    COMMANDS
        .iter()
        .find(|c| name == c.name)
        .or_else(|| {
            COMMANDS
                .iter()
                .find(|c| name.len() >= c.min_len && c.name.starts_with(name))
        })
}

fn split_word(s: &str) -> (&str, &str) {
    match s.find(char::is_whitespace) {
        Some(idx) => (&s[..idx], s[idx..].trim_start()),
        None => (s, ""),
    }
}

pub struct CommandParser;

impl CommandParser {
    pub fn parse(raw: &str) -> Result<ParsedCommand, MapDefinitionSyntaxError> {
        let body = raw.trim();
        let body = body.strip_prefix(':').unwrap_or(body).trim_start();
        let name_end = body
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(body.len());
        let (name, rest) = body.split_at(name_end);
        // `:nmap<Space>x` style is not vi syntax; the name must end at whitespace.
        if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
            return Err(MapDefinitionSyntaxError::UnknownCommand(body.to_string()));
        }
        let Some(command) = resolve_name(name) else {
            return Err(MapDefinitionSyntaxError::UnknownCommand(body.to_string()));
        };
        let rest = rest.trim();
        let scope = command.scope;
        match command.kind {
            Kind::Map { recursive } => {
                if rest.is_empty() {
                    return Ok(ParsedCommand::List(scope));
                }
                let (source_text, target_text) = split_word(rest);
                if target_text.is_empty() {
                    return Err(MapDefinitionSyntaxError::MissingTarget {
                        command: command.name.to_string(),
                        keys: source_text.to_string(),
                    });
                }
                let source = KeySequence::parse(source_text)?;
                let target = KeySequence::parse(target_text)?;
                Ok(ParsedCommand::Map {
                    scope,
                    recursive,
                    source,
                    target,
                })
            }
            Kind::Unmap => {
                if rest.is_empty() {
                    return Err(MapDefinitionSyntaxError::MissingSource {
                        command: command.name.to_string(),
                    });
                }
                let (source_text, extra) = split_word(rest);
                if !extra.is_empty() {
                    return Err(MapDefinitionSyntaxError::TrailingCharacters {
                        command: command.name.to_string(),
                        extra: extra.to_string(),
                    });
                }
                Ok(ParsedCommand::Unmap {
                    scope,
                    source: KeySequence::parse(source_text)?,
                })
            }
            Kind::MapClear => {
                if !rest.is_empty() {
                    return Err(MapDefinitionSyntaxError::TrailingCharacters {
                        command: command.name.to_string(),
                        extra: rest.to_string(),
                    });
                }
                Ok(ParsedCommand::MapClear(scope))
            }
        }
    }
}
