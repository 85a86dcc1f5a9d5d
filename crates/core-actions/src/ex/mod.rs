//! Execution of `:map`-family commands against a [`MapTable`].

pub mod command_parser;

use core_events::KeySequence;
use core_keymap::{MapTable, ModeScope};
use tracing::{debug, warn};

pub use command_parser::{CommandParser, ParsedCommand};

use crate::error::MapDefinitionSyntaxError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExOutcome {
    Defined {
        scope: ModeScope,
        source: KeySequence,
        replaced: bool,
    },
    Removed {
        scope: ModeScope,
        source: KeySequence,
    },
    Cleared(ModeScope),
    /// One formatted line per entry, e.g. `n  D            *"_d$` (`*` marks noremap).
    Listing(Vec<String>),
}

/// Parse and apply one command line. On error the table is unchanged.
pub fn execute(table: &mut MapTable, line: &str) -> Result<ExOutcome, MapDefinitionSyntaxError> {
    let parsed = CommandParser::parse(line).inspect_err(|e| {
        warn!(target: "ex.map", line, error = %e, "ex_rejected");
    })?;
    apply(table, parsed)
}

pub fn apply(
    table: &mut MapTable,
    command: ParsedCommand,
) -> Result<ExOutcome, MapDefinitionSyntaxError> {
    match command {
        ParsedCommand::Map {
            scope,
            recursive,
            source,
            target,
        } => {
            if source.is_empty() {
                return Err(MapDefinitionSyntaxError::MissingSource {
                    command: map_name(scope, recursive).to_string(),
                });
            }
            let replaced = table
                .define(scope, source.clone(), target, recursive)
                .is_some();
            debug!(target: "ex.map", scope = ?scope, source = %source, replaced, "map_defined");
            Ok(ExOutcome::Defined {
                scope,
                source,
                replaced,
            })
        }
        ParsedCommand::Unmap { scope, source } => match table.remove(scope, &source) {
            Some(_) => Ok(ExOutcome::Removed { scope, source }),
            None => {
                warn!(target: "ex.map", scope = ?scope, source = %source, "unmap_missing");
                Err(MapDefinitionSyntaxError::NoSuchMapping {
                    command: unmap_name(scope).to_string(),
                    keys: source.to_string(),
                })
            }
        },
        ParsedCommand::MapClear(scope) => {
            table.clear(scope);
            Ok(ExOutcome::Cleared(scope))
        }
        ParsedCommand::List(scope) => Ok(ExOutcome::Listing(listing(table, scope))),
    }
}

fn map_name(scope: ModeScope, recursive: bool) -> &'static str {
    match (scope, recursive) {
        (ModeScope::Normal, true) => "nmap",
        (ModeScope::Normal, false) => "nnoremap",
        (ModeScope::Visual, true) => "vmap",
        (ModeScope::Visual, false) => "vnoremap",
        (ModeScope::OperatorPending, true) => "omap",
        (ModeScope::OperatorPending, false) => "onoremap",
        (ModeScope::Insert, true) => "imap",
        (ModeScope::Insert, false) => "inoremap",
        (ModeScope::All, true) => "map",
        (ModeScope::All, false) => "noremap",
    }
}

fn unmap_name(scope: ModeScope) -> &'static str {
    match scope {
        ModeScope::Normal => "nunmap",
        ModeScope::Visual => "vunmap",
        ModeScope::OperatorPending => "ounmap",
        ModeScope::Insert => "iunmap",
        ModeScope::All => "unmap",
    }
}

fn listing(table: &MapTable, scope: ModeScope) -> Vec<String> {
    table
        .entries(scope)
        .into_iter()
        .map(|e| {
            let star = if e.recursive { ' ' } else { '*' };
            format!(
                "{}  {:<12} {}{}",
                e.scope.tag(),
                e.source.to_string(),
                star,
                e.target
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_keymap::{Lookup, Mode};
    use pretty_assertions::assert_eq;

    #[test]
    fn define_then_list() {
        let mut table = MapTable::new();
        execute(&mut table, ":nnoremap D \"_d$").unwrap();
        execute(&mut table, ":nmap L dd").unwrap();
        let ExOutcome::Listing(lines) = execute(&mut table, ":nmap").unwrap() else {
            panic!("expected listing");
        };
        assert_eq!(
            lines,
            vec![
                "n  D            *\"_d$".to_string(),
                "n  L             dd".to_string(),
            ]
        );
    }

    #[test]
    fn redefinition_reports_replacement() {
        let mut table = MapTable::new();
        execute(&mut table, ":map L dd").unwrap();
        let out = execute(&mut table, ":noremap L $").unwrap();
        assert!(matches!(out, ExOutcome::Defined { replaced: true, .. }));
    }

    #[test]
    fn rejected_line_leaves_table_untouched() {
        let mut table = MapTable::new();
        execute(&mut table, ":nmap L dd").unwrap();
        assert!(execute(&mut table, ":nmap L <Nope>").is_err());
        assert!(execute(&mut table, ":nmap Q").is_err());
        let Lookup::Exact(entry) = table.lookup(Mode::Normal, &KeySequence::parse("L").unwrap())
        else {
            panic!("L mapping lost");
        };
        assert_eq!(entry.target.to_string(), "dd");
        assert_eq!(table.len(ModeScope::Normal), 1);
    }

    #[test]
    fn empty_source_is_rejected_not_defined() {
        let mut table = MapTable::new();
        let command = ParsedCommand::Map {
            scope: ModeScope::Insert,
            recursive: false,
            source: KeySequence::new(),
            target: KeySequence::parse("<Esc>").unwrap(),
        };
        assert_eq!(
            apply(&mut table, command),
            Err(MapDefinitionSyntaxError::MissingSource {
                command: "inoremap".into()
            })
        );
        assert!(table.is_empty(ModeScope::Insert));
    }

    #[test]
    fn unmap_unknown_is_an_error() {
        let mut table = MapTable::new();
        assert_eq!(
            execute(&mut table, ":ounmap L"),
            Err(MapDefinitionSyntaxError::NoSuchMapping {
                command: "ounmap".into(),
                keys: "L".into()
            })
        );
        execute(&mut table, ":onoremap L $").unwrap();
        assert!(matches!(
            execute(&mut table, ":ou L").unwrap(),
            ExOutcome::Removed { .. }
        ));
        assert!(table.is_empty(ModeScope::OperatorPending));
    }

    #[test]
    fn mapclear_scoped() {
        let mut table = MapTable::new();
        execute(&mut table, ":map q 2j").unwrap();
        execute(&mut table, ":nmap L dd").unwrap();
        execute(&mut table, ":mapclear").unwrap();
        assert!(table.is_empty(ModeScope::All));
        assert_eq!(table.len(ModeScope::Normal), 1);
    }
}
