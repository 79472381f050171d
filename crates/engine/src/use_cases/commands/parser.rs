//! Input line parsing and abbreviation resolution.

use std::collections::HashMap;

/// Source of registered command names and their abbreviation priorities.
pub trait CommandIndex {
    fn priority_of(&self, name: &str) -> Option<u32>;
    fn names_with_prefix(&self, prefix: &str) -> Vec<(String, u32)>;
}

impl CommandIndex for HashMap<String, u32> {
    fn priority_of(&self, name: &str) -> Option<u32> {
        self.get(name).copied()
    }

    fn names_with_prefix(&self, prefix: &str) -> Vec<(String, u32)> {
        self.iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, priority)| (name.clone(), *priority))
            .collect()
    }
}

/// One command segment of an input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Resolved command name, or the typed head if nothing matched.
    pub name: String,
    pub args: Vec<String>,
    pub known: bool,
}

/// Split a raw line into trimmed, non-empty `;`-separated segments.
pub fn split_line(line: &str) -> Vec<&str> {
    line.split(';')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Parse a single segment. Returns `None` for a blank segment.
///
/// Only the command word is lower-cased; arguments keep their case so `say` and `tell`
/// text reach other players as typed.
pub fn parse_segment(segment: &str, index: &impl CommandIndex) -> Option<ParsedCommand> {
    let mut tokens = segment.split_whitespace();
    let head = tokens.next()?.to_lowercase();
    let args = tokens.map(str::to_string).collect();

    Some(match resolve_name(&head, index) {
        Some(name) => ParsedCommand {
            name,
            args,
            known: true,
        },
        None => ParsedCommand {
            name: head,
            args,
            known: false,
        },
    })
}

/// Expand a possibly abbreviated command name.
///
/// An exact registration wins. Otherwise the registered names starting with `head` compete
/// and the lowest priority value wins, ties going to the alphabetically first name.
pub fn resolve_name(head: &str, index: &impl CommandIndex) -> Option<String> {
    if index.priority_of(head).is_some() {
        return Some(head.to_string());
    }
    index
        .names_with_prefix(head)
        .into_iter()
        .min_by(|(a_name, a_pri), (b_name, b_pri)| a_pri.cmp(b_pri).then_with(|| a_name.cmp(b_name)))
        .map(|(name, _)| name)
}
