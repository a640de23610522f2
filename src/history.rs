//! The session history log and `!prefix` expansion.

use thiserror::Error;
use tracing::debug;

/// Ordered, append-only log of the raw lines entered during a session.
///
/// Index 0 is the oldest entry. Entries are never removed or reordered.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<String>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line to the end of the log.
    pub fn push(&mut self, line: impl Into<String>) {
        self.entries.push(line.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order, paired with their index.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.entries.iter().map(String::as_str).enumerate()
    }

    /// Most recent entry that starts with `prefix`, searching from newest to oldest.
    pub fn find_by_prefix(&self, prefix: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.starts_with(prefix))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    /// No entry starts with the prefix. Holds the whole reference, `!` included.
    #[error("{0}: Event not found")]
    EventNotFound(String),
}

/// Returns true iff the line contains a `!` at all.
///
/// This is only a cheap pre-check; `expand` decides which `!` are real references.
pub fn contains_reference(line: &str) -> bool {
    line.contains('!')
}

fn is_terminator(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '<' | '>')
}

/// Replaces every `!prefix` in `line` with the most recent history entry starting
/// with `prefix`.
///
/// A `!` that is followed by a terminator or ends the line is copied through
/// unchanged. Expansion stops at the first reference that cannot be resolved.
pub fn expand(line: &str, history: &History) -> Result<String, HistoryError> {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;

    while let Some(bang) = rest.find('!') {
        out.push_str(&rest[..bang]);
        let after = &rest[bang + 1..];
        let prefix_len = after.find(is_terminator).unwrap_or(after.len());
        if prefix_len == 0 {
            out.push('!');
            rest = after;
            continue;
        }

        let prefix = &after[..prefix_len];
        match history.find_by_prefix(prefix) {
            Some(entry) => {
                debug!(prefix, entry, "expanded history reference");
                out.push_str(entry);
            }
            None => return Err(HistoryError::EventNotFound(format!("!{prefix}"))),
        }
        rest = &after[prefix_len..];
    }
    out.push_str(rest);
    Ok(out)
}
