//! Aliases and snippets
//!
//! A collectable is a named user-authored scripted command. Aliases are
//! invoked as commands, snippets as argument fragments; both share one shape.
//! Name uniqueness is enforced per published version, never globally.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::{WorkshopError, WorkshopResult};

/// How a collectable is invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectableKind {
    /// Invoked as a command
    Alias,
    /// Appended to another command's arguments
    Snippet,
}

/// A named scripted command carried inside a version snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collectable {
    /// Invocation name, unique per version within its kind
    pub name: String,

    /// Invocation kind
    pub kind: CollectableKind,

    /// Script body
    pub code: String,

    /// Help docs shown to installers
    #[serde(default)]
    pub docs: String,
}

impl Collectable {
    /// Create an alias
    pub fn alias(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: CollectableKind::Alias,
            code: code.into(),
            docs: String::new(),
        }
    }

    /// Create a snippet
    pub fn snippet(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: CollectableKind::Snippet,
            code: code.into(),
            docs: String::new(),
        }
    }

    /// First line of the docs, for listings
    pub fn short_docs(&self) -> &str {
        self.docs.lines().next().unwrap_or("")
    }
}

/// Validates a candidate alias set before it becomes a version snapshot.
///
/// Rules:
/// - at least one collectable
/// - names are non-empty, contain no whitespace
/// - snippet names are at least 2 characters
/// - alias names must not shadow a built-in command
/// - names unique per kind (an alias and a snippet may share a name)
/// - script bodies are non-empty
pub fn validate_alias_set(
    collectables: &[Collectable],
    builtin_commands: &HashSet<String>,
) -> WorkshopResult<()> {
    if collectables.is_empty() {
        return Err(WorkshopError::validation(
            "alias_set",
            "at least one alias or snippet is required",
        ));
    }

    let mut seen: HashSet<(CollectableKind, &str)> = HashSet::new();
    for c in collectables {
        if c.name.is_empty() {
            return Err(WorkshopError::validation("name", "name is required"));
        }
        if c.name.chars().any(char::is_whitespace) {
            return Err(WorkshopError::validation(
                "name",
                format!("`{}` contains whitespace", c.name),
            ));
        }
        if c.kind == CollectableKind::Snippet && c.name.chars().count() < 2 {
            return Err(WorkshopError::validation(
                "name",
                format!("snippet name `{}` must be at least 2 characters", c.name),
            ));
        }
        if c.kind == CollectableKind::Alias && builtin_commands.contains(&c.name) {
            return Err(WorkshopError::validation(
                "name",
                format!("`{}` is already a built-in command", c.name),
            ));
        }
        if c.code.trim().is_empty() {
            return Err(WorkshopError::validation(
                "code",
                format!("`{}` has an empty script body", c.name),
            ));
        }
        if !seen.insert((c.kind, c.name.as_str())) {
            return Err(WorkshopError::validation(
                "name",
                format!("duplicate name `{}`", c.name),
            ));
        }
    }
    Ok(())
}
