//! Record of the edits made during one edit session.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::schema::{same_name, Attribute, AttributeScope, Constraint, SchemaInfo};

/// Object kind an entry is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Attribute,
    ClassAttribute,
    ForeignKey,
    /// Unique and index constraints of every flavour
    Index,
}

impl ChangeKind {
    pub fn for_scope(scope: AttributeScope) -> Self {
        match scope {
            AttributeScope::Instance => ChangeKind::Attribute,
            AttributeScope::Class => ChangeKind::ClassAttribute,
        }
    }

    pub fn scope(self) -> Option<AttributeScope> {
        match self {
            ChangeKind::Attribute => Some(AttributeScope::Instance),
            ChangeKind::ClassAttribute => Some(AttributeScope::Class),
            _ => None,
        }
    }
}

/// One change: `old` absent means added, `new` absent means removed,
/// both present means edited or renamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    #[serde(default)]
    pub old: Option<String>,
    #[serde(default)]
    pub new: Option<String>,
    pub kind: ChangeKind,
}

impl ChangeLogEntry {
    pub fn added(name: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            old: None,
            new: Some(name.into()),
            kind,
        }
    }

    pub fn dropped(name: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            old: Some(name.into()),
            new: None,
            kind,
        }
    }

    pub fn edited(old: impl Into<String>, new: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            old: Some(old.into()),
            new: Some(new.into()),
            kind,
        }
    }

    pub fn is_addition(&self) -> bool {
        self.old.is_none() && self.new.is_some()
    }

    pub fn is_removal(&self) -> bool {
        self.old.is_some() && self.new.is_none()
    }

    pub fn is_edit(&self) -> bool {
        self.old.is_some() && self.new.is_some()
    }
}

/// Ordered, merged change entries.
///
/// Every object has at most one entry, placed where it was first touched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLog {
    #[serde(default)]
    entries: Vec<ChangeLogEntry>,
    #[serde(default)]
    new_table: bool,
}

impl ChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the log of a session that creates a new class.
    pub fn for_new_table() -> Self {
        Self {
            entries: Vec::new(),
            new_table: true,
        }
    }

    pub fn is_new_table(&self) -> bool {
        self.new_table
    }

    /// Records an entry, merging it with the entry of the same object.
    ///
    /// add then edit gives add(new), edit then edit gives edit(first old,
    /// last new), add then drop removes the entry, edit then drop gives
    /// drop(first old).
    pub fn add(&mut self, entry: ChangeLogEntry) {
        let Some(old) = entry.old.as_deref() else {
            self.entries.push(entry);
            return;
        };
        let previous = self.entries.iter().position(|e| {
            e.kind == entry.kind && e.new.as_deref().is_some_and(|n| same_name(n, old))
        });
        let Some(index) = previous else {
            self.entries.push(entry);
            return;
        };

        match entry.new {
            Some(new) => {
                self.entries[index].new = Some(new);
            }
            None if self.entries[index].old.is_none() => {
                debug!(name = old, "Dropped object was added in this session");
                self.entries.remove(index);
            }
            None => {
                self.entries[index].new = None;
            }
        }
    }

    pub fn entries(&self) -> &[ChangeLogEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries_of(&self, kind: ChangeKind) -> impl Iterator<Item = &ChangeLogEntry> {
        self.entries.iter().filter(move |e| e.kind == kind)
    }

    /// Attribute entries of both scopes, in log order.
    pub fn attribute_entries(&self) -> impl Iterator<Item = &ChangeLogEntry> {
        self.entries.iter().filter(|e| e.kind.scope().is_some())
    }

    pub fn foreign_key_entries(&self) -> impl Iterator<Item = &ChangeLogEntry> {
        self.entries_of(ChangeKind::ForeignKey)
    }

    pub fn index_entries(&self) -> impl Iterator<Item = &ChangeLogEntry> {
        self.entries_of(ChangeKind::Index)
    }

    /// Returns true if the attribute was added in this session and still exists.
    pub fn is_new_added(&self, name: &str, scope: AttributeScope) -> bool {
        self.entries_of(ChangeKind::for_scope(scope)).any(|e| {
            e.is_addition() && e.new.as_deref().is_some_and(|n| same_name(n, name))
        })
    }

    /// Names of edited instance attributes whose NOT NULL change goes to the
    /// server as an admin request.
    ///
    /// # Arguments
    /// * `old` / `new` - Committed and edited definitions
    /// * `old_pk` / `new_pk` - Local primary keys of the two definitions
    pub fn not_null_changed_columns(
        &self,
        old: &SchemaInfo,
        new: &SchemaInfo,
        old_pk: Option<&Constraint>,
        new_pk: Option<&Constraint>,
    ) -> Vec<String> {
        self.entries_of(ChangeKind::Attribute)
            .filter_map(|e| {
                let (old_name, new_name) = (e.old.as_deref()?, e.new.as_deref()?);
                let before = old.attribute(old_name, AttributeScope::Instance)?;
                let after = new.attribute(new_name, AttributeScope::Instance)?;
                needs_not_null_request(before, after, old_pk, new_pk).then(|| after.name.clone())
            })
            .collect()
    }
}

/// Returns true if the NOT NULL toggle from `before` to `after` needs an
/// admin request.
///
/// Nothing is requested when the column is redefined anyway, or when the
/// toggle follows the column joining or leaving the primary key.
pub fn needs_not_null_request(
    before: &Attribute,
    after: &Attribute,
    old_pk: Option<&Constraint>,
    new_pk: Option<&Constraint>,
) -> bool {
    if before.not_null == after.not_null || before.needs_modify(after) {
        return false;
    }
    let in_old = old_pk.is_some_and(|c| c.references_column(&before.name));
    let in_new = new_pk.is_some_and(|c| c.references_column(&after.name));
    in_old == in_new
}
