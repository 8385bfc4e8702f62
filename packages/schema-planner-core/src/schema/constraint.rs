//! Keys and indexes.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    PrimaryKey,
    ForeignKey,
    Unique,
    Index,
    ReverseIndex,
    ReverseUnique,
}

impl ConstraintKind {
    /// Prefix of system-generated constraint names.
    pub fn name_prefix(self) -> &'static str {
        match self {
            ConstraintKind::PrimaryKey => "pk",
            ConstraintKind::ForeignKey => "fk",
            ConstraintKind::Unique => "u",
            ConstraintKind::Index => "i",
            ConstraintKind::ReverseIndex => "ri",
            ConstraintKind::ReverseUnique => "ru",
        }
    }

    /// Kinds a sub class receives from its super classes.
    pub fn is_inherited(self) -> bool {
        matches!(
            self,
            ConstraintKind::PrimaryKey
                | ConstraintKind::ForeignKey
                | ConstraintKind::Unique
                | ConstraintKind::ReverseUnique
        )
    }

    /// Unique constraints and plain or reverse indexes.
    pub fn is_index_like(self) -> bool {
        matches!(
            self,
            ConstraintKind::Unique
                | ConstraintKind::Index
                | ConstraintKind::ReverseIndex
                | ConstraintKind::ReverseUnique
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// One key column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyColumn {
    pub name: String,
    #[serde(default)]
    pub order: SortOrder,
}

impl KeyColumn {
    pub fn asc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            order: SortOrder::Desc,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferentialAction {
    Cascade,
    #[default]
    Restrict,
    NoAction,
    SetNull,
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::NoAction => "NO ACTION",
            ReferentialAction::SetNull => "SET NULL",
        };
        f.write_str(text)
    }
}

/// Target of a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyTarget {
    pub referenced_class: String,
    /// Empty means the primary key of the referenced class
    #[serde(default)]
    pub referenced_columns: Vec<String>,
    #[serde(default)]
    pub on_delete: ReferentialAction,
    #[serde(default)]
    pub on_update: ReferentialAction,
    /// Object cache column maintained by the server
    #[serde(default)]
    pub on_cache_object: Option<String>,
}

impl ForeignKeyTarget {
    pub fn new(referenced_class: impl Into<String>) -> Self {
        Self {
            referenced_class: referenced_class.into(),
            referenced_columns: Vec::new(),
            on_delete: ReferentialAction::Restrict,
            on_update: ReferentialAction::Restrict,
            on_cache_object: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,
    pub kind: ConstraintKind,
    pub columns: Vec<KeyColumn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ForeignKeyTarget>,
}

impl Constraint {
    /// Creates a constraint over ascending columns.
    pub fn new<I, S>(name: impl Into<String>, kind: ConstraintKind, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            kind,
            columns: columns.into_iter().map(KeyColumn::asc).collect(),
            foreign_key: None,
        }
    }

    pub fn primary_key<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(name, ConstraintKind::PrimaryKey, columns)
    }

    pub fn foreign_key<I, S>(name: impl Into<String>, columns: I, target: ForeignKeyTarget) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut constraint = Self::new(name, ConstraintKind::ForeignKey, columns);
        constraint.foreign_key = Some(target);
        constraint
    }

    /// Name the server would assign to this constraint on `table`.
    pub fn default_name(&self, table: &str) -> String {
        let mut name = format!("{}_{}", self.kind.name_prefix(), table);
        for column in &self.columns {
            name.push('_');
            name.push_str(&column.name);
            if column.order == SortOrder::Desc {
                name.push_str("_d");
            }
        }
        name.to_lowercase()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_name(&self, name: &str) -> bool {
        super::same_name(&self.name, name)
    }

    /// Returns true if any key column is `column`.
    pub fn references_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| super::same_name(&c.name, column))
    }

    /// Returns true for a single ascending column UNIQUE on `column`.
    pub fn is_single_unique_on(&self, column: &str) -> bool {
        self.kind == ConstraintKind::Unique
            && self.columns.len() == 1
            && self.columns[0].order == SortOrder::Asc
            && super::same_name(&self.columns[0].name, column)
    }

    /// Rewrites key columns named `old` to `new`.
    pub fn rename_column(&mut self, old: &str, new: &str) {
        for column in &mut self.columns {
            if super::same_name(&column.name, old) {
                column.name = new.to_string();
            }
        }
    }

    /// Structural equality ignoring name case.
    pub fn same_definition(&self, other: &Constraint) -> bool {
        self.kind == other.kind
            && self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|(a, b)| a.order == b.order && super::same_name(&a.name, &b.name))
            && self.foreign_key == other.foreign_key
    }
}
