//! Typed DDL statements and their CUBRID text.

use std::fmt;

use crate::schema::{
    AttributeScope, AttributeValue, ClassKind, Constraint, ConstraintKind, KeyColumn, Resolution,
    SortOrder,
};
use crate::types::DataType;

/// Column definition with literals already validated and rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
    pub value: AttributeValue,
    pub not_null: bool,
    /// Inline UNIQUE, used only when no constraint carries it
    pub unique: bool,
}

/// CREATE TABLE or CREATE VIEW.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateClass {
    pub name: String,
    pub kind: ClassKind,
    pub supers: Vec<String>,
    pub class_attributes: Vec<ColumnDef>,
    pub attributes: Vec<ColumnDef>,
    /// Ordered PK, UNIQUE, indexes, FK
    pub constraints: Vec<Constraint>,
    pub resolutions: Vec<Resolution>,
    pub query_specs: Vec<String>,
}

/// Action of an ALTER TABLE statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlterAction {
    AddAttribute {
        scope: AttributeScope,
        column: ColumnDef,
    },
    DropAttribute {
        scope: AttributeScope,
        name: String,
    },
    RenameAttribute {
        scope: AttributeScope,
        from: String,
        to: String,
    },
    /// Rendered literal, `NULL` to clear
    ChangeDefault {
        scope: AttributeScope,
        name: String,
        value: String,
    },
    ModifyAttribute {
        scope: AttributeScope,
        column: ColumnDef,
    },
    DropSuperclasses(Vec<String>),
    /// Empty `supers` renders a bare INHERIT clause
    AddSuperclasses {
        supers: Vec<String>,
        resolutions: Vec<Resolution>,
    },
    DropConstraint {
        name: String,
    },
    /// Primary key, UNIQUE or foreign key
    AddConstraint(Constraint),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DdlStatement {
    Create(CreateClass),
    RenameClass {
        from: String,
        to: String,
    },
    Alter {
        table: String,
        action: AlterAction,
    },
    /// Plain, reverse and reverse unique indexes
    CreateIndex {
        table: String,
        index: Constraint,
    },
    DropIndex {
        table: String,
        name: String,
        kind: ConstraintKind,
    },
    ChangeOwner {
        table: String,
        owner: String,
    },
}

impl DdlStatement {
    pub fn alter(table: &str, action: AlterAction) -> Self {
        DdlStatement::Alter {
            table: table.to_string(),
            action,
        }
    }
}

struct Ident<'a>(&'a str);

impl fmt::Display for Ident<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0)
    }
}

fn join<T, F>(items: &[T], f: &mut fmt::Formatter<'_>, mut each: F) -> fmt::Result
where
    F: FnMut(&T, &mut fmt::Formatter<'_>) -> fmt::Result,
{
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        each(item, f)?;
    }
    Ok(())
}

fn write_idents(names: &[String], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    join(names, f, |name, f| write!(f, "{}", Ident(name)))
}

fn write_key_columns(columns: &[KeyColumn], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("(")?;
    join(columns, f, |column, f| {
        write!(f, "{}", Ident(&column.name))?;
        if column.order == SortOrder::Desc {
            f.write_str(" DESC")?;
        }
        Ok(())
    })?;
    f.write_str(")")
}

fn write_resolutions(resolutions: &[Resolution], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("INHERIT ")?;
    join(resolutions, f, |r, f| {
        if r.scope.is_class() {
            f.write_str("CLASS ")?;
        }
        write!(f, "{} OF {}", Ident(&r.name), Ident(&r.class_name))?;
        if let Some(alias) = &r.alias {
            write!(f, " AS {}", Ident(alias))?;
        }
        Ok(())
    })
}

impl fmt::Display for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", Ident(&self.name), self.data_type)?;
        match &self.value {
            AttributeValue::Plain => {}
            AttributeValue::Default(value) => write!(f, " DEFAULT {}", value)?,
            AttributeValue::Shared(Some(value)) => write!(f, " SHARED {}", value)?,
            AttributeValue::Shared(None) => f.write_str(" SHARED")?,
            AttributeValue::AutoIncrement {
                seed: 1,
                increment: 1,
            } => f.write_str(" AUTO_INCREMENT")?,
            AttributeValue::AutoIncrement { seed, increment } => {
                write!(f, " AUTO_INCREMENT({},{})", seed, increment)?
            }
        }
        if self.not_null {
            f.write_str(" NOT NULL")?;
        }
        if self.unique {
            f.write_str(" UNIQUE")?;
        }
        Ok(())
    }
}

/// Constraint body as used after `ADD` or inside CREATE TABLE.
struct ConstraintClause<'a>(&'a Constraint);

impl fmt::Display for ConstraintClause<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.0;
        match c.kind {
            ConstraintKind::PrimaryKey => {
                write!(f, "CONSTRAINT {} PRIMARY KEY", Ident(&c.name))?;
                write_key_columns(&c.columns, f)
            }
            ConstraintKind::Unique => {
                write!(f, "CONSTRAINT {} UNIQUE", Ident(&c.name))?;
                write_key_columns(&c.columns, f)
            }
            ConstraintKind::Index => {
                write!(f, "INDEX {}", Ident(&c.name))?;
                write_key_columns(&c.columns, f)
            }
            ConstraintKind::ReverseIndex => {
                write!(f, "REVERSE INDEX {}", Ident(&c.name))?;
                write_key_columns(&c.columns, f)
            }
            ConstraintKind::ReverseUnique => {
                write!(f, "REVERSE UNIQUE {}", Ident(&c.name))?;
                write_key_columns(&c.columns, f)
            }
            ConstraintKind::ForeignKey => {
                write!(f, "CONSTRAINT {} FOREIGN KEY", Ident(&c.name))?;
                write_key_columns(&c.columns, f)?;
                if let Some(target) = &c.foreign_key {
                    write!(f, " REFERENCES {}(", Ident(&target.referenced_class))?;
                    write_idents(&target.referenced_columns, f)?;
                    write!(
                        f,
                        ") ON DELETE {} ON UPDATE {}",
                        target.on_delete, target.on_update
                    )?;
                    if let Some(cache) = &target.on_cache_object {
                        write!(f, " ON CACHE OBJECT {}", Ident(cache))?;
                    }
                }
                Ok(())
            }
        }
    }
}

fn index_keyword(kind: ConstraintKind) -> &'static str {
    match kind {
        ConstraintKind::ReverseIndex => "REVERSE INDEX",
        ConstraintKind::ReverseUnique => "REVERSE UNIQUE INDEX",
        ConstraintKind::Unique => "UNIQUE INDEX",
        _ => "INDEX",
    }
}

impl fmt::Display for CreateClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = match self.kind {
            ClassKind::Table => "TABLE",
            ClassKind::View => "VIEW",
        };
        write!(f, "CREATE {} {}", keyword, Ident(&self.name))?;
        if !self.supers.is_empty() {
            f.write_str(" UNDER ")?;
            write_idents(&self.supers, f)?;
        }
        if !self.class_attributes.is_empty() {
            f.write_str(" CLASS ATTRIBUTE (")?;
            join(&self.class_attributes, f, |c, f| write!(f, "{}", c))?;
            f.write_str(")")?;
        }
        if !self.attributes.is_empty() || !self.constraints.is_empty() {
            f.write_str(" (")?;
            join(&self.attributes, f, |c, f| write!(f, "{}", c))?;
            for (i, constraint) in self.constraints.iter().enumerate() {
                if i > 0 || !self.attributes.is_empty() {
                    f.write_str(", ")?;
                }
                write!(f, "{}", ConstraintClause(constraint))?;
            }
            f.write_str(")")?;
        }
        if !self.resolutions.is_empty() {
            f.write_str(" ")?;
            write_resolutions(&self.resolutions, f)?;
        }
        if self.kind == ClassKind::View && !self.query_specs.is_empty() {
            write!(f, " AS {}", self.query_specs.join(" UNION ALL "))?;
        }
        Ok(())
    }
}

impl fmt::Display for AlterAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlterAction::AddAttribute { scope, column } => match scope {
                AttributeScope::Instance => write!(f, "ADD COLUMN {}", column),
                AttributeScope::Class => write!(f, "ADD CLASS ATTRIBUTE {}", column),
            },
            AlterAction::DropAttribute { scope, name } => match scope {
                AttributeScope::Instance => write!(f, "DROP COLUMN {}", Ident(name)),
                AttributeScope::Class => write!(f, "DROP ATTRIBUTE CLASS {}", Ident(name)),
            },
            AlterAction::RenameAttribute { scope, from, to } => {
                f.write_str("RENAME ")?;
                if scope.is_class() {
                    f.write_str("CLASS ")?;
                }
                write!(f, "{} AS {}", Ident(from), Ident(to))
            }
            AlterAction::ChangeDefault { scope, name, value } => {
                f.write_str("CHANGE ")?;
                if scope.is_class() {
                    f.write_str("CLASS ")?;
                }
                write!(f, "{} DEFAULT {}", Ident(name), value)
            }
            AlterAction::ModifyAttribute { scope, column } => match scope {
                AttributeScope::Instance => write!(f, "MODIFY {}", column),
                AttributeScope::Class => write!(f, "MODIFY CLASS ATTRIBUTE {}", column),
            },
            AlterAction::DropSuperclasses(supers) => {
                f.write_str("DROP SUPERCLASS ")?;
                write_idents(supers, f)
            }
            AlterAction::AddSuperclasses {
                supers,
                resolutions,
            } => {
                if !supers.is_empty() {
                    f.write_str("ADD SUPERCLASS ")?;
                    write_idents(supers, f)?;
                    if !resolutions.is_empty() {
                        f.write_str(" ")?;
                    }
                }
                if !resolutions.is_empty() {
                    write_resolutions(resolutions, f)?;
                }
                Ok(())
            }
            AlterAction::DropConstraint { name } => write!(f, "DROP CONSTRAINT {}", Ident(name)),
            AlterAction::AddConstraint(constraint) => {
                write!(f, "ADD {}", ConstraintClause(constraint))
            }
        }
    }
}

impl fmt::Display for DdlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DdlStatement::Create(create) => write!(f, "{}", create),
            DdlStatement::RenameClass { from, to } => {
                write!(f, "RENAME CLASS {} AS {}", Ident(from), Ident(to))
            }
            DdlStatement::Alter { table, action } => {
                write!(f, "ALTER TABLE {} {}", Ident(table), action)
            }
            DdlStatement::CreateIndex { table, index } => {
                write!(
                    f,
                    "CREATE {} {} ON {}",
                    index_keyword(index.kind),
                    Ident(&index.name),
                    Ident(table)
                )?;
                write_key_columns(&index.columns, f)
            }
            DdlStatement::DropIndex { table, name, kind } => write!(
                f,
                "DROP {} {} ON {}",
                index_keyword(*kind),
                Ident(name),
                Ident(table)
            ),
            DdlStatement::ChangeOwner { table, owner } => write!(
                f,
                "CALL change_owner('{}', '{}') ON CLASS db_authorizations",
                table.replace('\'', "''"),
                owner.replace('\'', "''")
            ),
        }
    }
}
