//! Edit session for one class.
//!
//! Every edit is applied to a staged copy of the schema, re-flattened against
//! the catalog and only then swapped in, so a rejected edit leaves the session
//! exactly as it was.

use tracing::{debug, warn};

use crate::catalog::SchemaCatalog;
use crate::change_log::{ChangeKind, ChangeLog, ChangeLogEntry};
use crate::config::PlannerConfig;
use crate::ddl::{DdlPlan, DdlSynthesizer};
use crate::error::SchemaError;
use crate::identifier::{DefaultIdentifierValidator, IdentifierValidator};
use crate::inheritance::{
    column_conflicts, fire_resolution_changed, fire_super_class_changed, next_resolution,
    super_classes, ColumnConflict,
};
use crate::schema::{
    is_in_super_classes, same_name, Attribute, AttributeScope, Constraint, ConstraintKind,
    Resolution, SchemaInfo,
};

/// Flags a primary key set on one of its columns.
#[derive(Debug, Clone)]
struct PkFlag {
    column: String,
    not_null: bool,
    unique: bool,
}

pub struct EditSession<'a, C: SchemaCatalog + ?Sized> {
    config: &'a PlannerConfig,
    catalog: &'a C,
    validator: Box<dyn IdentifierValidator + 'a>,
    old: Option<SchemaInfo>,
    new: SchemaInfo,
    log: ChangeLog,
    /// `None` when the primary key predates the session
    pk_flags: Option<Vec<PkFlag>>,
}

fn unique_names(schema: &SchemaInfo, column: &str) -> Vec<String> {
    schema
        .constraints
        .iter()
        .filter(|c| c.is_single_unique_on(column))
        .map(|c| c.name.clone())
        .collect()
}

/// Adds a single-column UNIQUE unless the column is already unique.
fn add_unique(staged: &mut SchemaInfo, column: &str) -> Result<Option<String>, SchemaError> {
    if staged.is_attribute_unique(column) {
        return Ok(None);
    }
    let mut constraint = Constraint::new("", ConstraintKind::Unique, [column]);
    constraint.name = constraint.default_name(&staged.class_name);
    let name = constraint.name.clone();
    staged.add_constraint(constraint)?;
    Ok(Some(name))
}

/// Clears the flags a removed primary key had set.
///
/// Without a record (key loaded from the server) the key is taken to have set
/// NOT NULL, plus UNIQUE when it had a single column.
fn reset_pk_flags(
    staged: &mut SchemaInfo,
    pk: &Constraint,
    recorded: Option<&[PkFlag]>,
    edited: &mut Vec<String>,
) {
    let single = pk.columns.len() == 1;
    let class_name = staged.class_name.clone();
    for column in &pk.columns {
        let (reset_not_null, reset_unique) = match recorded {
            Some(flags) => flags
                .iter()
                .find(|f| same_name(&f.column, &column.name))
                .map_or((false, false), |f| (f.not_null, f.unique)),
            None => (true, single),
        };
        let still_unique = staged.is_attribute_unique(&column.name);
        let Some(attribute) = staged
            .attribute_mut(&column.name, AttributeScope::Instance)
            .filter(|a| a.is_defined_by(&class_name))
        else {
            continue;
        };

        let mut changed = false;
        if reset_not_null && attribute.not_null {
            attribute.not_null = false;
            changed = true;
        }
        if reset_unique && attribute.unique && !still_unique {
            attribute.unique = false;
            changed = true;
        }
        if changed {
            edited.push(attribute.name.clone());
        }
    }
}

impl<'a, C: SchemaCatalog + ?Sized> EditSession<'a, C> {
    /// Starts a session that creates a new class.
    ///
    /// # Arguments
    /// * `config` - Planner configuration
    /// * `catalog` - Lookup for super classes and foreign key targets
    /// * `class_name` - Name of the class to create
    /// * `owner` - Owner of the new class
    ///
    /// # Returns
    /// `Result<Self, SchemaError>`, failing on an illegal class name.
    pub fn create(
        config: &'a PlannerConfig,
        catalog: &'a C,
        class_name: &str,
        owner: &str,
    ) -> Result<Self, SchemaError> {
        let session = Self {
            config,
            catalog,
            validator: Box::new(DefaultIdentifierValidator),
            old: None,
            new: SchemaInfo::new(class_name, owner),
            log: ChangeLog::for_new_table(),
            pk_flags: Some(Vec::new()),
        };
        session.check_identifier(class_name)?;
        debug!(class = class_name, "Create session started");
        Ok(session)
    }

    /// Starts a session that alters `old`.
    pub fn alter(config: &'a PlannerConfig, catalog: &'a C, old: SchemaInfo) -> Self {
        debug!(class = %old.class_name, "Alter session started");
        Self {
            config,
            catalog,
            validator: Box::new(DefaultIdentifierValidator),
            new: old.clone(),
            old: Some(old),
            log: ChangeLog::new(),
            pk_flags: None,
        }
    }

    /// Replaces the identifier validator.
    pub fn with_validator(mut self, validator: impl IdentifierValidator + 'a) -> Self {
        self.validator = Box::new(validator);
        self
    }

    pub fn config(&self) -> &PlannerConfig {
        self.config
    }

    /// Definition being edited.
    pub fn schema(&self) -> &SchemaInfo {
        &self.new
    }

    /// Committed definition, `None` for a new class.
    pub fn old_schema(&self) -> Option<&SchemaInfo> {
        self.old.as_ref()
    }

    pub fn change_log(&self) -> &ChangeLog {
        &self.log
    }

    pub fn is_new_table(&self) -> bool {
        self.old.is_none()
    }

    pub fn into_schema(self) -> SchemaInfo {
        self.new
    }

    /// Column conflicts of the edited class in `scope`.
    pub fn conflicts(&self, scope: AttributeScope) -> Result<Vec<ColumnConflict>, SchemaError> {
        column_conflicts(self.catalog, &self.new, &self.new.super_classes, scope)
    }

    fn check_identifier(&self, name: &str) -> Result<(), SchemaError> {
        self.validator
            .check(name, self.config.allow_multibyte_identifiers)
            .map_err(|e| {
                warn!(name, error = %e, "Identifier rejected");
                e
            })
    }

    fn supers(&self) -> Result<Vec<SchemaInfo>, SchemaError> {
        super_classes(self.catalog, &self.new.super_classes)
    }

    fn reflatten(&self, staged: &mut SchemaInfo) -> Result<(), SchemaError> {
        let supers = staged.super_classes.clone();
        fire_super_class_changed(self.catalog, self.old.as_ref(), staged, &supers)
    }

    /// Adds a local attribute; a unique flag adds its single-column UNIQUE.
    pub fn add_attribute(&mut self, mut attribute: Attribute) -> Result<(), SchemaError> {
        self.check_identifier(&attribute.name)?;
        attribute.inherit = self.new.class_name.clone();
        attribute.validate(&self.config.type_table)?;
        let scope = attribute.scope;
        let name = attribute.name.clone();
        let unique = attribute.unique && scope == AttributeScope::Instance;

        let mut staged = self.new.clone();
        staged.add_attribute(attribute)?;
        let unique_name = if unique {
            add_unique(&mut staged, &name)?
        } else {
            None
        };
        self.reflatten(&mut staged)?;

        self.new = staged;
        self.log
            .add(ChangeLogEntry::added(name.as_str(), ChangeKind::for_scope(scope)));
        if let Some(unique_name) = unique_name {
            self.log.add(ChangeLogEntry::added(unique_name, ChangeKind::Index));
        }
        debug!(class = %self.new.class_name, attribute = %name, "Attribute added");
        Ok(())
    }

    /// Replaces a local attribute.
    ///
    /// Only attributes added in this session may move to another scope.
    ///
    /// # Arguments
    /// * `old_name` - Current name of the attribute
    /// * `scope` - Current scope of the attribute
    /// * `attribute` - New definition
    pub fn edit_attribute(
        &mut self,
        old_name: &str,
        scope: AttributeScope,
        mut attribute: Attribute,
    ) -> Result<(), SchemaError> {
        let class_name = self.new.class_name.clone();
        let before = self
            .new
            .attribute(old_name, scope)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownAttribute {
                class: class_name.clone(),
                attribute: old_name.to_string(),
            })?;
        if !before.is_defined_by(&class_name) {
            warn!(class = %class_name, attribute = old_name, "Edit of inherited attribute rejected");
            return Err(SchemaError::InheritedEdit {
                attribute: before.name,
                defined_in: before.inherit,
            });
        }
        self.check_identifier(&attribute.name)?;
        attribute.inherit = class_name.clone();
        attribute.validate(&self.config.type_table)?;
        let moved = attribute.scope != scope;
        if moved && !self.log.is_new_added(old_name, scope) {
            return Err(SchemaError::ScopeChange {
                attribute: before.name,
            });
        }
        let duplicate = !same_name(&before.name, &attribute.name)
            && self
                .new
                .attribute(&attribute.name, attribute.scope)
                .is_some_and(|a| a.is_defined_by(&class_name));
        if duplicate {
            return Err(SchemaError::DuplicateAttribute {
                class: class_name,
                attribute: attribute.name,
            });
        }

        let mut staged = self.new.clone();
        let mut index_entries = Vec::new();
        if moved {
            if scope == AttributeScope::Instance {
                for name in unique_names(&staged, &before.name) {
                    index_entries.push(ChangeLogEntry::dropped(name, ChangeKind::Index));
                }
            }
            staged.remove_attribute(old_name, scope)?;
            staged.add_attribute(attribute.clone())?;
            if attribute.unique && attribute.scope == AttributeScope::Instance {
                if let Some(name) = add_unique(&mut staged, &attribute.name)? {
                    index_entries.push(ChangeLogEntry::added(name, ChangeKind::Index));
                }
            }
        } else {
            let supers = self.supers()?;
            staged.replace_attribute(old_name, attribute.clone(), scope, &supers)?;
            if scope == AttributeScope::Instance && attribute.unique != before.unique {
                if attribute.unique {
                    if let Some(name) = add_unique(&mut staged, &attribute.name)? {
                        index_entries.push(ChangeLogEntry::added(name, ChangeKind::Index));
                    }
                } else {
                    for name in unique_names(&staged, &attribute.name) {
                        index_entries.push(ChangeLogEntry::dropped(name, ChangeKind::Index));
                    }
                    staged.remove_unique_by_attribute(&attribute.name);
                }
            }
        }
        self.reflatten(&mut staged)?;

        self.new = staged;
        if moved {
            self.log
                .add(ChangeLogEntry::dropped(old_name, ChangeKind::for_scope(scope)));
            self.log.add(ChangeLogEntry::added(
                attribute.name.as_str(),
                ChangeKind::for_scope(attribute.scope),
            ));
        } else {
            if scope == AttributeScope::Instance {
                if let Some(flags) = self.pk_flags.as_mut() {
                    for flag in flags.iter_mut().filter(|f| same_name(&f.column, old_name)) {
                        flag.column = attribute.name.clone();
                    }
                }
            }
            self.log.add(ChangeLogEntry::edited(
                old_name,
                attribute.name.as_str(),
                ChangeKind::for_scope(scope),
            ));
        }
        for entry in index_entries {
            self.log.add(entry);
        }
        debug!(class = %self.new.class_name, from = old_name, to = %attribute.name, "Attribute edited");
        Ok(())
    }

    /// Drops a local attribute with the local constraints on it.
    pub fn drop_attribute(&mut self, name: &str, scope: AttributeScope) -> Result<(), SchemaError> {
        let supers = self.supers()?;
        let mut staged = self.new.clone();
        let dependent: Vec<Constraint> = if scope == AttributeScope::Instance {
            staged
                .constraints
                .iter()
                .filter(|c| c.references_column(name) && !is_in_super_classes(&supers, c))
                .cloned()
                .collect()
        } else {
            Vec::new()
        };

        let removed = staged.remove_attribute(name, scope).map_err(|e| {
            warn!(class = %self.new.class_name, attribute = name, error = %e, "Drop rejected");
            e
        })?;
        let mut entries = Vec::new();
        let mut edited = Vec::new();
        for constraint in &dependent {
            staged
                .constraints
                .retain(|c| !(c.kind == constraint.kind && c.has_name(&constraint.name)));
            match constraint.kind {
                ConstraintKind::PrimaryKey => {
                    reset_pk_flags(&mut staged, constraint, self.pk_flags.as_deref(), &mut edited);
                }
                ConstraintKind::ForeignKey => {
                    entries.push(ChangeLogEntry::dropped(
                        constraint.name.as_str(),
                        ChangeKind::ForeignKey,
                    ));
                }
                _ => entries.push(ChangeLogEntry::dropped(
                    constraint.name.as_str(),
                    ChangeKind::Index,
                )),
            }
        }
        self.reflatten(&mut staged)?;

        let dropped_pk = dependent
            .iter()
            .any(|c| c.kind == ConstraintKind::PrimaryKey);
        self.new = staged;
        if dropped_pk {
            self.pk_flags = Some(Vec::new());
        }
        self.log.add(ChangeLogEntry::dropped(
            removed.name.as_str(),
            ChangeKind::for_scope(scope),
        ));
        for entry in entries {
            self.log.add(entry);
        }
        for column in edited {
            self.log.add(ChangeLogEntry::edited(
                column.as_str(),
                column.as_str(),
                ChangeKind::Attribute,
            ));
        }
        debug!(class = %self.new.class_name, attribute = %removed.name, "Attribute dropped");
        Ok(())
    }

    /// Sets the primary key, replacing the local one.
    ///
    /// A single column key sets NOT NULL and UNIQUE on its column, a composite
    /// key sets NOT NULL on each column.
    pub fn set_primary_key<S: AsRef<str>>(&mut self, columns: &[S]) -> Result<(), SchemaError> {
        if columns.is_empty() {
            return Err(SchemaError::EmptyPrimaryKey {
                class: self.new.class_name.clone(),
            });
        }
        let supers = self.supers()?;
        let mut staged = self.new.clone();
        let mut edited = Vec::new();
        if let Some(existing) = staged.primary_key(&supers).cloned() {
            staged.remove_constraint(&existing.name, ConstraintKind::PrimaryKey, &supers)?;
            reset_pk_flags(&mut staged, &existing, self.pk_flags.as_deref(), &mut edited);
        }

        let mut constraint = Constraint::primary_key("", columns.iter().map(|c| c.as_ref()));
        constraint.name = constraint.default_name(&staged.class_name);
        staged.add_constraint(constraint.clone())?;

        let single = constraint.columns.len() == 1;
        let class_name = staged.class_name.clone();
        let mut flags = Vec::new();
        for column in &constraint.columns {
            let Some(attribute) = staged
                .attribute_mut(&column.name, AttributeScope::Instance)
                .filter(|a| a.is_defined_by(&class_name))
            else {
                continue;
            };
            let flag = PkFlag {
                column: attribute.name.clone(),
                not_null: !attribute.not_null,
                unique: single && !attribute.unique,
            };
            attribute.not_null = true;
            if single {
                attribute.unique = true;
            }
            if flag.not_null || flag.unique {
                edited.push(attribute.name.clone());
            }
            flags.push(flag);
        }

        self.new = staged;
        self.pk_flags = Some(flags);
        for column in edited {
            self.log.add(ChangeLogEntry::edited(
                column.as_str(),
                column.as_str(),
                ChangeKind::Attribute,
            ));
        }
        debug!(class = %self.new.class_name, key = %constraint.name, "Primary key set");
        Ok(())
    }

    /// Removes the local primary key and the flags it set.
    pub fn drop_primary_key(&mut self) -> Result<Constraint, SchemaError> {
        let supers = self.supers()?;
        let mut staged = self.new.clone();
        let existing = staged
            .constraints
            .iter()
            .find(|c| c.kind == ConstraintKind::PrimaryKey)
            .cloned()
            .ok_or_else(|| SchemaError::ConstraintNotFound {
                class: staged.class_name.clone(),
                constraint: "PRIMARY KEY".to_string(),
            })?;
        let removed = staged
            .remove_constraint(&existing.name, ConstraintKind::PrimaryKey, &supers)
            .map_err(|e| {
                warn!(class = %self.new.class_name, error = %e, "Primary key drop rejected");
                e
            })?;
        let mut edited = Vec::new();
        reset_pk_flags(&mut staged, &removed, self.pk_flags.as_deref(), &mut edited);

        self.new = staged;
        self.pk_flags = Some(Vec::new());
        for column in edited {
            self.log.add(ChangeLogEntry::edited(
                column.as_str(),
                column.as_str(),
                ChangeKind::Attribute,
            ));
        }
        Ok(removed)
    }

    /// Adds a foreign key; an empty name gets the server default.
    pub fn add_foreign_key(&mut self, mut constraint: Constraint) -> Result<(), SchemaError> {
        let Some(target) = constraint
            .foreign_key
            .as_ref()
            .filter(|_| constraint.kind == ConstraintKind::ForeignKey)
        else {
            return Err(SchemaError::WrongConstraintKind {
                constraint: constraint.name,
                expected: "a foreign key",
            });
        };
        let self_reference = same_name(&target.referenced_class, &self.new.class_name);
        if !self_reference && self.catalog.schema_info(&target.referenced_class).is_none() {
            return Err(SchemaError::UnknownClass {
                class: target.referenced_class.clone(),
            });
        }
        if constraint.name.is_empty() {
            constraint.name = constraint.default_name(&self.new.class_name);
        }
        self.check_identifier(&constraint.name)?;

        let name = constraint.name.clone();
        let mut staged = self.new.clone();
        staged.add_constraint(constraint)?;
        self.new = staged;
        self.log
            .add(ChangeLogEntry::added(name, ChangeKind::ForeignKey));
        Ok(())
    }

    pub fn drop_foreign_key(&mut self, name: &str) -> Result<Constraint, SchemaError> {
        let supers = self.supers()?;
        let removed = self
            .new
            .remove_constraint(name, ConstraintKind::ForeignKey, &supers)?;
        self.log.add(ChangeLogEntry::dropped(
            removed.name.as_str(),
            ChangeKind::ForeignKey,
        ));
        Ok(removed)
    }

    /// Adds a UNIQUE, index, reverse index or reverse unique.
    pub fn add_index(&mut self, mut constraint: Constraint) -> Result<(), SchemaError> {
        if !constraint.kind.is_index_like() {
            return Err(SchemaError::WrongConstraintKind {
                constraint: constraint.name,
                expected: "an index",
            });
        }
        if constraint.name.is_empty() {
            constraint.name = constraint.default_name(&self.new.class_name);
        }
        self.check_identifier(&constraint.name)?;

        let name = constraint.name.clone();
        let single_unique = constraint
            .columns
            .first()
            .filter(|c| constraint.is_single_unique_on(&c.name))
            .map(|c| c.name.clone());
        let mut staged = self.new.clone();
        staged.add_constraint(constraint)?;
        if let Some(column) = single_unique {
            if let Some(attribute) = staged.attribute_mut(&column, AttributeScope::Instance) {
                attribute.unique = true;
            }
        }
        self.new = staged;
        self.log.add(ChangeLogEntry::added(name, ChangeKind::Index));
        Ok(())
    }

    pub fn drop_index(&mut self, name: &str, kind: ConstraintKind) -> Result<Constraint, SchemaError> {
        if !kind.is_index_like() {
            return Err(SchemaError::WrongConstraintKind {
                constraint: name.to_string(),
                expected: "an index",
            });
        }
        let supers = self.supers()?;
        let mut staged = self.new.clone();
        let removed = staged.remove_constraint(name, kind, &supers).map_err(|e| {
            warn!(class = %self.new.class_name, index = name, error = %e, "Index drop rejected");
            e
        })?;
        if let Some(column) = removed.columns.first() {
            if removed.is_single_unique_on(&column.name) {
                let still_unique = staged.is_attribute_unique(&column.name);
                if let Some(attribute) = staged.attribute_mut(&column.name, AttributeScope::Instance) {
                    attribute.unique = still_unique;
                }
            }
        }
        self.new = staged;
        self.log
            .add(ChangeLogEntry::dropped(removed.name.as_str(), ChangeKind::Index));
        Ok(removed)
    }

    /// Replaces the super class list; on failure the previous list stays.
    pub fn set_super_classes(&mut self, supers: Vec<String>) -> Result<(), SchemaError> {
        let mut staged = self.new.clone();
        fire_super_class_changed(self.catalog, self.old.as_ref(), &mut staged, &supers)?;
        self.new = staged;
        Ok(())
    }

    /// Adds a resolution for a conflicting attribute.
    ///
    /// A pick-one resolution replaces the previous pick for the same name;
    /// an alias resolution is added next to it.
    pub fn add_resolution(&mut self, resolution: Resolution) -> Result<(), SchemaError> {
        if let Some(alias) = &resolution.alias {
            self.check_identifier(alias)?;
        }
        let scope = resolution.scope;
        let conflicts = self.conflicts(scope)?;
        if !conflicts
            .iter()
            .any(|c| resolution.matches(&c.name, &c.class_name))
        {
            return Err(SchemaError::ResolutionNotFound {
                attribute: resolution.name,
                super_class: resolution.class_name,
            });
        }

        let mut staged = self.new.clone();
        let list = staged.resolutions_of_mut(scope);
        if resolution.is_alias() {
            list.retain(|r| !(r.is_alias() && r.matches(&resolution.name, &resolution.class_name)));
        } else {
            list.retain(|r| r.is_alias() || !same_name(&r.name, &resolution.name));
        }
        list.push(resolution);
        fire_resolution_changed(self.catalog, self.old.as_ref(), &mut staged, scope)?;
        self.new = staged;
        Ok(())
    }

    /// Removes a resolution.
    ///
    /// # Returns
    /// The resolution installed in place of a removed pick-one resolution.
    pub fn remove_resolution(
        &mut self,
        name: &str,
        class_name: &str,
        scope: AttributeScope,
    ) -> Result<Option<Resolution>, SchemaError> {
        let mut staged = self.new.clone();
        let list = staged.resolutions_of_mut(scope);
        let index = list
            .iter()
            .position(|r| r.matches(name, class_name))
            .ok_or_else(|| SchemaError::ResolutionNotFound {
                attribute: name.to_string(),
                super_class: class_name.to_string(),
            })?;
        let removed = list.remove(index);

        let mut replacement = None;
        if !removed.is_alias() {
            let conflicts = column_conflicts(self.catalog, &staged, &staged.super_classes, scope)?;
            replacement = next_resolution(staged.resolutions_of(scope), &removed, &conflicts);
            if let Some(next) = &replacement {
                staged.resolutions_of_mut(scope).push(next.clone());
            }
        }
        fire_resolution_changed(self.catalog, self.old.as_ref(), &mut staged, scope)?;
        self.new = staged;
        Ok(replacement)
    }

    pub fn rename_class(&mut self, name: &str) -> Result<(), SchemaError> {
        self.check_identifier(name)?;
        self.new.set_class_name(name);
        Ok(())
    }

    pub fn set_owner(&mut self, owner: &str) {
        self.new.owner = owner.to_string();
    }

    /// Statements and admin requests that apply the session.
    pub fn plan(&self) -> Result<DdlPlan, SchemaError> {
        DdlSynthesizer::new(self.config, self.catalog).synthesize(
            self.old.as_ref(),
            &self.new,
            &self.log,
        )
    }
}
