//! Turns an old and a new snapshot of a class into an ordered DDL plan.

use tracing::debug;

use super::plan::{AdminRequest, DdlPlan};
use super::statement::{AlterAction, ColumnDef, CreateClass, DdlStatement};
use crate::catalog::SchemaCatalog;
use crate::change_log::{needs_not_null_request, ChangeLog};
use crate::config::PlannerConfig;
use crate::error::SchemaError;
use crate::inheritance::{
    check_cycles, resolution_changes, super_class_changes, super_classes,
};
use crate::schema::{
    is_in_super_classes, same_name, Attribute, AttributeScope, AttributeValue, Constraint,
    ConstraintKind, SchemaInfo,
};

/// Position of a constraint kind in CREATE TABLE and in the alter diff.
fn constraint_group(kind: ConstraintKind) -> usize {
    match kind {
        ConstraintKind::PrimaryKey => 0,
        ConstraintKind::Unique
        | ConstraintKind::Index
        | ConstraintKind::ReverseIndex
        | ConstraintKind::ReverseUnique => 1,
        ConstraintKind::ForeignKey => 2,
    }
}

/// Finer ordering inside CREATE TABLE: UNIQUE before the index kinds.
fn create_rank(kind: ConstraintKind) -> usize {
    match kind {
        ConstraintKind::PrimaryKey => 0,
        ConstraintKind::Unique => 1,
        ConstraintKind::Index | ConstraintKind::ReverseIndex | ConstraintKind::ReverseUnique => 2,
        ConstraintKind::ForeignKey => 3,
    }
}

/// Names touched while walking the change log.
#[derive(Default)]
struct Handled {
    old: Vec<(AttributeScope, String)>,
    new: Vec<(AttributeScope, String)>,
}

fn contains(list: &[(AttributeScope, String)], scope: AttributeScope, name: &str) -> bool {
    list.iter().any(|(s, n)| *s == scope && same_name(n, name))
}

/// Instance attribute renames recorded in the log, old name to new name.
fn attribute_renames(log: &ChangeLog) -> Vec<(String, String)> {
    log.attribute_entries()
        .filter(|e| e.kind.scope() == Some(AttributeScope::Instance))
        .filter_map(|e| match (&e.old, &e.new) {
            (Some(from), Some(to)) if from != to => Some((from.clone(), to.clone())),
            _ => None,
        })
        .collect()
}

fn apply_renames(mut constraint: Constraint, renames: &[(String, String)]) -> Constraint {
    for column in &mut constraint.columns {
        if let Some((_, to)) = renames.iter().find(|(from, _)| same_name(from, &column.name)) {
            column.name = to.clone();
        }
    }
    constraint
}

fn has_same(constraint: &Constraint, others: &[&Constraint]) -> bool {
    others.iter().any(|o| {
        o.kind == constraint.kind && o.has_name(&constraint.name) && o.same_definition(constraint)
    })
}

fn drop_statement(table: &str, constraint: &Constraint) -> DdlStatement {
    if constraint.kind.is_index_like() && constraint.kind != ConstraintKind::Unique {
        DdlStatement::DropIndex {
            table: table.to_string(),
            name: constraint.name.clone(),
            kind: constraint.kind,
        }
    } else {
        DdlStatement::alter(
            table,
            AlterAction::DropConstraint {
                name: constraint.name.clone(),
            },
        )
    }
}

fn add_statement(table: &str, constraint: Constraint) -> DdlStatement {
    if constraint.kind.is_index_like() && constraint.kind != ConstraintKind::Unique {
        DdlStatement::CreateIndex {
            table: table.to_string(),
            index: constraint,
        }
    } else {
        DdlStatement::alter(table, AlterAction::AddConstraint(constraint))
    }
}

/// Builds DDL plans against a catalog.
pub struct DdlSynthesizer<'a, C: SchemaCatalog + ?Sized> {
    config: &'a PlannerConfig,
    catalog: &'a C,
}

impl<'a, C: SchemaCatalog + ?Sized> DdlSynthesizer<'a, C> {
    pub fn new(config: &'a PlannerConfig, catalog: &'a C) -> Self {
        Self { config, catalog }
    }

    /// Computes the statements that turn `old` into `new`.
    ///
    /// # Arguments
    /// * `old` - Committed definition, `None` for a class being created
    /// * `new` - Edited definition
    /// * `log` - Change log of the edit session
    ///
    /// # Returns
    /// `Result<DdlPlan, SchemaError>`; validation failures produce no plan.
    pub fn synthesize(
        &self,
        old: Option<&SchemaInfo>,
        new: &SchemaInfo,
        log: &ChangeLog,
    ) -> Result<DdlPlan, SchemaError> {
        let supers = self.validate(old, new, log)?;
        let plan = match old {
            None => self.create_plan(new, &supers)?,
            Some(old) => self.alter_plan(old, new, &supers, log)?,
        };
        debug!(
            class = %new.class_name,
            statements = plan.statements.len(),
            admin_requests = plan.admin_requests.len(),
            "Synthesized plan"
        );
        Ok(plan)
    }

    fn validate(
        &self,
        old: Option<&SchemaInfo>,
        new: &SchemaInfo,
        log: &ChangeLog,
    ) -> Result<Vec<SchemaInfo>, SchemaError> {
        check_cycles(self.catalog, &new.class_name, &new.super_classes)?;
        let supers = super_classes(self.catalog, &new.super_classes)?;

        for constraint in &new.constraints {
            for column in &constraint.columns {
                if new.attribute(&column.name, AttributeScope::Instance).is_none() {
                    return Err(SchemaError::UnknownAttribute {
                        class: new.class_name.clone(),
                        attribute: column.name.clone(),
                    });
                }
            }
            if let Some(target) = &constraint.foreign_key {
                let known = same_name(&target.referenced_class, &new.class_name)
                    || self.catalog.schema_info(&target.referenced_class).is_some();
                if !known {
                    return Err(SchemaError::UnknownClass {
                        class: target.referenced_class.clone(),
                    });
                }
            }
        }

        let Some(old) = old else {
            return Ok(supers);
        };
        for entry in log.attribute_entries().filter(|e| e.is_removal()) {
            let (Some(scope), Some(name)) = (entry.kind.scope(), entry.old.as_deref()) else {
                continue;
            };
            if let Some(attribute) = old.attribute(name, scope) {
                if !attribute.is_defined_by(&old.class_name) {
                    return Err(SchemaError::InheritedDrop {
                        class: old.class_name.clone(),
                        name: attribute.name.clone(),
                        defined_in: attribute.inherit.clone(),
                    });
                }
            }
        }
        for constraint in old.constraints.iter().filter(|c| c.kind.is_inherited()) {
            let Some(defining) = supers
                .iter()
                .find(|s| s.constraint_of_kind(&constraint.name, constraint.kind).is_some())
            else {
                continue;
            };
            if new
                .constraint_of_kind(&constraint.name, constraint.kind)
                .is_none()
            {
                return Err(SchemaError::InheritedDrop {
                    class: new.class_name.clone(),
                    name: constraint.name.clone(),
                    defined_in: defining.class_name.clone(),
                });
            }
        }
        Ok(supers)
    }

    fn rendered_value(&self, attribute: &Attribute) -> Result<AttributeValue, SchemaError> {
        let types = &self.config.type_table;
        Ok(match &attribute.value {
            AttributeValue::Default(raw) => {
                AttributeValue::Default(types.format_value(&attribute.data_type, raw)?)
            }
            AttributeValue::Shared(Some(raw)) => {
                AttributeValue::Shared(Some(types.format_value(&attribute.data_type, raw)?))
            }
            other => other.clone(),
        })
    }

    /// Validated column definition; UNIQUE is inlined only when no constraint carries it.
    fn column_def(&self, schema: &SchemaInfo, attribute: &Attribute) -> Result<ColumnDef, SchemaError> {
        attribute.validate(&self.config.type_table)?;
        Ok(ColumnDef {
            name: attribute.name.clone(),
            data_type: attribute.data_type.clone(),
            value: self.rendered_value(attribute)?,
            not_null: attribute.not_null,
            unique: attribute.unique
                && !attribute.scope.is_class()
                && !schema.is_attribute_unique(&attribute.name),
        })
    }

    /// Fills the referenced columns of a foreign key from the target's primary key.
    fn resolve_foreign_key(
        &self,
        schema: &SchemaInfo,
        constraint: Constraint,
    ) -> Result<Constraint, SchemaError> {
        let Some(target) = &constraint.foreign_key else {
            return Ok(constraint);
        };
        if !target.referenced_columns.is_empty() {
            return Ok(constraint);
        }

        let fetched;
        let referenced = if same_name(&target.referenced_class, &schema.class_name) {
            schema
        } else {
            fetched = self
                .catalog
                .schema_info(&target.referenced_class)
                .ok_or_else(|| SchemaError::UnknownClass {
                    class: target.referenced_class.clone(),
                })?;
            &fetched
        };
        let primary_key = referenced
            .constraints
            .iter()
            .find(|c| c.kind == ConstraintKind::PrimaryKey)
            .ok_or_else(|| SchemaError::MissingReferencedKey {
                class: referenced.class_name.clone(),
            })?;
        let columns: Vec<String> = primary_key
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut resolved = constraint.clone();
        if let Some(target) = resolved.foreign_key.as_mut() {
            target.referenced_columns = columns;
        }
        Ok(resolved)
    }

    fn create_plan(&self, new: &SchemaInfo, supers: &[SchemaInfo]) -> Result<DdlPlan, SchemaError> {
        let mut class_attributes = Vec::new();
        for attribute in new.local_attributes(AttributeScope::Class) {
            class_attributes.push(self.column_def(new, attribute)?);
        }
        let mut attributes = Vec::new();
        for attribute in new.local_attributes(AttributeScope::Instance) {
            attributes.push(self.column_def(new, attribute)?);
        }

        let mut constraints = Vec::new();
        for constraint in new
            .constraints
            .iter()
            .filter(|c| !is_in_super_classes(supers, c))
        {
            constraints.push(self.resolve_foreign_key(new, constraint.clone())?);
        }
        constraints.sort_by_key(|c| create_rank(c.kind));

        let mut resolutions = new.class_resolutions.clone();
        resolutions.extend(new.resolutions.iter().cloned());

        let mut plan = DdlPlan::default();
        plan.statements.push(DdlStatement::Create(CreateClass {
            name: new.class_name.clone(),
            kind: new.kind,
            supers: new.super_classes.clone(),
            class_attributes,
            attributes,
            constraints,
            resolutions,
            query_specs: new.query_specs.clone(),
        }));
        if !same_name(&new.owner, &self.config.creator) {
            plan.statements.push(DdlStatement::ChangeOwner {
                table: new.class_name.clone(),
                owner: new.owner.clone(),
            });
        }
        Ok(plan)
    }

    fn alter_plan(
        &self,
        old: &SchemaInfo,
        new: &SchemaInfo,
        supers: &[SchemaInfo],
        log: &ChangeLog,
    ) -> Result<DdlPlan, SchemaError> {
        let mut plan = DdlPlan::default();
        let table = new.class_name.as_str();

        if old.class_name != new.class_name {
            plan.statements.push(DdlStatement::RenameClass {
                from: old.class_name.clone(),
                to: new.class_name.clone(),
            });
        }

        let old_supers: Vec<SchemaInfo> = old
            .super_classes
            .iter()
            .filter_map(|name| self.catalog.schema_info(name))
            .collect();
        let renames = attribute_renames(log);
        let old_local: Vec<Constraint> = old
            .constraints
            .iter()
            .filter(|c| !is_in_super_classes(&old_supers, c))
            .map(|c| apply_renames(c.clone(), &renames))
            .collect();
        let new_local: Vec<&Constraint> = new
            .constraints
            .iter()
            .filter(|c| !is_in_super_classes(supers, c))
            .collect();

        // Constraints on columns about to disappear go first. A column the
        // log drops counts even when one of the same name is added back.
        let removed_in_log = |name: &str| {
            log.attribute_entries().any(|e| {
                e.is_removal()
                    && e.kind.scope() == Some(AttributeScope::Instance)
                    && e.old.as_deref().is_some_and(|o| same_name(o, name))
            })
        };
        let dropped_columns: Vec<String> = old
            .local_attributes(AttributeScope::Instance)
            .into_iter()
            .filter_map(|a| {
                if removed_in_log(&a.name) {
                    return Some(a.name.clone());
                }
                let name = renames
                    .iter()
                    .find(|(from, _)| same_name(from, &a.name))
                    .map_or_else(|| a.name.clone(), |(_, to)| to.clone());
                new.attribute(&name, AttributeScope::Instance)
                    .map_or(true, |a| !a.is_defined_by(&new.class_name))
                    .then_some(name)
            })
            .collect();
        let mut dropped_early: Vec<&str> = Vec::new();
        for constraint in &old_local {
            if dropped_columns.iter().any(|c| constraint.references_column(c)) {
                plan.statements.push(drop_statement(table, constraint));
                dropped_early.push(&constraint.name);
            }
        }
        debug!(class = %table, constraints = dropped_early.len(), "Dropped constraints of removed columns");

        let old_pk = old.primary_key(&old_supers);
        let new_pk = new.primary_key(supers);
        self.attribute_statements(&mut plan, old, new, log, old_pk, new_pk)?;

        let changes = super_class_changes(&old.super_classes, &new.super_classes);
        let mut resolutions = resolution_changes(&old.class_resolutions, &new.class_resolutions);
        resolutions.extend(resolution_changes(&old.resolutions, &new.resolutions));
        if !changes.removed.is_empty() {
            plan.statements.push(DdlStatement::alter(
                table,
                AlterAction::DropSuperclasses(changes.removed),
            ));
        }
        if !changes.added.is_empty() || !resolutions.is_empty() {
            plan.statements.push(DdlStatement::alter(
                table,
                AlterAction::AddSuperclasses {
                    supers: changes.added,
                    resolutions,
                },
            ));
        }

        let dropped_before = |c: &Constraint| dropped_early.iter().any(|n| same_name(n, &c.name));
        let old_refs: Vec<&Constraint> = old_local.iter().filter(|c| !dropped_before(*c)).collect();
        let mut drops: [Vec<&Constraint>; 3] = Default::default();
        let mut adds: [Vec<&Constraint>; 3] = Default::default();
        for constraint in old_refs.iter().copied() {
            if !has_same(constraint, &new_local) {
                drops[constraint_group(constraint.kind)].push(constraint);
            }
        }
        for constraint in &new_local {
            if !has_same(constraint, &old_refs) {
                adds[constraint_group(constraint.kind)].push(constraint);
            }
        }
        for (group_drops, group_adds) in drops.iter().zip(adds.iter()) {
            for constraint in group_drops {
                plan.statements.push(drop_statement(table, constraint));
            }
            for constraint in group_adds {
                let resolved = self.resolve_foreign_key(new, (*constraint).clone())?;
                plan.statements.push(add_statement(table, resolved));
            }
        }

        if !same_name(&old.owner, &new.owner) {
            plan.statements.push(DdlStatement::ChangeOwner {
                table: table.to_string(),
                owner: new.owner.clone(),
            });
        }
        Ok(plan)
    }

    /// Attribute statements in log order, then whatever the log missed.
    fn attribute_statements(
        &self,
        plan: &mut DdlPlan,
        old: &SchemaInfo,
        new: &SchemaInfo,
        log: &ChangeLog,
        old_pk: Option<&Constraint>,
        new_pk: Option<&Constraint>,
    ) -> Result<(), SchemaError> {
        let table = new.class_name.as_str();
        let old_local = |name: &str, scope| {
            old.attribute(name, scope)
                .filter(|a| a.is_defined_by(&old.class_name))
        };
        let new_local = |name: &str, scope| {
            new.attribute(name, scope)
                .filter(|a| a.is_defined_by(&new.class_name))
        };
        let mut handled = Handled::default();

        for entry in log.attribute_entries() {
            let Some(scope) = entry.kind.scope() else {
                continue;
            };
            match (entry.old.as_deref(), entry.new.as_deref()) {
                (None, Some(name)) => {
                    if old_local(name, scope).is_some() && !contains(&handled.old, scope, name) {
                        continue;
                    }
                    if let Some(after) = new_local(name, scope) {
                        plan.statements.push(DdlStatement::alter(
                            table,
                            AlterAction::AddAttribute {
                                scope,
                                column: self.column_def(new, after)?,
                            },
                        ));
                        handled.new.push((scope, after.name.clone()));
                    }
                }
                (Some(name), None) => {
                    if let Some(before) = old_local(name, scope) {
                        plan.statements.push(DdlStatement::alter(
                            table,
                            AlterAction::DropAttribute {
                                scope,
                                name: before.name.clone(),
                            },
                        ));
                        handled.old.push((scope, before.name.clone()));
                    }
                }
                (Some(from), Some(to)) => {
                    if let (Some(before), Some(after)) = (old_local(from, scope), new_local(to, scope)) {
                        self.edit_statements(plan, new, before, after, old_pk, new_pk)?;
                        handled.old.push((scope, before.name.clone()));
                        handled.new.push((scope, after.name.clone()));
                    }
                }
                (None, None) => {}
            }
        }

        for scope in AttributeScope::ALL {
            for before in old.local_attributes(scope) {
                if contains(&handled.old, scope, &before.name) {
                    continue;
                }
                match new_local(&before.name, scope) {
                    Some(after) if !contains(&handled.new, scope, &after.name) => {
                        self.edit_statements(plan, new, before, after, old_pk, new_pk)?;
                        handled.new.push((scope, after.name.clone()));
                    }
                    _ => plan.statements.push(DdlStatement::alter(
                        table,
                        AlterAction::DropAttribute {
                            scope,
                            name: before.name.clone(),
                        },
                    )),
                }
            }
            for after in new.local_attributes(scope) {
                if contains(&handled.new, scope, &after.name) {
                    continue;
                }
                plan.statements.push(DdlStatement::alter(
                    table,
                    AlterAction::AddAttribute {
                        scope,
                        column: self.column_def(new, after)?,
                    },
                ));
            }
        }
        Ok(())
    }

    fn edit_statements(
        &self,
        plan: &mut DdlPlan,
        new: &SchemaInfo,
        before: &Attribute,
        after: &Attribute,
        old_pk: Option<&Constraint>,
        new_pk: Option<&Constraint>,
    ) -> Result<(), SchemaError> {
        let types = &self.config.type_table;
        let table = new.class_name.as_str();
        let scope = after.scope;
        after.validate(types)?;

        if before.name != after.name {
            plan.statements.push(DdlStatement::alter(
                table,
                AlterAction::RenameAttribute {
                    scope,
                    from: before.name.clone(),
                    to: after.name.clone(),
                },
            ));
        }

        if before.needs_modify(after) {
            let mut column = self.column_def(new, after)?;
            column.unique = false;
            plan.statements.push(DdlStatement::alter(
                table,
                AlterAction::ModifyAttribute { scope, column },
            ));
            return Ok(());
        }

        if before.value != after.value {
            let value = match &after.value {
                AttributeValue::Default(raw) | AttributeValue::Shared(Some(raw)) => {
                    types.format_value(&after.data_type, raw)?
                }
                _ => "NULL".to_string(),
            };
            plan.statements.push(DdlStatement::alter(
                table,
                AlterAction::ChangeDefault {
                    scope,
                    name: after.name.clone(),
                    value,
                },
            ));
        }

        if needs_not_null_request(before, after, old_pk, new_pk) {
            plan.admin_requests.push(AdminRequest::UpdateAttribute {
                table: table.to_string(),
                column: after.name.clone(),
                not_null: after.not_null,
                unique: after.unique,
                default: after.default_value().map(str::to_string),
            });
        } else if before.not_null != after.not_null {
            debug!(column = %after.name, "NOT NULL needs no admin request");
        }
        Ok(())
    }
}
