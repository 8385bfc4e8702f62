//! Re-flattening a class after its super classes or resolutions change.

use std::cmp::Ordering;

use serde::Serialize;
use tracing::{debug, warn};

use super::conflict::{check_cycles, conflicts_among, super_classes, ColumnConflict};
use super::resolution::reconcile_resolutions;
use crate::catalog::SchemaCatalog;
use crate::error::SchemaError;
use crate::schema::{
    is_in_super_classes, same_name, Attribute, AttributeScope, Resolution, SchemaInfo,
};

/// Super classes removed from and added to a class, in statement order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SuperClassChanges {
    pub removed: Vec<String>,
    pub added: Vec<String>,
}

impl SuperClassChanges {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

/// Diffs two super class lists, keeping declaration order meaningful.
///
/// A class that moves is removed and added again, since the server only
/// appends super classes.
pub fn super_class_changes(old: &[String], new: &[String]) -> SuperClassChanges {
    let mut changes = SuperClassChanges::default();
    let mut current: Vec<String> = old.to_vec();

    for (i, name) in new.iter().enumerate() {
        match current.iter().position(|c| same_name(c, name)) {
            None => {
                changes.removed.extend(current.drain(i.min(current.len())..));
                current.push(name.clone());
                changes.added.push(name.clone());
            }
            Some(index) if index > i => {
                changes.removed.extend(current.drain(i..index));
            }
            Some(_) => {}
        }
    }
    if current.len() > new.len() {
        changes.removed.extend(current.drain(new.len()..));
    }
    changes
}

/// Flattened result for one scope, applied only when every scope succeeded.
struct Flattened {
    scope: AttributeScope,
    attributes: Vec<Attribute>,
    resolutions: Vec<Resolution>,
}

/// Applies a new super class list to `new`.
///
/// Resolutions that no longer match a conflict are dropped, defaults are
/// added for unresolved conflicts (copied from `old` when possible), domain
/// compatibility is checked, and only then are the attribute lists,
/// inherited constraints, resolutions and super classes of `new` rewritten.
///
/// # Arguments
/// * `catalog` - Lookup for super classes and their ancestors
/// * `old` - Committed definition, if the class already exists
/// * `new` - Definition being edited
/// * `candidate_supers` - Requested super classes in declaration order
///
/// # Returns
/// `Result<(), SchemaError>`; on error `new` is left untouched.
pub fn fire_super_class_changed<C: SchemaCatalog + ?Sized>(
    catalog: &C,
    old: Option<&SchemaInfo>,
    new: &mut SchemaInfo,
    candidate_supers: &[String],
) -> Result<(), SchemaError> {
    check_cycles(catalog, &new.class_name, candidate_supers)?;
    let supers = super_classes(catalog, candidate_supers)?;

    let mut staged = Vec::with_capacity(2);
    for scope in AttributeScope::ALL {
        let flattened = flatten_scope(new, old, &supers, scope).map_err(|e| {
            warn!(class = %new.class_name, error = %e, "Super class change rejected");
            e
        })?;
        staged.push(flattened);
    }

    // Constraints inherited through the previous super classes go away
    let mut previous: Vec<SchemaInfo> = new
        .super_classes
        .iter()
        .filter_map(|name| catalog.schema_info(name))
        .collect();
    previous.extend(supers.iter().cloned());
    new.constraints
        .retain(|c| !is_in_super_classes(&previous, c));

    for flattened in staged {
        *new.attributes_of_mut(flattened.scope) = flattened.attributes;
        *new.resolutions_of_mut(flattened.scope) = flattened.resolutions;
    }
    new.super_classes = candidate_supers.to_vec();

    let class_name = new.class_name.clone();
    new.constraints.retain(|c| {
        let orphaned = c
            .columns
            .iter()
            .find(|k| !new_has_attribute(&new.attributes, &k.name));
        if let Some(column) = orphaned {
            warn!(class = %class_name, constraint = %c.name, column = %column.name, "Dropping constraint on removed attribute");
        }
        orphaned.is_none()
    });

    for super_class in &supers {
        for constraint in super_class.constraints.iter().filter(|c| c.kind.is_inherited()) {
            if new.constraint_of_kind(&constraint.name, constraint.kind).is_none() {
                new.constraints.push(constraint.clone());
            }
        }
    }

    debug!(
        class = %new.class_name,
        supers = ?new.super_classes,
        attributes = new.attributes.len(),
        "Applied super classes"
    );
    Ok(())
}

fn new_has_attribute(attributes: &[Attribute], name: &str) -> bool {
    attributes.iter().any(|a| a.has_name(name))
}

/// Re-flattens one scope of `new` after a resolution was added or removed.
pub fn fire_resolution_changed<C: SchemaCatalog + ?Sized>(
    catalog: &C,
    old: Option<&SchemaInfo>,
    new: &mut SchemaInfo,
    scope: AttributeScope,
) -> Result<(), SchemaError> {
    let supers = super_classes(catalog, &new.super_classes)?;
    let flattened = flatten_scope(new, old, &supers, scope)?;
    *new.attributes_of_mut(scope) = flattened.attributes;
    *new.resolutions_of_mut(scope) = flattened.resolutions;
    Ok(())
}

fn flatten_scope(
    schema: &SchemaInfo,
    old: Option<&SchemaInfo>,
    supers: &[SchemaInfo],
    scope: AttributeScope,
) -> Result<Flattened, SchemaError> {
    let conflicts = conflicts_among(schema, supers, scope);
    let resolutions = reconcile_resolutions(
        schema.resolutions_of(scope),
        old.map(|o| o.resolutions_of(scope)),
        &conflicts,
        scope,
    );
    check_compatibility(schema, supers, &conflicts, scope)?;
    let attributes = flatten(schema, supers, &conflicts, &resolutions, scope);
    Ok(Flattened {
        scope,
        attributes,
        resolutions,
    })
}

/// A local attribute may only widen what it overrides, and contributors of
/// a conflict must share a domain family.
fn check_compatibility(
    schema: &SchemaInfo,
    supers: &[SchemaInfo],
    conflicts: &[ColumnConflict],
    scope: AttributeScope,
) -> Result<(), SchemaError> {
    for local in schema.local_attributes(scope) {
        for super_class in supers {
            let Some(inherited) = super_class.attribute(&local.name, scope) else {
                continue;
            };
            match local.data_type.compare_domain(&inherited.data_type) {
                Some(Ordering::Equal | Ordering::Greater) => {}
                _ => {
                    return Err(SchemaError::IncompatibleOverride {
                        attribute: local.name.clone(),
                        local: local.data_type.to_string(),
                        inherited: inherited.data_type.to_string(),
                        super_class: super_class.class_name.clone(),
                    })
                }
            }
        }
    }

    for (i, first) in conflicts.iter().enumerate() {
        for other in conflicts[i + 1..]
            .iter()
            .filter(|c| same_name(&c.name, &first.name))
        {
            if first.data_type.compare_domain(&other.data_type).is_none() {
                return Err(SchemaError::IncompatibleInheritance {
                    attribute: first.name.clone(),
                    first: first.data_type.to_string(),
                    second: other.data_type.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Builds the attribute list: inherited winners in super class order,
/// aliased copies under their alias, then the local attributes.
fn flatten(
    schema: &SchemaInfo,
    supers: &[SchemaInfo],
    conflicts: &[ColumnConflict],
    resolutions: &[Resolution],
    scope: AttributeScope,
) -> Vec<Attribute> {
    let local: Vec<Attribute> = schema
        .local_attributes(scope)
        .into_iter()
        .cloned()
        .collect();
    let taken = |list: &[Attribute], name: &str| {
        list.iter().any(|a| a.has_name(name)) || local.iter().any(|a| a.has_name(name))
    };
    let mut result: Vec<Attribute> = Vec::new();

    for super_class in supers {
        for attribute in super_class.attributes_of(scope) {
            if local.iter().any(|l| l.has_name(&attribute.name)) {
                continue;
            }
            let conflicting = conflicts.iter().any(|c| same_name(&c.name, &attribute.name));
            if !conflicting {
                if !taken(&result, &attribute.name) {
                    result.push(attribute.clone());
                }
                continue;
            }

            let contributes = conflicts.iter().any(|c| {
                same_name(&c.name, &attribute.name)
                    && same_name(&c.class_name, &super_class.class_name)
            });
            if !contributes {
                continue;
            }
            for resolution in resolutions
                .iter()
                .filter(|r| r.matches(&attribute.name, &super_class.class_name))
            {
                let name = resolution.alias.as_deref().unwrap_or(&attribute.name);
                if taken(&result, name) {
                    continue;
                }
                let mut inherited = attribute.clone();
                inherited.name = name.to_string();
                result.push(inherited);
            }
        }
    }

    result.extend(local);
    result
}
