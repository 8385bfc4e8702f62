//! Super class lookup, cycle detection and attribute name conflicts.

use std::collections::{HashSet, VecDeque};

use serde::Serialize;
use tracing::warn;

use crate::catalog::SchemaCatalog;
use crate::error::SchemaError;
use crate::schema::{same_name, AttributeScope, SchemaInfo};
use crate::types::DataType;

/// One contributor of a conflicting attribute name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnConflict {
    pub name: String,
    pub data_type: DataType,
    /// Direct super class the definition comes through
    pub class_name: String,
    /// Class that defines the attribute
    pub inherit: String,
}

/// Loads the direct super classes in declaration order.
///
/// # Returns
/// `Result<Vec<SchemaInfo>, SchemaError>` with `UnknownClass` for a name the
/// catalog does not know.
pub fn super_classes<C: SchemaCatalog + ?Sized>(
    catalog: &C,
    names: &[String],
) -> Result<Vec<SchemaInfo>, SchemaError> {
    names
        .iter()
        .map(|name| {
            catalog
                .schema_info(name)
                .ok_or_else(|| SchemaError::UnknownClass {
                    class: name.clone(),
                })
        })
        .collect()
}

/// Returns every ancestor of `schema`, breadth first in declaration order.
///
/// # Returns
/// `Result<Vec<SchemaInfo>, SchemaError>` with `CyclicInheritance` if the
/// super class graph loops, or `UnknownClass` for a missing ancestor.
pub fn ancestors<C: SchemaCatalog + ?Sized>(
    catalog: &C,
    schema: &SchemaInfo,
) -> Result<Vec<SchemaInfo>, SchemaError> {
    check_cycles(catalog, &schema.class_name, &schema.super_classes)?;

    let mut visited = HashSet::new();
    visited.insert(schema.class_name.to_lowercase());
    let mut queue: VecDeque<String> = schema.super_classes.iter().cloned().collect();
    let mut result = Vec::new();

    while let Some(name) = queue.pop_front() {
        if !visited.insert(name.to_lowercase()) {
            continue;
        }
        let ancestor = catalog
            .schema_info(&name)
            .ok_or(SchemaError::UnknownClass { class: name })?;
        queue.extend(ancestor.super_classes.iter().cloned());
        result.push(ancestor);
    }
    Ok(result)
}

/// Fails if `class_name` with `supers` as its super classes would be its
/// own ancestor.
pub fn check_cycles<C: SchemaCatalog + ?Sized>(
    catalog: &C,
    class_name: &str,
    supers: &[String],
) -> Result<(), SchemaError> {
    let mut path = vec![class_name.to_string()];
    let mut done = HashSet::new();
    visit(catalog, supers, &mut path, &mut done).map_err(|e| {
        if let SchemaError::CyclicInheritance { .. } = e {
            warn!(class = class_name, error = %e, "Rejected cyclic super class list");
        }
        e
    })
}

fn visit<C: SchemaCatalog + ?Sized>(
    catalog: &C,
    supers: &[String],
    path: &mut Vec<String>,
    done: &mut HashSet<String>,
) -> Result<(), SchemaError> {
    for name in supers {
        if let Some(start) = path.iter().position(|p| same_name(p, name)) {
            let mut cycle = path[start..].to_vec();
            cycle.push(name.clone());
            return Err(SchemaError::CyclicInheritance { path: cycle });
        }
        let key = name.to_lowercase();
        if done.contains(&key) {
            continue;
        }
        let schema = catalog
            .schema_info(name)
            .ok_or_else(|| SchemaError::UnknownClass {
                class: name.clone(),
            })?;
        path.push(schema.class_name.clone());
        visit(catalog, &schema.super_classes, path, done)?;
        path.pop();
        done.insert(key);
    }
    Ok(())
}

/// Computes the attribute name conflicts `schema` would have with
/// `candidate_supers` as its super classes.
///
/// # Arguments
/// * `catalog` - Lookup for the super classes
/// * `schema` - Class whose local attributes shadow inherited ones
/// * `candidate_supers` - Super class names in declaration order
/// * `scope` - Instance or class attributes
///
/// # Returns
/// One entry per contributor of every conflicting name. Groups appear in
/// first-seen order, contributors in super class order.
pub fn column_conflicts<C: SchemaCatalog + ?Sized>(
    catalog: &C,
    schema: &SchemaInfo,
    candidate_supers: &[String],
    scope: AttributeScope,
) -> Result<Vec<ColumnConflict>, SchemaError> {
    let supers = super_classes(catalog, candidate_supers)?;
    Ok(conflicts_among(schema, &supers, scope))
}

pub(crate) fn conflicts_among(
    schema: &SchemaInfo,
    supers: &[SchemaInfo],
    scope: AttributeScope,
) -> Vec<ColumnConflict> {
    let mut groups: Vec<Vec<ColumnConflict>> = Vec::new();

    for super_class in supers {
        for attribute in super_class.attributes_of(scope) {
            let contributor = ColumnConflict {
                name: attribute.name.clone(),
                data_type: attribute.data_type.clone(),
                class_name: super_class.class_name.clone(),
                inherit: attribute.inherit.clone(),
            };
            match groups
                .iter_mut()
                .find(|g| same_name(&g[0].name, &attribute.name))
            {
                // Same definer reached through two paths counts once
                Some(group) if group.iter().any(|c| same_name(&c.inherit, &attribute.inherit)) => {}
                Some(group) => group.push(contributor),
                None => groups.push(vec![contributor]),
            }
        }
    }

    groups
        .into_iter()
        .filter(|group| group.len() > 1 && !is_local(schema, &group[0].name, scope))
        .flatten()
        .collect()
}

pub(crate) fn is_local(schema: &SchemaInfo, name: &str, scope: AttributeScope) -> bool {
    schema
        .attribute(name, scope)
        .is_some_and(|a| a.is_defined_by(&schema.class_name))
}

/// Contributors of one conflicting name, in conflict order.
pub fn conflict_group<'a>(conflicts: &'a [ColumnConflict], name: &str) -> Vec<&'a ColumnConflict> {
    conflicts
        .iter()
        .filter(|c| same_name(&c.name, name))
        .collect()
}
