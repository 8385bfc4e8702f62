//! Flattened definition of one class.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::attribute::{Attribute, AttributeScope};
use super::constraint::{Constraint, ConstraintKind};
use super::resolution::Resolution;
use super::same_name;
use crate::error::SchemaError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    #[default]
    Table,
    View,
}

fn default_owner() -> String {
    "PUBLIC".to_string()
}

/// Definition of a class as seen by the editor.
///
/// Attribute lists are flattened: inherited attributes appear next to local
/// ones and are told apart by [`Attribute::inherit`]. `constraints` also holds
/// the constraints received from super classes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaInfo {
    pub class_name: String,
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(default)]
    pub kind: ClassKind,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub class_attributes: Vec<Attribute>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub super_classes: Vec<String>,
    #[serde(default)]
    pub resolutions: Vec<Resolution>,
    #[serde(default)]
    pub class_resolutions: Vec<Resolution>,
    /// SELECT statements of a view
    #[serde(default)]
    pub query_specs: Vec<String>,
}

impl SchemaInfo {
    /// Creates an empty table definition.
    pub fn new(class_name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            owner: owner.into(),
            kind: ClassKind::Table,
            attributes: Vec::new(),
            class_attributes: Vec::new(),
            constraints: Vec::new(),
            super_classes: Vec::new(),
            resolutions: Vec::new(),
            class_resolutions: Vec::new(),
            query_specs: Vec::new(),
        }
    }

    pub fn is_view(&self) -> bool {
        self.kind == ClassKind::View
    }

    pub fn attributes_of(&self, scope: AttributeScope) -> &[Attribute] {
        match scope {
            AttributeScope::Instance => &self.attributes,
            AttributeScope::Class => &self.class_attributes,
        }
    }

    pub fn attributes_of_mut(&mut self, scope: AttributeScope) -> &mut Vec<Attribute> {
        match scope {
            AttributeScope::Instance => &mut self.attributes,
            AttributeScope::Class => &mut self.class_attributes,
        }
    }

    pub fn resolutions_of(&self, scope: AttributeScope) -> &[Resolution] {
        match scope {
            AttributeScope::Instance => &self.resolutions,
            AttributeScope::Class => &self.class_resolutions,
        }
    }

    pub fn resolutions_of_mut(&mut self, scope: AttributeScope) -> &mut Vec<Resolution> {
        match scope {
            AttributeScope::Instance => &mut self.resolutions,
            AttributeScope::Class => &mut self.class_resolutions,
        }
    }

    /// Finds an attribute by case-insensitive name.
    pub fn attribute(&self, name: &str, scope: AttributeScope) -> Option<&Attribute> {
        self.attributes_of(scope).iter().find(|a| a.has_name(name))
    }

    pub fn attribute_mut(&mut self, name: &str, scope: AttributeScope) -> Option<&mut Attribute> {
        self.attributes_of_mut(scope)
            .iter_mut()
            .find(|a| a.has_name(name))
    }

    /// Attributes defined by this class.
    pub fn local_attributes(&self, scope: AttributeScope) -> Vec<&Attribute> {
        self.attributes_of(scope)
            .iter()
            .filter(|a| a.is_defined_by(&self.class_name))
            .collect()
    }

    /// Attributes received from super classes.
    pub fn inherited_attributes(&self, scope: AttributeScope) -> Vec<&Attribute> {
        self.attributes_of(scope)
            .iter()
            .filter(|a| !a.is_defined_by(&self.class_name))
            .collect()
    }

    /// Adds a local attribute to the list of its scope.
    ///
    /// An inherited attribute of the same name is replaced in place by the
    /// local definition.
    ///
    /// # Arguments
    /// * `attribute` - Attribute to add; its scope selects the list
    ///
    /// # Returns
    /// `Result<(), SchemaError>` with `DuplicateAttribute` if a local attribute
    /// of that name already exists.
    pub fn add_attribute(&mut self, attribute: Attribute) -> Result<(), SchemaError> {
        let class_name = self.class_name.clone();
        let list = self.attributes_of_mut(attribute.scope);
        match list.iter().position(|a| a.has_name(&attribute.name)) {
            Some(index) if list[index].is_defined_by(&class_name) => {
                Err(SchemaError::DuplicateAttribute {
                    class: class_name,
                    attribute: attribute.name,
                })
            }
            Some(index) => {
                debug!(attribute = %attribute.name, "Local attribute shadows inherited one");
                list[index] = attribute;
                Ok(())
            }
            None => {
                list.push(attribute);
                Ok(())
            }
        }
    }

    /// Removes a local attribute.
    ///
    /// Instance attributes also lose their single-column UNIQUE constraints.
    pub fn remove_attribute(
        &mut self,
        name: &str,
        scope: AttributeScope,
    ) -> Result<Attribute, SchemaError> {
        let class_name = self.class_name.clone();
        let list = self.attributes_of_mut(scope);
        let index = list
            .iter()
            .position(|a| a.has_name(name))
            .ok_or_else(|| SchemaError::UnknownAttribute {
                class: class_name.clone(),
                attribute: name.to_string(),
            })?;
        if !list[index].is_defined_by(&class_name) {
            return Err(SchemaError::InheritedDrop {
                class: class_name,
                name: name.to_string(),
                defined_in: list[index].inherit.clone(),
            });
        }
        let removed = list.remove(index);
        if scope == AttributeScope::Instance {
            self.remove_unique_by_attribute(&removed.name);
        }
        Ok(removed)
    }

    /// Replaces an attribute at its position.
    ///
    /// A rename is carried into the key columns of local constraints.
    ///
    /// # Arguments
    /// * `old_name` - Current name of the attribute
    /// * `attribute` - Replacement definition
    /// * `scope` - List holding the attribute
    /// * `supers` - Direct super classes, used to tell local constraints apart
    pub fn replace_attribute(
        &mut self,
        old_name: &str,
        attribute: Attribute,
        scope: AttributeScope,
        supers: &[SchemaInfo],
    ) -> Result<(), SchemaError> {
        let class_name = self.class_name.clone();
        let list = self.attributes_of_mut(scope);
        let index = list
            .iter()
            .position(|a| a.has_name(old_name))
            .ok_or_else(|| SchemaError::UnknownAttribute {
                class: class_name,
                attribute: old_name.to_string(),
            })?;
        let renamed = list[index].name != attribute.name;
        let new_name = attribute.name.clone();
        list[index] = attribute;

        if renamed && scope == AttributeScope::Instance {
            let inherited: Vec<bool> = self
                .constraints
                .iter()
                .map(|c| is_in_super_classes(supers, c))
                .collect();
            for (constraint, inherited) in self.constraints.iter_mut().zip(inherited) {
                if !inherited {
                    constraint.rename_column(old_name, &new_name);
                }
            }
        }
        Ok(())
    }

    /// Adds a constraint after checking its name and key columns.
    ///
    /// # Returns
    /// `Result<(), SchemaError>` with `DuplicateConstraint` when the name is
    /// taken within the kind (or a second primary key is added), or
    /// `UnknownAttribute` when a key column is missing.
    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<(), SchemaError> {
        let duplicate = self.constraints.iter().any(|c| {
            c.kind == constraint.kind
                && (c.has_name(&constraint.name) || c.kind == ConstraintKind::PrimaryKey)
        });
        if duplicate {
            return Err(SchemaError::DuplicateConstraint {
                class: self.class_name.clone(),
                constraint: constraint.name,
            });
        }
        for column in &constraint.columns {
            if self
                .attribute(&column.name, AttributeScope::Instance)
                .is_none()
            {
                return Err(SchemaError::UnknownAttribute {
                    class: self.class_name.clone(),
                    attribute: column.name.clone(),
                });
            }
        }
        self.constraints.push(constraint);
        Ok(())
    }

    /// Removes a local constraint of the given kind.
    pub fn remove_constraint(
        &mut self,
        name: &str,
        kind: ConstraintKind,
        supers: &[SchemaInfo],
    ) -> Result<Constraint, SchemaError> {
        let index = self
            .constraints
            .iter()
            .position(|c| c.kind == kind && c.has_name(name))
            .ok_or_else(|| SchemaError::ConstraintNotFound {
                class: self.class_name.clone(),
                constraint: name.to_string(),
            })?;
        if let Some(defined_in) = defining_super(supers, name, kind) {
            return Err(SchemaError::InheritedDrop {
                class: self.class_name.clone(),
                name: name.to_string(),
                defined_in,
            });
        }
        Ok(self.constraints.remove(index))
    }

    /// Removes the single-column UNIQUE constraints on `name`.
    pub fn remove_unique_by_attribute(&mut self, name: &str) {
        self.constraints.retain(|c| !c.is_single_unique_on(name));
    }

    /// Returns the primary key defined by this class.
    pub fn primary_key(&self, supers: &[SchemaInfo]) -> Option<&Constraint> {
        self.constraints
            .iter()
            .find(|c| c.kind == ConstraintKind::PrimaryKey && !is_in_super_classes(supers, c))
    }

    /// Returns the primary keys received from super classes.
    pub fn inherited_primary_keys(&self, supers: &[SchemaInfo]) -> Vec<&Constraint> {
        self.constraints
            .iter()
            .filter(|c| c.kind == ConstraintKind::PrimaryKey && is_in_super_classes(supers, c))
            .collect()
    }

    /// Returns true if the attribute carries a single-column UNIQUE or primary key.
    pub fn is_attribute_unique(&self, attribute: &str) -> bool {
        self.constraints.iter().any(|c| {
            c.is_single_unique_on(attribute)
                || (c.kind == ConstraintKind::PrimaryKey
                    && c.columns.len() == 1
                    && same_name(&c.columns[0].name, attribute))
        })
    }

    /// Renames the class; local attributes follow.
    pub fn set_class_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        let old = std::mem::replace(&mut self.class_name, name.clone());
        for scope in AttributeScope::ALL {
            for attribute in self.attributes_of_mut(scope) {
                if same_name(&attribute.inherit, &old) {
                    attribute.inherit = name.clone();
                }
            }
        }
    }

    pub fn constraint(&self, name: &str) -> Option<&Constraint> {
        self.constraints.iter().find(|c| c.has_name(name))
    }

    pub fn constraint_of_kind(&self, name: &str, kind: ConstraintKind) -> Option<&Constraint> {
        self.constraints
            .iter()
            .find(|c| c.kind == kind && c.has_name(name))
    }

    pub fn foreign_keys(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints
            .iter()
            .filter(|c| c.kind == ConstraintKind::ForeignKey)
    }

    /// Distinct classes referenced by foreign keys, in first-use order.
    pub fn referenced_classes(&self) -> Vec<String> {
        let mut classes: Vec<String> = Vec::new();
        for target in self.foreign_keys().filter_map(|c| c.foreign_key.as_ref()) {
            if !classes.iter().any(|c| same_name(c, &target.referenced_class)) {
                classes.push(target.referenced_class.clone());
            }
        }
        classes
    }
}

/// Returns true if `constraint` is received from one of `supers`, that is a
/// super class carries an inheritable constraint of the same kind and name.
pub fn is_in_super_classes(supers: &[SchemaInfo], constraint: &Constraint) -> bool {
    defining_super(supers, &constraint.name, constraint.kind).is_some()
}

fn defining_super(supers: &[SchemaInfo], name: &str, kind: ConstraintKind) -> Option<String> {
    if !kind.is_inherited() {
        return None;
    }
    supers
        .iter()
        .find(|s| s.constraint_of_kind(name, kind).is_some())
        .map(|s| s.class_name.clone())
}
