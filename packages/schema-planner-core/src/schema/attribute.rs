//! Attribute definitions and their value semantics.

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::types::{DataType, TypeTable};

/// Whether an attribute belongs to instances or to the class object itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeScope {
    #[default]
    Instance,
    Class,
}

impl AttributeScope {
    pub const ALL: [AttributeScope; 2] = [AttributeScope::Instance, AttributeScope::Class];

    pub fn is_class(self) -> bool {
        self == AttributeScope::Class
    }
}

/// Value semantics of an attribute. At most one of default, shared or
/// auto increment can be present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeValue {
    #[default]
    Plain,
    /// Default literal used when an insert omits the column
    Default(String),
    /// Single value shared by every instance
    Shared(Option<String>),
    AutoIncrement { seed: i128, increment: i128 },
}

/// A column of a class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub data_type: DataType,
    #[serde(default)]
    pub not_null: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub value: AttributeValue,
    #[serde(default)]
    pub scope: AttributeScope,
    /// Name of the class that defines the attribute
    pub inherit: String,
}

impl Attribute {
    /// Creates a plain instance attribute defined by `inherit`.
    pub fn new(name: impl Into<String>, data_type: DataType, inherit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type,
            not_null: false,
            unique: false,
            value: AttributeValue::Plain,
            scope: AttributeScope::Instance,
            inherit: inherit.into(),
        }
    }

    pub fn with_scope(mut self, scope: AttributeScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_not_null(mut self, not_null: bool) -> Self {
        self.not_null = not_null;
        self
    }

    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn with_value(mut self, value: AttributeValue) -> Self {
        self.value = value;
        self
    }

    /// Case-insensitive name comparison.
    pub fn has_name(&self, name: &str) -> bool {
        super::same_name(&self.name, name)
    }

    /// Returns true if `class_name` defines this attribute.
    pub fn is_defined_by(&self, class_name: &str) -> bool {
        super::same_name(&self.inherit, class_name)
    }

    pub fn default_value(&self) -> Option<&str> {
        match &self.value {
            AttributeValue::Default(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_shared(&self) -> bool {
        matches!(self.value, AttributeValue::Shared(_))
    }

    pub fn auto_increment(&self) -> Option<(i128, i128)> {
        match self.value {
            AttributeValue::AutoIncrement { seed, increment } => Some((seed, increment)),
            _ => None,
        }
    }

    /// Returns true if turning `self` into `other` redefines the column.
    pub fn needs_modify(&self, other: &Attribute) -> bool {
        self.data_type != other.data_type
            || self.is_shared() != other.is_shared()
            || self.auto_increment() != other.auto_increment()
            || (other.scope.is_class() && self.not_null != other.not_null)
    }

    /// Validates the attribute against the type table.
    ///
    /// # Arguments
    /// * `types` - Limits used for size, range and literal checks
    ///
    /// # Returns
    /// `Result<(), SchemaError>` with the first violated rule.
    pub fn validate(&self, types: &TypeTable) -> Result<(), SchemaError> {
        types.validate_type(&self.data_type)?;
        let is_class = self.scope.is_class();

        match &self.value {
            AttributeValue::Plain => {}
            AttributeValue::Default(value) => {
                types.format_value(&self.data_type, value)?;
            }
            AttributeValue::Shared(value) => {
                if is_class {
                    return Err(SchemaError::InvalidClassAttribute {
                        attribute: self.name.clone(),
                        what: "shared",
                    });
                }
                if let Some(value) = value {
                    types.format_value(&self.data_type, value)?;
                }
            }
            AttributeValue::AutoIncrement { seed, increment } => {
                if is_class {
                    return Err(SchemaError::InvalidClassAttribute {
                        attribute: self.name.clone(),
                        what: "auto increment",
                    });
                }
                if !self.data_type.supports_auto_increment() {
                    return Err(SchemaError::AutoIncrementNotAllowed {
                        attribute: self.name.clone(),
                        data_type: self.data_type.to_string(),
                    });
                }
                types.check_range(&self.data_type, *seed)?;
                if *increment < 1 {
                    return Err(SchemaError::InvalidIncrement {
                        attribute: self.name.clone(),
                        increment: *increment,
                    });
                }
                types.check_range(&self.data_type, *increment)?;
            }
        }

        if is_class && self.not_null && self.default_value().is_none() {
            return Err(SchemaError::ClassAttributeWithoutDefault {
                attribute: self.name.clone(),
            });
        }
        Ok(())
    }
}
