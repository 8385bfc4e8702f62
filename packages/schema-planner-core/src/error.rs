//! Schema planner error types.

use thiserror::Error;

use crate::types::TypeError;

/// Broad classification of a [`SchemaError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// User-correctable; the editor stays open for correction.
    Validation,
    /// Inconsistent edit sequencing or catalog data; indicates a bug upstream.
    Structural,
    /// Reported by the SQL execution collaborator.
    Execution,
}

/// Schema planning errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// Identifier is not syntactically legal
    #[error("Invalid identifier '{name}': {reason}")]
    InvalidIdentifier { name: String, reason: String },

    /// Identifier contains non-ASCII characters and multibyte identifiers are disabled
    #[error("Identifier '{name}' contains multibyte characters")]
    MultibyteIdentifier { name: String },

    /// Attribute already defined locally in the same scope
    #[error("Attribute '{attribute}' already exists in class '{class}'")]
    DuplicateAttribute { class: String, attribute: String },

    /// Constraint name already used for a constraint of the same kind
    #[error("Constraint '{constraint}' already exists in class '{class}'")]
    DuplicateConstraint { class: String, constraint: String },

    /// Local attribute type cannot override the inherited one
    #[error("Attribute '{attribute}' of type {local} is not compatible with {inherited} inherited from '{super_class}'")]
    IncompatibleOverride {
        attribute: String,
        local: String,
        inherited: String,
        super_class: String,
    },

    /// Inherited attributes of the same name have unrelated domains
    #[error("Attribute '{attribute}' is inherited with incompatible types {first} and {second}")]
    IncompatibleInheritance {
        attribute: String,
        first: String,
        second: String,
    },

    /// Attempt to drop an attribute or constraint defined on an ancestor
    #[error("'{name}' is inherited from '{defined_in}' and cannot be dropped from '{class}'")]
    InheritedDrop {
        class: String,
        name: String,
        defined_in: String,
    },

    /// Attempt to edit an attribute defined on an ancestor
    #[error("Attribute '{attribute}' is inherited from '{defined_in}' and cannot be edited")]
    InheritedEdit {
        attribute: String,
        defined_in: String,
    },

    /// Numeric value outside the declared type's range
    #[error("Value {value} is out of range for {data_type} [{min}, {max}]")]
    ValueOutOfRange {
        data_type: String,
        value: String,
        min: String,
        max: String,
    },

    /// Literal cannot be parsed as the declared type
    #[error("Value '{value}' is not a valid {data_type}")]
    MalformedValue { data_type: String, value: String },

    /// Type name or parameters are invalid
    #[error("Invalid data type: {0}")]
    InvalidType(#[from] TypeError),

    /// Auto increment on a type that does not support it
    #[error("Auto increment is not allowed on '{attribute}' of type {data_type}")]
    AutoIncrementNotAllowed { attribute: String, data_type: String },

    /// Auto increment step must be positive
    #[error("Auto increment step {increment} of '{attribute}' must be at least 1")]
    InvalidIncrement { attribute: String, increment: i128 },

    /// Class attributes cannot be shared or auto increment
    #[error("Class attribute '{attribute}' cannot be {what}")]
    InvalidClassAttribute { attribute: String, what: &'static str },

    /// NOT NULL class attribute requires a default value
    #[error("Class attribute '{attribute}' is NOT NULL but has no default value")]
    ClassAttributeWithoutDefault { attribute: String },

    /// Existing attribute cannot move between instance and class scope
    #[error("Attribute '{attribute}' cannot change scope")]
    ScopeChange { attribute: String },

    /// Constraint kind not accepted by the operation
    #[error("Constraint '{constraint}' is not {expected}")]
    WrongConstraintKind {
        constraint: String,
        expected: &'static str,
    },

    /// Primary key requires at least one column
    #[error("Primary key of '{class}' must have at least one column")]
    EmptyPrimaryKey { class: String },

    /// Super class graph contains a cycle
    #[error("Cyclic inheritance: {}", path.join(" -> "))]
    CyclicInheritance { path: Vec<String> },

    /// Class not found through the catalog
    #[error("Class '{class}' not found")]
    UnknownClass { class: String },

    /// Referenced attribute does not exist in the flattened schema
    #[error("Attribute '{attribute}' not found in class '{class}'")]
    UnknownAttribute { class: String, attribute: String },

    /// Constraint not found
    #[error("Constraint '{constraint}' not found in class '{class}'")]
    ConstraintNotFound { class: String, constraint: String },

    /// Resolution not found
    #[error("Resolution of '{attribute}' from '{super_class}' not found")]
    ResolutionNotFound {
        attribute: String,
        super_class: String,
    },

    /// Foreign key target has no primary key to reference
    #[error("Class '{class}' has no primary key to reference")]
    MissingReferencedKey { class: String },

    /// Failure reported by the SQL execution collaborator, message unchanged
    #[error("{0}")]
    Execution(String),

    /// Catalog file could not be read or parsed
    #[error("Catalog error: {0}")]
    Catalog(String),
}

impl SchemaError {
    /// Returns the category used by callers to decide how to surface the error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            SchemaError::CyclicInheritance { .. }
            | SchemaError::UnknownClass { .. }
            | SchemaError::UnknownAttribute { .. }
            | SchemaError::ConstraintNotFound { .. }
            | SchemaError::ResolutionNotFound { .. }
            | SchemaError::MissingReferencedKey { .. }
            | SchemaError::Catalog(_) => ErrorCategory::Structural,
            SchemaError::Execution(_) => ErrorCategory::Execution,
            _ => ErrorCategory::Validation,
        }
    }

    /// Returns true for user-correctable errors.
    pub fn is_validation(&self) -> bool {
        self.category() == ErrorCategory::Validation
    }
}
