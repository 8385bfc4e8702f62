//! In-memory model of a class: attributes, constraints, super classes and
//! inheritance resolutions.

mod attribute;
mod constraint;
mod resolution;
mod schema_info;

pub use attribute::{Attribute, AttributeScope, AttributeValue};
pub use constraint::{
    Constraint, ConstraintKind, ForeignKeyTarget, KeyColumn, ReferentialAction, SortOrder,
};
pub use resolution::Resolution;
pub use schema_info::{is_in_super_classes, ClassKind, SchemaInfo};

/// Identifier comparison used throughout the model.
pub fn same_name(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || (!a.is_ascii() && a.to_lowercase() == b.to_lowercase())
}
