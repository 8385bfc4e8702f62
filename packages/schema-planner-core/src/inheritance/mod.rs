//! Multiple inheritance: conflict detection, resolutions and flattening.
//!
//! Everything here is a function of the schema being edited and a
//! [`SchemaCatalog`](crate::catalog::SchemaCatalog); nothing is cached.

mod conflict;
mod resolution;
mod super_class;

pub use conflict::{
    ancestors, check_cycles, column_conflicts, conflict_group, super_classes, ColumnConflict,
};
pub use resolution::{next_resolution, resolution_changes};
pub use super_class::{
    fire_resolution_changed, fire_super_class_changed, super_class_changes, SuperClassChanges,
};

#[cfg(test)]
mod tests {
    include!("tests.rs");
}
