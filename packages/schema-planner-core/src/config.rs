//! Planner configuration.

use serde::Deserialize;

use crate::types::TypeTable;

/// Planner configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Statement terminator used when rendering a plan
    pub delimiter: String,
    /// Line separator used when rendering a plan
    pub newline: String,
    /// Accept identifiers with non-ASCII characters
    pub allow_multibyte_identifiers: bool,
    /// Owner a new class gets when created; a different owner adds a change_owner call
    pub creator: String,
    /// Domain limits
    #[serde(skip)]
    pub type_table: TypeTable,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            delimiter: ";".to_string(),
            newline: "\n".to_string(),
            allow_multibyte_identifiers: false,
            creator: "PUBLIC".to_string(),
            type_table: TypeTable::default(),
        }
    }
}
