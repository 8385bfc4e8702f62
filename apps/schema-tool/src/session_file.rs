//! Session files: a catalog snapshot plus the old and new definitions of one
//! class and the change log that led from one to the other.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use schema_planner_core::change_log::ChangeLog;
use schema_planner_core::inheritance::{ancestors, column_conflicts, ColumnConflict};
use schema_planner_core::schema::{AttributeScope, SchemaInfo};
use schema_planner_core::{
    DdlPlan, DdlSynthesizer, InMemoryCatalog, PlannerConfig, SchemaError,
};

#[derive(Debug, Deserialize)]
pub struct SessionFile {
    /// Classes the edited class may refer to
    #[serde(default)]
    pub catalog: Vec<SchemaInfo>,
    /// Committed definition; absent for a class being created
    #[serde(default)]
    pub old: Option<SchemaInfo>,
    pub new: SchemaInfo,
    #[serde(default)]
    pub change_log: Option<ChangeLog>,
}

/// Conflicts of both attribute scopes.
#[derive(Debug, Serialize)]
pub struct ConflictReport {
    pub instance: Vec<ColumnConflict>,
    pub class: Vec<ColumnConflict>,
}

impl SessionFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read session file {}", path.display()))?;
        let session: SessionFile = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse session file {}", path.display()))?;
        debug!(
            class = %session.new.class_name,
            catalog = session.catalog.len(),
            "Loaded session file"
        );
        Ok(session)
    }

    pub fn catalog(&self) -> InMemoryCatalog {
        self.catalog.iter().cloned().collect()
    }

    /// The recorded log, or an empty one marked for a new class when `old`
    /// is absent.
    pub fn change_log(&self) -> ChangeLog {
        match (&self.change_log, &self.old) {
            (Some(log), _) => log.clone(),
            (None, None) => ChangeLog::for_new_table(),
            (None, Some(_)) => ChangeLog::new(),
        }
    }

    pub fn plan(&self, config: &PlannerConfig) -> Result<DdlPlan, SchemaError> {
        let catalog = self.catalog();
        DdlSynthesizer::new(config, &catalog).synthesize(
            self.old.as_ref(),
            &self.new,
            &self.change_log(),
        )
    }

    pub fn conflicts(&self) -> Result<ConflictReport, SchemaError> {
        let catalog = self.catalog();
        let supers = &self.new.super_classes;
        Ok(ConflictReport {
            instance: column_conflicts(&catalog, &self.new, supers, AttributeScope::Instance)?,
            class: column_conflicts(&catalog, &self.new, supers, AttributeScope::Class)?,
        })
    }
}

/// Walks the ancestors of every class in the catalog.
///
/// # Returns
/// The classes whose inheritance graph is broken, with the reason.
pub fn check_catalog(catalog: &InMemoryCatalog) -> Vec<(String, SchemaError)> {
    let mut failures = Vec::new();
    for name in catalog.class_names() {
        let Some(schema) = catalog.get(&name) else {
            continue;
        };
        if let Err(e) = ancestors(catalog, schema) {
            warn!(class = %name, error = %e, "Broken inheritance");
            failures.push((name, e));
        }
    }
    failures
}
