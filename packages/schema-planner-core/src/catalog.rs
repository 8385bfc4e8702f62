//! Schema lookup by class name, in memory or from a JSON catalog file.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SchemaError;
use crate::schema::SchemaInfo;

/// Current catalog file version.
pub const CATALOG_VERSION: u32 = 1;

/// Source of existing class definitions.
pub trait SchemaCatalog {
    /// Returns the definition of `name`, matched case-insensitively.
    fn schema_info(&self, name: &str) -> Option<SchemaInfo>;
}

/// Catalog backed by a map keyed on lower-cased class names.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    classes: HashMap<String, SchemaInfo>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a class definition.
    pub fn insert(&mut self, schema: SchemaInfo) -> Option<SchemaInfo> {
        self.classes.insert(schema.class_name.to_lowercase(), schema)
    }

    pub fn remove(&mut self, name: &str) -> Option<SchemaInfo> {
        self.classes.remove(&name.to_lowercase())
    }

    pub fn get(&self, name: &str) -> Option<&SchemaInfo> {
        self.classes.get(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Class names in sorted order.
    pub fn class_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .classes
            .values()
            .map(|s| s.class_name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn schemas(&self) -> impl Iterator<Item = &SchemaInfo> {
        self.classes.values()
    }
}

impl FromIterator<SchemaInfo> for InMemoryCatalog {
    fn from_iter<I: IntoIterator<Item = SchemaInfo>>(iter: I) -> Self {
        let mut catalog = InMemoryCatalog::new();
        for schema in iter {
            catalog.insert(schema);
        }
        catalog
    }
}

impl SchemaCatalog for InMemoryCatalog {
    fn schema_info(&self, name: &str) -> Option<SchemaInfo> {
        self.get(name).cloned()
    }
}

impl<T: SchemaCatalog + ?Sized> SchemaCatalog for &T {
    fn schema_info(&self, name: &str) -> Option<SchemaInfo> {
        (**self).schema_info(name)
    }
}

/// Catalog file format.
#[derive(Debug, Serialize, Deserialize)]
pub struct CatalogFile {
    /// Format version
    #[serde(default = "default_version")]
    pub version: u32,
    /// Class definitions
    #[serde(default)]
    pub classes: Vec<SchemaInfo>,
}

fn default_version() -> u32 {
    CATALOG_VERSION
}

/// Loads a catalog from a JSON file.
///
/// # Arguments
/// * `path` - Catalog file path
///
/// # Returns
/// `Result<InMemoryCatalog, SchemaError>` with `Catalog` on I/O or parse failure.
pub fn load_catalog(path: impl AsRef<Path>) -> Result<InMemoryCatalog, SchemaError> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|e| {
        SchemaError::Catalog(format!("Failed to open {}: {}", path.display(), e))
    })?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| SchemaError::Catalog(format!("Failed to read {}: {}", path.display(), e)))?;

    let parsed: CatalogFile = serde_json::from_str(&contents)
        .map_err(|e| SchemaError::Catalog(format!("Failed to parse catalog: {}", e)))?;
    if parsed.version > CATALOG_VERSION {
        return Err(SchemaError::Catalog(format!(
            "Unsupported catalog version {}",
            parsed.version
        )));
    }

    debug!(path = %path.display(), classes = parsed.classes.len(), "Loaded catalog");
    Ok(parsed.classes.into_iter().collect())
}

/// Writes a catalog to a JSON file through a temp file and rename.
pub fn save_catalog(catalog: &InMemoryCatalog, path: impl AsRef<Path>) -> Result<(), SchemaError> {
    let path = path.as_ref();
    let mut classes: Vec<SchemaInfo> = catalog.schemas().cloned().collect();
    classes.sort_by(|a, b| a.class_name.cmp(&b.class_name));
    let file = CatalogFile {
        version: CATALOG_VERSION,
        classes,
    };
    let json = serde_json::to_string_pretty(&file)
        .map_err(|e| SchemaError::Catalog(format!("Failed to serialize catalog: {}", e)))?;

    let temp_path = path.with_extension("json.tmp");
    let mut temp = File::create(&temp_path)
        .map_err(|e| SchemaError::Catalog(format!("Failed to create temp file: {}", e)))?;
    temp.write_all(json.as_bytes())
        .map_err(|e| SchemaError::Catalog(format!("Failed to write catalog: {}", e)))?;
    temp.sync_all()
        .map_err(|e| SchemaError::Catalog(format!("Failed to sync catalog: {}", e)))?;
    fs::rename(&temp_path, path)
        .map_err(|e| SchemaError::Catalog(format!("Failed to rename catalog file: {}", e)))?;
    Ok(())
}
