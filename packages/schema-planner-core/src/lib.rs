//! Schema change planning for CUBRID classes.
//!
//! Models a class with its inherited attributes and constraints, resolves
//! multiple-inheritance name conflicts, records the edits of a session and
//! turns an old and a new definition into ordered DDL.

pub mod catalog;
pub mod change_log;
pub mod config;
pub mod ddl;
pub mod error;
pub mod executor;
pub mod identifier;
pub mod inheritance;
pub mod schema;
pub mod session;
pub mod types;

pub use catalog::{InMemoryCatalog, SchemaCatalog};
pub use config::PlannerConfig;
pub use ddl::{DdlPlan, DdlSynthesizer};
pub use error::{ErrorCategory, SchemaError};
pub use session::EditSession;
