//! Hand-off of a finished plan to whatever runs SQL against the server.

use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::SchemaCatalog;
use crate::ddl::AdminRequest;
use crate::error::SchemaError;
use crate::schema::SchemaInfo;
use crate::session::EditSession;

/// Failure reported by an executor; the message is shown to the user as is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ExecutionError {
    pub message: String,
}

impl ExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<ExecutionError> for SchemaError {
    fn from(e: ExecutionError) -> Self {
        SchemaError::Execution(e.message)
    }
}

/// Runs statements and admin requests, in order, as one unit.
pub trait SqlExecutor {
    fn execute(
        &mut self,
        statements: &[String],
        admin_requests: &[AdminRequest],
    ) -> Result<(), ExecutionError>;
}

/// Plans the session and hands the plan to `executor`.
///
/// The session is not touched; on success the returned definition is the
/// one now on the server.
///
/// # Returns
/// `Result<SchemaInfo, SchemaError>`; executor failures come back as
/// `SchemaError::Execution` with the executor's message.
pub fn commit<C, E>(session: &EditSession<'_, C>, executor: &mut E) -> Result<SchemaInfo, SchemaError>
where
    C: SchemaCatalog + ?Sized,
    E: SqlExecutor + ?Sized,
{
    let plan = session.plan()?;
    if plan.is_empty() {
        debug!(class = %session.schema().class_name, "Nothing to commit");
        return Ok(session.schema().clone());
    }

    let statements: Vec<String> = plan.statements.iter().map(ToString::to_string).collect();
    executor
        .execute(&statements, &plan.admin_requests)
        .map_err(|e| {
            warn!(class = %session.schema().class_name, error = %e, "Commit failed");
            SchemaError::from(e)
        })?;
    debug!(
        class = %session.schema().class_name,
        statements = statements.len(),
        "Committed"
    );
    Ok(session.schema().clone())
}
