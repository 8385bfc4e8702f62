//! Catalog files and committing sessions against them.

use ntest::timeout;

use schema_planner_core::catalog::{load_catalog, save_catalog};
use schema_planner_core::ddl::AdminRequest;
use schema_planner_core::executor::{commit, ExecutionError, SqlExecutor};
use schema_planner_core::schema::AttributeScope;
use schema_planner_core::types::DataType;
use schema_planner_core::{EditSession, PlannerConfig, SchemaCatalog, SchemaError};

use crate::helpers::{column, fixture_catalog};

#[derive(Default)]
struct RecordingExecutor {
    statements: Vec<String>,
    admin_requests: Vec<AdminRequest>,
    calls: usize,
}

impl SqlExecutor for RecordingExecutor {
    fn execute(
        &mut self,
        statements: &[String],
        admin_requests: &[AdminRequest],
    ) -> Result<(), ExecutionError> {
        self.calls += 1;
        self.statements.extend_from_slice(statements);
        self.admin_requests.extend_from_slice(admin_requests);
        Ok(())
    }
}

struct FailingExecutor;

impl SqlExecutor for FailingExecutor {
    fn execute(&mut self, _: &[String], _: &[AdminRequest]) -> Result<(), ExecutionError> {
        Err(ExecutionError::new("ERROR: Operation would have caused one or more unique constraint violations."))
    }
}

#[test]
fn test_catalog_file_round_trip() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("catalog.json");

    let catalog = fixture_catalog();
    save_catalog(&catalog, &path)?;
    let loaded = load_catalog(&path)?;

    assert_eq!(loaded.class_names(), catalog.class_names());
    for name in catalog.class_names() {
        assert_eq!(loaded.get(&name), catalog.get(&name));
    }
    // temp file is renamed away
    assert!(!dir.path().join("catalog.json.tmp").exists());
    Ok(())
}

#[test]
fn test_rename_and_extend_loaded_class() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("catalog.json");
    save_catalog(&fixture_catalog(), &path)?;
    let mut catalog = load_catalog(&path)?;

    let config = PlannerConfig::default();
    let old = catalog
        .schema_info("person")
        .ok_or_else(|| anyhow::anyhow!("person missing"))?;
    let committed = {
        let mut session = EditSession::alter(&config, &catalog, old);
        session.rename_class("people")?;
        session.add_attribute(column("age", DataType::SmallInt))?;

        let mut executor = RecordingExecutor::default();
        let committed = commit(&session, &mut executor)?;
        assert_eq!(executor.calls, 1);
        assert_eq!(
            executor.statements,
            vec![
                "RENAME CLASS \"person\" AS \"people\"",
                "ALTER TABLE \"people\" ADD COLUMN \"age\" SMALLINT",
            ]
        );
        assert!(executor.admin_requests.is_empty());
        committed
    };

    assert!(committed
        .attributes
        .iter()
        .all(|a| a.inherit == "people"));
    catalog.remove("person");
    catalog.insert(committed);
    save_catalog(&catalog, &path)?;

    let reloaded = load_catalog(&path)?;
    assert!(reloaded.get("person").is_none());
    let people = reloaded
        .get("people")
        .ok_or_else(|| anyhow::anyhow!("people missing"))?;
    assert!(people.attribute("age", AttributeScope::Instance).is_some());
    Ok(())
}

#[timeout(1000)]
#[test]
fn test_commit_without_changes_skips_executor() {
    let config = PlannerConfig::default();
    let catalog = fixture_catalog();
    let old = catalog.schema_info("emp").unwrap();
    let session = EditSession::alter(&config, &catalog, old.clone());

    let mut executor = RecordingExecutor::default();
    let committed = commit(&session, &mut executor).unwrap();
    assert_eq!(executor.calls, 0);
    assert_eq!(committed, old);
}

#[timeout(1000)]
#[test]
fn test_commit_passes_admin_requests() {
    let config = PlannerConfig::default();
    let catalog = fixture_catalog();
    let old = catalog.schema_info("dept").unwrap();
    let mut session = EditSession::alter(&config, &catalog, old);
    session
        .edit_attribute(
            "name",
            AttributeScope::Instance,
            column("name", DataType::Varchar(30)).with_not_null(true),
        )
        .unwrap();

    let mut executor = RecordingExecutor::default();
    commit(&session, &mut executor).unwrap();
    assert_eq!(executor.calls, 1);
    assert!(executor.statements.is_empty());
    assert_eq!(executor.admin_requests.len(), 1);
}

#[timeout(1000)]
#[test]
fn test_failed_commit_keeps_session() {
    let config = PlannerConfig::default();
    let catalog = fixture_catalog();
    let old = catalog.schema_info("emp").unwrap();
    let mut session = EditSession::alter(&config, &catalog, old);
    session
        .add_attribute(column("code", DataType::Char(4)).with_unique(true))
        .unwrap();
    let before = session.schema().clone();

    let err = commit(&session, &mut FailingExecutor).unwrap_err();
    assert_eq!(
        err,
        SchemaError::Execution(
            "ERROR: Operation would have caused one or more unique constraint violations.".into()
        )
    );
    assert_eq!(session.schema(), &before);
    assert_eq!(session.change_log().entries().len(), 2);
}
