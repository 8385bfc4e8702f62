//! Session scenarios checked on the plans they produce.

use ntest::timeout;

use schema_planner_core::change_log::{ChangeKind, ChangeLog, ChangeLogEntry};
use schema_planner_core::ddl::AdminRequest;
use schema_planner_core::schema::AttributeScope;
use schema_planner_core::types::DataType;
use schema_planner_core::{DdlSynthesizer, EditSession, PlannerConfig, SchemaCatalog, SchemaError};

use crate::helpers::{column, fixture_catalog, texts};

#[timeout(1000)]
#[test]
fn test_untouched_alter_session_plans_nothing() {
    let config = PlannerConfig::default();
    let catalog = fixture_catalog();
    for name in ["dept", "person", "emp", "manager"] {
        let old = catalog.schema_info(name).unwrap();
        let session = EditSession::alter(&config, &catalog, old);
        let plan = session.plan().unwrap();
        assert!(plan.is_empty(), "{} produced {:?}", name, plan);
    }
}

#[timeout(1000)]
#[test]
fn test_create_lists_columns_in_attribute_order() {
    let config = PlannerConfig::default();
    let catalog = fixture_catalog();
    let mut session = EditSession::create(&config, &catalog, "t", "PUBLIC").unwrap();
    session.add_attribute(column("zeta", DataType::Integer)).unwrap();
    session
        .add_attribute(column("alpha", DataType::Varchar(10)))
        .unwrap();
    session.add_attribute(column("mid", DataType::Date)).unwrap();

    let plan = session.plan().unwrap();
    assert_eq!(
        texts(&plan.statements),
        vec!["CREATE TABLE \"t\" (\"zeta\" INTEGER, \"alpha\" VARCHAR(10), \"mid\" DATE)"]
    );
    assert_eq!(
        plan.render(";"),
        "CREATE TABLE \"t\" (\"zeta\" INTEGER, \"alpha\" VARCHAR(10), \"mid\" DATE);\n"
    );
}

#[timeout(1000)]
#[test]
fn test_primary_key_flags_round_trip() {
    let config = PlannerConfig::default();
    let catalog = fixture_catalog();
    let old = catalog.schema_info("person").unwrap();
    let mut session = EditSession::alter(&config, &catalog, old);

    session.set_primary_key(&["id"]).unwrap();
    let id = session
        .schema()
        .attribute("id", AttributeScope::Instance)
        .unwrap();
    assert!(id.not_null);
    assert!(id.unique);
    assert_eq!(session.change_log().entries().len(), 1);

    let plan = session.plan().unwrap();
    assert_eq!(
        texts(&plan.statements),
        vec!["ALTER TABLE \"person\" ADD CONSTRAINT \"pk_person_id\" PRIMARY KEY(\"id\")"]
    );
    assert!(plan.admin_requests.is_empty());

    session.drop_primary_key().unwrap();
    let id = session
        .schema()
        .attribute("id", AttributeScope::Instance)
        .unwrap();
    assert!(!id.not_null);
    assert!(!id.unique);
    assert_eq!(session.change_log().entries().len(), 1);
    assert!(session.plan().unwrap().is_empty());
}

#[timeout(1000)]
#[test]
fn test_inherited_drops_rejected_before_ddl() {
    let config = PlannerConfig::default();
    let catalog = fixture_catalog();
    let old = catalog.schema_info("manager").unwrap();
    let mut session = EditSession::alter(&config, &catalog, old.clone());

    let err = session
        .drop_attribute("name", AttributeScope::Instance)
        .unwrap_err();
    assert_eq!(
        err,
        SchemaError::InheritedDrop {
            class: "manager".into(),
            name: "name".into(),
            defined_in: "person".into(),
        }
    );
    assert!(err.is_validation());
    assert!(session.change_log().is_empty());
    assert!(session.plan().unwrap().is_empty());

    // A log that claims the drop anyway yields no plan at all
    let mut new = old.clone();
    new.attributes.retain(|a| a.name != "name");
    let mut log = ChangeLog::new();
    log.add(ChangeLogEntry::dropped("name", ChangeKind::Attribute));
    let result = DdlSynthesizer::new(&config, &catalog).synthesize(Some(&old), &new, &log);
    assert!(matches!(result, Err(SchemaError::InheritedDrop { .. })));
}

#[timeout(1000)]
#[test]
fn test_add_unique_column() {
    let config = PlannerConfig::default();
    let catalog = fixture_catalog();
    let old = catalog.schema_info("emp").unwrap();
    let mut session = EditSession::alter(&config, &catalog, old);

    session
        .add_attribute(column("email", DataType::Varchar(50)).with_unique(true))
        .unwrap();

    let plan = session.plan().unwrap();
    assert_eq!(
        texts(&plan.statements),
        vec![
            "ALTER TABLE \"emp\" ADD COLUMN \"email\" VARCHAR(50)",
            "ALTER TABLE \"emp\" ADD CONSTRAINT \"u_emp_email\" UNIQUE(\"email\")",
        ]
    );
    assert!(plan.admin_requests.is_empty());
}

#[timeout(1000)]
#[test]
fn test_not_null_toggle_is_admin_only() {
    let config = PlannerConfig::default();
    let catalog = fixture_catalog();
    let old = catalog.schema_info("emp").unwrap();
    let mut session = EditSession::alter(&config, &catalog, old);

    session
        .edit_attribute(
            "name",
            AttributeScope::Instance,
            column("name", DataType::Varchar(30)).with_not_null(true),
        )
        .unwrap();

    let plan = session.plan().unwrap();
    assert!(plan.statements.is_empty());
    assert_eq!(
        plan.admin_requests,
        vec![AdminRequest::UpdateAttribute {
            table: "emp".into(),
            column: "name".into(),
            not_null: true,
            unique: false,
            default: None,
        }]
    );
}

#[timeout(1000)]
#[test]
fn test_rename_and_retype_column_used_by_foreign_key() {
    let config = PlannerConfig::default();
    let catalog = fixture_catalog();
    let old = catalog.schema_info("emp").unwrap();
    let mut session = EditSession::alter(&config, &catalog, old);

    session
        .edit_attribute(
            "dept_id",
            AttributeScope::Instance,
            column("department", DataType::BigInt),
        )
        .unwrap();

    let plan = session.plan().unwrap();
    assert_eq!(
        texts(&plan.statements),
        vec![
            "ALTER TABLE \"emp\" RENAME \"dept_id\" AS \"department\"",
            "ALTER TABLE \"emp\" MODIFY \"department\" BIGINT",
        ]
    );
}

#[timeout(1000)]
#[test]
fn test_drop_column_drops_its_foreign_key_first() {
    let config = PlannerConfig::default();
    let catalog = fixture_catalog();
    let old = catalog.schema_info("emp").unwrap();
    let mut session = EditSession::alter(&config, &catalog, old);

    session
        .drop_attribute("dept_id", AttributeScope::Instance)
        .unwrap();
    assert_eq!(session.change_log().foreign_key_entries().count(), 1);

    let plan = session.plan().unwrap();
    assert_eq!(
        texts(&plan.statements),
        vec![
            "ALTER TABLE \"emp\" DROP CONSTRAINT \"fk_emp_dept_id\"",
            "ALTER TABLE \"emp\" DROP COLUMN \"dept_id\"",
        ]
    );
}

#[timeout(1000)]
#[test]
fn test_create_with_foreign_key_and_owner() {
    let config = PlannerConfig::default();
    let catalog = fixture_catalog();
    let mut session = EditSession::create(&config, &catalog, "project", "PUBLIC").unwrap();
    session
        .add_attribute(column("id", DataType::Integer))
        .unwrap();
    session
        .add_attribute(column("dept_id", DataType::Integer))
        .unwrap();
    session.set_primary_key(&["id"]).unwrap();
    session
        .add_foreign_key(schema_planner_core::schema::Constraint::foreign_key(
            "",
            ["dept_id"],
            schema_planner_core::schema::ForeignKeyTarget::new("dept"),
        ))
        .unwrap();
    session.set_owner("planner");

    let plan = session.plan().unwrap();
    assert_eq!(
        texts(&plan.statements),
        vec![
            "CREATE TABLE \"project\" (\"id\" INTEGER NOT NULL, \"dept_id\" INTEGER, \
             CONSTRAINT \"pk_project_id\" PRIMARY KEY(\"id\"), \
             CONSTRAINT \"fk_project_dept_id\" FOREIGN KEY(\"dept_id\") REFERENCES \"dept\"(\"id\") \
             ON DELETE RESTRICT ON UPDATE RESTRICT)",
            "CALL change_owner('project', 'planner') ON CLASS db_authorizations",
        ]
    );
}
