//! Multiple inheritance through the session API.

use ntest::timeout;

use schema_planner_core::inheritance::{
    ancestors, check_cycles, column_conflicts, resolution_changes, super_class_changes,
};
use schema_planner_core::schema::{AttributeScope, Resolution};
use schema_planner_core::types::DataType;
use schema_planner_core::{EditSession, PlannerConfig, SchemaCatalog, SchemaError};

use crate::helpers::{column, fixture_catalog, texts};

fn contributors(session: &EditSession<'_, schema_planner_core::InMemoryCatalog>) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = session
        .conflicts(AttributeScope::Instance)
        .unwrap()
        .into_iter()
        .map(|c| (c.name, c.class_name))
        .collect();
    pairs.sort();
    pairs
}

#[timeout(1000)]
#[test]
fn test_conflicts_do_not_depend_on_super_order() {
    let config = PlannerConfig::default();
    let catalog = fixture_catalog();
    let mut session = EditSession::create(&config, &catalog, "t", "PUBLIC").unwrap();

    session
        .set_super_classes(vec!["person".into(), "staff".into()])
        .unwrap();
    let forward = contributors(&session);
    assert_eq!(
        forward,
        vec![
            ("name".to_string(), "person".to_string()),
            ("name".to_string(), "staff".to_string()),
        ]
    );

    session
        .set_super_classes(vec!["staff".into(), "person".into()])
        .unwrap();
    assert_eq!(contributors(&session), forward);
    // the earlier pick still matches a contributor
    assert_eq!(session.schema().resolutions.len(), 1);
    assert_eq!(session.schema().resolutions[0].class_name, "person");
}

#[timeout(1000)]
#[test]
fn test_local_attribute_suppresses_conflict() {
    let config = PlannerConfig::default();
    let catalog = fixture_catalog();
    let mut session = EditSession::create(&config, &catalog, "t", "PUBLIC").unwrap();
    session
        .set_super_classes(vec!["person".into(), "staff".into()])
        .unwrap();
    assert!(!session.conflicts(AttributeScope::Instance).unwrap().is_empty());

    session
        .add_attribute(column("name", DataType::Varchar(50)))
        .unwrap();
    assert!(session.conflicts(AttributeScope::Instance).unwrap().is_empty());
    assert!(session.schema().resolutions.is_empty());

    let names: Vec<&str> = session
        .schema()
        .attributes
        .iter()
        .map(|a| a.name.as_str())
        .collect();
    assert_eq!(names, vec!["id", "code", "name"]);
}

#[timeout(1000)]
#[test]
fn test_narrowing_override_rejected() {
    let config = PlannerConfig::default();
    let catalog = fixture_catalog();
    let mut session = EditSession::create(&config, &catalog, "t", "PUBLIC").unwrap();
    session.set_super_classes(vec!["staff".into()]).unwrap();
    let before = session.schema().clone();

    let err = session
        .add_attribute(column("name", DataType::Varchar(10)))
        .unwrap_err();
    assert!(matches!(err, SchemaError::IncompatibleOverride { .. }));
    assert_eq!(session.schema(), &before);
}

#[timeout(1000)]
#[test]
fn test_removing_pick_installs_exactly_one_replacement() {
    let config = PlannerConfig::default();
    let catalog = fixture_catalog();
    let mut session = EditSession::create(&config, &catalog, "t", "PUBLIC").unwrap();
    session
        .set_super_classes(vec!["person".into(), "staff".into()])
        .unwrap();
    let old = session.schema().resolutions.clone();
    assert_eq!(old, vec![Resolution::new("name", "person", AttributeScope::Instance)]);

    let next = session
        .remove_resolution("name", "person", AttributeScope::Instance)
        .unwrap();
    assert_eq!(
        next,
        Some(Resolution::new("name", "staff", AttributeScope::Instance))
    );
    assert_eq!(
        resolution_changes(&old, &session.schema().resolutions),
        vec![Resolution::new("name", "staff", AttributeScope::Instance)]
    );
    let name = session
        .schema()
        .attribute("name", AttributeScope::Instance)
        .unwrap();
    assert_eq!(name.inherit, "staff");
    assert_eq!(name.data_type, DataType::Varchar(40));
}

#[timeout(1000)]
#[test]
fn test_alias_keeps_both_columns_in_create() {
    let config = PlannerConfig::default();
    let catalog = fixture_catalog();
    let mut session = EditSession::create(&config, &catalog, "t", "PUBLIC").unwrap();
    session
        .set_super_classes(vec!["person".into(), "staff".into()])
        .unwrap();
    session
        .add_resolution(
            Resolution::new("name", "staff", AttributeScope::Instance).with_alias("staff_name"),
        )
        .unwrap();

    let names: Vec<&str> = session
        .schema()
        .attributes
        .iter()
        .map(|a| a.name.as_str())
        .collect();
    assert_eq!(names, vec!["id", "name", "staff_name", "code"]);

    let plan = session.plan().unwrap();
    assert_eq!(
        texts(&plan.statements),
        vec![
            "CREATE TABLE \"t\" UNDER \"person\", \"staff\" \
             INHERIT \"name\" OF \"person\", \"name\" OF \"staff\" AS \"staff_name\""
        ]
    );
}

#[timeout(1000)]
#[test]
fn test_ancestors_and_cycles() {
    let catalog = fixture_catalog();
    let manager = catalog.schema_info("manager").unwrap();
    let names: Vec<String> = ancestors(&catalog, &manager)
        .unwrap()
        .into_iter()
        .map(|s| s.class_name)
        .collect();
    assert_eq!(names, vec!["person"]);

    let err = check_cycles(&catalog, "person", &["manager".to_string()]).unwrap_err();
    assert_eq!(
        err,
        SchemaError::CyclicInheritance {
            path: vec!["person".into(), "manager".into(), "person".into()],
        }
    );

    let conflicts = column_conflicts(
        &catalog,
        &manager,
        &["person".to_string(), "staff".to_string()],
        AttributeScope::Instance,
    )
    .unwrap();
    assert_eq!(conflicts.len(), 2);
}

#[timeout(1000)]
#[test]
fn test_super_class_diff_and_statements() {
    let changes = super_class_changes(
        &["person".to_string(), "staff".to_string()],
        &["staff".to_string(), "dept".to_string()],
    );
    assert_eq!(changes.removed, vec!["person"]);
    assert_eq!(changes.added, vec!["dept"]);

    let config = PlannerConfig::default();
    let catalog = fixture_catalog();
    let old = catalog.schema_info("manager").unwrap();
    let mut session = EditSession::alter(&config, &catalog, old);
    session
        .set_super_classes(vec!["person".into(), "staff".into()])
        .unwrap();

    let plan = session.plan().unwrap();
    assert_eq!(
        texts(&plan.statements),
        vec!["ALTER TABLE \"manager\" ADD SUPERCLASS \"staff\" INHERIT \"name\" OF \"person\""]
    );
}
