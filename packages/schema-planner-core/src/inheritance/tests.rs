use super::*;
use crate::catalog::{InMemoryCatalog, SchemaCatalog};
use crate::error::SchemaError;
use crate::schema::{Attribute, AttributeScope, Constraint, ConstraintKind, Resolution, SchemaInfo};
use crate::types::DataType;

fn class(name: &str, supers: &[&str], attributes: &[(&str, DataType, &str)]) -> SchemaInfo {
    let mut schema = SchemaInfo::new(name, "PUBLIC");
    schema.super_classes = supers.iter().map(|s| s.to_string()).collect();
    for (attr, data_type, inherit) in attributes {
        schema
            .attributes
            .push(Attribute::new(*attr, data_type.clone(), *inherit));
    }
    schema
}

fn catalog() -> InMemoryCatalog {
    let mut a = class(
        "a",
        &[],
        &[
            ("id", DataType::Integer, "a"),
            ("name", DataType::Varchar(20), "a"),
        ],
    );
    a.constraints.push(Constraint::primary_key("pk_a_id", ["id"]));
    a.constraints
        .push(Constraint::new("u_a_name", ConstraintKind::Unique, ["name"]));
    a.constraints
        .push(Constraint::new("i_a_name", ConstraintKind::Index, ["name"]));

    let b = class(
        "b",
        &[],
        &[
            ("name", DataType::Varchar(30), "b"),
            ("code", DataType::Char(4), "b"),
        ],
    );
    let c = class("c", &[], &[("name", DataType::Integer, "c")]);
    let e = class("e", &[], &[("name", DataType::Varchar(5), "e")]);
    let x = class(
        "x",
        &["a"],
        &[
            ("id", DataType::Integer, "a"),
            ("name", DataType::Varchar(20), "a"),
        ],
    );
    let y = class(
        "y",
        &["a"],
        &[
            ("id", DataType::Integer, "a"),
            ("name", DataType::Varchar(20), "a"),
        ],
    );
    let z = class("z", &["x", "y"], &[]);
    let p = class("p", &["q"], &[]);
    let q = class("q", &["p"], &[]);

    [a, b, c, e, x, y, z, p, q].into_iter().collect()
}

fn editing(local: &[(&str, DataType)]) -> SchemaInfo {
    let mut schema = SchemaInfo::new("t", "PUBLIC");
    for (name, data_type) in local {
        schema
            .add_attribute(Attribute::new(*name, data_type.clone(), "t"))
            .unwrap();
    }
    schema
}

fn names(list: &[String]) -> Vec<&str> {
    list.iter().map(String::as_str).collect()
}

fn supers(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn attribute_names(schema: &SchemaInfo) -> Vec<&str> {
    schema.attributes.iter().map(|a| a.name.as_str()).collect()
}

#[test]
fn test_ancestors_breadth_first_without_repeats() {
    let catalog = catalog();
    let z = catalog.schema_info("z").unwrap();
    let found: Vec<String> = ancestors(&catalog, &z)
        .unwrap()
        .into_iter()
        .map(|s| s.class_name)
        .collect();
    assert_eq!(found, vec!["x", "y", "a"]);
}

#[test]
fn test_cycles_are_reported() {
    let catalog = catalog();
    let p = catalog.schema_info("p").unwrap();
    match ancestors(&catalog, &p) {
        Err(SchemaError::CyclicInheritance { path }) => assert_eq!(path, vec!["p", "q", "p"]),
        other => panic!("expected cycle, got {:?}", other),
    }

    // Making "a" a sub class of its own sub class
    match check_cycles(&catalog, "a", &supers(&["x"])) {
        Err(SchemaError::CyclicInheritance { path }) => assert_eq!(path, vec!["a", "x", "a"]),
        other => panic!("expected cycle, got {:?}", other),
    }
    assert!(check_cycles(&catalog, "t", &supers(&["z", "b"])).is_ok());
}

#[test]
fn test_unknown_super_class() {
    let catalog = catalog();
    let result = super_classes(&catalog, &supers(&["a", "nope"]));
    assert!(matches!(result, Err(SchemaError::UnknownClass { ref class }) if class == "nope"));
}

#[test]
fn test_conflicts_follow_super_order() {
    let catalog = catalog();
    let schema = editing(&[("x", DataType::Integer)]);

    let ab = column_conflicts(&catalog, &schema, &supers(&["a", "b"]), AttributeScope::Instance)
        .unwrap();
    let classes: Vec<&str> = ab.iter().map(|c| c.class_name.as_str()).collect();
    assert_eq!(classes, vec!["a", "b"]);
    assert!(ab.iter().all(|c| c.name == "name"));

    let ba = column_conflicts(&catalog, &schema, &supers(&["b", "a"]), AttributeScope::Instance)
        .unwrap();
    let classes: Vec<&str> = ba.iter().map(|c| c.class_name.as_str()).collect();
    assert_eq!(classes, vec!["b", "a"]);
    assert_eq!(ab.len(), ba.len());
}

#[test]
fn test_local_definition_suppresses_conflict() {
    let catalog = catalog();
    let schema = editing(&[("name", DataType::Varchar(40))]);
    let conflicts =
        column_conflicts(&catalog, &schema, &supers(&["a", "b"]), AttributeScope::Instance)
            .unwrap();
    assert!(conflicts.is_empty());
}

#[test]
fn test_diamond_counts_once() {
    let catalog = catalog();
    let schema = editing(&[]);
    let conflicts =
        column_conflicts(&catalog, &schema, &supers(&["x", "y"]), AttributeScope::Instance)
            .unwrap();
    assert!(conflicts.is_empty());
}

#[test]
fn test_fire_super_class_changed_flattens() {
    let catalog = catalog();
    let mut schema = editing(&[("x", DataType::Integer)]);
    fire_super_class_changed(&catalog, None, &mut schema, &supers(&["a", "b"])).unwrap();

    assert_eq!(names(&schema.super_classes), vec!["a", "b"]);
    assert_eq!(attribute_names(&schema), vec!["id", "name", "code", "x"]);
    assert_eq!(schema.attributes[1].inherit, "a");
    assert_eq!(
        schema.resolutions,
        vec![Resolution::new("name", "a", AttributeScope::Instance)]
    );
    assert!(schema.constraint("pk_a_id").is_some());
    assert!(schema.constraint("u_a_name").is_some());
    assert!(schema.constraint("i_a_name").is_none());
}

#[test]
fn test_incompatible_override_leaves_schema_untouched() {
    let catalog = catalog();
    let mut schema = editing(&[("name", DataType::Integer)]);
    let before = schema.clone();
    let result = fire_super_class_changed(&catalog, None, &mut schema, &supers(&["a"]));
    assert!(matches!(result, Err(SchemaError::IncompatibleOverride { .. })));
    assert_eq!(schema, before);

    let mut narrower = editing(&[("name", DataType::Varchar(10))]);
    assert!(fire_super_class_changed(&catalog, None, &mut narrower, &supers(&["a"])).is_err());

    let mut wider = editing(&[("name", DataType::Varchar(40))]);
    fire_super_class_changed(&catalog, None, &mut wider, &supers(&["a"])).unwrap();
    assert_eq!(attribute_names(&wider), vec!["id", "name"]);
    assert_eq!(wider.attributes[1].inherit, "t");
}

#[test]
fn test_incompatible_inherited_definitions() {
    let catalog = catalog();
    let mut schema = editing(&[]);
    let result = fire_super_class_changed(&catalog, None, &mut schema, &supers(&["a", "c"]));
    assert!(matches!(
        result,
        Err(SchemaError::IncompatibleInheritance { ref attribute, .. }) if attribute == "name"
    ));
    assert!(schema.super_classes.is_empty());
}

#[test]
fn test_cycle_rejected_before_changes() {
    let catalog = catalog();
    let mut a = catalog.schema_info("a").unwrap();
    let before = a.clone();
    let result = fire_super_class_changed(&catalog, None, &mut a, &supers(&["z"]));
    assert!(matches!(result, Err(SchemaError::CyclicInheritance { .. })));
    assert_eq!(a, before);
}

#[test]
fn test_alias_resolution_adds_renamed_copy() {
    let catalog = catalog();
    let mut schema = editing(&[("x", DataType::Integer)]);
    fire_super_class_changed(&catalog, None, &mut schema, &supers(&["a", "b"])).unwrap();

    schema
        .resolutions
        .push(Resolution::new("name", "b", AttributeScope::Instance).with_alias("b_name"));
    fire_resolution_changed(&catalog, None, &mut schema, AttributeScope::Instance).unwrap();

    assert_eq!(
        attribute_names(&schema),
        vec!["id", "name", "b_name", "code", "x"]
    );
    let aliased = schema.attribute("b_name", AttributeScope::Instance).unwrap();
    assert_eq!(aliased.inherit, "b");
    assert_eq!(aliased.data_type, DataType::Varchar(30));
}

#[test]
fn test_default_resolution_copied_from_old() {
    let catalog = catalog();
    let mut old = editing(&[("x", DataType::Integer)]);
    old.resolutions
        .push(Resolution::new("name", "b", AttributeScope::Instance));

    let mut schema = editing(&[("x", DataType::Integer)]);
    fire_super_class_changed(&catalog, Some(&old), &mut schema, &supers(&["a", "b"])).unwrap();

    assert_eq!(
        schema.resolutions,
        vec![Resolution::new("name", "b", AttributeScope::Instance)]
    );
    assert_eq!(attribute_names(&schema), vec!["id", "name", "code", "x"]);
    assert_eq!(schema.attributes[1].data_type, DataType::Varchar(30));
}

#[test]
fn test_removing_super_drops_inherited_parts() {
    let catalog = catalog();
    let mut schema = editing(&[("x", DataType::Integer)]);
    fire_super_class_changed(&catalog, None, &mut schema, &supers(&["a", "b"])).unwrap();
    schema
        .add_constraint(Constraint::new("i_t_id", ConstraintKind::Index, ["id"]))
        .unwrap();

    fire_super_class_changed(&catalog, None, &mut schema, &supers(&["b"])).unwrap();
    assert_eq!(attribute_names(&schema), vec!["name", "code", "x"]);
    assert!(schema.resolutions.is_empty());
    assert!(schema.constraint("pk_a_id").is_none());
    assert!(schema.constraint("u_a_name").is_none());
    // The local index lost its column
    assert!(schema.constraint("i_t_id").is_none());
}

#[test]
fn test_local_index_sharing_inherited_name_survives() {
    let catalog = catalog();
    let mut schema = editing(&[("x", DataType::Integer)]);
    fire_super_class_changed(&catalog, None, &mut schema, &supers(&["a"])).unwrap();
    schema
        .add_constraint(Constraint::new("u_a_name", ConstraintKind::Index, ["x"]))
        .unwrap();
    schema
        .add_constraint(Constraint::new("i_a_name", ConstraintKind::Index, ["x"]))
        .unwrap();

    fire_super_class_changed(&catalog, None, &mut schema, &supers(&["a"])).unwrap();
    assert!(schema
        .constraint_of_kind("u_a_name", ConstraintKind::Unique)
        .is_some());
    assert!(schema
        .constraint_of_kind("u_a_name", ConstraintKind::Index)
        .is_some());
    assert!(schema
        .constraint_of_kind("i_a_name", ConstraintKind::Index)
        .is_some());

    let super_schemas = super_classes(&catalog, &schema.super_classes).unwrap();
    let local_index = schema
        .constraint_of_kind("u_a_name", ConstraintKind::Index)
        .unwrap();
    assert!(!crate::schema::is_in_super_classes(&super_schemas, local_index));
}

#[test]
fn test_next_resolution_policy() {
    let catalog = catalog();
    let schema = editing(&[]);
    let conflicts = column_conflicts(
        &catalog,
        &schema,
        &supers(&["a", "b", "e"]),
        AttributeScope::Instance,
    )
    .unwrap();
    assert_eq!(conflicts.len(), 3);

    let removed_a = Resolution::new("name", "a", AttributeScope::Instance);
    let next = next_resolution(&[], &removed_a, &conflicts).unwrap();
    assert_eq!(next.class_name, "b");

    let aliased_b = Resolution::new("name", "b", AttributeScope::Instance).with_alias("bn");
    let next = next_resolution(&[aliased_b], &removed_a, &conflicts).unwrap();
    assert_eq!(next.class_name, "e");

    let removed_e = Resolution::new("name", "e", AttributeScope::Instance);
    let next = next_resolution(&[], &removed_e, &conflicts).unwrap();
    assert_eq!(next.class_name, "a");

    let unrelated = Resolution::new("code", "b", AttributeScope::Instance);
    assert!(next_resolution(&[], &unrelated, &conflicts).is_none());
}

#[test]
fn test_resolution_changes_only_new_or_realiased() {
    let old = vec![
        Resolution::new("name", "a", AttributeScope::Instance),
        Resolution::new("code", "b", AttributeScope::Instance).with_alias("c1"),
    ];
    let new = vec![
        Resolution::new("NAME", "A", AttributeScope::Instance),
        Resolution::new("code", "b", AttributeScope::Instance).with_alias("c2"),
        Resolution::new("name", "b", AttributeScope::Instance).with_alias("bn"),
    ];
    let changes = resolution_changes(&old, &new);
    assert_eq!(changes, new[1..].to_vec());
    assert!(resolution_changes(&new, &new).is_empty());
}

#[test]
fn test_super_class_changes() {
    let changes = super_class_changes(&supers(&["a", "b"]), &supers(&["b", "a"]));
    assert_eq!(names(&changes.removed), vec!["a"]);
    assert_eq!(names(&changes.added), vec!["a"]);

    let changes = super_class_changes(&supers(&["a"]), &supers(&["a", "b"]));
    assert!(changes.removed.is_empty());
    assert_eq!(names(&changes.added), vec!["b"]);

    let changes = super_class_changes(&supers(&["a", "b", "c"]), &supers(&["a", "c"]));
    assert_eq!(names(&changes.removed), vec!["b"]);
    assert!(changes.added.is_empty());

    let changes = super_class_changes(&supers(&["a"]), &[]);
    assert_eq!(names(&changes.removed), vec!["a"]);

    assert!(super_class_changes(&supers(&["a"]), &supers(&["A"])).is_empty());
}
