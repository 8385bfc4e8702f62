//! Shared fixtures.

use schema_planner_core::schema::{
    Attribute, Constraint, ForeignKeyTarget, SchemaInfo,
};
use schema_planner_core::types::DataType;
use schema_planner_core::InMemoryCatalog;

pub fn attribute(class: &str, name: &str, data_type: DataType) -> Attribute {
    Attribute::new(name, data_type, class)
}

/// Column for session calls; the session fills in the defining class.
pub fn column(name: &str, data_type: DataType) -> Attribute {
    Attribute::new(name, data_type, "")
}

/// dept(id PK, name), person(id, name), staff(name, code),
/// emp(id PK, name, dept_id FK to dept), manager UNDER person(level).
pub fn fixture_catalog() -> InMemoryCatalog {
    let mut dept = SchemaInfo::new("dept", "PUBLIC");
    dept.attributes.push(
        attribute("dept", "id", DataType::Integer)
            .with_not_null(true)
            .with_unique(true),
    );
    dept.attributes
        .push(attribute("dept", "name", DataType::Varchar(30)));
    dept.constraints
        .push(Constraint::primary_key("pk_dept_id", ["id"]));

    let mut person = SchemaInfo::new("person", "PUBLIC");
    person
        .attributes
        .push(attribute("person", "id", DataType::Integer));
    person
        .attributes
        .push(attribute("person", "name", DataType::Varchar(30)));

    let mut staff = SchemaInfo::new("staff", "PUBLIC");
    staff
        .attributes
        .push(attribute("staff", "name", DataType::Varchar(40)));
    staff
        .attributes
        .push(attribute("staff", "code", DataType::Char(4)));

    let mut emp = SchemaInfo::new("emp", "PUBLIC");
    emp.attributes.push(
        attribute("emp", "id", DataType::Integer)
            .with_not_null(true)
            .with_unique(true),
    );
    emp.attributes
        .push(attribute("emp", "name", DataType::Varchar(30)));
    emp.attributes
        .push(attribute("emp", "dept_id", DataType::Integer));
    emp.constraints
        .push(Constraint::primary_key("pk_emp_id", ["id"]));
    emp.constraints.push(Constraint::foreign_key(
        "fk_emp_dept_id",
        ["dept_id"],
        ForeignKeyTarget::new("dept"),
    ));

    let mut manager = SchemaInfo::new("manager", "PUBLIC");
    manager.super_classes = vec!["person".to_string()];
    manager
        .attributes
        .push(attribute("person", "id", DataType::Integer));
    manager
        .attributes
        .push(attribute("person", "name", DataType::Varchar(30)));
    manager
        .attributes
        .push(attribute("manager", "level", DataType::SmallInt));

    [dept, person, staff, emp, manager].into_iter().collect()
}

pub fn texts(statements: &[impl ToString]) -> Vec<String> {
    statements.iter().map(ToString::to_string).collect()
}
