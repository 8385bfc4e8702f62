//! Integration tests for the schema planner.
//!
//! Sessions are driven through the public API against an in-memory or
//! file-backed catalog and checked on the plans they produce.

pub mod catalog_tests;
pub mod helpers;
pub mod inheritance_tests;
pub mod scenario_tests;
