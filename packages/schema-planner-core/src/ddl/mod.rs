//! DDL synthesis: typed statements, plans and the old/new diff.

mod plan;
mod statement;
mod synthesizer;

pub use plan::{AdminRequest, DdlPlan, PlanSummary};
pub use statement::{AlterAction, ColumnDef, CreateClass, DdlStatement};
pub use synthesizer::DdlSynthesizer;

#[cfg(test)]
mod tests {
    include!("tests.rs");
}
