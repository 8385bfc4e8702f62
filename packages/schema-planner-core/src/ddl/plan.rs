//! Output of the synthesizer: statements plus out-of-band requests.

use serde::Serialize;

use super::statement::DdlStatement;

/// Change the server cannot express as DDL, sent through the admin API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "request", rename_all = "snake_case")]
pub enum AdminRequest {
    /// Rewrite the NOT NULL, UNIQUE and default of an existing column
    UpdateAttribute {
        table: String,
        column: String,
        not_null: bool,
        unique: bool,
        default: Option<String>,
    },
}

/// Ordered statements and admin requests for one commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DdlPlan {
    pub statements: Vec<DdlStatement>,
    pub admin_requests: Vec<AdminRequest>,
}

/// Serializable view of a plan with rendered statements.
#[derive(Debug, Clone, Serialize)]
pub struct PlanSummary {
    pub statements: Vec<String>,
    pub admin_requests: Vec<AdminRequest>,
}

impl DdlPlan {
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty() && self.admin_requests.is_empty()
    }

    /// Statement texts, each terminated by `delimiter`.
    pub fn statement_texts(&self, delimiter: &str) -> Vec<String> {
        self.statements
            .iter()
            .map(|s| format!("{}{}", s, delimiter))
            .collect()
    }

    /// Renders the statements one per line.
    pub fn render(&self, delimiter: &str) -> String {
        self.render_with(delimiter, "\n")
    }

    /// Renders the statements separated by `newline`.
    pub fn render_with(&self, delimiter: &str, newline: &str) -> String {
        let mut out = String::new();
        for text in self.statement_texts(delimiter) {
            out.push_str(&text);
            out.push_str(newline);
        }
        out
    }

    pub fn summary(&self, delimiter: &str) -> PlanSummary {
        PlanSummary {
            statements: self.statement_texts(delimiter),
            admin_requests: self.admin_requests.clone(),
        }
    }
}
