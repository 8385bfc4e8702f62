use serde::{Deserialize, Serialize};

use super::attribute::AttributeScope;

/// Choice of which super class supplies a conflicting attribute.
///
/// Without an alias the super class's definition wins. With an alias that
/// definition is inherited a second time under the alias name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub name: String,
    pub class_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default)]
    pub scope: AttributeScope,
}

impl Resolution {
    pub fn new(
        name: impl Into<String>,
        class_name: impl Into<String>,
        scope: AttributeScope,
    ) -> Self {
        Self {
            name: name.into(),
            class_name: class_name.into(),
            alias: None,
            scope,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn is_alias(&self) -> bool {
        self.alias.is_some()
    }

    /// Returns true if this resolution is about `name` taken from `class_name`.
    pub fn matches(&self, name: &str, class_name: &str) -> bool {
        super::same_name(&self.name, name) && super::same_name(&self.class_name, class_name)
    }
}
