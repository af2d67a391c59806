//! Mailing agent definitions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_SUBJECT_TEMPLATE: &str = "Hello {{Name}}";
pub const DEFAULT_BODY_TEMPLATE: &str =
    "Hi {{Name}},\n\nWe wanted to reach out personally.\n\nBest regards";

/// Comparison applied by an [`AgentFilter`]. Always case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    Equals,
    Contains,
    StartsWith,
    EndsWith,
    /// Any operator name we don't recognize; matches every row.
    #[serde(other)]
    Unknown,
}

/// Audience segment for an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentFilter {
    #[serde(default)]
    pub column: String,
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: String,
}

impl AgentFilter {
    pub fn new(column: impl Into<String>, operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }

    /// A filter missing its column or value selects every row.
    pub fn is_active(&self) -> bool {
        !self.column.is_empty() && !self.value.is_empty()
    }
}

/// An operator-defined rule: an optional filter plus a subject/body template pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDefinition {
    #[serde(default = "new_agent_id")]
    pub id: String,
    pub name: String,
    #[serde(default = "default_subject")]
    pub subject_template: String,
    #[serde(default = "default_body")]
    pub body_template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<AgentFilter>,
}

impl AgentDefinition {
    /// New agent with a fresh id and the default templates.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_agent_id(),
            name: name.into(),
            subject_template: default_subject(),
            body_template: default_body(),
            filter: None,
        }
    }

    pub fn with_templates(mut self, subject: impl Into<String>, body: impl Into<String>) -> Self {
        self.subject_template = subject.into();
        self.body_template = body.into();
        self
    }

    pub fn with_filter(mut self, filter: AgentFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// Random 128-bit identifier. Carries no ordering.
pub fn new_agent_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_subject() -> String {
    DEFAULT_SUBJECT_TEMPLATE.to_string()
}

fn default_body() -> String {
    DEFAULT_BODY_TEMPLATE.to_string()
}
