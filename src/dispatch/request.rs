//! Wire shape of a dispatch request and its structural validation.
//!
//! Validation is all-or-nothing: every issue is collected, and a single one
//! rejects the whole request before any agent is processed.

use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;

use crate::campaign::template::render;
use crate::campaign::{AgentBatch, Recipient, Row};
use crate::error::{DispatchError, ValidationIssue};
use crate::transport::{SenderInput, is_valid_email, sender_issue};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    #[serde(default)]
    pub agents: Vec<AgentPayload>,
    #[serde(default)]
    pub from: Option<SenderInput>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPayload {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub recipients: Vec<RecipientPayload>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientPayload {
    pub to: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub name: Option<String>,
    /// When present, `subject` and `body` are rendered against these first.
    #[serde(default)]
    pub variables: Option<BTreeMap<String, String>>,
}

impl DispatchRequest {
    /// Parse a JSON body. Shape errors become a single validation issue.
    pub fn from_json(value: serde_json::Value) -> Result<Self, DispatchError> {
        serde_json::from_value(value).map_err(|e| DispatchError::MalformedRequest {
            issues: vec![ValidationIssue::new("body", e.to_string())],
        })
    }

    /// Validate the request and turn it into dispatchable batches.
    pub fn into_batches(self) -> Result<Vec<AgentBatch>, DispatchError> {
        let mut issues = Vec::new();

        if self.agents.is_empty() {
            issues.push(ValidationIssue::new("agents", "At least one agent is required"));
        }
        issues.extend(validate_sender(self.from.as_ref()));

        let batches: Vec<AgentBatch> = self
            .agents
            .into_iter()
            .enumerate()
            .map(|(i, agent)| {
                if agent.id.trim().is_empty() {
                    issues.push(ValidationIssue::new(format!("agents.{i}.id"), "Agent id is required"));
                }
                if agent.recipients.is_empty() {
                    issues.push(ValidationIssue::new(
                        format!("agents.{i}.recipients"),
                        "At least one recipient is required",
                    ));
                }
                AgentBatch {
                    agent_index: i,
                    agent_id: agent.id,
                    agent_name: agent.name,
                    recipients: agent.recipients.into_iter().map(RecipientPayload::render).collect(),
                }
            })
            .collect();

        issues.extend(validate_batches(&batches));

        if issues.is_empty() {
            Ok(batches)
        } else {
            Err(DispatchError::MalformedRequest { issues })
        }
    }
}

impl RecipientPayload {
    fn render(self) -> Recipient {
        let row = self
            .variables
            .map(Row::from_pairs)
            .unwrap_or_default();
        let (subject, body) = if row.is_empty() {
            (self.subject, self.body)
        } else {
            (render(&self.subject, &row), render(&self.body, &row))
        };
        Recipient {
            to: self.to.trim().to_string(),
            subject,
            body,
            name: self
                .name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            source_row: row,
            row_index: None,
        }
    }
}

/// The `from.email` issue, if the request supplies an address that does not parse.
pub fn validate_sender(from: Option<&SenderInput>) -> Option<ValidationIssue> {
    from.and_then(|f| f.email.as_deref()).and_then(sender_issue)
}

/// Per-recipient checks for request-supplied batches.
///
/// Paths point into the request body: `agents.{i}.recipients.{j}.{field}`.
pub fn validate_batches(batches: &[AgentBatch]) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for batch in batches {
        let i = batch.agent_index;
        for (j, recipient) in batch.recipients.iter().enumerate() {
            let path = format!("agents.{i}.recipients.{j}");
            if !is_valid_email(&recipient.to) {
                issues.push(ValidationIssue::new(
                    format!("{path}.to"),
                    format!("Invalid email address: {}", recipient.to),
                ));
            }
            if recipient.subject.trim().is_empty() {
                issues.push(ValidationIssue::new(format!("{path}.subject"), "Subject is empty"));
            }
            if recipient.body.trim().is_empty() {
                issues.push(ValidationIssue::new(format!("{path}.body"), "Body is empty"));
            }
        }
    }
    issues
}

/// Per-recipient checks for batches resolved from a table.
///
/// A bad address is reported once per table cell, at
/// `table.rows.{r}.{email_column}`. Empty renders point at the agent's
/// template, `agents.{i}.subjectTemplate` or `agents.{i}.bodyTemplate`.
pub fn validate_plan(batches: &[AgentBatch], email_column: &str) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut bad_rows = HashSet::new();
    for batch in batches {
        let i = batch.agent_index;
        for recipient in &batch.recipients {
            let row = recipient
                .row_index
                .map_or_else(|| "?".to_string(), |r| r.to_string());
            if !is_valid_email(&recipient.to) && bad_rows.insert(recipient.row_index) {
                issues.push(ValidationIssue::new(
                    format!("table.rows.{row}.{email_column}"),
                    format!("Invalid email address: {}", recipient.to),
                ));
            }
            if recipient.subject.trim().is_empty() {
                issues.push(ValidationIssue::new(
                    format!("agents.{i}.subjectTemplate"),
                    format!("Subject renders empty for table row {row}"),
                ));
            }
            if recipient.body.trim().is_empty() {
                issues.push(ValidationIssue::new(
                    format!("agents.{i}.bodyTemplate"),
                    format!("Body renders empty for table row {row}"),
                ));
            }
        }
    }
    issues
}
