//! Maps the contact table through each agent's filter and templates.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use super::agent::AgentDefinition;
use super::filter::matches;
use super::table::{Row, Table};
use super::template::{placeholders, render};
use crate::error::DispatchError;

/// A concrete message target for one agent, derived fresh on every resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub to: String,
    pub subject: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub source_row: Row,
    /// Index of `source_row` in the table, when resolved from one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_index: Option<usize>,
}

/// An agent together with its resolved, non-empty recipient list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentBatch {
    /// Position of the agent in the submitted list, before empty agents are dropped.
    pub agent_index: usize,
    pub agent_id: String,
    pub agent_name: String,
    pub recipients: Vec<Recipient>,
}

/// Per-agent view used by the pre-dispatch preview.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPreview {
    pub agent_id: String,
    pub agent_name: String,
    pub recipients: Vec<Recipient>,
    /// Template placeholders that match no column of the table.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unknown_placeholders: Vec<String>,
}

/// Resolve one agent against the table. Order follows the table's row order.
///
/// Rows outside the filter, and rows without an email, are skipped.
pub fn resolve(
    agent: &AgentDefinition,
    table: &Table,
    email_column: &str,
    name_column: Option<&str>,
) -> Vec<Recipient> {
    table
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| matches(row, agent.filter.as_ref()))
        .filter_map(|(index, row)| {
            let to = row.value(email_column).trim();
            if to.is_empty() {
                return None;
            }
            let name = name_column
                .map(|column| row.value(column).trim())
                .filter(|name| !name.is_empty())
                .map(str::to_string);
            Some(Recipient {
                to: to.to_string(),
                subject: render(&agent.subject_template, row),
                body: render(&agent.body_template, row),
                name,
                source_row: row.clone(),
                row_index: Some(index),
            })
        })
        .collect()
}

/// Size of the union of destination addresses across all agents.
///
/// Display only: dispatch still sends once per agent and recipient.
/// Addresses are compared exactly as they appear in the table (trimmed, case
/// preserved), so `Ana@x.com` and `ana@x.com` count as two recipients.
pub fn distinct_recipient_count(
    agents: &[AgentDefinition],
    table: &Table,
    email_column: &str,
) -> usize {
    agents
        .iter()
        .flat_map(|agent| resolve(agent, table, email_column, None))
        .map(|recipient| recipient.to)
        .collect::<HashSet<_>>()
        .len()
}

/// Resolve every agent and keep the ones with at least one recipient.
pub fn plan_batches(
    agents: &[AgentDefinition],
    table: &Table,
    email_column: &str,
    name_column: Option<&str>,
) -> Result<Vec<AgentBatch>, DispatchError> {
    let batches: Vec<AgentBatch> = agents
        .iter()
        .enumerate()
        .filter_map(|(agent_index, agent)| {
            let recipients = resolve(agent, table, email_column, name_column);
            if recipients.is_empty() {
                debug!(agent_id = %agent.id, agent = %agent.name, "Agent has no recipients, skipping");
                return None;
            }
            Some(AgentBatch {
                agent_index,
                agent_id: agent.id.clone(),
                agent_name: agent.name.clone(),
                recipients,
            })
        })
        .collect();

    if batches.is_empty() {
        return Err(DispatchError::EmptyRecipientSet);
    }
    Ok(batches)
}

/// Build the preview for every agent, including agents with no recipients.
pub fn preview(
    agents: &[AgentDefinition],
    table: &Table,
    email_column: &str,
    name_column: Option<&str>,
) -> Vec<AgentPreview> {
    agents
        .iter()
        .map(|agent| AgentPreview {
            agent_id: agent.id.clone(),
            agent_name: agent.name.clone(),
            recipients: resolve(agent, table, email_column, name_column),
            unknown_placeholders: unknown_placeholders(agent, table),
        })
        .collect()
}

fn unknown_placeholders(agent: &AgentDefinition, table: &Table) -> Vec<String> {
    let known: HashSet<String> = table
        .columns()
        .iter()
        .map(|c| c.trim().to_lowercase())
        .collect();
    let mut seen = HashSet::new();
    placeholders(&agent.subject_template)
        .into_iter()
        .chain(placeholders(&agent.body_template))
        .filter(|key| !known.contains(&key.to_lowercase()))
        .filter(|key| seen.insert(key.clone()))
        .collect()
}
