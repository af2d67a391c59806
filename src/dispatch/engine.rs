//! The ordered, fail-fast dispatch loop.

use serde::Serialize;
use tracing::{debug, error, info};

use super::envelope::build_envelope;
use crate::campaign::AgentBatch;
use crate::error::DispatchError;
use crate::transport::{Sender, Transport};

/// Sent count for one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSendCount {
    pub agent_id: String,
    pub agent_name: String,
    pub sent_count: usize,
}

/// Result of a fully successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchSummary {
    pub per_agent: Vec<AgentSendCount>,
    pub total: usize,
    pub dry_run: bool,
}

impl DispatchSummary {
    /// Human-readable outcome for the operator.
    pub fn message(&self) -> String {
        let emails = plural(self.total, "email", "emails");
        let agents = plural(self.per_agent.len(), "agent", "agents");
        if self.dry_run {
            format!("Prepared {emails} across {agents} (dry run: no SMTP host configured, nothing was sent)")
        } else {
            format!("Sent {emails} across {agents}")
        }
    }
}

fn plural(count: usize, one: &str, many: &str) -> String {
    format!("{count} {}", if count == 1 { one } else { many })
}

/// Send every recipient of every batch, strictly in order.
///
/// Agents go in the order given and recipients in resolution order; each send
/// is awaited before the next starts. The first transport failure aborts the
/// whole call with [`DispatchError::SendFailure`] and no partial summary.
pub async fn dispatch(
    batches: &[AgentBatch],
    sender: &Sender,
    transport: &dyn Transport,
    dry_run: bool,
) -> Result<DispatchSummary, DispatchError> {
    let mut per_agent = Vec::with_capacity(batches.len());
    let mut total = 0;

    for batch in batches {
        debug!(
            agent_id = %batch.agent_id,
            agent = %batch.agent_name,
            recipients = batch.recipients.len(),
            "Dispatching agent"
        );

        for recipient in &batch.recipients {
            let message = build_envelope(sender, batch, recipient);
            let receipt = match transport.send(&message).await {
                Ok(receipt) => receipt,
                Err(cause) => {
                    error!(
                        agent_id = %batch.agent_id,
                        to = %recipient.to,
                        transport = transport.name(),
                        error = %cause,
                        "Send failed, aborting dispatch"
                    );
                    return Err(DispatchError::SendFailure {
                        recipient: recipient.to.clone(),
                        cause,
                    });
                }
            };

            if dry_run {
                let preview = receipt
                    .preview
                    .as_ref()
                    .map(|p| p.to_string())
                    .unwrap_or_default();
                info!(
                    agent = %batch.agent_name,
                    to = %message.to,
                    subject = %message.subject,
                    preview = %preview,
                    "Dry run message"
                );
            }
        }

        per_agent.push(AgentSendCount {
            agent_id: batch.agent_id.clone(),
            agent_name: batch.agent_name.clone(),
            sent_count: batch.recipients.len(),
        });
        total += batch.recipients.len();
    }

    info!(total, agents = per_agent.len(), dry_run, "Dispatch complete");

    Ok(DispatchSummary {
        per_agent,
        total,
        dry_run,
    })
}
