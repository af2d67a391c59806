//! In-memory transport used when no SMTP host is configured.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{OutboundMessage, SendReceipt, Transport};
use crate::error::TransportError;

/// Accepts every message without sending it and returns a JSON preview.
/// Never fails.
///
/// The server-wide instance keeps nothing between sends. Use
/// [`DryRunTransport::recording`] to capture messages for inspection.
#[derive(Debug, Default)]
pub struct DryRunTransport {
    sent: Option<Mutex<Vec<OutboundMessage>>>,
}

impl DryRunTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport that also keeps every message it accepts.
    pub fn recording() -> Self {
        Self {
            sent: Some(Mutex::default()),
        }
    }

    pub fn is_recording(&self) -> bool {
        self.sent.is_some()
    }

    /// Messages recorded so far, in send order. Always empty unless recording.
    pub fn sent(&self) -> Vec<OutboundMessage> {
        match &self.sent {
            Some(sent) => sent.lock().unwrap_or_else(PoisonError::into_inner).clone(),
            None => Vec::new(),
        }
    }
}

#[async_trait]
impl Transport for DryRunTransport {
    fn name(&self) -> &str {
        "dry-run"
    }

    async fn send(&self, message: &OutboundMessage) -> Result<SendReceipt, TransportError> {
        let message_id = format!("<{}@mailcast.dry-run>", Uuid::new_v4());
        let preview = serde_json::json!({
            "messageId": message_id,
            "date": Utc::now().to_rfc3339(),
            "from": message.from,
            "to": message.to,
            "subject": message.subject,
            "text": message.text,
            "html": message.html,
            "headers": message
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect::<serde_json::Map<_, _>>(),
        });

        if let Some(sent) = &self.sent {
            sent.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(message.clone());
        }

        Ok(SendReceipt {
            message_id: Some(message_id),
            preview: Some(preview),
        })
    }
}
