//! Campaign dispatch.
//!
//! Every send goes through [`Campaigns`]:
//! 1. `request`: structural validation (all-or-nothing)
//! 2. `transport::resolve_sender()`: sender identity, before any send
//! 3. `engine::dispatch()`: ordered, fail-fast send loop
//!
//! There is no retry and no partial result. A failed run is re-submitted whole.

pub mod engine;
pub mod envelope;
pub mod request;

use std::sync::Arc;

use tracing::info;

use crate::campaign::resolver::plan_batches;
use crate::campaign::{AgentBatch, AgentDefinition, Table};
use crate::config::MailConfig;
use crate::error::{DispatchError, TransportError};
use crate::transport::{ResolvedTransport, SenderInput, Transport, resolve_sender, resolve_transport};

pub use engine::{AgentSendCount, DispatchSummary, dispatch};
pub use request::DispatchRequest;

/// A table-driven campaign: resolve agents server-side, then dispatch.
#[derive(Debug, Clone)]
pub struct CampaignRun {
    pub table: Table,
    pub agents: Vec<AgentDefinition>,
    pub email_column: String,
    pub name_column: Option<String>,
    pub from: Option<SenderInput>,
}

/// Dispatch service: read-only config plus the transport chosen for it.
#[derive(Clone)]
pub struct Campaigns {
    config: Arc<MailConfig>,
    transport: ResolvedTransport,
}

impl Campaigns {
    /// Resolve the transport from `config` (dry run when no host is set).
    pub fn new(config: MailConfig) -> Result<Self, TransportError> {
        let transport = resolve_transport(&config)?;
        Ok(Self {
            config: Arc::new(config),
            transport,
        })
    }

    /// Load [`MailConfig`] from the environment and resolve its transport.
    pub fn from_env() -> crate::error::Result<Self> {
        let config = MailConfig::from_env()?;
        Ok(Self::new(config)?)
    }

    /// Use an explicit transport instead of resolving one from config.
    pub fn with_transport(config: MailConfig, transport: Arc<dyn Transport>, dry_run: bool) -> Self {
        Self {
            config: Arc::new(config),
            transport: ResolvedTransport { transport, dry_run },
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.transport.dry_run
    }

    pub fn config(&self) -> &MailConfig {
        &self.config
    }

    /// Validate and dispatch a request carrying already-resolved recipients.
    pub async fn send(&self, request: DispatchRequest) -> Result<DispatchSummary, DispatchError> {
        let from = request.from.clone();
        let batches = request.into_batches()?;
        self.dispatch_batches(&batches, from.as_ref()).await
    }

    /// Resolve agents against the table and dispatch the non-empty batches.
    pub async fn run(&self, run: CampaignRun) -> Result<DispatchSummary, DispatchError> {
        let batches = plan_batches(
            &run.agents,
            &run.table,
            &run.email_column,
            run.name_column.as_deref(),
        )?;

        let mut issues: Vec<_> = request::validate_sender(run.from.as_ref()).into_iter().collect();
        issues.extend(request::validate_plan(&batches, &run.email_column));
        if !issues.is_empty() {
            return Err(DispatchError::MalformedRequest { issues });
        }

        self.dispatch_batches(&batches, run.from.as_ref()).await
    }

    async fn dispatch_batches(
        &self,
        batches: &[AgentBatch],
        from: Option<&SenderInput>,
    ) -> Result<DispatchSummary, DispatchError> {
        if batches.is_empty() {
            return Err(DispatchError::EmptyRecipientSet);
        }
        let sender = resolve_sender(from, &self.config)?;

        info!(
            agents = batches.len(),
            messages = batches.iter().map(|b| b.recipients.len()).sum::<usize>(),
            from = %sender.email,
            transport = self.transport.transport.name(),
            "Starting dispatch"
        );

        dispatch(
            batches,
            &sender,
            self.transport.transport.as_ref(),
            self.transport.dry_run,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::campaign::{AgentFilter, FilterOperator};
    use crate::transport::DryRunTransport;

    fn config_with_sender() -> MailConfig {
        MailConfig {
            default_from_email: Some("ops@example.com".into()),
            ..MailConfig::default()
        }
    }

    fn recorder_service(config: MailConfig) -> (Campaigns, Arc<DryRunTransport>) {
        let recorder = Arc::new(DryRunTransport::recording());
        let service = Campaigns::with_transport(config, recorder.clone(), true);
        (service, recorder)
    }

    fn contacts() -> Table {
        Table::from_records(
            vec!["Name".into(), "Email".into(), "Plan".into()],
            vec![
                json!({"Name": "Ana", "Email": "ana@example.com", "Plan": "Pro"}),
                json!({"Name": "Ben", "Email": "ben@example.com", "Plan": "Free"}),
                json!({"Name": "Cleo", "Email": null, "Plan": "Pro"}),
            ],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn missing_sender_rejects_before_sending() {
        let (service, recorder) = recorder_service(MailConfig::default());
        let request = DispatchRequest::from_json(json!({
            "agents": [{"id": "a", "name": "A", "recipients": [
                {"to": "ana@example.com", "subject": "Hi", "body": "Hello"}
            ]}]
        }))
        .unwrap();

        let err = service.send(request).await.unwrap_err();
        assert!(matches!(err, DispatchError::MissingSenderIdentity { .. }));
        assert!(recorder.sent().is_empty());
    }

    #[tokio::test]
    async fn invalid_request_never_reaches_transport() {
        let (service, recorder) = recorder_service(config_with_sender());
        let request = DispatchRequest::from_json(json!({
            "agents": [
                {"id": "a", "name": "A", "recipients": [
                    {"to": "ana@example.com", "subject": "Hi", "body": "Hello"}
                ]},
                {"id": "b", "name": "B", "recipients": []}
            ]
        }))
        .unwrap();

        let err = service.send(request).await.unwrap_err();
        assert!(matches!(err, DispatchError::MalformedRequest { .. }));
        assert!(recorder.sent().is_empty());
    }

    #[tokio::test]
    async fn run_resolves_table_and_sends() {
        let (service, recorder) = recorder_service(config_with_sender());
        let pro = AgentDefinition::new("Pro users")
            .with_templates("Hi {{Name}}", "Thanks for using {{plan}}")
            .with_filter(AgentFilter::new("Plan", FilterOperator::Equals, "pro"));
        let everyone = AgentDefinition::new("Everyone");

        let summary = service
            .run(CampaignRun {
                table: contacts(),
                agents: vec![pro, everyone],
                email_column: "Email".into(),
                name_column: Some("Name".into()),
                from: None,
            })
            .await
            .unwrap();

        assert_eq!(summary.total, 3);
        let sent = recorder.sent();
        assert_eq!(sent[0].to, "Ana <ana@example.com>");
        assert_eq!(sent[0].subject, "Hi Ana");
        assert_eq!(sent[0].text, "Thanks for using Pro");
        assert_eq!(sent[0].from, "ops@example.com");
    }

    #[tokio::test]
    async fn run_with_no_matches_is_empty_recipient_set() {
        let (service, recorder) = recorder_service(config_with_sender());
        let nobody = AgentDefinition::new("Nobody")
            .with_filter(AgentFilter::new("Plan", FilterOperator::Equals, "enterprise"));

        let err = service
            .run(CampaignRun {
                table: contacts(),
                agents: vec![nobody],
                email_column: "Email".into(),
                name_column: None,
                from: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::EmptyRecipientSet));
        assert!(recorder.sent().is_empty());
    }

    #[tokio::test]
    async fn run_rejects_invalid_addresses_from_table() {
        let (service, recorder) = recorder_service(config_with_sender());
        let table = Table::from_records(
            vec!["Email".into()],
            vec![json!({"Email": "ok@example.com"}), json!({"Email": "broken"})],
        )
        .unwrap();

        let err = service
            .run(CampaignRun {
                table,
                agents: vec![AgentDefinition::new("All")],
                email_column: "Email".into(),
                name_column: None,
                from: None,
            })
            .await
            .unwrap_err();

        match err {
            DispatchError::MalformedRequest { issues } => {
                assert_eq!(issues[0].path, "table.rows.1.Email");
            }
            other => panic!("Expected MalformedRequest, got {other:?}"),
        }
        assert!(recorder.sent().is_empty());
    }

    #[tokio::test]
    async fn run_paths_skip_dropped_agents() {
        let (service, recorder) = recorder_service(config_with_sender());
        let table = Table::from_records(
            vec!["Email".into(), "Plan".into()],
            vec![
                json!({"Email": "ana@example.com", "Plan": "Free"}),
                json!({"Email": "broken", "Plan": "Pro"}),
            ],
        )
        .unwrap();
        let nobody = AgentDefinition::new("Nobody")
            .with_filter(AgentFilter::new("Plan", FilterOperator::Equals, "enterprise"));
        let pro = AgentDefinition::new("Pro")
            .with_templates("", "Hello")
            .with_filter(AgentFilter::new("Plan", FilterOperator::Equals, "pro"));

        let err = service
            .run(CampaignRun {
                table,
                agents: vec![nobody, pro],
                email_column: "Email".into(),
                name_column: None,
                from: None,
            })
            .await
            .unwrap_err();

        match err {
            DispatchError::MalformedRequest { issues } => {
                let paths: Vec<&str> = issues.iter().map(|i| i.path.as_str()).collect();
                assert_eq!(paths, vec!["table.rows.1.Email", "agents.1.subjectTemplate"]);
            }
            other => panic!("Expected MalformedRequest, got {other:?}"),
        }
        assert!(recorder.sent().is_empty());
    }

    #[tokio::test]
    async fn run_rejects_invalid_sender_address() {
        let (service, recorder) = recorder_service(config_with_sender());
        let err = service
            .run(CampaignRun {
                table: contacts(),
                agents: vec![AgentDefinition::new("Everyone")],
                email_column: "Email".into(),
                name_column: None,
                from: Some(SenderInput {
                    email: Some("not-an-address".into()),
                    name: None,
                }),
            })
            .await
            .unwrap_err();

        match err {
            DispatchError::MalformedRequest { issues } => {
                assert_eq!(issues.len(), 1);
                assert_eq!(issues[0].path, "from.email");
            }
            other => panic!("Expected MalformedRequest, got {other:?}"),
        }
        assert!(recorder.sent().is_empty());
    }

    #[tokio::test]
    async fn invalid_configured_sender_is_missing_identity() {
        let (service, recorder) = recorder_service(MailConfig {
            default_from_email: Some("ops-at-example".into()),
            ..MailConfig::default()
        });
        let err = service
            .run(CampaignRun {
                table: contacts(),
                agents: vec![AgentDefinition::new("Everyone")],
                email_column: "Email".into(),
                name_column: None,
                from: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::MissingSenderIdentity { .. }));
        assert!(recorder.sent().is_empty());
    }

    #[test]
    fn new_without_host_is_dry_run() {
        let service = Campaigns::new(MailConfig::default()).unwrap();
        assert!(service.is_dry_run());
    }
}
