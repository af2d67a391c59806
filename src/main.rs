use mailcast::api::campaign_routes;
use mailcast::config::ServerConfig;
use mailcast::dispatch::Campaigns;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let campaigns = Campaigns::from_env()?;
    let server_config = ServerConfig::from_env()?;
    let mail_config = campaigns.config();

    eprintln!("📬 mailcast v{}", env!("CARGO_PKG_VERSION"));
    match mail_config.host.as_deref() {
        Some(host) => eprintln!(
            "   SMTP: {}:{} ({})",
            host,
            mail_config.port,
            if mail_config.secure { "TLS" } else { "STARTTLS" }
        ),
        None => eprintln!("   SMTP: not configured, running in dry-run mode"),
    }
    eprintln!(
        "   Default sender: {}",
        mail_config
            .default_from_email
            .as_deref()
            .unwrap_or("(none, requests must supply from.email)")
    );

    let app = campaign_routes(campaigns);

    let addr = server_config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    eprintln!("   API: http://{}/api/campaigns\n", addr);
    tracing::info!(addr = %addr, "Campaign API listening");

    axum::serve(listener, app).await?;
    Ok(())
}
