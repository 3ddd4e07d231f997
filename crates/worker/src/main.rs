//! Follow-up plan publication worker.
//!
//! Wires configuration, storage, the external document services and leader
//! election into a `PublicationScheduler`, then runs until SIGINT/SIGTERM.

use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use followup_infra::config::{ElectorConfig, HttpClientConfig, WorkerConfig};
use followup_infra::document::{HttpDocumentPublisher, HttpDocumentRenderer, HttpNameResolver};
use followup_infra::leader::{HttpLeaderElector, LeaderElector, LocalLeaderElector};
use followup_infra::publication::{PublicationOrchestrator, PublicationScheduler};
use followup_infra::repository::PostgresPlanRepository;
use followup_observability::LogFormat;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            followup_observability::init(LogFormat::default());
            tracing::error!(error = %err, "invalid configuration");
            return Err(err).context("loading configuration");
        }
    };
    followup_observability::init(config.log_format);

    let pool = PgPool::connect(&config.database_url)
        .await
        .context("connecting to Postgres")?;
    let client = http_client(&config.http)?;

    let elector = elector_for(&config.elector, &client);
    let mut orchestrator = PublicationOrchestrator::new(
        PostgresPlanRepository::new(pool.clone()),
        HttpDocumentRenderer::new(client.clone(), config.http.pdfgen_url.clone()),
        publisher_for(&config.http, &client),
        &config.publication,
    );
    match &config.http.person_url {
        Some(url) => {
            orchestrator =
                orchestrator.with_name_resolver(HttpNameResolver::new(client.clone(), url.clone()));
        }
        None => tracing::warn!("PERSON_URL not set; counterparty names will not be resolved"),
    }

    let handle = PublicationScheduler::new(elector, orchestrator, config.publication.clone())
        .spawn(CancellationToken::new());

    shutdown_signal().await;
    tracing::info!("shutdown requested; finishing current plan");

    let stats = handle
        .shutdown()
        .await
        .context("publication scheduler terminated abnormally")?;
    pool.close().await;

    tracing::info!(
        ticks = stats.ticks,
        runs = stats.runs,
        published = stats.items_published,
        failed = stats.items_failed,
        "worker stopped"
    );
    Ok(())
}

fn http_client(config: &HttpClientConfig) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .context("building HTTP client")
}

fn elector_for(config: &ElectorConfig, client: &reqwest::Client) -> Arc<dyn LeaderElector> {
    match config {
        ElectorConfig::Local => {
            tracing::info!("ELECTOR_PATH not set; running as the only instance");
            Arc::new(LocalLeaderElector)
        }
        ElectorConfig::Http { url, instance_name } => {
            let elector = HttpLeaderElector::new(client.clone(), url.clone(), instance_name.clone());
            tracing::info!(
                elector = %url,
                instance = elector.instance_name(),
                "using leader election sidecar"
            );
            Arc::new(elector)
        }
    }
}

fn publisher_for(config: &HttpClientConfig, client: &reqwest::Client) -> HttpDocumentPublisher {
    let publisher = HttpDocumentPublisher::new(client.clone(), config.archive_url.clone());
    match &config.archive_token {
        Some(token) => publisher.with_token(token.clone()),
        None => publisher,
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
