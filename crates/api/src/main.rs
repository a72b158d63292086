use std::sync::Arc;

use triagedesk_api::app::{build_app, services::build_services, worker::spawn_triage_worker};
use triagedesk_api::config::AppConfig;
use triagedesk_classifier::{Classifier, GeminiClassifier};
use triagedesk_jobs::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    triagedesk_observability::init();

    let config = AppConfig::from_env();
    let services = Arc::new(build_services(&config).await?);

    // The worker pool rides in the same process as the gateway. Without an
    // API key the HTTP side still serves; tickets just stay PENDING.
    let _worker = match &config.gemini_api_key {
        Some(key) => {
            let classifier: Arc<dyn Classifier> = Arc::new(GeminiClassifier::new(key.clone())?);
            Some(spawn_triage_worker(
                &services,
                classifier,
                WorkerConfig::default().with_name("triage-worker"),
            ))
        }
        None => {
            tracing::warn!("GEMINI_API_KEY not set; triage worker disabled, tickets will stay PENDING");
            None
        }
    };

    let app = build_app(services);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
