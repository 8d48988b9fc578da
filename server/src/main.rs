mod llm;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

const DEFAULT_PORT: u16 = 3000;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let dotenv = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    if let Err(e) = dotenv {
        tracing::debug!(error = %e, "no .env loaded");
    }

    let port = match std::env::var("PORT").map(|v| v.parse::<u16>()) {
        Ok(Ok(port)) => port,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, default = DEFAULT_PORT, "invalid PORT; using default");
            DEFAULT_PORT
        }
        Err(_) => DEFAULT_PORT,
    };

    // Non-fatal: the tutor endpoints answer 500 until a key is configured.
    let llm: Option<Arc<dyn llm::LlmChat>> = match llm::LlmClient::from_env() {
        Ok(client) => {
            tracing::info!(model = client.model(), "LLM client initialized");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(error = %e, "LLM client not configured; tutor endpoints disabled");
            None
        }
    };

    let state = state::AppState::new(llm);
    let llm_configured = state.llm_configured();
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;

    tracing::info!(%port, llm_configured, "tutor server listening");
    axum::serve(listener, app).await
}
