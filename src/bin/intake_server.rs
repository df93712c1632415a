//! HTTP server binary for relocation-intake.
//!
//! A thin shim over the library crate: axum routes feed the framework-
//! agnostic handlers in [`relocation_intake::handler`], which own the
//! method/preflight contract. Every method is routed through — the handlers
//! answer OPTIONS and reject non-POST themselves, so the wire behaviour is
//! identical whether the library runs here or behind a serverless adapter.

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::any;
use axum::{Json, Router};
use clap::Parser;
use relocation_intake::{handle_render, handle_submit, ApiResponse, IntakeConfig, CORS_HEADERS};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Intake form endpoint server.
///
/// Store credentials come from the environment (`KINTONE_BASE_URL`,
/// `KINTONE_API_TOKEN`, `KINTONE_APP_ID`), optional mail settings from
/// `EMAIL_*`, and `ENABLE_PDF=true` turns on the document stage.
#[derive(Debug, Parser)]
#[command(name = "intake-server", version, about)]
struct Cli {
    /// Socket address to listen on.
    #[arg(long, env = "INTAKE_BIND", default_value = "0.0.0.0:3000")]
    bind: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Arc::new(IntakeConfig::from_env());
    if let Err(e) = config.validate() {
        // Start anyway — each request re-reports the problem — but make the
        // misconfiguration impossible to miss in the logs.
        tracing::warn!("Store configuration incomplete: {e}");
    }

    let app = Router::new()
        .route("/api/submit", any(submit_route))
        .route("/api/generate-pdf", any(render_route))
        .with_state(config);

    let listener = TcpListener::bind(&cli.bind)
        .await
        .with_context(|| format!("failed to bind {}", cli.bind))?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .await
        .context("server terminated")?;

    Ok(())
}

async fn submit_route(
    State(config): State<Arc<IntakeConfig>>,
    method: Method,
    body: String,
) -> impl IntoResponse {
    into_axum(handle_submit(method.as_str(), &body, &config).await)
}

async fn render_route(
    State(config): State<Arc<IntakeConfig>>,
    method: Method,
    body: String,
) -> impl IntoResponse {
    into_axum(handle_render(method.as_str(), &body, &config).await)
}

/// Map the library response onto an axum response, CORS headers included.
fn into_axum(response: ApiResponse) -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    for (name, value) in CORS_HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }

    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, headers, Json(response.body))
}
