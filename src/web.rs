use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    Form, Router,
    extract::State,
    http::StatusCode,
    response::Html,
    routing::get,
};
use serde::Deserialize;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::api;
use crate::chat::ChatSession;
use crate::chat::gemini::MAX_RETRY_BACKOFF;
use crate::config::{GeminiConfig, SoilLabConfig};
use crate::pipeline::LabFinder;
use crate::render::{RenderOutcome, render_page};

const BODY_LIMIT_BYTES: usize = 16 * 1024;
const RESPONSE_HEADROOM: Duration = Duration::from_secs(30);

/// Shared handler state.
///
/// There is one conversation per process; its mutex keeps submissions from
/// interleaving their exchanges.
#[derive(Clone)]
pub struct AppState {
    pub finder: LabFinder,
    pub session: Arc<Mutex<ChatSession>>,
}

impl AppState {
    pub fn new(finder: LabFinder, session: ChatSession) -> Self {
        Self {
            finder,
            session: Arc::new(Mutex::new(session)),
        }
    }

    /// Run one submission while holding the session
    pub async fn search(&self, location: &str) -> RenderOutcome {
        let mut session = self.session.lock().await;
        self.finder.find(&mut session, location).await
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchForm {
    #[serde(default)]
    pub location: String,
}

pub fn router(state: AppState, request_timeout: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index).post(submit))
        .nest("/api", api::router())
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(cors)
        .with_state(state)
}

async fn index() -> Html<String> {
    Html(render_page("", None))
}

async fn submit(State(state): State<AppState>, Form(form): Form<SearchForm>) -> Html<String> {
    if form.location.trim().is_empty() {
        return Html(render_page(&form.location, None));
    }

    tracing::info!(location = %form.location, "Lab search submitted");
    let outcome = state.search(&form.location).await;
    Html(render_page(&form.location, Some(&outcome)))
}

/// Upper bound for one submission.
///
/// Every model attempt and retry wait must fit inside it so a failing call
/// still reaches the page as an inline error instead of a bare timeout.
#[must_use]
pub fn request_timeout(gemini: &GeminiConfig) -> Duration {
    let attempts = gemini.max_retries + 1;
    Duration::from_secs(u64::from(gemini.timeout_seconds)) * attempts
        + MAX_RETRY_BACKOFF * gemini.max_retries
        + RESPONSE_HEADROOM
}

pub async fn run(config: &SoilLabConfig, state: AppState) -> Result<()> {
    let app = router(state, request_timeout(&config.gemini));

    let addr = tokio::net::lookup_host((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| format!("Failed to resolve {}", config.server.host))?
        .next()
        .with_context(|| format!("No address for {}", config.server.host))?;

    if let (Some(cert), Some(key)) = (&config.server.tls_cert, &config.server.tls_key) {
        #[cfg(feature = "tls")]
        {
            let tls = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert, key)
                .await
                .context("Failed to load TLS certificate or key")?;
            tracing::info!("Web server running at https://{}", addr);
            axum_server::bind_rustls(addr, tls)
                .serve(app.into_make_service())
                .await
                .context("HTTPS server failed")?;
            return Ok(());
        }

        #[cfg(not(feature = "tls"))]
        tracing::warn!(
            "TLS configured ({}, {}) but built without the `tls` feature, serving plain HTTP",
            cert.display(),
            key.display()
        );
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Web server running at http://{}", addr);
    axum::serve(listener, app).await.context("HTTP server failed")?;
    Ok(())
}
