use std::sync::Arc;

use anyhow::Result;
use soillab::{AppState, ChatSession, GeminiClient, LabFinder, SoilLabConfig, logging, web};

#[tokio::main]
async fn main() -> Result<()> {
    // GOOGLE_API_KEY usually lives in .env
    let _ = dotenvy::dotenv();

    let config = SoilLabConfig::load()?;
    logging::init(&config.logging)?;

    let model = Arc::new(GeminiClient::new(&config.gemini)?);
    let finder = LabFinder::new(model, config.finder.variant);
    let session = ChatSession::with_max_exchanges(config.session.max_exchanges);

    tracing::info!(
        model = %config.gemini.model,
        variant = ?config.finder.variant,
        "Starting SoilLab {}",
        soillab::VERSION
    );

    web::run(&config, AppState::new(finder, session)).await
}
