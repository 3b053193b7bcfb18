use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{FinderError, VERSION};
use crate::models::{ChatRole, LabEntry};
use crate::render::{MapView, RenderOutcome};
use crate::web::AppState;

#[derive(Debug, Deserialize)]
pub struct LabsQuery {
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LabsResponse {
    Ok {
        labs: Vec<LabEntry>,
        skipped: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        map: Option<MapView>,
    },
    InvalidInput {
        message: String,
    },
    ExtractionFailure {
        message: String,
    },
    DecodeFailure {
        message: String,
    },
    ServiceUnavailable {
        message: String,
    },
}

fn labs_response(outcome: RenderOutcome) -> (StatusCode, LabsResponse) {
    let message = outcome.error_message().map(ToString::to_string);
    match outcome {
        RenderOutcome::Labs(report) => (
            StatusCode::OK,
            LabsResponse::Ok {
                labs: report.labs,
                skipped: report.skipped,
                map: report.map,
            },
        ),
        RenderOutcome::ExtractionFailure => (
            StatusCode::UNPROCESSABLE_ENTITY,
            LabsResponse::ExtractionFailure {
                message: message.unwrap_or_default(),
            },
        ),
        RenderOutcome::DecodeFailure => (
            StatusCode::UNPROCESSABLE_ENTITY,
            LabsResponse::DecodeFailure {
                message: message.unwrap_or_default(),
            },
        ),
        RenderOutcome::ServiceUnavailable { message } => (
            StatusCode::BAD_GATEWAY,
            LabsResponse::ServiceUnavailable { message },
        ),
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/labs", get(find_labs))
        .route("/session", get(get_session).delete(clear_session))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": VERSION }))
}

async fn find_labs(
    State(state): State<AppState>,
    Query(query): Query<LabsQuery>,
) -> (StatusCode, Json<LabsResponse>) {
    if query.location.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(LabsResponse::InvalidInput {
                message: FinderError::validation("please enter a location").user_message(),
            }),
        );
    }

    let (status, body) = labs_response(state.search(&query.location).await);
    (status, Json(body))
}

/// One retained turn, without its text
#[derive(Debug, Serialize)]
struct TurnSummary {
    role: ChatRole,
    created_at: DateTime<Utc>,
}

async fn get_session(State(state): State<AppState>) -> Json<Value> {
    let session = state.session.lock().await;
    let turns: Vec<TurnSummary> = session
        .history()
        .iter()
        .map(|turn| TurnSummary {
            role: turn.role,
            created_at: turn.created_at,
        })
        .collect();
    Json(json!({ "exchanges": session.exchanges(), "turns": turns }))
}

async fn clear_session(State(state): State<AppState>) -> StatusCode {
    state.session.lock().await.clear();
    tracing::info!("Conversation history cleared");
    StatusCode::NO_CONTENT
}
