//! Tutor API routes.
//!
//! Each handler decodes the request, hands it to [`crate::services::tutor`],
//! and maps failures to a JSON `{ "error": ... }` body. Provider details are
//! logged, never returned.

use std::sync::Arc;

use annotator::client::{AnalyzeRequest, AnalyzeResponse, ChatReply, ChatRequest, SolutionRequest, SolutionResponse};
use annotator::error::ErrorCode;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use tracing::warn;

use crate::llm::LlmChat;
use crate::services::tutor::{self, TutorError};
use crate::state::AppState;

const NOT_CONFIGURED: &str = "API key not configured";

/// An error response: status plus a short public message.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

fn require_llm(state: &AppState, endpoint: &str) -> Result<Arc<dyn LlmChat>, ApiError> {
    state
        .llm
        .clone()
        .ok_or_else(|| tutor_error_to_response(endpoint, &TutorError::LlmNotConfigured, NOT_CONFIGURED))
}

/// Map a tutor failure to a response. `fallback` is the endpoint's generic
/// failure message.
pub(crate) fn tutor_error_to_response(endpoint: &str, err: &TutorError, fallback: &'static str) -> ApiError {
    warn!(endpoint, code = err.error_code(), retryable = err.retryable(), error = %err, "api: tutor request failed");
    match err {
        TutorError::LlmNotConfigured => ApiError { status: StatusCode::INTERNAL_SERVER_ERROR, message: NOT_CONFIGURED },
        TutorError::EmptyConversation => ApiError { status: StatusCode::BAD_REQUEST, message: "No messages provided" },
        TutorError::Llm(_) | TutorError::MalformedOutput(_) => {
            ApiError { status: StatusCode::INTERNAL_SERVER_ERROR, message: fallback }
        }
    }
}

/// `POST /api/analyze`: annotate the page image.
pub async fn analyze(
    State(state): State<AppState>,
    Json(body): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let llm = require_llm(&state, "analyze")?;
    let annotations = tutor::analyze(llm.as_ref(), &body)
        .await
        .map_err(|e| tutor_error_to_response("analyze", &e, "Failed to analyze canvas"))?;
    Ok(Json(AnalyzeResponse { annotations }))
}

/// `POST /api/chat`: answer the student's latest message.
pub async fn chat(State(state): State<AppState>, Json(body): Json<ChatRequest>) -> Result<Json<ChatReply>, ApiError> {
    let llm = require_llm(&state, "chat")?;
    let content = tutor::chat(llm.as_ref(), &body)
        .await
        .map_err(|e| tutor_error_to_response("chat", &e, "Failed to process chat"))?;
    Ok(Json(ChatReply { content }))
}

/// `POST /api/generate-solution`: worked solution steps.
pub async fn generate_solution(
    State(state): State<AppState>,
    Json(body): Json<SolutionRequest>,
) -> Result<Json<SolutionResponse>, ApiError> {
    let llm = require_llm(&state, "generate-solution")?;
    let steps = tutor::generate_solution(llm.as_ref(), &body)
        .await
        .map_err(|e| tutor_error_to_response("generate-solution", &e, "Failed to generate solution"))?;
    Ok(Json(SolutionResponse { steps }))
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
