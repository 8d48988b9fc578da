//! Tutor backend contracts.
//!
//! DESIGN
//! ======
//! The engine never talks HTTP directly. It holds an [`AnnotationClient`]
//! for vision analysis and a [`TutorClient`] for chat and solutions; both are
//! async traits so tests can script them. The request and response types here
//! are the JSON bodies of `/api/analyze`, `/api/chat` and
//! `/api/generate-solution`, shared with the server crate.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::annotation::{Annotation, deserialize_lenient};
use crate::error::ErrorCode;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by tutor backend calls.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never got a response.
    #[error("request failed: {0}")]
    Request(String),

    /// The backend answered with a non-success status.
    #[error("backend returned status {status}")]
    Status { status: u16, body: String },

    /// The response body was not the expected JSON.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// No response within the backstop.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ErrorCode for ClientError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Request(_) => "E_REQUEST",
            Self::Status { .. } => "E_STATUS",
            Self::Decode(_) => "E_DECODE",
            Self::Timeout(_) => "E_TIMEOUT",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Timeout(_) | Self::Status { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// ANALYSIS
// =============================================================================

/// Request mode, chosen from how long the student has been inactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// The student is working: check for errors.
    Active,
    /// The student has paused: offer a hint.
    Idle,
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Active => "active",
            Self::Idle => "idle",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub image_data_url: String,
    pub mode: AnalysisMode,
    #[serde(default)]
    pub exercise_statement: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub annotations: Vec<Annotation>,
}

// =============================================================================
// CHAT
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: ChatRole::User, text: text.into() }
    }

    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, text: text.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data_url: Option<String>,
    #[serde(default)]
    pub exercise_statement: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub content: String,
}

// =============================================================================
// SOLUTION
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionRequest {
    #[serde(default)]
    pub exercise_statement: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data_url: Option<String>,
}

/// One worked step: prose plus the math it produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionStep {
    pub explanation: String,
    #[serde(default)]
    pub latex: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionResponse {
    #[serde(default)]
    pub steps: Vec<SolutionStep>,
}

// =============================================================================
// TRAITS
// =============================================================================

/// Vision analysis backend. Enables mocking in tests.
#[async_trait::async_trait]
pub trait AnnotationClient: Send + Sync {
    /// Send a capture and get back validated, clamped annotations.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] on transport, status, or decode failure.
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<Vec<Annotation>, ClientError>;
}

/// Chat and solution backend.
#[async_trait::async_trait]
pub trait TutorClient: Send + Sync {
    /// Answer the last user message in `request.messages`.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] on transport, status, or decode failure.
    async fn chat(&self, request: &ChatRequest) -> Result<String, ClientError>;

    /// Produce a step-by-step solution of the exercise.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] on transport, status, or decode failure.
    async fn generate_solution(&self, request: &SolutionRequest) -> Result<Vec<SolutionStep>, ClientError>;
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
