//! HTTP implementation of the tutor contracts over `reqwest`.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::annotation::Annotation;
use crate::client::{
    AnalyzeRequest, AnalyzeResponse, AnnotationClient, ChatReply, ChatRequest, ClientError, SolutionRequest,
    SolutionResponse, SolutionStep, TutorClient,
};
use crate::config::AnnotatorConfig;

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Talks to the tutor server's `/api/*` endpoints.
pub struct HttpTutorClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTutorClient {
    /// # Errors
    ///
    /// Returns [`ClientError::HttpClientBuild`] if the HTTP client fails to build.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ClientError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string(), timeout })
    }

    /// # Errors
    ///
    /// Returns [`ClientError::HttpClientBuild`] if the HTTP client fails to build.
    pub fn from_config(config: &AnnotatorConfig) -> Result<Self, ClientError> {
        Self::new(&config.api_base_url, config.analyze_timeout)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ClientError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self.http.post(&url).json(body).send().await.map_err(|e| self.request_error(&e))?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| self.request_error(&e))?;
        if !(200..300).contains(&status) {
            warn!(%url, status, "tutor: backend returned error status");
            return Err(ClientError::Status { status, body: text });
        }
        debug!(%url, status, bytes = text.len(), "tutor: response received");
        serde_json::from_str(&text).map_err(|e| ClientError::Decode(e.to_string()))
    }

    fn request_error(&self, e: &reqwest::Error) -> ClientError {
        if e.is_timeout() { ClientError::Timeout(self.timeout) } else { ClientError::Request(e.to_string()) }
    }
}

#[async_trait::async_trait]
impl AnnotationClient for HttpTutorClient {
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<Vec<Annotation>, ClientError> {
        let response: AnalyzeResponse = self.post_json("/api/analyze", request).await?;
        Ok(response.annotations)
    }
}

#[async_trait::async_trait]
impl TutorClient for HttpTutorClient {
    async fn chat(&self, request: &ChatRequest) -> Result<String, ClientError> {
        let reply: ChatReply = self.post_json("/api/chat", request).await?;
        Ok(reply.content)
    }

    async fn generate_solution(&self, request: &SolutionRequest) -> Result<Vec<SolutionStep>, ClientError> {
        let response: SolutionResponse = self.post_json("/api/generate-solution", request).await?;
        Ok(response.steps)
    }
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;
