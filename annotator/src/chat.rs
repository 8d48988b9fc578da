//! Chat with the tutor about the current page.
//!
//! Each question goes out with the whole conversation so far and, when the
//! page has content, a padded snapshot of it. The canvas is only read.

use std::sync::Arc;

use canvas::surface::Surface;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::bounds::CapturePurpose;
use crate::capture::{self, CaptureError};
use crate::client::{ChatMessage, ChatRequest, ClientError, TutorClient};

pub struct ChatSession<S: Surface> {
    surface: Arc<Mutex<S>>,
    tutor: Arc<dyn TutorClient>,
    exercise_statement: String,
    history: Vec<ChatMessage>,
}

impl<S: Surface> ChatSession<S> {
    #[must_use]
    pub fn new(surface: Arc<Mutex<S>>, tutor: Arc<dyn TutorClient>, exercise_statement: impl Into<String>) -> Self {
        Self { surface, tutor, exercise_statement: exercise_statement.into(), history: Vec::new() }
    }

    #[must_use]
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    #[must_use]
    pub fn exercise_statement(&self) -> &str {
        &self.exercise_statement
    }

    pub fn set_exercise_statement(&mut self, statement: impl Into<String>) {
        self.exercise_statement = statement.into();
    }

    /// Ask a question. On success both the question and the reply are
    /// appended to the history and the reply is returned.
    ///
    /// # Errors
    ///
    /// Returns the client error unchanged; the history is left as it was.
    pub async fn ask(&mut self, text: &str) -> Result<String, ClientError> {
        let image_data_url = self.snapshot().await;
        let mut messages = self.history.clone();
        messages.push(ChatMessage::user(text));
        let request = ChatRequest { messages, image_data_url, exercise_statement: self.exercise_statement.clone() };

        let reply = self.tutor.chat(&request).await?;
        info!(turns = request.messages.len(), with_image = request.image_data_url.is_some(), "chat: reply received");
        self.history = request.messages;
        self.history.push(ChatMessage::assistant(reply.clone()));
        Ok(reply)
    }

    /// A chat question never fails because of the picture; it is sent
    /// without one instead.
    async fn snapshot(&self) -> Option<String> {
        match capture::capture(&self.surface, CapturePurpose::Snapshot).await {
            Ok(image) => Some(image.data_url),
            Err(CaptureError::NoContent) => {
                debug!("chat: canvas empty, sending without image");
                None
            }
            Err(e) => {
                warn!(error = %e, "chat: snapshot failed, sending without image");
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
