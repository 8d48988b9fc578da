//! Tutor service: notebook requests → LLM prompts → typed answers.
//!
//! DESIGN
//! ======
//! Three operations share one shape: build a system prompt around the
//! exercise statement, attach the canvas image to the user turn, call the
//! model, and decode its reply.
//!
//! | Operation | Output | Structured |
//! |-----------|--------|------------|
//! | analyze | annotations (clamped, malformed items dropped) | JSON schema |
//! | chat | free text, fallback apology when empty | no |
//! | generate_solution | steps with explanation + latex | JSON schema |
//!
//! An empty structured reply is an empty result, not an error. Explanations
//! go through [`restore_latex_escapes`] before they leave the server.

use std::sync::OnceLock;

use annotator::annotation::{self, Annotation};
use annotator::client::{AnalysisMode, AnalyzeRequest, ChatMessage, ChatRequest, ChatRole, SolutionRequest, SolutionResponse, SolutionStep};
use annotator::error::ErrorCode;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::mathtext::restore_latex_escapes;
use crate::llm::LlmChat;
use crate::llm::types::{LlmError, Message, ResponseSchema};

const DEFAULT_TUTOR_MAX_TOKENS: u32 = 4096;

/// Sent when the model returns no chat text.
pub const FALLBACK_REPLY: &str = "Lo siento, no pude generar una respuesta.";

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match std::env::var(key).map(|v| v.parse::<T>()) {
        Ok(Ok(value)) => value,
        _ => default,
    }
}

fn tutor_max_tokens() -> u32 {
    static VALUE: OnceLock<u32> = OnceLock::new();
    *VALUE.get_or_init(|| env_parse("TUTOR_MAX_TOKENS", DEFAULT_TUTOR_MAX_TOKENS))
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TutorError {
    #[error("LLM not configured")]
    LlmNotConfigured,
    #[error("conversation has no messages")]
    EmptyConversation,
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
    #[error("model output is not valid JSON: {0}")]
    MalformedOutput(String),
}

impl ErrorCode for TutorError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::LlmNotConfigured => "E_LLM_NOT_CONFIGURED",
            Self::EmptyConversation => "E_EMPTY_CONVERSATION",
            Self::Llm(_) => "E_LLM_ERROR",
            Self::MalformedOutput(_) => "E_MALFORMED_OUTPUT",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Llm(e) if e.retryable())
    }
}

// =============================================================================
// PROMPTS
// =============================================================================

const ANALYZE_SYSTEM: &str = "You are reviewing a student's handwritten math on a notebook page.
The exercise statement is: \"{statement}\".

For every annotation return a bounding box in coordinates relative to the image:
x and y are the top-left corner, width and height the size, all between 0 and 1,
with (0,0) the top-left and (1,1) the bottom-right of the image.

Rules:
1. Write everything in Spanish.
2. \"text\" is a keyword of at most two words; \"explanation\" is the full comment.
3. Write math in explanations as LaTeX between $...$ (inline) or $$...$$ (display).
4. Use type \"warning\" for mistakes, \"info\" for remarks, \"suggestion\" for hints,
   \"reference\" to point at a correct earlier step, \"success\" when the work is correct.";

const ACTIVE_INSTRUCTION: &str = "Check the work for calculation mistakes, logical errors and missing \
justifications. Return one annotation per problem found, and an empty list if there are none.";

const IDLE_INSTRUCTION: &str = "The student has stopped writing and may be stuck. Give one helpful hint \
or suggestion for the next step, pointing at the area to focus on.";

const CHAT_SYSTEM: &str = "You are a patient, encouraging math tutor.
The student is working on: \"{statement}\".

You may receive a picture of their notebook page. Use it to see what they have done so far.
1. Be brief and friendly, and answer in Spanish.
2. Do not give the final answer straight away; guide them one step at a time.
3. If there is a mistake, point at it gently and ask a guiding question.
4. If the page is empty, ask how they plan to start.
5. Write math as LaTeX between $...$ (inline) or $$...$$ (display).";

const SOLUTION_SYSTEM: &str = "You are an expert math tutor.
The exercise statement is: \"{statement}\".

You may receive the student's current work; use it to follow their approach, but give a complete,
correct solution step by step.
1. Write everything in Spanish.
2. For each step give \"explanation\" (what is done, in words) and \"latex\" (the resulting
   expression in raw LaTeX, without dollar signs).";

const SOLUTION_INSTRUCTION: &str = "Solve this problem step by step.";

fn with_statement(template: &str, statement: &str) -> String {
    template.replace("{statement}", statement.trim())
}

fn annotations_schema() -> ResponseSchema {
    let types: Vec<&str> = annotation::AnnotationType::ALL.iter().map(|t| t.as_str()).collect();
    ResponseSchema {
        name: "math_analysis".into(),
        schema: json!({
            "type": "object",
            "properties": {
                "annotations": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "type": { "type": "string", "enum": types },
                            "text": { "type": "string" },
                            "explanation": { "type": "string" },
                            "x": { "type": "number" },
                            "y": { "type": "number" },
                            "width": { "type": "number" },
                            "height": { "type": "number" }
                        },
                        "required": ["type", "text", "explanation", "x", "y", "width", "height"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["annotations"],
            "additionalProperties": false
        }),
    }
}

fn solution_schema() -> ResponseSchema {
    ResponseSchema {
        name: "math_solution".into(),
        schema: json!({
            "type": "object",
            "properties": {
                "steps": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "explanation": { "type": "string" },
                            "latex": { "type": "string" }
                        },
                        "required": ["explanation", "latex"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["steps"],
            "additionalProperties": false
        }),
    }
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Ask the model to annotate the page image.
///
/// # Errors
///
/// [`TutorError::Llm`] on provider failure, [`TutorError::MalformedOutput`]
/// if the reply is not JSON. Individually malformed annotations are dropped.
pub async fn analyze(llm: &dyn LlmChat, request: &AnalyzeRequest) -> Result<Vec<Annotation>, TutorError> {
    let system = with_statement(ANALYZE_SYSTEM, &request.exercise_statement);
    let instruction = match request.mode {
        AnalysisMode::Active => ACTIVE_INSTRUCTION,
        AnalysisMode::Idle => IDLE_INSTRUCTION,
    };
    let messages = [Message::user_with_image(instruction, Some(&request.image_data_url))];
    let schema = annotations_schema();

    let response = llm.chat(tutor_max_tokens(), &system, &messages, Some(&schema)).await?;
    let Some(value) = decode_json(&response.text())? else {
        debug!(mode = %request.mode, "tutor: empty analysis reply");
        return Ok(Vec::new());
    };
    let annotations: Vec<Annotation> = annotation::parse_batch(value)
        .into_iter()
        .map(|mut a| {
            a.text = restore_latex_escapes(&a.text);
            a.explanation = restore_latex_escapes(&a.explanation);
            a
        })
        .collect();
    info!(mode = %request.mode, count = annotations.len(), model = %response.model, "tutor: analysis complete");
    Ok(annotations)
}

/// Continue the conversation. The image goes with the last user turn.
///
/// # Errors
///
/// [`TutorError::EmptyConversation`] with no messages, [`TutorError::Llm`] on
/// provider failure.
pub async fn chat(llm: &dyn LlmChat, request: &ChatRequest) -> Result<String, TutorError> {
    if request.messages.is_empty() {
        return Err(TutorError::EmptyConversation);
    }
    let system = with_statement(CHAT_SYSTEM, &request.exercise_statement);
    let messages = chat_messages(&request.messages, request.image_data_url.as_deref());

    let response = llm.chat(tutor_max_tokens(), &system, &messages, None).await?;
    let text = response.text();
    info!(turns = request.messages.len(), reply_len = text.len(), "tutor: chat reply");
    if text.trim().is_empty() {
        return Ok(FALLBACK_REPLY.to_string());
    }
    Ok(text)
}

/// Ask for a worked solution.
///
/// # Errors
///
/// [`TutorError::Llm`] on provider failure, [`TutorError::MalformedOutput`]
/// if the reply is not a steps object.
pub async fn generate_solution(llm: &dyn LlmChat, request: &SolutionRequest) -> Result<Vec<SolutionStep>, TutorError> {
    let system = with_statement(SOLUTION_SYSTEM, &request.exercise_statement);
    let messages = [Message::user_with_image(SOLUTION_INSTRUCTION, request.image_data_url.as_deref())];
    let schema = solution_schema();

    let response = llm.chat(tutor_max_tokens(), &system, &messages, Some(&schema)).await?;
    let Some(value) = decode_json(&response.text())? else {
        return Ok(Vec::new());
    };
    let parsed: SolutionResponse =
        serde_json::from_value(value).map_err(|e| TutorError::MalformedOutput(e.to_string()))?;
    let steps: Vec<SolutionStep> = parsed
        .steps
        .into_iter()
        .map(|step| SolutionStep {
            explanation: restore_latex_escapes(&step.explanation),
            latex: restore_latex_escapes(&step.latex),
        })
        .collect();
    info!(steps = steps.len(), model = %response.model, "tutor: solution generated");
    Ok(steps)
}

// =============================================================================
// HELPERS
// =============================================================================

fn role_name(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
    }
}

fn chat_messages(history: &[ChatMessage], image_data_url: Option<&str>) -> Vec<Message> {
    let last_user = history.iter().rposition(|m| m.role == ChatRole::User);
    history
        .iter()
        .enumerate()
        .map(|(i, m)| {
            if Some(i) == last_user {
                Message::user_with_image(m.text.clone(), image_data_url)
            } else {
                Message::text(role_name(m.role), m.text.clone())
            }
        })
        .collect()
}

/// Decode the model's JSON reply. Blank text is `None`. Prose around the
/// object (some providers add it) is trimmed to the outermost braces.
fn decode_json(text: &str) -> Result<Option<Value>, TutorError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Ok(Some(value));
    }
    let body = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    };
    serde_json::from_str(body).map(Some).map_err(|e| TutorError::MalformedOutput(e.to_string()))
}

#[cfg(test)]
#[path = "tutor_test.rs"]
mod tests;
