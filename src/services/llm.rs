//! Text generation client for the Google Gemini API

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

use crate::types::{ConversationTurn, Role};

pub(crate) const GEMINI_API_HOST: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Failed to reach text generation API: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Text generation API error ({status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("Text generation response contained no text")]
    EmptyResponse,
}

/// Which prompt to build for a generation call.
#[derive(Debug, Clone, Copy)]
pub enum GenerationStage<'a> {
    /// Initial reaction to the question.
    Opening,
    /// Justify an already-drawn verdict ("yes" / "no" / "maybe") in character.
    Verdict(&'a str),
}

/// One generation call: a member's personality, the user's question, and any
/// prior conversation to render into the prompt.
#[derive(Debug)]
pub struct GenerationRequest<'a> {
    pub personality_prompt: &'a str,
    pub question: &'a str,
    pub history: &'a [ConversationTurn],
    pub stage: GenerationStage<'a>,
}

/// Seam for the orchestrator: anything that can produce a member's utterance.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a short personality-flavored utterance. One attempt, no
    /// retries; any upstream failure surfaces as an error.
    async fn generate(&self, req: GenerationRequest<'_>) -> Result<String, LlmError>;
}

/// Gemini `generateContent` client
#[derive(Clone)]
pub struct GeminiClient {
    client: Arc<Client>,
    host: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Arc::new(Client::new()),
            host: GEMINI_API_HOST.to_string(),
            api_key,
            model,
        }
    }

    /// Point the client at a non-default API host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }
}

/// Render prior turns as a readable transcript. The most recent turn is the
/// question itself and is supplied separately, so it is not repeated here.
fn render_history(history: &[ConversationTurn]) -> String {
    let prior = &history[..history.len().saturating_sub(1)];
    if prior.is_empty() {
        return String::new();
    }

    let mut rendered = String::from("Previous conversation:\n");
    for turn in prior {
        let speaker = match turn.role {
            Role::User => "User",
            Role::Assistant => "Panel",
        };
        rendered.push_str(&format!("{}: {}\n", speaker, turn.content));
    }
    rendered.push('\n');
    rendered
}

fn build_prompt(req: &GenerationRequest<'_>) -> String {
    match req.stage {
        GenerationStage::Opening => format!(
            "{}\n\n{}Question: {}\n\nGive your initial reaction in 20-40 words.",
            req.personality_prompt,
            render_history(req.history),
            req.question
        ),
        GenerationStage::Verdict(verdict) => format!(
            "{}\n\nQuestion: {}\n\nYour verdict is: {}\n\nExplain your reasoning in 20-40 words.",
            req.personality_prompt,
            req.question,
            verdict.to_uppercase()
        ),
    }
}

/// Pull the concatenated text parts out of a `generateContent` response.
/// Navigates the raw JSON rather than deserializing a strict struct, since
/// responses gain and lose fields across model versions.
pub(crate) fn extract_text(raw: &Value) -> Option<String> {
    let parts = raw
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|arr| arr.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(|p| p.as_array())?;

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
        .collect::<Vec<_>>()
        .join("");

    let text = text.trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, req: GenerationRequest<'_>) -> Result<String, LlmError> {
        let prompt = build_prompt(&req);
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.host, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, body });
        }

        let raw: Value = response.json().await?;
        extract_text(&raw).ok_or(LlmError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opening_prompt_contains_personality_and_question() {
        let req = GenerationRequest {
            personality_prompt: "You are Dragon, a bold visionary.",
            question: "Should I start a company?",
            history: &[],
            stage: GenerationStage::Opening,
        };
        let prompt = build_prompt(&req);
        assert!(prompt.starts_with("You are Dragon"));
        assert!(prompt.contains("Question: Should I start a company?"));
        assert!(prompt.contains("initial reaction in 20-40 words"));
        assert!(!prompt.contains("Previous conversation"));
    }

    #[test]
    fn test_verdict_prompt_uppercases_verdict() {
        let req = GenerationRequest {
            personality_prompt: "You are Ox.",
            question: "Should I quit?",
            history: &[],
            stage: GenerationStage::Verdict("maybe"),
        };
        let prompt = build_prompt(&req);
        assert!(prompt.contains("Your verdict is: MAYBE"));
        assert!(prompt.contains("Explain your reasoning"));
    }

    #[test]
    fn test_history_excludes_most_recent_turn() {
        let history = vec![
            ConversationTurn::user("first question"),
            ConversationTurn::assistant("panel answer"),
            ConversationTurn::user("the current question"),
        ];
        let rendered = render_history(&history);
        assert!(rendered.contains("User: first question"));
        assert!(rendered.contains("Panel: panel answer"));
        assert!(!rendered.contains("the current question"));
    }

    #[test]
    fn test_single_turn_history_renders_nothing() {
        let history = vec![ConversationTurn::user("only the question")];
        assert_eq!(render_history(&history), "");
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let raw = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Fortune favors " }, { "text": "the brave!" }] }
            }]
        });
        assert_eq!(extract_text(&raw).unwrap(), "Fortune favors the brave!");
    }

    #[test]
    fn test_extract_text_empty_candidates() {
        assert!(extract_text(&json!({ "candidates": [] })).is_none());
        assert!(extract_text(&json!({})).is_none());
    }
}
