//! Audio transcription clients
//!
//! Two providers: Gemini multimodal (audio sent inline as base64) and OpenAI
//! Whisper (multipart upload). One upstream call per transcription; there is
//! no chunking, no streaming, and no fallback provider.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

use super::llm::{extract_text, GEMINI_API_HOST};

const OPENAI_API_HOST: &str = "https://api.openai.com/v1";
const WHISPER_MODEL: &str = "whisper-1";

const TRANSCRIBE_PROMPT: &str =
    "Please transcribe this audio recording. Only provide the transcription text, nothing else.";

#[derive(Debug, Error)]
pub enum AsrError {
    #[error("Failed to reach transcription API: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Transcription API error ({status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("Transcription response contained no text")]
    EmptyTranscript,
}

/// A completed transcription.
#[derive(Debug, Clone)]
pub struct Transcription {
    pub text: String,
    pub language: String,
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: Vec<u8>, mime: &str) -> Result<Transcription, AsrError>;
}

/// Gemini multimodal transcription client
#[derive(Clone)]
pub struct GeminiAsr {
    client: Arc<Client>,
    host: String,
    api_key: String,
    model: String,
}

impl GeminiAsr {
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

#[async_trait]
impl Transcriber for GeminiAsr {
    async fn transcribe(&self, audio: Vec<u8>, mime: &str) -> Result<Transcription, AsrError> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": TRANSCRIBE_PROMPT },
                    { "inline_data": { "mime_type": mime, "data": BASE64.encode(&audio) } },
                ],
            }]
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
            return Err(AsrError::Api { status, body });
        }

        let raw: Value = response.json().await?;
        let text = extract_text(&raw).ok_or(AsrError::EmptyTranscript)?;

        // The upstream call does not report a language; callers get the
        // service default.
        Ok(Transcription {
            text,
            language: "en".to_string(),
        })
    }
}

/// OpenAI Whisper transcription client
#[derive(Clone)]
pub struct WhisperAsr {
    client: Arc<Client>,
    host: String,
    api_key: String,
}

impl WhisperAsr {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Arc::new(Client::new()),
            host: OPENAI_API_HOST.to_string(),
            api_key,
        }
    }

    /// Point the client at a non-default API host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }
}

#[async_trait]
impl Transcriber for WhisperAsr {
    async fn transcribe(&self, audio: Vec<u8>, mime: &str) -> Result<Transcription, AsrError> {
        let file = Part::bytes(audio)
            .file_name("audio.webm")
            .mime_str(mime)?;
        let form = Form::new()
            .part("file", file)
            .text("model", WHISPER_MODEL)
            .text("response_format", "text");

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.host))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AsrError::Api { status, body });
        }

        let text = response.text().await?.trim().to_string();
        if text.is_empty() {
            return Err(AsrError::EmptyTranscript);
        }

        Ok(Transcription {
            text,
            language: "en".to_string(),
        })
    }
}
