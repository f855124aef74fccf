//! HTTP handlers for the deliberation API

use axum::{
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path as FsPath;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::jury::{JuryMember, ScriptStage, Stance, Verdict};
use crate::server::ServerState;
use crate::types::ConversationTurn;

/// Minimum question length for the opinions flow.
pub const MIN_QUESTION_LEN: usize = 3;

/// Minimum question length for the legacy verdict flow.
pub const LEGACY_MIN_QUESTION_LEN: usize = 10;

/// Maximum question length for both flows.
pub const MAX_QUESTION_LEN: usize = 500;

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0} not configured")]
    NotConfigured(&'static str),
    #[error("{0}")]
    Upstream(String),
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::NotConfigured(service) => (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("{} service not configured", service),
            ),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Trim and length-check a question. Limits are measured in characters, not
/// bytes, so multi-byte questions are not over-counted.
fn validate_question(raw: &str, min: usize) -> Result<String, ApiError> {
    let question = raw.trim();
    let len = question.chars().count();
    if len < min {
        return Err(ApiError::BadRequest(format!(
            "Question must be at least {} characters",
            min
        )));
    }
    if len > MAX_QUESTION_LEN {
        return Err(ApiError::BadRequest(format!(
            "Question must be less than {} characters",
            MAX_QUESTION_LEN
        )));
    }
    Ok(question.to_string())
}

// ── Request / response shapes ──

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
    #[serde(default)]
    pub conversation_history: Vec<ConversationTurn>,
}

#[derive(Debug, Serialize)]
pub struct MemberView {
    pub id: String,
    pub name: String,
    pub stance: Stance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

impl From<&JuryMember> for MemberView {
    fn from(member: &JuryMember) -> Self {
        Self {
            id: member.id.clone(),
            name: member.name.clone(),
            stance: member.stance,
            emoji: member.emoji.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OpinionView {
    pub speaker: String,
    pub text: String,
    /// Index into `/api/audio/{session_id}/{index}`; absent when synthesis
    /// failed for this entry.
    pub audio_index: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct OpinionsResponse {
    pub session_id: Uuid,
    pub question: String,
    pub opinions: Vec<OpinionView>,
}

#[derive(Debug, Serialize)]
pub struct ScriptEntryView {
    pub speaker: String,
    pub stage: ScriptStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
    pub text: String,
    pub audio_index: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct VerdictResponse {
    pub session_id: Uuid,
    pub question: String,
    pub verdict: Verdict,
    pub script: Vec<ScriptEntryView>,
}

#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub transcript: String,
    pub language: String,
}

// ── Handlers ──

/// Root endpoint with API info
pub async fn index_handler() -> impl IntoResponse {
    Json(json!({
        "name": "The Jury API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "AI voice deliberation panel - Gemini opinions with BosonAI cloned voices",
        "endpoints": {
            "GET /health": "Health check",
            "GET /api/jury-members": "List all jury members",
            "POST /api/opinions": "Generate opinions with audio (JSON question or audio upload)",
            "POST /api/verdict": "Legacy verdict flow with per-member votes",
            "GET /api/audio/<session_id>/<index>": "Fetch one synthesized response",
            "POST /api/transcribe": "Transcribe audio to text",
        },
    }))
}

/// Health check endpoint
pub async fn health_handler(State(state): State<ServerState>) -> impl IntoResponse {
    let configured = |ok: bool| if ok { "connected" } else { "not configured" };
    Json(json!({
        "status": "healthy",
        "services": {
            "bosonai_tts": configured(state.config.tts_configured()),
            "google_gemini": configured(state.config.llm_configured()),
            "transcription": configured(state.asr.is_some()),
        },
        "engine": if state.engine.is_some() { "initialized" } else { "not initialized" },
    }))
}

/// Ordered list of jury members
pub async fn jury_members_handler(State(state): State<ServerState>) -> Json<Vec<MemberView>> {
    Json(state.members.iter().map(MemberView::from).collect())
}

/// Pull a question (and optional history) out of either a JSON body or a
/// multipart audio upload. Audio uploads are transcribed first.
async fn extract_question(
    state: &ServerState,
    req: Request,
) -> Result<(String, Vec<ConversationTurn>), ApiError> {
    let is_multipart = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("multipart/form-data"))
        .unwrap_or(false);

    if is_multipart {
        let mut multipart = Multipart::from_request(req, &())
            .await
            .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?;

        let mut audio: Option<(Vec<u8>, String)> = None;
        let mut history: Vec<ConversationTurn> = Vec::new();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "audio" => {
                    let mime = field
                        .content_type()
                        .unwrap_or("audio/webm")
                        .to_string();
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::BadRequest(format!("Invalid audio upload: {}", e)))?;
                    if bytes.is_empty() {
                        return Err(ApiError::BadRequest("No file selected".to_string()));
                    }
                    audio = Some((bytes.to_vec(), mime));
                }
                "conversation_history" => {
                    let text = field.text().await.map_err(|e| {
                        ApiError::BadRequest(format!("Invalid conversation history: {}", e))
                    })?;
                    history = serde_json::from_str(&text).map_err(|e| {
                        ApiError::BadRequest(format!("Invalid conversation history: {}", e))
                    })?;
                }
                _ => {}
            }
        }

        let (bytes, mime) =
            audio.ok_or_else(|| ApiError::BadRequest("Audio file is required".to_string()))?;
        let asr = state
            .asr
            .as_ref()
            .ok_or(ApiError::NotConfigured("Transcription"))?;

        info!("Transcribing uploaded question audio ({} bytes)", bytes.len());
        let transcription = asr
            .transcribe(bytes, &mime)
            .await
            .map_err(|e| ApiError::Upstream(format!("Failed to transcribe audio: {}", e)))?;
        info!("Transcription: {}", transcription.text);

        Ok((transcription.text, history))
    } else {
        let Json(body) = Json::<QuestionRequest>::from_request(req, &())
            .await
            .map_err(|e| ApiError::BadRequest(format!("Question or audio file is required: {}", e)))?;
        Ok((body.question, body.conversation_history))
    }
}

/// Write each synthesized blob to `<temp>/<session_id>/<index>.wav`, returning
/// the per-entry audio index (None when there is nothing to serve).
async fn persist_session_audio(
    temp_dir: &FsPath,
    session_id: &Uuid,
    audio: &[Option<Vec<u8>>],
) -> Result<Vec<Option<usize>>, ApiError> {
    let session_dir = temp_dir.join(session_id.to_string());
    tokio::fs::create_dir_all(&session_dir)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to create session dir: {}", e)))?;

    let mut indices = Vec::with_capacity(audio.len());
    for (idx, bytes) in audio.iter().enumerate() {
        match bytes {
            Some(bytes) => {
                let path = session_dir.join(format!("{}.wav", idx));
                match tokio::fs::write(&path, bytes).await {
                    Ok(()) => indices.push(Some(idx)),
                    Err(e) => {
                        warn!("Failed to write {}: {}", path.display(), e);
                        indices.push(None);
                    }
                }
            }
            None => indices.push(None),
        }
    }
    Ok(indices)
}

/// Generate opinions with audio for a question (text or uploaded audio)
pub async fn opinions_handler(
    State(state): State<ServerState>,
    req: Request,
) -> Result<Json<OpinionsResponse>, ApiError> {
    let (raw_question, history) = extract_question(&state, req).await?;
    let question = validate_question(&raw_question, MIN_QUESTION_LEN)?;

    let engine = state.engine.as_ref().ok_or(ApiError::NotConfigured("Engine"))?;

    info!("Generating opinions for: {}", question);
    let result = engine
        .deliberate(&question, &history, None)
        .await
        .map_err(|e| ApiError::Upstream(format!("Failed to generate opinions: {}", e)))?;

    let session_id = Uuid::new_v4();
    let indices = persist_session_audio(&state.temp_dir, &session_id, &result.audio).await?;

    let opinions: Vec<OpinionView> = result
        .opinions
        .iter()
        .zip(&indices)
        .map(|(entry, audio_index)| OpinionView {
            speaker: entry.member.name.clone(),
            text: entry.text.clone(),
            audio_index: *audio_index,
        })
        .collect();

    info!("Generated {} opinions with audio", opinions.len());
    Ok(Json(OpinionsResponse {
        session_id,
        question,
        opinions,
    }))
}

/// Legacy verdict flow: opening + vote per member, plurality aggregation
pub async fn verdict_handler(
    State(state): State<ServerState>,
    Json(body): Json<QuestionRequest>,
) -> Result<Json<VerdictResponse>, ApiError> {
    let question = validate_question(&body.question, LEGACY_MIN_QUESTION_LEN)?;

    let engine = state.engine.as_ref().ok_or(ApiError::NotConfigured("Engine"))?;

    info!("Generating verdict deliberation for: {}", question);
    let result = engine
        .deliberate_verdict(&question, None)
        .await
        .map_err(|e| ApiError::Upstream(format!("Failed to generate verdict: {}", e)))?;

    let session_id = Uuid::new_v4();
    let indices = persist_session_audio(&state.temp_dir, &session_id, &result.audio).await?;

    let script: Vec<ScriptEntryView> = result
        .script
        .iter()
        .zip(&indices)
        .map(|(entry, audio_index)| ScriptEntryView {
            speaker: entry.member.name.clone(),
            stage: entry.stage,
            verdict: entry.verdict,
            text: entry.text.clone(),
            audio_index: *audio_index,
        })
        .collect();

    Ok(Json(VerdictResponse {
        session_id,
        question,
        verdict: result.verdict,
        script,
    }))
}

/// Serve one synthesized WAV for a session
pub async fn audio_handler(
    State(state): State<ServerState>,
    Path((session_id, index)): Path<(String, usize)>,
) -> Result<Response, ApiError> {
    // Session ids are always UUIDs; rejecting anything else keeps arbitrary
    // paths out of the temp root.
    let session_id = Uuid::parse_str(&session_id)
        .map_err(|_| ApiError::BadRequest("Invalid session id".to_string()))?;

    let path = state
        .temp_dir
        .join(session_id.to_string())
        .join(format!("{}.wav", index));

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::NotFound("Audio file not found".to_string()))?;

    Ok(([(header::CONTENT_TYPE, "audio/wav")], bytes).into_response())
}

/// Transcribe an uploaded audio file to text
pub async fn transcribe_handler(
    State(state): State<ServerState>,
    mut multipart: Multipart,
) -> Result<Json<TranscribeResponse>, ApiError> {
    let asr = state
        .asr
        .as_ref()
        .ok_or(ApiError::NotConfigured("Transcription"))?;

    let mut audio: Option<(Vec<u8>, String)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() == Some("audio") {
            let mime = field.content_type().unwrap_or("audio/webm").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Invalid audio upload: {}", e)))?;
            audio = Some((bytes.to_vec(), mime));
        }
    }

    let (bytes, mime) =
        audio.ok_or_else(|| ApiError::BadRequest("Audio file is required".to_string()))?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("No file selected".to_string()));
    }

    info!("Transcribing audio upload ({} bytes)", bytes.len());
    let transcription = asr
        .transcribe(bytes, &mime)
        .await
        .map_err(|e| ApiError::Upstream(format!("Failed to transcribe audio: {}", e)))?;

    Ok(Json(TranscribeResponse {
        transcript: transcription.text,
        language: transcription.language,
    }))
}
