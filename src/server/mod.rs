//! Web server module

pub mod http;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::jury::{registry, JuryEngine, JuryMember};
use crate::services::{BosonClient, GeminiAsr, GeminiClient, Transcriber, WhisperAsr};

/// Maximum accepted audio upload (Whisper's own cap).
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Shared server state
#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<Config>,
    /// The fixed panel, exposed even when the engine itself is not configured.
    pub members: Arc<Vec<JuryMember>>,
    /// Present only when both generation and synthesis credentials exist.
    pub engine: Option<Arc<JuryEngine>>,
    /// Present when either transcription provider is configured.
    pub asr: Option<Arc<dyn Transcriber>>,
    /// Root for per-session audio output.
    pub temp_dir: PathBuf,
}

/// Assemble server state from configuration. Missing credentials disable
/// individual services; they never fail construction.
pub fn build_state(config: Config) -> Result<ServerState> {
    let members = registry(&config.voices_dir);

    let engine = match (&config.google_api_key, &config.boson_api_key) {
        (Some(google_key), Some(boson_key)) => {
            let llm = Arc::new(GeminiClient::new(
                google_key.clone(),
                config.llm_model.clone(),
            ));
            let tts = Arc::new(BosonClient::new(
                boson_key.clone(),
                config.tts_model.clone(),
            ));
            Some(Arc::new(JuryEngine::new(members.clone(), llm, tts)))
        }
        _ => None,
    };

    // Gemini is preferred for transcription; Whisper covers deployments that
    // only carry an OpenAI key.
    let asr: Option<Arc<dyn Transcriber>> = if let Some(google_key) = &config.google_api_key {
        Some(Arc::new(GeminiAsr::new(
            google_key.clone(),
            config.asr_model.clone(),
        )))
    } else {
        config
            .openai_api_key
            .as_ref()
            .map(|key| Arc::new(WhisperAsr::new(key.clone())) as Arc<dyn Transcriber>)
    };

    std::fs::create_dir_all(&config.temp_dir)
        .with_context(|| format!("Failed to create temp dir {}", config.temp_dir.display()))?;
    let temp_dir = config.temp_dir.clone();

    Ok(ServerState {
        config: Arc::new(config),
        members: Arc::new(members),
        engine,
        asr,
        temp_dir,
    })
}

/// Build the application router.
pub fn router(state: ServerState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(http::index_handler))
        .route("/health", get(http::health_handler))
        .route("/api/jury-members", get(http::jury_members_handler))
        .route("/api/opinions", post(http::opinions_handler))
        .route("/api/verdict", post(http::verdict_handler))
        .route("/api/audio/{session_id}/{index}", get(http::audio_handler))
        .route("/api/transcribe", post(http::transcribe_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the web server
pub async fn start(config: Config, host: &str, port: u16) -> Result<()> {
    let state = build_state(config)?;

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("     THE JURY - Deliberation Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!(
        "  BosonAI TTS:  {}",
        if state.config.tts_configured() { "✓" } else { "✗" }
    );
    println!(
        "  Gemini LLM:   {}",
        if state.config.llm_configured() { "✓" } else { "✗" }
    );
    println!(
        "  Transcription: {}",
        if state.asr.is_some() { "✓" } else { "✗" }
    );
    println!(
        "  Engine:       {}",
        if state.engine.is_some() { "✓ Ready" } else { "✗ Not initialized" }
    );
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid listen address")?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")
}
