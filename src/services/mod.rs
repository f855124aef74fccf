//! Clients for the external generation services
//!
//! Every interesting computation is delegated: Gemini generates the opinion
//! text, BosonAI turns it into speech, and Gemini or Whisper transcribes
//! spoken questions. Clients surface failures as typed errors; the decision
//! to degrade (fallback voice, null audio) belongs to the caller.

pub mod asr;
pub mod llm;
pub mod tts;

pub use asr::{GeminiAsr, Transcriber, Transcription, WhisperAsr};
pub use llm::{GeminiClient, GenerationRequest, GenerationStage, LlmError, TextGenerator};
pub use tts::{BosonClient, SpeechSynthesizer, SynthesisRequest, TtsError};
