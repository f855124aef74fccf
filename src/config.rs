//! Configuration management
//!
//! All credentials and service settings come from the environment (optionally
//! seeded from a `.env` file at startup). A missing credential disables the
//! dependent feature rather than failing the whole process; `/health` reports
//! what is and is not configured.

use std::env;
use std::path::PathBuf;

/// Default Gemini model for opinion generation.
pub const DEFAULT_LLM_MODEL: &str = "gemini-2.0-flash-exp";

/// Default Gemini model for audio transcription.
pub const DEFAULT_ASR_MODEL: &str = "gemini-2.5-flash";

/// Default BosonAI model for speech generation.
pub const DEFAULT_TTS_MODEL: &str = "higgs-audio-generation-Hackathon";

/// Main configuration structure
#[derive(Debug, Clone)]
pub struct Config {
    /// BosonAI API key (speech synthesis)
    pub boson_api_key: Option<String>,
    /// Google API key (Gemini text generation and transcription)
    pub google_api_key: Option<String>,
    /// OpenAI API key (Whisper transcription, alternative to Gemini)
    pub openai_api_key: Option<String>,
    /// Gemini model for opinion generation
    pub llm_model: String,
    /// Gemini model for transcription
    pub asr_model: String,
    /// BosonAI model for speech generation
    pub tts_model: String,
    /// Directory holding the members' reference voice recordings
    pub voices_dir: PathBuf,
    /// Root directory for per-session audio output
    pub temp_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            boson_api_key: None,
            google_api_key: None,
            openai_api_key: None,
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            asr_model: DEFAULT_ASR_MODEL.to_string(),
            tts_model: DEFAULT_TTS_MODEL.to_string(),
            voices_dir: PathBuf::from("voices"),
            temp_dir: env::temp_dir().join("the-jury"),
        }
    }
}

/// Read an environment variable, treating empty values as unset.
fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.boson_api_key = non_empty("BOSON_API_KEY");
        config.google_api_key = non_empty("GOOGLE_API_KEY");
        config.openai_api_key = non_empty("OPENAI_API_KEY");

        if let Some(model) = non_empty("JURY_LLM_MODEL") {
            config.llm_model = model;
        }
        if let Some(model) = non_empty("JURY_ASR_MODEL") {
            config.asr_model = model;
        }
        if let Some(model) = non_empty("JURY_TTS_MODEL") {
            config.tts_model = model;
        }
        if let Some(dir) = non_empty("JURY_VOICES_DIR") {
            config.voices_dir = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty("JURY_TEMP_DIR") {
            config.temp_dir = PathBuf::from(dir);
        }

        config
    }

    /// Whether opinion generation is available
    pub fn llm_configured(&self) -> bool {
        self.google_api_key.is_some()
    }

    /// Whether speech synthesis is available
    pub fn tts_configured(&self) -> bool {
        self.boson_api_key.is_some()
    }

    /// Whether transcription is available (either provider)
    pub fn asr_configured(&self) -> bool {
        self.google_api_key.is_some() || self.openai_api_key.is_some()
    }

    /// Whether the full deliberation engine can run
    pub fn engine_configured(&self) -> bool {
        self.llm_configured() && self.tts_configured()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.llm_model, DEFAULT_LLM_MODEL);
        assert_eq!(config.asr_model, DEFAULT_ASR_MODEL);
        assert_eq!(config.tts_model, DEFAULT_TTS_MODEL);
        assert!(!config.engine_configured());
        assert!(!config.asr_configured());
    }

    #[test]
    fn test_availability_requires_both_engine_keys() {
        let mut config = Config::default();
        config.google_api_key = Some("g".to_string());
        assert!(config.llm_configured());
        assert!(config.asr_configured());
        assert!(!config.engine_configured());

        config.boson_api_key = Some("b".to_string());
        assert!(config.engine_configured());
    }

    #[test]
    fn test_whisper_key_enables_transcription_alone() {
        let mut config = Config::default();
        config.openai_api_key = Some("sk".to_string());
        assert!(config.asr_configured());
        assert!(!config.llm_configured());
    }

    #[test]
    fn test_from_env_overrides() {
        env::set_var("JURY_LLM_MODEL", "gemini-test-model");
        env::set_var("JURY_VOICES_DIR", "/srv/voices");

        let config = Config::from_env();
        assert_eq!(config.llm_model, "gemini-test-model");
        assert_eq!(config.voices_dir, PathBuf::from("/srv/voices"));

        env::remove_var("JURY_LLM_MODEL");
        env::remove_var("JURY_VOICES_DIR");
    }
}
