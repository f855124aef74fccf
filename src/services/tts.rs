//! Speech synthesis client for the BosonAI audio generation API
//!
//! Voice cloning against a hosted model is the least reliable step in the
//! pipeline (large payload, slow, rate-limited), so every call runs a
//! two-tier state machine: CLONE against the member's reference recording,
//! then a generic FALLBACK voice when cloning fails or times out. The caller
//! only sees an error when both tiers fail.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::{ConversationTurn, RefVoice};

pub(crate) const BOSON_API_HOST: &str = "https://hackathon.boson.ai/v1";

/// Upper bound on a single synthesis round-trip. Cloning requests carry the
/// reference sample plus the whole running conversation and can take minutes.
pub const SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(180);

/// Voice used when no reference sample is available or cloning failed.
const FALLBACK_VOICE: &str = "en_woman";

/// The fallback path returns raw PCM at this rate; the clone path returns a
/// finished WAV.
const FALLBACK_SAMPLE_RATE: u32 = 24_000;

const STOP_SEQUENCES: [&str; 3] = ["<|eot_id|>", "<|end_of_text|>", "<|audio_eos|>"];

/// System instruction for cloned synthesis: strip the speaker tag, pick the
/// voice from the reference turn, stage the scene.
const CLONE_SYSTEM_PROMPT: &str = "You are an AI assistant designed to convert text into speech.\n\
If the user's message includes a [SPEAKER*] tag, do not read out the tag and generate speech for the following text, using the specified voice.\n\
If no speaker tag is present, select a suitable voice on your own.\n\n\
<|scene_desc_start|>\nAudio is recorded in a dramatic courtroom setting with slight reverb.\n<|scene_desc_end|>";

const FALLBACK_SYSTEM_PROMPT: &str =
    "You are an AI assistant designed to convert text into speech.";

#[derive(Debug, Error)]
pub enum TtsError {
    #[error("Failed to reach speech synthesis API: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Speech synthesis API error ({status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("Speech synthesis response contained no audio")]
    MissingAudio,
    #[error("Failed to decode synthesized audio: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("Failed to build WAV container: {0}")]
    Wav(#[from] hound::Error),
}

/// One synthesis call for a single utterance.
#[derive(Debug)]
pub struct SynthesisRequest<'a> {
    /// Token addressing this voice in the request, e.g. `[SPEAKER1]`.
    pub speaker_tag: &'a str,
    /// Reference material for cloning; `None` forces the fallback voice.
    pub ref_voice: Option<&'a RefVoice>,
    pub text: &'a str,
    /// Turns already synthesized in this deliberation, so the model delivers
    /// the line as part of one continuous conversation.
    pub history: &'a [ConversationTurn],
}

/// Seam for the orchestrator: anything that can turn an utterance into WAV bytes.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, req: SynthesisRequest<'_>) -> Result<Vec<u8>, TtsError>;
}

/// BosonAI chat-completions client with audio modality
#[derive(Clone)]
pub struct BosonClient {
    client: Arc<Client>,
    host: String,
    api_key: String,
    model: String,
}

impl BosonClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Arc::new(Client::new()),
            host: BOSON_API_HOST.to_string(),
            api_key,
            model,
        }
    }

    /// Point the client at a non-default API host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    async fn post_completion(&self, body: Value) -> Result<Vec<u8>, TtsError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.host))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .timeout(SYNTHESIS_TIMEOUT)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TtsError::Api { status, body });
        }

        let raw: Value = response.json().await?;
        let audio_b64 = raw
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|arr| arr.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|msg| msg.get("audio"))
            .and_then(|audio| audio.get("data"))
            .and_then(|data| data.as_str())
            .ok_or(TtsError::MissingAudio)?;

        Ok(BASE64.decode(audio_b64)?)
    }

    /// CLONE tier: reference transcript + reference audio as an assistant
    /// audio turn, then the accumulated conversation, then the new line.
    async fn synthesize_cloned(
        &self,
        req: &SynthesisRequest<'_>,
        ref_voice: &RefVoice,
        ref_sample: &[u8],
    ) -> Result<Vec<u8>, TtsError> {
        let mut messages = vec![
            json!({ "role": "system", "content": CLONE_SYSTEM_PROMPT }),
            json!({ "role": "user", "content": ref_voice.transcript }),
            json!({
                "role": "assistant",
                "content": [{
                    "type": "input_audio",
                    "input_audio": { "data": BASE64.encode(ref_sample), "format": "wav" }
                }],
            }),
        ];
        for turn in req.history {
            messages.push(json!({ "role": turn.role.as_str(), "content": turn.content }));
        }
        messages.push(json!({
            "role": "user",
            "content": format!("{} {}", req.speaker_tag, req.text)
        }));

        let body = json!({
            "model": self.model,
            "messages": messages,
            "modalities": ["text", "audio"],
            "max_completion_tokens": 4096,
            "temperature": 1.0,
            "top_p": 0.95,
            "top_k": 50,
            "stream": false,
            "stop": STOP_SEQUENCES,
        });

        // The clone path returns a complete WAV payload.
        self.post_completion(body).await
    }

    /// FALLBACK tier: fixed default voice, no cloning context. The raw PCM
    /// response is wrapped into a standard WAV container.
    async fn synthesize_fallback(&self, text: &str) -> Result<Vec<u8>, TtsError> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": FALLBACK_SYSTEM_PROMPT },
                { "role": "user", "content": text },
            ],
            "modalities": ["text", "audio"],
            "audio": { "voice": FALLBACK_VOICE, "format": "pcm16" },
            "max_completion_tokens": 4096,
            "temperature": 1.0,
            "top_p": 0.95,
            "stream": false,
            "stop": STOP_SEQUENCES,
        });

        let pcm = self.post_completion(body).await?;
        Ok(pcm_to_wav(&pcm)?)
    }
}

/// Wrap raw 16-bit little-endian PCM into a mono 24 kHz WAV container.
pub fn pcm_to_wav(pcm: &[u8]) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: FALLBACK_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut buf = Vec::new();
    {
        let cursor = std::io::Cursor::new(&mut buf);
        let mut writer = hound::WavWriter::new(cursor, spec)?;
        for frame in pcm.chunks_exact(2) {
            writer.write_sample(i16::from_le_bytes([frame[0], frame[1]]))?;
        }
        writer.finalize()?;
    }
    Ok(buf)
}

#[async_trait]
impl SpeechSynthesizer for BosonClient {
    async fn synthesize(&self, req: SynthesisRequest<'_>) -> Result<Vec<u8>, TtsError> {
        if let Some(ref_voice) = req.ref_voice {
            match tokio::fs::read(&ref_voice.audio_path).await {
                Ok(sample) => match self.synthesize_cloned(&req, ref_voice, &sample).await {
                    Ok(wav) => return Ok(wav),
                    Err(e) => {
                        warn!(
                            "Voice cloning failed for {}, using fallback voice: {}",
                            req.speaker_tag, e
                        );
                    }
                },
                Err(e) => {
                    debug!(
                        "Reference audio {} unreadable ({}), using fallback voice",
                        ref_voice.audio_path.display(),
                        e
                    );
                }
            }
        }

        self.synthesize_fallback(req.text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm_to_wav_round_trip() {
        let samples: Vec<i16> = vec![0, 1000, -1000, i16::MAX, i16::MIN];
        let pcm: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();

        let wav = pcm_to_wav(&pcm).unwrap();
        let reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, FALLBACK_SAMPLE_RATE);
        assert_eq!(spec.bits_per_sample, 16);

        let decoded: Vec<i16> = reader.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn test_pcm_to_wav_ignores_trailing_odd_byte() {
        let pcm = vec![0u8, 1, 2, 3, 4];
        let wav = pcm_to_wav(&pcm).unwrap();
        let reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
        assert_eq!(reader.len(), 2);
    }

    #[test]
    fn test_empty_pcm_still_yields_valid_container() {
        let wav = pcm_to_wav(&[]).unwrap();
        let reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
        assert_eq!(reader.len(), 0);
    }
}
