//! Deliberation orchestration
//!
//! Generation and synthesis run strictly sequentially: every synthesis call
//! hears the turns produced before it, which is what makes the batch sound
//! like one continuous conversation, so later calls cannot start until
//! earlier ones finish. A synthesis failure degrades that entry's audio to
//! `None`; it never aborts the batch. A generation failure aborts the whole
//! deliberation, since there is no fallback text provider.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::jury::member::JuryMember;
use crate::jury::verdict::{draw_verdict, plurality, Verdict};
use crate::services::llm::{GenerationRequest, GenerationStage, LlmError, TextGenerator};
use crate::services::tts::{SpeechSynthesizer, SynthesisRequest};
use crate::types::ConversationTurn;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("No jury members matched the requested filter")]
    EmptyPanel,
    #[error(transparent)]
    Generation(#[from] LlmError),
}

/// One generated utterance attributed to a member.
#[derive(Debug, Clone)]
pub struct OpinionEntry {
    pub member: JuryMember,
    pub text: String,
}

/// Result of the standard opinion flow.
///
/// `audio[i]` belongs to `opinions[i]`; `None` marks a synthesis failure.
/// The two lists always have the same length.
#[derive(Debug)]
pub struct Deliberation {
    pub question: String,
    pub opinions: Vec<OpinionEntry>,
    pub audio: Vec<Option<Vec<u8>>>,
}

/// Stage of a legacy-flow script entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptStage {
    Opening,
    Verdict,
}

/// One line of the legacy verdict script.
#[derive(Debug, Clone)]
pub struct ScriptEntry {
    pub member: JuryMember,
    pub stage: ScriptStage,
    pub verdict: Option<Verdict>,
    pub text: String,
}

/// Result of the legacy verdict flow: two script entries per member plus the
/// plurality verdict. Audio pairs with script entries exactly as in
/// [`Deliberation`].
#[derive(Debug)]
pub struct VerdictDeliberation {
    pub question: String,
    pub verdict: Verdict,
    pub script: Vec<ScriptEntry>,
    pub audio: Vec<Option<Vec<u8>>>,
}

/// Sequences generation and synthesis across the panel.
pub struct JuryEngine {
    members: Vec<JuryMember>,
    llm: Arc<dyn TextGenerator>,
    tts: Arc<dyn SpeechSynthesizer>,
}

impl JuryEngine {
    pub fn new(
        members: Vec<JuryMember>,
        llm: Arc<dyn TextGenerator>,
        tts: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self { members, llm, tts }
    }

    pub fn members(&self) -> &[JuryMember] {
        &self.members
    }

    /// Resolve the target member set, preserving registry order.
    fn panel(&self, filter: Option<&[String]>) -> Result<Vec<&JuryMember>, EngineError> {
        let selected: Vec<&JuryMember> = match filter {
            Some(ids) => self
                .members
                .iter()
                .filter(|m| ids.iter().any(|id| id == &m.id))
                .collect(),
            None => self.members.iter().collect(),
        };
        if selected.is_empty() {
            return Err(EngineError::EmptyPanel);
        }
        Ok(selected)
    }

    /// Generate one opinion per member, then synthesize each in order.
    pub async fn deliberate(
        &self,
        question: &str,
        history: &[ConversationTurn],
        filter: Option<&[String]>,
    ) -> Result<Deliberation, EngineError> {
        let panel = self.panel(filter)?;

        let mut opinions = Vec::with_capacity(panel.len());
        for member in &panel {
            let text = self
                .llm
                .generate(GenerationRequest {
                    personality_prompt: &member.personality_prompt,
                    question,
                    history,
                    stage: GenerationStage::Opening,
                })
                .await?;
            debug!("Generated opinion for {}", member.id);
            opinions.push(OpinionEntry {
                member: (*member).clone(),
                text,
            });
        }

        let lines: Vec<(&JuryMember, &str)> = opinions
            .iter()
            .map(|o| (&o.member, o.text.as_str()))
            .collect();
        let audio = self.synthesize_all(&lines).await;

        Ok(Deliberation {
            question: question.to_string(),
            opinions,
            audio,
        })
    }

    /// Legacy flow: opening statement plus a stance-weighted verdict per
    /// member, aggregated by plurality vote.
    pub async fn deliberate_verdict(
        &self,
        question: &str,
        filter: Option<&[String]>,
    ) -> Result<VerdictDeliberation, EngineError> {
        let panel = self.panel(filter)?;

        // Draw all ballots up front; the weight table fixes each member's
        // distribution regardless of what gets said.
        let ballots: Vec<Verdict> = {
            let mut rng = rand::rng();
            panel
                .iter()
                .map(|m| draw_verdict(&m.stance, &mut rng))
                .collect()
        };

        let mut script = Vec::with_capacity(panel.len() * 2);
        for (member, verdict) in panel.iter().zip(&ballots) {
            let opening = self
                .llm
                .generate(GenerationRequest {
                    personality_prompt: &member.personality_prompt,
                    question,
                    history: &[],
                    stage: GenerationStage::Opening,
                })
                .await?;
            script.push(ScriptEntry {
                member: (*member).clone(),
                stage: ScriptStage::Opening,
                verdict: None,
                text: opening,
            });

            let reasoning = self
                .llm
                .generate(GenerationRequest {
                    personality_prompt: &member.personality_prompt,
                    question,
                    history: &[],
                    stage: GenerationStage::Verdict(verdict.as_str()),
                })
                .await?;
            script.push(ScriptEntry {
                member: (*member).clone(),
                stage: ScriptStage::Verdict,
                verdict: Some(*verdict),
                text: reasoning,
            });
        }

        let final_verdict = plurality(&ballots).expect("panel is non-empty");
        info!(
            "Panel voted {:?}, final verdict: {}",
            ballots, final_verdict
        );

        let lines: Vec<(&JuryMember, &str)> = script
            .iter()
            .map(|e| (&e.member, e.text.as_str()))
            .collect();
        let audio = self.synthesize_all(&lines).await;

        Ok(VerdictDeliberation {
            question: question.to_string(),
            verdict: final_verdict,
            script,
            audio,
        })
    }

    /// Synthesis pass. Each successful line is appended to the conversational
    /// context handed to the next call; failed lines contribute no context
    /// and a `None` audio entry. Output order matches input order.
    async fn synthesize_all(&self, lines: &[(&JuryMember, &str)]) -> Vec<Option<Vec<u8>>> {
        let mut audio = Vec::with_capacity(lines.len());
        let mut context: Vec<ConversationTurn> = Vec::new();

        for (idx, (member, text)) in lines.iter().enumerate() {
            let request = SynthesisRequest {
                speaker_tag: &member.speaker_tag,
                ref_voice: member.ref_voice.as_ref(),
                text,
                history: &context,
            };
            match self.tts.synthesize(request).await {
                Ok(bytes) => {
                    info!("Synthesized audio {}/{}", idx + 1, lines.len());
                    context.push(ConversationTurn::user(format!(
                        "{} {}",
                        member.speaker_tag, text
                    )));
                    audio.push(Some(bytes));
                }
                Err(e) => {
                    warn!(
                        "Synthesis failed for entry {}/{} ({}): {}",
                        idx + 1,
                        lines.len(),
                        member.id,
                        e
                    );
                    audio.push(None);
                }
            }
        }

        audio
    }
}
