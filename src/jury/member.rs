//! Jury member definitions
//!
//! The panel is a fixed, ordered set of three zodiac personalities. The
//! registry is constructed once at startup and passed into the engine as an
//! immutable value; nothing mutates it afterwards.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::jury::verdict::Verdict;
use crate::types::RefVoice;

/// How a member leans when drawing a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    Conservative,
    Optimistic,
    Chaotic,
}

impl Stance {
    /// Verdict weight table for this stance. The draw is a table lookup plus
    /// one weighted random choice.
    pub fn verdict_weights(&self) -> [(Verdict, u32); 3] {
        match self {
            // leans "no": 60% no, 25% maybe, 15% yes
            Stance::Conservative => [(Verdict::No, 60), (Verdict::Maybe, 25), (Verdict::Yes, 15)],
            // leans "yes": 70% yes, 20% maybe, 10% no
            Stance::Optimistic => [(Verdict::Yes, 70), (Verdict::Maybe, 20), (Verdict::No, 10)],
            Stance::Chaotic => [(Verdict::Yes, 1), (Verdict::No, 1), (Verdict::Maybe, 1)],
        }
    }
}

/// A jury member: identity, voice, and personality.
#[derive(Debug, Clone)]
pub struct JuryMember {
    pub id: String,
    pub name: String,
    pub emoji: Option<String>,
    /// Token addressing this voice in synthesis requests, e.g. `[SPEAKER1]`.
    pub speaker_tag: String,
    /// Reference recording for voice cloning; `None` means this member speaks
    /// with the fallback voice.
    pub ref_voice: Option<RefVoice>,
    pub personality_prompt: String,
    pub stance: Stance,
}

/// Resolve a member's reference voice under the voices directory. A missing
/// recording degrades that member to the fallback voice rather than erroring
/// the registry.
fn ref_voice(voices_dir: &Path, file: &str, transcript: &str) -> Option<RefVoice> {
    let audio_path = voices_dir.join(file);
    if audio_path.is_file() {
        Some(RefVoice {
            audio_path,
            transcript: transcript.to_string(),
        })
    } else {
        warn!(
            "Reference audio {} not found; this member will use the fallback voice",
            audio_path.display()
        );
        None
    }
}

/// Build the fixed three-member panel, in deliberation order.
pub fn registry(voices_dir: &Path) -> Vec<JuryMember> {
    let dragon = JuryMember {
        id: "dragon".to_string(),
        name: "Dragon".to_string(),
        emoji: Some("🐉".to_string()),
        speaker_tag: "[SPEAKER1]".to_string(),
        ref_voice: ref_voice(
            voices_dir,
            "dragon.wav",
            "[SPEAKER1] Greetings, I am Dragon, the bold visionary. Let's explore the possibilities together and claim our destiny.",
        ),
        personality_prompt: r#"You are Dragon, a bold and ambitious visionary from the Chinese zodiac.

Characteristics:
- Speak with confidence and inspiration
- Use powerful, motivating language
- See the potential in ideas
- Encourage bold action and innovation
- Default to "yes" with enthusiasm
- Natural leader energy

Example phrases: "Claim your destiny!", "Fortune favors the brave!", "This is your moment!"

When responding:
1. Acknowledge the question with confidence
2. Give an optimistic, empowering take
3. Inspire action (keep under 30 words)"#
            .to_string(),
        stance: Stance::Optimistic,
    };

    let ox = JuryMember {
        id: "ox".to_string(),
        name: "Ox".to_string(),
        emoji: Some("🐮".to_string()),
        speaker_tag: "[SPEAKER2]".to_string(),
        ref_voice: ref_voice(
            voices_dir,
            "ox.wav",
            "[SPEAKER2] Hello, I'm Ox, the patient guardian. Let me consider this carefully with steady wisdom.",
        ),
        personality_prompt: r#"You are Ox, a patient and methodical guardian from the Chinese zodiac.

Characteristics:
- Speak calmly and deliberately
- Value tradition and proven methods
- Conservative and risk-averse
- Emphasize hard work and preparation
- Default to "no" unless well-justified
- Steady, reliable tone

Example phrases: "Slow and steady wins.", "Tradition guides us.", "Hard work first."

When responding:
1. Consider the question carefully
2. Express cautious perspective
3. Emphasize prudence (keep under 30 words)"#
            .to_string(),
        stance: Stance::Conservative,
    };

    let monkey = JuryMember {
        id: "monkey".to_string(),
        name: "Monkey".to_string(),
        emoji: Some("🐵".to_string()),
        speaker_tag: "[SPEAKER3]".to_string(),
        ref_voice: ref_voice(
            voices_dir,
            "monkey.wav",
            "[SPEAKER3] Hey there, I'm Monkey, the clever trickster. Ready for something fun and unexpected?",
        ),
        personality_prompt: r#"You are Monkey, a clever and mischievous trickster from the Chinese zodiac.

Characteristics:
- Quick-witted and playful
- Embrace chaos and creativity
- Make unexpected connections
- Use clever wordplay
- Unpredictable verdicts
- Lighthearted but sharp

Example phrases: "Let's shake things up!", "Expect the unexpected!", "Rules? What rules?"

When responding:
1. React with playful cleverness
2. Give an unexpected angle
3. Be mischievously wise (keep under 30 words)"#
            .to_string(),
        stance: Stance::Chaotic,
    };

    vec![dragon, ox, monkey]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_registry_order_is_fixed() {
        let members = registry(Path::new("no-such-dir"));
        let ids: Vec<&str> = members.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["dragon", "ox", "monkey"]);
    }

    #[test]
    fn test_missing_voices_degrade_instead_of_erroring() {
        let members = registry(Path::new("no-such-dir"));
        assert_eq!(members.len(), 3);
        assert!(members.iter().all(|m| m.ref_voice.is_none()));
    }

    #[test]
    fn test_present_voice_is_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = std::fs::File::create(dir.path().join("ox.wav")).unwrap();
        f.write_all(b"RIFF").unwrap();

        let members = registry(dir.path());
        let ox = members.iter().find(|m| m.id == "ox").unwrap();
        let voice = ox.ref_voice.as_ref().unwrap();
        assert!(voice.transcript.starts_with("[SPEAKER2]"));
        assert_eq!(voice.audio_path, dir.path().join("ox.wav"));

        // the others are still degraded
        assert!(members.iter().filter(|m| m.ref_voice.is_some()).count() == 1);
    }

    #[test]
    fn test_speaker_tags_are_unique() {
        let members = registry(Path::new("no-such-dir"));
        let mut tags: Vec<&str> = members.iter().map(|m| m.speaker_tag.as_str()).collect();
        tags.sort();
        tags.dedup();
        assert_eq!(tags.len(), members.len());
    }

    #[test]
    fn test_stance_weight_tables() {
        let conservative = Stance::Conservative.verdict_weights();
        assert_eq!(conservative[0], (Verdict::No, 60));
        assert_eq!(conservative.iter().map(|(_, w)| w).sum::<u32>(), 100);

        let optimistic = Stance::Optimistic.verdict_weights();
        assert_eq!(optimistic[0], (Verdict::Yes, 70));
        assert_eq!(optimistic.iter().map(|(_, w)| w).sum::<u32>(), 100);

        let chaotic = Stance::Chaotic.verdict_weights();
        assert!(chaotic.iter().all(|(_, w)| *w == 1));
    }

    #[test]
    fn test_stance_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Stance::Conservative).unwrap(),
            r#""conservative""#
        );
    }
}
