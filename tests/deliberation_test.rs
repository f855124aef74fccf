//! Orchestrator behavior against in-process stub services

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use the_jury::jury::{plurality, registry, JuryEngine, ScriptStage};
use the_jury::services::llm::{GenerationRequest, GenerationStage, LlmError, TextGenerator};
use the_jury::services::tts::{SpeechSynthesizer, SynthesisRequest, TtsError};
use the_jury::types::ConversationTurn;

struct StubLlm;

#[async_trait]
impl TextGenerator for StubLlm {
    async fn generate(&self, req: GenerationRequest<'_>) -> Result<String, LlmError> {
        match req.stage {
            GenerationStage::Opening => Ok(format!("thoughts on {}", req.question)),
            GenerationStage::Verdict(verdict) => Ok(format!("my verdict is {}", verdict)),
        }
    }
}

/// Synthesizer stub: fails for the call indices in `fail_on` and records the
/// conversational context length seen by every call.
struct ScriptedTts {
    fail_on: Vec<usize>,
    calls: AtomicUsize,
    seen_history: Mutex<Vec<usize>>,
}

impl ScriptedTts {
    fn new(fail_on: Vec<usize>) -> Arc<Self> {
        Arc::new(Self {
            fail_on,
            calls: AtomicUsize::new(0),
            seen_history: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for ScriptedTts {
    async fn synthesize(&self, req: SynthesisRequest<'_>) -> Result<Vec<u8>, TtsError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_history.lock().unwrap().push(req.history.len());
        if self.fail_on.contains(&call) {
            Err(TtsError::MissingAudio)
        } else {
            Ok(vec![call as u8; 4])
        }
    }
}

fn engine_with(tts: Arc<ScriptedTts>) -> JuryEngine {
    // no voices on disk: every member degrades to the fallback voice, which
    // is irrelevant to the stub synthesizer
    let members = registry(Path::new("does-not-exist"));
    JuryEngine::new(members, Arc::new(StubLlm), tts)
}

#[tokio::test]
async fn one_opinion_per_member_in_registry_order() {
    let engine = engine_with(ScriptedTts::new(vec![]));
    let result = engine.deliberate("Should we ship it?", &[], None).await.unwrap();

    let ids: Vec<&str> = result.opinions.iter().map(|o| o.member.id.as_str()).collect();
    assert_eq!(ids, ["dragon", "ox", "monkey"]);
    assert_eq!(result.audio.len(), result.opinions.len());
    assert!(result.audio.iter().all(|a| a.is_some()));
}

#[tokio::test]
async fn audio_matches_opinions_when_every_synthesis_fails() {
    let engine = engine_with(ScriptedTts::new(vec![0, 1, 2]));
    let result = engine.deliberate("Should we ship it?", &[], None).await.unwrap();

    assert_eq!(result.opinions.len(), 3);
    assert_eq!(result.audio.len(), 3);
    assert!(result.audio.iter().all(|a| a.is_none()));
}

#[tokio::test]
async fn synthesis_context_grows_only_after_success() {
    let tts = ScriptedTts::new(vec![1]);
    let engine = engine_with(tts.clone());
    let result = engine.deliberate("Should we ship it?", &[], None).await.unwrap();

    // call 0 succeeds (empty context), call 1 fails (1 prior turn), call 2
    // still sees only the single successful turn
    assert_eq!(*tts.seen_history.lock().unwrap(), vec![0, 1, 1]);
    assert!(result.audio[0].is_some());
    assert!(result.audio[1].is_none());
    assert!(result.audio[2].is_some());
}

#[tokio::test]
async fn member_filter_preserves_registry_order() {
    let engine = engine_with(ScriptedTts::new(vec![]));
    let filter = vec!["monkey".to_string(), "dragon".to_string()];
    let result = engine
        .deliberate("Should we ship it?", &[], Some(&filter))
        .await
        .unwrap();

    let ids: Vec<&str> = result.opinions.iter().map(|o| o.member.id.as_str()).collect();
    assert_eq!(ids, ["dragon", "monkey"]);
}

#[tokio::test]
async fn unknown_filter_is_an_error() {
    let engine = engine_with(ScriptedTts::new(vec![]));
    let filter = vec!["tiger".to_string()];
    let result = engine
        .deliberate("Should we ship it?", &[], Some(&filter))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn incoming_history_reaches_the_generator_not_the_synthesizer() {
    let tts = ScriptedTts::new(vec![]);
    let engine = engine_with(tts.clone());
    let history = vec![
        ConversationTurn::user("earlier question"),
        ConversationTurn::assistant("earlier answer"),
    ];
    engine.deliberate("And now?", &history, None).await.unwrap();

    // synthesis context starts empty regardless of request history
    assert_eq!(*tts.seen_history.lock().unwrap(), vec![0, 1, 2]);
}

#[tokio::test]
async fn verdict_flow_produces_two_entries_per_member() {
    let engine = engine_with(ScriptedTts::new(vec![]));
    let result = engine
        .deliberate_verdict("Should we ship it already?", None)
        .await
        .unwrap();

    assert_eq!(result.script.len(), 6);
    assert_eq!(result.audio.len(), 6);

    for pair in result.script.chunks(2) {
        assert_eq!(pair[0].member.id, pair[1].member.id);
        assert_eq!(pair[0].stage, ScriptStage::Opening);
        assert!(pair[0].verdict.is_none());
        assert_eq!(pair[1].stage, ScriptStage::Verdict);
        assert!(pair[1].verdict.is_some());
        assert!(pair[1].text.contains(pair[1].verdict.unwrap().as_str()));
    }

    // final verdict is the plurality of the individual ballots
    let ballots: Vec<_> = result.script.iter().filter_map(|e| e.verdict).collect();
    assert_eq!(result.verdict, plurality(&ballots).unwrap());
}
