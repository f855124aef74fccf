//! The jury: personality registry, verdict policy, and the deliberation engine

pub mod engine;
pub mod member;
pub mod verdict;

pub use engine::{
    Deliberation, EngineError, JuryEngine, OpinionEntry, ScriptEntry, ScriptStage,
    VerdictDeliberation,
};
pub use member::{registry, JuryMember, Stance};
pub use verdict::{draw_verdict, plurality, Verdict};
