//! The Jury - voice deliberation backend
//!
//! A small web backend where a fixed panel of zodiac personalities answers a
//! question out loud:
//! - Gemini text generation for personality-flavored opinions
//! - BosonAI speech generation with reference-voice cloning and a generic
//!   fallback voice
//! - Gemini or Whisper transcription for spoken questions
//! - axum HTTP facade with per-session temp audio storage
//!
//! # Example
//!
//! ```ignore
//! use the_jury::config::Config;
//! use the_jury::server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     server::start(config, "0.0.0.0", 8080).await
//! }
//! ```

pub mod types;
pub mod config;
pub mod services;
pub mod jury;
pub mod server;
pub mod cli;

// Re-export commonly used types for convenience
pub use config::Config;
pub use jury::{JuryEngine, JuryMember, Stance, Verdict};
pub use server::{start as start_server, ServerState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
