//! CLI interface for the-jury

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::jury::{registry, JuryEngine};
use crate::server;
use crate::services::{BosonClient, GeminiClient};

#[derive(Parser)]
#[command(name = "the-jury")]
#[command(about = "Voice jury backend: personality opinions with cloned-voice audio", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080", env = "PORT")]
        port: u16,
        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
    },
    /// Run one deliberation in the terminal and save the audio locally
    Ask {
        /// Question to put to the panel
        question: String,
        /// Use the legacy verdict flow (opening + vote per member)
        #[arg(long)]
        verdict: bool,
        /// Directory for the generated WAV files
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, host } => {
            let config = Config::from_env();
            server::start(config, &host, port).await
        }
        Commands::Ask {
            question,
            verdict,
            out_dir,
        } => ask(&question, verdict, &out_dir).await,
    }
}

fn build_engine(config: &Config) -> Result<JuryEngine> {
    let google_key = config
        .google_api_key
        .clone()
        .context("GOOGLE_API_KEY is not set")?;
    let boson_key = config
        .boson_api_key
        .clone()
        .context("BOSON_API_KEY is not set")?;

    let members = registry(&config.voices_dir);
    let llm = Arc::new(GeminiClient::new(google_key, config.llm_model.clone()));
    let tts = Arc::new(BosonClient::new(boson_key, config.tts_model.clone()));
    Ok(JuryEngine::new(members, llm, tts))
}

async fn ask(question: &str, verdict: bool, out_dir: &PathBuf) -> Result<()> {
    let config = Config::from_env();
    let engine = build_engine(&config)?;

    println!("Question: {}", question);
    println!("{}", "=".repeat(50));

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    if verdict {
        let result = engine.deliberate_verdict(question, None).await?;
        for (idx, (entry, audio)) in result.script.iter().zip(&result.audio).enumerate() {
            match entry.verdict {
                Some(v) => println!("{} votes {}:", entry.member.name, v),
                None => println!("{}:", entry.member.name),
            }
            println!("   {}\n", entry.text);
            save_audio(out_dir, idx, &entry.member.id, audio)?;
        }
        println!("{}", "=".repeat(50));
        println!("Final verdict: {}", result.verdict);
    } else {
        let result = engine.deliberate(question, &[], None).await?;
        for (idx, (entry, audio)) in result.opinions.iter().zip(&result.audio).enumerate() {
            println!("{}:", entry.member.name);
            println!("   {}\n", entry.text);
            save_audio(out_dir, idx, &entry.member.id, audio)?;
        }
        println!("{}", "=".repeat(50));
        println!("Deliberation complete: {} opinions", result.opinions.len());
    }

    Ok(())
}

fn save_audio(
    out_dir: &PathBuf,
    idx: usize,
    member_id: &str,
    audio: &Option<Vec<u8>>,
) -> Result<()> {
    if let Some(bytes) = audio {
        let path = out_dir.join(format!("conversation_{}_{}.wav", idx, member_id));
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("   Audio saved: {}\n", path.display());
    }
    Ok(())
}
