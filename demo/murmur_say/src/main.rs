mod config;
mod console;

use clap::Parser;
use config::SayConfig;
use console::{ConsoleDevice, JsonLinesObserver};
use murmur_core::{FanoutObserver, Style, TracingObserver, Voice, VoiceObserver};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "murmur_say")]
#[command(about = "Speak text through a murmur voice profile", long_about = None)]
struct Cli {
    /// Voice profile (TOML)
    #[arg(long, env = "MURMUR_PROFILE")]
    profile: Option<PathBuf>,

    /// Sentence style; inferred from punctuation when omitted
    #[arg(long)]
    style: Option<Style>,

    /// Speed multiplier applied on top of the profile
    #[arg(long)]
    tempo: Option<f32>,

    /// Print every voice event as a JSON line on stdout
    #[arg(long)]
    json: bool,

    /// Say one sample line per style
    #[arg(long)]
    samples: bool,

    /// Text to say; lines are read from stdin when empty
    text: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging / tracing
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,murmur_core=info,murmur_say=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Load configuration (built-in profile + env + optional TOML overlay)
    let cfg = SayConfig::load(cli.profile.clone());
    let mut settings = cfg.profile.settings()?;
    if let Some(tempo) = cli.tempo {
        settings.tempo = tempo;
    }

    let observer: Arc<dyn VoiceObserver> = if cli.json {
        Arc::new(
            FanoutObserver::new()
                .with(Arc::new(TracingObserver))
                .with(Arc::new(JsonLinesObserver)),
        )
    } else {
        Arc::new(TracingObserver)
    };

    let mut voice = Voice::with_observer(
        cfg.name.clone(),
        Arc::new(cfg.profile.pronunciation()),
        Arc::new(cfg.profile.intonation()?),
        observer,
    );
    voice.set_settings(settings)?;
    voice.attach(ConsoleDevice::new());

    info!(
        target = "murmur_say",
        voice = %voice.name(),
        tempo = settings.tempo as f64,
        "Voice ready"
    );

    let style_for = |line: &str| cli.style.or(cfg.style).unwrap_or_else(|| Style::infer(line));

    if cli.samples {
        for style in Style::ALL {
            if !say_and_wait(&voice, style.sample_line(), style).await {
                return Ok(());
            }
        }
    } else if !cli.text.is_empty() {
        let line = cli.text.join(" ");
        say_and_wait(&voice, &line, style_for(&line)).await;
    } else {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if !say_and_wait(&voice, line, style_for(line)).await {
                break;
            }
        }
    }

    Ok(())
}

/// Speak one line and wait for it to end. `false` when interrupted by Ctrl+C.
async fn say_and_wait(voice: &Voice, line: &str, style: Style) -> bool {
    if let Err(e) = voice.speak(line, style) {
        error!(target = "murmur_say", error = %e, "speak failed");
        return true;
    }

    tokio::select! {
        _ = voice.finished() => true,
        _ = signal::ctrl_c() => {
            info!(target = "murmur_say", "Shutting up...");
            voice.stop();
            false
        }
    }
}
