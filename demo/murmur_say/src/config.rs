use std::fs;
use std::path::{Path, PathBuf};

use murmur_core::profile::{AccentConfig, IntonationConfig};
use murmur_core::{Inflection, Phoneme, Style, VoiceProfile};

/// Built-in voice: one clip per ASCII letter and digit, all four styles inflected
pub const BUILTIN_PROFILE: &str = r#"
[voice]
character_delay = 0.1
word_delay = 0.2
tempo = 1.0

[intonation]
pitch = 1.0
volume = 1.0

[[intonation.inflections]]
style = "statement"
pitch_curve = [[0.0, 1.05], [1.0, 0.9]]
pitch_jitter = 0.05
volume_jitter = 0.05

[[intonation.inflections]]
style = "question"
pitch_curve = [[0.0, 1.0], [0.7, 1.0], [1.0, 1.35]]
pitch_jitter = 0.05
volume_jitter = 0.05

[[intonation.inflections]]
style = "exclamation"
pitch_curve = [[0.0, 1.2], [1.0, 1.1]]
volume_curve = [[0.0, 1.1], [1.0, 1.2]]
pitch_jitter = 0.08
volume_jitter = 0.05

[[intonation.inflections]]
style = "command"
pitch_curve = [[0.0, 0.95], [1.0, 0.85]]
volume_curve = [[0.0, 1.15], [1.0, 1.0]]
pitch_jitter = 0.02
volume_jitter = 0.02
"#;

/// High-level configuration for the murmur_say demo
#[derive(Clone, Debug)]
pub struct SayConfig {
    pub profile: VoiceProfile,
    /// Voice name used in diagnostics
    pub name: String,
    /// Style for lines given without one; `None` infers from punctuation
    pub style: Option<Style>,
}

impl Default for SayConfig {
    fn default() -> Self {
        Self {
            profile: builtin_profile(),
            name: std::env::var("MURMUR_VOICE_NAME").unwrap_or_else(|_| "murmur".to_string()),
            style: None,
        }
    }
}

/// The built-in profile with a phoneme for every letter and digit
pub fn builtin_profile() -> VoiceProfile {
    let mut profile = match VoiceProfile::from_toml_str(BUILTIN_PROFILE) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(target = "murmur_say", error = %e, "Built-in profile is invalid");
            VoiceProfile::default()
        }
    };
    profile.accent.phonemes = ('a'..='z')
        .chain('0'..='9')
        .map(|c| Phoneme::new(c, format!("clips/{}.wav", c)))
        .collect();
    profile
}

impl SayConfig {
    /// Load configuration from a TOML profile (path via --profile, MURMUR_PROFILE or
    /// ./murmur.toml), falling back to the built-in profile.
    pub fn load(path: Option<PathBuf>) -> Self {
        let default = Self::default();
        let path = path
            .or_else(|| std::env::var("MURMUR_PROFILE").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("murmur.toml"));
        let p = Path::new(&path);
        if !p.exists() {
            tracing::info!(target = "murmur_say", path = %path.display(), "No profile found; using built-in voice");
            return default;
        }
        match fs::read_to_string(p) {
            Ok(s) => match toml::from_str::<SayToml>(&s) {
                Ok(t) => t.overlay(default),
                Err(e) => {
                    tracing::warn!(target = "murmur_say", error = %e, "Failed to parse profile; using built-in voice");
                    default
                }
            },
            Err(e) => {
                tracing::warn!(target = "murmur_say", error = %e, "Failed to read profile; using built-in voice");
                default
            }
        }
    }
}

// =========================
// TOML overlay definitions
// =========================

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct SayToml {
    pub voice: Option<VoiceToml>,
    pub intonation: Option<IntonationToml>,
    pub accent: Option<AccentToml>,
    pub say: Option<SayOptionsToml>,
}

impl SayToml {
    fn overlay(self, mut base: SayConfig) -> SayConfig {
        if let Some(v) = self.voice {
            v.apply(&mut base.profile.voice);
        }
        if let Some(i) = self.intonation {
            i.apply(&mut base.profile.intonation);
        }
        if let Some(a) = self.accent {
            a.apply(&mut base.profile.accent);
        }
        if let Some(s) = self.say {
            s.apply(&mut base);
        }
        base
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct VoiceToml {
    pub character_delay: Option<f32>,
    pub word_delay: Option<f32>,
    pub tempo: Option<f32>,
}

impl VoiceToml {
    fn apply(self, v: &mut murmur_core::profile::VoiceToml) {
        if let Some(x) = self.character_delay {
            v.character_delay = Some(x);
        }
        if let Some(x) = self.word_delay {
            v.word_delay = Some(x);
        }
        if let Some(x) = self.tempo {
            v.tempo = Some(x);
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct IntonationToml {
    pub pitch: Option<f32>,
    pub volume: Option<f32>,
    pub inflections: Option<Vec<Inflection>>,
}

impl IntonationToml {
    fn apply(self, i: &mut IntonationConfig) {
        if let Some(x) = self.pitch {
            i.pitch = x;
        }
        if let Some(x) = self.volume {
            i.volume = x;
        }
        if let Some(x) = self.inflections {
            i.inflections = x;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct AccentToml {
    pub phonemes: Option<Vec<Phoneme>>,
}

impl AccentToml {
    fn apply(self, a: &mut AccentConfig) {
        if let Some(x) = self.phonemes {
            a.phonemes = x;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct SayOptionsToml {
    pub name: Option<String>,
    pub style: Option<Style>,
}

impl SayOptionsToml {
    fn apply(self, c: &mut SayConfig) {
        if let Some(x) = self.name {
            c.name = x;
        }
        if let Some(x) = self.style {
            c.style = Some(x);
        }
    }
}
