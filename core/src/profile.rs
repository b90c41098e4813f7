//! Voice profiles: everything needed to build a [`Voice`](crate::Voice) from a TOML file.
//!
//! ```toml
//! [voice]
//! character_delay = 0.08
//! tempo = 1.25
//!
//! [intonation]
//! pitch = 1.1
//!
//! [[intonation.inflections]]
//! style = "question"
//! pitch_curve = [[0.0, 1.0], [0.8, 1.0], [1.0, 1.4]]
//! pitch_jitter = 0.04
//!
//! [[accent.phonemes]]
//! character = "a"
//! clip = "clips/a.wav"
//! ```
//!
//! Omitted `[voice]` values fall back to [`VoiceSettings::default`], which
//! itself honours the `MURMUR_*` environment overrides.

use crate::intonation::{Inflection, IntonationTable};
use crate::pronunciation::{Phoneme, PronunciationTable};
use crate::voice::VoiceSettings;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoiceProfile {
    #[serde(default)]
    pub voice: VoiceToml,
    #[serde(default)]
    pub intonation: IntonationConfig,
    #[serde(default)]
    pub accent: AccentConfig,
}

/// Optional pacing overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoiceToml {
    pub character_delay: Option<f32>,
    pub word_delay: Option<f32>,
    pub tempo: Option<f32>,
}

impl VoiceToml {
    fn apply(&self, s: &mut VoiceSettings) {
        if let Some(x) = self.character_delay {
            s.character_delay = x;
        }
        if let Some(x) = self.word_delay {
            s.word_delay = x;
        }
        if let Some(x) = self.tempo {
            s.tempo = x;
        }
    }
}

fn unit() -> f32 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntonationConfig {
    #[serde(default = "unit")]
    pub pitch: f32,
    #[serde(default = "unit")]
    pub volume: f32,
    #[serde(default)]
    pub inflections: Vec<Inflection>,
}

impl Default for IntonationConfig {
    fn default() -> Self {
        Self {
            pitch: 1.0,
            volume: 1.0,
            inflections: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccentConfig {
    #[serde(default)]
    pub phonemes: Vec<Phoneme>,
}

impl VoiceProfile {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = fs::read_to_string(path)?;
        let profile = Self::from_toml_str(&s)?;
        tracing::info!(
            target: "profile",
            path = %path.display(),
            phonemes = profile.accent.phonemes.len(),
            inflections = profile.intonation.inflections.len(),
            "Loaded voice profile"
        );
        Ok(profile)
    }

    /// Defaults overlaid with `[voice]`, validated
    pub fn settings(&self) -> Result<VoiceSettings> {
        let mut settings = VoiceSettings::default();
        self.voice.apply(&mut settings);
        settings.validate()?;
        Ok(settings)
    }

    pub fn pronunciation(&self) -> PronunciationTable {
        PronunciationTable::new(self.accent.phonemes.clone())
    }

    pub fn intonation(&self) -> Result<IntonationTable> {
        IntonationTable::new(
            self.intonation.pitch,
            self.intonation.volume,
            self.intonation.inflections.clone(),
        )
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| crate::MurmurError::InvalidProfile(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intonation::{Style, DEFAULT_JITTER};
    use crate::MurmurError;

    const PROFILE: &str = r#"
        [voice]
        character_delay = 0.05
        tempo = 2.0

        [intonation]
        pitch = 1.1

        [[intonation.inflections]]
        style = "question"
        pitch_curve = [[0.0, 1.0], [1.0, 1.5]]
        pitch_jitter = 0.0

        [[intonation.inflections]]
        style = "exclamation"
        volume_curve = [{ time = 0.0, value = 1.2 }, { time = 1.0, value = 0.9 }]

        [[accent.phonemes]]
        character = "a"
        clip = "clips/a.wav"

        [[accent.phonemes]]
        character = "B"
        clip = "clips/b.wav"
    "#;

    #[test]
    fn parses_full_profile() {
        let p = VoiceProfile::from_toml_str(PROFILE).unwrap();
        let settings = p.settings().unwrap();
        assert_eq!(settings.character_delay, 0.05);
        assert_eq!(settings.tempo, 2.0);

        let accent = p.pronunciation();
        assert_eq!(accent.len(), 2);
        assert_eq!(accent.resolve('b').unwrap().as_str(), "clips/b.wav");

        let intonation = p.intonation().unwrap();
        assert_eq!(intonation.pitch(), 1.1);
        assert_eq!(intonation.volume(), 1.0);
        let excl = intonation.inflection(Style::Exclamation).unwrap();
        assert_eq!(excl.pitch_jitter, DEFAULT_JITTER);
        assert!(excl.pitch_curve.is_none());
        assert!(intonation.inflection(Style::Command).is_none());
    }

    #[test]
    fn empty_profile_is_usable() {
        let p = VoiceProfile::from_toml_str("").unwrap();
        assert!(p.pronunciation().is_empty());
        let intonation = p.intonation().unwrap();
        assert_eq!(intonation.pitch(), 1.0);
        assert!(intonation.inflections().is_empty());
    }

    #[test]
    fn rejects_bad_values() {
        let zero_tempo = VoiceProfile::from_toml_str("[voice]\ntempo = 0.0").unwrap();
        assert!(matches!(zero_tempo.settings(), Err(MurmurError::InvalidSettings(_))));

        let neg_jitter = VoiceProfile::from_toml_str(
            "[[intonation.inflections]]\nstyle = \"command\"\nvolume_jitter = -0.5",
        )
        .unwrap();
        assert!(neg_jitter.intonation().is_err());

        assert!(matches!(
            VoiceProfile::from_toml_str("[[intonation.inflections]]\nstyle = \"sarcasm\""),
            Err(MurmurError::Toml(_))
        ));
        assert!(VoiceProfile::from_toml_str("[[accent.phonemes]]\ncharacter = \"ab\"\nclip = \"x\"").is_err());
    }

    #[test]
    fn round_trips_through_toml() {
        let p = VoiceProfile::from_toml_str(PROFILE).unwrap();
        let again = VoiceProfile::from_toml_str(&p.to_toml_string().unwrap()).unwrap();
        assert_eq!(again.accent.phonemes, p.accent.phonemes);
        assert_eq!(again.intonation.inflections, p.intonation.inflections);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        assert!(matches!(
            VoiceProfile::load("/definitely/not/here.toml"),
            Err(MurmurError::Io(_))
        ));
    }
}
