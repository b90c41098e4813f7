//! Sentence style → pitch/volume modulation.

use crate::curve::Curve;
use crate::jitter::{JitterSource, ThreadJitter};
use crate::{MurmurError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Jitter applied when a profile leaves it out
pub const DEFAULT_JITTER: f32 = 0.05;

/// Kind of sentence being spoken
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    #[default]
    Statement,
    Question,
    Exclamation,
    Command,
}

impl Style {
    pub const ALL: [Style; 4] = [
        Style::Statement,
        Style::Question,
        Style::Exclamation,
        Style::Command,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Statement => "statement",
            Style::Question => "question",
            Style::Exclamation => "exclamation",
            Style::Command => "command",
        }
    }

    /// A short line that showcases the style
    pub fn sample_line(&self) -> &'static str {
        match self {
            Style::Statement => "This is a statement.",
            Style::Question => "Is this a question?",
            Style::Exclamation => "This is an exclamation!",
            Style::Command => "Do this command.",
        }
    }

    /// Guess a style from the last punctuation mark of `text`.
    ///
    /// Commands can't be told apart from statements by punctuation alone.
    pub fn infer(text: &str) -> Style {
        match text
            .trim_end()
            .chars()
            .rev()
            .find(|c| matches!(c, '?' | '!' | '.' | '¿' | '¡'))
        {
            Some('?') | Some('¿') => Style::Question,
            Some('!') | Some('¡') => Style::Exclamation,
            _ => Style::Statement,
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Style {
    type Err = MurmurError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "statement" => Ok(Style::Statement),
            "question" => Ok(Style::Question),
            "exclamation" => Ok(Style::Exclamation),
            "command" => Ok(Style::Command),
            other => Err(MurmurError::InvalidProfile(format!("unknown style '{}'", other))),
        }
    }
}

fn default_jitter() -> f32 {
    DEFAULT_JITTER
}

/// Curves and wobble for one style
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Inflection {
    pub style: Style,
    #[serde(default)]
    pub pitch_curve: Option<Curve>,
    #[serde(default = "default_jitter")]
    pub pitch_jitter: f32,
    #[serde(default)]
    pub volume_curve: Option<Curve>,
    #[serde(default = "default_jitter")]
    pub volume_jitter: f32,
}

impl Inflection {
    /// No curves, default jitter
    pub fn new(style: Style) -> Self {
        Self {
            style,
            pitch_curve: None,
            pitch_jitter: DEFAULT_JITTER,
            volume_curve: None,
            volume_jitter: DEFAULT_JITTER,
        }
    }

    pub fn pitch(mut self, curve: Curve, jitter: f32) -> Self {
        self.pitch_curve = Some(curve);
        self.pitch_jitter = jitter;
        self
    }

    pub fn volume(mut self, curve: Curve, jitter: f32) -> Self {
        self.volume_curve = Some(curve);
        self.volume_jitter = jitter;
        self
    }

    fn validate(&self) -> Result<()> {
        for (name, j) in [("pitch", self.pitch_jitter), ("volume", self.volume_jitter)] {
            if !j.is_finite() || j < 0.0 {
                return Err(MurmurError::InvalidProfile(format!(
                    "{} jitter for {} must be a non-negative number, got {}",
                    name, self.style, j
                )));
            }
        }
        Ok(())
    }
}

/// Pitch and volume to apply before a clip
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Modulation {
    pub pitch: f32,
    pub volume: f32,
}

/// A modulation plus whether the style had to fall back to base values
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Inflected {
    pub modulation: Modulation,
    pub fallback: bool,
}

/// Immutable style → inflection table with base pitch and volume
#[derive(Clone, Debug)]
pub struct IntonationTable {
    pitch: f32,
    volume: f32,
    inflections: Vec<Inflection>,
    index: HashMap<Style, usize>,
    jitter: Arc<dyn JitterSource>,
}

impl IntonationTable {
    pub fn new(pitch: f32, volume: f32, inflections: Vec<Inflection>) -> Result<Self> {
        if !pitch.is_finite() || !volume.is_finite() {
            return Err(MurmurError::InvalidProfile(format!(
                "base pitch/volume must be finite, got {}/{}",
                pitch, volume
            )));
        }
        for inflection in &inflections {
            inflection.validate()?;
        }
        let index = inflections
            .iter()
            .enumerate()
            .map(|(i, inf)| (inf.style, i))
            .collect();
        Ok(Self {
            pitch,
            volume,
            inflections,
            index,
            jitter: Arc::new(ThreadJitter),
        })
    }

    /// Replace the random source (seeded or fixed sources make output reproducible)
    pub fn with_jitter(mut self, jitter: Arc<dyn JitterSource>) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn base(&self) -> Modulation {
        Modulation {
            pitch: self.pitch,
            volume: self.volume,
        }
    }

    pub fn inflection(&self, style: Style) -> Option<&Inflection> {
        self.index.get(&style).map(|&i| &self.inflections[i])
    }

    pub fn inflections(&self) -> &[Inflection] {
        &self.inflections
    }

    /// Modulation for `style` at `progress` (clamped to `[0, 1]`)
    ///
    /// A missing style silently yields the base values; [`inflect`](Self::inflect)
    /// flags that case, and [`Voice`](crate::Voice) reports it as
    /// [`VoiceEvent::InflectionMissing`](crate::VoiceEvent::InflectionMissing).
    pub fn modulate(&self, style: Style, progress: f32) -> Modulation {
        self.inflect(style, progress).modulation
    }

    pub fn inflect(&self, style: Style, progress: f32) -> Inflected {
        let Some(inflection) = self.inflection(style) else {
            return Inflected {
                modulation: self.base(),
                fallback: true,
            };
        };

        let progress = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 1.0)
        };
        let pitch_at = inflection
            .pitch_curve
            .as_ref()
            .map_or(1.0, |c| c.evaluate(progress));
        let volume_at = inflection
            .volume_curve
            .as_ref()
            .map_or(1.0, |c| c.evaluate(progress));

        Inflected {
            modulation: Modulation {
                pitch: self.pitch * pitch_at + self.jitter.sample(inflection.pitch_jitter),
                volume: self.volume * volume_at + self.jitter.sample(inflection.volume_jitter),
            },
            fallback: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jitter::{FixedJitter, SeededJitter};

    fn table() -> IntonationTable {
        IntonationTable::new(
            1.2,
            0.8,
            vec![
                Inflection::new(Style::Question)
                    .pitch(Curve::linear(1.0, 1.5), 0.1)
                    .volume(Curve::constant(0.5), 0.0),
                Inflection::new(Style::Statement),
            ],
        )
        .unwrap()
    }

    #[test]
    fn curve_times_base_without_jitter() {
        let t = table().with_jitter(Arc::new(FixedJitter(0.0)));
        let m = t.modulate(Style::Question, 0.5);
        assert!((m.pitch - 1.2 * 1.25).abs() < 1e-6);
        assert!((m.volume - 0.4).abs() < 1e-6);
    }

    #[test]
    fn missing_curve_multiplies_by_one() {
        let t = table().with_jitter(Arc::new(FixedJitter(1.0)));
        let m = t.modulate(Style::Statement, 0.3);
        assert!((m.pitch - (1.2 + DEFAULT_JITTER)).abs() < 1e-6);
        assert!((m.volume - (0.8 + DEFAULT_JITTER)).abs() < 1e-6);
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let t = table().with_jitter(Arc::new(SeededJitter::new(7)));
        for i in 0..=20 {
            let p = i as f32 / 20.0;
            let expected = 1.2 * (1.0 + 0.5 * p);
            let m = t.modulate(Style::Question, p);
            assert!(m.pitch >= expected - 0.1 - 1e-6 && m.pitch <= expected + 0.1 + 1e-6);
            assert!((m.volume - 0.4).abs() < 1e-6);
        }
    }

    #[test]
    fn unconfigured_style_returns_base() {
        let t = table();
        let inflected = t.inflect(Style::Command, 0.7);
        assert!(inflected.fallback);
        assert_eq!(inflected.modulation, Modulation { pitch: 1.2, volume: 0.8 });
    }

    #[test]
    fn progress_is_clamped() {
        let t = table().with_jitter(Arc::new(FixedJitter(0.0)));
        assert_eq!(t.modulate(Style::Question, 4.0), t.modulate(Style::Question, 1.0));
        assert_eq!(t.modulate(Style::Question, -1.0), t.modulate(Style::Question, 0.0));
    }

    #[test]
    fn rejects_negative_jitter() {
        let mut bad = Inflection::new(Style::Command);
        bad.volume_jitter = -0.1;
        assert!(IntonationTable::new(1.0, 1.0, vec![bad]).is_err());
        assert!(IntonationTable::new(f32::NAN, 1.0, vec![]).is_err());
    }

    #[test]
    fn style_parsing_and_inference() {
        assert_eq!("Question".parse::<Style>().unwrap(), Style::Question);
        assert!("whisper".parse::<Style>().is_err());
        assert_eq!(Style::infer("Is it?"), Style::Question);
        assert_eq!(Style::infer("Run!  "), Style::Exclamation);
        assert_eq!(Style::infer("Wait... really?!"), Style::Exclamation);
        assert_eq!(Style::infer("plain words"), Style::Statement);
        for style in Style::ALL {
            if style != Style::Command {
                assert_eq!(Style::infer(style.sample_line()), style);
            }
        }
    }
}
