//! Keyframe curves evaluated over normalized utterance progress.
//!
//! Keyframes may be written in a profile either as `[time, value]` pairs or as
//! `{ time = .., value = .. }` tables.

use crate::{MurmurError, Result};
use serde::{Deserialize, Serialize};

/// A single `(time, value)` point on a curve
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "KeyframeToml")]
pub struct Keyframe {
    pub time: f32,
    pub value: f32,
}

impl Keyframe {
    pub fn new(time: f32, value: f32) -> Self {
        Self { time, value }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KeyframeToml {
    Pair([f32; 2]),
    Table { time: f32, value: f32 },
}

impl From<KeyframeToml> for Keyframe {
    fn from(k: KeyframeToml) -> Self {
        match k {
            KeyframeToml::Pair([time, value]) => Keyframe { time, value },
            KeyframeToml::Table { time, value } => Keyframe { time, value },
        }
    }
}

/// Piecewise-linear curve over sorted keyframes.
///
/// Evaluation outside the keyframe domain holds the first/last value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Keyframe>", into = "Vec<Keyframe>")]
pub struct Curve {
    keys: Vec<Keyframe>,
}

impl Curve {
    /// Build a curve from keyframes in any order. Rejects empty or non-finite input.
    pub fn new(mut keys: Vec<Keyframe>) -> Result<Self> {
        if keys.is_empty() {
            return Err(MurmurError::InvalidCurve("curve needs at least one keyframe".into()));
        }
        if let Some(k) = keys
            .iter()
            .find(|k| !k.time.is_finite() || !k.value.is_finite())
        {
            return Err(MurmurError::InvalidCurve(format!(
                "non-finite keyframe ({}, {})",
                k.time, k.value
            )));
        }
        // stable, so keys sharing a time keep their authored order
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Ok(Self { keys })
    }

    /// Flat curve
    pub fn constant(value: f32) -> Self {
        Self {
            keys: vec![Keyframe::new(0.0, value)],
        }
    }

    /// Straight line from `from` at t=0 to `to` at t=1
    pub fn linear(from: f32, to: f32) -> Self {
        Self {
            keys: vec![Keyframe::new(0.0, from), Keyframe::new(1.0, to)],
        }
    }

    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    pub fn evaluate(&self, time: f32) -> f32 {
        let first = self.keys[0];
        let last = self.keys[self.keys.len() - 1];

        if time.is_nan() || time <= first.time {
            return first.value;
        }
        if time >= last.time {
            return last.value;
        }

        // first.time < time < last.time, so idx is in 1..len
        let idx = self.keys.partition_point(|k| k.time <= time);
        let a = self.keys[idx - 1];
        let b = self.keys[idx];
        let alpha = (time - a.time) / (b.time - a.time);
        a.value + (b.value - a.value) * alpha
    }
}

impl TryFrom<Vec<Keyframe>> for Curve {
    type Error = MurmurError;

    fn try_from(keys: Vec<Keyframe>) -> Result<Self> {
        Curve::new(keys)
    }
}

impl From<Curve> for Vec<Keyframe> {
    fn from(curve: Curve) -> Self {
        curve.keys
    }
}
