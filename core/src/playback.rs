//! The audio output a voice drives.
//!
//! murmur never decodes or mixes audio itself: a host engine implements
//! [`PlaybackDevice`] and interprets [`SoundHandle`]s however it likes
//! (asset path, clip name, bank index).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Opaque, cheap-to-clone reference to a sound clip
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct SoundHandle(Arc<str>);

impl SoundHandle {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SoundHandle {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<&str> for SoundHandle {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<SoundHandle> for String {
    fn from(h: SoundHandle) -> Self {
        h.0.to_string()
    }
}

impl fmt::Display for SoundHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Output channel a voice speaks through.
///
/// Pitch and volume are set before each clip is triggered and stay in effect
/// until changed again.
pub trait PlaybackDevice: Send {
    /// Fire-and-forget playback of one clip
    fn play_one_shot(&mut self, sound: &SoundHandle);

    fn set_pitch(&mut self, pitch: f32);

    fn set_volume(&mut self, volume: f32);
}
