// murmur core library
// Procedural character voices: one clip per letter, shaped by sentence style

pub mod curve;
pub mod event;
pub mod intonation;
pub mod jitter;
pub mod playback;
pub mod profile;
pub mod pronunciation;
pub mod voice;

// Export core types
pub use curve::{Curve, Keyframe};
pub use event::{ChannelObserver, FanoutObserver, TracingObserver, VoiceEvent, VoiceObserver};
pub use intonation::{Inflection, IntonationTable, Modulation, Style};
pub use jitter::{FixedJitter, JitterSource, SeededJitter, ThreadJitter};
pub use playback::{PlaybackDevice, SoundHandle};
pub use profile::VoiceProfile;
pub use pronunciation::{Phoneme, Pronunciation, PronunciationTable};
pub use voice::{Voice, VoiceSettings, VoiceState};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MurmurError {
    #[error("{0} can't say anything without an output device")]
    MissingOutputDevice(String),

    #[error("No tokio runtime available to drive the voice")]
    NoRuntime,

    #[error("Invalid voice settings: {0}")]
    InvalidSettings(String),

    #[error("Invalid curve: {0}")]
    InvalidCurve(String),

    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}
pub type Result<T> = std::result::Result<T, MurmurError>;
