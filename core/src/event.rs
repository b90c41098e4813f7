// Voice diagnostics: structured events and the observers that receive them
use crate::intonation::Style;
use crate::playback::SoundHandle;
use serde::Serialize;
use std::fmt;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn, Level};

/// Everything a voice reports while speaking.
///
/// Events are observability only; nothing in the voice depends on them being
/// delivered.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VoiceEvent {
    Started {
        voice: String,
        text: String,
        style: Style,
    },
    /// A new utterance cut off the one in progress
    Interrupted { voice: String },
    /// `speak` was refused
    Rejected { voice: String, reason: String },
    Inflected {
        voice: String,
        style: Style,
        progress: f32,
        pitch: f32,
        volume: f32,
    },
    InflectionMissing { voice: String, style: Style },
    Pronounced {
        voice: String,
        character: char,
        /// Differs from `character` when the opposite case was used
        matched: char,
        clip: SoundHandle,
    },
    PhonemeMissing { voice: String, character: char },
    Paused { voice: String, seconds: f32 },
    Finished { voice: String },
    Stopped { voice: String },
    /// `stop` while nothing was being said
    AlreadyIdle { voice: String },
}

impl VoiceEvent {
    pub fn voice(&self) -> &str {
        match self {
            VoiceEvent::Started { voice, .. }
            | VoiceEvent::Interrupted { voice }
            | VoiceEvent::Rejected { voice, .. }
            | VoiceEvent::Inflected { voice, .. }
            | VoiceEvent::InflectionMissing { voice, .. }
            | VoiceEvent::Pronounced { voice, .. }
            | VoiceEvent::PhonemeMissing { voice, .. }
            | VoiceEvent::Paused { voice, .. }
            | VoiceEvent::Finished { voice }
            | VoiceEvent::Stopped { voice }
            | VoiceEvent::AlreadyIdle { voice } => voice,
        }
    }

    pub fn level(&self) -> Level {
        match self {
            VoiceEvent::Rejected { .. } => Level::ERROR,
            VoiceEvent::InflectionMissing { .. } | VoiceEvent::PhonemeMissing { .. } => {
                Level::WARN
            }
            VoiceEvent::Started { .. }
            | VoiceEvent::Interrupted { .. }
            | VoiceEvent::Finished { .. }
            | VoiceEvent::Stopped { .. }
            | VoiceEvent::AlreadyIdle { .. } => Level::INFO,
            VoiceEvent::Inflected { .. }
            | VoiceEvent::Pronounced { .. }
            | VoiceEvent::Paused { .. } => Level::DEBUG,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl fmt::Display for VoiceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoiceEvent::Started { voice, text, style } => {
                write!(f, "{} says '{}' ({})", voice, text, style)
            }
            VoiceEvent::Interrupted { voice } => write!(f, "{} interrupted itself", voice),
            VoiceEvent::Rejected { voice, reason } => {
                write!(f, "{} can't say anything: {}", voice, reason)
            }
            VoiceEvent::Inflected {
                voice,
                style,
                progress,
                pitch,
                volume,
            } => write!(
                f,
                "{} inflecting '{}' at {:.0}% (pitch {:.3}, volume {:.3})",
                voice,
                style,
                progress * 100.0,
                pitch,
                volume
            ),
            VoiceEvent::InflectionMissing { voice, style } => {
                write!(f, "{} has no inflection for '{}'", voice, style)
            }
            VoiceEvent::Pronounced {
                voice,
                character,
                matched,
                clip,
            } if character == matched => {
                write!(f, "{} pronouncing '{}' with {}", voice, character, clip)
            }
            VoiceEvent::Pronounced {
                voice,
                character,
                matched,
                clip,
            } => write!(
                f,
                "{} pronouncing '{}' as '{}' with {}",
                voice, character, matched, clip
            ),
            VoiceEvent::PhonemeMissing { voice, character } => {
                write!(f, "{} has no phoneme for '{}'", voice, character)
            }
            VoiceEvent::Paused { voice, seconds } => {
                write!(f, "{} pausing {:.3}s", voice, seconds)
            }
            VoiceEvent::Finished { voice } => write!(f, "{} finished speaking", voice),
            VoiceEvent::Stopped { voice } => write!(f, "{} is no longer speaking", voice),
            VoiceEvent::AlreadyIdle { voice } => write!(f, "{} is already not speaking", voice),
        }
    }
}

/// Sink for voice diagnostics
pub trait VoiceObserver: Send + Sync {
    fn notify(&self, event: &VoiceEvent);
}

/// Forwards every event to `tracing` at the event's level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl VoiceObserver for TracingObserver {
    fn notify(&self, event: &VoiceEvent) {
        let voice = event.voice();
        let level = event.level();
        if level == Level::ERROR {
            error!(target: "voice", voice, "{}", event);
        } else if level == Level::WARN {
            warn!(target: "voice", voice, "{}", event);
        } else if level == Level::INFO {
            info!(target: "voice", voice, "{}", event);
        } else {
            debug!(target: "voice", voice, "{}", event);
        }
    }
}

/// Pushes events into an unbounded channel for an async consumer
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<VoiceEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<VoiceEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl VoiceObserver for ChannelObserver {
    fn notify(&self, event: &VoiceEvent) {
        // receiver gone just means nobody is listening any more
        let _ = self.tx.send(event.clone());
    }
}

/// Delivers each event to several observers in order
#[derive(Default, Clone)]
pub struct FanoutObserver {
    observers: Vec<std::sync::Arc<dyn VoiceObserver>>,
}

impl FanoutObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: std::sync::Arc<dyn VoiceObserver>) -> Self {
        self.observers.push(observer);
        self
    }
}

impl VoiceObserver for FanoutObserver {
    fn notify(&self, event: &VoiceEvent) {
        for observer in &self.observers {
            observer.notify(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn levels_follow_severity() {
        let v = || "npc".to_string();
        assert_eq!(
            VoiceEvent::Rejected {
                voice: v(),
                reason: "no device".into()
            }
            .level(),
            Level::ERROR
        );
        assert_eq!(
            VoiceEvent::PhonemeMissing {
                voice: v(),
                character: 'x'
            }
            .level(),
            Level::WARN
        );
        assert_eq!(VoiceEvent::Interrupted { voice: v() }.level(), Level::INFO);
        assert_eq!(VoiceEvent::AlreadyIdle { voice: v() }.level(), Level::INFO);
        assert_eq!(
            VoiceEvent::Paused {
                voice: v(),
                seconds: 0.1
            }
            .level(),
            Level::DEBUG
        );
    }

    #[test]
    fn serializes_with_type_tag() {
        let ev = VoiceEvent::Pronounced {
            voice: "npc".into(),
            character: 'A',
            matched: 'a',
            clip: SoundHandle::new("a.wav"),
        };
        let json = ev.to_json();
        assert_eq!(json["type"], "pronounced");
        assert_eq!(json["clip"], "a.wav");
        assert_eq!(json["matched"], "a");
        assert_eq!(ev.to_string(), "npc pronouncing 'A' as 'a' with a.wav");
    }

    #[tokio::test]
    async fn channel_and_fanout_deliver() {
        let (a, mut rx_a) = ChannelObserver::new();
        let (b, mut rx_b) = ChannelObserver::new();
        let fanout = FanoutObserver::new().with(Arc::new(a)).with(Arc::new(b));
        fanout.notify(&VoiceEvent::Finished {
            voice: "npc".into(),
        });
        assert_eq!(rx_a.recv().await.unwrap().voice(), "npc");
        assert!(matches!(rx_b.recv().await, Some(VoiceEvent::Finished { .. })));
    }
}
