//! The utterance controller.
//!
//! A [`Voice`] walks a line of text one character at a time on a tokio task.
//! Letters are inflected, pronounced and followed by a short pause; whitespace
//! and punctuation only pause. Each `speak` replaces whatever the voice was
//! saying, and `stop` silences it.
//!
//! Cancellation uses a generation counter: `speak`, `stop` and `detach` bump it
//! under the same lock a step runs under, and broadcast it on a watch channel
//! that every pause listens to. A superseded task therefore never issues another
//! playback command, and never resumes from a pause.

use crate::event::{TracingObserver, VoiceEvent, VoiceObserver};
use crate::intonation::{IntonationTable, Style};
use crate::playback::PlaybackDevice;
use crate::pronunciation::{Pronunciation, PronunciationTable};
use crate::{MurmurError, Result};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use unicode_general_category::{get_general_category, GeneralCategory};

pub const DEFAULT_CHARACTER_DELAY: f32 = 0.1;
pub const DEFAULT_WORD_DELAY: f32 = 0.2;
pub const DEFAULT_TEMPO: f32 = 1.0;

/// Pacing for a voice
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoiceSettings {
    /// Pause after each pronounced character (seconds)
    pub character_delay: f32,
    /// Pause for whitespace and punctuation (seconds)
    pub word_delay: f32,
    /// Speed multiplier, 2.0 speaks twice as fast
    pub tempo: f32,
}

impl Default for VoiceSettings {
    /// Constants, overridable through `MURMUR_CHARACTER_DELAY`, `MURMUR_WORD_DELAY`
    /// and `MURMUR_TEMPO`. Unparseable or out-of-range values are ignored.
    fn default() -> Self {
        let delay = |key: &str, fallback: f32| {
            std::env::var(key)
                .ok()
                .and_then(|s| s.trim().parse::<f32>().ok())
                .filter(|v| v.is_finite() && *v >= 0.0)
                .unwrap_or(fallback)
        };
        Self {
            character_delay: delay("MURMUR_CHARACTER_DELAY", DEFAULT_CHARACTER_DELAY),
            word_delay: delay("MURMUR_WORD_DELAY", DEFAULT_WORD_DELAY),
            tempo: std::env::var("MURMUR_TEMPO")
                .ok()
                .and_then(|s| s.trim().parse::<f32>().ok())
                .filter(|v| v.is_finite() && *v > 0.0)
                .unwrap_or(DEFAULT_TEMPO),
        }
    }
}

impl VoiceSettings {
    pub fn new(character_delay: f32, word_delay: f32, tempo: f32) -> Result<Self> {
        let settings = Self {
            character_delay,
            word_delay,
            tempo,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, v) in [
            ("character_delay", self.character_delay),
            ("word_delay", self.word_delay),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(MurmurError::InvalidSettings(format!(
                    "{} must be a non-negative number of seconds, got {}",
                    name, v
                )));
            }
        }
        if !self.tempo.is_finite() || self.tempo <= 0.0 {
            return Err(MurmurError::InvalidSettings(format!(
                "tempo must be greater than zero, got {}",
                self.tempo
            )));
        }
        Ok(())
    }

    pub fn character_pause(&self) -> Duration {
        scaled(self.character_delay, self.tempo)
    }

    pub fn word_pause(&self) -> Duration {
        scaled(self.word_delay, self.tempo)
    }
}

// microsecond resolution keeps 0.1s at exactly 100ms
fn scaled(delay: f32, tempo: f32) -> Duration {
    let secs = delay as f64 / tempo as f64;
    Duration::from_micros((secs * 1_000_000.0).round() as u64)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoiceState {
    Idle,
    Speaking,
}

/// One in-flight line of text
#[derive(Debug)]
struct Utterance {
    text: Vec<char>,
    style: Style,
    cursor: usize,
}

/// Whitespace and Unicode punctuation only pause
pub fn is_separator(c: char) -> bool {
    c.is_whitespace() || is_punctuation(c)
}

// Unicode general categories Pc, Pd, Ps, Pe, Pi, Pf, Po.
// ASCII symbols such as '$' or '+' are Sc/Sm/Sk, so they get pronounced.
fn is_punctuation(c: char) -> bool {
    matches!(
        get_general_category(c),
        GeneralCategory::ConnectorPunctuation
            | GeneralCategory::DashPunctuation
            | GeneralCategory::OpenPunctuation
            | GeneralCategory::ClosePunctuation
            | GeneralCategory::InitialPunctuation
            | GeneralCategory::FinalPunctuation
            | GeneralCategory::OtherPunctuation
    )
}

struct Channel {
    generation: u64,
    device: Option<Box<dyn PlaybackDevice>>,
}

struct Inner {
    name: String,
    accent: Arc<PronunciationTable>,
    intonation: Arc<IntonationTable>,
    observer: Arc<dyn VoiceObserver>,
    channel: Mutex<Channel>,
    // bumped on every speak/stop/detach; pauses wake up on change
    generation_tx: watch::Sender<u64>,
    state_tx: watch::Sender<VoiceState>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Channel> {
        self.channel.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, events: Vec<VoiceEvent>) {
        for event in &events {
            self.observer.notify(event);
        }
    }

    fn state(&self) -> VoiceState {
        *self.state_tx.borrow()
    }

    /// Publish `state`, waking watchers only when it actually changes
    fn set_state(&self, state: VoiceState) {
        self.state_tx.send_if_modified(|current| {
            let changed = *current != state;
            *current = state;
            changed
        });
    }

    /// Invalidate the running sequence, if any, and move to `next`.
    /// Must hold the channel lock.
    fn cancel(&self, channel: &mut Channel, next: VoiceState) -> bool {
        let was_speaking = self.state() == VoiceState::Speaking;
        channel.generation += 1;
        self.generation_tx.send_replace(channel.generation);
        self.set_state(next);
        was_speaking
    }

    /// Run the step at `utterance.cursor`. `None` once the sequence is stale.
    fn step(
        &self,
        generation: u64,
        utterance: &Utterance,
        settings: &VoiceSettings,
    ) -> Option<Duration> {
        let character = utterance.text[utterance.cursor];
        let mut events = Vec::new();

        let pause = {
            let mut channel = self.lock();
            if channel.generation != generation {
                return None;
            }
            let device = channel.device.as_mut()?;

            if is_separator(character) {
                settings.word_pause()
            } else {
                let progress = utterance.cursor as f32 / utterance.text.len() as f32;
                let inflected = self.intonation.inflect(utterance.style, progress);
                if inflected.fallback {
                    events.push(VoiceEvent::InflectionMissing {
                        voice: self.name.clone(),
                        style: utterance.style,
                    });
                }
                events.push(VoiceEvent::Inflected {
                    voice: self.name.clone(),
                    style: utterance.style,
                    progress,
                    pitch: inflected.modulation.pitch,
                    volume: inflected.modulation.volume,
                });

                // base first, then the modulated values on top
                device.set_pitch(self.intonation.pitch());
                device.set_volume(self.intonation.volume());
                device.set_pitch(inflected.modulation.pitch);
                device.set_volume(inflected.modulation.volume);

                match self.accent.lookup(character) {
                    Pronunciation::Exact(sound) => {
                        device.play_one_shot(sound);
                        events.push(VoiceEvent::Pronounced {
                            voice: self.name.clone(),
                            character,
                            matched: character,
                            clip: sound.clone(),
                        });
                    }
                    Pronunciation::CaseFolded { matched, sound } => {
                        device.play_one_shot(sound);
                        events.push(VoiceEvent::Pronounced {
                            voice: self.name.clone(),
                            character,
                            matched,
                            clip: sound.clone(),
                        });
                    }
                    Pronunciation::Missing => events.push(VoiceEvent::PhonemeMissing {
                        voice: self.name.clone(),
                        character,
                    }),
                }
                settings.character_pause()
            }
        };

        events.push(VoiceEvent::Paused {
            voice: self.name.clone(),
            seconds: pause.as_secs_f32(),
        });
        self.emit(events);
        Some(pause)
    }

    fn finish(&self, generation: u64) {
        {
            let channel = self.lock();
            if channel.generation != generation {
                return;
            }
            self.set_state(VoiceState::Idle);
        }
        self.emit(vec![VoiceEvent::Finished {
            voice: self.name.clone(),
        }]);
    }
}

async fn run_utterance(
    inner: Arc<Inner>,
    mut utterance: Utterance,
    generation: u64,
    settings: VoiceSettings,
    mut cancelled: watch::Receiver<u64>,
) {
    while utterance.cursor < utterance.text.len() {
        let Some(pause) = inner.step(generation, &utterance, &settings) else {
            return;
        };
        tokio::select! {
            biased;
            _ = cancelled.changed() => return,
            _ = tokio::time::sleep(pause) => {}
        }
        utterance.cursor += 1;
    }
    inner.finish(generation);
}

/// A character voice: one pronunciation table, one intonation table, and at
/// most one utterance in flight.
pub struct Voice {
    inner: Arc<Inner>,
    settings: VoiceSettings,
}

impl Voice {
    /// New voice with default settings, a tracing observer and no device attached
    pub fn new(
        name: impl Into<String>,
        accent: Arc<PronunciationTable>,
        intonation: Arc<IntonationTable>,
    ) -> Self {
        Self::with_observer(name, accent, intonation, Arc::new(TracingObserver))
    }

    pub fn with_observer(
        name: impl Into<String>,
        accent: Arc<PronunciationTable>,
        intonation: Arc<IntonationTable>,
        observer: Arc<dyn VoiceObserver>,
    ) -> Self {
        let (generation_tx, _) = watch::channel(0);
        let (state_tx, _) = watch::channel(VoiceState::Idle);
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                accent,
                intonation,
                observer,
                channel: Mutex::new(Channel {
                    generation: 0,
                    device: None,
                }),
                generation_tx,
                state_tx,
            }),
            settings: VoiceSettings::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn state(&self) -> VoiceState {
        self.inner.state()
    }

    pub fn is_speaking(&self) -> bool {
        self.state() == VoiceState::Speaking
    }

    pub fn settings(&self) -> VoiceSettings {
        self.settings
    }

    /// Takes effect from the next `speak`
    pub fn set_settings(&mut self, settings: VoiceSettings) -> Result<()> {
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    pub fn accent(&self) -> &Arc<PronunciationTable> {
        &self.inner.accent
    }

    pub fn intonation(&self) -> &Arc<IntonationTable> {
        &self.inner.intonation
    }

    /// Route output to `device`, replacing any previous one
    pub fn attach(&self, device: impl PlaybackDevice + 'static) {
        self.inner.lock().device = Some(Box::new(device));
    }

    /// Remove the output device, silencing any utterance in progress
    pub fn detach(&self) -> Option<Box<dyn PlaybackDevice>> {
        let (device, was_speaking) = {
            let mut channel = self.inner.lock();
            let was_speaking = self.inner.cancel(&mut channel, VoiceState::Idle);
            (channel.device.take(), was_speaking)
        };
        if was_speaking {
            self.inner.emit(vec![VoiceEvent::Stopped {
                voice: self.inner.name.clone(),
            }]);
        }
        device
    }

    pub fn has_device(&self) -> bool {
        self.inner.lock().device.is_some()
    }

    /// Say `text` aloud, interrupting anything already being said.
    ///
    /// Fails without side effects if no device is attached or no tokio runtime
    /// is running.
    pub fn speak(&self, text: impl Into<String>, style: Style) -> Result<()> {
        let text = text.into();
        let name = self.inner.name.clone();

        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                self.inner.emit(vec![VoiceEvent::Rejected {
                    voice: name,
                    reason: "no async runtime".into(),
                }]);
                return Err(MurmurError::NoRuntime);
            }
        };

        let mut events = Vec::new();
        let spawn = {
            let mut channel = self.inner.lock();
            if channel.device.is_none() {
                drop(channel);
                self.inner.emit(vec![VoiceEvent::Rejected {
                    voice: name.clone(),
                    reason: "missing output device".into(),
                }]);
                return Err(MurmurError::MissingOutputDevice(name));
            }

            // a replaced utterance never passes through Idle
            let next = if text.is_empty() {
                VoiceState::Idle
            } else {
                VoiceState::Speaking
            };
            if self.inner.cancel(&mut channel, next) {
                events.push(VoiceEvent::Interrupted { voice: name.clone() });
            }
            events.push(VoiceEvent::Started {
                voice: name.clone(),
                text: text.clone(),
                style,
            });

            if text.is_empty() {
                events.push(VoiceEvent::Finished { voice: name });
                None
            } else {
                // subscribed after the bump, so only later cancellations wake it
                Some((channel.generation, self.inner.generation_tx.subscribe()))
            }
        };
        self.inner.emit(events);

        if let Some((generation, cancelled)) = spawn {
            let utterance = Utterance {
                text: text.chars().collect(),
                style,
                cursor: 0,
            };
            runtime.spawn(run_utterance(
                Arc::clone(&self.inner),
                utterance,
                generation,
                self.settings,
                cancelled,
            ));
        }
        Ok(())
    }

    /// `speak` with [`Style::Statement`]
    pub fn say(&self, text: impl Into<String>) -> Result<()> {
        self.speak(text, Style::Statement)
    }

    /// Stop speaking. Idempotent.
    pub fn stop(&self) {
        let was_speaking = {
            let mut channel = self.inner.lock();
            if self.inner.state() == VoiceState::Speaking {
                self.inner.cancel(&mut channel, VoiceState::Idle)
            } else {
                false
            }
        };
        let voice = self.inner.name.clone();
        let event = if was_speaking {
            VoiceEvent::Stopped { voice }
        } else {
            VoiceEvent::AlreadyIdle { voice }
        };
        self.inner.emit(vec![event]);
    }

    /// Resolves once the voice is idle (immediately if it already is)
    pub async fn finished(&self) {
        let mut rx = self.inner.state_tx.subscribe();
        // the sender lives as long as `self`, so this can't fail
        let _ = rx.wait_for(|s| *s == VoiceState::Idle).await;
    }
}

impl Drop for Voice {
    fn drop(&mut self) {
        let mut channel = self.inner.lock();
        self.inner.cancel(&mut channel, VoiceState::Idle);
    }
}

impl std::fmt::Debug for Voice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Voice")
            .field("name", &self.inner.name)
            .field("state", &self.state())
            .field("settings", &self.settings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separators() {
        for c in [' ', '\t', '\n', '!', '?', '.', ',', '\'', '"', '-', '(', '…', '¿', '。', '、'] {
            assert!(is_separator(c), "{:?} should pause", c);
        }
        for c in ['a', 'Z', '7', 'é', '$', '+', '=', '日'] {
            assert!(!is_separator(c), "{:?} should be pronounced", c);
        }
    }

    #[test]
    fn punctuation_from_other_scripts_pauses() {
        // Syriac, Tibetan, Myanmar, Ethiopic, Mongolian, Balinese, Lisu, supplemental
        for c in [
            '\u{0700}', '\u{0F04}', '\u{104A}', '\u{1361}', '\u{1800}', '\u{1B5A}', '\u{A4FE}',
            '\u{2E52}', '\u{2E3A}', '\u{FF1F}',
        ] {
            assert!(is_separator(c), "U+{:04X} should pause", c as u32);
        }
        // currency and math symbols outside ASCII are still pronounced
        for c in ['€', '×', '∑'] {
            assert!(!is_separator(c), "{:?} should be pronounced", c);
        }
    }

    #[test]
    fn settings_validation() {
        assert!(VoiceSettings::new(0.1, 0.2, 1.0).is_ok());
        assert!(VoiceSettings::new(0.0, 0.0, 0.5).is_ok());
        assert!(matches!(
            VoiceSettings::new(0.1, 0.2, 0.0),
            Err(MurmurError::InvalidSettings(_))
        ));
        assert!(VoiceSettings::new(0.1, 0.2, -1.0).is_err());
        assert!(VoiceSettings::new(-0.1, 0.2, 1.0).is_err());
        assert!(VoiceSettings::new(0.1, f32::NAN, 1.0).is_err());
        assert!(VoiceSettings::new(0.1, 0.2, f32::INFINITY).is_err());
    }

    #[test]
    fn tempo_divides_pauses() {
        let normal = VoiceSettings::new(0.1, 0.2, 1.0).unwrap();
        let fast = VoiceSettings::new(0.1, 0.2, 2.0).unwrap();
        assert_eq!(normal.character_pause(), Duration::from_millis(100));
        assert_eq!(fast.character_pause(), Duration::from_millis(50));
        assert_eq!(fast.word_pause(), Duration::from_millis(100));
    }

    #[test]
    fn speak_outside_runtime_is_rejected() {
        let voice = Voice::new(
            "npc",
            Arc::new(PronunciationTable::default()),
            Arc::new(IntonationTable::new(1.0, 1.0, vec![]).unwrap()),
        );
        assert!(matches!(voice.say("hi"), Err(MurmurError::NoRuntime)));
        assert_eq!(voice.state(), VoiceState::Idle);
    }

    struct Silent;

    impl PlaybackDevice for Silent {
        fn play_one_shot(&mut self, _sound: &crate::SoundHandle) {}
        fn set_pitch(&mut self, _pitch: f32) {}
        fn set_volume(&mut self, _volume: f32) {}
    }

    #[tokio::test(start_paused = true)]
    async fn respeaking_never_reports_idle() {
        let voice = Voice::new(
            "npc",
            Arc::new(PronunciationTable::default()),
            Arc::new(IntonationTable::new(1.0, 1.0, vec![]).unwrap()),
        );
        voice.attach(Silent);
        voice.say("first line").unwrap();
        let mut state = voice.inner.state_tx.subscribe();
        assert_eq!(*state.borrow_and_update(), VoiceState::Speaking);

        voice.say("second line").unwrap();
        assert!(!state.has_changed().unwrap());
        assert!(voice.is_speaking());

        voice.say("").unwrap();
        assert!(state.has_changed().unwrap());
        assert_eq!(*state.borrow_and_update(), VoiceState::Idle);
    }
}
