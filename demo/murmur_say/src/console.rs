use murmur_core::{PlaybackDevice, SoundHandle, VoiceEvent, VoiceObserver};
use std::io::Write;
use tracing::info;

/// Stand-in output device: logs each clip with the pitch and volume it would play at
#[derive(Debug)]
pub struct ConsoleDevice {
    pitch: f32,
    volume: f32,
    played: u64,
}

impl ConsoleDevice {
    pub fn new() -> Self {
        Self {
            pitch: 1.0,
            volume: 1.0,
            played: 0,
        }
    }
}

impl PlaybackDevice for ConsoleDevice {
    fn play_one_shot(&mut self, sound: &SoundHandle) {
        self.played += 1;
        info!(
            target = "playback",
            clip = %sound,
            pitch = self.pitch as f64,
            volume = self.volume as f64,
            n = self.played,
            "♪"
        );
    }

    fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch;
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }
}

/// Writes every event as one JSON line on stdout
#[derive(Debug, Default)]
pub struct JsonLinesObserver;

impl VoiceObserver for JsonLinesObserver {
    fn notify(&self, event: &VoiceEvent) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{}", event.to_json());
    }
}
