//! Call-level expectations on the playback device

use mockall::predicate::eq;
use mockall::{mock, Sequence};
use murmur_core::{
    Curve, FixedJitter, Inflection, IntonationTable, Phoneme, PlaybackDevice, PronunciationTable,
    SoundHandle, Style, Voice, VoiceSettings,
};
use std::sync::Arc;

mock! {
    pub Device {}

    impl PlaybackDevice for Device {
        fn play_one_shot(&mut self, sound: &SoundHandle);
        fn set_pitch(&mut self, pitch: f32);
        fn set_volume(&mut self, volume: f32);
    }
}

fn quiet_voice() -> Voice {
    let accent: PronunciationTable = vec![Phoneme::new('o', "o.wav")].into_iter().collect();
    let intonation = IntonationTable::new(
        2.0,
        1.0,
        vec![Inflection::new(Style::Exclamation)
            .pitch(Curve::constant(1.5), 0.0)
            .volume(Curve::constant(0.25), 0.0)],
    )
    .unwrap()
    .with_jitter(Arc::new(FixedJitter(0.0)));

    let mut voice = Voice::new("mock", Arc::new(accent), Arc::new(intonation));
    voice
        .set_settings(VoiceSettings::new(0.1, 0.2, 1.0).unwrap())
        .unwrap();
    voice
}

#[tokio::test(start_paused = true)]
async fn one_letter_sets_base_then_modulation_then_plays() {
    let mut seq = Sequence::new();
    let mut device = MockDevice::new();
    device
        .expect_set_pitch()
        .with(eq(2.0))
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    device
        .expect_set_volume()
        .with(eq(1.0))
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    device
        .expect_set_pitch()
        .with(eq(3.0))
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    device
        .expect_set_volume()
        .with(eq(0.25))
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    device
        .expect_play_one_shot()
        .withf(|s| s.as_str() == "o.wav")
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());

    let voice = quiet_voice();
    voice.attach(device);
    voice.speak("O!", Style::Exclamation).unwrap();
    voice.finished().await;

    // dropping the device verifies the expectations
    drop(voice.detach());
}

#[tokio::test(start_paused = true)]
async fn separators_never_touch_the_device() {
    let mut device = MockDevice::new();
    device.expect_set_pitch().never();
    device.expect_set_volume().never();
    device.expect_play_one_shot().never();

    let voice = quiet_voice();
    voice.attach(device);
    voice.speak(" ... !? ", Style::Question).unwrap();
    voice.finished().await;
    drop(voice.detach());
}
