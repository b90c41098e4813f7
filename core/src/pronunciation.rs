//! Character → clip lookup (the voice's "accent").

use crate::playback::SoundHandle;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One configured character and the clip it plays
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phoneme {
    pub character: char,
    pub clip: SoundHandle,
}

impl Phoneme {
    pub fn new(character: char, clip: impl Into<SoundHandle>) -> Self {
        Self {
            character,
            clip: clip.into(),
        }
    }
}

/// Outcome of a table lookup
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pronunciation<'a> {
    /// The character itself is configured
    Exact(&'a SoundHandle),
    /// Only the opposite-case character is configured
    CaseFolded { matched: char, sound: &'a SoundHandle },
    Missing,
}

impl<'a> Pronunciation<'a> {
    pub fn sound(&self) -> Option<&'a SoundHandle> {
        match *self {
            Pronunciation::Exact(sound) | Pronunciation::CaseFolded { sound, .. } => Some(sound),
            Pronunciation::Missing => None,
        }
    }
}

/// Immutable character → clip table.
///
/// The index is derived once from the phoneme list at construction; for
/// duplicate characters the later entry wins.
#[derive(Clone, Debug, Default)]
pub struct PronunciationTable {
    phonemes: Vec<Phoneme>,
    index: HashMap<char, usize>,
}

impl PronunciationTable {
    pub fn new(phonemes: Vec<Phoneme>) -> Self {
        let index = phonemes
            .iter()
            .enumerate()
            .map(|(i, p)| (p.character, i))
            .collect();
        Self { phonemes, index }
    }

    /// Exact match first, then a single retry with the case flipped
    pub fn lookup(&self, character: char) -> Pronunciation<'_> {
        if let Some(sound) = self.get(character) {
            return Pronunciation::Exact(sound);
        }
        match opposite_case(character).and_then(|c| self.get(c).map(|s| (c, s))) {
            Some((matched, sound)) => Pronunciation::CaseFolded { matched, sound },
            None => Pronunciation::Missing,
        }
    }

    /// Clip for `character`, if any.
    ///
    /// Reports nothing on its own; use [`lookup`](Self::lookup) to tell exact,
    /// case-folded and missing apart. [`Voice`](crate::Voice) reports each of
    /// those through its [`VoiceObserver`](crate::VoiceObserver).
    pub fn resolve(&self, character: char) -> Option<SoundHandle> {
        self.lookup(character).sound().cloned()
    }

    /// Configured characters in authoring order (duplicates included)
    pub fn characters(&self) -> impl Iterator<Item = char> + '_ {
        self.phonemes.iter().map(|p| p.character)
    }

    pub fn phonemes(&self) -> &[Phoneme] {
        &self.phonemes
    }

    /// Number of distinct characters
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn get(&self, character: char) -> Option<&SoundHandle> {
        self.index.get(&character).map(|&i| &self.phonemes[i].clip)
    }
}

impl FromIterator<Phoneme> for PronunciationTable {
    fn from_iter<I: IntoIterator<Item = Phoneme>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

// Upper if lowercase, lower otherwise. Multi-char mappings keep the first char.
fn opposite_case(c: char) -> Option<char> {
    let flipped = if c.is_lowercase() {
        c.to_uppercase().next()
    } else {
        c.to_lowercase().next()
    };
    flipped.filter(|f| *f != c)
}
