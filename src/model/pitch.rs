// Pitch table - the fixed 88-key piano range
// Maps pitch index 0..=87 to a note label and an equal-tempered frequency.

use crate::error::EngineError;

/// Number of pitches on the grid (88-key piano range, A0 through C8)
pub const PITCH_COUNT: usize = 88;

/// Index of A4 within the table; the equal-temperament anchor (440 Hz)
const A4_INDEX: i32 = 48;

/// Reference frequency for A4 in Hz
const A4_FREQUENCY: f64 = 440.0;

/// Immutable label/frequency table for the 88 grid pitches
///
/// Labels are generated by seeding the table with the three notes below C1
/// ("A0", "Bb0", "B0") and then walking twelve chromatic names across
/// octaves 1..=8 until exactly 88 entries exist, so the table ends
/// mid-octave at "C8". Frequencies are equal-tempered around A4 = 440 Hz.
#[derive(Debug, Clone)]
pub struct PitchTable {
    labels: Vec<String>,
    frequencies: [f64; PITCH_COUNT],
}

impl PitchTable {
    /// Build the table
    pub fn new() -> Self {
        const NAMES: [&str; 12] = [
            "C", "C#", "D", "Eb", "E", "F", "F#", "G", "G#", "A", "Bb", "B",
        ];

        let mut labels: Vec<String> = vec!["A0".into(), "Bb0".into(), "B0".into()];
        'octaves: for octave in 1..=8 {
            for name in NAMES {
                if labels.len() >= PITCH_COUNT {
                    break 'octaves;
                }
                labels.push(format!("{}{}", name, octave));
            }
        }
        debug_assert_eq!(labels.len(), PITCH_COUNT);

        let mut frequencies = [0.0; PITCH_COUNT];
        for (i, freq) in frequencies.iter_mut().enumerate() {
            let semitones = i as i32 - A4_INDEX;
            *freq = A4_FREQUENCY * (semitones as f64 / 12.0).exp2();
        }

        Self {
            labels,
            frequencies,
        }
    }

    /// Frequency in Hz of the given pitch index
    pub fn frequency(&self, pitch: u8) -> Result<f64, EngineError> {
        self.frequencies
            .get(pitch as usize)
            .copied()
            .ok_or(EngineError::InvalidPitch(pitch))
    }

    /// Note label (e.g. "C#4") of the given pitch index
    pub fn label(&self, pitch: u8) -> Result<&str, EngineError> {
        self.labels
            .get(pitch as usize)
            .map(String::as_str)
            .ok_or(EngineError::InvalidPitch(pitch))
    }

    /// All 88 labels in pitch order
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

impl Default for PitchTable {
    fn default() -> Self {
        Self::new()
    }
}
