use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::spectrum::Spectrum;

/// A spectral peak labelled with its nearest equal-tempered note.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Note {
    /// Frequency of the grid bin the note was read from, in Hz.
    pub frequency: f32,
    pub name: String,
    pub magnitude: f32,
    /// Distance from the named note's equal-tempered pitch, in cents.
    pub cents: f32,
}

/// Which notes count as duplicates within one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    /// Same pitch class and octave, e.g. two bins both rounding to "A4".
    #[default]
    Name,
    /// Same pitch class in any octave.
    PitchClass,
    /// Keep every bin.
    Off,
}

pub struct NoteSettings<'a> {
    pub top: usize,
    pub silence_floor: f32,
    pub dedup: DedupPolicy,
    pub names: &'a [String; 12],
}

/// Semitone number with A4 = 440 Hz = 69.
pub fn freq_to_number(freq: f32) -> f32 {
    69.0 + 12.0 * (freq / 440.0).log2()
}

pub fn number_to_freq(number: f32) -> f32 {
    440.0 * 2.0f32.powf((number - 69.0) / 12.0)
}

pub fn note_name(number: i32, names: &[String; 12]) -> String {
    let pitch_class = number.rem_euclid(12) as usize;
    let octave = number.div_euclid(12) - 1;
    format!("{}{}", names[pitch_class], octave)
}

/// Up to `settings.top` distinct notes in descending magnitude order.
///
/// Returns nothing when the loudest bin is below the silence floor. Equal
/// magnitudes keep their bin order. The DC bin has no pitch and is skipped.
pub fn find_top_notes(spectrum: &Spectrum, grid: &[f32], settings: &NoteSettings) -> Vec<Note> {
    if settings.top == 0 || spectrum.peak() < settings.silence_floor {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..spectrum.magnitudes.len().min(grid.len())).collect();
    // sort_by is stable, so ties stay in index order
    order.sort_by(|&a, &b| {
        spectrum.magnitudes[b]
            .partial_cmp(&spectrum.magnitudes[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut found = Vec::with_capacity(settings.top);
    let mut seen: HashSet<String> = HashSet::new();

    for idx in order {
        if found.len() >= settings.top {
            break;
        }
        let frequency = grid[idx];
        if frequency <= 0.0 {
            continue;
        }

        let number = freq_to_number(frequency).round() as i32;
        let name = note_name(number, settings.names);
        let key = match settings.dedup {
            DedupPolicy::Name => Some(name.clone()),
            DedupPolicy::PitchClass => Some(settings.names[number.rem_euclid(12) as usize].clone()),
            DedupPolicy::Off => None,
        };

        if let Some(key) = key {
            if !seen.insert(key) {
                continue;
            }
        }

        found.push(Note {
            frequency,
            name,
            magnitude: spectrum.magnitudes[idx],
            cents: 1200.0 * (frequency / number_to_freq(number as f32)).log2(),
        });
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_NOTE_NAMES;

    fn names() -> [String; 12] {
        DEFAULT_NOTE_NAMES.map(String::from)
    }

    fn settings(names: &[String; 12], top: usize, dedup: DedupPolicy) -> NoteSettings<'_> {
        NoteSettings {
            top,
            silence_floor: 0.001,
            dedup,
            names,
        }
    }

    fn name_of(freq: f32) -> String {
        note_name(freq_to_number(freq).round() as i32, &names())
    }

    #[test]
    fn concert_pitch_names() {
        assert_eq!(name_of(440.0), "A4");
        assert_eq!(name_of(880.0), "A5");
        assert_eq!(name_of(261.63), "C4");
        assert_eq!(name_of(27.5), "A0");
        assert_eq!(name_of(450.0), "A4");
        assert_eq!(name_of(460.0), "A#4");
    }

    #[test]
    fn sub_audio_frequencies_get_negative_octaves() {
        // 10 Hz rounds to semitone 3
        assert_eq!(name_of(10.0), "D#-1");
    }

    #[test]
    fn number_and_frequency_are_inverse() {
        assert!((number_to_freq(69.0) - 440.0).abs() < 1e-3);
        assert!((number_to_freq(60.0) - 261.6256).abs() < 1e-2);
        assert!((freq_to_number(number_to_freq(47.0)) - 47.0).abs() < 1e-4);
    }

    #[test]
    fn quiet_spectrum_has_no_notes() {
        let names = names();
        let grid = vec![0.0, 220.0, 440.0, 880.0];
        let spectrum = Spectrum {
            magnitudes: vec![0.0, 0.0005, 0.0009, 0.0002],
        };
        assert!(find_top_notes(&spectrum, &grid, &settings(&names, 3, DedupPolicy::Name)).is_empty());
    }

    #[test]
    fn adjacent_bins_collapse_to_one_name() {
        let names = names();
        let grid = vec![0.0, 436.0, 440.0, 444.0, 880.0, 660.0];
        let spectrum = Spectrum {
            magnitudes: vec![0.0, 0.8, 1.0, 0.9, 0.3, 0.2],
        };
        let notes = find_top_notes(&spectrum, &grid, &settings(&names, 3, DedupPolicy::Name));
        let labels: Vec<&str> = notes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(labels, vec!["A4", "A5", "E5"]);
        assert_eq!(notes[0].frequency, 440.0);
        assert_eq!(notes[0].magnitude, 1.0);
        assert!(notes[0].cents.abs() < 1e-3);
        // 660 Hz sits two cents above E5
        assert!((notes[2].cents - 1.955).abs() < 0.01);
    }

    #[test]
    fn never_more_than_k_and_never_duplicated() {
        let names = names();
        let grid: Vec<f32> = (0..400).map(|k| k as f32 * 5.0).collect();
        let spectrum = Spectrum {
            magnitudes: (0..400).map(|k| ((k * 37) % 101) as f32 / 100.0).collect(),
        };
        for top in 0..8 {
            let notes = find_top_notes(&spectrum, &grid, &settings(&names, top, DedupPolicy::Name));
            assert!(notes.len() <= top);
            let unique: HashSet<&str> = notes.iter().map(|n| n.name.as_str()).collect();
            assert_eq!(unique.len(), notes.len());
            assert!(notes.windows(2).all(|w| w[0].magnitude >= w[1].magnitude));
        }
    }

    #[test]
    fn ties_keep_bin_order() {
        let names = names();
        let grid = vec![0.0, 220.0, 440.0, 880.0];
        let spectrum = Spectrum {
            magnitudes: vec![0.0, 0.5, 0.5, 0.5],
        };
        let notes = find_top_notes(&spectrum, &grid, &settings(&names, 2, DedupPolicy::Name));
        assert_eq!(notes[0].name, "A3");
        assert_eq!(notes[1].name, "A4");
    }

    #[test]
    fn dc_bin_is_ignored() {
        let names = names();
        let grid = vec![0.0, 440.0];
        let spectrum = Spectrum {
            magnitudes: vec![1.0, 0.5],
        };
        let notes = find_top_notes(&spectrum, &grid, &settings(&names, 3, DedupPolicy::Name));
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].name, "A4");
    }

    #[test]
    fn pitch_class_policy_merges_octaves() {
        let names = names();
        let grid = vec![0.0, 220.0, 440.0, 880.0, 330.0];
        let spectrum = Spectrum {
            magnitudes: vec![0.0, 0.9, 1.0, 0.8, 0.1],
        };
        let notes = find_top_notes(&spectrum, &grid, &settings(&names, 3, DedupPolicy::PitchClass));
        let labels: Vec<&str> = notes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(labels, vec!["A4", "E4"]);

        let notes = find_top_notes(&spectrum, &grid, &settings(&names, 3, DedupPolicy::Off));
        let labels: Vec<&str> = notes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(labels, vec!["A4", "A3", "A5"]);
    }
}
