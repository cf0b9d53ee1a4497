use serde::Serialize;

use super::notes::{find_top_notes, Note, NoteSettings};
use super::spectrum::{SpectralAnalyzer, Spectrum};
use super::window::{extract_window, FrameTiming, Waveform};

/// Pass 1: the largest bin magnitude over every frame of the clip.
///
/// Every pass-2 spectrum is divided by this value, so the Y axis keeps one
/// scale for the whole video.
pub fn global_peak(waveform: &Waveform, timing: &FrameTiming, analyzer: &SpectralAnalyzer) -> f32 {
    let peak = (0..timing.frame_count).fold(0.0f32, |running, frame_idx| {
        let window = extract_window(waveform.samples(), frame_idx, timing);
        running.max(analyzer.analyze(&window).peak())
    });
    log::info!("Max amplitude: {}", peak);
    peak
}

/// Pass-2 result for one frame.
#[derive(Clone, Debug)]
pub struct FrameAnalysis {
    pub index: usize,
    pub time: f32,
    /// Divided by the normalization constant.
    pub spectrum: Spectrum,
    pub notes: Vec<Note>,
}

#[derive(Clone, Debug, Serialize)]
pub struct FrameNotes {
    pub index: usize,
    pub time: f32,
    /// Loudest normalized bin of the frame.
    pub peak: f32,
    pub notes: Vec<Note>,
}

impl From<&FrameAnalysis> for FrameNotes {
    fn from(frame: &FrameAnalysis) -> Self {
        Self {
            index: frame.index,
            time: frame.time,
            peak: frame.spectrum.peak(),
            notes: frame.notes.clone(),
        }
    }
}

pub fn analyze_frame(
    waveform: &Waveform,
    timing: &FrameTiming,
    analyzer: &SpectralAnalyzer,
    normalization: f32,
    settings: &NoteSettings,
    index: usize,
) -> FrameAnalysis {
    let window = extract_window(waveform.samples(), index, timing);
    let spectrum = analyzer.analyze(&window).normalized(normalization);
    let notes = find_top_notes(&spectrum, analyzer.frequency_grid(), settings);

    FrameAnalysis {
        index,
        time: timing.frame_time(index),
        spectrum,
        notes,
    }
}
