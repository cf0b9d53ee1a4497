use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::audio::decode::ChannelMode;
use crate::audio::notes::DedupPolicy;
use crate::error::VisualizerError;

pub const DEFAULT_NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Resolved run configuration. Built once, validated, then shared read-only.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VisualizerConfig {
    pub analysis: AnalysisConfig,
    pub display: DisplayConfig,
    pub style: StyleConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Video frames per second; also the analysis hop rate.
    pub fps: u32,
    /// Length of audio analysed per frame, in seconds.
    pub window_seconds: f64,
    /// Distinct notes reported per frame.
    pub top_notes: usize,
    /// Below this normalized peak a frame is treated as silent.
    pub silence_floor: f32,
    pub dedup: DedupPolicy,
    pub channel_mode: ChannelMode,
    pub note_names: [String; 12],
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub freq_min: f32,
    pub freq_max: f32,
    /// Logical chart size; the raster is `width * scale` by `height * scale`.
    pub width: u32,
    pub height: u32,
    pub scale: f32,
    /// Added to a note's frequency before placing its label.
    pub label_offset_hz: f32,
    pub title: String,
    pub x_title: String,
    pub y_title: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub paper_color: [u8; 3],
    pub plot_color: [u8; 3],
    pub grid_color: [u8; 3],
    pub line_color: [u8; 3],
    /// RGBA; alpha is applied when blending the area under the curve.
    pub fill_color: [u8; 4],
    pub text_color: [u8; 3],
    pub font_size: f32,
    pub note_font_size: f32,
    pub line_width: f32,
    /// Plot margins in logical pixels: left, right, top, bottom.
    pub margins: [u32; 4],
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub audio_file: PathBuf,
    pub frames_dir: PathBuf,
    pub video: PathBuf,
    pub ffmpeg: String,
    pub codec: String,
    pub pix_fmt: String,
    pub crf: Option<u32>,
    pub audio_codec: String,
    pub audio_bitrate: String,
    /// Render pass-2 frames on the rayon pool.
    pub parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            window_seconds: 0.25,
            top_notes: 3,
            silence_floor: 0.001,
            dedup: DedupPolicy::Name,
            channel_mode: ChannelMode::Downmix,
            note_names: DEFAULT_NOTE_NAMES.map(String::from),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            freq_min: 10.0,
            freq_max: 1000.0,
            width: 1920,
            height: 1080,
            scale: 2.0,
            label_offset_hz: 10.0,
            title: "frequency spectrum".into(),
            x_title: "Frequency (note)".into(),
            y_title: "Magnitude".into(),
        }
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            paper_color: [128, 128, 128],
            plot_color: [192, 192, 192],
            grid_color: [255, 255, 255],
            line_color: [0, 0, 205],
            fill_color: [173, 216, 230, 26],
            text_color: [42, 63, 95],
            font_size: 24.0,
            note_font_size: 48.0,
            line_width: 2.0,
            margins: [110, 60, 100, 90],
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            audio_file: PathBuf::from("audio_output").join("audio_0.wav"),
            frames_dir: PathBuf::from("audio_output").join("frames"),
            video: PathBuf::from("media").join("movie.mp4"),
            ffmpeg: "ffmpeg".into(),
            codec: "libx264".into(),
            pix_fmt: "yuv420p".into(),
            crf: None,
            audio_codec: "aac".into(),
            audio_bitrate: "192k".into(),
            parallel: false,
        }
    }
}

impl DisplayConfig {
    /// Raster dimensions after applying the scale factor.
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            (self.width as f32 * self.scale).round() as u32,
            (self.height as f32 * self.scale).round() as u32,
        )
    }
}

impl VisualizerConfig {
    pub fn validate(&self) -> Result<(), VisualizerError> {
        let invalid = |msg: String| Err(VisualizerError::Config(msg));

        if self.analysis.fps == 0 {
            return invalid("fps must be positive".into());
        }
        if !(self.analysis.window_seconds > 0.0) {
            return invalid(format!(
                "window_seconds must be positive, got {}",
                self.analysis.window_seconds
            ));
        }
        if !(self.analysis.silence_floor >= 0.0) {
            return invalid("silence_floor must be non-negative".into());
        }
        if self.analysis.note_names.iter().any(|n| n.is_empty()) {
            return invalid("note_names must not contain empty entries".into());
        }
        if !(self.display.freq_min < self.display.freq_max) {
            return invalid(format!(
                "frequency range is empty: [{}, {}]",
                self.display.freq_min, self.display.freq_max
            ));
        }
        if !(self.display.scale > 0.0) {
            return invalid(format!("scale must be positive, got {}", self.display.scale));
        }
        let (w, h) = self.display.pixel_size();
        if w == 0 || h == 0 {
            return invalid(format!("output resolution {}x{} is empty", w, h));
        }
        let [left, right, top, bottom] = self.style.margins;
        if left + right >= self.display.width || top + bottom >= self.display.height {
            return invalid("margins leave no room for the plot area".into());
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<VisualizerConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// `./notescope.toml`, then `~/.config/notescope/config.toml`, then the platform config dir.
pub fn discover_config_path() -> Option<PathBuf> {
    let local = PathBuf::from("notescope.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("notescope").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("notescope").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = VisualizerConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.analysis.fps, 30);
        assert_eq!(cfg.analysis.top_notes, 3);
        assert_eq!(cfg.analysis.note_names[9], "A");
        assert_eq!(cfg.display.pixel_size(), (3840, 2160));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: VisualizerConfig = toml::from_str(
            r#"
            [analysis]
            fps = 10
            dedup = "pitch_class"
            channel_mode = "first"

            [display]
            scale = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(cfg.analysis.fps, 10);
        assert_eq!(cfg.analysis.dedup, DedupPolicy::PitchClass);
        assert_eq!(cfg.analysis.channel_mode, ChannelMode::First);
        assert_eq!(cfg.analysis.window_seconds, 0.25);
        assert_eq!(cfg.display.pixel_size(), (960, 540));
        assert_eq!(cfg.output.codec, "libx264");
    }

    #[test]
    fn rejects_empty_frequency_range() {
        let mut cfg = VisualizerConfig::default();
        cfg.display.freq_min = 500.0;
        cfg.display.freq_max = 500.0;
        assert!(matches!(cfg.validate(), Err(VisualizerError::Config(_))));
    }

    #[test]
    fn rejects_zero_fps_and_bad_scale() {
        let mut cfg = VisualizerConfig::default();
        cfg.analysis.fps = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = VisualizerConfig::default();
        cfg.display.scale = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn load_config_reports_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
