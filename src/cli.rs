use clap::Parser;
use std::path::PathBuf;

use crate::audio::decode::ChannelMode;
use crate::audio::notes::DedupPolicy;
use crate::config::VisualizerConfig;

/// Flags override the config file; anything left unset keeps its configured value.
#[derive(Parser, Debug)]
#[command(name = "notescope", about = "Render a note-annotated spectrum video from an audio file")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG). Defaults to `output.audio_file` from the config
    pub input: Option<PathBuf>,

    /// Output video file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory the PNG frames are written to (cleared first)
    #[arg(long)]
    pub frames_dir: Option<PathBuf>,

    /// Config file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Frames per second
    #[arg(long)]
    pub fps: Option<u32>,

    /// Seconds of audio analysed per frame
    #[arg(long)]
    pub window_seconds: Option<f64>,

    /// Distinct notes labelled per frame
    #[arg(long)]
    pub top_notes: Option<usize>,

    /// Lowest frequency shown (Hz)
    #[arg(long)]
    pub freq_min: Option<f32>,

    /// Highest frequency shown (Hz)
    #[arg(long)]
    pub freq_max: Option<f32>,

    /// Chart width before scaling
    #[arg(long)]
    pub width: Option<u32>,

    /// Chart height before scaling
    #[arg(long)]
    pub height: Option<u32>,

    /// Raster scale factor (0.5 = 960x540, 1 = 1920x1080, 2 = 3840x2160)
    #[arg(long)]
    pub scale: Option<f32>,

    /// How multi-channel audio becomes mono
    #[arg(long, value_enum)]
    pub channel_mode: Option<ChannelMode>,

    /// Which notes count as duplicates within a frame
    #[arg(long, value_enum)]
    pub dedup: Option<DedupPolicy>,

    /// H.264 CRF quality (0-51, lower = better)
    #[arg(long)]
    pub crf: Option<u32>,

    /// Render frames on all cores
    #[arg(long)]
    pub parallel: bool,

    /// Render frames only, do not run ffmpeg
    #[arg(long)]
    pub skip_video: bool,

    /// Also write the detected notes per frame as JSON
    #[arg(long)]
    pub notes_json: Option<PathBuf>,
}

impl Cli {
    pub fn apply(&self, cfg: &mut VisualizerConfig) {
        if let Some(ref input) = self.input {
            cfg.output.audio_file = input.clone();
        }
        if let Some(ref output) = self.output {
            cfg.output.video = output.clone();
        }
        if let Some(ref dir) = self.frames_dir {
            cfg.output.frames_dir = dir.clone();
        }
        if let Some(fps) = self.fps {
            cfg.analysis.fps = fps;
        }
        if let Some(seconds) = self.window_seconds {
            cfg.analysis.window_seconds = seconds;
        }
        if let Some(top) = self.top_notes {
            cfg.analysis.top_notes = top;
        }
        if let Some(min) = self.freq_min {
            cfg.display.freq_min = min;
        }
        if let Some(max) = self.freq_max {
            cfg.display.freq_max = max;
        }
        if let Some(width) = self.width {
            cfg.display.width = width;
        }
        if let Some(height) = self.height {
            cfg.display.height = height;
        }
        if let Some(scale) = self.scale {
            cfg.display.scale = scale;
        }
        if let Some(mode) = self.channel_mode {
            cfg.analysis.channel_mode = mode;
        }
        if let Some(dedup) = self.dedup {
            cfg.analysis.dedup = dedup;
        }
        if self.crf.is_some() {
            cfg.output.crf = self.crf;
        }
        if self.parallel {
            cfg.output.parallel = true;
        }
    }
}
