use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::audio::analysis::{analyze_frame, global_peak, FrameNotes};
use crate::audio::notes::NoteSettings;
use crate::audio::spectrum::SpectralAnalyzer;
use crate::audio::window::{FrameTiming, Waveform};
use crate::config::VisualizerConfig;
use crate::encode::ffmpeg::{EncodeJob, VideoEncoder};
use crate::error::VisualizerError;
use crate::render::chart::ChartRenderer;
use crate::store::{ClearSummary, FrameStore};

/// What one run produced.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub sample_rate: u32,
    pub fps: u32,
    pub frame_count: usize,
    pub frame_offset: usize,
    pub window_len: usize,
    /// Pass-1 maximum every frame was divided by.
    pub normalization: f32,
    pub cleared: ClearSummary,
    /// `None` when muxing was skipped or failed; the frames remain usable.
    pub video: Option<PathBuf>,
    pub frames: Vec<FrameNotes>,
}

/// Two-pass waveform-to-video transform.
pub struct Pipeline<'a> {
    config: &'a VisualizerConfig,
    renderer: ChartRenderer,
    show_progress: bool,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a VisualizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            renderer: ChartRenderer::new(config)?,
            show_progress: true,
        })
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Analyse `waveform`, render every frame into `store`, then mux with
    /// `encoder` (skipped when `None`). The video goes to `output.video`.
    pub fn run(
        &self,
        waveform: &Waveform,
        audio_path: &Path,
        store: &dyn FrameStore,
        encoder: Option<&dyn VideoEncoder>,
    ) -> Result<RunReport> {
        let analysis = &self.config.analysis;
        let timing = FrameTiming::new(waveform, analysis.fps, analysis.window_seconds)?;
        let analyzer = SpectralAnalyzer::new(timing.window_len, waveform.sample_rate());

        log::info!(
            "Frames: {}, offset: {} samples, window: {} samples ({} bins)",
            timing.frame_count,
            timing.frame_offset,
            analyzer.window_len(),
            analyzer.frequency_grid().len()
        );

        log::info!("Pass 1: global normalization...");
        let normalization = global_peak(waveform, &timing, &analyzer);

        let cleared = store.clear();
        if cleared.failed > 0 {
            log::warn!("{} stale entries could not be deleted", cleared.failed);
        }

        let (width, height) = self.renderer.dimensions();
        log::info!("Pass 2: rendering {} frames at {}x{}...", timing.frame_count, width, height);
        log::debug!("Plot area: {:?}", self.renderer.plot_area());
        let frames = self.render_frames(waveform, &timing, &analyzer, normalization, store)?;

        let video = match encoder {
            Some(encoder) => {
                let job = EncodeJob {
                    fps: analysis.fps,
                    frame_pattern: store.frame_pattern(),
                    frame_count: timing.frame_count,
                    audio_path: audio_path.to_path_buf(),
                    output_path: self.config.output.video.clone(),
                };
                assemble(encoder, &job)
            }
            None => {
                log::info!("Skipping video assembly");
                None
            }
        };

        Ok(RunReport {
            sample_rate: waveform.sample_rate(),
            fps: analysis.fps,
            frame_count: timing.frame_count,
            frame_offset: timing.frame_offset,
            window_len: timing.window_len,
            normalization,
            cleared,
            video,
            frames,
        })
    }

    fn render_frames(
        &self,
        waveform: &Waveform,
        timing: &FrameTiming,
        analyzer: &SpectralAnalyzer,
        normalization: f32,
        store: &dyn FrameStore,
    ) -> Result<Vec<FrameNotes>> {
        let analysis = &self.config.analysis;
        let settings = NoteSettings {
            top: analysis.top_notes,
            silence_floor: analysis.silence_floor,
            dedup: analysis.dedup,
            names: &analysis.note_names,
        };

        let pb = if self.show_progress {
            let pb = ProgressBar::new(timing.frame_count as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")?
                    .progress_chars("=>-"),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let render_one = |index: usize| -> Result<FrameNotes> {
            let frame = analyze_frame(waveform, timing, analyzer, normalization, &settings, index);
            let image = self
                .renderer
                .render(&frame.spectrum, analyzer.frequency_grid(), &frame.notes);
            store
                .write_frame(index, &image)
                .map_err(|source| VisualizerError::Render { index, source })?;
            pb.inc(1);
            Ok(FrameNotes::from(&frame))
        };

        let frames = if self.config.output.parallel {
            (0..timing.frame_count)
                .into_par_iter()
                .map(render_one)
                .collect::<Result<Vec<_>>>()?
        } else {
            (0..timing.frame_count)
                .map(render_one)
                .collect::<Result<Vec<_>>>()?
        };

        pb.finish_with_message("Rendering complete");
        Ok(frames)
    }
}

/// Encoder failures are reported, never propagated: the frames are already on disk.
fn assemble(encoder: &dyn VideoEncoder, job: &EncodeJob) -> Option<PathBuf> {
    log::info!("Assembling video: {} frames @ {}fps", job.frame_count, job.fps);
    match encoder.encode(job) {
        Ok(outcome) if outcome.success() => {
            log::debug!("FFmpeg output: {}", outcome.stdout);
            log::debug!("FFmpeg diagnostics: {}", outcome.stderr);
            log::info!("Video written to {}", job.output_path.display());
            Some(job.output_path.clone())
        }
        Ok(outcome) => {
            match outcome.status {
                Some(code) => log::error!("FFmpeg exited with status {}", code),
                None => log::error!("FFmpeg was terminated by a signal"),
            }
            log::error!("FFmpeg error output:\n{}", outcome.stderr);
            None
        }
        Err(err) => {
            log::error!("Error running FFmpeg: {:#}", err);
            None
        }
    }
}
