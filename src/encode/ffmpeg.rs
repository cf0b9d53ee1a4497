use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::config::OutputConfig;

/// Everything the encoder needs to mux one run.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodeJob {
    pub fps: u32,
    /// printf-style pattern over zero-based frame indices.
    pub frame_pattern: PathBuf,
    pub frame_count: usize,
    pub audio_path: PathBuf,
    pub output_path: PathBuf,
}

impl EncodeJob {
    /// The frames in playback order.
    pub fn frame_paths(&self) -> Vec<PathBuf> {
        // only the file name is a pattern; the directory is taken literally
        let dir = self.frame_pattern.parent().unwrap_or(Path::new(""));
        let name = self
            .frame_pattern
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        (0..self.frame_count)
            .map(|i| dir.join(name.replace("%d", &i.to_string())))
            .collect()
    }
}

/// Exit status and captured streams of one encoder run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EncodeOutcome {
    /// `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl EncodeOutcome {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

pub trait VideoEncoder {
    /// Blocks until the encoder exits. `Err` only when it could not be started.
    fn encode(&self, job: &EncodeJob) -> Result<EncodeOutcome>;
}

/// Muxes a PNG sequence with the source audio by running `ffmpeg` once.
pub struct FfmpegEncoder {
    binary: String,
    codec: String,
    pix_fmt: String,
    crf: Option<u32>,
    audio_codec: String,
    audio_bitrate: String,
}

impl FfmpegEncoder {
    pub fn new(output: &OutputConfig) -> Self {
        Self {
            binary: output.ffmpeg.clone(),
            codec: output.codec.clone(),
            pix_fmt: output.pix_fmt.clone(),
            crf: output.crf,
            audio_codec: output.audio_codec.clone(),
            audio_bitrate: output.audio_bitrate.clone(),
        }
    }

    pub fn args(&self, job: &EncodeJob) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-framerate".into(), job.fps.to_string(),
            "-f".into(), "image2".into(),
            "-start_number".into(), "0".into(),
            "-i".into(), path_arg(&job.frame_pattern),
            "-i".into(), path_arg(&job.audio_path),
            "-c:v".into(), self.codec.clone(),
            "-pix_fmt".into(), self.pix_fmt.clone(),
        ];

        if let Some(crf) = self.crf {
            args.extend(["-crf".to_string(), crf.to_string()]);
        }

        args.extend([
            "-c:a".into(), self.audio_codec.clone(),
            "-b:a".into(), self.audio_bitrate.clone(),
            path_arg(&job.output_path),
        ]);

        args
    }
}

impl VideoEncoder for FfmpegEncoder {
    fn encode(&self, job: &EncodeJob) -> Result<EncodeOutcome> {
        if let Some(parent) = job.output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        // image2 stops at the first gap, so a missing frame would silently truncate the video
        if let Some(missing) = job.frame_paths().into_iter().find(|p| !p.exists()) {
            anyhow::bail!("Frame sequence is incomplete: {} is missing", missing.display());
        }

        let args = self.args(job);
        log::info!("Running {} {}", self.binary, args.join(" "));

        let output = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("Failed to spawn {}. Is ffmpeg installed?", self.binary))?;

        Ok(EncodeOutcome {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Records jobs instead of running anything.
#[cfg(test)]
pub struct StubEncoder {
    pub outcome: EncodeOutcome,
    pub jobs: std::sync::Mutex<Vec<EncodeJob>>,
}

#[cfg(test)]
impl StubEncoder {
    pub fn succeeding() -> Self {
        Self::with_outcome(EncodeOutcome {
            status: Some(0),
            ..Default::default()
        })
    }

    pub fn with_outcome(outcome: EncodeOutcome) -> Self {
        Self {
            outcome,
            jobs: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[cfg(test)]
impl VideoEncoder for StubEncoder {
    fn encode(&self, job: &EncodeJob) -> Result<EncodeOutcome> {
        self.jobs.lock().unwrap().push(job.clone());
        Ok(self.outcome.clone())
    }
}
