use crate::error::VisualizerError;

/// Decoded mono audio. Immutable once constructed.
#[derive(Clone, Debug)]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// How a waveform is cut into video frames and analysis windows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameTiming {
    pub frame_count: usize,
    /// Samples advanced between consecutive frames.
    pub frame_offset: usize,
    /// Samples per analysis window (W).
    pub window_len: usize,
    pub fps: u32,
}

impl FrameTiming {
    pub fn new(
        waveform: &Waveform,
        fps: u32,
        window_seconds: f64,
    ) -> Result<Self, VisualizerError> {
        let sample_rate = waveform.sample_rate();
        if sample_rate == 0 || fps == 0 {
            return Err(VisualizerError::Config(format!(
                "sample rate ({}) and fps ({}) must be positive",
                sample_rate, fps
            )));
        }

        // floor(duration * fps) without going through floating point
        let total = waveform.len() as u64;
        let frame_count = (total * fps as u64 / sample_rate as u64) as usize;
        if frame_count == 0 {
            return Err(VisualizerError::TooShort {
                samples: waveform.len(),
                sample_rate,
                fps,
            });
        }

        let frame_offset = waveform.len() / frame_count;
        let window_len = (sample_rate as f64 * window_seconds).floor() as usize;
        if window_len < 2 {
            return Err(VisualizerError::Config(format!(
                "analysis window of {}s at {}Hz holds fewer than 2 samples",
                window_seconds, sample_rate
            )));
        }

        Ok(Self {
            frame_count,
            frame_offset,
            window_len,
            fps,
        })
    }

    /// Presentation time of a frame in seconds.
    pub fn frame_time(&self, index: usize) -> f32 {
        index as f32 / self.fps as f32
    }
}

/// Slice of `window_len` samples ending at `index * frame_offset`, left-padded with zeros.
pub fn extract_window(samples: &[f32], index: usize, timing: &FrameTiming) -> Vec<f32> {
    let w = timing.window_len;
    let end = (index * timing.frame_offset).min(samples.len());

    if end == 0 {
        return vec![0.0; w];
    }

    if end < w {
        let mut window = vec![0.0; w - end];
        window.extend_from_slice(&samples[..end]);
        window
    } else {
        samples[end - w..end].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize, sample_rate: u32) -> Waveform {
        Waveform::new((1..=len).map(|i| i as f32).collect(), sample_rate)
    }

    #[test]
    fn timing_follows_duration_and_fps() {
        let wf = Waveform::new(vec![0.0; 32000], 16000);
        let timing = FrameTiming::new(&wf, 10, 0.25).unwrap();
        assert_eq!(timing.frame_count, 20);
        assert_eq!(timing.frame_offset, 1600);
        assert_eq!(timing.window_len, 4000);
        assert!((timing.frame_time(5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn frames_never_overrun_the_waveform() {
        for &(len, sr, fps) in &[
            (32000usize, 16000u32, 30u32),
            (44100 * 3 + 17, 44100, 24),
            (12345, 8000, 7),
            (1001, 1000, 60),
        ] {
            let wf = Waveform::new(vec![0.0; len], sr);
            let timing = FrameTiming::new(&wf, fps, 0.01).unwrap();
            let expected = (len as f64 / sr as f64 * fps as f64).floor() as usize;
            assert_eq!(timing.frame_count, expected, "len={} sr={} fps={}", len, sr, fps);
            assert!(timing.frame_count * timing.frame_offset <= len);
        }
    }

    #[test]
    fn window_len_floors_the_exact_product() {
        for &(sr, seconds, expected) in &[
            (44100u32, 0.59f64, 26019usize),
            (16000, 0.251, 4016),
            (48000, 0.083, 3984),
            (44100, 0.25, 11025),
        ] {
            let wf = Waveform::new(vec![0.0; sr as usize * 2], sr);
            let timing = FrameTiming::new(&wf, 30, seconds).unwrap();
            assert_eq!(timing.window_len, expected, "sr={} seconds={}", sr, seconds);
        }
    }

    #[test]
    fn too_short_clip_is_rejected() {
        let wf = Waveform::new(vec![0.0; 100], 16000);
        let err = FrameTiming::new(&wf, 30, 0.25).unwrap_err();
        assert!(matches!(err, VisualizerError::TooShort { .. }));
    }

    #[test]
    fn tiny_window_is_rejected() {
        let wf = Waveform::new(vec![0.0; 16000], 16000);
        assert!(FrameTiming::new(&wf, 10, 0.00001).is_err());
    }

    #[test]
    fn first_frame_is_all_zeros() {
        let wf = ramp(32000, 16000);
        let timing = FrameTiming::new(&wf, 10, 0.25).unwrap();
        let window = extract_window(wf.samples(), 0, &timing);
        assert_eq!(window.len(), timing.window_len);
        assert!(window.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn early_frames_are_left_padded() {
        let wf = ramp(32000, 16000);
        let timing = FrameTiming::new(&wf, 10, 0.25).unwrap();
        // end = 1600, W = 4000
        let window = extract_window(wf.samples(), 1, &timing);
        assert_eq!(window.len(), 4000);
        assert!(window[..2400].iter().all(|&s| s == 0.0));
        assert_eq!(window[2400], 1.0);
        assert_eq!(window[3999], 1600.0);
    }

    #[test]
    fn later_frames_are_plain_slices() {
        let wf = ramp(32000, 16000);
        let timing = FrameTiming::new(&wf, 10, 0.25).unwrap();
        // end = 8000
        let window = extract_window(wf.samples(), 5, &timing);
        assert_eq!(window.len(), 4000);
        assert_eq!(window[0], 4001.0);
        assert_eq!(window[3999], 8000.0);
    }

    #[test]
    fn out_of_range_index_still_has_window_length() {
        let wf = ramp(32000, 16000);
        let timing = FrameTiming::new(&wf, 10, 0.25).unwrap();
        let window = extract_window(wf.samples(), 500, &timing);
        assert_eq!(window.len(), 4000);
        assert_eq!(window[3999], 32000.0);
    }
}
