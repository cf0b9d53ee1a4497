use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Magnitude per frequency-grid bin for one analysis window.
#[derive(Clone, Debug, PartialEq)]
pub struct Spectrum {
    pub magnitudes: Vec<f32>,
}

impl Spectrum {
    pub fn peak(&self) -> f32 {
        self.magnitudes.iter().copied().fold(0.0f32, f32::max)
    }

    /// Divide every bin by `constant`. A non-positive constant only occurs
    /// for a silent clip, where the result is all zeros.
    pub fn normalized(&self, constant: f32) -> Spectrum {
        if !(constant > 0.0) || !constant.is_finite() {
            return Spectrum {
                magnitudes: vec![0.0; self.magnitudes.len()],
            };
        }
        Spectrum {
            magnitudes: self.magnitudes.iter().map(|m| m / constant).collect(),
        }
    }
}

/// Hann-windowed one-sided FFT over windows of a fixed length.
///
/// Built once per run; the frequency grid depends only on the window length
/// and sample rate, so every frame shares it.
pub struct SpectralAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    grid: Vec<f32>,
}

impl SpectralAnalyzer {
    pub fn new(window_len: usize, sample_rate: u32) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(window_len);
        let resolution = sample_rate as f32 / window_len as f32;
        let grid = (0..=window_len / 2).map(|k| k as f32 * resolution).collect();

        Self {
            fft,
            window: hann_window(window_len),
            grid,
        }
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Bin centre frequencies in Hz, `window_len / 2 + 1` entries.
    pub fn frequency_grid(&self) -> &[f32] {
        &self.grid
    }

    pub fn analyze(&self, samples: &[f32]) -> Spectrum {
        debug_assert_eq!(samples.len(), self.window.len());

        let mut buffer: Vec<Complex<f32>> = samples
            .iter()
            .zip(self.window.iter())
            .map(|(&s, &w)| Complex::new(s * w, 0.0))
            .collect();
        buffer.resize(self.window.len(), Complex::new(0.0, 0.0));
        self.fft.process(&mut buffer);

        Spectrum {
            magnitudes: buffer[..self.grid.len()].iter().map(|c| c.norm()).collect(),
        }
    }
}

fn hann_window(size: usize) -> Vec<f32> {
    if size < 2 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| {
            0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos())
        })
        .collect()
}
