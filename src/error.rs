use thiserror::Error;

/// Failures the pipeline distinguishes. Everything else travels as `anyhow::Error`.
#[derive(Debug, Error)]
pub enum VisualizerError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(
        "waveform too short: {samples} samples at {sample_rate}Hz yields no frames at {fps}fps"
    )]
    TooShort {
        samples: usize,
        sample_rate: u32,
        fps: u32,
    },

    #[error("failed to render frame {index}")]
    Render {
        index: usize,
        #[source]
        source: anyhow::Error,
    },
}
