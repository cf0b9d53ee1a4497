use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::window::Waveform;

/// How interleaved multi-channel audio is reduced to the mono sequence we analyse.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ChannelMode {
    /// Mean of all channels per sample frame.
    #[default]
    Downmix,
    /// Channel 0 only.
    First,
}

impl ChannelMode {
    fn reduce(self, interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
        if channels <= 1 {
            out.extend_from_slice(interleaved);
            return;
        }
        match self {
            ChannelMode::Downmix => {
                for frame_samples in interleaved.chunks(channels) {
                    let mono: f32 = frame_samples.iter().sum::<f32>() / channels as f32;
                    out.push(mono);
                }
            }
            ChannelMode::First => {
                out.extend(interleaved.iter().step_by(channels).copied());
            }
        }
    }
}

pub fn decode_audio(path: &Path, channel_mode: ChannelMode) -> Result<Waveform> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open audio file: {}", path.display()))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .context("Failed to probe audio format")?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .context("No audio tracks found")?;

    let track_id = track.id;
    let channels = track.codec_params.channels.map_or(1, |c| c.count());
    let sample_rate = track.codec_params.sample_rate.context("Unknown sample rate")?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create audio decoder")?;

    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(err)) => {
                log::debug!("Skipping undecodable packet: {}", err);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        let num_frames = decoded.frames();

        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        channel_mode.reduce(sample_buf.samples(), channels, &mut samples);
    }

    if channels > 1 {
        log::info!("Reduced {} channels to mono ({:?})", channels, channel_mode);
    }

    let waveform = Waveform::new(samples, sample_rate);
    if waveform.is_empty() {
        log::warn!("No samples decoded from {}", path.display());
    }
    log::info!(
        "Decoded audio: {} samples, {}Hz, {:.1}s",
        waveform.len(),
        waveform.sample_rate(),
        waveform.duration()
    );

    Ok(waveform)
}
