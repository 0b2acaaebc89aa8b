use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of PCM frames handed to the engine per encode call.
///
/// The streaming chunk size (`chunk_bytes`) and the one-shot read batch are
/// both derived from this.
pub const CHUNK_FRAMES: usize = 8192;

// NOTE: The whole pipeline assumes 16-bit signed integer PCM. The streaming
// path rejects anything else at session creation; the container path converts
// on read (see source::WavSource).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EncoderConfig {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_channels")]
    pub channels: u16,

    #[serde(default = "default_bits")]
    pub bits_per_sample: u16,

    /// Algorithm quality, 0 (best, slowest) to 9 (worst, fastest).
    #[serde(default)]
    pub quality: u8,

    /// Target compression factor relative to the raw PCM bit rate.
    #[serde(default = "default_ratio")]
    pub ratio: f32,

    /// Stereo sample layout pushed by the producer: interleaved L/R pairs or
    /// two contiguous planar blocks. Ignored for mono.
    #[serde(default = "default_interleaved")]
    pub interleaved: bool,
}

fn default_sample_rate() -> u32 {
    44_100
}

fn default_channels() -> u16 {
    2
}

fn default_bits() -> u16 {
    EncoderConfig::SUPPORTED_BITS
}

fn default_ratio() -> f32 {
    8.0
}

fn default_interleaved() -> bool {
    true
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            bits_per_sample: default_bits(),
            quality: 0,
            ratio: default_ratio(),
            interleaved: default_interleaved(),
        }
    }
}

impl EncoderConfig {
    pub const SUPPORTED_BITS: u16 = 16;

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::Config("sample_rate must be positive".into()));
        }

        if !(1..=2).contains(&self.channels) {
            return Err(Error::Config(format!(
                "channels must be 1 or 2, got {}",
                self.channels
            )));
        }

        if self.bits_per_sample != Self::SUPPORTED_BITS {
            return Err(Error::Config(format!(
                "only {}-bit PCM is supported, got {}-bit",
                Self::SUPPORTED_BITS,
                self.bits_per_sample
            )));
        }

        if self.quality > 9 {
            return Err(Error::Config(format!(
                "quality must be 0-9, got {}",
                self.quality
            )));
        }

        if self.ratio <= 0.0 {
            return Err(Error::Config(format!(
                "ratio must be positive, got {}",
                self.ratio
            )));
        }

        Ok(())
    }

    pub fn bytes_per_frame(&self) -> usize {
        self.channels as usize * (Self::SUPPORTED_BITS as usize / 8)
    }

    /// PCM byte count of one encode-sized chunk on the streaming path.
    pub fn chunk_bytes(&self) -> usize {
        CHUNK_FRAMES * self.bytes_per_frame()
    }

    /// CBR bitrate equivalent to the configured compression ratio, before
    /// snapping to a supported LAME step.
    pub fn bitrate_kbps(&self) -> u32 {
        let raw_bps = self.sample_rate as f32 * self.channels as f32 * Self::SUPPORTED_BITS as f32;
        (raw_bps / self.ratio / 1000.0).round() as u32
    }
}
