use std::mem::MaybeUninit;

use mp3lame_encoder::{
    Bitrate, Builder, DualPcm, Encoder, FlushNoGap, InterleavedPcm, MonoPcm, Quality,
};

use crate::config::EncoderConfig;
use crate::error::{Error, Result};

/// Contract for the opaque, stateful MP3 encoder engine.
///
/// One engine instance belongs to exactly one [`CodecSession`] and is only
/// ever driven from that session's worker. Implementations write encoded
/// bytes into `out` and return the number of valid bytes, which may be zero
/// while the engine is filling its lookahead buffer. Engine failures must be
/// surfaced as [`Error::Encode`], never swallowed.
///
/// [`CodecSession`]: crate::session::CodecSession
pub trait Mp3Engine: Send {
    /// Encode one buffer of interleaved L/R/L/R samples.
    fn encode_interleaved(
        &mut self,
        samples: &[i16],
        out: &mut [MaybeUninit<u8>],
    ) -> Result<usize>;

    /// Encode two planar channel buffers of equal length. Mono callers pass
    /// the same buffer in both positions.
    fn encode_planar(
        &mut self,
        left: &[i16],
        right: &[i16],
        out: &mut [MaybeUninit<u8>],
    ) -> Result<usize>;

    /// Drain the engine's internal lookahead/delay buffer. Called exactly
    /// once, after the last encode.
    fn flush(&mut self, out: &mut [MaybeUninit<u8>]) -> Result<usize>;

    /// End-of-stream metadata bytes to append after the flush output. May be
    /// empty.
    fn end_tags(&mut self) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }
}

/// Worst-case encoded output size for one batch of `frames` frames.
pub fn max_output_size(frames: usize) -> usize {
    mp3lame_encoder::max_required_buffer_size(frames)
}

/// LAME-backed engine via the `mp3lame_encoder` crate.
///
/// Output is CBR at the bitrate derived from the configured compression
/// ratio, so players recover the duration from the file size and no
/// end-of-stream tag rewrite is needed; `end_tags` stays empty.
pub struct LameEngine {
    encoder: Encoder,
    channels: u16,
}

// The encoder handle is only ever driven from its session's single worker
// thread.
unsafe impl Send for LameEngine {}

impl LameEngine {
    pub fn new(config: &EncoderConfig) -> Result<Self> {
        let mut builder = Builder::new()
            .ok_or_else(|| Error::EngineInit("failed to create LAME builder".into()))?;

        builder
            .set_sample_rate(config.sample_rate)
            .map_err(|e| Error::EngineInit(format!("set_sample_rate: {:?}", e)))?;
        builder
            .set_num_channels(config.channels as u8)
            .map_err(|e| Error::EngineInit(format!("set_num_channels: {:?}", e)))?;
        builder
            .set_quality(map_quality(config.quality))
            .map_err(|e| Error::EngineInit(format!("set_quality: {:?}", e)))?;
        builder
            .set_brate(nearest_bitrate(config.bitrate_kbps()))
            .map_err(|e| Error::EngineInit(format!("set_brate: {:?}", e)))?;

        let encoder = builder
            .build()
            .map_err(|e| Error::EngineInit(format!("build: {:?}", e)))?;

        Ok(Self {
            encoder,
            channels: config.channels,
        })
    }
}

impl Mp3Engine for LameEngine {
    fn encode_interleaved(
        &mut self,
        samples: &[i16],
        out: &mut [MaybeUninit<u8>],
    ) -> Result<usize> {
        self.encoder
            .encode(InterleavedPcm(samples), out)
            .map_err(|e| Error::Encode(format!("interleaved encode: {:?}", e)))
    }

    fn encode_planar(
        &mut self,
        left: &[i16],
        right: &[i16],
        out: &mut [MaybeUninit<u8>],
    ) -> Result<usize> {
        if self.channels == 1 {
            self.encoder
                .encode(MonoPcm(left), out)
                .map_err(|e| Error::Encode(format!("mono encode: {:?}", e)))
        } else {
            self.encoder
                .encode(DualPcm { left, right }, out)
                .map_err(|e| Error::Encode(format!("planar encode: {:?}", e)))
        }
    }

    fn flush(&mut self, out: &mut [MaybeUninit<u8>]) -> Result<usize> {
        self.encoder
            .flush::<FlushNoGap>(out)
            .map_err(|e| Error::Encode(format!("flush: {:?}", e)))
    }
}

fn map_quality(quality: u8) -> Quality {
    match quality {
        0 => Quality::Best,
        1 => Quality::SecondBest,
        2 => Quality::NearBest,
        3 => Quality::VeryNice,
        4 => Quality::Nice,
        5 => Quality::Good,
        6 => Quality::Decent,
        7 => Quality::Ok,
        8 => Quality::SecondWorst,
        _ => Quality::Worst,
    }
}

/// Snap a computed bitrate to the nearest step LAME supports.
fn nearest_bitrate(kbps: u32) -> Bitrate {
    match kbps {
        0..=8 => Bitrate::Kbps8,
        9..=16 => Bitrate::Kbps16,
        17..=24 => Bitrate::Kbps24,
        25..=32 => Bitrate::Kbps32,
        33..=40 => Bitrate::Kbps40,
        41..=48 => Bitrate::Kbps48,
        49..=64 => Bitrate::Kbps64,
        65..=80 => Bitrate::Kbps80,
        81..=96 => Bitrate::Kbps96,
        97..=112 => Bitrate::Kbps112,
        113..=128 => Bitrate::Kbps128,
        129..=160 => Bitrate::Kbps160,
        161..=192 => Bitrate::Kbps192,
        193..=224 => Bitrate::Kbps224,
        225..=256 => Bitrate::Kbps256,
        _ => Bitrate::Kbps320,
    }
}
