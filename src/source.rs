use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec};

use crate::error::{Error, Result};
use crate::pcm;

/// A decoded-audio source that yields interleaved 16-bit frames until end of
/// input.
///
/// The one-shot conversion driver is generic over this boundary, so the
/// container-backed and raw-file-backed paths share one encode loop.
pub trait FrameSource: Send {
    /// Total frames the source will deliver. Advisory, used for progress.
    fn total_frames(&self) -> u64;

    fn sample_rate(&self) -> u32;

    fn channels(&self) -> u16;

    /// Read up to `max_frames` frames. May return fewer than asked; an
    /// empty vec signals end of input.
    fn read_frames(&mut self, max_frames: usize) -> Result<Vec<i16>>;
}

/// WAV container source backed by hound.
///
/// Non-16-bit sources are reconciled to 16-bit signed on read: 8-bit int is
/// shifted up, 24/32-bit int shifted down, 32-bit float scaled and clamped.
/// Sample rate and channel count pass through unchanged.
pub struct WavSource {
    reader: WavReader<BufReader<File>>,
    spec: WavSpec,
    total_frames: u64,
}

impl WavSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let reader = WavReader::open(path).map_err(|e| Error::SourceOpen {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let spec = reader.spec();
        if spec.channels == 0 || spec.channels > 2 {
            return Err(Error::Config(format!(
                "unsupported channel count {} in {:?}",
                spec.channels, path
            )));
        }

        let total_frames = u64::from(reader.duration());
        Ok(Self {
            reader,
            spec,
            total_frames,
        })
    }
}

impl FrameSource for WavSource {
    fn total_frames(&self) -> u64 {
        self.total_frames
    }

    fn sample_rate(&self) -> u32 {
        self.spec.sample_rate
    }

    fn channels(&self) -> u16 {
        self.spec.channels
    }

    fn read_frames(&mut self, max_frames: usize) -> Result<Vec<i16>> {
        let max_samples = max_frames * self.spec.channels as usize;
        let mut samples = Vec::with_capacity(max_samples);

        match (self.spec.sample_format, self.spec.bits_per_sample) {
            (SampleFormat::Int, 16) => {
                for sample in self.reader.samples::<i16>().take(max_samples) {
                    samples.push(sample.map_err(|e| Error::SourceRead(e.to_string()))?);
                }
            }
            (SampleFormat::Int, bits) if bits < 16 => {
                let shift = 16 - bits;
                for sample in self.reader.samples::<i32>().take(max_samples) {
                    let value = sample.map_err(|e| Error::SourceRead(e.to_string()))?;
                    samples.push((value << shift) as i16);
                }
            }
            (SampleFormat::Int, bits) => {
                let shift = bits - 16;
                for sample in self.reader.samples::<i32>().take(max_samples) {
                    let value = sample.map_err(|e| Error::SourceRead(e.to_string()))?;
                    samples.push((value >> shift) as i16);
                }
            }
            (SampleFormat::Float, _) => {
                for sample in self.reader.samples::<f32>().take(max_samples) {
                    let value = sample.map_err(|e| Error::SourceRead(e.to_string()))?;
                    samples.push((value.clamp(-1.0, 1.0) * i16::MAX as f32) as i16);
                }
            }
        }

        Ok(samples)
    }
}

/// Headerless 16-bit little-endian PCM file source.
///
/// `offset` bytes are skipped up front, for inputs carrying a fixed
/// container header in front of the raw sample data.
pub struct RawPcmSource {
    reader: BufReader<File>,
    sample_rate: u32,
    channels: u16,
    total_frames: u64,
}

impl RawPcmSource {
    pub fn open(path: impl AsRef<Path>, sample_rate: u32, channels: u16) -> Result<Self> {
        Self::open_with_offset(path, sample_rate, channels, 0)
    }

    pub fn open_with_offset(
        path: impl AsRef<Path>,
        sample_rate: u32,
        channels: u16,
        offset: u64,
    ) -> Result<Self> {
        let path = path.as_ref();

        if !(1..=2).contains(&channels) {
            return Err(Error::Config(format!(
                "channels must be 1 or 2, got {}",
                channels
            )));
        }

        let open = |e: std::io::Error| Error::SourceOpen {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        let mut file = File::open(path).map_err(open)?;
        let len = file.metadata().map_err(open)?.len();
        if offset > 0 {
            file.seek(SeekFrom::Start(offset)).map_err(open)?;
        }

        let bytes_per_frame = u64::from(channels) * 2;
        let total_frames = len.saturating_sub(offset) / bytes_per_frame;

        Ok(Self {
            reader: BufReader::new(file),
            sample_rate,
            channels,
            total_frames,
        })
    }
}

impl FrameSource for RawPcmSource {
    fn total_frames(&self) -> u64 {
        self.total_frames
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn read_frames(&mut self, max_frames: usize) -> Result<Vec<i16>> {
        let bytes_per_frame = self.channels as usize * 2;
        let mut buf = vec![0u8; max_frames * bytes_per_frame];

        let mut filled = 0;
        while filled < buf.len() {
            let n = self
                .reader
                .read(&mut buf[filled..])
                .map_err(|e| Error::SourceRead(e.to_string()))?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        // Drop a trailing sub-frame tail so the batch is frame-aligned.
        buf.truncate(filled - filled % bytes_per_frame);
        Ok(pcm::samples_from_bytes(&buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, spec: WavSpec, frames: usize) {
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames * spec.channels as usize {
            match (spec.sample_format, spec.bits_per_sample) {
                (SampleFormat::Int, 16) => writer.write_sample((i % 100) as i16).unwrap(),
                (SampleFormat::Int, 24) => writer.write_sample(((i % 100) << 8) as i32).unwrap(),
                (SampleFormat::Float, _) => writer.write_sample(i as f32 / 1000.0).unwrap(),
                _ => unreachable!(),
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_wav_source_reads_16_bit_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        write_wav(&path, spec, 10);

        let mut source = WavSource::open(&path).unwrap();
        assert_eq!(source.total_frames(), 10);
        assert_eq!(source.sample_rate(), 44_100);
        assert_eq!(source.channels(), 2);

        let samples = source.read_frames(6).unwrap();
        assert_eq!(samples.len(), 12);
        assert_eq!(samples[0], 0);
        assert_eq!(samples[11], 11);

        let rest = source.read_frames(100).unwrap();
        assert_eq!(rest.len(), 8);

        assert!(source.read_frames(100).unwrap().is_empty());
    }

    #[test]
    fn test_wav_source_converts_24_bit_to_16_bit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 22_050,
            bits_per_sample: 24,
            sample_format: SampleFormat::Int,
        };
        write_wav(&path, spec, 4);

        let mut source = WavSource::open(&path).unwrap();
        let samples = source.read_frames(4).unwrap();
        // 24-bit values were written shifted up by 8, so they come back
        // exact after the shift down.
        assert_eq!(samples, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_wav_source_rejects_surround() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quad.wav");
        let spec = WavSpec {
            channels: 4,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        write_wav(&path, spec, 2);

        assert!(matches!(WavSource::open(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_wav_source_missing_file() {
        let result = WavSource::open("/nonexistent/input.wav");
        assert!(matches!(result, Err(Error::SourceOpen { .. })));
    }

    #[test]
    fn test_raw_pcm_source_reads_frames_and_skips_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio.pcm");

        // 4 header bytes, then 3 stereo frames of LE samples.
        let mut bytes = vec![0xDE, 0xAD, 0xBE, 0xEF];
        for value in [1i16, -1, 2, -2, 3, -3] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        std::fs::write(&path, &bytes).unwrap();

        let mut source = RawPcmSource::open_with_offset(&path, 44_100, 2, 4).unwrap();
        assert_eq!(source.total_frames(), 3);

        let samples = source.read_frames(2).unwrap();
        assert_eq!(samples, vec![1, -1, 2, -2]);

        let samples = source.read_frames(2).unwrap();
        assert_eq!(samples, vec![3, -3]);

        assert!(source.read_frames(2).unwrap().is_empty());
    }

    #[test]
    fn test_raw_pcm_source_rejects_bad_channels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio.pcm");
        std::fs::write(&path, [0u8; 8]).unwrap();

        assert!(matches!(
            RawPcmSource::open(&path, 44_100, 5),
            Err(Error::Config(_))
        ));
    }
}
