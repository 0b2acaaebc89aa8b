use std::path::{Path, PathBuf};

use crate::config::{CHUNK_FRAMES, EncoderConfig};
use crate::error::{Error, Result};
use crate::session::CodecSession;
use crate::sink::FileSink;
use crate::source::FrameSource;

/// Progress observer: fraction of total frames encoded, in `[0, 1]`.
pub type ProgressFn = Box<dyn FnMut(f32) + Send>;

/// Completion observer: total frames encoded, or the first failure.
pub type CompleteFn = Box<dyn FnOnce(Result<u64>) + Send>;

/// An [`EncoderConfig`] matching `source`'s native sample rate and channel
/// count, with default quality/ratio/layout.
pub fn config_for_source(source: &dyn FrameSource) -> EncoderConfig {
    EncoderConfig {
        sample_rate: source.sample_rate(),
        channels: source.channels(),
        ..EncoderConfig::default()
    }
}

/// Drive `source` through `session` until end of input, reporting progress
/// before each read batch.
///
/// Returns the number of frames encoded. A source reporting zero total
/// frames still gets its end-of-stream flush and completes cleanly. The
/// first read, encode, or write failure aborts the loop; partial output is
/// left on disk as-is.
pub fn encode_source<F>(
    source: &mut dyn FrameSource,
    session: &mut CodecSession,
    mut on_progress: F,
) -> Result<u64>
where
    F: FnMut(f32),
{
    let total = source.total_frames();
    let channels = session.config().channels as u64;
    let mut encoded: u64 = 0;

    loop {
        if total > 0 {
            on_progress(encoded as f32 / total as f32);
        }

        let samples = source.read_frames(CHUNK_FRAMES)?;
        if samples.is_empty() {
            session.finish()?;
            break;
        }

        session.encode(&samples)?;
        encoded += samples.len() as u64 / channels;
    }

    on_progress(1.0);
    Ok(encoded)
}

/// One-shot conversion of `source` into an MP3 file at `output`.
///
/// The whole read/encode/write loop runs on one dedicated background
/// worker; progress and the final result arrive through the callbacks, not
/// return values. There is no cancellation: a conversion runs to completion
/// or to its first failure.
pub fn convert<S>(
    mut source: S,
    output: impl AsRef<Path>,
    config: EncoderConfig,
    mut on_progress: ProgressFn,
    on_complete: CompleteFn,
) where
    S: FrameSource + 'static,
{
    let output: PathBuf = output.as_ref().to_path_buf();

    std::thread::spawn(move || {
        let result = run(&mut source, &output, config, &mut on_progress);

        match &result {
            Ok(frames) => {
                tracing::info!("converted {} frames into {:?}", frames, output);
            }
            Err(e) => {
                tracing::error!("conversion to {:?} failed: {}", output, e);
            }
        }

        on_complete(result);
    });
}

fn run(
    source: &mut dyn FrameSource,
    output: &Path,
    config: EncoderConfig,
    on_progress: &mut ProgressFn,
) -> Result<u64> {
    if source.channels() != config.channels || source.sample_rate() != config.sample_rate {
        return Err(Error::Config(format!(
            "source format {} Hz / {} ch does not match encoder config {} Hz / {} ch",
            source.sample_rate(),
            source.channels(),
            config.sample_rate,
            config.channels
        )));
    }

    let sink = FileSink::create(output)?;
    let mut session = CodecSession::new(config, Box::new(sink))?;
    encode_source(source, &mut session, |progress| on_progress(progress))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::engine::testing::{Call, FailingEngine, ScriptedEngine};
    use crate::sink::VecSink;

    /// In-memory frame source feeding a fixed interleaved sample buffer.
    struct MemorySource {
        samples: Vec<i16>,
        position: usize,
        channels: u16,
        reported_total: u64,
    }

    impl MemorySource {
        fn new(samples: Vec<i16>, channels: u16) -> Self {
            let reported_total = samples.len() as u64 / channels as u64;
            Self {
                samples,
                position: 0,
                channels,
                reported_total,
            }
        }
    }

    impl FrameSource for MemorySource {
        fn total_frames(&self) -> u64 {
            self.reported_total
        }

        fn sample_rate(&self) -> u32 {
            44_100
        }

        fn channels(&self) -> u16 {
            self.channels
        }

        fn read_frames(&mut self, max_frames: usize) -> Result<Vec<i16>> {
            let max_samples = max_frames * self.channels as usize;
            let end = (self.position + max_samples).min(self.samples.len());
            let batch = self.samples[self.position..end].to_vec();
            self.position = end;
            Ok(batch)
        }
    }

    fn scripted_session() -> (CodecSession, crate::engine::testing::CallLog) {
        let (engine, calls) = ScriptedEngine::new(8);
        let session = CodecSession::with_engine(
            EncoderConfig::default(),
            Box::new(engine),
            Box::new(VecSink::default()),
        )
        .unwrap();
        (session, calls)
    }

    #[test]
    fn test_encode_source_runs_to_completion() {
        let mut source = MemorySource::new(vec![0; 1000], 2);
        let (mut session, calls) = scripted_session();

        let mut progress = Vec::new();
        let encoded = encode_source(&mut source, &mut session, |p| progress.push(p)).unwrap();

        assert_eq!(encoded, 500);
        let calls = calls.lock().unwrap();
        assert!(calls.iter().any(|c| matches!(c, Call::Interleaved(_))));
        assert_eq!(calls.iter().filter(|c| matches!(c, Call::Flush)).count(), 1);

        assert!(progress.iter().all(|p| (0.0..=1.0).contains(p) && p.is_finite()));
        assert_eq!(*progress.last().unwrap(), 1.0);
    }

    #[test]
    fn test_zero_frame_source_still_flushes_and_succeeds() {
        let mut source = MemorySource::new(Vec::new(), 2);
        let (mut session, calls) = scripted_session();

        let mut progress = Vec::new();
        let encoded = encode_source(&mut source, &mut session, |p| progress.push(p)).unwrap();

        assert_eq!(encoded, 0);
        assert!(calls.lock().unwrap().contains(&Call::Flush));
        // No divide-by-zero artifacts in progress values.
        assert!(progress.iter().all(|p| p.is_finite()));
        assert_eq!(progress, vec![1.0]);
    }

    #[test]
    fn test_engine_failure_aborts_pipeline() {
        let mut source = MemorySource::new(vec![0; 1000], 2);
        let mut session = CodecSession::with_engine(
            EncoderConfig::default(),
            Box::new(FailingEngine),
            Box::new(VecSink::default()),
        )
        .unwrap();

        let result = encode_source(&mut source, &mut session, |_| {});
        assert!(matches!(result, Err(Error::Encode(_))));
    }

    #[test]
    fn test_convert_reports_completion_via_callback() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.mp3");

        let source = MemorySource::new(vec![0; 400], 2);
        let config = config_for_source(&source);

        let (tx, rx) = std::sync::mpsc::channel();
        let progress = Arc::new(Mutex::new(Vec::new()));

        convert(
            source,
            &output,
            config,
            Box::new({
                let progress = progress.clone();
                move |p| progress.lock().unwrap().push(p)
            }),
            Box::new(move |result| {
                tx.send(result).unwrap();
            }),
        );

        let result = rx.recv().unwrap();
        assert_eq!(result.unwrap(), 200);
        assert!(output.exists());
        assert_eq!(*progress.lock().unwrap().last().unwrap(), 1.0);
    }

    #[test]
    fn test_convert_rejects_mismatched_source_format() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.mp3");

        let source = MemorySource::new(vec![0; 100], 1);
        let config = EncoderConfig::default(); // stereo

        let (tx, rx) = std::sync::mpsc::channel();
        convert(
            source,
            &output,
            config,
            Box::new(|_| {}),
            Box::new(move |result| {
                tx.send(result).unwrap();
            }),
        );

        assert!(matches!(rx.recv().unwrap(), Err(Error::Config(_))));
    }
}
