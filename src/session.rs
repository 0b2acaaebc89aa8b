use crate::config::{CHUNK_FRAMES, EncoderConfig};
use crate::engine::{self, LameEngine, Mp3Engine};
use crate::error::{Error, Result};
use crate::pcm;
use crate::sink::ByteSink;

/// Observer for encoded bytes, invoked after each successful sink write.
pub type DataCallback = Box<dyn FnMut(&[u8]) + Send>;

enum State {
    Open,
    Finished,
    Failed,
}

/// One encode session: owns one engine instance, one reused output buffer,
/// and the output sink.
///
/// Lifecycle: created with an [`EncoderConfig`], zero or more [`encode`]
/// calls, exactly one [`finish`]. The first engine or sink failure latches
/// the session into a failed state; every call after that (and after
/// `finish`) returns [`Error::SessionFinished`]. The engine handle is
/// released on drop.
///
/// [`encode`]: CodecSession::encode
/// [`finish`]: CodecSession::finish
pub struct CodecSession {
    engine: Box<dyn Mp3Engine>,
    config: EncoderConfig,
    out: Vec<u8>,
    sink: Box<dyn ByteSink>,
    on_data: Option<DataCallback>,
    state: State,
}

impl CodecSession {
    /// Create a session backed by the real LAME engine.
    pub fn new(config: EncoderConfig, sink: Box<dyn ByteSink>) -> Result<Self> {
        config.validate()?;
        let engine = Box::new(LameEngine::new(&config)?);
        Ok(Self::assemble(config, engine, sink))
    }

    /// Create a session around a caller-supplied engine.
    pub fn with_engine(
        config: EncoderConfig,
        engine: Box<dyn Mp3Engine>,
        sink: Box<dyn ByteSink>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(config, engine, sink))
    }

    fn assemble(config: EncoderConfig, engine: Box<dyn Mp3Engine>, sink: Box<dyn ByteSink>) -> Self {
        Self {
            engine,
            config,
            out: Vec::with_capacity(engine::max_output_size(CHUNK_FRAMES)),
            sink,
            on_data: None,
            state: State::Open,
        }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Observe every encoded chunk in addition to writing it to the sink.
    pub fn set_on_data(&mut self, callback: DataCallback) {
        self.on_data = Some(callback);
    }

    /// Encode one batch of samples and write the output to the sink.
    ///
    /// `samples` is interleaved for stereo input. Dispatch follows the
    /// channel rules: mono duplicates the single buffer into both planar
    /// positions, interleaved stereo uses the engine's interleaved entry
    /// point, planar stereo is deinterleaved first. Returns the number of
    /// encoded bytes produced, which may be zero.
    pub fn encode(&mut self, samples: &[i16]) -> Result<usize> {
        self.ensure_open()?;

        if samples.is_empty() {
            return Ok(0);
        }

        let frames = samples.len() / self.config.channels as usize;
        self.out.clear();
        self.out.reserve(engine::max_output_size(frames));

        let result = if self.config.channels == 2 {
            if self.config.interleaved {
                self.engine
                    .encode_interleaved(&samples[..frames * 2], self.out.spare_capacity_mut())
            } else {
                let (left, right) = pcm::deinterleave(samples, frames);
                self.engine
                    .encode_planar(&left, &right, self.out.spare_capacity_mut())
            }
        } else {
            self.engine
                .encode_planar(samples, samples, self.out.spare_capacity_mut())
        };

        let produced = self.latch_failure(result)?;
        // SAFETY: the engine initialized exactly `produced` bytes of spare
        // capacity.
        unsafe { self.out.set_len(produced) };

        self.deliver(produced)?;
        Ok(produced)
    }

    /// Drain the engine's lookahead buffer, append end-of-stream tags, and
    /// flush the sink. Terminal: the session accepts no further calls.
    pub fn finish(&mut self) -> Result<usize> {
        self.ensure_open()?;

        self.out.clear();
        self.out.reserve(engine::max_output_size(0));

        let result = self.engine.flush(self.out.spare_capacity_mut());
        let produced = self.latch_failure(result)?;
        // SAFETY: the engine initialized exactly `produced` bytes of spare
        // capacity.
        unsafe { self.out.set_len(produced) };

        self.deliver(produced)?;
        let mut total = produced;

        let tags = self.engine.end_tags();
        let tags = self.latch_failure(tags)?;
        if !tags.is_empty() {
            let written = self.sink.write(&tags);
            self.latch_failure(written)?;
            if let Some(callback) = self.on_data.as_mut() {
                callback(&tags);
            }
            total += tags.len();
        }

        let flushed = self.sink.flush();
        self.latch_failure(flushed)?;

        self.state = State::Finished;
        tracing::debug!("session finished, {} tail bytes", total);
        Ok(total)
    }

    fn deliver(&mut self, produced: usize) -> Result<()> {
        if produced == 0 {
            return Ok(());
        }

        let written = self.sink.write(&self.out[..produced]);
        self.latch_failure(written)?;

        if let Some(callback) = self.on_data.as_mut() {
            callback(&self.out[..produced]);
        }

        tracing::debug!("wrote {} encoded bytes", produced);
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            State::Open => Ok(()),
            State::Finished | State::Failed => Err(Error::SessionFinished),
        }
    }

    fn latch_failure<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.state = State::Failed;
        }
        result
    }
}
