use std::path::Path;

use tokio::sync::{mpsc, oneshot};

use crate::accumulator::FrameAccumulator;
use crate::config::EncoderConfig;
use crate::error::{Error, Result};
use crate::pcm;
use crate::session::CodecSession;
use crate::sink::FileSink;

enum Command {
    Data(Vec<u8>),
    Stop { reply: oneshot::Sender<Result<()>> },
}

/// Streaming MP3 encode session fed by incremental PCM byte buffers.
///
/// All encode work runs on a dedicated worker thread per session; commands
/// are drained strictly in submission order. [`add_data`] is fire-and-forget
/// (encoding has not necessarily happened when it returns) and [`stop`]
/// consumes the handle, encodes the buffered remainder, flushes the engine,
/// and finalizes the output. Independent sessions share nothing and run
/// fully in parallel.
///
/// [`add_data`]: StreamingEncoder::add_data
/// [`stop`]: StreamingEncoder::stop
pub struct StreamingEncoder {
    tx: mpsc::UnboundedSender<Command>,
}

impl StreamingEncoder {
    /// Create a session writing to `path` with the real LAME engine.
    ///
    /// Configuration and engine-init errors surface here, before any data
    /// is accepted. A stale file at `path` is replaced.
    pub fn create(config: EncoderConfig, path: impl AsRef<Path>) -> Result<Self> {
        config.validate()?;
        let sink = FileSink::create(path)?;
        let session = CodecSession::new(config, Box::new(sink))?;
        Ok(Self::from_session(session))
    }

    /// Wrap an already-built session, e.g. one with a custom engine, sink,
    /// or data callback.
    pub fn from_session(session: CodecSession) -> Self {
        let chunk_size = session.config().chunk_bytes();
        let (tx, mut rx) = mpsc::unbounded_channel();

        std::thread::spawn(move || {
            let mut worker = Worker {
                session,
                accumulator: FrameAccumulator::new(chunk_size),
                failed: None,
            };

            while let Some(command) = rx.blocking_recv() {
                match command {
                    Command::Data(bytes) => worker.data(&bytes),
                    Command::Stop { reply } => {
                        let _ = reply.send(worker.stop());
                        break;
                    }
                }
            }
        });

        Self { tx }
    }

    /// Queue raw little-endian 16-bit PCM bytes for encoding.
    ///
    /// Non-blocking; the bytes are encoded asynchronously on the session
    /// worker once whole chunks accumulate.
    pub fn add_data(&self, bytes: Vec<u8>) -> Result<()> {
        self.tx
            .send(Command::Data(bytes))
            .map_err(|_| Error::SessionFinished)
    }

    /// Encode any buffered remainder (even a short final chunk), flush the
    /// engine, and finalize the output file.
    ///
    /// Consuming `self` makes data-after-stop unrepresentable. If the
    /// worker hit an error earlier, that first error is returned here.
    pub async fn stop(self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Stop { reply })
            .map_err(|_| Error::SessionFinished)?;

        rx.await.map_err(|_| Error::SessionFinished)?
    }
}

struct Worker {
    session: CodecSession,
    accumulator: FrameAccumulator,
    failed: Option<Error>,
}

impl Worker {
    fn data(&mut self, bytes: &[u8]) {
        if self.failed.is_some() {
            // The first failure is terminal for the session; later data is
            // dropped and the stored error reported at stop.
            return;
        }

        let session = &mut self.session;
        let result = self.accumulator.push(bytes, |chunk| {
            let samples = pcm::samples_from_bytes(chunk);
            session.encode(&samples).map(|_| ())
        });

        if let Err(e) = result {
            tracing::error!("streaming encode failed: {}", e);
            self.failed = Some(e);
        }
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(e) = self.failed.take() {
            return Err(e);
        }

        let remainder = self.accumulator.take_remainder();
        if !remainder.is_empty() {
            let samples = pcm::samples_from_bytes(&remainder);
            self.session.encode(&samples)?;
        }

        self.session.finish()?;
        tracing::info!("streaming session finished");
        Ok(())
    }
}
