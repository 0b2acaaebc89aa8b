//! Streaming PCM to MP3 encoding.
//!
//! Raw 16-bit PCM goes in — either pushed incrementally as byte buffers
//! ([`StreamingEncoder`]) or pulled to completion from a decoded-audio
//! source ([`convert`]) — and framed MP3 comes out the other end. The
//! perceptual encoding itself is LAME, driven as an opaque stateful engine
//! behind the [`Mp3Engine`] trait.
//!
//! Each session runs its encode work on one dedicated worker; submitting
//! data is non-blocking, and independent sessions run fully in parallel
//! with no shared state.

pub mod accumulator;
pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod pcm;
pub mod session;
pub mod sink;
pub mod source;
pub mod stream;

pub use accumulator::FrameAccumulator;
pub use config::{CHUNK_FRAMES, EncoderConfig};
pub use convert::{CompleteFn, ProgressFn, config_for_source, convert, encode_source};
pub use engine::{LameEngine, Mp3Engine};
pub use error::{Error, Result};
pub use session::{CodecSession, DataCallback};
pub use sink::{ByteSink, FileSink, VecSink};
pub use source::{FrameSource, RawPcmSource, WavSource};
pub use stream::StreamingEncoder;
