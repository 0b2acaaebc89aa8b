use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong between a PCM producer and the MP3 file.
///
/// A failure is terminal for its conversion or session: there are no
/// retries, and partial output is left on disk as-is.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid encoder configuration: {0}")]
    Config(String),

    #[error("failed to open source {path:?}: {reason}")]
    SourceOpen { path: PathBuf, reason: String },

    #[error("failed to read source: {0}")]
    SourceRead(String),

    #[error("encoder engine rejected parameters: {0}")]
    EngineInit(String),

    #[error("encode failed: {0}")]
    Encode(String),

    #[error("failed to write output: {0}")]
    SinkWrite(#[from] io::Error),

    #[error("session is already finished")]
    SessionFinished,
}
