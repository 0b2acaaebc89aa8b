use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;

/// Destination for encoded MP3 bytes.
///
/// Implementations are driven from a single session worker; writes arrive
/// strictly in stream order.
pub trait ByteSink: Send {
    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Push any buffered bytes through. Called once when the stream ends.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Buffered file sink for the final MP3 output.
pub struct FileSink {
    writer: BufWriter<File>,
}

impl FileSink {
    /// Create the output file, replacing any stale file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            fs::remove_file(path)?;
        }

        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl ByteSink for FileSink {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// In-memory sink for tests and callers that want the bytes directly.
#[derive(Default)]
pub struct VecSink {
    pub bytes: Vec<u8>,
}

impl ByteSink for VecSink {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.bytes.extend_from_slice(bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_sink_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp3");

        fs::write(&path, b"stale contents").unwrap();

        let mut sink = FileSink::create(&path).unwrap();
        sink.write(b"new").unwrap();
        sink.flush().unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"new");
    }

    #[test]
    fn test_vec_sink_appends() {
        let mut sink = VecSink::default();
        sink.write(b"ab").unwrap();
        sink.write(b"cd").unwrap();
        assert_eq!(sink.bytes, b"abcd");
    }
}
