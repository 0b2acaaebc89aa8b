use crate::error::Result;

/// Buffers arbitrary-sized byte appends and releases only whole,
/// chunk-sized slices, carrying the remainder forward.
///
/// After every successful [`push`] the pending buffer holds strictly fewer
/// than `chunk_size` bytes: all complete chunks have been drained through
/// the emit callback in order.
///
/// [`push`]: FrameAccumulator::push
pub struct FrameAccumulator {
    pending: Vec<u8>,
    chunk_size: usize,
}

impl FrameAccumulator {
    pub fn new(chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk_size must be positive");
        Self {
            pending: Vec::new(),
            chunk_size,
        }
    }

    /// Append `bytes`, feeding every complete chunk to `emit` in order.
    ///
    /// A push that exactly completes a pending partial chunk emits it in
    /// this same call; a zero-length push never emits. If `emit` fails, the
    /// chunks already emitted are dropped from the buffer and the error is
    /// propagated.
    pub fn push<F>(&mut self, bytes: &[u8], mut emit: F) -> Result<()>
    where
        F: FnMut(&[u8]) -> Result<()>,
    {
        self.pending.extend_from_slice(bytes);

        let mut start = 0;
        let mut failure = None;

        while self.pending.len() - start >= self.chunk_size {
            match emit(&self.pending[start..start + self.chunk_size]) {
                Ok(()) => start += self.chunk_size,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        if start > 0 {
            self.pending.drain(..start);
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Take the final partial chunk (0 to `chunk_size - 1` bytes after a
    /// successful push) for end-of-stream encoding.
    pub fn take_remainder(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.pending)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}
