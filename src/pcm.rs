//! Small helpers for moving between raw PCM bytes and 16-bit samples.

/// Convert little-endian PCM bytes into 16-bit samples.
///
/// A trailing odd byte (possible only on a final partial chunk) is dropped.
pub fn samples_from_bytes(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Split one interleaved stereo buffer into separate left/right buffers of
/// `frames` samples each: `left[i] = samples[2i]`, `right[i] = samples[2i+1]`.
///
/// Only used when the caller requests planar encoding for stereo input; mono
/// and interleaved stereo go to the engine untouched.
pub fn deinterleave(samples: &[i16], frames: usize) -> (Vec<i16>, Vec<i16>) {
    debug_assert!(samples.len() >= frames * 2);

    let mut left = Vec::with_capacity(frames);
    let mut right = Vec::with_capacity(frames);

    for pair in samples.chunks_exact(2).take(frames) {
        left.push(pair[0]);
        right.push(pair[1]);
    }

    (left, right)
}
