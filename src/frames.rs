use std::slice::Chunks;

/// Slice `bytes` into consecutive transport frames of `chunk_size` bytes.
///
/// Every frame is full except possibly the last one. An empty stream yields
/// no frames.
///
/// # Panics
///
/// Panics if `chunk_size` is 0.
pub fn split(bytes: &[u8], chunk_size: usize) -> Chunks<'_, u8> {
    assert!(chunk_size > 0, "frame size must be non-zero");
    bytes.chunks(chunk_size)
}
