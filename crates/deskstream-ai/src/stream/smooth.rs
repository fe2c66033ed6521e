//! Delta computation and burst smoothing.
//!
//! The vendor streams cumulative text, so each frame's new content is the
//! suffix past the already-emitted watermark. Large suffixes (model buffer
//! flushes) are subdivided so the client sees steady typing instead of
//! jumps. All indexing is character-based; answers are routinely CJK.

/// Deltas at or below this length are emitted as-is.
pub const SMOOTH_THRESHOLD: usize = 5;

/// Target number of sub-chunks a large delta is drained in.
const DRAIN_STEPS: usize = 20;

/// The new characters of `full_text` past `emitted_chars`.
pub fn delta_after(full_text: &str, emitted_chars: usize) -> String {
    full_text.chars().skip(emitted_chars).collect()
}

/// Split an oversized delta into paced sub-chunks.
///
/// Step size scales with the delta so any burst drains in roughly the same
/// number of emissions: `max(5, chars / 20)`. Character order is preserved
/// exactly; concatenating the result reproduces the input.
pub fn split_delta(delta: &str) -> Vec<String> {
    let chars: Vec<char> = delta.chars().collect();
    let step = (chars.len() / DRAIN_STEPS).max(SMOOTH_THRESHOLD);

    chars
        .chunks(step)
        .map(|chunk| chunk.iter().collect())
        .collect()
}
