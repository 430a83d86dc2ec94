use crate::error::SyncError;

/// Notion rejects rich-text runs above 2000 characters; stay under it.
pub const DEFAULT_SEGMENT_LEN: usize = 1900;
pub const DEFAULT_MAX_SEGMENTS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentLimits {
    pub max_len: usize,
    pub max_segments: usize,
}

impl Default for SegmentLimits {
    fn default() -> Self {
        Self {
            max_len: DEFAULT_SEGMENT_LEN,
            max_segments: DEFAULT_MAX_SEGMENTS,
        }
    }
}

/// Split `text` into consecutive slices of at most `max_len` characters.
/// Joining the slices reproduces `text` byte for byte.
pub fn split_for_rich_text(text: &str, limits: SegmentLimits) -> Result<Vec<&str>, SyncError> {
    let max_len = limits.max_len.max(1);
    let char_count = text.chars().count();
    let needed = char_count.div_ceil(max_len);
    if needed > limits.max_segments {
        return Err(SyncError::ContentTooLarge {
            needed,
            max_len,
            max_segments: limits.max_segments,
        });
    }

    let mut segments = Vec::with_capacity(needed);
    let mut start = 0usize;
    let mut taken = 0usize;
    for (index, _) in text.char_indices() {
        if taken == max_len {
            segments.push(&text[start..index]);
            start = index;
            taken = 0;
        }
        taken += 1;
    }
    if start < text.len() {
        segments.push(&text[start..]);
    }
    Ok(segments)
}
