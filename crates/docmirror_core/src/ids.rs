use crate::error::SyncError;

const ID_HEX_LEN: usize = 32;

/// Normalize a page reference (raw id, dashed id, `Title-<id>` slug or full
/// URL with query string) into the canonical dashed lower-case form.
pub fn normalize_page_id(raw: &str) -> Result<String, SyncError> {
    let trimmed = raw.trim();
    let mut candidate = trimmed;
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        let without_query = trimmed.split('?').next().unwrap_or(trimmed);
        let without_slash = without_query.trim_end_matches('/');
        candidate = without_slash.rsplit('/').next().unwrap_or(without_slash);
    }

    let cleaned = candidate.replace('-', "");
    let hex = candidate
        .split('-')
        .find(|segment| is_hex_id(segment))
        .or_else(|| find_hex_run(&cleaned))
        .ok_or_else(|| SyncError::InvalidIdentifier(candidate.to_string()))?
        .to_ascii_lowercase();

    Ok(format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    ))
}

/// A `Title-<id>` slug keeps its id as one dash-delimited segment; matching
/// it first stops hex letters at the end of the title from shifting the id.
fn is_hex_id(segment: &str) -> bool {
    segment.len() == ID_HEX_LEN && segment.chars().all(|ch| ch.is_ascii_hexdigit())
}

/// Leading 32 characters of the first hex run that is at least that long.
fn find_hex_run(value: &str) -> Option<&str> {
    let mut start: Option<usize> = None;
    for (index, ch) in value.char_indices() {
        if !ch.is_ascii_hexdigit() {
            start = None;
            continue;
        }
        let begin = *start.get_or_insert(index);
        if index + 1 - begin == ID_HEX_LEN {
            return Some(&value[begin..=index]);
        }
    }
    None
}
