const DELIMITER: &str = "---";

/// Read the `title:` key from a `---` delimited header at the very top of a
/// markdown file. The content itself is never modified.
pub fn extract_title(content: &str) -> Option<String> {
    let lines = content.lines().collect::<Vec<_>>();
    if lines.len() < 3 || lines[0].trim_end() != DELIMITER {
        return None;
    }
    let end = lines
        .iter()
        .skip(1)
        .position(|line| line.trim() == DELIMITER)?
        + 1;

    lines[1..end]
        .iter()
        .find_map(|line| line.trim().strip_prefix("title:"))
        .map(unquote)
        .filter(|title| !title.is_empty())
}

fn unquote(value: &str) -> String {
    let value = value.trim();
    let value = value.strip_prefix(['"', '\'']).unwrap_or(value);
    let value = value.strip_suffix(['"', '\'']).unwrap_or(value);
    value.trim().to_string()
}
