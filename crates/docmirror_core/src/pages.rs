use std::fs;
use std::path::Path;

use serde_json::{Value, json};

use crate::error::SyncError;
use crate::frontmatter::extract_title;
use crate::resolve::docs_url;
use crate::segment::{SegmentLimits, split_for_rich_text};

pub const CODE_LANGUAGE: &str = "markdown";

pub fn text_run(content: &str) -> Value {
    json!({
        "type": "text",
        "text": { "content": content },
    })
}

fn link_run(content: &str, url: &str) -> Value {
    json!({
        "type": "text",
        "text": { "content": content, "link": { "url": url } },
    })
}

/// `properties` payload that sets a page title.
pub fn title_property(title: &str) -> Value {
    json!({
        "title": { "title": [text_run(title)] },
    })
}

pub fn paragraph_block(text: &str) -> Value {
    json!({
        "object": "block",
        "type": "paragraph",
        "paragraph": { "rich_text": [text_run(text)] },
    })
}

/// Paragraph reading `Source: <url>` with the url linked.
pub fn source_link_block(url: &str) -> Value {
    json!({
        "object": "block",
        "type": "paragraph",
        "paragraph": {
            "rich_text": [
                { "type": "text", "text": { "content": "Source: ", "link": null } },
                link_run(url, url),
            ],
        },
    })
}

/// One code block holding `content` verbatim, split across rich-text runs.
pub fn markdown_code_block(content: &str, limits: SegmentLimits) -> Result<Value, SyncError> {
    let rich_text = split_for_rich_text(content, limits)?
        .into_iter()
        .map(text_run)
        .collect::<Vec<_>>();
    Ok(json!({
        "object": "block",
        "type": "code",
        "code": {
            "language": CODE_LANGUAGE,
            "rich_text": rich_text,
        },
    }))
}

/// Everything needed to create the remote page for one markdown file.
#[derive(Debug, Clone)]
pub struct ContentPage {
    pub title: String,
    pub docs_url: String,
    pub blocks: Vec<Value>,
}

/// Read `file` and lay it out as a source link followed by the full text.
/// The title comes from frontmatter, else the file stem.
pub fn build_content_page(
    file: &Path,
    root: &Path,
    base_url: &str,
    limits: SegmentLimits,
) -> Result<ContentPage, SyncError> {
    let content = fs::read_to_string(file).map_err(|source| SyncError::ReadSource {
        path: file.to_path_buf(),
        source,
    })?;
    let title = extract_title(&content).unwrap_or_else(|| file_stem(file));
    let docs_url = docs_url(base_url, root, file);
    let blocks = vec![
        source_link_block(&docs_url),
        markdown_code_block(&content, limits)?,
    ];
    Ok(ContentPage {
        title,
        docs_url,
        blocks,
    })
}

fn file_stem(file: &Path) -> String {
    file.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
