use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};
use tracing::debug;
use walkdir::WalkDir;

pub const DEFAULT_COMMANDS_PREFIX: &str = "cli-reference/commands";
pub const DEFAULT_COMMANDS_TAB: &str = "CLI Reference";
pub const DEFAULT_COMMANDS_GROUP: &str = "Overview";
pub const DEFAULT_COMMANDS_SUBGROUP: &str = "Commands";
pub const DEFAULT_EXCLUDED_FILES: &[&str] = &["bl.md"];

/// Where in the manifest the generated command pages are listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuTarget {
    pub tab: String,
    pub group: String,
    pub subgroup: String,
}

impl Default for MenuTarget {
    fn default() -> Self {
        Self {
            tab: DEFAULT_COMMANDS_TAB.to_string(),
            group: DEFAULT_COMMANDS_GROUP.to_string(),
            subgroup: DEFAULT_COMMANDS_SUBGROUP.to_string(),
        }
    }
}

/// Slugs for the `.md` files directly inside `dir`, sorted by file name.
pub fn collect_generated_pages(
    dir: &Path,
    prefix: &str,
    excluded: &[String],
) -> Result<Vec<String>> {
    if !dir.is_dir() {
        bail!("generated pages directory not found: {}", dir.display());
    }

    let prefix = prefix.trim_end_matches('/');
    let mut pages = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("failed to list {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy();
        let Some(stem) = file_name.strip_suffix(".md") else {
            continue;
        };
        if excluded.iter().any(|name| name.as_str() == file_name) {
            debug!(file = %file_name, "excluded from command menu");
            continue;
        }
        if prefix.is_empty() {
            pages.push(stem.to_string());
        } else {
            pages.push(format!("{prefix}/{stem}"));
        }
    }
    Ok(pages)
}

/// Replace the `pages` list of the target subgroup and rewrite the manifest.
/// Every other key keeps its position and value.
pub fn update_manifest_commands(
    manifest_path: &Path,
    pages: &[String],
    target: &MenuTarget,
) -> Result<()> {
    let content = fs::read_to_string(manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    let mut document: Value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", manifest_path.display()))?;

    let subgroup = find_subgroup(&mut document, target)?;
    subgroup.insert(
        "pages".to_string(),
        Value::Array(pages.iter().cloned().map(Value::String).collect()),
    );

    let mut output = serde_json::to_string_pretty(&document)?;
    output.push('\n');
    fs::write(manifest_path, output)
        .with_context(|| format!("failed to write {}", manifest_path.display()))?;
    Ok(())
}

fn find_subgroup<'a>(
    document: &'a mut Value,
    target: &MenuTarget,
) -> Result<&'a mut Map<String, Value>> {
    let Some(tabs) = document
        .get_mut("navigation")
        .and_then(|navigation| navigation.get_mut("tabs"))
        .and_then(Value::as_array_mut)
    else {
        bail!("manifest does not contain navigation.tabs");
    };

    let Some(tab) = tabs
        .iter_mut()
        .filter_map(Value::as_object_mut)
        .find(|tab| tab.get("tab").and_then(Value::as_str) == Some(target.tab.as_str()))
    else {
        bail!("could not find tab '{}' in navigation.tabs", target.tab);
    };

    let Some(group) = tab
        .get_mut("groups")
        .and_then(Value::as_array_mut)
        .and_then(|groups| find_group(groups, &target.group))
    else {
        bail!("could not find group '{}' under '{}' tab", target.group, target.tab);
    };

    let Some(subgroup) = group
        .get_mut("pages")
        .and_then(Value::as_array_mut)
        .and_then(|pages| find_group(pages, &target.subgroup))
    else {
        bail!(
            "could not find group '{}' under '{}' -> '{}'",
            target.subgroup,
            target.tab,
            target.group
        );
    };
    Ok(subgroup)
}

fn find_group<'a>(entries: &'a mut [Value], name: &str) -> Option<&'a mut Map<String, Value>> {
    entries
        .iter_mut()
        .filter_map(Value::as_object_mut)
        .find(|entry| entry.get("group").and_then(Value::as_str) == Some(name))
}
