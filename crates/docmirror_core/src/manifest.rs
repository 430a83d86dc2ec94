use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub const DEFAULT_MANIFEST_NAME: &str = "docs.json";

/// Read-only view of a Mintlify-style `docs.json`. Unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub navigation: Navigation,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Navigation {
    #[serde(default)]
    pub tabs: Vec<TabEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TabEntry {
    pub tab: Option<String>,
    pub groups: Option<Vec<GroupEntry>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupEntry {
    pub group: Option<String>,
    /// Optional landing page for the group itself.
    pub root: Option<String>,
    #[serde(default)]
    pub pages: Vec<PageEntry>,
}

#[derive(Debug, Clone)]
pub enum PageEntry {
    Slug(String),
    Group(GroupEntry),
    Other(Value),
}

impl<'de> Deserialize<'de> for PageEntry {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::String(slug) => Ok(Self::Slug(slug)),
            Value::Object(object) if object.contains_key("group") => {
                serde_json::from_value(Value::Object(object))
                    .map(Self::Group)
                    .map_err(serde::de::Error::custom)
            }
            other => Ok(Self::Other(other)),
        }
    }
}

pub fn load_manifest(root_dir: &Path, manifest_name: &str) -> Result<Manifest> {
    let path = root_dir.join(manifest_name);
    if !path.is_file() {
        bail!(
            "{manifest_name} not found in {}. Expected at: {}",
            root_dir.display(),
            path.display()
        );
    }
    let content =
        fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
    parse_manifest(&content).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn parse_manifest(content: &str) -> Result<Manifest> {
    Ok(serde_json::from_str(content)?)
}
