use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::manifest::DEFAULT_MANIFEST_NAME;
use crate::resolve::DEFAULT_IGNORED_DIRS;
use crate::segment::{DEFAULT_MAX_SEGMENTS, DEFAULT_SEGMENT_LEN, SegmentLimits};

pub const DEFAULT_CONFIG_FILENAME: &str = "docmirror.toml";
pub const DEFAULT_API_URL: &str = "https://api.notion.com/v1";
pub const DEFAULT_NOTION_VERSION: &str = "2025-09-03";
pub const DEFAULT_DOCS_BASE_URL: &str = "https://docs.blaxel.ai";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct MirrorConfig {
    #[serde(default)]
    pub notion: NotionSection,
    #[serde(default)]
    pub docs: DocsSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct NotionSection {
    pub api_url: Option<String>,
    pub version: Option<String>,
    pub root_page: Option<String>,
    pub timeout_ms: Option<u64>,
    pub min_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct DocsSection {
    pub base_url: Option<String>,
    pub manifest: Option<String>,
    pub ignored_dirs: Option<Vec<String>>,
    pub chunk_size: Option<usize>,
    pub max_chunks: Option<usize>,
}

/// Effective settings after applying environment overrides and defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorSettings {
    pub api_url: String,
    pub notion_version: String,
    pub root_page: Option<String>,
    pub timeout_ms: u64,
    pub min_interval_ms: u64,
    pub docs_base_url: String,
    pub manifest_name: String,
    pub ignored_dirs: Vec<String>,
    pub segment_limits: SegmentLimits,
}

impl MirrorConfig {
    /// Resolve every setting: env > config file > default.
    pub fn settings(&self) -> MirrorSettings {
        self.settings_with(env_value)
    }

    fn settings_with<F>(&self, lookup: F) -> MirrorSettings
    where
        F: Fn(&str) -> Option<String>,
    {
        let notion = &self.notion;
        let docs = &self.docs;
        MirrorSettings {
            api_url: lookup("NOTION_API_URL")
                .or_else(|| notion.api_url.clone())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            notion_version: lookup("NOTION_VERSION")
                .or_else(|| notion.version.clone())
                .unwrap_or_else(|| DEFAULT_NOTION_VERSION.to_string()),
            root_page: lookup("NOTION_ROOT_PAGE").or_else(|| notion.root_page.clone()),
            timeout_ms: parsed(&lookup, "NOTION_HTTP_TIMEOUT_MS")
                .or(notion.timeout_ms)
                .unwrap_or(DEFAULT_TIMEOUT_MS),
            min_interval_ms: parsed(&lookup, "NOTION_MIN_INTERVAL_MS")
                .or(notion.min_interval_ms)
                .unwrap_or(0),
            docs_base_url: lookup("DOCS_BASE_URL")
                .or_else(|| docs.base_url.clone())
                .unwrap_or_else(|| DEFAULT_DOCS_BASE_URL.to_string()),
            manifest_name: docs
                .manifest
                .clone()
                .unwrap_or_else(|| DEFAULT_MANIFEST_NAME.to_string()),
            ignored_dirs: docs.ignored_dirs.clone().unwrap_or_else(|| {
                DEFAULT_IGNORED_DIRS
                    .iter()
                    .map(ToString::to_string)
                    .collect()
            }),
            segment_limits: SegmentLimits {
                max_len: docs.chunk_size.unwrap_or(DEFAULT_SEGMENT_LEN),
                max_segments: docs.max_chunks.unwrap_or(DEFAULT_MAX_SEGMENTS),
            },
        }
    }
}

/// Load and parse a MirrorConfig from a TOML file. Returns default if file doesn't exist.
pub fn load_config(config_path: &Path) -> Result<MirrorConfig> {
    if !config_path.exists() {
        return Ok(MirrorConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: MirrorConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

fn env_value(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parsed<F>(lookup: &F, key: &str) -> Option<u64>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|value| value.parse::<u64>().ok())
}
