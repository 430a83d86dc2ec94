use std::thread::sleep;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::Method;
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::config::MirrorSettings;
use crate::error::SyncError;
use crate::pages::title_property;

/// Largest page size accepted by the block-children endpoint.
pub const LIST_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedPage {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChildEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "object")]
    pub object_kind: Option<String>,
    #[serde(default, rename = "type")]
    pub block_kind: Option<String>,
}

impl ChildEntry {
    /// Child pages must be archived through the page endpoint.
    pub fn is_page(&self) -> bool {
        self.object_kind.as_deref() == Some("page")
            || self.block_kind.as_deref() == Some("child_page")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChildrenPage {
    #[serde(default, rename = "results")]
    pub items: Vec<ChildEntry>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Remote document store operations used by the mirror.
pub trait StoreGateway {
    fn create_page(
        &mut self,
        parent_id: &str,
        title: &str,
        children: &[Value],
    ) -> Result<CreatedPage, SyncError>;
    fn list_children(
        &mut self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> Result<ChildrenPage, SyncError>;
    fn archive_page(&mut self, page_id: &str) -> Result<(), SyncError>;
    fn archive_block(&mut self, block_id: &str) -> Result<(), SyncError>;
    fn append_children(&mut self, block_id: &str, blocks: &[Value]) -> Result<(), SyncError>;
    fn request_count(&self) -> usize;
}

#[derive(Debug, Clone)]
pub struct NotionClientConfig {
    pub api_url: String,
    pub token: String,
    pub notion_version: String,
    pub timeout_ms: u64,
    pub min_interval_ms: u64,
}

impl NotionClientConfig {
    pub fn from_settings(settings: &MirrorSettings, token: &str) -> Self {
        Self {
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            notion_version: settings.notion_version.clone(),
            timeout_ms: settings.timeout_ms,
            min_interval_ms: settings.min_interval_ms,
        }
    }
}

pub struct NotionClient {
    client: Client,
    config: NotionClientConfig,
    last_request_at: Option<Instant>,
    request_count: usize,
}

impl NotionClient {
    pub fn new(config: NotionClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("failed to build Notion HTTP client")?;

        Ok(Self {
            client,
            config,
            last_request_at: None,
            request_count: 0,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/{}", self.config.api_url, path))
            .bearer_auth(&self.config.token)
            .header("Notion-Version", &self.config.notion_version)
    }

    fn send_json(&mut self, builder: RequestBuilder) -> Result<Value, SyncError> {
        self.apply_rate_limit();
        let response = builder.send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SyncError::RemoteRejected {
                status: status.as_u16(),
                body,
            });
        }
        let body = response.text()?;
        Ok(serde_json::from_str(&body)?)
    }

    fn archive(&mut self, path: &str) -> Result<(), SyncError> {
        let builder = self
            .request(Method::PATCH, path)
            .json(&json!({ "archived": true }));
        self.send_json(builder).map(|_| ())
    }

    fn apply_rate_limit(&mut self) {
        let delay = Duration::from_millis(self.config.min_interval_ms);
        if let Some(last) = self.last_request_at {
            let elapsed = last.elapsed();
            if elapsed < delay {
                sleep(delay - elapsed);
            }
        }
        self.last_request_at = Some(Instant::now());
        self.request_count += 1;
    }
}

impl StoreGateway for NotionClient {
    fn create_page(
        &mut self,
        parent_id: &str,
        title: &str,
        children: &[Value],
    ) -> Result<CreatedPage, SyncError> {
        let payload = json!({
            "parent": { "page_id": parent_id },
            "properties": title_property(title),
            "children": children,
        });
        let builder = self.request(Method::POST, "pages").json(&payload);
        let response = self.send_json(builder)?;
        Ok(serde_json::from_value(response)?)
    }

    fn list_children(
        &mut self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> Result<ChildrenPage, SyncError> {
        let mut query = vec![("page_size", LIST_PAGE_SIZE.to_string())];
        if let Some(cursor) = cursor {
            query.push(("start_cursor", cursor.to_string()));
        }
        debug!(block_id, ?cursor, "listing children");
        let builder = self
            .request(Method::GET, &format!("blocks/{block_id}/children"))
            .query(&query);
        let response = self.send_json(builder)?;
        Ok(serde_json::from_value(response)?)
    }

    fn archive_page(&mut self, page_id: &str) -> Result<(), SyncError> {
        self.archive(&format!("pages/{page_id}"))
    }

    fn archive_block(&mut self, block_id: &str) -> Result<(), SyncError> {
        self.archive(&format!("blocks/{block_id}"))
    }

    fn append_children(&mut self, block_id: &str, blocks: &[Value]) -> Result<(), SyncError> {
        let builder = self
            .request(Method::PATCH, &format!("blocks/{block_id}/children"))
            .json(&json!({ "children": blocks }));
        self.send_json(builder).map(|_| ())
    }

    fn request_count(&self) -> usize {
        self.request_count
    }
}
