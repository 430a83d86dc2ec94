use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::MirrorSettings;
use crate::error::SyncError;
use crate::ids::normalize_page_id;
use crate::manifest::load_manifest;
use crate::nav::{NavNode, NavTree, NodeKind, build_nav_tree};
use crate::notion::StoreGateway;
use crate::pages::build_content_page;
use crate::resolve::SourceResolver;
use crate::segment::SegmentLimits;
use crate::stamp::RootStamp;

/// Pages created in one run, in total and per enclosing manifest group.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SyncCounters {
    pub total_pages: usize,
    pub per_group: BTreeMap<String, usize>,
}

impl SyncCounters {
    fn record_page(&mut self, group: Option<&str>) {
        self.total_pages += 1;
        if let Some(group) = group {
            *self.per_group.entry(group.to_string()).or_insert(0) += 1;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WipeReport {
    pub listed: usize,
    pub archived: usize,
    pub skipped_without_id: usize,
    pub failed: Vec<String>,
    pub list_requests: usize,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NodeAction {
    Created,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeOutcome {
    pub title: String,
    pub kind: NodeKind,
    pub action: NodeAction,
    pub parent_id: String,
    pub page_id: Option<String>,
    pub url: Option<String>,
    pub source: Option<String>,
    pub detail: Option<String>,
    /// Nodes below this one that were never attempted.
    pub descendants_skipped: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RebuildReport {
    pub counters: SyncCounters,
    pub nodes: Vec<NodeOutcome>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RebuildOptions {
    pub root_dir: PathBuf,
    pub docs_base_url: String,
    pub segment_limits: SegmentLimits,
}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub docs_base_url: String,
    pub manifest_name: String,
    pub ignored_dirs: Vec<String>,
    pub segment_limits: SegmentLimits,
    pub stamp: RootStamp,
}

impl ImportOptions {
    pub fn from_settings(settings: &MirrorSettings, stamp: RootStamp) -> Self {
        Self {
            docs_base_url: settings.docs_base_url.clone(),
            manifest_name: settings.manifest_name.clone(),
            ignored_dirs: settings.ignored_dirs.clone(),
            segment_limits: settings.segment_limits,
            stamp,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    Directory,
    File,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub mode: ImportMode,
    pub source: String,
    pub root_page_id: String,
    pub wipe: WipeReport,
    pub stamp: RootStamp,
    pub rebuild: RebuildReport,
    pub unresolved: Vec<String>,
    pub ignored: Vec<String>,
    pub request_count: usize,
}

/// Archive every direct child of `root_id`. Listing failures abort; a failed
/// archive is recorded and the wipe moves on.
pub fn wipe_destination<G: StoreGateway>(
    gateway: &mut G,
    root_id: &str,
) -> Result<WipeReport, SyncError> {
    let mut report = WipeReport::default();
    let mut cursor: Option<String> = None;
    info!(root = root_id, "fetching children of root page");

    loop {
        let page = gateway.list_children(root_id, cursor.as_deref())?;
        report.list_requests += 1;
        report.listed += page.items.len();
        info!(count = page.items.len(), "retrieved children");

        if page.items.is_empty() && !page.has_more {
            break;
        }

        for item in &page.items {
            let Some(id) = item.id.as_deref() else {
                warn!("found child without id, skipping");
                report.skipped_without_id += 1;
                continue;
            };

            let (endpoint, result) = if item.is_page() {
                ("page", gateway.archive_page(id))
            } else {
                ("block", gateway.archive_block(id))
            };
            match result {
                Ok(()) => {
                    info!(
                        id,
                        endpoint,
                        object = item.object_kind.as_deref().unwrap_or("-"),
                        kind = item.block_kind.as_deref().unwrap_or("-"),
                        "archived child"
                    );
                    report.archived += 1;
                }
                Err(archive_error) => {
                    error!(id, endpoint, error = %archive_error, "failed to archive child");
                    report.failed.push(format!("{id}: {archive_error}"));
                }
            }
        }

        if !page.has_more {
            break;
        }
        match page.next_cursor {
            Some(next) => {
                info!("fetching next page of children");
                cursor = Some(next);
            }
            None => {
                warn!("listing reported more children without a cursor, stopping");
                break;
            }
        }
    }

    info!(
        root = root_id,
        archived = report.archived,
        failed = report.failed.len(),
        "cleared root page"
    );
    Ok(report)
}

/// Append the provenance paragraph directly under the root page.
pub fn stamp_root<G: StoreGateway>(
    gateway: &mut G,
    root_id: &str,
    stamp: &RootStamp,
) -> Result<(), SyncError> {
    gateway.append_children(root_id, &[stamp.block()])?;
    info!(
        updated_at = %stamp.updated_at,
        revision = %stamp.revision,
        "added update block to root page"
    );
    Ok(())
}

/// Recreate `nodes` under `root_id`, depth first and in manifest order.
/// Remote failures skip the affected subtree; only an oversized file aborts.
pub fn rebuild_tree<G: StoreGateway>(
    gateway: &mut G,
    nodes: &[NavNode],
    root_id: &str,
    options: &RebuildOptions,
) -> Result<RebuildReport, SyncError> {
    let mut rebuilder = Rebuilder {
        gateway,
        options,
        report: RebuildReport::default(),
    };
    rebuilder.process_nodes(nodes, root_id, None)?;
    Ok(rebuilder.report)
}

struct Rebuilder<'a, G> {
    gateway: &'a mut G,
    options: &'a RebuildOptions,
    report: RebuildReport,
}

impl<G: StoreGateway> Rebuilder<'_, G> {
    fn process_nodes(
        &mut self,
        nodes: &[NavNode],
        parent_id: &str,
        current_group: Option<&str>,
    ) -> Result<(), SyncError> {
        for node in nodes {
            let next_group = node.group_scope().or(current_group);
            match node {
                NavNode::Tab(_) | NavNode::Group(_) => {
                    self.process_structural(node, parent_id, next_group)?;
                }
                NavNode::Page(page) => {
                    self.process_content(node, &page.source, parent_id, current_group, next_group)?;
                }
                NavNode::Hybrid(hybrid) => {
                    self.process_content(
                        node,
                        &hybrid.source,
                        parent_id,
                        current_group,
                        next_group,
                    )?;
                }
            }
        }
        Ok(())
    }

    fn process_structural(
        &mut self,
        node: &NavNode,
        parent_id: &str,
        scope: Option<&str>,
    ) -> Result<(), SyncError> {
        let title = node.title();
        match self.gateway.create_page(parent_id, title, &[]) {
            Ok(created) => {
                info!(title, kind = node.kind().as_str(), "created section page");
                self.report.nodes.push(NodeOutcome {
                    title: title.to_string(),
                    kind: node.kind(),
                    action: NodeAction::Created,
                    parent_id: parent_id.to_string(),
                    page_id: Some(created.id.clone()),
                    url: created.url,
                    source: None,
                    detail: None,
                    descendants_skipped: 0,
                });
                self.process_nodes(node.children(), &created.id, scope)
            }
            Err(create_error) => {
                error!(title, error = %create_error, "failed to create section page");
                self.skip(node, parent_id, None, &create_error);
                Ok(())
            }
        }
    }

    fn process_content(
        &mut self,
        node: &NavNode,
        source: &Path,
        parent_id: &str,
        current_group: Option<&str>,
        scope: Option<&str>,
    ) -> Result<(), SyncError> {
        let relative = display_relative(&self.options.root_dir, source);
        let page = match build_content_page(
            source,
            &self.options.root_dir,
            &self.options.docs_base_url,
            self.options.segment_limits,
        ) {
            Ok(page) => page,
            Err(build_error @ SyncError::ContentTooLarge { .. }) => {
                error!(file = %relative, error = %build_error, "file cannot be uploaded");
                return Err(build_error);
            }
            Err(build_error) => {
                warn!(file = %relative, error = %build_error, "skipping file");
                self.skip(node, parent_id, Some(relative), &build_error);
                return Ok(());
            }
        };

        match self.gateway.create_page(parent_id, &page.title, &page.blocks) {
            Ok(created) => {
                info!(
                    file = %relative,
                    url = created.url.as_deref().unwrap_or("(no url in response)"),
                    "created page"
                );
                self.report.counters.record_page(current_group);
                self.report.nodes.push(NodeOutcome {
                    title: page.title,
                    kind: node.kind(),
                    action: NodeAction::Created,
                    parent_id: parent_id.to_string(),
                    page_id: Some(created.id.clone()),
                    url: created.url,
                    source: Some(relative),
                    detail: None,
                    descendants_skipped: 0,
                });
                self.process_nodes(node.children(), &created.id, scope)
            }
            Err(create_error) => {
                error!(file = %relative, error = %create_error, "failed to create page");
                self.skip(node, parent_id, Some(relative), &create_error);
                Ok(())
            }
        }
    }

    fn skip(
        &mut self,
        node: &NavNode,
        parent_id: &str,
        source: Option<String>,
        reason: &SyncError,
    ) {
        let descendants = node.descendant_count();
        if descendants > 0 {
            warn!(title = node.title(), descendants, "skipping subtree");
        }
        self.report
            .errors
            .push(format!("{}: {reason}", source.as_deref().unwrap_or(node.title())));
        self.report.nodes.push(NodeOutcome {
            title: node.title().to_string(),
            kind: node.kind(),
            action: NodeAction::Skipped,
            parent_id: parent_id.to_string(),
            page_id: None,
            url: None,
            source,
            detail: Some(reason.to_string()),
            descendants_skipped: descendants,
        });
    }
}

/// Mirror a docs directory driven by its navigation manifest.
pub fn import_directory<G: StoreGateway>(
    gateway: &mut G,
    root_page: &str,
    dir: &Path,
    options: &ImportOptions,
) -> Result<ImportReport> {
    let root_id = normalize_page_id(root_page)?;
    let root_dir = dir
        .canonicalize()
        .with_context(|| format!("failed to resolve {}", dir.display()))?;

    let manifest = load_manifest(&root_dir, &options.manifest_name)?;
    let resolver = SourceResolver::new(&root_dir, options.ignored_dirs.iter().cloned());
    let tree = build_nav_tree(&manifest, &resolver);

    let wipe = wipe_destination(gateway, &root_id)
        .context("failed to clear existing content under the root page")?;
    stamp_root(gateway, &root_id, &options.stamp).context("failed to update the root page")?;

    let rebuild = if tree.is_empty() {
        warn!(
            manifest = %options.manifest_name,
            root = %root_dir.display(),
            "no usable navigation entries found"
        );
        RebuildReport::default()
    } else {
        rebuild_tree(
            gateway,
            &tree.nodes,
            &root_id,
            &RebuildOptions {
                root_dir: root_dir.clone(),
                docs_base_url: options.docs_base_url.clone(),
                segment_limits: options.segment_limits,
            },
        )
        .context("failed to rebuild the page tree")?
    };
    log_stats(&rebuild.counters);

    let NavTree {
        unresolved,
        ignored,
        ..
    } = tree;
    Ok(ImportReport {
        mode: ImportMode::Directory,
        source: root_dir.display().to_string(),
        root_page_id: root_id,
        wipe,
        stamp: options.stamp.clone(),
        rebuild,
        unresolved,
        ignored,
        request_count: gateway.request_count(),
    })
}

/// Mirror one markdown file as a single page directly under the root.
/// Any failure is fatal.
pub fn import_single_file<G: StoreGateway>(
    gateway: &mut G,
    root_page: &str,
    file: &Path,
    options: &ImportOptions,
) -> Result<ImportReport> {
    let root_id = normalize_page_id(root_page)?;
    let file = file
        .canonicalize()
        .with_context(|| format!("failed to resolve {}", file.display()))?;
    let root_dir = file
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow::anyhow!("path has no parent: {}", file.display()))?;

    let page = build_content_page(
        &file,
        &root_dir,
        &options.docs_base_url,
        options.segment_limits,
    )
    .with_context(|| format!("failed to prepare page for {}", file.display()))?;

    let wipe = wipe_destination(gateway, &root_id)
        .context("failed to clear existing content under the root page")?;
    stamp_root(gateway, &root_id, &options.stamp).context("failed to update the root page")?;

    let created = gateway
        .create_page(&root_id, &page.title, &page.blocks)
        .with_context(|| format!("failed to create page for {}", file.display()))?;
    let relative = display_relative(&root_dir, &file);
    info!(
        file = %relative,
        url = created.url.as_deref().unwrap_or("(no url in response)"),
        "created page"
    );

    let mut rebuild = RebuildReport::default();
    rebuild.counters.record_page(None);
    rebuild.nodes.push(NodeOutcome {
        title: page.title,
        kind: NodeKind::Page,
        action: NodeAction::Created,
        parent_id: root_id.clone(),
        page_id: Some(created.id),
        url: created.url,
        source: Some(relative),
        detail: None,
        descendants_skipped: 0,
    });
    log_stats(&rebuild.counters);

    Ok(ImportReport {
        mode: ImportMode::File,
        source: file.display().to_string(),
        root_page_id: root_id,
        wipe,
        stamp: options.stamp.clone(),
        rebuild,
        unresolved: Vec::new(),
        ignored: Vec::new(),
        request_count: gateway.request_count(),
    })
}

/// Directory → manifest-driven import, file → single page.
pub fn import_path<G: StoreGateway>(
    gateway: &mut G,
    root_page: &str,
    path: &Path,
    options: &ImportOptions,
) -> Result<ImportReport> {
    if path.is_dir() {
        import_directory(gateway, root_page, path, options)
    } else if path.is_file() {
        import_single_file(gateway, root_page, path, options)
    } else {
        bail!("path not found: {}", path.display())
    }
}

fn log_stats(counters: &SyncCounters) {
    if counters.per_group.is_empty() {
        info!("no group-scoped pages");
    }
    for (group, count) in &counters.per_group {
        info!(group = %group, pages = count, "pages created for group");
    }
    info!(total = counters.total_pages, "total content pages created");
}

fn display_relative(root: &Path, file: &Path) -> String {
    file.strip_prefix(root)
        .unwrap_or(file)
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::fs;
    use std::path::{Path, PathBuf};

    use serde_json::Value;
    use tempfile::{TempDir, tempdir};

    use super::{
        ImportMode, ImportOptions, NodeAction, RebuildOptions, import_directory, import_path,
        import_single_file, rebuild_tree, wipe_destination,
    };
    use crate::error::SyncError;
    use crate::manifest::parse_manifest;
    use crate::nav::{
        GroupNode, HybridNode, NavNode, NodeKind, PageNode, TabNode, build_nav_tree,
    };
    use crate::notion::{ChildEntry, ChildrenPage, CreatedPage, StoreGateway};
    use crate::resolve::SourceResolver;
    use crate::segment::SegmentLimits;
    use crate::stamp::RootStamp;

    const ROOT_RAW: &str = "https://www.notion.so/Docs-Root-2aa22baf61cd80f3a075f5deaeb1cf6f?pvs=4";
    const ROOT_ID: &str = "2aa22baf-61cd-80f3-a075-f5deaeb1cf6f";

    #[derive(Debug, Clone)]
    struct CreateCall {
        parent_id: String,
        title: String,
        children: Vec<Value>,
        id: String,
    }

    struct MockGateway {
        existing_children: Vec<ChildEntry>,
        page_size: usize,
        next_id: usize,
        calls: Vec<String>,
        list_cursors: Vec<Option<String>>,
        created: Vec<CreateCall>,
        archived_pages: Vec<String>,
        archived_blocks: Vec<String>,
        appended: Vec<(String, Vec<Value>)>,
        fail_archive: BTreeSet<String>,
        fail_create_titles: BTreeSet<String>,
        fail_listing: bool,
        fail_append: bool,
        omit_next_cursor: bool,
        request_count: usize,
    }

    impl Default for MockGateway {
        fn default() -> Self {
            Self {
                existing_children: Vec::new(),
                page_size: 100,
                next_id: 0,
                calls: Vec::new(),
                list_cursors: Vec::new(),
                created: Vec::new(),
                archived_pages: Vec::new(),
                archived_blocks: Vec::new(),
                appended: Vec::new(),
                fail_archive: BTreeSet::new(),
                fail_create_titles: BTreeSet::new(),
                fail_listing: false,
                fail_append: false,
                omit_next_cursor: false,
                request_count: 0,
            }
        }
    }

    fn rejected() -> SyncError {
        SyncError::RemoteRejected {
            status: 400,
            body: "validation_error".to_string(),
        }
    }

    impl StoreGateway for MockGateway {
        fn create_page(
            &mut self,
            parent_id: &str,
            title: &str,
            children: &[Value],
        ) -> Result<CreatedPage, SyncError> {
            self.request_count += 1;
            self.calls.push(format!("create:{title}"));
            if self.fail_create_titles.contains(title) {
                return Err(rejected());
            }
            self.next_id += 1;
            let id = format!("page-{}", self.next_id);
            self.created.push(CreateCall {
                parent_id: parent_id.to_string(),
                title: title.to_string(),
                children: children.to_vec(),
                id: id.clone(),
            });
            Ok(CreatedPage {
                url: Some(format!("https://www.notion.so/{id}")),
                id,
            })
        }

        fn list_children(
            &mut self,
            block_id: &str,
            cursor: Option<&str>,
        ) -> Result<ChildrenPage, SyncError> {
            self.request_count += 1;
            self.calls.push(format!("list:{block_id}"));
            self.list_cursors.push(cursor.map(ToString::to_string));
            if self.fail_listing {
                return Err(rejected());
            }
            let start = cursor
                .and_then(|value| value.parse::<usize>().ok())
                .unwrap_or(0);
            let end = (start + self.page_size).min(self.existing_children.len());
            let has_more = end < self.existing_children.len();
            Ok(ChildrenPage {
                items: self.existing_children[start..end].to_vec(),
                has_more,
                next_cursor: (has_more && !self.omit_next_cursor).then(|| end.to_string()),
            })
        }

        fn archive_page(&mut self, page_id: &str) -> Result<(), SyncError> {
            self.request_count += 1;
            self.calls.push(format!("archive_page:{page_id}"));
            if self.fail_archive.contains(page_id) {
                return Err(rejected());
            }
            self.archived_pages.push(page_id.to_string());
            Ok(())
        }

        fn archive_block(&mut self, block_id: &str) -> Result<(), SyncError> {
            self.request_count += 1;
            self.calls.push(format!("archive_block:{block_id}"));
            if self.fail_archive.contains(block_id) {
                return Err(rejected());
            }
            self.archived_blocks.push(block_id.to_string());
            Ok(())
        }

        fn append_children(&mut self, block_id: &str, blocks: &[Value]) -> Result<(), SyncError> {
            self.request_count += 1;
            self.calls.push(format!("append:{block_id}"));
            if self.fail_append {
                return Err(rejected());
            }
            self.appended.push((block_id.to_string(), blocks.to_vec()));
            Ok(())
        }

        fn request_count(&self) -> usize {
            self.request_count
        }
    }

    impl MockGateway {
        fn created_by_title(&self, title: &str) -> &CreateCall {
            self.created
                .iter()
                .find(|call| call.title == title)
                .unwrap_or_else(|| panic!("no page created with title {title}"))
        }
    }

    fn child(id: &str, object: &str, kind: &str) -> ChildEntry {
        ChildEntry {
            id: Some(id.to_string()),
            object_kind: Some(object.to_string()),
            block_kind: Some(kind.to_string()),
        }
    }

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(path, content).expect("write file");
    }

    fn stamp() -> RootStamp {
        RootStamp {
            updated_at: "2026-03-01 12:00:00".to_string(),
            revision: "deadbeef".to_string(),
        }
    }

    fn import_options() -> ImportOptions {
        ImportOptions {
            docs_base_url: "https://docs.example.com".to_string(),
            manifest_name: "docs.json".to_string(),
            ignored_dirs: vec!["images".to_string()],
            segment_limits: SegmentLimits::default(),
            stamp: stamp(),
        }
    }

    fn rebuild_options(root: &Path) -> RebuildOptions {
        RebuildOptions {
            root_dir: root.to_path_buf(),
            docs_base_url: "https://docs.example.com".to_string(),
            segment_limits: SegmentLimits::default(),
        }
    }

    fn code_text(call: &CreateCall) -> String {
        call.children[1]["code"]["rich_text"]
            .as_array()
            .expect("rich_text")
            .iter()
            .map(|run| run["text"]["content"].as_str().expect("content"))
            .collect()
    }

    fn docs_fixture() -> (TempDir, PathBuf) {
        let temp = tempdir().expect("tempdir");
        let root = temp.path().join("docs");
        write_file(
            &root.join("intro.mdx"),
            "---\ntitle: \"Custom Name\"\n---\n# Intro\n",
        );
        write_file(&root.join("guides/setup.md"), "# Setup\n");
        write_file(&root.join("sdk/index.mdx"), "# SDK\n");
        write_file(&root.join("sdk/install.mdx"), "# Install\n");
        write_file(
            &root.join("docs.json"),
            r#"{"navigation": {"tabs": [
                {"tab": "Documentation", "groups": [
                    {"group": "Getting Started", "pages": [
                        "intro",
                        "guides/setup",
                        "guides/missing",
                        {"group": "SDK", "root": "sdk/index", "pages": ["sdk/install"]}
                    ]}
                ]},
                {"tab": "API Reference", "openapi": "openapi.json"}
            ]}}"#,
        );
        (temp, root)
    }

    #[test]
    fn wipe_follows_cursor_and_tolerates_single_failure() {
        let mut gateway = MockGateway::default();
        gateway.existing_children = (1..=150)
            .map(|index| {
                if index % 10 == 0 {
                    child(&format!("c{index}"), "block", "child_page")
                } else {
                    child(&format!("c{index}"), "block", "paragraph")
                }
            })
            .collect();
        gateway.fail_archive.insert("c75".to_string());

        let report = wipe_destination(&mut gateway, ROOT_ID).expect("wipe");

        assert_eq!(report.list_requests, 2);
        assert_eq!(
            gateway.list_cursors,
            vec![None, Some("100".to_string())]
        );
        assert_eq!(report.listed, 150);
        assert_eq!(report.archived, 149);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].starts_with("c75:"));
        assert_eq!(gateway.archived_pages.len(), 15);
        assert_eq!(gateway.archived_blocks.len(), 134);
        assert!(gateway.archived_blocks.contains(&"c76".to_string()));
        assert!(gateway.archived_blocks.contains(&"c149".to_string()));
        assert!(gateway.archived_pages.contains(&"c150".to_string()));
    }

    #[test]
    fn wipe_routes_page_objects_and_skips_entries_without_id() {
        let mut gateway = MockGateway::default();
        gateway.existing_children = vec![
            child("p1", "page", "child_page"),
            ChildEntry {
                id: None,
                object_kind: Some("block".to_string()),
                block_kind: Some("divider".to_string()),
            },
            child("b1", "block", "code"),
        ];

        let report = wipe_destination(&mut gateway, ROOT_ID).expect("wipe");
        assert_eq!(report.archived, 2);
        assert_eq!(report.skipped_without_id, 1);
        assert_eq!(gateway.archived_pages, vec!["p1".to_string()]);
        assert_eq!(gateway.archived_blocks, vec!["b1".to_string()]);
    }

    #[test]
    fn wipe_of_empty_root_lists_once() {
        let mut gateway = MockGateway::default();
        let report = wipe_destination(&mut gateway, ROOT_ID).expect("wipe");
        assert_eq!(report.list_requests, 1);
        assert_eq!(report.archived, 0);
    }

    #[test]
    fn wipe_stops_when_more_is_reported_without_a_cursor() {
        let mut gateway = MockGateway {
            page_size: 2,
            omit_next_cursor: true,
            ..MockGateway::default()
        };
        gateway.existing_children = (1..=5)
            .map(|index| child(&format!("c{index}"), "block", "paragraph"))
            .collect();

        let report = wipe_destination(&mut gateway, ROOT_ID).expect("wipe");

        assert_eq!(report.list_requests, 1);
        assert_eq!(gateway.list_cursors, vec![None]);
        assert_eq!(report.archived, 2);
        assert_eq!(
            gateway.archived_blocks,
            vec!["c1".to_string(), "c2".to_string()]
        );
    }

    #[test]
    fn wipe_listing_failure_is_fatal() {
        let mut gateway = MockGateway {
            fail_listing: true,
            ..MockGateway::default()
        };
        let error = wipe_destination(&mut gateway, ROOT_ID).expect_err("must fail");
        assert!(matches!(error, SyncError::RemoteRejected { status: 400, .. }));
    }

    #[test]
    fn rebuild_threads_parent_ids_and_counts_groups() {
        let (_temp, root) = docs_fixture();
        let manifest =
            parse_manifest(&fs::read_to_string(root.join("docs.json")).expect("read manifest"))
                .expect("parse manifest");
        let tree = build_nav_tree(&manifest, &SourceResolver::with_default_ignores(&root));
        let mut gateway = MockGateway::default();

        let report = rebuild_tree(&mut gateway, &tree.nodes, ROOT_ID, &rebuild_options(&root))
            .expect("rebuild");

        let tab = gateway.created_by_title("Documentation");
        assert_eq!(tab.parent_id, ROOT_ID);
        assert!(tab.children.is_empty());
        let group = gateway.created_by_title("Getting Started");
        assert_eq!(group.parent_id, tab.id);

        let intro = gateway.created_by_title("Custom Name");
        assert_eq!(intro.parent_id, group.id);
        assert_eq!(intro.children.len(), 2);
        assert_eq!(
            intro.children[0]["paragraph"]["rich_text"][1]["text"]["link"]["url"],
            "https://docs.example.com/intro"
        );
        assert_eq!(code_text(intro), "---\ntitle: \"Custom Name\"\n---\n# Intro\n");

        let setup = gateway.created_by_title("setup");
        assert_eq!(setup.parent_id, group.id);

        assert_eq!(report.counters.total_pages, 4);
        assert_eq!(report.counters.per_group.get("Getting Started"), Some(&3));
        assert_eq!(report.counters.per_group.get("SDK"), Some(&1));
        assert!(report.errors.is_empty());

        let order = gateway
            .created
            .iter()
            .map(|call| call.title.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            order,
            vec!["Documentation", "Getting Started", "Custom Name", "setup", "index", "install"]
        );
    }

    #[test]
    fn hybrid_children_nest_under_the_content_page() {
        let (_temp, root) = docs_fixture();
        let manifest =
            parse_manifest(&fs::read_to_string(root.join("docs.json")).expect("read manifest"))
                .expect("parse manifest");
        let tree = build_nav_tree(&manifest, &SourceResolver::with_default_ignores(&root));
        let mut gateway = MockGateway::default();

        let report = rebuild_tree(&mut gateway, &tree.nodes, ROOT_ID, &rebuild_options(&root))
            .expect("rebuild");

        let group = gateway.created_by_title("Getting Started");
        let sdk_page = gateway.created_by_title("index");
        assert_eq!(sdk_page.parent_id, group.id);
        let install = gateway.created_by_title("install");
        assert_eq!(install.parent_id, sdk_page.id);
        assert!(gateway.created.iter().all(|call| call.title != "SDK"));

        let hybrid = report
            .nodes
            .iter()
            .find(|outcome| outcome.kind == NodeKind::Hybrid)
            .expect("hybrid outcome");
        assert_eq!(hybrid.source.as_deref(), Some("sdk/index.mdx"));
    }

    #[test]
    fn failed_section_skips_its_whole_subtree() {
        let temp = tempdir().expect("tempdir");
        write_file(&temp.path().join("a.md"), "a");
        write_file(&temp.path().join("b.md"), "b");
        let nodes = vec![
            NavNode::Tab(TabNode {
                title: "Broken".to_string(),
                children: vec![NavNode::Group(GroupNode {
                    title: "Inner".to_string(),
                    children: vec![NavNode::Page(PageNode {
                        title: "a".to_string(),
                        source: temp.path().join("a.md"),
                    })],
                })],
            }),
            NavNode::Tab(TabNode {
                title: "Healthy".to_string(),
                children: vec![NavNode::Group(GroupNode {
                    title: "Other".to_string(),
                    children: vec![NavNode::Page(PageNode {
                        title: "b".to_string(),
                        source: temp.path().join("b.md"),
                    })],
                })],
            }),
        ];
        let mut gateway = MockGateway::default();
        gateway.fail_create_titles.insert("Broken".to_string());

        let report = rebuild_tree(&mut gateway, &nodes, ROOT_ID, &rebuild_options(temp.path()))
            .expect("rebuild");

        assert_eq!(
            gateway.calls,
            vec![
                "create:Broken".to_string(),
                "create:Healthy".to_string(),
                "create:Other".to_string(),
                "create:b".to_string(),
            ]
        );
        let skipped = &report.nodes[0];
        assert_eq!(skipped.action, NodeAction::Skipped);
        assert_eq!(skipped.descendants_skipped, 2);
        assert_eq!(report.counters.total_pages, 1);
        assert_eq!(report.counters.per_group.get("Other"), Some(&1));
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn failed_content_page_does_not_stop_siblings() {
        let temp = tempdir().expect("tempdir");
        write_file(&temp.path().join("bad.md"), "bad");
        write_file(&temp.path().join("good.md"), "good");
        let nodes = vec![NavNode::Group(GroupNode {
            title: "G".to_string(),
            children: vec![
                NavNode::Page(PageNode {
                    title: "bad".to_string(),
                    source: temp.path().join("bad.md"),
                }),
                NavNode::Page(PageNode {
                    title: "gone".to_string(),
                    source: temp.path().join("gone.md"),
                }),
                NavNode::Page(PageNode {
                    title: "good".to_string(),
                    source: temp.path().join("good.md"),
                }),
            ],
        })];
        let mut gateway = MockGateway::default();
        gateway.fail_create_titles.insert("bad".to_string());

        let report = rebuild_tree(&mut gateway, &nodes, ROOT_ID, &rebuild_options(temp.path()))
            .expect("rebuild");

        assert_eq!(report.counters.total_pages, 1);
        assert_eq!(report.counters.per_group.get("G"), Some(&1));
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors[1].starts_with("gone.md:"));
        let actions = report
            .nodes
            .iter()
            .map(|outcome| (outcome.title.as_str(), outcome.action))
            .collect::<Vec<_>>();
        assert_eq!(
            actions,
            vec![
                ("G", NodeAction::Created),
                ("bad", NodeAction::Skipped),
                ("gone", NodeAction::Skipped),
                ("good", NodeAction::Created),
            ]
        );
    }

    #[test]
    fn failed_hybrid_page_skips_its_children() {
        let temp = tempdir().expect("tempdir");
        write_file(&temp.path().join("hub.md"), "---\ntitle: Hub\n---\n");
        write_file(&temp.path().join("spoke.md"), "spoke");
        write_file(&temp.path().join("after.md"), "after");
        let nodes = vec![NavNode::Group(GroupNode {
            title: "Outer".to_string(),
            children: vec![
                NavNode::Hybrid(HybridNode {
                    title: "Hub Group".to_string(),
                    source: temp.path().join("hub.md"),
                    children: vec![NavNode::Page(PageNode {
                        title: "spoke".to_string(),
                        source: temp.path().join("spoke.md"),
                    })],
                }),
                NavNode::Page(PageNode {
                    title: "after".to_string(),
                    source: temp.path().join("after.md"),
                }),
            ],
        })];
        let mut gateway = MockGateway::default();
        gateway.fail_create_titles.insert("Hub".to_string());

        let report = rebuild_tree(&mut gateway, &nodes, ROOT_ID, &rebuild_options(temp.path()))
            .expect("rebuild");

        assert_eq!(
            gateway.calls,
            vec![
                "create:Outer".to_string(),
                "create:Hub".to_string(),
                "create:after".to_string(),
            ]
        );
        let hybrid = &report.nodes[1];
        assert_eq!(hybrid.kind, NodeKind::Hybrid);
        assert_eq!(hybrid.action, NodeAction::Skipped);
        assert_eq!(hybrid.source.as_deref(), Some("hub.md"));
        assert_eq!(hybrid.descendants_skipped, 1);
        assert_eq!(report.counters.total_pages, 1);
        assert_eq!(report.counters.per_group.get("Outer"), Some(&1));
        assert_eq!(report.counters.per_group.get("Hub Group"), None);
    }

    #[test]
    fn import_directory_wipes_stamps_then_rebuilds() {
        let (_temp, root) = docs_fixture();
        let mut gateway = MockGateway::default();
        gateway.existing_children = vec![child("old", "page", "child_page")];

        let report =
            import_directory(&mut gateway, ROOT_RAW, &root, &import_options()).expect("import");

        assert_eq!(report.mode, ImportMode::Directory);
        assert_eq!(report.root_page_id, ROOT_ID);
        assert_eq!(report.wipe.archived, 1);
        assert_eq!(report.unresolved, vec!["guides/missing".to_string()]);
        assert_eq!(report.rebuild.counters.total_pages, 4);
        assert_eq!(report.request_count, gateway.request_count);

        assert_eq!(gateway.calls[0], format!("list:{ROOT_ID}"));
        assert_eq!(gateway.calls[1], "archive_page:old");
        assert_eq!(gateway.calls[2], format!("append:{ROOT_ID}"));
        assert_eq!(gateway.calls[3], "create:Documentation");

        let (block_id, blocks) = &gateway.appended[0];
        assert_eq!(block_id, ROOT_ID);
        assert_eq!(
            blocks[0]["paragraph"]["rich_text"][0]["text"]["content"],
            "Last updated: 2026-03-01 12:00:00\nCommit: deadbeef"
        );
    }

    #[test]
    fn invalid_root_aborts_before_any_remote_call() {
        let (_temp, root) = docs_fixture();
        let mut gateway = MockGateway::default();

        let error = import_directory(&mut gateway, "not-a-page", &root, &import_options())
            .expect_err("must fail");

        assert!(matches!(
            error.downcast_ref::<SyncError>(),
            Some(SyncError::InvalidIdentifier(_))
        ));
        assert_eq!(gateway.request_count, 0);
    }

    #[test]
    fn missing_manifest_aborts_before_any_remote_call() {
        let temp = tempdir().expect("tempdir");
        let mut gateway = MockGateway::default();

        let error = import_directory(&mut gateway, ROOT_ID, temp.path(), &import_options())
            .expect_err("must fail");

        assert!(error.to_string().contains("docs.json not found"));
        assert_eq!(gateway.request_count, 0);
    }

    #[test]
    fn stamp_failure_aborts_before_rebuild() {
        let (_temp, root) = docs_fixture();
        let mut gateway = MockGateway {
            fail_append: true,
            ..MockGateway::default()
        };

        let error =
            import_directory(&mut gateway, ROOT_ID, &root, &import_options()).expect_err("fail");
        assert!(error.to_string().contains("failed to update the root page"));
        assert!(gateway.created.is_empty());
    }

    #[test]
    fn oversized_file_aborts_directory_import() {
        let (_temp, root) = docs_fixture();
        write_file(&root.join("guides/setup.md"), &"x".repeat(100));
        let mut options = import_options();
        options.segment_limits = SegmentLimits {
            max_len: 10,
            max_segments: 5,
        };
        let mut gateway = MockGateway::default();

        let error = import_directory(&mut gateway, ROOT_ID, &root, &options).expect_err("fail");

        assert!(error.chain().any(|cause| matches!(
            cause.downcast_ref::<SyncError>(),
            Some(SyncError::ContentTooLarge { .. })
        )));
        assert!(gateway.created.iter().all(|call| call.title != "install"));
    }

    #[test]
    fn empty_navigation_still_wipes_and_stamps() {
        let temp = tempdir().expect("tempdir");
        write_file(
            &temp.path().join("docs.json"),
            r#"{"navigation": {"tabs": [{"tab": "API", "openapi": "x.json"}]}}"#,
        );
        let mut gateway = MockGateway::default();
        gateway.existing_children = vec![child("b", "block", "paragraph")];

        let report =
            import_directory(&mut gateway, ROOT_ID, temp.path(), &import_options()).expect("ok");

        assert_eq!(report.wipe.archived, 1);
        assert_eq!(gateway.appended.len(), 1);
        assert_eq!(report.rebuild.counters.total_pages, 0);
        assert!(gateway.created.is_empty());
    }

    #[test]
    fn single_file_import_creates_one_page_under_root() {
        let temp = tempdir().expect("tempdir");
        let file = temp.path().join("nested").join("changelog.md");
        write_file(&file, "# Changes\n");
        let mut gateway = MockGateway::default();

        let report = import_path(&mut gateway, ROOT_ID, &file, &import_options()).expect("ok");

        assert_eq!(report.mode, ImportMode::File);
        assert_eq!(report.rebuild.counters.total_pages, 1);
        assert_eq!(gateway.created.len(), 1);
        let page = &gateway.created[0];
        assert_eq!(page.parent_id, ROOT_ID);
        assert_eq!(page.title, "changelog");
        assert_eq!(
            page.children[0]["paragraph"]["rich_text"][1]["text"]["content"],
            "https://docs.example.com/changelog"
        );
        assert_eq!(gateway.appended.len(), 1);
    }

    #[test]
    fn single_file_remote_failure_is_fatal() {
        let temp = tempdir().expect("tempdir");
        let file = temp.path().join("page.md");
        write_file(&file, "---\ntitle: Broken\n---\n");
        let mut gateway = MockGateway::default();
        gateway.fail_create_titles.insert("Broken".to_string());

        let error =
            import_single_file(&mut gateway, ROOT_ID, &file, &import_options()).expect_err("fail");
        assert!(error.to_string().contains("failed to create page"));
    }

    #[test]
    fn missing_path_is_an_error() {
        let temp = tempdir().expect("tempdir");
        let mut gateway = MockGateway::default();
        let error = import_path(
            &mut gateway,
            ROOT_ID,
            &temp.path().join("nowhere"),
            &import_options(),
        )
        .expect_err("must fail");
        assert!(error.to_string().contains("path not found"));
        assert_eq!(gateway.request_count, 0);
    }
}
