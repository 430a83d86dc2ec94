use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::manifest::{GroupEntry, Manifest, PageEntry};
use crate::resolve::{Resolution, SourceResolver};

const UNTITLED_TAB: &str = "Untitled tab";
const UNTITLED_GROUP: &str = "Untitled group";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Tab,
    Group,
    Page,
    Hybrid,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tab => "tab",
            Self::Group => "group",
            Self::Page => "page",
            Self::Hybrid => "hybrid",
        }
    }
}

/// Navigation tree element. Structural variants always carry children and
/// file-backed variants always carry a source path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavNode {
    Tab(TabNode),
    Group(GroupNode),
    Page(PageNode),
    Hybrid(HybridNode),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabNode {
    pub title: String,
    pub children: Vec<NavNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupNode {
    pub title: String,
    pub children: Vec<NavNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageNode {
    pub title: String,
    pub source: PathBuf,
}

/// A group whose landing page is itself a content file; children nest under
/// that page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HybridNode {
    pub title: String,
    pub source: PathBuf,
    pub children: Vec<NavNode>,
}

impl NavNode {
    pub fn title(&self) -> &str {
        match self {
            Self::Tab(node) => &node.title,
            Self::Group(node) => &node.title,
            Self::Page(node) => &node.title,
            Self::Hybrid(node) => &node.title,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Tab(_) => NodeKind::Tab,
            Self::Group(_) => NodeKind::Group,
            Self::Page(_) => NodeKind::Page,
            Self::Hybrid(_) => NodeKind::Hybrid,
        }
    }

    pub fn source(&self) -> Option<&Path> {
        match self {
            Self::Page(node) => Some(&node.source),
            Self::Hybrid(node) => Some(&node.source),
            Self::Tab(_) | Self::Group(_) => None,
        }
    }

    pub fn children(&self) -> &[NavNode] {
        match self {
            Self::Tab(node) => &node.children,
            Self::Group(node) => &node.children,
            Self::Hybrid(node) => &node.children,
            Self::Page(_) => &[],
        }
    }

    /// Title that pages below this node are counted under.
    pub fn group_scope(&self) -> Option<&str> {
        match self {
            Self::Group(node) => Some(&node.title),
            Self::Hybrid(node) => Some(&node.title),
            Self::Tab(_) | Self::Page(_) => None,
        }
    }

    /// File-backed nodes in this subtree, including this one.
    pub fn content_count(&self) -> usize {
        let own = usize::from(self.source().is_some());
        own + self
            .children()
            .iter()
            .map(NavNode::content_count)
            .sum::<usize>()
    }

    /// Nodes strictly below this one.
    pub fn descendant_count(&self) -> usize {
        self.children()
            .iter()
            .map(|child| 1 + child.descendant_count())
            .sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct NavTree {
    pub nodes: Vec<NavNode>,
    pub unresolved: Vec<String>,
    pub ignored: Vec<String>,
    pub dropped_groups: Vec<String>,
    pub dropped_tabs: Vec<String>,
}

impl NavTree {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn content_count(&self) -> usize {
        self.nodes.iter().map(NavNode::content_count).sum()
    }

    /// Indented outline of the tree, with source paths relative to `root`.
    pub fn render(&self, root: &Path) -> String {
        let mut output = String::new();
        for node in &self.nodes {
            render_node(node, root, 0, &mut output);
        }
        output
    }
}

fn render_node(node: &NavNode, root: &Path, depth: usize, output: &mut String) {
    let indent = "  ".repeat(depth);
    let _ = write!(output, "{indent}[{}] {}", node.kind().as_str(), node.title());
    if let Some(source) = node.source() {
        let display = source.strip_prefix(root).unwrap_or(source);
        let _ = write!(output, " -> {}", display.to_string_lossy().replace('\\', "/"));
    }
    output.push('\n');
    for child in node.children() {
        render_node(child, root, depth + 1, output);
    }
}

/// Convert the manifest navigation into a pruned tree. Unresolvable pages,
/// empty groups and empty tabs are dropped and recorded on the result.
pub fn build_nav_tree(manifest: &Manifest, resolver: &SourceResolver) -> NavTree {
    let mut builder = TreeBuilder {
        resolver,
        tree: NavTree::default(),
    };

    for tab in &manifest.navigation.tabs {
        let title = non_empty_or(tab.tab.as_deref(), UNTITLED_TAB);
        let groups = match &tab.groups {
            Some(groups) if !groups.is_empty() => groups,
            _ => {
                debug!(tab = %title, "tab has no groups, skipping");
                continue;
            }
        };

        let children = groups
            .iter()
            .filter_map(|group| builder.build_group(group))
            .collect::<Vec<_>>();
        if children.is_empty() {
            info!(tab = %title, "tab has no usable groups, skipping");
            builder.tree.dropped_tabs.push(title);
            continue;
        }

        builder
            .tree
            .nodes
            .push(NavNode::Tab(TabNode { title, children }));
    }

    builder.tree
}

struct TreeBuilder<'a> {
    resolver: &'a SourceResolver,
    tree: NavTree,
}

impl TreeBuilder<'_> {
    fn build_group(&mut self, entry: &GroupEntry) -> Option<NavNode> {
        let title = non_empty_or(entry.group.as_deref(), UNTITLED_GROUP);

        let mut children = Vec::new();
        for page in &entry.pages {
            match page {
                PageEntry::Slug(slug) => {
                    if let Some(source) = self.resolve(slug) {
                        children.push(NavNode::Page(PageNode {
                            title: slug_name(slug),
                            source,
                        }));
                    }
                }
                PageEntry::Group(nested) => {
                    if let Some(node) = self.build_group(nested) {
                        children.push(node);
                    }
                }
                PageEntry::Other(value) => {
                    warn!(group = %title, entry = %value, "unrecognized pages entry, skipping");
                }
            }
        }

        let root = entry.root.as_deref().and_then(|slug| self.resolve(slug));
        match (root, children.is_empty()) {
            (Some(source), true) => Some(NavNode::Page(PageNode { title, source })),
            (Some(source), false) => Some(NavNode::Hybrid(HybridNode {
                title,
                source,
                children,
            })),
            (None, false) => Some(NavNode::Group(GroupNode { title, children })),
            (None, true) => {
                info!(group = %title, "group has no usable children, skipping");
                self.tree.dropped_groups.push(title);
                None
            }
        }
    }

    fn resolve(&mut self, slug: &str) -> Option<PathBuf> {
        match self.resolver.resolve(slug) {
            Resolution::Found(path) => Some(path),
            Resolution::Ignored(dir) => {
                info!(slug, dir = %dir, "slug under ignored root dir, skipping");
                self.tree.ignored.push(slug.to_string());
                None
            }
            Resolution::Unresolved => {
                let error = SyncError::UnresolvedSource(slug.to_string());
                warn!(root = %self.resolver.root().display(), "{error}");
                self.tree.unresolved.push(slug.to_string());
                None
            }
        }
    }
}

fn non_empty_or(value: Option<&str>, fallback: &str) -> String {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => fallback.to_string(),
    }
}

fn slug_name(slug: &str) -> String {
    slug.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(slug)
        .to_string()
}
