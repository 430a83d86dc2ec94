use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

pub const DEFAULT_IGNORED_DIRS: &[&str] = &["node_modules", "img", "imgs", "images", "scripts"];

/// Probe order for slugs without an extension.
pub const CONTENT_EXTENSIONS: [&str; 2] = ["mdx", "md"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(PathBuf),
    /// First path component is in the ignore set.
    Ignored(String),
    Unresolved,
}

/// Maps manifest page slugs onto markdown files below a docs root.
#[derive(Debug, Clone)]
pub struct SourceResolver {
    root: PathBuf,
    ignored_dirs: BTreeSet<String>,
}

impl SourceResolver {
    pub fn new<I, S>(root: impl Into<PathBuf>, ignored_dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            root: root.into(),
            ignored_dirs: ignored_dirs.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_default_ignores(root: impl Into<PathBuf>) -> Self {
        Self::new(root, DEFAULT_IGNORED_DIRS.iter().copied())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, slug: &str) -> Resolution {
        let Some(segments) = slug_segments(slug) else {
            return Resolution::Unresolved;
        };
        let Some(first) = segments.first() else {
            return Resolution::Unresolved;
        };
        if self.ignored_dirs.contains(*first) {
            return Resolution::Ignored((*first).to_string());
        }

        let mut relative = PathBuf::new();
        for segment in &segments {
            relative.push(segment);
        }

        if has_content_extension(&relative) {
            let candidate = self.root.join(&relative);
            if candidate.is_file() {
                return Resolution::Found(candidate);
            }
            return Resolution::Unresolved;
        }

        let joined = segments.join("/");
        for extension in CONTENT_EXTENSIONS {
            let candidate = self.root.join(format!("{joined}.{extension}"));
            if candidate.is_file() {
                return Resolution::Found(candidate);
            }
        }
        Resolution::Unresolved
    }
}

/// Slug path segments, or `None` when the slug would leave the docs root.
fn slug_segments(slug: &str) -> Option<Vec<&str>> {
    let mut segments = Vec::new();
    for segment in slug.trim().split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => return None,
            other => {
                if Path::new(other)
                    .components()
                    .any(|component| !matches!(component, Component::Normal(_)))
                {
                    return None;
                }
                segments.push(other);
            }
        }
    }
    Some(segments)
}

pub fn has_content_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            CONTENT_EXTENSIONS
                .iter()
                .any(|known| extension.eq_ignore_ascii_case(known))
        })
}

/// Public docs URL for a file: its root-relative path without extension,
/// appended to `base_url`.
pub fn docs_url(base_url: &str, root: &Path, file: &Path) -> String {
    let relative = match file.strip_prefix(root) {
        Ok(relative) => relative.with_extension(""),
        Err(_) => file.file_stem().map(PathBuf::from).unwrap_or_default(),
    };
    let posix = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");
    format!("{}/{}", base_url.trim_end_matches('/'), posix)
}
