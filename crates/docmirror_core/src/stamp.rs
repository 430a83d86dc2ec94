use std::path::Path;
use std::process::Command;

use chrono::Local;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::pages::paragraph_block;

pub const UNKNOWN_REVISION: &str = "(unknown)";

/// Provenance block appended under the destination root on every run.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RootStamp {
    pub updated_at: String,
    pub revision: String,
}

impl RootStamp {
    /// Local wall-clock time plus the git revision checked out in `dir`.
    pub fn capture(dir: &Path) -> Self {
        Self {
            updated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            revision: git_revision(dir).unwrap_or_else(|| UNKNOWN_REVISION.to_string()),
        }
    }

    pub fn text(&self) -> String {
        format!("Last updated: {}\nCommit: {}", self.updated_at, self.revision)
    }

    pub fn block(&self) -> Value {
        paragraph_block(&self.text())
    }
}

fn git_revision(dir: &Path) -> Option<String> {
    let output = Command::new("git")
        .arg("rev-parse")
        .arg("HEAD")
        .current_dir(dir)
        .output();
    match output {
        Ok(output) if output.status.success() => {
            let revision = String::from_utf8_lossy(&output.stdout).trim().to_string();
            (!revision.is_empty()).then_some(revision)
        }
        Ok(output) => {
            debug!(status = %output.status, "git rev-parse failed");
            None
        }
        Err(error) => {
            debug!(%error, "git is not available");
            None
        }
    }
}
