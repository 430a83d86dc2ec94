use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by the mirror pipeline and the store gateway.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(
        "'{0}' does not contain a valid 32-character page id; copy the full id from the page URL"
    )]
    InvalidIdentifier(String),

    #[error(
        "text is too long for a single block: needs {needed} segments of {max_len} characters, limit is {max_segments}"
    )]
    ContentTooLarge {
        needed: usize,
        max_len: usize,
        max_segments: usize,
    },

    #[error("remote store rejected request with HTTP {status}: {body}")]
    RemoteRejected { status: u16, body: String },

    #[error("could not resolve '{0}' to a markdown file")]
    UnresolvedSource(String),

    #[error("failed to read {}: {source}", path.display())]
    ReadSource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to call remote store: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected remote store response: {0}")]
    Decode(#[from] serde_json::Error),
}

