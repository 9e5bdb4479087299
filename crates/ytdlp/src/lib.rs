//! Async bridge around the `yt-dlp` command-line tool.
//!
//! The rest of the workspace never talks to YouTube's media endpoints
//! directly; everything goes through the [`MediaExtractor`] trait, which
//! exposes three operations:
//!
//! - [`MediaExtractor::info`] — resolve a URL to a single-item
//!   [`MediaInfo`] (title, container, reported size),
//! - [`MediaExtractor::stream`] — open a live byte stream of the selected
//!   format, piped from the tool's stdout,
//! - [`MediaExtractor::download`] — run a file-mode download into a
//!   directory, reporting progress as the tool prints it.
//!
//! Any concrete implementation (this subprocess bridge, or a stub in tests)
//! can be substituted without the callers changing.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc;

pub mod error;
pub mod progress;
pub mod runner;
pub mod selector;
pub mod stream;

pub use error::ExtractError;
pub use progress::ProgressEvent;
pub use runner::YtDlpExtractor;
pub use selector::{Quality, format_selector};
pub use stream::MediaByteStream;

/// A single extraction request: the submitted URL, the format selector to
/// hand to the tool, and an optional cookie file already materialized on
/// disk by the caller.
#[derive(Debug, Clone)]
pub struct ExtractRequest {
    pub url: String,
    pub selector: String,
    pub cookies: Option<PathBuf>,
}

impl ExtractRequest {
    pub fn new(url: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            selector: selector.into(),
            cookies: None,
        }
    }

    pub fn with_cookies(mut self, cookies: PathBuf) -> Self {
        self.cookies = Some(cookies);
        self
    }
}

/// Resolved metadata for a single video, as reported by the tool for the
/// requested format selection.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaInfo {
    /// Upstream video identifier.
    pub id: String,
    /// Video title, used to derive the download filename.
    pub title: String,
    /// Container extension of the selected format (`mp4`, `webm`, ...).
    pub ext: String,
    /// Exact or approximate size in bytes, when the tool knows it up front.
    /// Adaptively-muxed streams often have no size until fully read.
    pub filesize: Option<u64>,
    /// Duration in seconds, when reported.
    pub duration_secs: Option<f64>,
}

/// Outcome of a file-mode download.
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    /// Bare filename (no directory components).
    pub filename: String,
    /// Full path of the written file.
    pub path: PathBuf,
}

/// The extraction capability used by the download orchestrator.
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Resolve a URL to metadata for a single item. Collections
    /// (playlists) are rejected with [`ExtractError::Playlist`].
    async fn info(&self, req: &ExtractRequest) -> Result<MediaInfo, ExtractError>;

    /// Open a byte stream of the selected format. The caller drives the
    /// stream chunk by chunk and finalizes it with
    /// [`MediaByteStream::finish`] to learn the terminal outcome.
    async fn stream(&self, req: &ExtractRequest) -> Result<Box<dyn MediaByteStream>, ExtractError>;

    /// Download the selected format into `dest_dir`, sending progress
    /// events as the tool reports them. Returns the written file.
    async fn download(
        &self,
        req: &ExtractRequest,
        dest_dir: &Path,
        progress: mpsc::Sender<ProgressEvent>,
    ) -> Result<DownloadedFile, ExtractError>;
}
