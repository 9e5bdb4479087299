//! Subprocess plumbing: binary discovery, argument construction, and the
//! concrete [`MediaExtractor`] implementation.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{ExtractError, classify_stderr};
use crate::progress::{ProgressEvent, ProgressLine, parse_line};
use crate::stream::{MediaByteStream, YtDlpStream};
use crate::{DownloadedFile, ExtractRequest, MediaExtractor, MediaInfo};

/// Well-known install locations checked before falling back to `PATH`.
const COMMON_PATHS: &[&str] = &[
    "/opt/homebrew/bin/yt-dlp",
    "/usr/local/bin/yt-dlp",
    "/usr/bin/yt-dlp",
];

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Suppress the console window for child processes on Windows; no-op
/// elsewhere.
fn no_window(cmd: &mut Command) {
    #[cfg(windows)]
    {
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
    #[cfg(not(windows))]
    {
        let _ = cmd;
    }
}

/// Locate the yt-dlp binary: explicit override, well-known paths, then a
/// scan of `PATH`. Returns `None` when nothing is found; the caller still
/// attempts a bare `yt-dlp` spawn so a late install keeps working.
pub fn locate_ytdlp() -> Option<PathBuf> {
    if let Ok(bin) = std::env::var("YTDLP_BIN")
        && !bin.trim().is_empty()
    {
        return Some(PathBuf::from(bin));
    }

    for candidate in COMMON_PATHS {
        let path = Path::new(candidate);
        if path.exists() {
            return Some(path.to_path_buf());
        }
    }

    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(if cfg!(windows) { "yt-dlp.exe" } else { "yt-dlp" });
        if candidate.exists() {
            return Some(candidate);
        }
    }

    None
}

/// The yt-dlp subprocess bridge.
pub struct YtDlpExtractor {
    bin: Option<PathBuf>,
}

impl YtDlpExtractor {
    /// Create an extractor that resolves the binary per invocation.
    pub fn new() -> Self {
        Self { bin: None }
    }

    /// Create an extractor pinned to an explicit binary path.
    pub fn with_binary(bin: PathBuf) -> Self {
        Self { bin: Some(bin) }
    }

    fn resolve_bin(&self) -> PathBuf {
        self.bin
            .clone()
            .or_else(locate_ytdlp)
            .unwrap_or_else(|| PathBuf::from("yt-dlp"))
    }

    /// Base invocation shared by all modes: format selector, single-item
    /// discipline, and the timeouts/retries carried over from the original
    /// service's tool invocation.
    fn base_command(&self, req: &ExtractRequest) -> Command {
        let mut cmd = Command::new(self.resolve_bin());
        no_window(&mut cmd);
        cmd.arg("-f")
            .arg(&req.selector)
            .arg("--no-playlist")
            .arg("--no-warnings")
            .args(["--socket-timeout", "15"])
            .args(["--retries", "2"]);
        if let Some(cookies) = &req.cookies {
            cmd.arg("--cookies").arg(cookies);
        }
        cmd.kill_on_drop(true);
        cmd
    }

    fn spawn(mut cmd: Command) -> Result<Child, ExtractError> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd.spawn().map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                ExtractError::ToolNotFound
            } else {
                ExtractError::Io(e)
            }
        })
    }

    /// Drain a child's stderr on a background task so the pipe never
    /// blocks the producer; the collected text feeds classification.
    fn collect_stderr(child: &mut Child) -> JoinHandle<String> {
        let stderr = child.stderr.take();
        tokio::spawn(async move {
            let mut out = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut out).await;
            }
            out
        })
    }
}

impl Default for YtDlpExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaExtractor for YtDlpExtractor {
    async fn info(&self, req: &ExtractRequest) -> Result<MediaInfo, ExtractError> {
        let mut cmd = self.base_command(req);
        // -J emits one JSON document even for collections, which is what
        // lets us detect and reject playlists up front.
        cmd.arg("-J").arg(&req.url);

        let mut child = Self::spawn(cmd)?;
        let stderr_task = Self::collect_stderr(&mut child);

        let mut stdout = String::new();
        if let Some(mut out) = child.stdout.take() {
            out.read_to_string(&mut stdout).await?;
        }

        let status = child.wait().await?;
        let stderr = stderr_task.await.unwrap_or_default();

        if !status.success() {
            debug!(url = %req.url, code = ?status.code(), "yt-dlp info failed");
            return Err(classify_stderr(&stderr));
        }

        parse_info(&stdout)
    }

    async fn stream(&self, req: &ExtractRequest) -> Result<Box<dyn MediaByteStream>, ExtractError> {
        let mut cmd = self.base_command(req);
        cmd.args(["-o", "-"]).arg(&req.url);

        let mut child = Self::spawn(cmd)?;
        let stderr_task = Self::collect_stderr(&mut child);
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExtractError::Io(std::io::Error::other("child stdout not captured")))?;

        debug!(url = %req.url, selector = %req.selector, "yt-dlp stream started");
        Ok(Box::new(YtDlpStream::new(child, stdout, stderr_task)))
    }

    async fn download(
        &self,
        req: &ExtractRequest,
        dest_dir: &Path,
        progress: mpsc::Sender<ProgressEvent>,
    ) -> Result<DownloadedFile, ExtractError> {
        let mut cmd = self.base_command(req);
        cmd.arg("--newline")
            .arg("-P")
            .arg(dest_dir)
            .args(["-o", "%(title)s.%(ext)s"])
            .arg(&req.url);

        let mut child = Self::spawn(cmd)?;
        let stderr_task = Self::collect_stderr(&mut child);
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExtractError::Io(std::io::Error::other("child stdout not captured")))?;

        let mut destination: Option<String> = None;
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match parse_line(&line) {
                Some(ProgressLine::Percent(percent)) => {
                    // Receiver lagging or gone is not a download failure.
                    let _ = progress.try_send(ProgressEvent { percent });
                }
                Some(ProgressLine::Destination(path))
                | Some(ProgressLine::AlreadyDownloaded(path)) => {
                    destination = Some(path);
                }
                None => {}
            }
        }

        let status = child.wait().await?;
        let stderr = stderr_task.await.unwrap_or_default();

        if !status.success() {
            warn!(url = %req.url, code = ?status.code(), "yt-dlp download failed");
            return Err(classify_stderr(&stderr));
        }

        let destination = destination
            .ok_or_else(|| ExtractError::Parse("tool reported no destination file".to_string()))?;
        let path = PathBuf::from(&destination);
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or(destination);

        Ok(DownloadedFile { filename, path })
    }
}

/// Parse `-J` output into [`MediaInfo`], rejecting collections.
fn parse_info(stdout: &str) -> Result<MediaInfo, ExtractError> {
    let json: serde_json::Value =
        serde_json::from_str(stdout.trim()).map_err(|e| ExtractError::Parse(e.to_string()))?;

    if json["_type"].as_str() == Some("playlist") || json.get("entries").is_some() {
        return Err(ExtractError::Playlist);
    }

    let id = json["id"]
        .as_str()
        .ok_or_else(|| ExtractError::Parse("missing video id".to_string()))?
        .to_string();
    let title = json["title"].as_str().unwrap_or("video").to_string();

    // With `-f`, the selected format lands under requested_downloads;
    // fall back to the top-level fields for older tool versions.
    let selected = json["requested_downloads"]
        .as_array()
        .and_then(|arr| arr.first())
        .unwrap_or(&json);

    let ext = selected["ext"]
        .as_str()
        .or_else(|| json["ext"].as_str())
        .unwrap_or("mp4")
        .to_string();
    let filesize = selected["filesize"]
        .as_u64()
        .or_else(|| selected["filesize_approx"].as_u64())
        .or_else(|| json["filesize"].as_u64())
        .or_else(|| json["filesize_approx"].as_u64());
    let duration_secs = json["duration"].as_f64();

    Ok(MediaInfo {
        id,
        title,
        ext,
        filesize,
        duration_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extractor_is_usable_as_a_trait_object() {
        let extractor: std::sync::Arc<dyn MediaExtractor> =
            std::sync::Arc::new(YtDlpExtractor::new());
        drop(extractor);
    }

    #[test]
    fn parses_single_video_info() {
        let raw = r#"{
            "id": "dQw4w9WgXcQ",
            "title": "Never Gonna Give You Up",
            "ext": "webm",
            "duration": 212.0,
            "requested_downloads": [
                {"ext": "mp4", "filesize": 1048576}
            ]
        }"#;
        let info = parse_info(raw).unwrap();
        assert_eq!(info.id, "dQw4w9WgXcQ");
        assert_eq!(info.title, "Never Gonna Give You Up");
        assert_eq!(info.ext, "mp4");
        assert_eq!(info.filesize, Some(1_048_576));
        assert_eq!(info.duration_secs, Some(212.0));
    }

    #[test]
    fn falls_back_to_top_level_format_fields() {
        let raw = r#"{"id": "abc12345678", "title": "t", "ext": "webm", "filesize_approx": 42}"#;
        let info = parse_info(raw).unwrap();
        assert_eq!(info.ext, "webm");
        assert_eq!(info.filesize, Some(42));
    }

    #[test]
    fn rejects_playlists() {
        let raw = r#"{"_type": "playlist", "id": "PL123", "title": "mix", "entries": []}"#;
        assert!(matches!(parse_info(raw), Err(ExtractError::Playlist)));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(parse_info("not json"), Err(ExtractError::Parse(_))));
    }

    #[test]
    fn missing_size_is_none() {
        let raw = r#"{"id": "abc12345678", "title": "t", "ext": "mp4"}"#;
        let info = parse_info(raw).unwrap();
        assert_eq!(info.filesize, None);
    }
}
