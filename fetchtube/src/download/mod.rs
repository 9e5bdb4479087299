//! Download orchestration.
//!
//! Two modes share one [`DownloadManager`]:
//!
//! - **job mode** — a POST creates a ledger record and spawns a background
//!   task that downloads the file into the configured directory, feeding
//!   real tool-reported progress back into the record;
//! - **stream mode** — a GET opens a live byte stream piped straight from
//!   the extraction tool to the response body. The first chunk is awaited
//!   before any headers go out, so pre-stream failures still produce a
//!   structured error response.
//!
//! Every download in either mode is tracked in the ledger from creation
//! to a terminal `completed` or `failed` status.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use futures::SinkExt;
use futures::channel::mpsc as byte_mpsc;
use tempfile::NamedTempFile;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use ytdlp::{
    ExtractRequest, MediaByteStream, MediaExtractor, ProgressEvent, Quality, format_selector,
};

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::ledger::{DownloadLedger, DownloadRecord, DownloadUpdate};
use crate::utils::sanitize_filename;
use crate::youtube::url;

/// Buffered chunks between the pump task and the response body.
const STREAM_BUFFER_CHUNKS: usize = 8;

/// A validated download request: trimmed URL plus parsed quality.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub url: String,
    pub quality: Quality,
}

/// Everything a handler needs to serve a stream-mode download response.
pub struct MediaDownload {
    /// The ledger record created for this stream.
    pub record: DownloadRecord,
    /// Sanitized attachment filename, extension included.
    pub filename: String,
    /// `video/mp4` or `video/webm`, from the selected container.
    pub content_type: &'static str,
    /// Reported size, when the tool knows it up front.
    pub content_length: Option<u64>,
    /// Chunked body; implements `Stream<Item = io::Result<Bytes>>`.
    pub body: byte_mpsc::Receiver<io::Result<Bytes>>,
}

/// Orchestrates downloads against a [`MediaExtractor`], recording every
/// attempt in the shared ledger.
#[derive(Clone)]
pub struct DownloadManager {
    ledger: Arc<DownloadLedger>,
    extractor: Arc<dyn MediaExtractor>,
    cookies: Option<String>,
    download_dir: PathBuf,
}

impl DownloadManager {
    pub fn new(
        ledger: Arc<DownloadLedger>,
        extractor: Arc<dyn MediaExtractor>,
        config: &AppConfig,
    ) -> Self {
        Self {
            ledger,
            extractor,
            cookies: config.cookies.clone(),
            download_dir: config.download_dir.clone(),
        }
    }

    pub fn ledger(&self) -> &Arc<DownloadLedger> {
        &self.ledger
    }

    /// Validate a submitted URL and quality label. Nothing is recorded in
    /// the ledger for a request that fails here.
    pub fn validate(&self, raw_url: &str, raw_quality: &str) -> Result<ValidatedRequest> {
        let trimmed = raw_url.trim();
        if trimmed.is_empty() {
            return Err(Error::validation("URL is required"));
        }
        if !url::is_well_formed(trimmed) || !url::is_valid(trimmed) {
            return Err(Error::validation("Invalid YouTube URL"));
        }

        let quality = raw_quality
            .parse::<Quality>()
            .map_err(|e| Error::validation(e.to_string()))?;

        Ok(ValidatedRequest {
            url: trimmed.to_string(),
            quality,
        })
    }

    /// Job mode: record the download and run it in the background. Returns
    /// the freshly created record; progress and the terminal status land in
    /// the ledger as the job runs.
    pub fn start_download(&self, raw_url: &str, raw_quality: &str) -> Result<DownloadRecord> {
        let request = self.validate(raw_url, raw_quality)?;
        let record = self
            .ledger
            .create(&request.url, request.quality.label());

        info!(id = record.id, url = %request.url, quality = %request.quality, "download job started");

        let manager = self.clone();
        let id = record.id;
        tokio::spawn(async move {
            if let Err(e) = manager.execute_job(id, &request).await {
                error!(id, error = %e, "download job failed");
                manager.ledger.update(id, DownloadUpdate::failed());
            }
        });

        Ok(record)
    }

    async fn execute_job(&self, id: u64, request: &ValidatedRequest) -> Result<()> {
        let cookie_file = self.materialize_cookies()?;
        let mut extract = ExtractRequest::new(&request.url, format_selector(request.quality));
        if let Some(file) = &cookie_file {
            extract = extract.with_cookies(file.path().to_path_buf());
        }

        tokio::fs::create_dir_all(&self.download_dir).await?;

        // Resolve metadata first so playlists and unavailable videos fail
        // before any bytes move.
        let info = self.extractor.info(&extract).await?;
        debug!(id, title = %info.title, ext = %info.ext, "media resolved");

        let (tx, mut rx) = mpsc::channel::<ProgressEvent>(32);
        let ledger = Arc::clone(&self.ledger);
        let forward = tokio::spawn(async move {
            // Progress never goes backwards, and 100 is reserved for the
            // terminal completed update.
            let mut last: u8 = 0;
            while let Some(event) = rx.recv().await {
                let percent = event.percent.clamp(0.0, 99.0) as u8;
                if percent > last {
                    last = percent;
                    ledger.update(id, DownloadUpdate::progress(percent));
                }
            }
        });

        let outcome = self
            .extractor
            .download(&extract, &self.download_dir, tx)
            .await;
        let _ = forward.await;

        let file = outcome?;
        info!(id, filename = %file.filename, "download job completed");
        self.ledger.update(id, DownloadUpdate::completed(file.filename));
        Ok(())
    }

    /// Stream mode: open a live byte stream for the request. On success the
    /// first chunk has already been read, so the caller can commit response
    /// headers knowing the tool produced output. On failure the ledger
    /// record is already marked failed.
    pub async fn open_stream(&self, raw_url: &str, raw_quality: &str) -> Result<MediaDownload> {
        let request = self.validate(raw_url, raw_quality)?;
        let record = self
            .ledger
            .create(&request.url, request.quality.label());
        let id = record.id;

        info!(id, url = %request.url, quality = %request.quality, "stream download started");

        match self.open_stream_inner(id, &request).await {
            Ok(download) => Ok(download),
            Err(e) => {
                self.ledger.update(id, DownloadUpdate::failed());
                Err(e)
            }
        }
    }

    async fn open_stream_inner(
        &self,
        id: u64,
        request: &ValidatedRequest,
    ) -> Result<MediaDownload> {
        let cookie_file = self.materialize_cookies()?;
        let mut extract = ExtractRequest::new(&request.url, format_selector(request.quality));
        if let Some(file) = &cookie_file {
            extract = extract.with_cookies(file.path().to_path_buf());
        }

        let info = self.extractor.info(&extract).await?;
        let filename = format!("{}.{}", sanitize_filename(&info.title), info.ext);
        let content_type = content_type_for_ext(&info.ext);

        let mut stream = self.extractor.stream(&extract).await?;

        // Peek the first chunk before committing to a response.
        let first = match stream.next_chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => {
                // Tool exited before producing any output; its exit status
                // says why.
                stream.finish().await?;
                return Err(Error::upstream("extraction produced no output"));
            }
            Err(e) => {
                stream.abort().await;
                return Err(e.into());
            }
        };

        let (tx, rx) = byte_mpsc::channel(STREAM_BUFFER_CHUNKS);
        let ledger = Arc::clone(&self.ledger);
        let pump_filename = filename.clone();
        let total = info.filesize;
        tokio::spawn(async move {
            // The cookie file must outlive the child process reading it.
            let _cookie_file = cookie_file;
            pump_stream(stream, first, tx, ledger, id, pump_filename, total).await;
        });

        let record = self
            .ledger
            .get(id)
            .ok_or_else(|| Error::not_found("download", id.to_string()))?;

        Ok(MediaDownload {
            record,
            filename,
            content_type,
            content_length: info.filesize,
            body: rx,
        })
    }

    /// Write the configured cookie blob to a temporary file. The file is
    /// deleted when the returned guard drops.
    fn materialize_cookies(&self) -> Result<Option<NamedTempFile>> {
        let Some(content) = &self.cookies else {
            return Ok(None);
        };
        let mut file = NamedTempFile::new()?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
        Ok(Some(file))
    }
}

/// Forward chunks from the extraction stream into the response channel,
/// then settle the ledger record. A send failure means the client went
/// away; the producer is torn down and the record marked failed. When the
/// total size is known up front, byte counts become ledger progress as
/// chunks flow.
async fn pump_stream(
    mut stream: Box<dyn MediaByteStream>,
    first: Bytes,
    mut tx: byte_mpsc::Sender<io::Result<Bytes>>,
    ledger: Arc<DownloadLedger>,
    id: u64,
    filename: String,
    total: Option<u64>,
) {
    let mut sent = first.len() as u64;
    if tx.send(Ok(first)).await.is_err() {
        warn!(id, "client disconnected before first chunk was delivered");
        stream.abort().await;
        ledger.update(id, DownloadUpdate::failed());
        return;
    }
    report_byte_progress(&ledger, id, sent, total);

    loop {
        match stream.next_chunk().await {
            Ok(Some(chunk)) => {
                sent += chunk.len() as u64;
                if tx.send(Ok(chunk)).await.is_err() {
                    warn!(id, bytes = sent, "client disconnected mid-stream");
                    stream.abort().await;
                    ledger.update(id, DownloadUpdate::failed());
                    return;
                }
                report_byte_progress(&ledger, id, sent, total);
            }
            Ok(None) => {
                match stream.finish().await {
                    Ok(()) => {
                        info!(id, bytes = sent, "stream download completed");
                        ledger.update(id, DownloadUpdate::completed(filename));
                    }
                    Err(e) => {
                        // Headers are long gone; terminating the body is the
                        // only way left to signal the failure.
                        warn!(id, bytes = sent, error = %e, "stream producer failed mid-transfer");
                        ledger.update(id, DownloadUpdate::failed());
                        let _ = tx.send(Err(io::Error::other(e.to_string()))).await;
                    }
                }
                return;
            }
            Err(e) => {
                warn!(id, bytes = sent, error = %e, "stream read failed");
                stream.abort().await;
                ledger.update(id, DownloadUpdate::failed());
                let _ = tx.send(Err(e)).await;
                return;
            }
        }
    }
}

/// Write byte-count progress for a stream-mode record. Only possible when
/// the tool reported a size; 100 stays reserved for the terminal update.
fn report_byte_progress(ledger: &DownloadLedger, id: u64, sent: u64, total: Option<u64>) {
    if let Some(total) = total
        && total > 0
    {
        let percent = (sent.saturating_mul(100) / total).min(99) as u8;
        if percent > 0 {
            ledger.update(id, DownloadUpdate::progress(percent));
        }
    }
}

/// Response content type for a container extension.
pub fn content_type_for_ext(ext: &str) -> &'static str {
    if ext.eq_ignore_ascii_case("webm") {
        "video/webm"
    } else {
        "video/mp4"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use async_trait::async_trait;
    use ytdlp::{DownloadedFile, ExtractError, MediaInfo};

    struct NoopExtractor;

    #[async_trait]
    impl MediaExtractor for NoopExtractor {
        async fn info(&self, _req: &ExtractRequest) -> std::result::Result<MediaInfo, ExtractError> {
            Err(ExtractError::ToolNotFound)
        }

        async fn stream(
            &self,
            _req: &ExtractRequest,
        ) -> std::result::Result<Box<dyn MediaByteStream>, ExtractError> {
            Err(ExtractError::ToolNotFound)
        }

        async fn download(
            &self,
            _req: &ExtractRequest,
            _dest_dir: &Path,
            _progress: mpsc::Sender<ProgressEvent>,
        ) -> std::result::Result<DownloadedFile, ExtractError> {
            Err(ExtractError::ToolNotFound)
        }
    }

    struct ChunkStream {
        chunks: std::collections::VecDeque<Bytes>,
    }

    #[async_trait]
    impl MediaByteStream for ChunkStream {
        async fn next_chunk(&mut self) -> io::Result<Option<Bytes>> {
            Ok(self.chunks.pop_front())
        }

        async fn finish(self: Box<Self>) -> std::result::Result<(), ExtractError> {
            Ok(())
        }

        async fn abort(self: Box<Self>) {}
    }

    fn manager(config: AppConfig) -> DownloadManager {
        DownloadManager::new(DownloadLedger::new(), Arc::new(NoopExtractor), &config)
    }

    #[test]
    fn validate_accepts_known_url_shapes() {
        let m = manager(AppConfig::default());
        let v = m
            .validate("https://www.youtube.com/watch?v=dQw4w9WgXcQ", "720p")
            .unwrap();
        assert_eq!(v.quality, Quality::P720);
        assert_eq!(v.url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");

        assert!(m.validate("https://youtu.be/dQw4w9WgXcQ", "best").is_ok());
    }

    #[test]
    fn validate_rejects_bad_input_without_ledger_writes() {
        let m = manager(AppConfig::default());

        assert!(matches!(
            m.validate("", "720p"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            m.validate("https://example.com/clip", "720p"),
            Err(Error::Validation(_))
        ));
        // Shape matching is deliberately unanchored: a watch-style query on
        // a foreign host still classifies as a video URL.
        assert!(m.validate("https://example.com/watch?v=abc", "720p").is_ok());
        assert!(matches!(
            m.validate("https://youtu.be/dQw4w9WgXcQ", "4k"),
            Err(Error::Validation(_))
        ));

        assert!(m.ledger().list_all().is_empty());
    }

    #[test]
    fn content_types_follow_container() {
        assert_eq!(content_type_for_ext("mp4"), "video/mp4");
        assert_eq!(content_type_for_ext("webm"), "video/webm");
        assert_eq!(content_type_for_ext("WEBM"), "video/webm");
        assert_eq!(content_type_for_ext("mkv"), "video/mp4");
    }

    #[tokio::test]
    async fn stream_pump_reports_byte_progress_when_size_is_known() {
        use futures::StreamExt;

        use crate::ledger::DownloadStatus;

        let ledger = DownloadLedger::new();
        let record = ledger.create("https://youtu.be/dQw4w9WgXcQ", "720p");
        let id = record.id;

        let first = Bytes::from(vec![0u8; 25]);
        let stream = Box::new(ChunkStream {
            chunks: (0..3).map(|_| Bytes::from(vec![0u8; 25])).collect(),
        });

        // Zero buffer: the pump stalls once the single channel slot is
        // occupied, so the record is observably mid-flight.
        let (tx, mut rx) = byte_mpsc::channel(0);
        let pump = tokio::spawn(pump_stream(
            stream,
            first,
            tx,
            Arc::clone(&ledger),
            id,
            "clip.mp4".to_string(),
            Some(100),
        ));

        // Drain the first chunk so its send resolves and the pump records
        // the byte count before stalling on the next send.
        let mut received = rx.next().await.unwrap().unwrap().len();

        let mut observed_partial = false;
        for _ in 0..200 {
            let record = ledger.get(id).unwrap();
            if record.status == DownloadStatus::Processing && record.progress > 0 {
                observed_partial = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert!(observed_partial, "no byte progress was written mid-stream");

        while let Some(chunk) = rx.next().await {
            received += chunk.unwrap().len();
        }
        pump.await.unwrap();

        let record = ledger.get(id).unwrap();
        assert_eq!(received, 100);
        assert_eq!(record.status, DownloadStatus::Completed);
        assert_eq!(record.progress, 100);
        assert_eq!(record.filename.as_deref(), Some("clip.mp4"));
    }

    #[test]
    fn cookies_materialize_to_a_readable_temp_file() {
        let m = manager(AppConfig {
            cookies: Some("# Netscape HTTP Cookie File\n".to_string()),
            ..AppConfig::default()
        });
        let file = m.materialize_cookies().unwrap().unwrap();
        let content = std::fs::read_to_string(file.path()).unwrap();
        assert!(content.starts_with("# Netscape"));

        let none = manager(AppConfig::default()).materialize_cookies().unwrap();
        assert!(none.is_none());
    }
}
