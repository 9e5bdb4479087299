//! Live byte streams piped from the tool's stdout.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{ExtractError, classify_stderr};

/// Read chunk size for stdout pumping.
const CHUNK_CAPACITY: usize = 64 * 1024;

/// A chunked byte stream with an explicit terminal outcome.
///
/// Callers pull chunks until `next_chunk` returns `Ok(None)`, then call
/// [`MediaByteStream::finish`] to learn whether the producer actually
/// succeeded; a producer that dies mid-stream surfaces either as a read
/// error or as an `Err` from `finish`. [`MediaByteStream::abort`] tears
/// the producer down early (client disconnect).
#[async_trait]
pub trait MediaByteStream: Send {
    async fn next_chunk(&mut self) -> std::io::Result<Option<Bytes>>;
    async fn finish(self: Box<Self>) -> Result<(), ExtractError>;
    async fn abort(self: Box<Self>);
}

/// [`MediaByteStream`] backed by a running yt-dlp child process.
pub struct YtDlpStream {
    child: Child,
    stdout: ChildStdout,
    stderr_task: JoinHandle<String>,
}

impl YtDlpStream {
    pub(crate) fn new(child: Child, stdout: ChildStdout, stderr_task: JoinHandle<String>) -> Self {
        Self {
            child,
            stdout,
            stderr_task,
        }
    }

    async fn collected_stderr(stderr_task: JoinHandle<String>) -> String {
        stderr_task.await.unwrap_or_default()
    }
}

#[async_trait]
impl MediaByteStream for YtDlpStream {
    async fn next_chunk(&mut self) -> std::io::Result<Option<Bytes>> {
        let mut buf = BytesMut::with_capacity(CHUNK_CAPACITY);
        let n = self.stdout.read_buf(&mut buf).await?;
        if n == 0 {
            Ok(None)
        } else {
            Ok(Some(buf.freeze()))
        }
    }

    async fn finish(self: Box<Self>) -> Result<(), ExtractError> {
        let mut child = self.child;
        let status = child.wait().await?;
        let stderr = Self::collected_stderr(self.stderr_task).await;

        if status.success() {
            Ok(())
        } else {
            debug!(code = ?status.code(), "yt-dlp stream exited non-zero");
            Err(classify_stderr(&stderr))
        }
    }

    async fn abort(self: Box<Self>) {
        let mut child = self.child;
        // Best effort: the child may already be gone.
        let _ = child.start_kill();
        let _ = child.wait().await;
        self.stderr_task.abort();
    }
}
