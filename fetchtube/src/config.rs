//! Service configuration loaded from environment variables.

use std::path::PathBuf;

/// Runtime configuration for the download service.
///
/// Everything is optional except the download directory: a missing
/// metadata API key only disables the video-info endpoint, and a missing
/// cookie blob simply means extraction runs unauthenticated.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// YouTube Data API key for the metadata upstream.
    pub youtube_api_key: Option<String>,
    /// Raw cookie-file content handed to the extraction tool. Materialized
    /// to a temporary file per request and deleted afterward.
    pub cookies: Option<String>,
    /// Explicit path to the yt-dlp binary, overriding discovery.
    pub ytdlp_bin: Option<PathBuf>,
    /// Output directory for job-mode downloads.
    pub download_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            youtube_api_key: None,
            cookies: None,
            ytdlp_bin: None,
            download_dir: PathBuf::from("downloads"),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    ///
    /// Supported env vars:
    /// - `YOUTUBE_API_KEY`
    /// - `YTDLP_COOKIES` (raw cookie-file content)
    /// - `YTDLP_BIN`
    /// - `DOWNLOAD_DIR`
    pub fn from_env_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(key) = std::env::var("YOUTUBE_API_KEY")
            && !key.trim().is_empty()
        {
            config.youtube_api_key = Some(key);
        }

        if let Ok(cookies) = std::env::var("YTDLP_COOKIES")
            && !cookies.trim().is_empty()
        {
            config.cookies = Some(cookies);
        }

        if let Ok(bin) = std::env::var("YTDLP_BIN")
            && !bin.trim().is_empty()
        {
            config.ytdlp_bin = Some(PathBuf::from(bin));
        }

        if let Ok(dir) = std::env::var("DOWNLOAD_DIR")
            && !dir.trim().is_empty()
        {
            config.download_dir = PathBuf::from(dir);
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::default();
        assert!(config.youtube_api_key.is_none());
        assert!(config.cookies.is_none());
        assert_eq!(config.download_dir, PathBuf::from("downloads"));
    }
}
