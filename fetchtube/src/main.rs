use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fetchtube::api::server::{ApiServer, ApiServerConfig, AppState};
use fetchtube::config::AppConfig;
use fetchtube::download::DownloadManager;
use fetchtube::ledger::DownloadLedger;
use fetchtube::youtube::metadata::YouTubeDataApi;
use ytdlp::YtDlpExtractor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fetchtube=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env_or_default();

    let extractor = match &config.ytdlp_bin {
        Some(bin) => YtDlpExtractor::with_binary(bin.clone()),
        None => YtDlpExtractor::new(),
    };

    let ledger = DownloadLedger::new();
    let manager = Arc::new(DownloadManager::new(ledger, Arc::new(extractor), &config));

    let mut state = AppState::new().with_download_manager(manager);
    match &config.youtube_api_key {
        Some(key) => {
            state = state.with_video_api(Arc::new(YouTubeDataApi::new(key.clone())));
        }
        None => {
            tracing::warn!("YOUTUBE_API_KEY not set; /api/video-info will be unavailable");
        }
    }

    let server = ApiServer::with_state(ApiServerConfig::from_env_or_default(), state);

    let cancel_token = server.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            cancel_token.cancel();
        }
    });

    server.run().await?;

    Ok(())
}
