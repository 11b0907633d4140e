use std::sync::Arc;

use clap::Parser;
use imageverse::ai::{GeminiClient, GeminiConfig};
use imageverse::config::setup_logging;
use imageverse::constants::SESSION_IDLE;
use imageverse::render::GlyphRasterizer;
use imageverse::web::{AppState, SessionCache, setup_server};
use tracing::error;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = imageverse::cli::CliOptions::parse();

    if setup_logging(cli.debug).is_err() {
        return;
    }

    let rasterizer = match GlyphRasterizer::from_dir(&cli.font_dir) {
        Ok(rasterizer) => rasterizer,
        Err(err) => {
            error!("Failed to load fonts: {}", err);
            return;
        }
    };

    let gemini = match GeminiClient::new(GeminiConfig {
        api_key: cli.gemini_api_key.clone(),
        base_url: cli.gemini_base_url.clone(),
        model: cli.model.clone(),
        http_proxy: cli.http_proxy.clone(),
    }) {
        Ok(client) => Arc::new(client),
        Err(err) => {
            error!("Failed to set up Gemini client: {}", err);
            return;
        }
    };

    let sessions = SessionCache::new(cli.session_cache_bytes, SESSION_IDLE);
    let state = AppState::new(gemini.clone(), gemini, Arc::new(rasterizer), sessions);

    if let Err(err) = setup_server(
        &cli.listen_address,
        cli.port,
        cli.max_upload_bytes,
        state,
    )
    .await
    {
        error!("Application error: {}", err);
    }
}
