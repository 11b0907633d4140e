//! CLI parser
use clap::Parser;
use std::num::NonZeroU16;
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_SESSION_CACHE_BYTES, FONT_DIR, GEMINI_BASE_URL, GEMINI_MODEL,
};

#[derive(Parser, Debug)]
/// CLI Options
pub struct CliOptions {
    #[clap(long, help = "Enable debug logging", env = "IMAGEVERSE_DEBUG")]
    /// Enable debug logging. Env: IMAGEVERSE_DEBUG
    pub debug: bool,
    #[clap(long, short, default_value = "9000", env = "IMAGEVERSE_PORT")]
    /// http listener, defaults to `9000`.
    /// Env: IMAGEVERSE_PORT
    pub port: NonZeroU16,
    #[clap(
        long,
        short,
        default_value = "127.0.0.1",
        env = "IMAGEVERSE_LISTEN_ADDRESS"
    )]
    /// Listen address, defaults to `127.0.0.1`.
    /// Env: IMAGEVERSE_LISTEN_ADDRESS
    pub listen_address: String,

    #[clap(long, env = "GOOGLE_GENAI_API_KEY", hide_env_values = true)]
    /// Gemini API key.
    /// Env: GOOGLE_GENAI_API_KEY
    pub gemini_api_key: String,

    #[clap(long, default_value = GEMINI_BASE_URL, env = "IMAGEVERSE_GEMINI_BASE_URL")]
    /// Gemini REST base URL.
    /// Env: IMAGEVERSE_GEMINI_BASE_URL
    pub gemini_base_url: url::Url,

    #[clap(long, default_value = GEMINI_MODEL, env = "IMAGEVERSE_MODEL")]
    /// Model used for both analysis and poems.
    /// Env: IMAGEVERSE_MODEL
    pub model: String,

    #[clap(long, env = "IMAGEVERSE_HTTP_PROXY")]
    /// Proxy for outbound Gemini requests, eg `http://proxy:3128`.
    /// Env: IMAGEVERSE_HTTP_PROXY
    pub http_proxy: Option<String>,

    #[clap(long, default_value_os_t = FONT_DIR.clone(), env = "IMAGEVERSE_FONT_DIR")]
    /// Directory holding `serif`, `sans-serif` and `monospace` font files.
    /// Env: IMAGEVERSE_FONT_DIR
    pub font_dir: PathBuf,

    #[clap(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES, env = "IMAGEVERSE_MAX_UPLOAD_BYTES")]
    /// Largest accepted upload, in bytes.
    /// Env: IMAGEVERSE_MAX_UPLOAD_BYTES
    pub max_upload_bytes: usize,

    #[clap(long, default_value_t = DEFAULT_SESSION_CACHE_BYTES, env = "IMAGEVERSE_SESSION_CACHE_BYTES")]
    /// Memory set aside for session data; the least used sessions are dropped past it.
    /// Env: IMAGEVERSE_SESSION_CACHE_BYTES
    pub session_cache_bytes: u64,
}
