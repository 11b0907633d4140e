//! Shared constants/setters for things
//!

use std::path::PathBuf;
use std::time::Duration;
use std::sync::LazyLock;

/// Where font files are looked up when nothing else is configured.
pub static FONT_DIR: LazyLock<PathBuf> = LazyLock::new(|| PathBuf::from("./fonts"));

/// File name offered for the exported card.
pub const EXPORT_FILENAME: &str = "imageverse_poem.png";

/// Default Gemini REST endpoint.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default Gemini model for both calls.
pub const GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Smallest poem font size the slider allows.
pub const MIN_FONT_SIZE_PX: u32 = 10;

/// Largest poem font size the slider allows.
pub const MAX_FONT_SIZE_PX: u32 = 40;

/// Poem font size for a fresh session.
pub const DEFAULT_FONT_SIZE_PX: u32 = 20;

/// Default cap on uploaded image size.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Session key holding the per-visitor [crate::web::SessionState].
pub const SESSION_STATE_KEY: &str = "imageverse";

/// How long an idle session survives, in minutes.
pub const SESSION_IDLE_MINUTES: i64 = 60;

/// [SESSION_IDLE_MINUTES] for the session cache.
pub const SESSION_IDLE: Duration = Duration::from_secs(60 * 60);

/// Default cap on the session data held in memory, uploads included.
pub const DEFAULT_SESSION_CACHE_BYTES: u64 = 512 * 1024 * 1024;
