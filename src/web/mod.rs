//! The ImageVerse web front end.

use std::num::NonZeroU16;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, Session, SessionManagerLayer};
use tracing::{error, info};

use crate::ai::{ImageAnalyzer, Language, PoemGenerator};
use crate::card::CardStyle;
use crate::constants::{SESSION_IDLE_MINUTES, SESSION_STATE_KEY};
use crate::error::ImageverseError;
use crate::pipeline::Pipeline;
use crate::render::CardRasterizer;

mod actions;
mod flash;
mod prelude;
mod store;
mod views;

pub use store::SessionCache;

/// The remote capabilities, the rasterizer and the session store shared by
/// every request.
#[derive(Clone)]
pub struct AppState {
    analyzer: Arc<dyn ImageAnalyzer>,
    poet: Arc<dyn PoemGenerator>,
    rasterizer: Arc<dyn CardRasterizer>,
    sessions: SessionCache,
}

impl AppState {
    /// Wires up the collaborators.
    pub fn new(
        analyzer: Arc<dyn ImageAnalyzer>,
        poet: Arc<dyn PoemGenerator>,
        rasterizer: Arc<dyn CardRasterizer>,
        sessions: SessionCache,
    ) -> Self {
        Self {
            analyzer,
            poet,
            rasterizer,
            sessions,
        }
    }
}

/// Everything one visitor has going on, kept in their session.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SessionState {
    /// Image, analysis and poem.
    pub pipeline: Pipeline,
    /// Card customization.
    pub style: CardStyle,
    /// Language the next poem is written in.
    pub language: Language,
}

pub(crate) async fn load_state(session: &Session) -> Result<SessionState, ImageverseError> {
    Ok(session
        .get::<SessionState>(SESSION_STATE_KEY)
        .await?
        .unwrap_or_default())
}

/// Re-reads the visitor's state from the store, replacing this request's
/// copy, so that whatever other requests saved in the meantime is kept.
pub(crate) async fn reload_state(
    state: &AppState,
    session: &Session,
) -> Result<SessionState, ImageverseError> {
    let Some(id) = session.id() else {
        return load_state(session).await;
    };
    let mut data = state
        .sessions
        .fetch(&id)
        .await
        .map(|record| record.data)
        .unwrap_or_default();
    let fresh = match data.remove(SESSION_STATE_KEY) {
        Some(value) => serde_json::from_value::<SessionState>(value)
            .map_err(|err| ImageverseError::Session(err.to_string()))?,
        None => SessionState::default(),
    };
    save_state(session, &fresh).await?;
    flash::restore_flash(session, data.remove(flash::FLASH_KEY)).await?;
    Ok(fresh)
}

pub(crate) async fn save_state(
    session: &Session,
    state: &SessionState,
) -> Result<(), ImageverseError> {
    session.insert(SESSION_STATE_KEY, state).await?;
    Ok(())
}

fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::get(views::root_handler))
        .route("/static/styles.css", axum::routing::get(styles_handler))
        .route("/upload", axum::routing::post(actions::upload_handler))
        .route("/analyze", axum::routing::post(actions::analyze_handler))
        .route("/poem", axum::routing::post(actions::poem_handler))
        .route("/style", axum::routing::post(actions::style_handler))
        .route(
            "/style/random",
            axum::routing::post(actions::random_colors_handler),
        )
        .route("/export", axum::routing::post(actions::export_handler))
}

/// Builds the full application, sessions included.
pub fn build_app(state: AppState, max_upload_bytes: usize) -> Router {
    let session_layer = SessionManagerLayer::new(state.sessions.clone())
        .with_secure(false)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            SESSION_IDLE_MINUTES,
        )));

    create_router()
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn styles_handler() -> impl IntoResponse {
    const STYLES: &str =
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/styles.css"));
    ([(CONTENT_TYPE, "text/css")], STYLES)
}

/// Runs the server until it fails.
pub async fn setup_server(
    listen_addr: &str,
    port: NonZeroU16,
    max_upload_bytes: usize,
    state: AppState,
) -> Result<(), anyhow::Error> {
    let app = build_app(state, max_upload_bytes);

    let addr = format!("{}:{}", listen_addr, port);
    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    if let Err(err) = axum::serve(listener, app).await {
        error!("Server error: {}", err);
    }
    Ok(())
}
