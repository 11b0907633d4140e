pub(super) use super::flash::{self, Notice};
pub(super) use super::{AppState, SessionState, load_state, reload_state, save_state};
pub(super) use crate::error::ImageverseError;
pub(super) use askama::Template;
pub(super) use askama_web::WebTemplate;
pub(super) use axum::extract::{Form, State};
pub(super) use axum::response::{IntoResponse, Redirect, Response};
pub(super) use serde::Deserialize;
pub(super) use tower_sessions::Session;
pub(super) use tracing::{debug, error, info, instrument};
