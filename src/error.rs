//! Error handling

use axum::response::IntoResponse;
use tracing::info;

/// Request-level errors for the imageverse application.
///
/// User-facing failures of the pipeline (bad upload, failed AI call, failed
/// export) are not errors here: they become a notification and a redirect.
#[derive(Debug)]
pub enum ImageverseError {
    /// When you didn't do the right thing
    BadRequest(String),
    /// When the session store fails
    Session(String),
    /// When a template fails to render
    Template(String),
    /// When an internal server error occurs
    InternalServerError(String),
}

impl std::fmt::Display for ImageverseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest(message) => write!(f, "Bad request: {message}"),
            Self::Session(message) => write!(f, "Session error: {message}"),
            Self::Template(message) => write!(f, "Template error: {message}"),
            Self::InternalServerError(message) => write!(f, "Internal server error: {message}"),
        }
    }
}

impl std::error::Error for ImageverseError {}

impl From<tower_sessions::session::Error> for ImageverseError {
    fn from(err: tower_sessions::session::Error) -> Self {
        ImageverseError::Session(err.to_string())
    }
}

impl From<askama::Error> for ImageverseError {
    fn from(err: askama::Error) -> Self {
        ImageverseError::Template(err.to_string())
    }
}

impl From<std::io::Error> for ImageverseError {
    fn from(err: std::io::Error) -> Self {
        ImageverseError::InternalServerError(err.to_string())
    }
}

impl From<axum::http::Error> for ImageverseError {
    fn from(err: axum::http::Error) -> Self {
        ImageverseError::InternalServerError(err.to_string())
    }
}

impl IntoResponse for ImageverseError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ImageverseError::BadRequest(message) => {
                info!("Bad request received: {}", message);
                let mut response =
                    axum::response::Response::new(axum::body::Body::from("Bad Request"));
                *response.status_mut() = axum::http::StatusCode::BAD_REQUEST;
                response
            }
            ImageverseError::Session(message) => {
                tracing::error!("Session error: {}", message);
                let mut response =
                    axum::response::Response::new(axum::body::Body::from("Session error"));
                *response.status_mut() = axum::http::StatusCode::INTERNAL_SERVER_ERROR;
                response
            }
            ImageverseError::Template(message) => {
                tracing::error!("Template error: {}", message);
                let mut response =
                    axum::response::Response::new(axum::body::Body::from("Internal server error"));
                *response.status_mut() = axum::http::StatusCode::INTERNAL_SERVER_ERROR;
                response
            }
            ImageverseError::InternalServerError(message) => {
                tracing::error!("Internal server error: {}", message);
                let mut response =
                    axum::response::Response::new(axum::body::Body::from("Internal server error"));
                *response.status_mut() = axum::http::StatusCode::INTERNAL_SERVER_ERROR;
                response
            }
        }
    }
}
