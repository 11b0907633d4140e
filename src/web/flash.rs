use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_sessions::Session;

use crate::error::ImageverseError;

pub(super) const FLASH_KEY: &str = "flash_notice";

/// The notifications a visitor can be shown, one at a time.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Notice {
    FileReadError,
    FileReadAborted,
    NoImage,
    AnalysisFailed,
    NoAnalysis,
    PoemFailed,
    NoPoem,
    CardNotFound,
    DownloadFailed,
    SettingsRejected,
}

#[derive(Clone, Debug)]
pub(crate) struct FlashMessage {
    pub(crate) title: &'static str,
    pub(crate) text: &'static str,
    pub(crate) class: &'static str,
}

impl Notice {
    pub(crate) fn message(self) -> FlashMessage {
        let (title, text) = match self {
            Notice::FileReadError => ("File read error", "Failed to read file."),
            Notice::FileReadAborted => ("File read aborted", "File read aborted."),
            Notice::NoImage => ("No image uploaded", "Please upload an image first."),
            Notice::AnalysisFailed => (
                "Image analysis failed",
                "Image analysis failed. Please try again.",
            ),
            Notice::NoAnalysis => ("No image analysis", "Please analyze the image first."),
            Notice::PoemFailed => (
                "Poem generation failed",
                "Failed to generate poem. Please try again.",
            ),
            Notice::NoPoem => ("No poem generated", "Please generate a poem first."),
            Notice::CardNotFound => ("Poem card not found", "Poem card could not be found."),
            Notice::DownloadFailed => (
                "Download failed",
                "Failed to download poem card. Please try again.",
            ),
            Notice::SettingsRejected => (
                "Settings update failed",
                "That card setting is not supported.",
            ),
        };
        FlashMessage {
            title,
            text,
            class: "destructive",
        }
    }
}

pub(crate) async fn set_flash(session: &Session, notice: Notice) -> Result<(), ImageverseError> {
    session.insert(FLASH_KEY, notice).await?;
    Ok(())
}

pub(crate) async fn take_flash_message(
    session: &Session,
) -> Result<Option<FlashMessage>, ImageverseError> {
    let notice = session.remove::<Notice>(FLASH_KEY).await?;
    Ok(notice.map(Notice::message))
}

/// Puts back the notice as it was stored, or clears it if there was none.
pub(crate) async fn restore_flash(
    session: &Session,
    stored: Option<Value>,
) -> Result<(), ImageverseError> {
    match stored {
        Some(value) => {
            session.insert_value(FLASH_KEY, value).await?;
        }
        None => {
            session.remove_value(FLASH_KEY).await?;
        }
    }
    Ok(())
}
