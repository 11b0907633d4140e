//! Turning an uploaded file into an in-memory data URI.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The current image, held as a `data:<mime>;base64,<payload>` URI.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadedImage {
    data_uri: String,
}

/// Errors raised while taking in an upload or reading it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeError {
    /// The upload could not be read.
    Read(String),
    /// A file was chosen but no bytes arrived.
    Aborted,
    /// A stored data URI could not be decoded.
    Malformed(String),
}

impl fmt::Display for IntakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read(err) => write!(f, "Failed to read file: {err}"),
            Self::Aborted => write!(f, "File read aborted"),
            Self::Malformed(err) => write!(f, "Malformed data URI: {err}"),
        }
    }
}

impl std::error::Error for IntakeError {}

impl UploadedImage {
    /// Encodes raw bytes as a data URI with the given MIME type.
    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        Self {
            data_uri: format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes)),
        }
    }

    /// Wraps an existing data URI after checking its shape.
    pub fn from_data_uri(data_uri: &str) -> Result<Self, IntakeError> {
        let image = Self {
            data_uri: data_uri.to_string(),
        };
        image.split()?;
        Ok(image)
    }

    /// The full data URI, suitable for an `<img src>`.
    pub fn data_uri(&self) -> &str {
        &self.data_uri
    }

    /// The MIME type recorded in the URI.
    pub fn mime_type(&self) -> Result<&str, IntakeError> {
        self.split().map(|(mime, _)| mime)
    }

    /// The base64 payload without the `data:` header.
    pub fn base64_payload(&self) -> Result<&str, IntakeError> {
        self.split().map(|(_, payload)| payload)
    }

    /// The decoded image bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, IntakeError> {
        let payload = self.base64_payload()?;
        STANDARD
            .decode(payload)
            .map_err(|err| IntakeError::Malformed(err.to_string()))
    }

    fn split(&self) -> Result<(&str, &str), IntakeError> {
        let rest = self
            .data_uri
            .strip_prefix("data:")
            .ok_or_else(|| IntakeError::Malformed("missing data: prefix".to_string()))?;
        let (mime, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| IntakeError::Malformed("not base64 encoded".to_string()))?;
        Ok((mime, payload))
    }
}

/// Builds the session image from one uploaded file field.
///
/// Returns `Ok(None)` when the form was submitted without choosing a file.
/// The MIME type is taken from the upload when it claims one, otherwise it
/// is sniffed from the bytes; nothing else about the file is validated.
pub fn accept_upload(
    file_name: Option<&str>,
    content_type: Option<&str>,
    bytes: &[u8],
) -> Result<Option<UploadedImage>, IntakeError> {
    let chosen = file_name.is_some_and(|name| !name.is_empty());
    if bytes.is_empty() {
        return if chosen {
            Err(IntakeError::Aborted)
        } else {
            Ok(None)
        };
    }

    let mime_type = content_type
        .filter(|value| !value.is_empty() && *value != "application/octet-stream")
        .map(str::to_string)
        .or_else(|| {
            image::guess_format(bytes)
                .ok()
                .map(|format| format.to_mime_type().to_string())
        })
        .unwrap_or_else(|| "application/octet-stream".to_string());
    debug!(
        "Accepted upload {:?} ({} bytes, {})",
        file_name,
        bytes.len(),
        mime_type
    );
    Ok(Some(UploadedImage::from_bytes(&mime_type, bytes)))
}

#[cfg(test)]
#[allow(clippy::expect_used)]
/// A small solid PNG for tests.
pub(crate) fn test_png() -> Vec<u8> {
    let image = image::RgbImage::from_pixel(4, 3, image::Rgb([200, 40, 40]));
    let mut output = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut output, image::ImageFormat::Png)
        .expect("encode test png");
    output.into_inner()
}
