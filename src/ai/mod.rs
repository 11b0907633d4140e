//! The two remote AI capabilities: image analysis and poem writing.
//!
//! Each is a single-method trait so the provider can be swapped out, and
//! replaced with a fake in tests.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::intake::UploadedImage;
use crate::pipeline::{AnalysisResult, Poem};

mod gemini;

pub use gemini::{GeminiClient, GeminiConfig};

/// Languages a poem can be written in.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English, the default.
    #[default]
    En,
    /// Chinese.
    Zh,
}

impl Language {
    /// Every supported language.
    pub const ALL: [Language; 2] = [Language::En, Language::Zh];

    /// The language code sent to the model.
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Zh => "zh",
        }
    }

    /// Name shown in the language picker.
    pub fn label(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Zh => "中文",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "en" => Ok(Language::En),
            "zh" => Ok(Language::Zh),
            other => Err(format!("Unsupported language {other:?}")),
        }
    }
}

/// Input for the analysis call.
#[derive(Clone, Debug)]
pub struct AnalysisRequest {
    /// The image to look at.
    pub image: UploadedImage,
}

/// Labels returned by the analysis call. Missing fields read as empty.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AnalysisResponse {
    /// Things in the picture.
    #[serde(default)]
    pub objects: Vec<String>,
    /// Settings of the picture.
    #[serde(default)]
    pub scenes: Vec<String>,
    /// Moods of the picture.
    #[serde(default)]
    pub emotions: Vec<String>,
}

impl From<AnalysisResponse> for AnalysisResult {
    fn from(response: AnalysisResponse) -> Self {
        AnalysisResult {
            objects: response.objects,
            scenes: response.scenes,
            emotions: response.emotions,
        }
    }
}

/// Input for the poem call.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoemRequest {
    /// The flattened analysis summary.
    pub image_analysis: String,
    /// Language to write in.
    pub language: Language,
}

/// The poem call's answer.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct PoemResponse {
    /// The poem text.
    pub poem: String,
}

impl From<PoemResponse> for Poem {
    fn from(response: PoemResponse) -> Self {
        Poem(response.poem)
    }
}

/// Failures talking to a remote capability.
#[derive(Debug)]
pub enum AiError {
    /// The client could not be set up.
    Config(String),
    /// The request never got a response.
    Http(String),
    /// The service answered with an error status.
    Status(u16, String),
    /// The answer did not have the expected shape.
    InvalidResponse(String),
}

impl fmt::Display for AiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "AI client configuration error: {err}"),
            Self::Http(err) => write!(f, "AI request failed: {err}"),
            Self::Status(status, body) => write!(f, "AI service returned HTTP {status}: {body}"),
            Self::InvalidResponse(err) => write!(f, "Invalid AI response: {err}"),
        }
    }
}

impl std::error::Error for AiError {}

impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        AiError::Http(err.to_string())
    }
}

/// Looks at an image and labels what it sees.
#[async_trait]
pub trait ImageAnalyzer: Send + Sync {
    /// One attempt; no retries.
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResponse, AiError>;
}

/// Writes a poem from an analysis summary.
#[async_trait]
pub trait PoemGenerator: Send + Sync {
    /// One attempt; no retries.
    async fn generate(&self, request: PoemRequest) -> Result<PoemResponse, AiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_analysis_fields_are_empty() {
        let response: AnalysisResponse =
            serde_json::from_str(r#"{"objects":["cat"]}"#).expect("parse");
        assert_eq!(response.objects, vec!["cat".to_string()]);
        assert!(response.scenes.is_empty());
        assert!(response.emotions.is_empty());

        let result = AnalysisResult::from(response);
        assert_eq!(result.summary(), "Objects: cat. Scenes: . Emotions: ");
    }

    #[test]
    fn poem_request_uses_wire_names() {
        let request = PoemRequest {
            image_analysis: "Objects: cat".to_string(),
            language: Language::Zh,
        };
        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({"imageAnalysis": "Objects: cat", "language": "zh"})
        );
    }

    #[test]
    fn language_codes() {
        assert_eq!("zh".parse::<Language>(), Ok(Language::Zh));
        assert_eq!(Language::default().code(), "en");
        assert!("fr".parse::<Language>().is_err());
    }
}
