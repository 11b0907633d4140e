//! Google Gemini implementation of both AI capabilities, via the
//! `generateContent` REST endpoint.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, instrument};
use url::Url;

use super::{
    AiError, AnalysisRequest, AnalysisResponse, ImageAnalyzer, PoemGenerator, PoemRequest,
    PoemResponse,
};

const ANALYSIS_PROMPT: &str = r#"You are an image analysis assistant. Look at the provided photo and describe it with three lists of short labels:

- objects: the notable things visible in the image
- scenes: the setting or kind of place the image shows
- emotions: the moods or feelings the image conveys

Use a few words per label. Return JSON that matches the provided schema."#;

/// Matches a model answer wrapped in a markdown code fence.
static CODE_FENCE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"(?s)^\s*```[a-zA-Z]*\s*(.*?)\s*```\s*$"));

/// Connection settings for [GeminiClient].
#[derive(Clone, Debug)]
pub struct GeminiConfig {
    /// API key sent as `x-goog-api-key`.
    pub api_key: String,
    /// REST base, eg `https://generativelanguage.googleapis.com/v1beta`.
    pub base_url: Url,
    /// Model used for both calls.
    pub model: String,
    /// Optional proxy for every outbound request.
    pub http_proxy: Option<String>,
}

/// Talks to Gemini for analysis and poems.
#[derive(Clone, Debug)]
pub struct GeminiClient {
    client: reqwest::Client,
    config: GeminiConfig,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default, rename = "promptFeedback")]
    prompt_feedback: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiClient {
    /// Builds a client; fails only if the proxy setting is unusable.
    ///
    /// Only the configured proxy is used, system proxy variables are ignored.
    pub fn new(config: GeminiConfig) -> Result<Self, AiError> {
        let builder = match config.http_proxy.as_deref() {
            Some(proxy) => {
                let proxy = reqwest::Proxy::all(proxy)
                    .map_err(|err| AiError::Config(format!("Invalid proxy {proxy:?}: {err}")))?;
                reqwest::Client::builder().proxy(proxy)
            }
            None => reqwest::Client::builder().no_proxy(),
        };
        let client = builder
            .build()
            .map_err(|err| AiError::Config(err.to_string()))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.as_str().trim_end_matches('/'),
            self.config.model
        )
    }

    async fn generate_json<T: DeserializeOwned>(&self, body: &Value) -> Result<T, AiError> {
        let url = self.endpoint();
        debug!("POST {}", url);
        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(AiError::Status(status.as_u16(), text));
        }

        let parsed: GenerateContentResponse = resp
            .json()
            .await
            .map_err(|err| AiError::InvalidResponse(err.to_string()))?;
        let text = response_text(parsed)?;
        parse_model_json(&text)
    }
}

#[async_trait]
impl ImageAnalyzer for GeminiClient {
    #[instrument(skip_all, fields(model = %self.config.model))]
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResponse, AiError> {
        let body = analysis_body(&request)?;
        self.generate_json(&body).await
    }
}

#[async_trait]
impl PoemGenerator for GeminiClient {
    #[instrument(skip_all, fields(model = %self.config.model, language = %request.language))]
    async fn generate(&self, request: PoemRequest) -> Result<PoemResponse, AiError> {
        let body = poem_body(&request);
        self.generate_json(&body).await
    }
}

fn analysis_body(request: &AnalysisRequest) -> Result<Value, AiError> {
    let mime_type = request
        .image
        .mime_type()
        .map_err(|err| AiError::Config(err.to_string()))?;
    let data = request
        .image
        .base64_payload()
        .map_err(|err| AiError::Config(err.to_string()))?;
    let labels = json!({"type": "ARRAY", "items": {"type": "STRING"}});
    Ok(json!({
        "contents": [{
            "role": "user",
            "parts": [
                {"text": ANALYSIS_PROMPT},
                {"inlineData": {"mimeType": mime_type, "data": data}}
            ]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": {
                    "objects": labels.clone(),
                    "scenes": labels.clone(),
                    "emotions": labels
                },
                "required": ["objects", "scenes", "emotions"]
            }
        }
    }))
}

fn poem_prompt(request: &PoemRequest) -> String {
    format!(
        "You are a poet. Generate a poem based on the following image analysis. The poem should be in {} language.\n\nImage Analysis: {}\n\nPoem:",
        request.language.code(),
        request.image_analysis
    )
}

fn poem_body(request: &PoemRequest) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [{"text": poem_prompt(request)}]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": {"poem": {"type": "STRING"}},
                "required": ["poem"]
            }
        }
    })
}

fn response_text(response: GenerateContentResponse) -> Result<String, AiError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();
    if text.trim().is_empty() {
        let feedback = response
            .prompt_feedback
            .map(|value| value.to_string())
            .unwrap_or_else(|| "no candidates".to_string());
        return Err(AiError::InvalidResponse(format!(
            "Empty model output ({feedback})"
        )));
    }
    Ok(text)
}

fn strip_code_fence(text: &str) -> &str {
    match CODE_FENCE.as_ref() {
        Ok(fence) => fence
            .captures(text)
            .and_then(|captures| captures.get(1))
            .map(|inner| inner.as_str())
            .unwrap_or(text),
        Err(_) => text,
    }
}

fn parse_model_json<T: DeserializeOwned>(text: &str) -> Result<T, AiError> {
    serde_json::from_str(strip_code_fence(text))
        .map_err(|err| AiError::InvalidResponse(format!("{err}: {text}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::Language;
    use crate::intake::UploadedImage;
    use axum::Json;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;

    fn candidate(text: &str) -> Value {
        json!({"candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]})
    }

    async fn fake_gemini(router: axum::Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake server");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        Url::parse(&format!("http://{addr}/v1beta")).expect("fake url")
    }

    fn client(base_url: Url) -> GeminiClient {
        GeminiClient::new(GeminiConfig {
            api_key: "test-key".to_string(),
            base_url,
            model: "gemini-test".to_string(),
            http_proxy: None,
        })
        .expect("client")
    }

    #[test]
    fn fenced_json_is_unwrapped() {
        let parsed: PoemResponse =
            parse_model_json("```json\n{\"poem\": \"a\\nb\"}\n```").expect("parse fenced");
        assert_eq!(parsed.poem, "a\nb");
        let parsed: PoemResponse = parse_model_json(r#"{"poem": "plain"}"#).expect("parse plain");
        assert_eq!(parsed.poem, "plain");
        assert!(parse_model_json::<PoemResponse>("roses are red").is_err());
    }

    #[test]
    fn poem_prompt_names_language_and_analysis() {
        let prompt = poem_prompt(&PoemRequest {
            image_analysis: "Objects: cat. Scenes: indoor. Emotions: calm".to_string(),
            language: Language::Zh,
        });
        assert!(prompt.starts_with("You are a poet."));
        assert!(prompt.contains("The poem should be in zh language."));
        assert!(prompt.contains("Image Analysis: Objects: cat. Scenes: indoor. Emotions: calm"));
        assert!(prompt.ends_with("Poem:"));
    }

    #[test]
    fn analysis_body_inlines_the_image() {
        let request = AnalysisRequest {
            image: UploadedImage::from_bytes("image/png", b"hello"),
        };
        let body = analysis_body(&request).expect("body");
        let inline = &body["contents"][0]["parts"][1]["inlineData"];
        assert_eq!(inline["mimeType"], "image/png");
        assert_eq!(inline["data"], "aGVsbG8=");
    }

    #[test]
    fn empty_candidates_are_invalid() {
        let response: GenerateContentResponse =
            serde_json::from_value(json!({"promptFeedback": {"blockReason": "SAFETY"}}))
                .expect("parse");
        let err = response_text(response).expect_err("no text");
        assert!(err.to_string().contains("SAFETY"));
    }

    #[tokio::test]
    async fn analyze_against_fake_service() {
        let router = axum::Router::new().route(
            "/v1beta/models/{call}",
            axum::routing::post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(
                    headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()),
                    Some("test-key")
                );
                assert!(body["contents"][0]["parts"][1]["inlineData"].is_object());
                Json(candidate(
                    r#"{"objects":["cat"],"scenes":["indoor"],"emotions":["calm"]}"#,
                ))
            }),
        );
        let client = client(fake_gemini(router).await);
        let response = client
            .analyze(AnalysisRequest {
                image: UploadedImage::from_bytes("image/png", b"png"),
            })
            .await
            .expect("analyze");
        assert_eq!(
            crate::pipeline::AnalysisResult::from(response).summary(),
            "Objects: cat. Scenes: indoor. Emotions: calm"
        );
    }

    #[tokio::test]
    async fn poem_against_fake_service() {
        let router = axum::Router::new().route(
            "/v1beta/models/{call}",
            axum::routing::post(|| async { Json(candidate(r#"{"poem":"Soft paws"}"#)) }),
        );
        let client = client(fake_gemini(router).await);
        let response = client
            .generate(PoemRequest {
                image_analysis: "Objects: cat".to_string(),
                language: Language::En,
            })
            .await
            .expect("generate");
        assert_eq!(response.poem, "Soft paws");
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let router = axum::Router::new().route(
            "/v1beta/models/{call}",
            axum::routing::post(|| async {
                (StatusCode::TOO_MANY_REQUESTS, "quota exceeded").into_response()
            }),
        );
        let client = client(fake_gemini(router).await);
        let err = client
            .generate(PoemRequest {
                image_analysis: String::new(),
                language: Language::En,
            })
            .await
            .expect_err("should fail");
        assert!(matches!(err, AiError::Status(429, ref body) if body == "quota exceeded"));
    }
}
