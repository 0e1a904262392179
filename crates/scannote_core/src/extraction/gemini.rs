//! Gemini `generateContent` client.

use super::{ExtractionError, TextExtractor};
use crate::capture::StillImage;
use base64::Engine;
use log::{error, info};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const EXTRACTION_PROMPT: &str = "Extract all text from this image. Preserve formatting like paragraphs and line breaks where appropriate. If there is no text, return an empty string.";

/// Connection settings for the Gemini API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiConfig {
    /// `None` makes every extraction fail without a request.
    pub api_key: Option<String>,
    pub model: String,
    /// Scheme and host, without a trailing slash.
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl GeminiConfig {
    pub fn endpoint_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

/// Extractor backed by Gemini's vision model.
pub struct GeminiExtractor {
    client: Client,
    config: GeminiConfig,
}

impl GeminiExtractor {
    pub fn new(config: GeminiConfig) -> Result<Self, ExtractionError> {
        let client = Client::builder()
            .build()
            .map_err(|err| ExtractionError::communication(format!("http client: {err}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn request(&self, image: &StillImage) -> Result<String, ExtractionError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ExtractionError::communication("missing api key"))?;

        let encoded = base64::engine::general_purpose::STANDARD.encode(&image.bytes);
        let body = build_request_body(&encoded, image.mime_type());

        let response = self
            .client
            .post(self.config.endpoint_url())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .map_err(|err| ExtractionError::communication(format!("transport: {err}")))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|err| ExtractionError::communication(format!("read body: {err}")))?;
        if !status.is_success() {
            return Err(ExtractionError::communication(format!("status {status}")));
        }
        parse_response_text(&text)
    }
}

impl TextExtractor for GeminiExtractor {
    fn extract(&self, image: &StillImage) -> Result<String, ExtractionError> {
        let started_at = Instant::now();
        match self.request(image) {
            Ok(text) => {
                info!(
                    "event=text_extract module=extraction status=ok model={} duration_ms={} text_len={}",
                    self.config.model,
                    started_at.elapsed().as_millis(),
                    text.len()
                );
                Ok(text)
            }
            Err(err) => {
                error!(
                    "event=text_extract module=extraction status=error model={} duration_ms={} error={}",
                    self.config.model,
                    started_at.elapsed().as_millis(),
                    err.details()
                );
                Err(err)
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 2],
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
    Text {
        text: &'a str,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

fn build_request_body<'a>(
    encoded_image: &'a str,
    mime_type: &'a str,
) -> GenerateContentRequest<'a> {
    GenerateContentRequest {
        contents: [RequestContent {
            parts: [
                RequestPart::Inline {
                    inline_data: InlineData {
                        mime_type,
                        data: encoded_image,
                    },
                },
                RequestPart::Text {
                    text: EXTRACTION_PROMPT,
                },
            ],
        }],
    }
}

/// Joins the text parts of the first candidate. No candidate means no text.
fn parse_response_text(body: &str) -> Result<String, ExtractionError> {
    let response: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|err| ExtractionError::communication(format!("decode body: {err}")))?;
    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::{
        build_request_body, parse_response_text, GeminiConfig, GeminiExtractor, EXTRACTION_PROMPT,
    };
    use crate::capture::StillImage;
    use crate::extraction::TextExtractor;

    fn tiny_still() -> StillImage {
        StillImage {
            width: 1,
            height: 1,
            bytes: vec![0x89, b'P', b'N', b'G'],
        }
    }

    #[test]
    fn request_body_matches_generate_content_shape() {
        let body = serde_json::to_value(build_request_body("QUJD", "image/png")).unwrap();
        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[0]["inlineData"]["data"], "QUJD");
        assert_eq!(parts[1]["text"], EXTRACTION_PROMPT);
    }

    #[test]
    fn response_text_joins_first_candidate_parts() {
        let body = r#"{"candidates":[
            {"content":{"parts":[{"text":"Line one\n"},{"text":"Line two"}]}},
            {"content":{"parts":[{"text":"ignored"}]}}
        ]}"#;
        assert_eq!(parse_response_text(body).unwrap(), "Line one\nLine two");
    }

    #[test]
    fn response_without_candidates_is_empty_text() {
        assert_eq!(parse_response_text("{}").unwrap(), "");
    }

    #[test]
    fn undecodable_response_is_generic_failure() {
        let err = parse_response_text("<html>").unwrap_err();
        assert_eq!(err.to_string(), "Failed to communicate with the AI model.");
        assert!(err.details().starts_with("decode body"));
    }

    #[test]
    fn endpoint_url_trims_trailing_slash() {
        let config = GeminiConfig {
            base_url: "http://localhost:8080/".to_string(),
            ..GeminiConfig::default()
        };
        assert_eq!(
            config.endpoint_url(),
            "http://localhost:8080/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn missing_api_key_fails_without_request() {
        let extractor = GeminiExtractor::new(GeminiConfig::default()).unwrap();
        let err = extractor.extract(&tiny_still()).unwrap_err();
        assert_eq!(err.details(), "missing api key");
    }

    #[test]
    fn unreachable_service_is_generic_failure() {
        let extractor = GeminiExtractor::new(GeminiConfig {
            api_key: Some("test-key".to_string()),
            base_url: "http://127.0.0.1:9".to_string(),
            ..GeminiConfig::default()
        })
        .unwrap();
        let err = extractor.extract(&tiny_still()).unwrap_err();
        assert_eq!(err.user_message(), "Failed to communicate with the AI model.");
        assert!(err.details().starts_with("transport"));
    }
}
