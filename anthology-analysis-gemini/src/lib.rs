use anthology_core::{AnalysisPayload, AnalysisProvider, AnalysisRequest, CoreError};
use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "anthology::provider::gemini";

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default timeout for HTTP requests. Long-form generation is slow.
const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Default number of retry attempts
const DEFAULT_MAX_RETRIES: u32 = 2;
/// Longest slice of an error body kept in error messages
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Song analysis backed by the Gemini `generateContent` API
pub struct GeminiProvider {
    client: ClientWithMiddleware,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    /// Create a new Gemini provider with a 120-second timeout and 2 retries.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigMissingField`] when `api_key` is blank, or an error if
    /// the HTTP client cannot be created.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, CoreError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(CoreError::ConfigMissingField {
                field: "analysis.api_key".to_string(),
            });
        }

        let base_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(5))
            .user_agent("Anthology/0.1")
            .build()?;

        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(DEFAULT_MAX_RETRIES);
        let client = ClientBuilder::new(base_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            api_key,
            model: model.into(),
        })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{GEMINI_API_URL}/models/{}:generateContent", self.model)
    }
}

#[async_trait]
impl AnalysisProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisPayload, CoreError> {
        info!(
            target: LOG_TARGET,
            "Analysing '{}' with {}", request.song_title, self.model
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(&request.song_title))
            .send()
            .await?;

        let status = response.status();
        debug!(target: LOG_TARGET, "Gemini response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(target: LOG_TARGET, "Gemini returned status: {}", status);
            let reason = if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                "Quota Exceeded".to_string()
            } else {
                format!(
                    "status {status}: {}",
                    body.chars().take(MAX_ERROR_BODY_CHARS).collect::<String>()
                )
            };
            return Err(CoreError::AnalysisProviderFailed {
                provider: self.name().to_string(),
                reason,
            });
        }

        let body: GenerateContentResponse = response.json().await?;
        parse_response(body)
    }
}

/// Prompt asking for the full analysis of one song
#[must_use]
pub fn build_prompt(song_title: &str) -> String {
    format!(
        r#"You are a professional music critic and expert translator specializing in Taylor Swift's "The Tortured Poets Department" (TTPD).

Task: Analyze "{song_title}" for a Chinese audience.

Requirements:
1. Background: deep insight in CHINESE. Explain the context, muse and themes.
2. Translation: FULL lyrics in CHINESE (faithful, expressive, elegant). The original lyrics MUST be accurate to the official song.
3. Vocabulary: 3 sophisticated English words from the lyrics with CHINESE definitions.
4. Connections: 2 links to other Taylor Swift songs in CHINESE.

Output strict JSON."#
    )
}

/// JSON schema the model must follow, in the API's `responseSchema` dialect
#[must_use]
pub fn response_schema() -> Value {
    let string = json!({ "type": "STRING" });
    json!({
        "type": "OBJECT",
        "properties": {
            "background": string,
            "mood": string,
            "lyrics": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "original": string,
                        "translation": string,
                        "annotation": string,
                    },
                    "required": ["original", "translation"],
                },
            },
            "vocabulary": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "word": string,
                        "definition": string,
                        "contextInSong": string,
                    },
                    "required": ["word", "definition", "contextInSong"],
                },
            },
            "connections": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "songTitle": string,
                        "album": string,
                        "explanation": string,
                    },
                    "required": ["songTitle", "album", "explanation"],
                },
            },
        },
        "required": ["background", "mood", "lyrics", "vocabulary", "connections"],
    })
}

fn request_body(song_title: &str) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": build_prompt(song_title) }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": response_schema(),
        },
    })
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Pull the model's JSON text out of the first candidate and parse it
fn parse_response(response: GenerateContentResponse) -> Result<AnalysisPayload, CoreError> {
    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| CoreError::MalformedAnalysis {
            reason: "response contained no text".to_string(),
        })?;

    let payload = AnalysisPayload::from_json(&text)?;
    debug!(
        target: LOG_TARGET,
        "Parsed analysis with {} lyric lines",
        payload.lyrics.len()
    );
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(text: &str) -> GenerateContentResponse {
        serde_json::from_value(json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }],
            "usageMetadata": { "totalTokenCount": 42 }
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_response_extracts_payload() {
        let text = r#"{
            "background": "背景",
            "mood": "Bittersweet",
            "lyrics": [
                { "original": "I love you, it's ruining my life", "translation": "我爱你，这毁了我的生活" },
                { "original": "Touch me while your bros play Grand Theft Auto", "translation": "……", "annotation": "Opening" }
            ],
            "vocabulary": [
                { "word": "ruining", "definition": "毁坏", "contextInSong": "chorus" }
            ],
            "connections": [
                { "songTitle": "loml", "album": "TTPD", "explanation": "同一张专辑" }
            ]
        }"#;

        let payload = parse_response(response(text)).unwrap();
        assert_eq!(payload.mood, "Bittersweet");
        assert_eq!(payload.lyrics.len(), 2);
        assert_eq!(payload.lyrics[1].note(), Some("Opening"));
        assert_eq!(payload.vocabulary[0].context_in_song, "chorus");
        assert_eq!(payload.connections[0].song_title, "loml");
        assert!(!payload.is_degraded());
    }

    #[test]
    fn test_parse_response_without_candidates() {
        let empty: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            parse_response(empty),
            Err(CoreError::MalformedAnalysis { .. })
        ));

        assert!(matches!(
            parse_response(response("   ")),
            Err(CoreError::MalformedAnalysis { .. })
        ));
    }

    #[test]
    fn test_parse_response_rejects_schema_mismatch() {
        let err = parse_response(response(r#"{ "mood": "missing everything else" }"#)).unwrap_err();
        assert!(matches!(err, CoreError::MalformedAnalysis { .. }));

        let err = parse_response(response("not json at all")).unwrap_err();
        assert!(matches!(err, CoreError::MalformedAnalysis { .. }));
    }

    #[test]
    fn test_prompt_mentions_song_and_requirements() {
        let prompt = build_prompt("The Black Dog");
        assert!(prompt.contains("\"The Black Dog\""));
        assert!(prompt.contains("3 sophisticated English words"));
        assert!(prompt.contains("2 links"));
    }

    #[test]
    fn test_request_body_shape() {
        let body = request_body("Fortnight");
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(
            body["generationConfig"]["responseSchema"]["required"]
                .as_array()
                .map(Vec::len),
            Some(5)
        );
        assert!(body["contents"][0]["parts"][0]["text"]
            .as_str()
            .is_some_and(|t| t.contains("Fortnight")));
    }

    #[test]
    fn test_blank_api_key_is_rejected() {
        assert!(matches!(
            GeminiProvider::new("  ", "gemini-3-pro-preview"),
            Err(CoreError::ConfigMissingField { .. })
        ));
    }

    #[test]
    fn test_endpoint_uses_model() {
        let provider = GeminiProvider::new("key", "gemini-2.5-flash").unwrap();
        assert_eq!(provider.model(), "gemini-2.5-flash");
        assert_eq!(
            provider.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(provider.name(), "gemini");
    }
}
