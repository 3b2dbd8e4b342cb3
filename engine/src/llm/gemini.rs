use super::{GenerateRequest, LLMError, ModelBackend, TurnRole};
use crate::config::AssistantConfig;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Gemini `generateContent` REST backend
pub struct GeminiBackend {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &AssistantConfig) -> Self {
        Self::new(config.base_url.clone(), config.model.clone())
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Build the request body: prior turns, then the new utterance, plus the persona.
fn build_payload(request: &GenerateRequest<'_>) -> Value {
    let mut contents: Vec<Value> = request
        .history
        .iter()
        .map(|turn| {
            json!({
                "role": if turn.role == TurnRole::Model { "model" } else { "user" },
                "parts": [{"text": turn.text}]
            })
        })
        .collect();

    contents.push(json!({
        "role": "user",
        "parts": [{"text": request.utterance}]
    }));

    let mut payload = serde_json::Map::new();
    payload.insert("contents".to_string(), json!(contents));

    if !request.system_instruction.trim().is_empty() {
        payload.insert(
            "systemInstruction".to_string(),
            json!({"parts": [{"text": request.system_instruction}]}),
        );
    }

    Value::Object(payload)
}

/// Concatenate the text parts of the first candidate.
fn extract_text(data: &Value) -> super::Result<String> {
    let candidate = data
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| LLMError::ParseError("No candidates in response".to_string()))?;

    let content_item = candidate
        .get("content")
        .ok_or_else(|| LLMError::ParseError("No content in candidate".to_string()))?;

    let parts = content_item
        .get("parts")
        .and_then(|p| p.as_array())
        .ok_or_else(|| LLMError::ParseError("No parts in candidate content".to_string()))?;

    let mut full_text = String::new();
    for part in parts {
        if let Some(text) = part.get("text").and_then(|t| t.as_str()) {
            full_text.push_str(text);
        }
    }

    if full_text.trim().is_empty() {
        return Err(LLMError::ParseError(
            "Candidate contained no text".to_string(),
        ));
    }

    Ok(full_text)
}

/// Status code plus Gemini's error status name. The error message is dropped
/// because the backend may echo request content in it.
fn error_summary(status: u16, body: &str) -> String {
    let kind = serde_json::from_str::<Value>(body).ok().and_then(|data| {
        data.get("error")
            .and_then(|e| e.get("status"))
            .and_then(|s| s.as_str())
            .filter(|s| s.chars().all(|c| c.is_ascii_uppercase() || c == '_'))
            .map(str::to_string)
    });

    match kind {
        Some(kind) => format!("HTTP {} {}", status, kind),
        None => format!("HTTP {}", status),
    }
}

#[async_trait]
impl ModelBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: GenerateRequest<'_>) -> super::Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", request.credential.unsecure())
            .json(&build_payload(&request))
            .send()
            .await
            .map_err(|e| LLMError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let summary = error_summary(status.as_u16(), &body);

            return Err(match status.as_u16() {
                400 | 404 => LLMError::InvalidRequest(summary),
                429 => LLMError::RateLimitExceeded,
                401 | 403 => LLMError::AuthenticationFailed(summary),
                _ => LLMError::ProviderUnavailable(format!("Gemini API error ({})", summary)),
            });
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        extract_text(&data)
    }
}
