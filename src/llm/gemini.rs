//! Gemini chat provider.
//!
//! Talks to the Generative Language API directly over HTTP. System
//! messages map onto `systemInstruction`, assistant turns onto the `model`
//! role. Streaming uses `streamGenerateContent?alt=sse`.

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use super::provider::{sse_data_events, ChatProvider, ProviderReply};
use crate::types::{AppError, ChatMessage, MessageRole, ProviderError};
use crate::utils::config::{LlmConfig, ProviderEndpoint};

pub struct GeminiChat {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    models: Vec<String>,
    temperature: f32,
}

impl GeminiChat {
    pub fn new(endpoint: &ProviderEndpoint, llm: &LlmConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.endpoint.trim_end_matches('/').to_string(),
            api_key: endpoint.api_key.clone(),
            models: llm.gemini_models.clone(),
            temperature: llm.temperature,
        }
    }

    fn request_body(&self, messages: &[ChatMessage]) -> GenerateRequest {
        let system_text: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
            .collect();

        let contents = messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| Content {
                role: Some(
                    match m.role {
                        MessageRole::Assistant => "model",
                        _ => "user",
                    }
                    .to_string(),
                ),
                parts: vec![Part {
                    text: m.content.clone(),
                }],
            })
            .collect();

        GenerateRequest {
            system_instruction: if system_text.is_empty() {
                None
            } else {
                Some(Content {
                    role: None,
                    parts: vec![Part {
                        text: system_text.join("\n\n"),
                    }],
                })
            },
            contents,
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        }
    }
}

#[async_trait]
impl ChatProvider for GeminiChat {
    fn name(&self) -> &str {
        "gemini"
    }

    fn models(&self) -> &[String] {
        &self.models
    }

    async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        stream: bool,
    ) -> std::result::Result<ProviderReply, ProviderError> {
        let verb = if stream {
            "streamGenerateContent?alt=sse&key="
        } else {
            "generateContent?key="
        };
        let url = format!(
            "{}/v1beta/models/{}:{}{}",
            self.endpoint, model, verb, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(&self.request_body(messages))
            .send()
            .await
            .map_err(ProviderError::transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| status.to_string());
            return Err(ProviderError::from_response(status, &body));
        }

        if stream {
            let tokens = sse_data_events(response).filter_map(|event| async move {
                match event {
                    Ok(payload) => match serde_json::from_str::<GenerateResponse>(&payload) {
                        Ok(chunk) => {
                            let text = chunk.text();
                            if text.is_empty() {
                                None
                            } else {
                                Some(Ok(text))
                            }
                        }
                        Err(e) => Some(Err(AppError::Llm(format!(
                            "malformed Gemini stream chunk: {e}"
                        )))),
                    },
                    Err(e) => Some(Err(AppError::Llm(format!("Gemini stream failed: {e}")))),
                }
            });
            return Ok(ProviderReply::Stream(Box::pin(tokens)));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Other(format!("malformed Gemini response: {e}")))?;
        let text = parsed.text();
        if text.is_empty() {
            return Err(ProviderError::Other("empty Gemini response".to_string()));
        }
        Ok(ProviderReply::Complete(text))
    }
}

// ============= Wire Types =============

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate's parts.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_text_concatenates_parts() {
        let parsed: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Frank"},{"text":"furt"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.text(), "Frankfurt");
    }

    #[test]
    fn response_without_candidates_is_empty() {
        let parsed: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.text(), "");
    }

    #[test]
    fn system_messages_become_system_instruction() {
        let provider = GeminiChat {
            client: reqwest::Client::new(),
            endpoint: "https://example.com".to_string(),
            api_key: "k".to_string(),
            models: vec!["gemini-1.5-flash".to_string()],
            temperature: 0.7,
        };
        let body = provider.request_body(&[
            ChatMessage::system("persona"),
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello"),
        ]);

        let instruction = body.system_instruction.expect("system instruction");
        assert_eq!(instruction.parts[0].text, "persona");
        assert_eq!(body.contents.len(), 2);
        assert_eq!(body.contents[0].role.as_deref(), Some("user"));
        assert_eq!(body.contents[1].role.as_deref(), Some("model"));
    }
}
