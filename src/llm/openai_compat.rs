//! OpenAI-compatible chat provider.
//!
//! Covers OpenRouter and any other endpoint speaking the
//! `/chat/completions` wire shape. OpenRouter additionally receives the
//! `HTTP-Referer` and `X-Title` attribution headers.

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use super::provider::{sse_data_events, ChatProvider, ProviderReply};
use crate::types::{AppError, ChatMessage, ProviderError};
use crate::utils::config::ProviderEndpoint;

pub struct OpenAiCompatChat {
    name: String,
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    models: Vec<String>,
    temperature: f32,
    /// Extra request headers (OpenRouter attribution).
    headers: Vec<(String, String)>,
}

impl OpenAiCompatChat {
    pub fn new(
        name: impl Into<String>,
        endpoint: &ProviderEndpoint,
        models: Vec<String>,
        temperature: f32,
    ) -> Self {
        Self {
            name: name.into(),
            client: reqwest::Client::new(),
            endpoint: endpoint.endpoint.trim_end_matches('/').to_string(),
            api_key: endpoint.api_key.clone(),
            models,
            temperature,
            headers: Vec::new(),
        }
    }

    /// Attach OpenRouter's attribution headers.
    pub fn with_attribution(mut self, referer: &str, title: &str) -> Self {
        self.headers
            .push(("HTTP-Referer".to_string(), referer.to_string()));
        self.headers.push(("X-Title".to_string(), title.to_string()));
        self
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatChat {
    fn name(&self) -> &str {
        &self.name
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
        let body = CompletionRequest {
            model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: self.temperature,
            stream,
        };

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&body);
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(ProviderError::transport)?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_else(|_| status.to_string());
            return Err(ProviderError::from_response(status, &text));
        }

        if stream {
            let tokens = sse_data_events(response).filter_map(|event| async move {
                match event {
                    Ok(payload) => match serde_json::from_str::<StreamChunk>(&payload) {
                        Ok(chunk) => chunk
                            .choices
                            .into_iter()
                            .next()
                            .and_then(|choice| choice.delta.content)
                            .filter(|text| !text.is_empty())
                            .map(Ok),
                        Err(e) => Some(Err(AppError::Llm(format!(
                            "malformed completion stream chunk: {e}"
                        )))),
                    },
                    Err(e) => Some(Err(AppError::Llm(format!("completion stream failed: {e}")))),
                }
            });
            return Ok(ProviderReply::Stream(Box::pin(tokens)));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Other(format!("malformed completion response: {e}")))?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        if text.is_empty() {
            return Err(ProviderError::Other(format!(
                "empty completion from {model}"
            )));
        }
        Ok(ProviderReply::Complete(text))
    }
}

// ============= Wire Types =============

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: Delta,
}

#[derive(Debug, Deserialize)]
struct Delta {
    content: Option<String>,
}
