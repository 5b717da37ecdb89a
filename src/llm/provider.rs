//! Chat provider abstraction and the uniform reply contract.
//!
//! Every LLM backend is wrapped behind [`ChatProvider`] and its output is
//! coerced into [`ProviderReply`] before the chain hands it to the caller.
//! The caller therefore sees the same shape regardless of which provider
//! answered or whether it streams natively.

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::pin::Pin;

use crate::types::{ChatMessage, ProviderError, Result};

/// Lazy, finite, non-restartable sequence of text fragments.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A chat backend offering one or more model variants.
///
/// `models()` lists variants in fixed preference order (cheaper/faster
/// first); the chain walks them and skips the rest of a provider's
/// variants on a rate-limit signal.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn name(&self) -> &str;

    fn models(&self) -> &[String];

    /// Run one completion against a specific model variant.
    ///
    /// `stream` requests the provider's native streaming mode where it has
    /// one; providers without native streaming may return
    /// [`ProviderReply::Complete`] regardless and the chain synthesizes a
    /// fragment stream.
    async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        stream: bool,
    ) -> std::result::Result<ProviderReply, ProviderError>;
}

/// The normalized result of a provider call: either a token stream or a
/// single completed text.
pub enum ProviderReply {
    Stream(TokenStream),
    Complete(String),
}

impl ProviderReply {
    /// Coerce into a token stream, synthesizing word-boundary fragments
    /// when the provider only produced a complete string.
    pub fn into_token_stream(self) -> TokenStream {
        match self {
            ProviderReply::Stream(stream) => stream,
            ProviderReply::Complete(text) => synthesize_stream(text),
        }
    }

    /// Coerce into a single string, draining the stream when necessary.
    pub async fn into_text(self) -> Result<String> {
        match self {
            ProviderReply::Complete(text) => Ok(text),
            ProviderReply::Stream(mut stream) => {
                let mut text = String::new();
                while let Some(fragment) = stream.next().await {
                    text.push_str(&fragment?);
                }
                Ok(text)
            }
        }
    }
}

impl std::fmt::Debug for ProviderReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderReply::Stream(_) => f.write_str("ProviderReply::Stream(..)"),
            ProviderReply::Complete(text) => {
                f.debug_tuple("ProviderReply::Complete").field(text).finish()
            }
        }
    }
}

/// Split a completed text into a fragment stream on word boundaries, so
/// callers that asked for streaming get one even from non-streaming
/// providers.
pub fn synthesize_stream(text: String) -> TokenStream {
    let fragments: Vec<Result<String>> = text
        .split_inclusive(' ')
        .map(|fragment| Ok(fragment.to_string()))
        .collect();
    Box::pin(futures::stream::iter(fragments))
}

/// Extract the `data:` payloads from an SSE response body.
///
/// Yields one payload per event and stops at the `[DONE]` sentinel. Used by
/// both the Gemini and OpenAI-compatible streaming parsers.
pub(crate) fn sse_data_events(
    response: reqwest::Response,
) -> impl Stream<Item = std::result::Result<String, ProviderError>> {
    async_stream::stream! {
        let mut body = response.bytes_stream();
        let mut buffer = String::new();

        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(ProviderError::transport(e));
                    return;
                }
            };
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(newline) = buffer.find('\n') {
                let line: String = buffer.drain(..=newline).collect();
                let line = line.trim_end();
                let Some(payload) = line.strip_prefix("data:") else {
                    continue;
                };
                let payload = payload.trim_start();
                if payload == "[DONE]" {
                    return;
                }
                if !payload.is_empty() {
                    yield Ok(payload.to_string());
                }
            }
        }
    }
}
