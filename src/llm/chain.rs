//! Multi-provider LLM fallback chain.
//!
//! Providers are tried strictly in configuration order, model variants
//! within a provider in fixed preference order. A rate-limit signal
//! abandons the remaining variants of that provider immediately; any other
//! failure advances to the next variant. At most one provider's output is
//! ever returned, and failures along the way surface only in logs.

use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, warn};

use super::gemini::GeminiChat;
use super::messages::{sanitize, HISTORY_WINDOW};
use super::openai_compat::OpenAiCompatChat;
use super::provider::{ChatProvider, ProviderReply};
use crate::types::{AppError, ChatMessage, ProviderError, Result};
use crate::utils::config::AppConfig;

/// Persona instruction prepended to every conversation.
pub const SYSTEM_PERSONA: &str = "You are a helpful assistant for Arnob Mahmud's \
portfolio website. Be friendly, professional, and concise. Use the FAQ context \
to give accurate answers. If you don't know something, say so.";

pub struct ChatChain {
    providers: Vec<Arc<dyn ChatProvider>>,
}

impl ChatChain {
    pub fn new(providers: Vec<Arc<dyn ChatProvider>>) -> Self {
        Self { providers }
    }

    /// Build the chain from configuration: Gemini first (reliable, cheap),
    /// then OpenRouter. Disabled providers are left out entirely.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut providers: Vec<Arc<dyn ChatProvider>> = Vec::new();

        if config.providers.gemini.enabled {
            providers.push(Arc::new(GeminiChat::new(&config.providers.gemini, &config.llm)));
        }
        if config.providers.openrouter.enabled {
            providers.push(Arc::new(
                OpenAiCompatChat::new(
                    "openrouter",
                    &config.providers.openrouter,
                    config.llm.openrouter_models.clone(),
                    config.llm.temperature,
                )
                .with_attribution(&config.providers.referer, &config.providers.app_title),
            ));
        }

        Self::new(providers)
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Prepend the persona system instruction (with retrieved context as a
    /// labeled section) and re-sanitize the history window.
    fn assemble(&self, history: &[ChatMessage], context: Option<&str>) -> Vec<ChatMessage> {
        let mut system = SYSTEM_PERSONA.to_string();
        if let Some(ctx) = context.map(str::trim).filter(|c| !c.is_empty()) {
            system.push_str("\n\nFAQ Context:\n");
            system.push_str(ctx);
        }

        let recent = sanitize(history);
        let start = recent.len().saturating_sub(HISTORY_WINDOW);

        let mut messages = Vec::with_capacity(1 + recent.len() - start);
        messages.push(ChatMessage::system(system));
        messages.extend(recent[start..].iter().cloned());
        messages
    }

    /// Produce a reply for the conversation, walking the fallback chain.
    ///
    /// The returned [`ProviderReply`] matches the `stream` flag regardless
    /// of what the answering provider natively produced.
    ///
    /// # Errors
    ///
    /// Fails only when every configured provider has been exhausted; the
    /// error carries the last provider failure.
    pub async fn respond(
        &self,
        history: &[ChatMessage],
        context: Option<&str>,
        stream: bool,
    ) -> Result<ProviderReply> {
        if self.providers.is_empty() {
            return Err(AppError::Llm("no chat providers configured".to_string()));
        }

        let messages = self.assemble(history, context);
        let mut last_error: Option<ProviderError> = None;

        'providers: for provider in &self.providers {
            for model in provider.models() {
                match provider.chat(model, &messages, stream).await {
                    Ok(reply) => {
                        debug!(provider = provider.name(), %model, "chat provider answered");
                        return if stream {
                            Ok(ProviderReply::Stream(reply.into_token_stream()))
                        } else {
                            Ok(ProviderReply::Complete(reply.into_text().await?))
                        };
                    }
                    Err(e) if e.is_rate_limited() => {
                        warn!(
                            provider = provider.name(),
                            %model,
                            error = %e,
                            "provider rate limited, skipping its remaining models"
                        );
                        last_error = Some(e);
                        continue 'providers;
                    }
                    Err(e) => {
                        warn!(
                            provider = provider.name(),
                            %model,
                            error = %e,
                            "chat model failed, trying next"
                        );
                        last_error = Some(e);
                    }
                }
            }
        }

        let detail = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no provider produced a reply".to_string());
        Err(AppError::Llm(format!("all chat providers failed: {detail}")))
    }

    /// Convenience wrapper used by tests and non-streaming callers:
    /// respond and drain to a single string.
    pub async fn respond_text(
        &self,
        history: &[ChatMessage],
        context: Option<&str>,
    ) -> Result<String> {
        let mut reply = self.respond(history, context, false).await?;
        match &mut reply {
            ProviderReply::Complete(text) => Ok(std::mem::take(text)),
            ProviderReply::Stream(stream) => {
                let mut text = String::new();
                while let Some(fragment) = stream.next().await {
                    text.push_str(&fragment?);
                }
                Ok(text)
            }
        }
    }
}
