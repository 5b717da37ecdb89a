//! LLM provider clients and the response fallback chain.
//!
//! - [`provider`] - the [`ChatProvider`](provider::ChatProvider) seam and
//!   the uniform [`ProviderReply`](provider::ProviderReply) contract
//! - [`chain`] - ordered multi-provider fallback with streaming coercion
//! - [`messages`] - boundary normalization of raw conversation history
//! - [`gemini`] / [`openai_compat`] - concrete HTTP backends

pub mod chain;
pub mod gemini;
pub mod messages;
pub mod openai_compat;
pub mod provider;

pub use chain::{ChatChain, SYSTEM_PERSONA};
pub use messages::{normalize, RawHistoryEntry, HISTORY_WINDOW};
pub use provider::{ChatProvider, ProviderReply, TokenStream};
