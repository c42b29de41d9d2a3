//! Outbound text-generation boundary.
//!
//! Every upstream reply is untrusted free text; the pipeline owns all
//! validation. The trait exists so tests can substitute scripted fakes for
//! the real HTTP-backed clients.

mod chat;

pub use chat::ChatCompletionsClient;

use async_trait::async_trait;

/// Network or protocol failure calling an external generation service.
///
/// Fatal to the owning pipeline run; never retried at this layer.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("failed to reach {service}: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{service} returned status {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },
    #[error("unexpected {service} response envelope: {detail}")]
    Envelope {
        service: &'static str,
        detail: String,
    },
}

/// A non-deterministic text-generation service.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Request a free-form prose completion.
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ProviderError>;

    /// Request a completion whose reply is expected to be one JSON object.
    ///
    /// Implementations that support a structured-output mode should enable
    /// it here; the reply is still treated as untrusted text by callers.
    async fn complete_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ProviderError> {
        self.complete(system_prompt, user_prompt).await
    }
}
