//! Client for OpenAI-compatible chat-completions APIs.
//!
//! Both upstreams the pipeline talks to (the web-search generator and the
//! structuring generator) speak the same wire shape, so one client type
//! covers both; instances differ in base URL, model, and whether the API
//! honors a JSON-object response format.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ProviderError, TextGenerator};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// HTTP-backed [`TextGenerator`] for one chat-completions endpoint.
pub struct ChatCompletionsClient {
    service: &'static str,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    json_object_mode: bool,
    client: reqwest::Client,
}

impl ChatCompletionsClient {
    /// Client for the web-search-capable generator used by the harvester and
    /// the market-rent estimator.
    pub fn searcher(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        Self::build("search", base_url, api_key, model, 0.2, false, timeout)
    }

    /// Client for the strict-JSON structuring generator used by the
    /// normalizer and the rent quote parse.
    pub fn structurer(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        Self::build("parser", base_url, api_key, model, 0.1, true, timeout)
    }

    fn build(
        service: &'static str,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
        json_object_mode: bool,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ProviderError::Transport { service, source })?;

        Ok(Self {
            service,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature,
            json_object_mode,
            client,
        })
    }

    async fn request(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        want_json: bool,
    ) -> Result<String, ProviderError> {
        let service = self.service;
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: self.temperature,
            response_format: (want_json && self.json_object_mode)
                .then_some(ResponseFormat { kind: "json_object" }),
        };

        tracing::debug!(service, model = %self.model, "dispatching completion request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|source| ProviderError::Transport { service, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                service,
                status: status.as_u16(),
                body,
            });
        }

        let envelope: ChatResponse =
            response
                .json()
                .await
                .map_err(|source| ProviderError::Envelope {
                    service,
                    detail: source.to_string(),
                })?;

        let content = envelope
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::Envelope {
                service,
                detail: "reply carried no choices".to_string(),
            })?;

        tracing::debug!(service, reply_length = content.len(), "completion received");
        Ok(content)
    }
}

#[async_trait]
impl TextGenerator for ChatCompletionsClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ProviderError> {
        self.request(system_prompt, user_prompt, false).await
    }

    async fn complete_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ProviderError> {
        self.request(system_prompt, user_prompt, true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client = ChatCompletionsClient::searcher(
            "https://api.example.test/",
            "key",
            "sonar-pro",
            Duration::from_secs(5),
        )
        .expect("client builds");
        assert_eq!(client.base_url, "https://api.example.test");
    }

    #[test]
    fn json_mode_is_only_requested_when_supported() {
        let searcher = ChatCompletionsClient::searcher(
            "https://api.example.test",
            "key",
            "sonar-pro",
            Duration::from_secs(5),
        )
        .expect("client builds");
        assert!(!searcher.json_object_mode);

        let structurer = ChatCompletionsClient::structurer(
            "https://api.example.test",
            "key",
            "gpt-4.1-mini",
            Duration::from_secs(5),
        )
        .expect("client builds");
        assert!(structurer.json_object_mode);
    }

    #[test]
    fn envelope_without_choices_deserializes_to_empty() {
        let envelope: ChatResponse = serde_json::from_str("{}").expect("parses");
        assert!(envelope.choices.is_empty());
    }

    #[test]
    fn request_serializes_json_object_mode() {
        let request = ChatRequest {
            model: "gpt-4.1-mini",
            messages: [
                ChatMessage {
                    role: "system",
                    content: "s",
                },
                ChatMessage {
                    role: "user",
                    content: "u",
                },
            ],
            temperature: 0.1,
            response_format: Some(ResponseFormat {
                kind: "json_object",
            }),
        };
        let json = serde_json::to_value(&request).expect("serializes");
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["messages"][0]["role"], "system");
    }
}
