//! Chat forwarder
//!
//! Validates a question, resolves a bearer token, forwards the question to
//! the upstream chat endpoint, and normalizes the response shape. The
//! upstream spells its fields either `message`/`sources` or
//! `answer`/`citations` depending on the call; the normalized answer always
//! carries the `message`/`sources` spelling.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::auth::Authenticator;
use crate::config::UpstreamConfig;
use crate::{Error, Result};

/// A citation attached to a chat answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Cited document title
    pub title: String,
    /// Cited document URL
    pub url: String,
    /// Optional excerpt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Raw upstream chat response, tolerant of both field spellings
#[derive(Debug, Default, Deserialize)]
struct RawChatResponse {
    message: Option<String>,
    answer: Option<String>,
    sources: Option<Vec<Source>>,
    citations: Option<Vec<Source>>,
    suggestions: Option<Vec<String>>,
    #[serde(rename = "relatedContent")]
    related_content: Option<Value>,
}

impl RawChatResponse {
    fn normalize(self) -> ChatAnswer {
        ChatAnswer {
            message: self.message.or(self.answer).unwrap_or_default(),
            sources: self.sources.or(self.citations).unwrap_or_default(),
            suggestions: self.suggestions,
            related_content: self.related_content,
        }
    }
}

/// A normalized chat answer, uniform regardless of the upstream's
/// field spelling in this call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatAnswer {
    /// Answer text
    pub message: String,
    /// Citations backing the answer
    pub sources: Vec<Source>,
    /// Follow-up question suggestions, passed through when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
    /// Related content links, passed through when present
    #[serde(rename = "relatedContent", skip_serializing_if = "Option::is_none")]
    pub related_content: Option<Value>,
}

/// Forwards questions to the upstream chat endpoint
pub struct ChatForwarder {
    http: Client,
    chat_url: String,
    chat_timeout: std::time::Duration,
    authenticator: Authenticator,
}

impl ChatForwarder {
    /// Create a forwarder using the given authenticator
    #[must_use]
    pub fn new(http: Client, upstream: &UpstreamConfig, authenticator: Authenticator) -> Self {
        Self {
            http,
            chat_url: upstream.chat_url(),
            chat_timeout: upstream.chat_timeout,
            authenticator,
        }
    }

    /// Build a forwarder (client, cache, authenticator) from configuration
    #[must_use]
    pub fn from_config(config: &crate::config::Config) -> Self {
        let http = Client::new();
        let cache = std::sync::Arc::new(crate::auth::TokenCache::new());
        let authenticator = Authenticator::new(
            http.clone(),
            &config.upstream,
            config.resolve_credentials(),
            cache,
        );
        Self::new(http, &config.upstream, authenticator)
    }

    /// Whether upstream credentials were configured
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.authenticator.has_credentials()
    }

    /// Forward a question upstream and return the normalized answer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for input that is empty after trimming
    /// (before any I/O), [`Error::Config`]/[`Error::Auth`] from token
    /// resolution, [`Error::Upstream`] for a non-success chat status (the
    /// body is kept as raw text), and [`Error::Http`] for transport
    /// failures.
    pub async fn forward(&self, question: &str) -> Result<ChatAnswer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::Validation("Message is required".to_string()));
        }

        let token = self.authenticator.get_valid_token().await?;

        debug!(chars = question.len(), "forwarding question upstream");
        let response = self
            .http
            .post(&self.chat_url)
            .timeout(self.chat_timeout)
            .bearer_auth(token)
            .json(&json!({ "message": question }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // May be plain text; never parsed as JSON
            let body = response.text().await.unwrap_or_default();
            warn!(code = status.as_u16(), "chat request failed");
            return Err(Error::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let raw: RawChatResponse = response.json().await?;
        debug!("chat response received");
        Ok(raw.normalize())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn source(title: &str) -> Source {
        Source {
            title: title.to_string(),
            url: format!("https://example.com/{title}"),
            snippet: None,
        }
    }

    #[test]
    fn normalizes_native_spelling() {
        let raw: RawChatResponse =
            serde_json::from_str(r#"{"message":"hi","sources":[{"title":"t","url":"u"}]}"#)
                .unwrap();
        let answer = raw.normalize();
        assert_eq!(answer.message, "hi");
        assert_eq!(answer.sources.len(), 1);
        assert_eq!(answer.sources[0].title, "t");
    }

    #[test]
    fn normalizes_compat_spelling() {
        let raw: RawChatResponse =
            serde_json::from_str(r#"{"answer":"hi","citations":[{"title":"t","url":"u"}]}"#)
                .unwrap();
        let answer = raw.normalize();
        assert_eq!(answer.message, "hi");
        assert_eq!(answer.sources[0].url, "u");
    }

    #[test]
    fn native_spelling_wins_when_both_present() {
        let raw = RawChatResponse {
            message: Some("native".to_string()),
            answer: Some("compat".to_string()),
            sources: Some(vec![source("a")]),
            citations: Some(vec![source("b")]),
            ..Default::default()
        };
        let answer = raw.normalize();
        assert_eq!(answer.message, "native");
        assert_eq!(answer.sources[0].title, "a");
    }

    #[test]
    fn missing_fields_normalize_to_empty() {
        let raw: RawChatResponse = serde_json::from_str("{}").unwrap();
        let answer = raw.normalize();
        assert_eq!(answer.message, "");
        assert!(answer.sources.is_empty());
        assert!(answer.suggestions.is_none());
    }

    #[test]
    fn serialized_answer_uses_native_field_names() {
        let answer = ChatAnswer {
            message: "hi".to_string(),
            sources: vec![source("t")],
            suggestions: None,
            related_content: None,
        };
        let value = serde_json::to_value(&answer).unwrap();
        assert!(value.get("message").is_some());
        assert!(value.get("sources").is_some());
        // Optional fields are omitted, not null
        assert!(value.get("suggestions").is_none());
        assert!(value.get("relatedContent").is_none());
    }
}
