//! Request and response models of the text generation endpoints.
//!
//! A [CompletionRequest] is sent as-is to the synchronous, streaming and asynchronous completion
//! endpoints (and to the completion tokenizer). Every endpoint answers with one or more
//! [CompletionResult]s.
//!
//! Example Usage:
//! ```rust
//! use yafm::completion::{CompletionRequest, Message};
//!
//! let request = CompletionRequest::builder("gpt://b1g.../yandexgpt/latest")
//!     .message(Message::system("You are a terse assistant."))
//!     .message(Message::user("Name three rivers of Siberia."))
//!     .temperature(0.3)
//!     .max_tokens(200)
//!     .build()?;
//! ```

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::json_utils::stringified_u64;

pub const DEFAULT_TEMPERATURE: f64 = 0.6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Defines the behaviour of the model.
    System,
    /// A previous answer of the model.
    Assistant,
    User,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub text: String,
}

impl Message {
    pub fn new(role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(MessageRole::System, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageRole::User, text)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOptions {
    /// Must match the endpoint the request is sent through, see [crate::client::Client::complete]
    /// and [crate::client::Client::complete_streaming].
    #[serde(default)]
    pub stream: bool,
    /// Sampling temperature, within `[0, 1]`.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(
        default,
        with = "stringified_u64::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_tokens: Option<u64>,
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            stream: false,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
        }
    }
}

impl CompletionOptions {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(Error::Request(format!(
                "temperature must be within [0, 1], got {}",
                self.temperature
            )));
        }

        if self.max_tokens == Some(0) {
            return Err(Error::Request("max_tokens must be positive".into()));
        }

        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    pub model_uri: String,
    #[serde(default)]
    pub completion_options: CompletionOptions,
    pub messages: Vec<Message>,
}

impl CompletionRequest {
    pub fn builder(model_uri: impl Into<String>) -> CompletionRequestBuilder {
        CompletionRequestBuilder::new(model_uri)
    }

    pub fn is_stream(&self) -> bool {
        self.completion_options.stream
    }

    /// Check the request locally. The client calls this before anything is sent.
    pub fn validate(&self) -> Result<()> {
        if self.model_uri.trim().is_empty() {
            return Err(Error::Request("model_uri must not be empty".into()));
        }

        if self.messages.is_empty() {
            return Err(Error::Request(
                "a completion request needs at least one message".into(),
            ));
        }

        self.completion_options.validate()
    }
}

/// Builder for [CompletionRequest].
pub struct CompletionRequestBuilder {
    model_uri: String,
    messages: Vec<Message>,
    options: CompletionOptions,
}

impl CompletionRequestBuilder {
    pub fn new(model_uri: impl Into<String>) -> Self {
        Self {
            model_uri: model_uri.into(),
            messages: Vec::new(),
            options: CompletionOptions::default(),
        }
    }

    /// Appends a message to the conversation.
    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Appends a list of messages to the conversation.
    pub fn messages(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        self.messages.extend(messages);
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.options.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u64) -> Self {
        self.options.max_tokens = Some(max_tokens);
        self
    }

    /// Sets the streaming flag. A streamed request must go through
    /// [crate::client::Client::complete_streaming].
    pub fn stream(mut self, stream: bool) -> Self {
        self.options.stream = stream;
        self
    }

    pub fn build(self) -> Result<CompletionRequest> {
        let request = CompletionRequest {
            model_uri: self.model_uri,
            completion_options: self.options,
            messages: self.messages,
        };
        request.validate()?;
        Ok(request)
    }
}

/// Status of an [Alternative]. In a stream every snapshot but the last is
/// [AlternativeStatus::Partial].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum AlternativeStatus {
    #[default]
    #[serde(rename = "ALTERNATIVE_STATUS_UNSPECIFIED")]
    Unspecified,
    #[serde(rename = "ALTERNATIVE_STATUS_PARTIAL")]
    Partial,
    /// Generation stopped because the token limit was reached.
    #[serde(rename = "ALTERNATIVE_STATUS_TRUNCATED_FINAL")]
    TruncatedFinal,
    #[serde(rename = "ALTERNATIVE_STATUS_FINAL")]
    Final,
    /// The answer was withheld by the content filter.
    #[serde(rename = "ALTERNATIVE_STATUS_CONTENT_FILTER")]
    ContentFilter,
}

impl AlternativeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlternativeStatus::Unspecified => "ALTERNATIVE_STATUS_UNSPECIFIED",
            AlternativeStatus::Partial => "ALTERNATIVE_STATUS_PARTIAL",
            AlternativeStatus::TruncatedFinal => "ALTERNATIVE_STATUS_TRUNCATED_FINAL",
            AlternativeStatus::Final => "ALTERNATIVE_STATUS_FINAL",
            AlternativeStatus::ContentFilter => "ALTERNATIVE_STATUS_CONTENT_FILTER",
        }
    }

    /// `true` for the statuses that end a generation normally.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            AlternativeStatus::Final | AlternativeStatus::TruncatedFinal
        )
    }
}

impl std::str::FromStr for AlternativeStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        [
            AlternativeStatus::Unspecified,
            AlternativeStatus::Partial,
            AlternativeStatus::TruncatedFinal,
            AlternativeStatus::Final,
            AlternativeStatus::ContentFilter,
        ]
        .into_iter()
        .find(|status| status.as_str().eq_ignore_ascii_case(s))
        .ok_or_else(|| format!("unknown alternative status `{s}`"))
    }
}

// The API has been seen sending lowercase statuses, so matching ignores case.
impl<'de> Deserialize<'de> for AlternativeStatus {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One generated answer. The API's name for what other providers call a "choice".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub message: Message,
    pub status: AlternativeStatus,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    #[serde(with = "stringified_u64")]
    pub input_text_tokens: u64,
    #[serde(with = "stringified_u64")]
    pub completion_tokens: u64,
    /// Expected to equal `input_text_tokens + completion_tokens`; not checked locally.
    #[serde(with = "stringified_u64")]
    pub total_tokens: u64,
}

impl std::fmt::Display for Usage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Input tokens: {} Completion tokens: {} Total tokens: {}",
            self.input_text_tokens, self.completion_tokens, self.total_tokens
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResult {
    pub alternatives: Vec<Alternative>,
    pub usage: Usage,
    /// Usually a date, `DD.MM.YYYY`.
    pub model_version: String,
}

impl CompletionResult {
    /// Text of the first alternative.
    pub fn text(&self) -> Option<&str> {
        self.alternatives.first().map(|alt| alt.message.text.as_str())
    }

    /// Whether any alternative reached a final status.
    pub fn is_final(&self) -> bool {
        self.alternatives.iter().any(|alt| alt.status.is_final())
    }
}
