//! The API client.
//!
//! A [Client] is built once, with its credentials, and is immutable afterwards. It is cheap to
//! clone; clones share the transport. Requests go through the transport given to the builder
//! (a [reqwest::Client] by default).
//!
//! # Example
//! ```
//! use yafm::client::Client;
//! use yafm::completion::{CompletionRequest, Message};
//! use yafm::models;
//!
//! let client = Client::builder()
//!     .iam_token("t1.9euelZq...")
//!     .folder_id("b1g...")
//!     .build()?;
//!
//! let request = CompletionRequest::builder(client.completion_model_uri(models::YANDEXGPT_LITE)?)
//!     .message(Message::user("Hello!"))
//!     .build()?;
//!
//! let result = client.complete(&request).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use tracing::{Instrument, Level, enabled, info_span};
use url::Url;

use crate::completion::{CompletionRequest, CompletionResult};
use crate::embeddings::{Embedding, EmbeddingRequest};
use crate::error::{DecodeError, Error, Result};
use crate::http_client::{self, HeaderMap, HeaderName, HeaderValue, HttpClientExt, NoBody};
use crate::models;
use crate::operation::{self, Operation};
use crate::response;
use crate::streaming::StreamingCompletion;
use crate::tokenize::{TokenizeRequest, TokenizeResult};

pub const YANDEX_API_BASE_URL: &str = "https://llm.api.cloud.yandex.net";

pub const FOLDER_ID_HEADER: &str = "x-folder-id";
pub const DATA_LOGGING_HEADER: &str = "x-data-logging-enabled";

const COMPLETION_PATH: &[&str] = &["foundationModels", "v1", "completion"];
const COMPLETION_ASYNC_PATH: &[&str] = &["foundationModels", "v1", "completionAsync"];
const OPERATIONS_PATH: &str = "operations";
const TOKENIZE_PATH: &[&str] = &["foundationModels", "v1", "tokenize"];
const TOKENIZE_COMPLETION_PATH: &[&str] = &["foundationModels", "v1", "tokenizeCompletion"];
const TEXT_EMBEDDING_PATH: &[&str] = &["foundationModels", "v1", "textEmbedding"];

const API_KEY_VAR: &str = "YANDEX_API_KEY";
const IAM_TOKEN_VAR: &str = "YANDEX_IAM_TOKEN";
const FOLDER_ID_VAR: &str = "YANDEX_FOLDER_ID";
const BASE_URL_VAR: &str = "YANDEX_BASE_URL";
const DATA_LOGGING_VAR: &str = "YANDEX_DATA_LOGGING_ENABLED";

/// How requests are authenticated.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// A service account API key. The folder id is optional.
    ApiKey(String),
    /// A short-lived IAM token, which always needs the folder the requests are billed to.
    IamToken { token: String, folder_id: String },
}

impl Credentials {
    /// Value of the `Authorization` header.
    pub fn authorization(&self) -> String {
        match self {
            Credentials::ApiKey(key) => format!("Api-Key {key}"),
            Credentials::IamToken { token, .. } => format!("Bearer {token}"),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::ApiKey(_) => f.debug_tuple("ApiKey").field(&"<REDACTED>").finish(),
            Credentials::IamToken { folder_id, .. } => f
                .debug_struct("IamToken")
                .field("token", &"<REDACTED>")
                .field("folder_id", folder_id)
                .finish(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientBuilderError {
    #[error("Either an API key or an IAM token must be provided")]
    MissingCredentials,

    #[error("Only one of an API key or an IAM token must be provided")]
    ConflictingCredentials,

    #[error("A folder id is required when using an IAM token")]
    MissingFolderId,

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),

    /// An invalid property value was provided during client construction.
    #[error("Invalid property: {0}")]
    InvalidProperty(String),
}

pub struct ClientBuilder<H = reqwest::Client> {
    api_key: Option<String>,
    iam_token: Option<String>,
    folder_id: Option<String>,
    data_logging_enabled: bool,
    base_url: String,
    http_headers: HeaderMap,
    http_client: H,
}

impl<H: Default> Default for ClientBuilder<H> {
    fn default() -> Self {
        Self {
            api_key: None,
            iam_token: None,
            folder_id: None,
            data_logging_enabled: false,
            base_url: YANDEX_API_BASE_URL.to_string(),
            http_headers: HeaderMap::new(),
            http_client: H::default(),
        }
    }
}

impl ClientBuilder<reqwest::Client> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<H> ClientBuilder<H> {
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn iam_token(mut self, iam_token: impl Into<String>) -> Self {
        self.iam_token = Some(iam_token.into());
        self
    }

    pub fn folder_id(mut self, folder_id: impl Into<String>) -> Self {
        self.folder_id = Some(folder_id.into());
        self
    }

    /// Set API key or IAM token (plus folder) in one go.
    pub fn credentials(self, credentials: Credentials) -> Self {
        match credentials {
            Credentials::ApiKey(key) => self.api_key(key),
            Credentials::IamToken { token, folder_id } => {
                self.iam_token(token).folder_id(folder_id)
            }
        }
    }

    /// Whether Yandex may log the request data. Off unless enabled here.
    pub fn data_logging_enabled(mut self, enabled: bool) -> Self {
        self.data_logging_enabled = enabled;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Extra headers sent with every request.
    pub fn http_headers(mut self, headers: HeaderMap) -> Self {
        self.http_headers = headers;
        self
    }

    /// Set the HTTP client for the API endpoint
    pub fn http_client<U>(self, http_client: U) -> ClientBuilder<U> {
        ClientBuilder {
            api_key: self.api_key,
            iam_token: self.iam_token,
            folder_id: self.folder_id,
            data_logging_enabled: self.data_logging_enabled,
            base_url: self.base_url,
            http_headers: self.http_headers,
            http_client,
        }
    }

    fn credentials_checked(&self) -> std::result::Result<Credentials, ClientBuilderError> {
        let api_key = non_empty(&self.api_key);
        let iam_token = non_empty(&self.iam_token);

        match (api_key, iam_token) {
            (Some(_), Some(_)) => Err(ClientBuilderError::ConflictingCredentials),
            (None, None) => Err(ClientBuilderError::MissingCredentials),
            (Some(key), None) => Ok(Credentials::ApiKey(key.to_string())),
            (None, Some(token)) => {
                let folder_id =
                    non_empty(&self.folder_id).ok_or(ClientBuilderError::MissingFolderId)?;
                Ok(Credentials::IamToken {
                    token: token.to_string(),
                    folder_id: folder_id.to_string(),
                })
            }
        }
    }

    /// Check the credentials and freeze the header set. Fails before any request is issued.
    pub fn build(self) -> std::result::Result<Client<H>, ClientBuilderError> {
        let credentials = self.credentials_checked()?;
        let folder_id = non_empty(&self.folder_id).map(Arc::<str>::from);

        let base_url = Url::parse(self.base_url.trim_end_matches('/')).map_err(|err| {
            ClientBuilderError::InvalidProperty(format!("base_url `{}`: {err}", self.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ClientBuilderError::InvalidProperty(format!(
                "base_url `{}` cannot carry a path",
                self.base_url
            )));
        }

        let mut headers = HeaderMap::new();

        let mut authorization = HeaderValue::from_str(&credentials.authorization())?;
        authorization.set_sensitive(true);
        headers.insert(AUTHORIZATION, authorization);

        if let Some(folder_id) = &folder_id {
            headers.insert(
                HeaderName::from_static(FOLDER_ID_HEADER),
                HeaderValue::from_str(folder_id)?,
            );
        }

        headers.insert(
            HeaderName::from_static(DATA_LOGGING_HEADER),
            HeaderValue::from_static(if self.data_logging_enabled {
                "true"
            } else {
                "false"
            }),
        );

        headers.extend(self.http_headers);

        Ok(Client {
            base_url: Arc::new(base_url),
            headers: Arc::new(headers),
            folder_id,
            http_client: self.http_client,
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

#[derive(Clone)]
pub struct Client<H = reqwest::Client> {
    base_url: Arc<Url>,
    headers: Arc<HeaderMap>,
    folder_id: Option<Arc<str>>,
    http_client: H,
}

struct RedactedHeaders<'a>(&'a HeaderMap);

impl std::fmt::Debug for RedactedHeaders<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.0.iter().map(|(name, value)| {
                let shown = if name == AUTHORIZATION {
                    "<REDACTED>"
                } else {
                    value.to_str().unwrap_or("<binary>")
                };
                (name.as_str(), shown)
            }))
            .finish()
    }
}

impl<H> std::fmt::Debug for Client<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .field("folder_id", &self.folder_id)
            .field("headers", &RedactedHeaders(&self.headers))
            .finish_non_exhaustive()
    }
}

impl Client<reqwest::Client> {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder<reqwest::Client> {
        ClientBuilder::new()
    }

    /// Create a client from `YANDEX_API_KEY` or `YANDEX_IAM_TOKEN`, plus the optional
    /// `YANDEX_FOLDER_ID`, `YANDEX_BASE_URL` and `YANDEX_DATA_LOGGING_ENABLED`.
    pub fn from_env() -> std::result::Result<Self, ClientBuilderError> {
        from_lookup(ClientBuilder::new(), |name| std::env::var(name).ok())
    }
}

/// Fill a builder from a variable lookup and build it.
pub(crate) fn from_lookup<H>(
    mut builder: ClientBuilder<H>,
    lookup: impl Fn(&str) -> Option<String>,
) -> std::result::Result<Client<H>, ClientBuilderError> {
    if let Some(key) = lookup(API_KEY_VAR) {
        builder = builder.api_key(key);
    }
    if let Some(token) = lookup(IAM_TOKEN_VAR) {
        builder = builder.iam_token(token);
    }
    if let Some(folder_id) = lookup(FOLDER_ID_VAR) {
        builder = builder.folder_id(folder_id);
    }
    if let Some(base_url) = lookup(BASE_URL_VAR) {
        builder = builder.base_url(base_url);
    }
    if let Some(flag) = lookup(DATA_LOGGING_VAR) {
        let enabled = match flag.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "" | "0" | "false" | "no" | "off" => false,
            other => {
                return Err(ClientBuilderError::InvalidProperty(format!(
                    "{DATA_LOGGING_VAR} must be a boolean, got `{other}`"
                )));
            }
        };
        builder = builder.data_logging_enabled(enabled);
    }

    builder.build()
}

impl<H> Client<H> {
    /// Poll interval for [Client::wait_for_completion] when the caller has no preference.
    pub const DEFAULT_POLL_INTERVAL: Duration = operation::DEFAULT_POLL_INTERVAL;

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Headers sent with every request (the content type is added per request).
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn folder_id(&self) -> Option<&str> {
        self.folder_id.as_deref()
    }

    /// A new client whose headers are this client's headers overlaid with `overrides`. This
    /// client is left untouched.
    pub fn with_headers(&self, overrides: HeaderMap) -> Self
    where
        H: Clone,
    {
        let mut headers = (*self.headers).clone();

        for name in overrides.keys() {
            headers.remove(name);
        }
        for (name, value) in overrides.iter() {
            let mut value = value.clone();
            if name == AUTHORIZATION {
                value.set_sensitive(true);
            }
            headers.append(name.clone(), value);
        }

        Self {
            base_url: self.base_url.clone(),
            headers: Arc::new(headers),
            folder_id: self.folder_id.clone(),
            http_client: self.http_client.clone(),
        }
    }

    /// Qualify a model name with the client's folder, e.g. `yandexgpt/latest` to
    /// `gpt://<folder>/yandexgpt/latest`.
    pub fn completion_model_uri(&self, model: &str) -> Result<String> {
        self.qualify(model, models::completion_model_uri)
    }

    /// Qualify an embedding model name with the client's folder.
    pub fn embedding_model_uri(&self, model: &str) -> Result<String> {
        self.qualify(model, models::embedding_model_uri)
    }

    fn qualify(&self, model: &str, qualify: fn(&str, &str) -> String) -> Result<String> {
        match self.folder_id() {
            Some(folder_id) => Ok(qualify(folder_id, model)),
            None if model.contains("://") => Ok(model.to_string()),
            None => Err(Error::Request(format!(
                "model `{model}` needs a folder id to be qualified"
            ))),
        }
    }

    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<String> {
        let mut url = (*self.base_url).clone();
        url.path_segments_mut()
            .map_err(|_| Error::Request(format!("base url `{}` cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url.to_string())
    }

    pub(crate) fn post<T: Serialize>(
        &self,
        segments: &[&str],
        body: &T,
    ) -> Result<http_client::Request<Vec<u8>>> {
        let url = self.endpoint(segments.iter().copied())?;
        let body = serde_json::to_vec(body)?;

        tracing::debug!("POST {}", url);

        let mut req = http_client::Request::post(url);
        if let Some(hs) = req.headers_mut() {
            *hs = (*self.headers).clone();
            hs.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        req.body(body)
            .map_err(|e| Error::Http(http_client::Error::Protocol(e)))
    }

    pub(crate) fn get<'a>(
        &self,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> Result<http_client::Request<NoBody>> {
        let url = self.endpoint(segments)?;

        tracing::debug!("GET {}", url);

        let mut req = http_client::Request::get(url);
        if let Some(hs) = req.headers_mut() {
            *hs = (*self.headers).clone();
        }

        req.body(NoBody)
            .map_err(|e| Error::Http(http_client::Error::Protocol(e)))
    }
}

impl<H> Client<H>
where
    H: HttpClientExt,
{
    async fn execute<B, T>(
        &self,
        req: http_client::Request<B>,
        decode: fn(&[u8]) -> std::result::Result<T, DecodeError>,
    ) -> Result<T>
    where
        B: Into<Bytes> + Send,
    {
        let response = self.http_client.send::<_, Bytes>(req).await?;
        let body = response::read_body(response).await?;

        if enabled!(Level::TRACE) {
            tracing::trace!("Response body: {}", String::from_utf8_lossy(&body));
        }

        Ok(decode(&body)?)
    }

    async fn post_json<B, T>(
        &self,
        segments: &[&str],
        body: &B,
        decode: fn(&[u8]) -> std::result::Result<T, DecodeError>,
    ) -> Result<T>
    where
        B: Serialize,
    {
        if enabled!(Level::TRACE) {
            tracing::trace!(
                "Request body: {}",
                serde_json::to_string_pretty(body)?
            );
        }

        let req = self.post(segments, body)?;
        self.execute(req, decode).await
    }

    /// Generate a completion in one request.
    ///
    /// Fails without sending anything if the request has its streaming flag set.
    pub async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResult> {
        request.validate()?;
        if request.is_stream() {
            return Err(Error::Request(
                "`stream` is set to true, use `complete_streaming` instead".into(),
            ));
        }

        let span = completion_span("completion", request);

        async move {
            let result: CompletionResult = self
                .post_json(COMPLETION_PATH, request, response::decode_result)
                .await?;

            let span = tracing::Span::current();
            span.record("gen_ai.usage.input_tokens", result.usage.input_text_tokens);
            span.record("gen_ai.usage.output_tokens", result.usage.completion_tokens);
            span.record("gen_ai.response.model", result.model_version.as_str());

            Ok(result)
        }
        .instrument(span)
        .await
    }

    /// Generate a completion, receiving the answer as it is produced.
    ///
    /// Fails without sending anything unless the request has its streaming flag set. The HTTP
    /// status is checked before the stream is handed out; frames are read lazily as the stream is
    /// polled.
    pub async fn complete_streaming(
        &self,
        request: &CompletionRequest,
    ) -> Result<StreamingCompletion> {
        request.validate()?;
        if !request.is_stream() {
            return Err(Error::Request(
                "`stream` is set to false, use `complete` instead".into(),
            ));
        }

        let span = completion_span("completion_streaming", request);

        async {
            if enabled!(Level::TRACE) {
                tracing::trace!(
                    "Streaming request body: {}",
                    serde_json::to_string_pretty(request)?
                );
            }

            let req = self.post(COMPLETION_PATH, request)?;
            let response = self.http_client.send_streaming(req).await?;
            response::open_stream(response).await
        }
        .instrument(span.clone())
        .await
        .map(|body| StreamingCompletion::new(body, span))
    }

    /// Submit a completion to run in the background. The returned operation is almost never done
    /// yet; poll it with [Client::fetch_operation] or [Client::wait_for_completion].
    pub async fn complete_async(&self, request: &CompletionRequest) -> Result<Operation> {
        request.validate()?;
        if request.is_stream() {
            return Err(Error::Request(
                "asynchronous completions cannot be streamed, set `stream` to false".into(),
            ));
        }

        let span = info_span!(
            target: "yafm::operations",
            "completion_async",
            gen_ai.operation.name = "completion_async",
            gen_ai.request.model = request.model_uri.as_str(),
            operation_id = tracing::field::Empty,
        );

        async move {
            let operation: Operation = self
                .post_json(COMPLETION_ASYNC_PATH, request, response::decode)
                .await?;
            tracing::Span::current().record("operation_id", operation.id.as_str());
            Ok(operation)
        }
        .instrument(span)
        .await
    }

    /// Fetch the current state of an operation. Never cached.
    pub async fn fetch_operation(&self, operation_id: &str) -> Result<Operation> {
        let req = self.get([OPERATIONS_PATH, operation_id])?;
        self.execute(req, response::decode).await
    }

    /// Poll an operation every `poll_interval` until it is done and return its result.
    ///
    /// There is no attempt limit. Wrap the call in a timeout to bound the wait.
    pub async fn wait_for_completion(
        &self,
        operation_id: &str,
        poll_interval: Duration,
    ) -> Result<CompletionResult> {
        let span = info_span!(
            target: "yafm::operations",
            "wait_for_completion",
            operation_id,
            poll_interval_ms = poll_interval.as_millis() as u64,
        );

        operation::wait_for_completion(operation_id, poll_interval, || {
            self.fetch_operation(operation_id)
        })
        .instrument(span)
        .await
    }

    /// [Client::complete_async] followed by [Client::wait_for_completion].
    pub async fn complete_async_and_wait(
        &self,
        request: &CompletionRequest,
        poll_interval: Duration,
    ) -> Result<CompletionResult> {
        let operation = self.complete_async(request).await?;
        self.wait_for_completion(&operation.id, poll_interval).await
    }

    pub async fn tokenize(&self, request: &TokenizeRequest) -> Result<TokenizeResult> {
        request.validate()?;

        let span = info_span!(
            target: "yafm::tokenize",
            "tokenize",
            gen_ai.request.model = request.model_uri.as_str(),
            tokens = tracing::field::Empty,
        );

        async move {
            let result: TokenizeResult = self
                .post_json(TOKENIZE_PATH, request, response::decode)
                .await?;
            tracing::Span::current().record("tokens", result.len());
            Ok(result)
        }
        .instrument(span)
        .await
    }

    /// Tokenize the messages of a completion request, as the model would see them.
    pub async fn tokenize_completion(&self, request: &CompletionRequest) -> Result<TokenizeResult> {
        request.validate()?;

        let span = info_span!(
            target: "yafm::tokenize",
            "tokenize_completion",
            gen_ai.request.model = request.model_uri.as_str(),
            tokens = tracing::field::Empty,
        );

        async move {
            let result: TokenizeResult = self
                .post_json(TOKENIZE_COMPLETION_PATH, request, response::decode)
                .await?;
            tracing::Span::current().record("tokens", result.len());
            Ok(result)
        }
        .instrument(span)
        .await
    }

    pub async fn embed(&self, request: &EmbeddingRequest) -> Result<Embedding> {
        request.validate()?;

        let span = info_span!(
            target: "yafm::embeddings",
            "embed",
            gen_ai.operation.name = "embeddings",
            gen_ai.request.model = request.model_uri.as_str(),
            gen_ai.usage.input_tokens = tracing::field::Empty,
        );

        async move {
            let result: Embedding = self
                .post_json(TEXT_EMBEDDING_PATH, request, response::decode)
                .await?;
            tracing::Span::current().record("gen_ai.usage.input_tokens", result.num_tokens);
            Ok(result)
        }
        .instrument(span)
        .await
    }
}

fn completion_span(operation: &'static str, request: &CompletionRequest) -> tracing::Span {
    info_span!(
        target: "yafm::completions",
        "completion",
        gen_ai.operation.name = operation,
        gen_ai.request.model = request.model_uri.as_str(),
        gen_ai.request.temperature = request.completion_options.temperature,
        gen_ai.response.model = tracing::field::Empty,
        gen_ai.usage.input_tokens = tracing::field::Empty,
        gen_ai.usage.output_tokens = tracing::field::Empty,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(vars: &[(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        let vars = vars.to_vec();
        move |name| {
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
        }
    }

    #[test]
    fn api_key_without_folder_omits_folder_header() {
        let client = Client::builder().api_key("k").build().unwrap();

        assert_eq!(client.headers().get(AUTHORIZATION).unwrap(), "Api-Key k");
        assert!(client.headers().get(FOLDER_ID_HEADER).is_none());
        assert_eq!(client.headers().get(DATA_LOGGING_HEADER).unwrap(), "false");
        assert_eq!(client.folder_id(), None);
    }

    #[test]
    fn api_key_with_folder_sends_folder_header() {
        let client = Client::builder()
            .api_key("k")
            .folder_id("b1g")
            .data_logging_enabled(true)
            .build()
            .unwrap();

        assert_eq!(client.headers().get(FOLDER_ID_HEADER).unwrap(), "b1g");
        assert_eq!(client.headers().get(DATA_LOGGING_HEADER).unwrap(), "true");
    }

    #[test]
    fn iam_token_needs_folder() {
        assert!(matches!(
            Client::builder().iam_token("t").build(),
            Err(ClientBuilderError::MissingFolderId)
        ));
        assert!(matches!(
            Client::builder().iam_token("t").folder_id("  ").build(),
            Err(ClientBuilderError::MissingFolderId)
        ));

        let client = Client::builder()
            .iam_token("t")
            .folder_id("b1g")
            .build()
            .unwrap();
        assert_eq!(client.headers().get(AUTHORIZATION).unwrap(), "Bearer t");
        assert_eq!(client.headers().get(FOLDER_ID_HEADER).unwrap(), "b1g");
    }

    #[test]
    fn credentials_must_be_exactly_one() {
        assert!(matches!(
            Client::builder().iam_token("t").api_key("k").folder_id("f").build(),
            Err(ClientBuilderError::ConflictingCredentials)
        ));
        assert!(matches!(
            Client::builder().build(),
            Err(ClientBuilderError::MissingCredentials)
        ));
        assert!(matches!(
            Client::builder().api_key("").iam_token("").build(),
            Err(ClientBuilderError::MissingCredentials)
        ));
    }

    #[test]
    fn invalid_header_value_is_rejected() {
        assert!(matches!(
            Client::builder().api_key("bad\nkey").build(),
            Err(ClientBuilderError::InvalidHeader(_))
        ));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            Client::builder().api_key("k").base_url("not a url").build(),
            Err(ClientBuilderError::InvalidProperty(_))
        ));
    }

    #[test]
    fn with_headers_returns_new_view() {
        let client = Client::builder().api_key("k").build().unwrap();

        let mut overrides = HeaderMap::new();
        overrides.insert(DATA_LOGGING_HEADER, HeaderValue::from_static("true"));
        overrides.insert("x-request-id", HeaderValue::from_static("abc"));
        let view = client.with_headers(overrides);

        assert_eq!(view.headers().get(DATA_LOGGING_HEADER).unwrap(), "true");
        assert_eq!(view.headers().get("x-request-id").unwrap(), "abc");
        assert_eq!(view.headers().get(AUTHORIZATION).unwrap(), "Api-Key k");

        assert_eq!(client.headers().get(DATA_LOGGING_HEADER).unwrap(), "false");
        assert!(client.headers().get("x-request-id").is_none());
    }

    #[test]
    fn debug_redacts_credentials() {
        let client = Client::builder()
            .iam_token("secret-token")
            .folder_id("b1g")
            .build()
            .unwrap();

        let debug = format!("{client:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("<REDACTED>"));

        let credentials = Credentials::ApiKey("secret-key".into());
        assert!(!format!("{credentials:?}").contains("secret-key"));
    }

    #[test]
    fn endpoints_are_joined_and_escaped() {
        let client = Client::builder()
            .api_key("k")
            .base_url("https://example.com/llm/")
            .build()
            .unwrap();

        assert_eq!(
            client.endpoint(COMPLETION_PATH.iter().copied()).unwrap(),
            "https://example.com/llm/foundationModels/v1/completion"
        );
        assert_eq!(
            client.endpoint([OPERATIONS_PATH, "op/1 x"]).unwrap(),
            "https://example.com/llm/operations/op%2F1%20x"
        );
    }

    #[test]
    fn model_uris_use_client_folder() {
        let with_folder = Client::builder()
            .api_key("k")
            .folder_id("b1g")
            .build()
            .unwrap();
        assert_eq!(
            with_folder
                .completion_model_uri(models::YANDEXGPT_LITE)
                .unwrap(),
            "gpt://b1g/yandexgpt-lite/latest"
        );
        assert_eq!(
            with_folder
                .embedding_model_uri(models::TEXT_SEARCH_DOC)
                .unwrap(),
            "emb://b1g/text-search-doc/latest"
        );

        let without_folder = Client::builder().api_key("k").build().unwrap();
        assert!(matches!(
            without_folder.completion_model_uri(models::YANDEXGPT),
            Err(Error::Request(_))
        ));
        assert_eq!(
            without_folder.completion_model_uri("ds://bt1").unwrap(),
            "ds://bt1"
        );
    }

    #[test]
    fn from_lookup_reads_variables() {
        let client = from_lookup(
            ClientBuilder::new(),
            lookup(&[
                (IAM_TOKEN_VAR, "t"),
                (FOLDER_ID_VAR, "b1g"),
                (BASE_URL_VAR, "http://localhost:8080"),
                (DATA_LOGGING_VAR, "TRUE"),
            ]),
        )
        .unwrap();

        assert_eq!(client.base_url(), "http://localhost:8080/");
        assert_eq!(client.folder_id(), Some("b1g"));
        assert_eq!(client.headers().get(DATA_LOGGING_HEADER).unwrap(), "true");
    }

    #[test]
    fn from_lookup_applies_credential_policy() {
        assert!(matches!(
            from_lookup(ClientBuilder::new(), lookup(&[])),
            Err(ClientBuilderError::MissingCredentials)
        ));
        assert!(matches!(
            from_lookup(
                ClientBuilder::new(),
                lookup(&[(API_KEY_VAR, "k"), (IAM_TOKEN_VAR, "t"), (FOLDER_ID_VAR, "f")])
            ),
            Err(ClientBuilderError::ConflictingCredentials)
        ));
        assert!(matches!(
            from_lookup(
                ClientBuilder::new(),
                lookup(&[(API_KEY_VAR, "k"), (DATA_LOGGING_VAR, "maybe")])
            ),
            Err(ClientBuilderError::InvalidProperty(_))
        ));
    }
}
