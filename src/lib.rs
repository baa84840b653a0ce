//! yafm is an async Rust client for the Yandex Foundation Models API: text generation (plain,
//! streamed and long-running), tokenization and text embeddings.
//!
//! # High-level features
//! - Synchronous and streamed completions, with cumulative snapshots yielded as they arrive
//! - Long-running completions submitted as operations and polled to completion
//! - Tokenization of texts and of whole completion requests
//! - Text embeddings for documents and search queries
//! - Pluggable HTTP transport ([http_client::HttpClientExt]), [reqwest] by default
//!
//! # Simple example:
//! ```
//! use yafm::{client::Client, completion::{CompletionRequest, Message}, models};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Requires `YANDEX_API_KEY` (or `YANDEX_IAM_TOKEN`) and `YANDEX_FOLDER_ID`.
//!     let client = Client::from_env()?;
//!
//!     let request = CompletionRequest::builder(client.completion_model_uri(models::YANDEXGPT)?)
//!         .message(Message::system("You are a helpful assistant."))
//!         .message(Message::user("Who are you?"))
//!         .build()?;
//!
//!     let result = client.complete(&request).await?;
//!     println!("{}", result.text().unwrap_or_default());
//!
//!     // The same request, in the background
//!     let answer = client
//!         .complete_async_and_wait(&request, yafm::operation::DEFAULT_POLL_INTERVAL)
//!         .await?;
//!     println!("{}", answer.text().unwrap_or_default());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Errors
//! Every network operation returns [Result], whose [Error] tells request validation, transport
//! failures, quota exhaustion, API errors, undecodable payloads and failed operations apart.
//! Nothing is retried by the client; [Error::is_retryable] helps callers decide.
//!
//! # Logging
//! The crate emits [tracing] spans and events under the `yafm::completions`,
//! `yafm::operations`, `yafm::tokenize` and `yafm::embeddings` targets. Payloads are only
//! logged at `TRACE`. No subscriber is installed.

pub mod client;
pub mod completion;
pub mod decoders;
pub mod embeddings;
pub mod error;
pub mod http_client;
pub mod json_utils;
pub mod models;
pub mod operation;
pub mod response;
pub mod streaming;
pub mod tokenize;

pub use client::{Client, ClientBuilder, ClientBuilderError, Credentials};
pub use error::{ApiError, DecodeError, Error, Result};
