//! Error types shared by every endpoint of the client.

use std::fmt;

use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::http_client;
use crate::operation::OperationStatus;

const QUOTA_EXCEEDED_GRPC_CODE: i32 = 8;
const PROHIBITED_TOPIC_GRPC_CODE: i32 = 3;

/// An error reported by the remote API.
///
/// Carries both the gRPC style code used by the service and the HTTP status the error arrived
/// with, when either is known.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub grpc_code: Option<i32>,
    pub http_code: Option<u16>,
    pub message: String,
    #[serde(default)]
    pub details: Vec<serde_json::Value>,
    pub solution: Option<String>,
}

impl ApiError {
    /// The request quota of the folder (or API key) is exhausted.
    pub fn quota_exceeded() -> Self {
        Self {
            grpc_code: Some(QUOTA_EXCEEDED_GRPC_CODE),
            http_code: Some(StatusCode::TOO_MANY_REQUESTS.as_u16()),
            message: "Quota exceeded".into(),
            details: Vec::new(),
            solution: Some(
                "Depending on the quota, wait or contact technical support to increase the quota"
                    .into(),
            ),
        }
    }

    /// The model refused to answer on the requested topic.
    pub fn prohibited_topic() -> Self {
        Self {
            grpc_code: Some(PROHIBITED_TOPIC_GRPC_CODE),
            http_code: None,
            message: "An answer to a given topic cannot be generated".into(),
            details: Vec::new(),
            solution: None,
        }
    }

    /// Build the error for a non-success HTTP status. The body is kept verbatim as the message,
    /// whether or not it is JSON.
    pub fn from_status(status: StatusCode, body: impl Into<String>) -> Self {
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Self::quota_exceeded();
        }

        Self {
            grpc_code: None,
            http_code: Some(status.as_u16()),
            message: body.into(),
            details: Vec::new(),
            solution: None,
        }
    }

    pub fn is_quota_exceeded(&self) -> bool {
        self.http_code == Some(StatusCode::TOO_MANY_REQUESTS.as_u16())
    }

    pub fn is_server_error(&self) -> bool {
        self.http_code.is_some_and(|code| code >= 500)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.http_code, self.grpc_code) {
            (Some(http), Some(grpc)) => write!(f, "[http {http}, grpc {grpc}] {}", self.message)?,
            (Some(http), None) => write!(f, "[http {http}] {}", self.message)?,
            (None, Some(grpc)) => write!(f, "[grpc {grpc}] {}", self.message)?,
            (None, None) => f.write_str(&self.message)?,
        }

        if let Some(solution) = &self.solution {
            write!(f, " ({solution})")?;
        }

        Ok(())
    }
}

impl std::error::Error for ApiError {}

/// A payload that could not be turned into the expected typed value.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("{}", self.describe())]
pub struct DecodeError {
    pub reason: String,
    /// Path of the offending field, e.g. `result.usage.totalTokens`.
    pub path: Option<String>,
    /// The payload that failed to decode.
    pub payload: String,
}

impl DecodeError {
    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!(
                "invalid response at `{path}`: {}. Payload: {}",
                self.reason, self.payload
            ),
            None => format!("invalid response: {}. Payload: {}", self.reason, self.payload),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request is invalid and was rejected before any I/O.
    #[error("RequestError: {0}")]
    Request(String),

    #[error("HttpError: {0}")]
    Http(#[from] http_client::Error),

    #[error("QuotaExceeded: {0}")]
    QuotaExceeded(ApiError),

    #[error("ApiError: {0}")]
    Api(ApiError),

    #[error("DecodeError: {0}")]
    Decode(#[from] DecodeError),

    #[error("Operation #{operation_id} failed with error: {status}")]
    OperationFailed {
        operation_id: String,
        status: OperationStatus,
    },

    #[error("Operation #{operation_id} is done but carries neither a response nor an error")]
    ProtocolViolation { operation_id: String },

    #[error("JsonError: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Error::QuotaExceeded(_))
    }

    /// Whether the same request may succeed if sent again later. The client itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::QuotaExceeded(_) => true,
            Error::Api(err) => err.is_server_error(),
            _ => false,
        }
    }

    /// The API error behind this error, if any.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Error::QuotaExceeded(err) | Error::Api(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ApiError> for Error {
    fn from(err: ApiError) -> Self {
        if err.is_quota_exceeded() {
            Error::QuotaExceeded(err)
        } else {
            Error::Api(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
