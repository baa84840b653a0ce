//! The single place raw HTTP responses are turned into typed values or typed errors.
//!
//! Every endpoint goes through the same two steps: the status is classified, a failed exchange
//! becoming an [Error], then [decode] turns the JSON body into whatever shape the endpoint
//! returns. Buffered and streamed bodies share both steps.

use bytes::Bytes;
use http::{Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{ApiError, DecodeError, Error, Result};
use crate::http_client::{self, ByteStream, LazyBody, StreamingResponse};

/// The `{"result": ...}` wrapper the completion endpoints put around their payload.
#[derive(Debug, Deserialize)]
pub(crate) struct ResultEnvelope<T> {
    pub result: T,
}

/// What a response status means for the caller.
#[derive(Debug, PartialEq)]
enum StatusClass {
    Success,
    /// 429. The body is never looked at.
    QuotaExceeded,
    /// Any other status of 400 and above. The body becomes the error message.
    Failed(StatusCode),
}

/// The only place that decides whether a status is an error.
fn classify(status: StatusCode) -> StatusClass {
    if status == StatusCode::TOO_MANY_REQUESTS {
        StatusClass::QuotaExceeded
    } else if status.as_u16() >= 400 {
        StatusClass::Failed(status)
    } else {
        StatusClass::Success
    }
}

fn quota_error() -> Error {
    tracing::warn!("API quota exceeded");
    Error::QuotaExceeded(ApiError::quota_exceeded())
}

fn api_error(status: StatusCode, body: &str) -> Error {
    tracing::warn!(status = status.as_u16(), body, "API returned an error");
    Error::Api(ApiError::from_status(status, body))
}

/// Validate the status of a buffered response and read its body.
pub(crate) async fn read_body(response: Response<LazyBody<Bytes>>) -> Result<Bytes> {
    match classify(response.status()) {
        StatusClass::Success => Ok(response.into_body().await?),
        StatusClass::QuotaExceeded => Err(quota_error()),
        StatusClass::Failed(status) => {
            let body = http_client::text(response).await?;
            Err(api_error(status, &body))
        }
    }
}

/// Validate the status of a streamed response before any frame is consumed. Error bodies are
/// short, so they are drained to build the message.
pub(crate) async fn open_stream(response: StreamingResponse) -> Result<ByteStream> {
    match classify(response.status()) {
        StatusClass::Success => Ok(response.into_body()),
        StatusClass::QuotaExceeded => Err(quota_error()),
        StatusClass::Failed(status) => {
            let body = http_client::collect_stream(response.into_body()).await?;
            Err(api_error(status, &body))
        }
    }
}

/// Decode a JSON payload into `T`.
///
/// The payload must be a JSON object; anything else (an array, a bare string, `null`) is a
/// decode error, as is any missing or mistyped field. The error names the path of the offending
/// field and carries the payload.
pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> std::result::Result<T, DecodeError> {
    let text = || String::from_utf8_lossy(payload).into_owned();

    let value: serde_json::Value = serde_json::from_slice(payload).map_err(|err| {
        logged(DecodeError {
            reason: err.to_string(),
            path: None,
            payload: text(),
        })
    })?;

    if !value.is_object() {
        return Err(logged(DecodeError {
            reason: format!("expected a JSON object, got {}", json_kind(&value)),
            path: None,
            payload: text(),
        }));
    }

    serde_path_to_error::deserialize(value).map_err(|err| {
        let path = err.path().to_string();
        logged(DecodeError {
            reason: err.into_inner().to_string(),
            path: (path != ".").then_some(path),
            payload: text(),
        })
    })
}

fn logged(err: DecodeError) -> DecodeError {
    tracing::error!(error = %err, "Failed to decode response");
    err
}

/// Decode a `{"result": ...}` envelope and unwrap it.
pub(crate) fn decode_result<T: DeserializeOwned>(
    payload: &[u8],
) -> std::result::Result<T, DecodeError> {
    decode::<ResultEnvelope<T>>(payload).map(|envelope| envelope.result)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Shape {
        model_version: String,
        inner: Inner,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Inner {
        count: u32,
    }

    fn lazy(status: u16, body: &'static str) -> Response<LazyBody<Bytes>> {
        let body: LazyBody<Bytes> = Box::pin(async move { Ok(Bytes::from_static(body.as_bytes())) });
        Response::builder().status(status).body(body).unwrap()
    }

    #[test]
    fn classify_statuses() {
        assert_eq!(classify(StatusCode::OK), StatusClass::Success);
        assert_eq!(classify(StatusCode::NO_CONTENT), StatusClass::Success);
        assert_eq!(classify(StatusCode::MOVED_PERMANENTLY), StatusClass::Success);
        assert_eq!(
            classify(StatusCode::TOO_MANY_REQUESTS),
            StatusClass::QuotaExceeded
        );
        assert_eq!(
            classify(StatusCode::INTERNAL_SERVER_ERROR),
            StatusClass::Failed(StatusCode::INTERNAL_SERVER_ERROR)
        );
    }

    #[tokio::test]
    async fn read_body_never_reads_a_quota_body() {
        let body: LazyBody<Bytes> = Box::pin(async {
            Err(http_client::Error::Instance("body must not be read".into()))
        });
        let response = Response::builder().status(429).body(body).unwrap();

        assert!(matches!(
            read_body(response).await,
            Err(Error::QuotaExceeded(_))
        ));
    }

    #[tokio::test]
    async fn read_body_returns_body_on_success() {
        let bytes = read_body(lazy(200, "{\"ok\":true}")).await.unwrap();
        assert_eq!(&bytes[..], b"{\"ok\":true}");
    }

    #[tokio::test]
    async fn read_body_reports_raw_error_text() {
        match read_body(lazy(403, "Permission denied")).await {
            Err(Error::Api(err)) => {
                assert_eq!(err.http_code, Some(403));
                assert_eq!(err.message, "Permission denied");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn open_stream_reports_raw_error_text() {
        let stream: ByteStream = Box::pin(futures::stream::iter(vec![
            Ok(Bytes::from_static(b"upstream ")),
            Ok(Bytes::from_static(b"timeout")),
        ]));
        let response = Response::builder().status(504).body(stream).unwrap();

        match open_stream(response).await {
            Err(Error::Api(err)) => {
                assert_eq!(err.http_code, Some(504));
                assert_eq!(err.message, "upstream timeout");
            }
            Err(other) => panic!("unexpected {other:?}"),
            Ok(_) => panic!("an error status must not open the stream"),
        }
    }

    #[tokio::test]
    async fn open_stream_rejects_error_status() {
        let stream: ByteStream = Box::pin(futures::stream::iter(vec![Ok(Bytes::from_static(
            b"rate limited",
        ))]));
        let response = Response::builder().status(429).body(stream).unwrap();

        assert!(matches!(
            open_stream(response).await,
            Err(Error::QuotaExceeded(_))
        ));
    }

    #[test]
    fn decode_typed_object() {
        let payload = json!({"modelVersion": "06.12.2023", "inner": {"count": 3}}).to_string();
        let shape: Shape = decode(payload.as_bytes()).unwrap();

        assert_eq!(
            shape,
            Shape {
                model_version: "06.12.2023".into(),
                inner: Inner { count: 3 }
            }
        );
    }

    #[test]
    fn decode_rejects_non_object() {
        let err = decode::<Shape>(b"[1, 2, 3]").unwrap_err();

        assert!(err.reason.contains("an array"));
        assert_eq!(err.path, None);
        assert_eq!(err.payload, "[1, 2, 3]");
    }

    #[test]
    fn decode_names_offending_field() {
        let payload = json!({"modelVersion": "x", "inner": {"count": "three"}}).to_string();
        let err = decode::<Shape>(payload.as_bytes()).unwrap_err();

        assert_eq!(err.path.as_deref(), Some("inner.count"));
        assert_eq!(err.payload, payload);
    }

    #[test]
    fn decode_rejects_invalid_json() {
        let err = decode::<Shape>(b"not json").unwrap_err();
        assert_eq!(err.path, None);
        assert_eq!(err.payload, "not json");
    }

    #[test]
    fn decode_result_unwraps_envelope() {
        let payload = json!({"result": {"modelVersion": "v", "inner": {"count": 1}}}).to_string();
        let shape: Shape = decode_result(payload.as_bytes()).unwrap();
        assert_eq!(shape.inner.count, 1);

        let missing = decode_result::<Shape>(b"{\"modelVersion\":\"v\"}").unwrap_err();
        assert!(missing.reason.contains("result"));
    }
}
