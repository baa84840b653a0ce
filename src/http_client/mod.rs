//! The transport seam of the crate.
//!
//! [HttpClientExt] abstracts over anything able to issue an HTTP request and hand back either a
//! lazily read body or a stream of body chunks. Status codes are *not* interpreted here: a 429 or
//! a 500 is a perfectly good response as far as the transport is concerned. Turning statuses into
//! typed errors is the job of [crate::response].

use std::future::Future;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use futures::stream::BoxStream;
pub use http::{HeaderMap, HeaderName, HeaderValue, Method, Request, Response, Uri, request::Builder};
use reqwest::Body;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Http error: {0}")]
    Protocol(#[from] http::Error),
    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),
    #[error("Http client error: {0}")]
    Instance(#[from] Box<dyn std::error::Error + Send + Sync + 'static>),
}

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn instance_error<E: std::error::Error + Send + Sync + 'static>(error: E) -> Error {
    Error::Instance(error.into())
}

pub type LazyBody<T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'static>>;

pub type ByteStream = BoxStream<'static, Result<Bytes>>;

pub type StreamingResponse = Response<ByteStream>;

/// Request body of a `GET`.
pub struct NoBody;

impl From<NoBody> for Bytes {
    fn from(_: NoBody) -> Self {
        Bytes::new()
    }
}

impl From<NoBody> for Body {
    fn from(_: NoBody) -> Self {
        reqwest::Body::default()
    }
}

/// Read a lazily fetched body as (lossy) UTF-8 text.
pub async fn text(response: Response<LazyBody<Bytes>>) -> Result<String> {
    let bytes = response.into_body().await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Drain a streamed body into (lossy) UTF-8 text. Only meant for short bodies such as error
/// payloads; successful streams are consumed incrementally.
pub async fn collect_stream(mut stream: ByteStream) -> Result<String> {
    let mut buffer = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buffer.extend_from_slice(&chunk?);
    }
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// A helper trait to make both buffered and streamed requests possible over any HTTP backend.
pub trait HttpClientExt: Send + Sync {
    /// Send a HTTP request, get a response back whose body can be awaited separately.
    fn send<T, U>(
        &self,
        req: Request<T>,
    ) -> impl Future<Output = Result<Response<LazyBody<U>>>> + Send + 'static
    where
        T: Into<Bytes> + Send,
        U: From<Bytes> + Send + 'static;

    /// Send a HTTP request, get a streamed response back (as a stream of [`bytes::Bytes`]).
    fn send_streaming<T>(
        &self,
        req: Request<T>,
    ) -> impl Future<Output = Result<StreamingResponse>> + Send + 'static
    where
        T: Into<Bytes>;
}

fn response_head(response: &reqwest::Response) -> http::response::Builder {
    let mut res = Response::builder()
        .status(response.status())
        .version(response.version());

    if let Some(hs) = res.headers_mut() {
        *hs = response.headers().clone();
    }

    res
}

impl HttpClientExt for reqwest::Client {
    fn send<T, U>(
        &self,
        req: Request<T>,
    ) -> impl Future<Output = Result<Response<LazyBody<U>>>> + Send + 'static
    where
        T: Into<Bytes> + Send,
        U: From<Bytes> + Send + 'static,
    {
        let (parts, body) = req.into_parts();
        let body: Bytes = body.into();
        let req = self
            .request(parts.method, parts.uri.to_string())
            .headers(parts.headers)
            .body(body);

        async move {
            let response = req.send().await.map_err(instance_error)?;
            let res = response_head(&response);

            let body: LazyBody<U> = Box::pin(async move {
                let bytes = response.bytes().await.map_err(instance_error)?;
                Ok(U::from(bytes))
            });

            res.body(body).map_err(Error::Protocol)
        }
    }

    fn send_streaming<T>(
        &self,
        req: Request<T>,
    ) -> impl Future<Output = Result<StreamingResponse>> + Send + 'static
    where
        T: Into<Bytes>,
    {
        let (parts, body) = req.into_parts();
        let body: Bytes = body.into();
        let req = self
            .request(parts.method, parts.uri.to_string())
            .headers(parts.headers)
            .body(body)
            .build();
        let client = self.clone();

        async move {
            let response = client
                .execute(req.map_err(instance_error)?)
                .await
                .map_err(instance_error)?;
            let res = response_head(&response);

            let stream: ByteStream = Box::pin(
                response
                    .bytes_stream()
                    .map(|chunk| chunk.map_err(instance_error)),
            );

            res.body(stream).map_err(Error::Protocol)
        }
    }
}
