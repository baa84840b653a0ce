//! A scripted in-memory transport: responses are handed out in order, every request is recorded.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use serde_json::{Value, json};
use yafm::client::{Client, ClientBuilder};
use yafm::http_client::{
    self, ByteStream, HeaderMap, HttpClientExt, LazyBody, Method, Request, Response,
    StreamingResponse,
};

pub const BASE_URL: &str = "http://mock.local";
pub const FOLDER_ID: &str = "b1gtest";

#[derive(Clone, Debug)]
pub struct MockResponse {
    status: u16,
    chunks: Vec<Bytes>,
}

impl MockResponse {
    pub fn json(status: u16, body: Value) -> Self {
        Self::text(status, &body.to_string())
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            chunks: vec![Bytes::copy_from_slice(body.as_bytes())],
        }
    }

    /// A body delivered in several transport chunks.
    pub fn chunks(status: u16, chunks: Vec<String>) -> Self {
        Self {
            status,
            chunks: chunks.into_iter().map(Bytes::from).collect(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: Method,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|value| value.to_str().unwrap())
    }
}

#[derive(Default)]
struct State {
    responses: VecDeque<MockResponse>,
    requests: Vec<RecordedRequest>,
}

#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<State>>,
}

impl MockTransport {
    pub fn new(responses: impl IntoIterator<Item = MockResponse>) -> Self {
        let transport = Self::default();
        transport.state.lock().unwrap().responses = responses.into_iter().collect();
        transport
    }

    /// Number of requests that reached the transport.
    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.requests().pop().unwrap()
    }

    fn record<T: Into<Bytes>>(&self, req: Request<T>) -> Option<MockResponse> {
        let (parts, body) = req.into_parts();
        let mut state = self.state.lock().unwrap();
        state.requests.push(RecordedRequest {
            method: parts.method,
            uri: parts.uri.to_string(),
            headers: parts.headers,
            body: body.into(),
        });
        state.responses.pop_front()
    }
}

fn exhausted() -> http_client::Error {
    http_client::Error::Instance("no scripted response left".into())
}

impl HttpClientExt for MockTransport {
    fn send<T, U>(
        &self,
        req: Request<T>,
    ) -> impl Future<Output = http_client::Result<Response<LazyBody<U>>>> + Send + 'static
    where
        T: Into<Bytes> + Send,
        U: From<Bytes> + Send + 'static,
    {
        let next = self.record(req);

        async move {
            let MockResponse { status, chunks } = next.ok_or_else(exhausted)?;
            let body = Bytes::from(chunks.concat());
            let body: LazyBody<U> = Box::pin(async move { Ok(U::from(body)) });

            Response::builder()
                .status(status)
                .body(body)
                .map_err(http_client::Error::Protocol)
        }
    }

    fn send_streaming<T>(
        &self,
        req: Request<T>,
    ) -> impl Future<Output = http_client::Result<StreamingResponse>> + Send + 'static
    where
        T: Into<Bytes>,
    {
        let next = self.record(req);

        async move {
            let MockResponse { status, chunks } = next.ok_or_else(exhausted)?;
            let stream: ByteStream = Box::pin(futures::stream::iter(chunks.into_iter().map(Ok)));

            Response::builder()
                .status(status)
                .body(stream)
                .map_err(http_client::Error::Protocol)
        }
    }
}

pub fn client(transport: &MockTransport) -> Client<MockTransport> {
    ClientBuilder::<MockTransport>::default()
        .api_key("test-key")
        .folder_id(FOLDER_ID)
        .base_url(BASE_URL)
        .http_client(transport.clone())
        .build()
        .unwrap()
}

pub fn completion_result(text: &str, status: &str, completion_tokens: u64) -> Value {
    json!({
        "alternatives": [{
            "message": {"role": "assistant", "text": text},
            "status": status
        }],
        "usage": {
            "inputTextTokens": "12",
            "completionTokens": completion_tokens.to_string(),
            "totalTokens": (12 + completion_tokens).to_string()
        },
        "modelVersion": "23.10.2024"
    })
}

pub fn operation(id: &str, done: bool, response: Option<Value>, error: Option<Value>) -> Value {
    let mut value = json!({
        "id": id,
        "description": "Async GPT Completion",
        "createdAt": "2024-10-23T08:15:00Z",
        "createdBy": "aje0test",
        "modifiedAt": "2024-10-23T08:15:03Z",
        "done": done,
        "metadata": null
    });

    if let Some(response) = response {
        value["response"] = response;
    }
    if let Some(error) = error {
        value["error"] = error;
    }

    value
}
