//! Long-running ("asynchronous") completions.
//!
//! Submitting a request to the asynchronous endpoint returns an [Operation] straight away. The
//! record is never updated locally: its state is observed by fetching it again by id until it is
//! done. [wait_for_completion] drives that loop.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::completion::CompletionResult;
use crate::error::{Error, Result};

/// Poll interval used when the caller does not pick one.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// gRPC style status attached to a failed operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OperationStatus {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<serde_json::Value>,
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "code {}: {}", self.code, self.message)?;
        if !self.details.is_empty() {
            write!(f, " (details: {})", serde_json::Value::from(self.details.clone()))?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by: String,
    pub modified_at: DateTime<Utc>,
    #[serde(default)]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<CompletionResult>,
}

/// What a fetched [Operation] record says about the request behind it.
#[derive(Debug, PartialEq)]
pub enum OperationOutcome<'a> {
    /// Still running, fetch again later.
    Pending,
    Succeeded(&'a CompletionResult),
    Failed(&'a OperationStatus),
    /// Marked done, but carries neither a response nor an error.
    Malformed,
}

impl Operation {
    /// Classify the record. A response wins over an error when both are present, and neither
    /// field is looked at until the operation is done.
    pub fn outcome(&self) -> OperationOutcome<'_> {
        if !self.done {
            return OperationOutcome::Pending;
        }

        match (&self.response, &self.error) {
            (Some(response), _) => OperationOutcome::Succeeded(response),
            (None, Some(error)) => OperationOutcome::Failed(error),
            (None, None) => OperationOutcome::Malformed,
        }
    }

    /// Turn a terminal record into its result. Returns `None` while the operation is pending.
    pub fn into_result(self) -> Option<Result<CompletionResult>> {
        if !self.done {
            return None;
        }

        Some(match (self.response, self.error) {
            (Some(response), _) => Ok(response),
            (None, Some(status)) => Err(Error::OperationFailed {
                operation_id: self.id,
                status,
            }),
            (None, None) => Err(Error::ProtocolViolation {
                operation_id: self.id,
            }),
        })
    }
}

/// Poll an operation until it is done.
///
/// `fetch` is called once per attempt; between two attempts the task sleeps for `poll_interval`.
/// There is no attempt limit: wrap the returned future in a timeout to bound the wait. A done
/// record without a response or an error ends the loop with [Error::ProtocolViolation].
pub async fn wait_for_completion<F, Fut>(
    operation_id: &str,
    poll_interval: Duration,
    mut fetch: F,
) -> Result<CompletionResult>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Operation>>,
{
    let mut attempt: u64 = 0;

    loop {
        attempt += 1;
        let operation = fetch().await?;

        tracing::debug!(
            target: "yafm::operations",
            operation_id,
            attempt,
            done = operation.done,
            "Fetched operation status"
        );

        match operation.into_result() {
            Some(Ok(result)) => return Ok(result),
            Some(Err(err)) => {
                tracing::error!(target: "yafm::operations", operation_id, attempt, error = %err);
                return Err(err);
            }
            None => tokio::time::sleep(poll_interval).await,
        }
    }
}
