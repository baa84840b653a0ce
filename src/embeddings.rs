//! Text embedding models.
//!
//! Documents and search queries are embedded by two different models
//! ([crate::models::TEXT_SEARCH_DOC] and [crate::models::TEXT_SEARCH_QUERY]); vectors from the
//! two are meant to be compared with each other.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::json_utils::stringified_u64;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingRequest {
    pub model_uri: String,
    pub text: String,
}

impl EmbeddingRequest {
    pub fn new(model_uri: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            model_uri: model_uri.into(),
            text: text.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.model_uri.trim().is_empty() {
            return Err(Error::Request("model_uri must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Embedding {
    pub embedding: Vec<f64>,
    #[serde(with = "stringified_u64")]
    pub num_tokens: u64,
    pub model_version: String,
}

impl Embedding {
    pub fn dimensions(&self) -> usize {
        self.embedding.len()
    }

    /// Cosine similarity with another vector. `None` if the dimensions differ or either vector
    /// is all zeros.
    pub fn cosine_similarity(&self, other: &Embedding) -> Option<f64> {
        if self.dimensions() != other.dimensions() {
            return None;
        }

        let (dot, norm_a, norm_b) = self
            .embedding
            .iter()
            .zip(&other.embedding)
            .fold((0.0, 0.0, 0.0), |(dot, a2, b2), (a, b)| {
                (dot + a * b, a2 + a * a, b2 + b * b)
            });

        if norm_a == 0.0 || norm_b == 0.0 {
            return None;
        }

        Some(dot / (norm_a.sqrt() * norm_b.sqrt()))
    }
}
