//! Tokenizer models. Tokenizing never generates text and is not billed as a completion.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::json_utils::stringified_u64;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenizeRequest {
    pub model_uri: String,
    pub text: String,
}

impl TokenizeRequest {
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

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    #[serde(with = "stringified_u64")]
    pub id: u64,
    pub text: String,
    /// Service tokens such as `<s>` that do not come from the input text.
    #[serde(default)]
    pub special: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenizeResult {
    pub tokens: Vec<Token>,
    pub model_version: String,
}

impl TokenizeResult {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of tokens that came from the input text.
    pub fn text_token_count(&self) -> usize {
        self.tokens.iter().filter(|token| !token.special).count()
    }
}
