//! Model names and URIs.
//!
//! Models are addressed by URI: `gpt://<folder>/<model>` for text generation, `emb://<folder>/<model>`
//! for embeddings and `ds://<id>` for models fine-tuned in DataSphere.

/// YandexGPT Pro
pub const YANDEXGPT: &str = "yandexgpt/latest";
/// YandexGPT Lite
pub const YANDEXGPT_LITE: &str = "yandexgpt-lite/latest";
/// Text summarization
pub const SUMMARIZATION: &str = "summarization/latest";
/// Embeddings for documents
pub const TEXT_SEARCH_DOC: &str = "text-search-doc/latest";
/// Embeddings for search queries
pub const TEXT_SEARCH_QUERY: &str = "text-search-query/latest";

/// Upper bound on the tokens a generative model produces per answer.
pub const MAX_TOKENS_RESPONSE: u64 = 2000;
/// Upper bound on prompt plus answer tokens of a generative model.
pub const MAX_TOKENS_TOTAL: u64 = 8000;
/// Upper bound on the tokens of an embedded text.
pub const MAX_TOKENS_INPUT: u64 = 2000;

const GPT_SCHEME: &str = "gpt://";
const EMB_SCHEME: &str = "emb://";
const DS_SCHEME: &str = "ds://";

fn is_qualified(model: &str) -> bool {
    [GPT_SCHEME, EMB_SCHEME, DS_SCHEME]
        .iter()
        .any(|scheme| model.starts_with(scheme))
}

/// URI of a text generation model in `folder_id`. Already qualified URIs are returned unchanged.
pub fn completion_model_uri(folder_id: &str, model: &str) -> String {
    if is_qualified(model) {
        return model.to_string();
    }
    format!("{GPT_SCHEME}{folder_id}/{model}")
}

/// URI of an embedding model in `folder_id`. Already qualified URIs are returned unchanged.
pub fn embedding_model_uri(folder_id: &str, model: &str) -> String {
    if is_qualified(model) {
        return model.to_string();
    }
    format!("{EMB_SCHEME}{folder_id}/{model}")
}

/// URI of a model fine-tuned in DataSphere. Fine-tuned models only serve synchronous requests.
pub fn finetuned_model_uri(model_id: &str) -> String {
    if model_id.starts_with(DS_SCHEME) {
        return model_id.to_string();
    }
    format!("{DS_SCHEME}{model_id}")
}
